//! Shared lookup tables that let delta resolution find a base object either by its pack
//! offset (`OFS_DELTA`) or by its hash (`REF_DELTA`), without re-decompressing it.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;

use crate::hash::ObjectHash;

use super::cache_object::{CacheObject, CacheObjectInfo};

/// Decoded base objects kept around for the rest of the current pack's decode, indexed both
/// by offset and, for base objects, by hash.
pub struct Caches {
    by_offset: DashMap<usize, Arc<CacheObject>>,
    by_hash: DashMap<ObjectHash, Arc<CacheObject>>,
    mem_used: AtomicUsize,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            by_offset: DashMap::new(),
            by_hash: DashMap::new(),
            mem_used: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, object: Arc<CacheObject>) {
        self.mem_used.fetch_add(object.mem_size(), Ordering::Relaxed);
        if let CacheObjectInfo::BaseObject(_, hash) = &object.info {
            self.by_hash.insert(*hash, object.clone());
        }
        self.by_offset.insert(object.offset, object);
    }

    pub fn get_by_offset(&self, offset: usize) -> Option<Arc<CacheObject>> {
        self.by_offset.get(&offset).map(|entry| entry.clone())
    }

    pub fn get_by_hash(&self, hash: &ObjectHash) -> Option<Arc<CacheObject>> {
        self.by_hash.get(hash).map(|entry| entry.clone())
    }

    pub fn total_mem(&self) -> usize {
        self.mem_used.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}
