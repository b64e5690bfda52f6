//! In-memory representation of a single pack object while decoding: either a fully resolved
//! base object, or a delta still waiting on its base, with bookkeeping for the decode-time
//! memory budget tracked by `Pack::cache_objs_mem`.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{hash::ObjectHash, internal::object::types::ObjectType};

/// Where an object's final bytes come from: a complete base object, or a delta addressed
/// either by a negative offset back into the pack, or by the hash of its base.
#[derive(Clone, Debug)]
pub enum CacheObjectInfo {
    BaseObject(ObjectType, ObjectHash),
    OffsetDelta { base_offset: usize },
    RefDelta { base_hash: ObjectHash },
}

/// A pack object held in memory during decode. For a resolved base object,
/// `data_decompressed` is the object's final content; for a still-pending delta, it is the
/// raw delta instruction stream waiting in `Waitlist` for its base to show up.
#[derive(Clone, Debug)]
pub struct CacheObject {
    pub info: CacheObjectInfo,
    pub offset: usize,
    pub crc32: u32,
    pub data_decompressed: Vec<u8>,
    pub mem_recorder: Option<Arc<AtomicUsize>>,
    pub is_delta_in_pack: bool,
}

impl CacheObject {
    pub fn mem_size(&self) -> usize {
        self.data_decompressed.len()
    }
}

impl Drop for CacheObject {
    fn drop(&mut self) {
        if let Some(counter) = &self.mem_recorder {
            let size = self.mem_size();
            let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(size))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_recorder_decrements_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        counter.fetch_add(5, Ordering::Relaxed);
        let obj = CacheObject {
            info: CacheObjectInfo::BaseObject(ObjectType::Blob, ObjectHash::default()),
            offset: 12,
            crc32: 0,
            data_decompressed: vec![0u8; 5],
            mem_recorder: Some(counter.clone()),
            is_delta_in_pack: false,
        };
        assert_eq!(obj.mem_size(), 5);
        drop(obj);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
