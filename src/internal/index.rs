//! Multi-tier object index: tracks where each object's bytes currently live — an in-memory
//! decode cache, the loose-object store, or a specific pack at a specific offset — so lookups
//! don't have to probe every tier in order on every read.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::GitError;
use crate::hash::{ObjectHash, get_hash_kind};

/// Where an object's bytes are currently stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    /// Held in the in-process decode/write cache, not yet flushed to disk.
    Memory,
    /// A loose object file under the object store's fan-out directories.
    Loose,
    /// Packed, at a byte offset within a named pack.
    Pack { pack_id: String, offset: u64 },
}

/// Count and total byte size of indexed objects per storage tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TierStats {
    pub memory: usize,
    pub loose: usize,
    pub pack: usize,
    pub memory_size: u64,
    pub loose_size: u64,
    pub pack_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedEntry {
    location: ObjectLocation,
    size: u64,
}

/// Reject a client-supplied object id that isn't a plausible hash: wrong length, non-hex
/// characters, or a degenerate all-one-character value (a common sign of a truncated or
/// zero-filled id rather than a real hash).
pub fn validate_sha(sha: &str) -> Result<(), GitError> {
    let expected_len = get_hash_kind().hex_len();
    if sha.len() != expected_len {
        return Err(GitError::InvalidSha(format!(
            "expected {expected_len} hex characters, got {} in `{sha}`",
            sha.len()
        )));
    }
    if !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GitError::InvalidSha(format!(
            "`{sha}` contains non-hex characters"
        )));
    }
    let mut chars = sha.chars();
    if let Some(first) = chars.next() {
        if chars.clone().all(|c| c == first) && sha.len() > 1 {
            return Err(GitError::InvalidSha(format!(
                "`{sha}` is a degenerate repeated-character value"
            )));
        }
    }
    Ok(())
}

/// Thread-safe map from object hash to its current storage tier.
pub struct ObjectIndex {
    locations: RwLock<HashMap<ObjectHash, IndexedEntry>>,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self {
            locations: RwLock::new(HashMap::new()),
        }
    }

    /// Record (or overwrite) where `hash` currently lives and how many bytes it occupies.
    pub fn record_location(&self, hash: ObjectHash, location: ObjectLocation, size: u64) {
        self.locations
            .write()
            .unwrap()
            .insert(hash, IndexedEntry { location, size });
    }

    pub fn lookup_location(&self, hash: &ObjectHash) -> Option<ObjectLocation> {
        self.locations
            .read()
            .unwrap()
            .get(hash)
            .map(|entry| entry.location.clone())
    }

    /// Look up several hashes at once under a single read lock.
    pub fn batch_lookup(&self, hashes: &[ObjectHash]) -> HashMap<ObjectHash, ObjectLocation> {
        let guard = self.locations.read().unwrap();
        hashes
            .iter()
            .filter_map(|h| guard.get(h).map(|entry| (*h, entry.location.clone())))
            .collect()
    }

    /// Update the location of an already-indexed object, e.g. when a loose object gets rolled
    /// into a pack during repack. Errors if the object isn't indexed yet.
    pub fn update_location(
        &self,
        hash: &ObjectHash,
        location: ObjectLocation,
    ) -> Result<(), GitError> {
        let mut guard = self.locations.write().unwrap();
        let Some(entry) = guard.get_mut(hash) else {
            return Err(GitError::NotFound(format!("object {hash} not indexed")));
        };
        entry.location = location;
        Ok(())
    }

    pub fn remove(&self, hash: &ObjectHash) -> Option<ObjectLocation> {
        self.locations
            .write()
            .unwrap()
            .remove(hash)
            .map(|entry| entry.location)
    }

    pub fn tier_stats(&self) -> TierStats {
        let guard = self.locations.read().unwrap();
        let mut stats = TierStats::default();
        for entry in guard.values() {
            match entry.location {
                ObjectLocation::Memory => {
                    stats.memory += 1;
                    stats.memory_size += entry.size;
                }
                ObjectLocation::Loose => {
                    stats.loose += 1;
                    stats.loose_size += entry.size;
                }
                ObjectLocation::Pack { .. } => {
                    stats.pack += 1;
                    stats.pack_size += entry.size;
                }
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.locations.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObjectIndex {
    fn default() -> Self {
        Self::new()
    }
}
