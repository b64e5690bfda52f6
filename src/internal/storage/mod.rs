//! Storage backend abstraction: where loose-object, pack, and ref bytes actually live.
//! `FilesystemStorage` lays objects out the way a real `.git` directory does (zlib-compressed
//! loose objects under a 2-character fan-out, packs under `objects/pack/`, refs as plain files
//! under `refs/`); `InMemoryStorage` is the equivalent for tests.

pub mod filesystem;
pub mod memory;

use crate::errors::GitError;
use crate::hash::ObjectHash;

pub use filesystem::FilesystemStorage;
pub use memory::InMemoryStorage;

/// Durable storage for object and ref bytes. Implementations must be safe to share across
/// concurrent async tasks; callers serialize ref updates themselves via compare-and-swap.
#[async_trait::async_trait]
pub trait RepositoryStorage: Send + Sync {
    /// Read a single object's raw (uncompressed) bytes, if present.
    async fn read_object(&self, hash: &ObjectHash) -> Result<Option<Vec<u8>>, GitError>;

    /// Write a single loose object's raw bytes, keyed by its hash.
    async fn write_object(&self, hash: &ObjectHash, data: &[u8]) -> Result<(), GitError>;

    /// Whether an object exists in any tier this backend is responsible for.
    async fn has_object(&self, hash: &ObjectHash) -> Result<bool, GitError> {
        Ok(self.read_object(hash).await?.is_some())
    }

    /// Persist a complete pack file's bytes under `pack_id`.
    async fn write_pack(&self, pack_id: &str, data: &[u8]) -> Result<(), GitError>;

    /// Read a ref's current target value (a hash, or `ref: <other-ref>` for a symbolic ref).
    async fn read_ref(&self, name: &str) -> Result<Option<String>, GitError>;

    /// Overwrite a ref's target unconditionally. Callers wanting compare-and-swap semantics
    /// should read-then-write under their own lock, or use `internal::refs::RefStore`.
    async fn write_ref(&self, name: &str, target: &str) -> Result<(), GitError>;

    async fn delete_ref(&self, name: &str) -> Result<(), GitError>;

    /// List every ref this backend knows about as (name, target) pairs.
    async fn list_refs(&self) -> Result<Vec<(String, String)>, GitError>;
}
