//! In-memory `RepositoryStorage` implementation used by tests and by short-lived sandboxes
//! that never need objects to survive process exit.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::GitError;
use crate::hash::ObjectHash;

use super::RepositoryStorage;

#[derive(Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<ObjectHash, Vec<u8>>>,
    packs: RwLock<HashMap<String, Vec<u8>>>,
    refs: RwLock<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RepositoryStorage for InMemoryStorage {
    async fn read_object(&self, hash: &ObjectHash) -> Result<Option<Vec<u8>>, GitError> {
        Ok(self.objects.read().unwrap().get(hash).cloned())
    }

    async fn write_object(&self, hash: &ObjectHash, data: &[u8]) -> Result<(), GitError> {
        self.objects.write().unwrap().insert(*hash, data.to_vec());
        Ok(())
    }

    async fn write_pack(&self, pack_id: &str, data: &[u8]) -> Result<(), GitError> {
        self.packs
            .write()
            .unwrap()
            .insert(pack_id.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_ref(&self, name: &str) -> Result<Option<String>, GitError> {
        Ok(self.refs.read().unwrap().get(name).cloned())
    }

    async fn write_ref(&self, name: &str, target: &str) -> Result<(), GitError> {
        self.refs
            .write()
            .unwrap()
            .insert(name.to_string(), target.to_string());
        Ok(())
    }

    async fn delete_ref(&self, name: &str) -> Result<(), GitError> {
        self.refs.write().unwrap().remove(name);
        Ok(())
    }

    async fn list_refs(&self) -> Result<Vec<(String, String)>, GitError> {
        Ok(self
            .refs
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
