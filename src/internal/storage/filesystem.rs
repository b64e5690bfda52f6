//! On-disk storage backend laid out the way a real `.git` directory is: loose objects
//! zlib-compressed under a 2-character fan-out directory, packs under `objects/pack/`, refs as
//! plain files under `refs/` (or `packed-refs` once compacted).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use flate2::{Compression, write::ZlibEncoder};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::errors::GitError;
use crate::hash::ObjectHash;

use super::RepositoryStorage;

pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn loose_object_path(&self, hash: &ObjectHash) -> PathBuf {
        let hex = hash.to_string();
        self.root
            .join("objects")
            .join(&hex[0..2])
            .join(&hex[2..])
    }

    fn pack_path(&self, pack_id: &str) -> PathBuf {
        self.root
            .join("objects")
            .join("pack")
            .join(format!("pack-{pack_id}.pack"))
    }

    fn ref_path(&self, name: &str) -> Result<PathBuf, GitError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(GitError::InvalidName(format!("unsafe ref path: {name}")));
        }
        Ok(self.root.join(name))
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), GitError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(GitError::IOError)?;
        }
        let tmp_path = path.with_extension(format!(
            "tmp-{}",
            std::process::id()
        ));
        fs::write(&tmp_path, data).await.map_err(GitError::IOError)?;
        fs::rename(&tmp_path, path).await.map_err(GitError::IOError)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RepositoryStorage for FilesystemStorage {
    async fn read_object(&self, hash: &ObjectHash) -> Result<Option<Vec<u8>>, GitError> {
        let path = self.loose_object_path(hash);
        match fs::File::open(&path).await {
            Ok(mut file) => {
                let mut compressed = Vec::new();
                file.read_to_end(&mut compressed)
                    .await
                    .map_err(GitError::IOError)?;
                let mut decoder = flate2::read::ZlibDecoder::new(compressed.as_slice());
                let mut data = Vec::new();
                std::io::Read::read_to_end(&mut decoder, &mut data).map_err(GitError::IOError)?;
                Ok(Some(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GitError::IOError(e)),
        }
    }

    async fn write_object(&self, hash: &ObjectHash, data: &[u8]) -> Result<(), GitError> {
        let path = self.loose_object_path(hash);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).map_err(GitError::IOError)?;
        let compressed = encoder.finish().map_err(GitError::IOError)?;
        Self::write_atomic(&path, &compressed).await
    }

    async fn write_pack(&self, pack_id: &str, data: &[u8]) -> Result<(), GitError> {
        let path = self.pack_path(pack_id);
        Self::write_atomic(&path, data).await
    }

    async fn read_ref(&self, name: &str) -> Result<Option<String>, GitError> {
        let path = self.ref_path(name)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content.trim_end().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GitError::IOError(e)),
        }
    }

    async fn write_ref(&self, name: &str, target: &str) -> Result<(), GitError> {
        let path = self.ref_path(name)?;
        Self::write_atomic(&path, format!("{target}\n").as_bytes()).await
    }

    async fn delete_ref(&self, name: &str) -> Result<(), GitError> {
        let path = self.ref_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GitError::IOError(e)),
        }
    }

    async fn list_refs(&self) -> Result<Vec<(String, String)>, GitError> {
        let refs_dir = self.root.join("refs");
        let mut results = Vec::new();
        let mut stack = vec![refs_dir];
        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(GitError::IOError(e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(GitError::IOError)? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let name = path
                        .strip_prefix(&self.root)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/");
                    if let Some(target) = self.read_ref(&name).await? {
                        results.push((name, target));
                    }
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::object::types::ObjectType;

    #[tokio::test]
    async fn object_round_trips_through_zlib_loose_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        let data = b"hello filesystem storage".to_vec();
        let hash = ObjectHash::from_type_and_data(ObjectType::Blob, &data);

        assert!(storage.read_object(&hash).await.unwrap().is_none());
        storage.write_object(&hash, &data).await.unwrap();
        let read_back = storage.read_object(&hash).await.unwrap().unwrap();
        assert_eq!(read_back, data);
    }

    #[tokio::test]
    async fn ref_round_trips_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        storage
            .write_ref("refs/heads/main", "deadbeef")
            .await
            .unwrap();
        assert_eq!(
            storage.read_ref("refs/heads/main").await.unwrap(),
            Some("deadbeef".to_string())
        );

        let refs = storage.list_refs().await.unwrap();
        assert_eq!(refs, vec![("refs/heads/main".to_string(), "deadbeef".to_string())]);

        storage.delete_ref("refs/heads/main").await.unwrap();
        assert_eq!(storage.read_ref("refs/heads/main").await.unwrap(), None);
    }
}
