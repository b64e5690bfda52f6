//! A blob stores the raw content of a single file, with no name or mode attached to it.
//! The same content always hashes to the same blob regardless of which file it came from.

use std::fmt::Display;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::{ObjectTrait, ObjectType};

#[derive(Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Blob {
    pub id: ObjectHash,
    pub data: Vec<u8>,
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.data))
    }
}

impl Blob {
    pub fn from_content(content: &str) -> Self {
        let data = content.as_bytes();
        let id = ObjectHash::from_type_and_data(ObjectType::Blob, data);
        Blob {
            id,
            data: data.to_vec(),
        }
    }
}

impl ObjectTrait for Blob {
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized,
    {
        Ok(Blob {
            id: hash,
            data: data.to_vec(),
        })
    }

    fn get_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn get_size(&self) -> usize {
        self.data.len()
    }

    fn to_data(&self) -> Result<Vec<u8>, GitError> {
        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_content_hashes_deterministically() {
        let a = Blob::from_content("hello world");
        let b = Blob::from_content("hello world");
        assert_eq!(a.id, b.id);

        let c = Blob::from_content("hello world!");
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_from_bytes_preserves_data() {
        let blob = Blob::from_content("payload");
        let reparsed = Blob::from_bytes(&blob.data, blob.id).unwrap();
        assert_eq!(reparsed.data, b"payload");
    }
}
