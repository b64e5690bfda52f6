//! An annotated tag names another object (almost always a commit) and carries a tagger
//! identity, a message, and optionally a PGP signature appended to the message.

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::signature::{Signature, SignatureType};
use crate::internal::object::{ObjectTrait, ObjectType};

#[derive(Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Tag {
    pub id: ObjectHash,
    pub object_hash: ObjectHash,
    pub object_type: ObjectType,
    pub tag_name: String,
    pub tagger: Signature,
    pub message: String,
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "object {}", self.object_hash)?;
        writeln!(f, "type {}", self.object_type)?;
        writeln!(f, "tag {}", self.tag_name)?;
        writeln!(f, "tagger {}", self.tagger)?;
        write!(f, "{}", self.message)
    }
}

impl Tag {
    pub fn new(
        object_hash: ObjectHash,
        object_type: ObjectType,
        tag_name: String,
        tagger: Signature,
        message: String,
    ) -> Self {
        let mut tag = Tag {
            id: ObjectHash::default(),
            object_hash,
            object_type,
            tag_name,
            tagger,
            message,
        };
        let data = tag.to_data().unwrap();
        tag.id = ObjectHash::from_type_and_data(ObjectType::Tag, &data);
        tag
    }
}

impl ObjectTrait for Tag {
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized,
    {
        let mut cursor = data;

        let object_end = cursor
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing object line".to_string()))?;
        let object_hash = ObjectHash::from_str(
            std::str::from_utf8(&cursor[7..object_end]) // "object "
                .map_err(|e| GitError::InvalidTagObject(e.to_string()))?,
        )
        .map_err(GitError::InvalidTagObject)?;
        cursor = &cursor[object_end + 1..];

        let type_end = cursor
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing type line".to_string()))?;
        let object_type = ObjectType::from_string(
            std::str::from_utf8(&cursor[5..type_end]) // "type "
                .map_err(|e| GitError::InvalidTagObject(e.to_string()))?,
        )?;
        cursor = &cursor[type_end + 1..];

        let tag_end = cursor
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing tag line".to_string()))?;
        let tag_name = String::from_utf8(cursor[4..tag_end].to_vec()) // "tag "
            .map_err(|e| GitError::InvalidTagObject(e.to_string()))?;
        cursor = &cursor[tag_end + 1..];

        let tagger_end = cursor
            .find_byte(0x0a)
            .ok_or_else(|| GitError::InvalidTagObject("missing tagger line".to_string()))?;
        let tagger = Signature::from_data(cursor[..tagger_end].to_vec())
            .map_err(|e| GitError::InvalidTagObject(e.to_string()))?;
        cursor = &cursor[tagger_end + 1..];

        // A blank line separates the header block from the message.
        let message = if cursor.first() == Some(&0x0a) {
            String::from_utf8_lossy(&cursor[1..]).into_owned()
        } else {
            String::from_utf8_lossy(cursor).into_owned()
        };

        Ok(Tag {
            id: hash,
            object_hash,
            object_type,
            tag_name,
            tagger,
            message,
        })
    }

    fn get_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn get_size(&self) -> usize {
        self.to_data().map(|d| d.len()).unwrap_or(0)
    }

    fn to_data(&self) -> Result<Vec<u8>, GitError> {
        let mut data = Vec::new();
        data.extend(b"object ");
        data.extend(self.object_hash.to_string().as_bytes());
        data.push(0x0a);
        data.extend(b"type ");
        data.extend(self.object_type.to_string().as_bytes());
        data.push(0x0a);
        data.extend(b"tag ");
        data.extend(self.tag_name.as_bytes());
        data.push(0x0a);
        data.extend(self.tagger.to_data()?);
        data.push(0x0a);
        data.push(0x0a);
        data.extend(self.message.as_bytes());
        Ok(data)
    }
}
