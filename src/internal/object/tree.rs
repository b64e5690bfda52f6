//! A tree lists the entries of a directory: each entry pairs a file mode and name with the
//! hash of the blob or sub-tree it points to.

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::{ObjectTrait, ObjectType};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, Decode, Encode)]
pub enum TreeItemMode {
    Blob,
    BlobExecutable,
    Link,
    Tree,
    Commit,
}

impl TreeItemMode {
    pub fn to_bytes(self) -> &'static [u8] {
        match self {
            TreeItemMode::Blob => b"100644",
            TreeItemMode::BlobExecutable => b"100755",
            TreeItemMode::Link => b"120000",
            TreeItemMode::Tree => b"40000",
            TreeItemMode::Commit => b"160000",
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GitError> {
        match bytes {
            b"100644" => Ok(TreeItemMode::Blob),
            b"100755" => Ok(TreeItemMode::BlobExecutable),
            b"120000" => Ok(TreeItemMode::Link),
            b"40000" | b"040000" => Ok(TreeItemMode::Tree),
            b"160000" => Ok(TreeItemMode::Commit),
            _ => Err(GitError::InvalidTreeItem(format!(
                "invalid tree entry mode: {}",
                String::from_utf8_lossy(bytes)
            ))),
        }
    }

    pub fn is_tree(self) -> bool {
        matches!(self, TreeItemMode::Tree)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct TreeItem {
    pub mode: TreeItemMode,
    pub id: ObjectHash,
    pub name: String,
}

impl TreeItem {
    pub fn new(mode: TreeItemMode, id: ObjectHash, name: String) -> Self {
        TreeItem { mode, id, name }
    }
}

#[derive(Eq, Debug, Clone, Serialize, Deserialize, Decode, Encode)]
pub struct Tree {
    pub id: ObjectHash,
    pub tree_items: Vec<TreeItem>,
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for item in &self.tree_items {
            writeln!(
                f,
                "{:06}\t{}\t{}\t{}",
                String::from_utf8_lossy(item.mode.to_bytes()),
                if item.mode.is_tree() { "tree" } else { "blob" },
                item.id,
                item.name
            )?;
        }
        Ok(())
    }
}

impl Tree {
    /// Build a tree from its entries, validating there are no duplicate names and that
    /// entries are empty trees are rejected (an empty tree is represented by zero items).
    pub fn from_tree_items(mut tree_items: Vec<TreeItem>) -> Result<Self, GitError> {
        if tree_items.is_empty() {
            return Err(GitError::EmptyTreeItems("tree must have at least one entry".to_string()));
        }
        tree_items.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in tree_items.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(GitError::InvalidTreeItem(format!(
                    "duplicate tree entry name: {}",
                    pair[0].name
                )));
            }
        }
        let mut tree = Tree {
            id: ObjectHash::default(),
            tree_items,
        };
        let data = tree.to_data()?;
        tree.id = ObjectHash::from_type_and_data(ObjectType::Tree, &data);
        Ok(tree)
    }
}

impl ObjectTrait for Tree {
    fn from_bytes(data: &[u8], hash: ObjectHash) -> Result<Self, GitError>
    where
        Self: Sized,
    {
        let mut tree_items = Vec::new();
        let mut cursor = data;
        let hash_len = crate::hash::get_hash_kind().size();

        while !cursor.is_empty() {
            let space = cursor
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| GitError::InvalidTreeItem("missing mode separator".to_string()))?;
            let mode = TreeItemMode::from_bytes(&cursor[..space])?;

            let nul = cursor[space + 1..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| GitError::InvalidTreeItem("missing name terminator".to_string()))?;
            let name = String::from_utf8(cursor[space + 1..space + 1 + nul].to_vec())
                .map_err(|e| GitError::InvalidTreeItem(e.to_string()))?;

            let hash_start = space + 1 + nul + 1;
            let hash_end = hash_start + hash_len;
            if hash_end > cursor.len() {
                return Err(GitError::InvalidTreeItem(
                    "truncated tree entry hash".to_string(),
                ));
            }
            let id = ObjectHash::from_bytes(&cursor[hash_start..hash_end])
                .map_err(GitError::InvalidTreeItem)?;

            tree_items.push(TreeItem::new(mode, id, name));
            cursor = &cursor[hash_end..];
        }

        Ok(Tree {
            id: hash,
            tree_items,
        })
    }

    fn get_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn get_size(&self) -> usize {
        self.to_data().map(|d| d.len()).unwrap_or(0)
    }

    fn to_data(&self) -> Result<Vec<u8>, GitError> {
        let mut data = Vec::new();
        for item in &self.tree_items {
            data.extend(item.mode.to_bytes());
            data.push(b' ');
            data.extend(item.name.as_bytes());
            data.push(0);
            data.extend(item.id.to_data());
        }
        Ok(data)
    }
}

impl FromStr for TreeItemMode {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TreeItemMode::from_bytes(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashKind, set_hash_kind_for_test};

    #[test]
    fn test_tree_roundtrip() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let blob_id = ObjectHash::from_type_and_data(ObjectType::Blob, b"hello");
        let item = TreeItem::new(TreeItemMode::Blob, blob_id, "hello.txt".to_string());
        let tree = Tree::from_tree_items(vec![item]).unwrap();

        let data = tree.to_data().unwrap();
        let parsed = Tree::from_bytes(&data, tree.id).unwrap();
        assert_eq!(parsed.tree_items.len(), 1);
        assert_eq!(parsed.tree_items[0].name, "hello.txt");
        assert_eq!(parsed.tree_items[0].id, blob_id);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let id = ObjectHash::from_type_and_data(ObjectType::Blob, b"a");
        let items = vec![
            TreeItem::new(TreeItemMode::Blob, id, "same".to_string()),
            TreeItem::new(TreeItemMode::Blob, id, "same".to_string()),
        ];
        assert!(Tree::from_tree_items(items).is_err());
    }
}
