//! Read-only projections over a repository, for command-line front-ends, diff engines, review
//! UIs, and other tool hosts: resolving names to object hashes, reading individual objects,
//! walking commit history, and listing branches/tags.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::index::{ObjectIndex, TierStats};
use crate::internal::object::commit::Commit;
use crate::internal::object::tree::{Tree, TreeItem};
use crate::internal::object::{ObjectTrait, ObjectType};
use crate::internal::refs::RefStore;
use crate::internal::storage::RepositoryStorage;

/// Store bytes are the loose-object wire format: `"{type} {size}\0{content}"`, matching what a
/// real `.git/objects` loose file holds. Splits off the header and reports the type.
fn split_object_header(raw: &[u8]) -> Result<(ObjectType, Vec<u8>), GitError> {
    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| GitError::CorruptObject("missing NUL after object header".to_string()))?;
    let header = std::str::from_utf8(&raw[..nul])
        .map_err(|e| GitError::CorruptObject(format!("non-utf8 object header: {e}")))?;
    let (type_str, _size_str) = header
        .split_once(' ')
        .ok_or_else(|| GitError::CorruptObject(format!("malformed object header `{header}`")))?;
    let obj_type = ObjectType::from_string(type_str)
        .map_err(|_| GitError::CorruptObject(format!("unknown object type `{type_str}`")))?;
    Ok((obj_type, raw[nul + 1..].to_vec()))
}

/// A single entry in a tree listing, detached from the `Tree` object's own representation so
/// query callers don't need to depend on `internal::object` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: &'static str,
    pub hash: ObjectHash,
    pub name: String,
    pub is_tree: bool,
}

impl From<&TreeItem> for TreeEntry {
    fn from(item: &TreeItem) -> Self {
        TreeEntry {
            mode: std::str::from_utf8(item.mode.to_bytes()).unwrap_or("100644"),
            hash: item.id,
            name: item.name.clone(),
            is_tree: item.mode.is_tree(),
        }
    }
}

/// A projection of `Commit` convenient for history walks and log-style display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: ObjectHash,
    pub tree_id: ObjectHash,
    pub parent_ids: Vec<ObjectHash>,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_timestamp: i64,
    pub message: String,
}

impl From<Commit> for CommitRecord {
    fn from(commit: Commit) -> Self {
        CommitRecord {
            id: commit.id,
            tree_id: commit.tree_id,
            parent_ids: commit.parent_commit_ids,
            author_name: commit.author.name,
            author_email: commit.author.email,
            committer_name: commit.committer.name,
            committer_email: commit.committer.email,
            committer_timestamp: commit.committer.timestamp,
            message: commit.message,
        }
    }
}

/// Filters accepted by `walk_commits`. All fields are optional; an unset filter imposes no
/// constraint.
#[derive(Debug, Clone, Default)]
pub struct WalkCommitsQuery {
    pub from: Option<ObjectHash>,
    pub max: Option<usize>,
    pub author: Option<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub grep: Option<String>,
}

/// Sort order for `list_tags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSort {
    #[default]
    Name,
    Date,
}

/// Byte-level breakdown of how many objects (and how many bytes) currently live in each storage
/// tier, named to match the spec's cloud-tiering vocabulary: `hot` (in-memory), `r2` (loose
/// object files), `parquet` (packed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectStatsByTier {
    pub hot_count: usize,
    pub r2_count: usize,
    pub parquet_count: usize,
    pub hot_size: u64,
    pub r2_size: u64,
    pub parquet_size: u64,
}

impl From<TierStats> for ObjectStatsByTier {
    fn from(stats: TierStats) -> Self {
        ObjectStatsByTier {
            hot_count: stats.memory,
            r2_count: stats.loose,
            parquet_count: stats.pack,
            hot_size: stats.memory_size,
            r2_size: stats.loose_size,
            parquet_size: stats.pack_size,
        }
    }
}

/// Read-only query surface over a repository's refs, objects, and object index.
pub struct GitQuery<S: RepositoryStorage> {
    storage: Arc<S>,
    refs: RefStore<S>,
    index: Arc<ObjectIndex>,
}

impl<S: RepositoryStorage> GitQuery<S> {
    pub fn new(storage: Arc<S>, index: Arc<ObjectIndex>) -> Self {
        let refs = RefStore::new(storage.clone());
        Self {
            storage,
            refs,
            index,
        }
    }

    /// Resolve a ref name or a raw hex hash to its final object hash.
    pub async fn resolve(&self, name: &str) -> Result<ObjectHash, GitError> {
        if crate::internal::index::validate_sha(name).is_ok() {
            if let Ok(hash) = name.parse::<ObjectHash>() {
                return Ok(hash);
            }
        }
        let resolved = self.refs.resolve(name).await?;
        resolved
            .final_sha
            .parse()
            .map_err(|_| GitError::InvalidSha(resolved.final_sha))
    }

    async fn read_raw(&self, hash: &ObjectHash) -> Result<Vec<u8>, GitError> {
        self.storage
            .read_object(hash)
            .await?
            .ok_or_else(|| GitError::ObjectNotFound(hash.to_string()))
    }

    pub async fn read_blob(&self, hash: &ObjectHash) -> Result<Vec<u8>, GitError> {
        let raw = self.read_raw(hash).await?;
        let (obj_type, content) = split_object_header(&raw)?;
        if obj_type != ObjectType::Blob {
            return Err(GitError::InvalidObjectType(format!(
                "{hash} is a {obj_type}, not a blob"
            )));
        }
        Ok(content)
    }

    pub async fn read_tree(&self, hash: &ObjectHash) -> Result<Vec<TreeEntry>, GitError> {
        let raw = self.read_raw(hash).await?;
        let (obj_type, content) = split_object_header(&raw)?;
        if obj_type != ObjectType::Tree {
            return Err(GitError::InvalidObjectType(format!(
                "{hash} is a {obj_type}, not a tree"
            )));
        }
        let tree = Tree::from_bytes(&content, *hash)?;
        Ok(tree.tree_items.iter().map(TreeEntry::from).collect())
    }

    pub async fn read_commit(&self, hash: &ObjectHash) -> Result<CommitRecord, GitError> {
        let raw = self.read_raw(hash).await?;
        let (obj_type, content) = split_object_header(&raw)?;
        if obj_type != ObjectType::Commit {
            return Err(GitError::InvalidObjectType(format!(
                "{hash} is a {obj_type}, not a commit"
            )));
        }
        let commit = Commit::from_bytes(&content, *hash)?;
        Ok(commit.into())
    }

    /// Walk commit ancestry starting at `query.from` (or `HEAD` if unset), topologically —
    /// children before parents — tie-broken by committer timestamp descending, applying every
    /// filter in `query` before a commit is yielded. Collected eagerly; `max` bounds how many
    /// pass the filters.
    pub async fn walk_commits(
        &self,
        query: WalkCommitsQuery,
    ) -> Result<Vec<CommitRecord>, GitError> {
        let start = match query.from {
            Some(hash) => hash,
            None => self.resolve("HEAD").await?,
        };

        let mut visited = HashSet::new();
        let mut pending = VecDeque::from([start]);
        let mut ready = Vec::new();

        while let Some(hash) = pending.pop_front() {
            if !visited.insert(hash) {
                continue;
            }
            let commit = self.read_commit(&hash).await?;
            for parent in &commit.parent_ids {
                pending.push_back(*parent);
            }
            ready.push(commit);
        }

        ready.sort_by(|a, b| b.committer_timestamp.cmp(&a.committer_timestamp));

        let matches = |commit: &CommitRecord| {
            if let Some(author) = &query.author {
                if !commit.author_name.contains(author.as_str())
                    && !commit.author_email.contains(author.as_str())
                {
                    return false;
                }
            }
            if let Some(since) = query.since {
                if commit.committer_timestamp < since {
                    return false;
                }
            }
            if let Some(until) = query.until {
                if commit.committer_timestamp > until {
                    return false;
                }
            }
            if let Some(grep) = &query.grep {
                if !commit.message.contains(grep.as_str()) {
                    return false;
                }
            }
            true
        };

        let mut results: Vec<CommitRecord> = ready.into_iter().filter(matches).collect();
        if let Some(max) = query.max {
            results.truncate(max);
        }
        Ok(results)
    }

    /// List branches (`refs/heads/*`, plus `refs/remotes/*` when `include_remotes`), optionally
    /// filtered by glob `pattern`, as (name, target sha) pairs sorted by name.
    pub async fn list_branches(
        &self,
        pattern: Option<&str>,
        include_remotes: bool,
    ) -> Result<Vec<(String, String)>, GitError> {
        let mut refs = self.refs.list_refs().await?;
        refs.retain(|(name, _)| {
            name.starts_with("refs/heads/")
                || (include_remotes && name.starts_with("refs/remotes/"))
        });
        if let Some(pattern) = pattern {
            refs.retain(|(name, _)| crate::internal::protection::glob_match(pattern, name));
        }
        refs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(refs)
    }

    /// List tags (`refs/tags/*`), optionally filtered by glob `pattern`, sorted by `sort`.
    /// `TagSort::Name` sorts lexically; `TagSort::Date` requires the tag to resolve to a commit
    /// and sorts by that commit's committer timestamp, newest first.
    pub async fn list_tags(
        &self,
        pattern: Option<&str>,
        sort: TagSort,
    ) -> Result<Vec<(String, String)>, GitError> {
        let mut refs = self.refs.list_refs().await?;
        refs.retain(|(name, _)| name.starts_with("refs/tags/"));
        if let Some(pattern) = pattern {
            refs.retain(|(name, _)| crate::internal::protection::glob_match(pattern, name));
        }
        match sort {
            TagSort::Name => refs.sort_by(|a, b| a.0.cmp(&b.0)),
            TagSort::Date => {
                let mut dated = Vec::with_capacity(refs.len());
                for (name, target) in refs {
                    let mut timestamp = 0;
                    if let Ok(hash) = target.parse::<ObjectHash>() {
                        if let Ok(commit) = self.read_commit(&hash).await {
                            timestamp = commit.committer_timestamp;
                        }
                    }
                    dated.push((timestamp, name, target));
                }
                dated.sort_by(|a, b| b.0.cmp(&a.0));
                refs = dated.into_iter().map(|(_, name, target)| (name, target)).collect();
            }
        }
        Ok(refs)
    }

    pub fn object_stats_by_tier(&self) -> ObjectStatsByTier {
        self.index.tier_stats().into()
    }
}
