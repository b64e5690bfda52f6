//! Reference storage: loose + packed refs, symbolic-ref resolution, compare-and-swap updates,
//! and packed-refs compaction, layered on top of a `RepositoryStorage` backend.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::errors::GitError;
use crate::internal::storage::RepositoryStorage;

const MAX_SYMBOLIC_DEPTH: usize = 10;
const SYMBOLIC_PREFIX: &str = "ref: ";

/// Kind of ref value as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    Direct(String),
    Symbolic(String),
}

/// A resolved ref: the name it was looked up under, its current value, and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    pub name: String,
    pub value: RefValue,
}

/// Result of following symbolic refs to their final direct target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub final_ref: String,
    pub final_sha: String,
    pub chain: Vec<String>,
}

/// Options controlling `RefStore::update_ref` semantics.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub create: bool,
    pub old_value: Option<String>,
    pub force: bool,
}

/// Reject a ref name that doesn't follow git's own naming rules.
pub fn validate_ref_name(name: &str) -> Result<(), GitError> {
    if name == "HEAD" {
        return Ok(());
    }
    if name.is_empty() || name == "@" {
        return Err(GitError::InvalidName(format!("`{name}` is empty or `@`")));
    }
    if !name.starts_with("refs/") {
        return Err(GitError::InvalidName(format!(
            "`{name}` must start with `refs/` (or be exactly `HEAD`)"
        )));
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return Err(GitError::InvalidName(format!(
            "`{name}` has a leading/trailing/doubled slash"
        )));
    }
    if name.contains("..") || name.contains("@{") {
        return Err(GitError::InvalidName(format!(
            "`{name}` contains `..` or `@{{`"
        )));
    }
    const FORBIDDEN: &[char] = &[' ', '~', '^', ':', '?', '*', '[', '\\'];
    if name.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control()) {
        return Err(GitError::InvalidName(format!(
            "`{name}` contains a forbidden character"
        )));
    }
    for component in name.split('/') {
        if component.starts_with('.') || component.ends_with(".lock") {
            return Err(GitError::InvalidName(format!(
                "`{name}` has a component starting with `.` or ending in `.lock`"
            )));
        }
    }
    Ok(())
}

fn parse_ref_value(raw: &str) -> RefValue {
    match raw.strip_prefix(SYMBOLIC_PREFIX) {
        Some(target) => RefValue::Symbolic(target.trim().to_string()),
        None => RefValue::Direct(raw.trim().to_string()),
    }
}

/// Front door for ref reads/writes/compaction. Per-ref locking is approximated with a single
/// store-wide mutex serializing updates; reads are lock-free against the backend.
pub struct RefStore<S: RepositoryStorage> {
    storage: Arc<S>,
    update_lock: Mutex<()>,
}

impl<S: RepositoryStorage> RefStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            update_lock: Mutex::new(()),
        }
    }

    /// Shared handle to the underlying storage backend, for callers that need to compose a
    /// `RefStore` with other components reading the same repository.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub async fn get_ref(&self, name: &str) -> Result<Option<RefEntry>, GitError> {
        match self.storage.read_ref(name).await? {
            Some(raw) => Ok(Some(RefEntry {
                name: name.to_string(),
                value: parse_ref_value(&raw),
            })),
            None => Ok(None),
        }
    }

    /// Follow symbolic refs starting at `name` until a direct sha is reached.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedRef, GitError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = name.to_string();

        loop {
            if chain.len() >= MAX_SYMBOLIC_DEPTH {
                return Err(GitError::MaxDepthExceeded(format!(
                    "symbolic ref chain from `{name}` exceeds {MAX_SYMBOLIC_DEPTH}"
                )));
            }
            if !visited.insert(current.clone()) {
                return Err(GitError::CircularRef(format!(
                    "symbolic ref cycle detected resolving `{name}`"
                )));
            }
            chain.push(current.clone());

            let raw = self
                .storage
                .read_ref(&current)
                .await?
                .ok_or_else(|| GitError::NotFound(format!("ref `{current}` not found")))?;

            match parse_ref_value(&raw) {
                RefValue::Direct(sha) => {
                    return Ok(ResolvedRef {
                        final_ref: current,
                        final_sha: sha,
                        chain,
                    });
                }
                RefValue::Symbolic(target) => current = target,
            }
        }
    }

    pub async fn update_ref(
        &self,
        name: &str,
        new_sha: &str,
        opts: UpdateOptions,
    ) -> Result<(), GitError> {
        validate_ref_name(name)?;
        crate::internal::index::validate_sha(new_sha)?;

        let _guard = self.update_lock.lock().unwrap();
        let current = self.storage.read_ref(name).await?;

        match (&opts.old_value, &current) {
            (None, Some(_)) if !opts.create => {
                return Err(GitError::AlreadyExists(format!(
                    "ref `{name}` already exists; pass `create` to overwrite"
                )));
            }
            (None, None) if !opts.create => {
                return Err(GitError::InvalidArgument(format!(
                    "ref `{name}` does not exist; pass `create` to create it"
                )));
            }
            (Some(expected), actual) => {
                let actual_sha = actual.as_deref();
                if actual_sha != Some(expected.as_str()) {
                    return Err(GitError::Conflict(format!(
                        "ref `{name}` changed: expected `{expected}`, found `{actual_sha:?}`"
                    )));
                }
            }
            _ => {}
        }

        self.storage.write_ref(name, new_sha).await
    }

    pub async fn update_symbolic_ref(&self, name: &str, target: &str) -> Result<(), GitError> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        if name == target {
            return Err(GitError::InvalidArgument(format!(
                "symbolic ref `{name}` cannot target itself"
            )));
        }
        let _guard = self.update_lock.lock().unwrap();
        self.storage
            .write_ref(name, &format!("{SYMBOLIC_PREFIX}{target}"))
            .await
    }

    pub async fn delete_ref(
        &self,
        name: &str,
        old_value: Option<&str>,
    ) -> Result<(), GitError> {
        if name == "HEAD" {
            return Err(GitError::InvalidArgument("refusing to delete HEAD".to_string()));
        }
        let _guard = self.update_lock.lock().unwrap();
        if let Some(expected) = old_value {
            let actual = self.storage.read_ref(name).await?;
            if actual.as_deref() != Some(expected) {
                return Err(GitError::Conflict(format!(
                    "ref `{name}` changed: expected `{expected}`, found `{actual:?}`"
                )));
            }
        }
        self.storage.delete_ref(name).await
    }

    /// Write a sorted `packed-refs` style snapshot and report how many refs were compacted.
    /// The backing `RepositoryStorage` trait stores one ref per key, so "compaction" here means
    /// producing the canonical sorted text blob a real on-disk `packed-refs` file would hold;
    /// callers that want the loose files physically removed do so through the storage backend.
    pub async fn pack_refs(&self) -> Result<String, GitError> {
        let _guard = self.update_lock.lock().unwrap();
        let mut refs = self.storage.list_refs().await?;
        refs.retain(|(name, value)| name != "HEAD" && !value.starts_with(SYMBOLIC_PREFIX));
        refs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::from("# pack-refs with: peeled fully-peeled sorted\n");
        for (name, sha) in &refs {
            out.push_str(sha);
            out.push(' ');
            out.push_str(name);
            out.push('\n');
        }
        Ok(out)
    }

    pub async fn list_refs(&self) -> Result<Vec<(String, String)>, GitError> {
        self.storage.list_refs().await
    }
}
