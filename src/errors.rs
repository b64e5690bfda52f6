//! Error types for the Git-Internal crate.
//!
//! This module defines a unified error enumeration used across object parsing,
//! pack encoding/decoding, index handling, caching, and streaming. It integrates
//! with `thiserror` to provide rich `Display` implementations and error source
//! chaining where applicable.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Variants cover parse/validation, I/O, encoding/decoding, network/auth,
//!   and custom errors.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the Git-Internal library.
///
/// - Used across object parsing, pack encode/decode, index, caching and streams.
/// - Implements `std::error::Error` via `thiserror`.
pub enum GitError {
    /// Invalid or unsupported git object type name.
    #[error("The `{0}` is not a valid git object type.")]
    InvalidObjectType(String),

    /// Malformed or unsupported blob object encoding.
    #[error("The `{0}` is not a valid git blob object.")]
    InvalidBlobObject(String),

    /// Malformed tree object.
    #[error("Not a valid git tree object.")]
    InvalidTreeObject,

    /// Invalid tree entry (mode/name/hash).
    #[error("The `{0}` is not a valid git tree item.")]
    InvalidTreeItem(String),

    /// Tree contains no entries.
    #[error("`{0}`.")]
    EmptyTreeItems(String),

    /// Invalid commit signature type.
    #[error("The `{0}` is not a valid git commit signature.")]
    InvalidSignatureType(String),

    /// Malformed commit object.
    #[error("Not a valid git commit object.")]
    InvalidCommitObject,

    /// Commit parse or validation failed.
    #[error("Invalid Commit: {0}")]
    InvalidCommit(String),

    /// Malformed tag object.
    #[error("Not a valid git tag object: {0}")]
    InvalidTagObject(String),

    /// Malformed note object.
    #[error("Not a valid git note object: {0}")]
    InvalidNoteObject(String),

    /// Malformed or unsupported index (.idx) file.
    #[error("The `{0}` is not a valid idx file.")]
    InvalidIdxFile(String),

    /// Malformed or unsupported pack file.
    #[error("The `{0}` is not a valid pack file.")]
    InvalidPackFile(String),

    /// Invalid pack header magic or version.
    #[error("The `{0}` is not a valid pack header.")]
    InvalidPackHeader(String),

    /// Malformed or unsupported git index file.
    #[error("The `{0}` is not a valid index file.")]
    InvalidIndexFile(String),

    /// Invalid git index header.
    #[error("The `{0}` is not a valid index header.")]
    InvalidIndexHeader(String),

    /// Invalid CLI or function argument.
    #[error("Argument parse failed: {0}")]
    InvalidArgument(String),

    /// I/O error from underlying reader or writer.
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    /// Invalid SHA1 hash formatting or value.
    #[error("The {0} is not a valid Hash value ")]
    InvalidHashValue(String),

    /// Delta object reconstruction error.
    #[error("Delta Object Error Info:{0}")]
    DeltaObjectError(String),

    /// Object not fully populated for packing.
    #[error("The object to be packed is incomplete ,{0}")]
    UnCompletedPackObject(String),

    /// Invalid decoded object info.
    #[error("Error decode in the Object ,info:{0}")]
    InvalidObjectInfo(String),

    /// Hash not found in current file context.
    #[error("Cannot find Hash value: {0} from current file")]
    NotFoundHashValue(String),

    /// Failed to encode object to bytes.
    #[error("Can't encode the object which id [{0}] to bytes")]
    EncodeObjectError(String),

    /// Text encoding or UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    ConversionError(String),

    /// Invalid path when locating parent tree.
    #[error("Can't find parent tree by path: {0}")]
    InvalidPathError(String),

    /// Failed to encode pack entries.
    #[error("Can't encode entries to pack: {0}")]
    PackEncodeError(String),

    /// Object missing from caches or storage.
    #[error("Can't find specific object: {0}")]
    ObjectNotFound(String),

    /// Repository not found.
    #[error("Repository not found")]
    RepoNotFound,

    /// Unauthorized access.
    #[error("UnAuthorized: {0}")]
    UnAuthorized(String),

    /// Network communication error.
    #[error("Network Error: {0}")]
    NetworkError(String),

    /// Generic custom error for miscellaneous failures.
    #[error("{0}")]
    CustomError(String),

    /// Referenced object, ref, or repository does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Creation refused because the target already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Ref name fails Git's validation rules.
    #[error("Invalid ref name: {0}")]
    InvalidName(String),

    /// Malformed or wrong-length SHA supplied by a client.
    #[error("Invalid sha: {0}")]
    InvalidSha(String),

    /// Target ref or object is locked by a concurrent operation.
    #[error("Locked: {0}")]
    Locked(String),

    /// Compare-and-swap update lost a race against another writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Symbolic-ref resolution looped back on itself.
    #[error("Circular reference: {0}")]
    CircularRef(String),

    /// Symbolic-ref resolution exceeded the maximum chain depth.
    #[error("Max depth exceeded: {0}")]
    MaxDepthExceeded(String),

    /// Object bytes failed hash verification or structural validation.
    #[error("Corrupt object: {0}")]
    CorruptObject(String),

    /// Pack bytes failed checksum or structural validation.
    #[error("Corrupt pack: {0}")]
    CorruptPack(String),

    /// Client requested a protocol or pack version this server does not support.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    /// Incoming pack exceeded a configured size or object-count limit.
    #[error("Pack limit exceeded: {0}")]
    PackLimitExceeded(String),

    /// Push was rejected because it is not a fast-forward of the current ref value.
    #[error("Non-fast-forward update: {0}")]
    NonFastForward(String),

    /// Push was rejected by a branch protection rule.
    #[error("Protected ref: {0}")]
    Protected(String),

    /// Push was rejected by a pre-receive or update hook.
    #[error("Hook rejected: {0}")]
    HookRejected(String),

    /// Caller failed authentication or lacks authorization for the operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A pkt-line or capability token could not be parsed.
    #[error("Malformed pkt-line: {0}")]
    MalformedPkt(String),
}

impl GitError {
    /// Stable machine-readable error code for wire responses (report-status, HTTP error bodies).
    ///
    /// Variants predating the taxonomy map onto the closest code; new call sites should
    /// prefer constructing one of the named variants directly.
    pub fn error_code(&self) -> &'static str {
        match self {
            GitError::NotFound(_) | GitError::ObjectNotFound(_) | GitError::RepoNotFound => {
                "NOT_FOUND"
            }
            GitError::AlreadyExists(_) => "ALREADY_EXISTS",
            GitError::InvalidName(_) => "INVALID_NAME",
            GitError::InvalidSha(_) | GitError::InvalidHashValue(_) => "INVALID_SHA",
            GitError::Locked(_) => "LOCKED",
            GitError::Conflict(_) => "CONFLICT",
            GitError::CircularRef(_) => "CIRCULAR_REF",
            GitError::MaxDepthExceeded(_) => "MAX_DEPTH_EXCEEDED",
            GitError::CorruptObject(_)
            | GitError::InvalidObjectType(_)
            | GitError::InvalidBlobObject(_)
            | GitError::InvalidTreeObject
            | GitError::InvalidTreeItem(_)
            | GitError::EmptyTreeItems(_)
            | GitError::InvalidCommitObject
            | GitError::InvalidCommit(_)
            | GitError::InvalidTagObject(_)
            | GitError::InvalidNoteObject(_)
            | GitError::InvalidSignatureType(_) => "CORRUPT_OBJECT",
            GitError::CorruptPack(_)
            | GitError::InvalidPackFile(_)
            | GitError::InvalidPackHeader(_)
            | GitError::InvalidIdxFile(_)
            | GitError::InvalidIndexFile(_)
            | GitError::InvalidIndexHeader(_)
            | GitError::DeltaObjectError(_)
            | GitError::UnCompletedPackObject(_)
            | GitError::InvalidObjectInfo(_)
            | GitError::NotFoundHashValue(_)
            | GitError::EncodeObjectError(_)
            | GitError::PackEncodeError(_) => "CORRUPT_PACK",
            GitError::UnsupportedVersion(_) => "UNSUPPORTED_VERSION",
            GitError::PackLimitExceeded(_) => "PACK_LIMIT_EXCEEDED",
            GitError::NonFastForward(_) => "NON_FAST_FORWARD",
            GitError::Protected(_) => "PROTECTED",
            GitError::HookRejected(_) => "HOOK_REJECTED",
            GitError::Unauthorized(_) | GitError::UnAuthorized(_) => "UNAUTHORIZED",
            GitError::MalformedPkt(_) => "MALFORMED_PKT",
            GitError::IOError(_)
            | GitError::ConversionError(_)
            | GitError::InvalidPathError(_)
            | GitError::InvalidArgument(_)
            | GitError::NetworkError(_)
            | GitError::CustomError(_) => "CUSTOM_ERROR",
        }
    }
}
