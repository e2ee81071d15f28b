//! Error types for the document store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(String),

    /// Store file does not exist.
    #[error("store file not found: {path:?}")]
    NotFound {
        /// Path that was opened.
        path: PathBuf,
    },

    /// Store file already exists.
    #[error("store file already exists: {path:?}")]
    AlreadyExists {
        /// Path that was to be created.
        path: PathBuf,
    },

    /// Store is locked by another process.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// Store handle has been closed.
    #[error("store is closed")]
    Closed,

    /// Invalid store file format or version.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Document signature does not match its fields.
    #[error("signature mismatch for document {path}")]
    SignatureMismatch {
        /// Path of the offending document.
        path: String,
    },

    /// Rejected document path.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Rejected author identifier.
    #[error("invalid author id {author:?}: {reason}")]
    InvalidAuthor {
        /// The rejected identifier.
        author: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Rejected workspace identifier.
    #[error("invalid workspace id {workspace:?}: {reason}")]
    InvalidWorkspace {
        /// The rejected identifier.
        workspace: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Rejected digest string.
    #[error("invalid digest {digest:?}")]
    InvalidDigest {
        /// The rejected digest string.
        digest: String,
    },
}

impl StoreError {
    /// Creates a codec error from any serializer failure.
    pub fn codec(err: impl std::fmt::Display) -> Self {
        Self::Codec(err.to_string())
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true if the store cannot currently be queried at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Closed | StoreError::Locked | StoreError::NotFound { .. }
        )
    }
}
