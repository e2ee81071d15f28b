//! Error types for the sync engine.

use crate::preconditions::PreconditionError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tidepool_store::{DocPath, StoreError};

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync run.
///
/// Precondition failures are fatal and occur before any I/O. Traversal
/// and unresolved-conflict errors are scoped to one path: they are
/// recorded in the run summary and never abort the run. Manifest
/// corruption is recovered by re-planning from an empty manifest.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An endpoint-pair precondition was violated.
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// The sync root does not exist.
    #[error("sync root not found: {path:?}")]
    RootNotFound {
        /// The missing root.
        path: PathBuf,
    },

    /// The sync root is a file, not a directory.
    #[error("sync root is not a directory: {path:?}")]
    NotADirectory {
        /// The offending root.
        path: PathBuf,
    },

    /// A subtree or file could not be read during the walk.
    #[error("traversal failed at {path:?}: {message}")]
    Traversal {
        /// Where the walk failed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The document store could not be queried.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// The underlying store failure.
        message: String,
    },

    /// A conflict resolver declined to pick a side.
    #[error("unresolved conflict for {path}")]
    ConflictUnresolved {
        /// The conflicted path.
        path: DocPath,
    },

    /// The persisted manifest could not be parsed.
    #[error("manifest corrupt: {message}")]
    ManifestCorrupt {
        /// Description of the parse failure.
        message: String,
    },

    /// I/O error outside the walk (manifest persistence, state dir).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Manifest serialization error.
    #[error("manifest serialization: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a traversal error for one path.
    pub fn traversal(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Traversal {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Wraps a store failure that prevents querying the store.
    pub fn store_unavailable(err: StoreError) -> Self {
        Self::StoreUnavailable {
            message: err.to_string(),
        }
    }

    /// Returns true if the error is scoped to a single path rather than
    /// the whole run.
    pub fn is_scoped(&self) -> bool {
        matches!(
            self,
            SyncError::Traversal { .. } | SyncError::ConflictUnresolved { .. }
        )
    }
}
