//! Core identifier types for the document store.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical timestamp used for causal ordering of document versions.
///
/// Timestamps are monotonically increasing per author and are assigned by
/// the store on write. They are distinct from wall-clock modification time,
/// which is not trustworthy for ordering across machines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogicalTimestamp(pub u64);

impl LogicalTimestamp {
    /// Creates a new logical timestamp.
    #[must_use]
    pub const fn new(ts: u64) -> Self {
        Self(ts)
    }

    /// Returns the raw timestamp value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next logical timestamp.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LogicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts:{}", self.0)
    }
}

/// A normalized, slash-separated relative document path.
///
/// Paths are unique per logical document. Ordering is byte-lexicographic
/// (never locale-aware) to match the store's list semantics. Construction
/// rejects absolute paths, `.`/`..` segments, empty segments, backslashes,
/// and NUL bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(String);

impl DocPath {
    /// Maximum length of a document path in bytes.
    pub const MAX_LEN: usize = 1024;

    /// Creates a validated document path.
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(reason) = Self::check(&path) {
            return Err(StoreError::InvalidPath { path, reason });
        }
        Ok(Self(path))
    }

    fn check(path: &str) -> Option<&'static str> {
        if path.is_empty() {
            return Some("path is empty");
        }
        if path.len() > Self::MAX_LEN {
            return Some("path exceeds maximum length");
        }
        if path.starts_with('/') {
            return Some("path must be relative");
        }
        if path.contains('\\') {
            return Some("path must use forward slashes");
        }
        if path.contains('\0') {
            return Some("path contains a NUL byte");
        }
        for segment in path.split('/') {
            match segment {
                "" => return Some("path contains an empty segment"),
                "." | ".." => return Some("path contains a dot segment"),
                _ => {}
            }
        }
        None
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocPath {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocPath> for String {
    fn from(path: DocPath) -> Self {
        path.0
    }
}

/// Identifier of a document author.
///
/// Authors are the writers whose logical clocks order document versions.
/// Identifiers are 1–64 characters of `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthorId(String);

impl AuthorId {
    /// Maximum length of an author identifier.
    pub const MAX_LEN: usize = 64;

    /// Creates a validated author identifier.
    pub fn new(author: impl Into<String>) -> StoreResult<Self> {
        let author = author.into();
        if let Some(reason) = Self::check(&author) {
            return Err(StoreError::InvalidAuthor { author, reason });
        }
        Ok(Self(author))
    }

    fn check(author: &str) -> Option<&'static str> {
        if author.is_empty() {
            return Some("author id is empty");
        }
        if author.len() > Self::MAX_LEN {
            return Some("author id exceeds maximum length");
        }
        if !author
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Some("author id contains invalid characters");
        }
        None
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AuthorId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AuthorId> for String {
    fn from(author: AuthorId) -> Self {
        author.0
    }
}

/// Identifier of a workspace: one logical document collection shared
/// across store replicas.
///
/// Workspace identifiers look like `+name.suffix` — a leading `+`, then
/// lowercase alphanumerics with at least one `.` separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Maximum length of a workspace identifier.
    pub const MAX_LEN: usize = 64;

    /// Creates a validated workspace identifier.
    pub fn new(workspace: impl Into<String>) -> StoreResult<Self> {
        let workspace = workspace.into();
        if let Some(reason) = Self::check(&workspace) {
            return Err(StoreError::InvalidWorkspace { workspace, reason });
        }
        Ok(Self(workspace))
    }

    fn check(workspace: &str) -> Option<&'static str> {
        let Some(rest) = workspace.strip_prefix('+') else {
            return Some("workspace id must start with '+'");
        };
        if workspace.len() > Self::MAX_LEN {
            return Some("workspace id exceeds maximum length");
        }
        if !rest.contains('.') {
            return Some("workspace id must contain a '.' separator");
        }
        if rest.is_empty()
            || !rest
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.')
        {
            return Some("workspace id contains invalid characters");
        }
        if rest.split('.').any(str::is_empty) {
            return Some("workspace id contains an empty segment");
        }
        None
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkspaceId> for String {
    fn from(workspace: WorkspaceId) -> Self {
        workspace.0
    }
}
