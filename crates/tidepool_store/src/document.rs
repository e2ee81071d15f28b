//! Document versions and write results.

use crate::hash::ContentHash;
use crate::types::{AuthorId, DocPath, LogicalTimestamp, WorkspaceId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One immutable version of a document.
///
/// New writes for the same path create new versions; the store retains
/// superseded versions as history. Empty content marks the version as a
/// tombstone (the path is deleted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Normalized relative path of the document.
    pub path: DocPath,
    /// Document content. Empty content is the tombstone encoding.
    pub content: Vec<u8>,
    /// Author that wrote this version.
    pub author: AuthorId,
    /// Logical timestamp assigned by the store on write.
    pub timestamp: LogicalTimestamp,
    /// Integrity signature over the version's fields.
    pub signature: ContentHash,
}

impl DocumentEntry {
    /// Creates a signed document version.
    #[must_use]
    pub fn new(
        workspace: &WorkspaceId,
        path: DocPath,
        content: Vec<u8>,
        author: AuthorId,
        timestamp: LogicalTimestamp,
    ) -> Self {
        let signature = Self::compute_signature(workspace, &path, &author, timestamp, &content);
        Self {
            path,
            content,
            author,
            timestamp,
            signature,
        }
    }

    /// Returns true if this version marks the path as deleted.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the hash of this version's content.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of(&self.content)
    }

    /// Checks the signature against the version's fields.
    #[must_use]
    pub fn verify(&self, workspace: &WorkspaceId) -> bool {
        let expected = Self::compute_signature(
            workspace,
            &self.path,
            &self.author,
            self.timestamp,
            &self.content,
        );
        expected == self.signature
    }

    /// Computes the integrity signature for a version's fields.
    ///
    /// The input is a length-prefixed encoding of
    /// `(workspace, path, author, timestamp, content)` so that field
    /// boundaries cannot be confused.
    #[must_use]
    pub fn compute_signature(
        workspace: &WorkspaceId,
        path: &DocPath,
        author: &AuthorId,
        timestamp: LogicalTimestamp,
        content: &[u8],
    ) -> ContentHash {
        let mut hasher = Sha256::new();
        for field in [
            workspace.as_str().as_bytes(),
            path.as_str().as_bytes(),
            author.as_str().as_bytes(),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        hasher.update(timestamp.as_u64().to_le_bytes());
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content);
        ContentHash::from_bytes(hasher.finalize().into())
    }
}

/// Result of a successful document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Logical timestamp assigned to the new version.
    pub timestamp: LogicalTimestamp,
    /// Signature of the new version.
    pub signature: ContentHash,
}
