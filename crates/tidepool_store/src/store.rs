//! The document store trait.

use crate::document::{DocumentEntry, WriteResult};
use crate::error::StoreResult;
use crate::types::{AuthorId, DocPath, WorkspaceId};

/// A versioned, multi-writer document store scoped to one workspace.
///
/// Implementations assign a logical timestamp to every accepted write:
/// `max(author's clock, path's latest timestamp) + 1`, so per-author
/// clocks stay monotonic and every write supersedes the visible latest
/// version. Writes of a single document are atomic; callers rely on this
/// for per-path crash safety, not for multi-path atomicity.
///
/// The trait is object-safe so callers can run against in-memory fakes
/// in tests. All methods fail with [`StoreError::Closed`] after
/// [`close`](DocumentStore::close).
///
/// [`StoreError::Closed`]: crate::StoreError::Closed
pub trait DocumentStore {
    /// The workspace this store belongs to.
    fn workspace(&self) -> &WorkspaceId;

    /// Returns the latest version of a document, tombstone included.
    ///
    /// `None` means the path has never been written.
    fn get(&self, path: &DocPath) -> StoreResult<Option<DocumentEntry>>;

    /// Returns the latest version of every path, tombstones included,
    /// ordered by path.
    fn list(&self) -> StoreResult<Vec<DocumentEntry>>;

    /// Returns every retained version of a path, oldest first.
    fn history(&self, path: &DocPath) -> StoreResult<Vec<DocumentEntry>>;

    /// Writes a new version of a document.
    ///
    /// Empty content records a tombstone.
    fn set(&self, author: &AuthorId, path: &DocPath, content: Vec<u8>) -> StoreResult<WriteResult>;

    /// Records a tombstone for a path.
    fn delete(&self, author: &AuthorId, path: &DocPath) -> StoreResult<WriteResult> {
        self.set(author, path, Vec::new())
    }

    /// Closes the store. Subsequent operations fail.
    fn close(&self) -> StoreResult<()>;
}
