//! In-memory document store for tests and ephemeral use.

use crate::document::{DocumentEntry, WriteResult};
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use crate::types::{AuthorId, DocPath, LogicalTimestamp, WorkspaceId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// An in-memory document store.
///
/// Suitable for unit tests, integration tests, and ephemeral workspaces
/// that don't need persistence. Thread-safe; can be shared across threads
/// behind a reference.
///
/// # Example
///
/// ```rust
/// use tidepool_store::{AuthorId, DocPath, DocumentStore, MemoryStore, WorkspaceId};
///
/// let store = MemoryStore::new(WorkspaceId::new("+notes.test").unwrap());
/// let alice = AuthorId::new("alice").unwrap();
/// let path = DocPath::new("a.txt").unwrap();
///
/// store.set(&alice, &path, b"hi".to_vec()).unwrap();
/// let doc = store.get(&path).unwrap().unwrap();
/// assert_eq!(doc.content, b"hi");
/// ```
pub struct MemoryStore {
    workspace: WorkspaceId,
    inner: RwLock<Versions>,
}

/// Version index shared by the in-memory store and the file store's
/// replayed view.
#[derive(Default)]
pub(crate) struct Versions {
    pub(crate) closed: bool,
    docs: BTreeMap<DocPath, Vec<DocumentEntry>>,
    clocks: HashMap<AuthorId, u64>,
}

impl Versions {
    pub(crate) fn check_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Timestamp for a new write: past both the author's clock and the
    /// path's visible latest, so the write supersedes it.
    pub(crate) fn next_timestamp(&self, author: &AuthorId, path: &DocPath) -> LogicalTimestamp {
        let clock = self.clocks.get(author).copied().unwrap_or(0);
        let latest = self
            .docs
            .get(path)
            .and_then(|versions| versions.last())
            .map(|doc| doc.timestamp.as_u64())
            .unwrap_or(0);
        LogicalTimestamp::new(clock.max(latest) + 1)
    }

    /// Records a version in the index, advancing the author's clock.
    pub(crate) fn commit(&mut self, entry: DocumentEntry) {
        let clock = self.clocks.entry(entry.author.clone()).or_insert(0);
        *clock = (*clock).max(entry.timestamp.as_u64());
        self.docs.entry(entry.path.clone()).or_default().push(entry);
    }

    pub(crate) fn latest(&self, path: &DocPath) -> Option<&DocumentEntry> {
        self.docs.get(path).and_then(|versions| versions.last())
    }

    pub(crate) fn latest_all(&self) -> Vec<DocumentEntry> {
        self.docs
            .values()
            .filter_map(|versions| versions.last())
            .cloned()
            .collect()
    }

    pub(crate) fn history(&self, path: &DocPath) -> Vec<DocumentEntry> {
        self.docs.get(path).cloned().unwrap_or_default()
    }

    pub(crate) fn path_count(&self) -> usize {
        self.docs.len()
    }
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new(workspace: WorkspaceId) -> Self {
        Self {
            workspace,
            inner: RwLock::new(Versions::default()),
        }
    }

    /// Number of paths with at least one version.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.inner.read().path_count()
    }
}

impl DocumentStore for MemoryStore {
    fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    fn get(&self, path: &DocPath) -> StoreResult<Option<DocumentEntry>> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(inner.latest(path).cloned())
    }

    fn list(&self) -> StoreResult<Vec<DocumentEntry>> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(inner.latest_all())
    }

    fn history(&self, path: &DocPath) -> StoreResult<Vec<DocumentEntry>> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(inner.history(path))
    }

    fn set(&self, author: &AuthorId, path: &DocPath, content: Vec<u8>) -> StoreResult<WriteResult> {
        let mut inner = self.inner.write();
        inner.check_open()?;
        let timestamp = inner.next_timestamp(author, path);
        let entry = DocumentEntry::new(&self.workspace, path.clone(), content, author.clone(), timestamp);
        let result = WriteResult {
            timestamp,
            signature: entry.signature,
        };
        inner.commit(entry);
        Ok(result)
    }

    fn close(&self) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.check_open()?;
        inner.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(WorkspaceId::new("+notes.test").unwrap())
    }

    fn author(name: &str) -> AuthorId {
        AuthorId::new(name).unwrap()
    }

    fn path(p: &str) -> DocPath {
        DocPath::new(p).unwrap()
    }

    #[test]
    fn get_missing_is_none() {
        let store = store();
        assert!(store.get(&path("a.txt")).unwrap().is_none());
    }

    #[test]
    fn set_then_get() {
        let store = store();
        store.set(&author("alice"), &path("a.txt"), b"hi".to_vec()).unwrap();

        let doc = store.get(&path("a.txt")).unwrap().unwrap();
        assert_eq!(doc.content, b"hi");
        assert_eq!(doc.author, author("alice"));
        assert!(doc.verify(store.workspace()));
    }

    #[test]
    fn author_clock_is_monotonic() {
        let store = store();
        let alice = author("alice");
        let t1 = store.set(&alice, &path("a"), b"1".to_vec()).unwrap().timestamp;
        let t2 = store.set(&alice, &path("b"), b"2".to_vec()).unwrap().timestamp;
        let t3 = store.set(&alice, &path("a"), b"3".to_vec()).unwrap().timestamp;
        assert!(t1 < t2);
        assert!(t2 < t3);
    }

    #[test]
    fn writes_supersede_across_authors() {
        let store = store();
        let t1 = store
            .set(&author("alice"), &path("a"), b"1".to_vec())
            .unwrap()
            .timestamp;
        // bob's clock starts at zero but his write must still supersede
        let t2 = store
            .set(&author("bob"), &path("a"), b"2".to_vec())
            .unwrap()
            .timestamp;
        assert!(t2 > t1);
        assert_eq!(store.get(&path("a")).unwrap().unwrap().content, b"2");
    }

    #[test]
    fn delete_records_tombstone() {
        let store = store();
        let alice = author("alice");
        store.set(&alice, &path("a"), b"1".to_vec()).unwrap();
        store.delete(&alice, &path("a")).unwrap();

        let latest = store.get(&path("a")).unwrap().unwrap();
        assert!(latest.is_tombstone());
        // tombstones still show up in list
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn history_retains_superseded_versions() {
        let store = store();
        let alice = author("alice");
        store.set(&alice, &path("a"), b"1".to_vec()).unwrap();
        store.set(&alice, &path("a"), b"2".to_vec()).unwrap();

        let history = store.history(&path("a")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, b"1");
        assert_eq!(history[1].content, b"2");
        assert!(history[0].timestamp < history[1].timestamp);
    }

    #[test]
    fn list_is_ordered_by_path() {
        let store = store();
        let alice = author("alice");
        store.set(&alice, &path("b"), b"2".to_vec()).unwrap();
        store.set(&alice, &path("a"), b"1".to_vec()).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed[0].path, path("a"));
        assert_eq!(listed[1].path, path("b"));
    }

    proptest::proptest! {
        /// Any interleaving of writes keeps list() at one latest version
        /// per path and per-author clocks strictly increasing.
        #[test]
        fn interleaved_writes_keep_invariants(
            writes in proptest::collection::vec((0u8..3, 0u8..4, proptest::collection::vec(proptest::prelude::any::<u8>(), 0..16)), 1..40)
        ) {
            let store = store();
            let authors = [author("alice"), author("bob"), author("carol")];
            let paths = [path("a"), path("b"), path("c/d"), path("e")];
            let mut last_ts: HashMap<AuthorId, u64> = HashMap::new();

            for (who, which, content) in writes {
                let who = &authors[who as usize];
                let which = &paths[which as usize];
                let ts = store.set(who, which, content).unwrap().timestamp.as_u64();
                if let Some(&prev) = last_ts.get(who) {
                    proptest::prop_assert!(ts > prev);
                }
                last_ts.insert(who.clone(), ts);
            }

            let listed = store.list().unwrap();
            let mut seen = std::collections::BTreeSet::new();
            for doc in &listed {
                proptest::prop_assert!(seen.insert(doc.path.clone()));
                let history = store.history(&doc.path).unwrap();
                proptest::prop_assert_eq!(history.last().unwrap(), doc);
            }
        }
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = store();
        store.close().unwrap();
        assert!(matches!(
            store.get(&path("a")),
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.list(), Err(StoreError::Closed)));
        assert!(matches!(
            store.set(&author("alice"), &path("a"), Vec::new()),
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }
}
