//! Document store snapshots.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;
use tidepool_store::{DocPath, DocumentEntry, DocumentStore};
use tracing::debug;

/// The latest-per-path view of a document store at one point in time.
///
/// Paths whose latest version carries content appear in `live`; paths
/// whose latest version is a tombstone appear in `tombstones`, so the
/// planner can distinguish "deleted" from "never existed". A path is in
/// at most one of the two maps.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    /// Latest non-tombstone version per path.
    pub live: BTreeMap<DocPath, DocumentEntry>,
    /// Latest version per path where that version is a tombstone.
    pub tombstones: BTreeMap<DocPath, DocumentEntry>,
}

impl StoreSnapshot {
    /// Captures the current state of a store.
    ///
    /// Fails with [`SyncError::StoreUnavailable`] if the store cannot be
    /// queried (for example a closed handle).
    pub fn capture(store: &dyn DocumentStore) -> SyncResult<Self> {
        let entries = store.list().map_err(SyncError::store_unavailable)?;
        let mut snapshot = Self::default();
        for entry in entries {
            if entry.is_tombstone() {
                snapshot.tombstones.insert(entry.path.clone(), entry);
            } else {
                snapshot.live.insert(entry.path.clone(), entry);
            }
        }
        debug!(
            live = snapshot.live.len(),
            tombstones = snapshot.tombstones.len(),
            "captured store snapshot"
        );
        Ok(snapshot)
    }

    /// The latest version for a path, tombstone or live.
    #[must_use]
    pub fn latest(&self, path: &DocPath) -> Option<&DocumentEntry> {
        self.live.get(path).or_else(|| self.tombstones.get(path))
    }

    /// Number of paths with any version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len() + self.tombstones.len()
    }

    /// Returns true if the store holds no versions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.tombstones.is_empty()
    }
}
