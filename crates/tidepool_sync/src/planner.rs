//! Reconciliation planning.
//!
//! [`plan`] is a pure function of the three inputs — the directory index,
//! the store snapshot, and the manifest of the last agreed state — and
//! produces one [`SyncAction`] per path, ordered by path. It never
//! touches the filesystem or the store.
//!
//! One representational caveat: the store encodes deletion as empty
//! content, so a zero-byte file and a deleted document are the same
//! state on the store side.

use crate::indexer::{FileEntry, FileIndex};
use crate::manifest::{ManifestEntry, SyncManifest};
use crate::snapshot::StoreSnapshot;
use std::collections::BTreeSet;
use std::fmt;
use tidepool_store::{DocPath, DocumentEntry, LogicalTimestamp};
use tracing::debug;

/// One reconciliation decision for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Disk content is new or newer; write it into the store.
    WriteToStore {
        /// The path to copy from disk.
        path: DocPath,
    },
    /// Store content is new or newer; write it onto disk.
    WriteToDisk {
        /// The path to materialize.
        path: DocPath,
        /// The store version to write.
        entry: DocumentEntry,
    },
    /// The store deleted this path; remove the file.
    DeleteOnDisk {
        /// The path to remove.
        path: DocPath,
    },
    /// The file was deleted locally; tombstone the document.
    DeleteInStore {
        /// The path to tombstone.
        path: DocPath,
    },
    /// Both sides changed since the last agreed state; a
    /// [`ConflictResolver`](crate::ConflictResolver) picks the winner at
    /// apply time.
    Conflict {
        /// The divergent path.
        path: DocPath,
        /// Disk side, `None` if the file is gone.
        disk: Option<FileEntry>,
        /// Store side (latest version, tombstone included), `None` if the
        /// store lost the path entirely.
        store: Option<DocumentEntry>,
        /// Timestamp of the last agreed state the divergence grew from.
        base: LogicalTimestamp,
    },
    /// Both sides already agree; only the manifest is touched.
    NoOp {
        /// The agreed path.
        path: DocPath,
        /// The agreed state to record, or `None` when the agreement is
        /// that the path no longer exists.
        state: Option<ManifestEntry>,
    },
}

impl SyncAction {
    /// The path this action concerns.
    #[must_use]
    pub fn path(&self) -> &DocPath {
        match self {
            SyncAction::WriteToStore { path }
            | SyncAction::WriteToDisk { path, .. }
            | SyncAction::DeleteOnDisk { path }
            | SyncAction::DeleteInStore { path }
            | SyncAction::Conflict { path, .. }
            | SyncAction::NoOp { path, .. } => path,
        }
    }

    /// The action's kind, for summaries.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::WriteToStore { .. } => ActionKind::WriteToStore,
            SyncAction::WriteToDisk { .. } => ActionKind::WriteToDisk,
            SyncAction::DeleteOnDisk { .. } => ActionKind::DeleteOnDisk,
            SyncAction::DeleteInStore { .. } => ActionKind::DeleteInStore,
            SyncAction::Conflict { .. } => ActionKind::Conflict,
            SyncAction::NoOp { .. } => ActionKind::NoOp,
        }
    }
}

/// The kinds of [`SyncAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    /// Copy disk content into the store.
    WriteToStore,
    /// Materialize store content on disk.
    WriteToDisk,
    /// Remove a file.
    DeleteOnDisk,
    /// Tombstone a document.
    DeleteInStore,
    /// Divergent path awaiting resolution.
    Conflict,
    /// Nothing to do.
    NoOp,
}

impl ActionKind {
    /// All kinds, in summary display order.
    pub const ALL: [ActionKind; 6] = [
        ActionKind::WriteToStore,
        ActionKind::WriteToDisk,
        ActionKind::DeleteOnDisk,
        ActionKind::DeleteInStore,
        ActionKind::Conflict,
        ActionKind::NoOp,
    ];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::WriteToStore => "write-to-store",
            ActionKind::WriteToDisk => "write-to-disk",
            ActionKind::DeleteOnDisk => "delete-on-disk",
            ActionKind::DeleteInStore => "delete-in-store",
            ActionKind::Conflict => "conflict",
            ActionKind::NoOp => "no-op",
        };
        f.write_str(name)
    }
}

/// Plans one sync pass over the union of paths across the three inputs.
///
/// Decision rules per path, relative to the manifest of the last agreed
/// state:
///
/// 1. Only on disk, no manifest entry → [`SyncAction::WriteToStore`].
/// 2. Only live in the store, no manifest entry → [`SyncAction::WriteToDisk`].
/// 3. In the manifest but gone from disk → [`SyncAction::DeleteInStore`],
///    unless the store also changed since the manifest (conflict: local
///    delete vs. remote update).
/// 4. In the manifest but tombstoned (or lost) in the store →
///    [`SyncAction::DeleteOnDisk`], with the same carve-out for a
///    concurrent disk edit.
/// 5. Both sides changed since the manifest → [`SyncAction::Conflict`],
///    unless they changed to byte-equal content, which is agreement.
/// 6. Neither side changed → [`SyncAction::NoOp`].
///
/// The result is ordered by path and contains exactly one action per
/// path, which makes runs reproducible and testable.
#[must_use]
pub fn plan(index: &FileIndex, snapshot: &StoreSnapshot, manifest: &SyncManifest) -> Vec<SyncAction> {
    let mut paths: BTreeSet<&DocPath> = BTreeSet::new();
    paths.extend(index.entries.keys());
    paths.extend(snapshot.live.keys());
    paths.extend(snapshot.tombstones.keys());
    paths.extend(manifest.iter().map(|(path, _)| path));

    let actions: Vec<SyncAction> = paths
        .into_iter()
        .map(|path| plan_path(path, index, snapshot, manifest))
        .collect();

    debug!(actions = actions.len(), "planned sync pass");
    actions
}

fn plan_path(
    path: &DocPath,
    index: &FileIndex,
    snapshot: &StoreSnapshot,
    manifest: &SyncManifest,
) -> SyncAction {
    let disk = index.entries.get(path);
    let live = snapshot.live.get(path);
    let latest = snapshot.latest(path);

    let Some(recorded) = manifest.get(path) else {
        // Never synced before: one-sided states copy across, two-sided
        // states either already agree or conflict against an empty base.
        return match (disk, live) {
            (Some(_), None) => SyncAction::WriteToStore { path: path.clone() },
            (None, Some(entry)) => SyncAction::WriteToDisk {
                path: path.clone(),
                entry: entry.clone(),
            },
            (Some(file), Some(entry)) => {
                if file.content_hash == entry.content_hash() {
                    SyncAction::NoOp {
                        path: path.clone(),
                        state: Some(ManifestEntry {
                            content_hash: file.content_hash,
                            store_timestamp: entry.timestamp,
                        }),
                    }
                } else {
                    SyncAction::Conflict {
                        path: path.clone(),
                        disk: Some(file.clone()),
                        store: Some(entry.clone()),
                        base: LogicalTimestamp::new(0),
                    }
                }
            }
            // Only a tombstone remains for a path we never synced.
            (None, None) => SyncAction::NoOp {
                path: path.clone(),
                state: None,
            },
        };
    };

    let disk_changed = match disk {
        Some(file) => file.content_hash != recorded.content_hash,
        None => true,
    };
    let store_changed = match latest {
        Some(entry) => entry.timestamp != recorded.store_timestamp,
        None => true,
    };

    match (disk_changed, store_changed) {
        (false, false) => SyncAction::NoOp {
            path: path.clone(),
            state: Some(recorded.clone()),
        },
        (true, false) => match disk {
            Some(_) => SyncAction::WriteToStore { path: path.clone() },
            None => SyncAction::DeleteInStore { path: path.clone() },
        },
        (false, true) => match live {
            Some(entry) => SyncAction::WriteToDisk {
                path: path.clone(),
                entry: entry.clone(),
            },
            // Tombstoned or lost in the store while disk kept the old
            // content: propagate the deletion.
            None => SyncAction::DeleteOnDisk { path: path.clone() },
        },
        (true, true) => match (disk, live) {
            // Deleted on both sides: agreement, drop the manifest entry.
            (None, None) => SyncAction::NoOp {
                path: path.clone(),
                state: None,
            },
            // Changed to identical content on both sides: agreement.
            (Some(file), Some(entry)) if file.content_hash == entry.content_hash() => {
                SyncAction::NoOp {
                    path: path.clone(),
                    state: Some(ManifestEntry {
                        content_hash: file.content_hash,
                        store_timestamp: entry.timestamp,
                    }),
                }
            }
            _ => SyncAction::Conflict {
                path: path.clone(),
                disk: disk.cloned(),
                store: latest.cloned(),
                base: recorded.store_timestamp,
            },
        },
    }
}
