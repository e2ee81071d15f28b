//! Conflict resolution policies.

use tidepool_store::{DocPath, LogicalTimestamp};

/// One side of a conflict, normalized for comparison.
///
/// Deletion is represented as empty content, mirroring the store's
/// tombstone encoding, so delete-vs-update conflicts compare the same
/// way update-vs-update conflicts do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSide {
    /// Causal position of this side's change.
    ///
    /// The store side carries its version's logical timestamp. A disk
    /// edit has no store clock of its own, so it is placed one step past
    /// the last agreed timestamp: a lone store write since the last sync
    /// is genuinely concurrent with it (a tie), while a store that
    /// advanced further wins outright.
    pub timestamp: LogicalTimestamp,
    /// This side's content; empty means deleted.
    pub content: Vec<u8>,
}

impl ConflictSide {
    /// Returns true if this side deleted the path.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.content.is_empty()
    }
}

/// Outcome of resolving one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The disk side wins; its state is written to the store.
    KeepDisk,
    /// The store side wins; its state is written to disk.
    KeepStore,
    /// The policy declines to pick a side; the path fails this run and
    /// is retried next run.
    Unresolved,
}

/// Policy that picks the winner of a divergent path.
///
/// Implementations must be deterministic and side-effect-free: the same
/// pair of sides always yields the same resolution. Policies are
/// substitutable without changes to the planner or executor.
pub trait ConflictResolver {
    /// Picks a winner for one conflicted path.
    fn resolve(&self, path: &DocPath, disk: &ConflictSide, store: &ConflictSide) -> Resolution;
}

/// The default policy: last writer wins by the store's causal clock.
///
/// The higher logical timestamp wins — never wall-clock file times, which
/// are not trustworthy across machines. Timestamp ties are broken by
/// comparing content bytes (the lexicographically greater side wins);
/// byte-equal ties keep the store side, so every input has exactly one
/// winner.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastWriterWins;

impl ConflictResolver for LastWriterWins {
    fn resolve(&self, _path: &DocPath, disk: &ConflictSide, store: &ConflictSide) -> Resolution {
        use std::cmp::Ordering;

        match disk.timestamp.cmp(&store.timestamp) {
            Ordering::Greater => Resolution::KeepDisk,
            Ordering::Less => Resolution::KeepStore,
            Ordering::Equal => match disk.content.as_slice().cmp(store.content.as_slice()) {
                Ordering::Greater => Resolution::KeepDisk,
                Ordering::Less | Ordering::Equal => Resolution::KeepStore,
            },
        }
    }
}

/// Alternate policy: the store is authoritative, local edits always lose.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferStore;

impl ConflictResolver for PreferStore {
    fn resolve(&self, _path: &DocPath, _disk: &ConflictSide, _store: &ConflictSide) -> Resolution {
        Resolution::KeepStore
    }
}
