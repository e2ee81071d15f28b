//! Plan execution.
//!
//! The executor consumes a plan exactly once, performing at most one
//! filesystem or store operation per path and recording one outcome per
//! path. Individual failures never abort the run: the path keeps its old
//! manifest entry and is retried next run. Disk writes go through a
//! temp-file-and-rename so no path is ever left half-written.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::manifest::SyncManifest;
use crate::planner::{ActionKind, SyncAction};
use crate::resolver::{ConflictResolver, ConflictSide, Resolution};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tidepool_store::{ContentHash, DocPath, DocumentEntry, DocumentStore, LogicalTimestamp};
use tracing::{debug, warn};

/// Outcome of applying one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action was performed (or there was nothing to perform).
    Applied,
    /// The action was deliberately not performed.
    Skipped {
        /// Why the action was skipped.
        reason: String,
    },
    /// The action was attempted and failed; retried next run.
    Failed {
        /// What went wrong.
        error: String,
    },
}

impl Outcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    /// Returns true for [`Outcome::Applied`].
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    /// Returns true for [`Outcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Outcome of one path in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// The path acted on.
    pub path: DocPath,
    /// What kind of action was planned.
    pub kind: ActionKind,
    /// What happened.
    pub outcome: Outcome,
}

/// Applied/Skipped/Failed tallies for one action kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    /// Actions performed.
    pub applied: usize,
    /// Actions deliberately not performed.
    pub skipped: usize,
    /// Actions that failed.
    pub failed: usize,
}

/// Per-path outcomes of one run, suitable for console reporting.
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// One report per planned path, in plan (path) order.
    pub reports: Vec<ItemReport>,
}

impl SyncSummary {
    /// Tallies outcomes for one action kind.
    #[must_use]
    pub fn counts(&self, kind: ActionKind) -> KindCounts {
        let mut counts = KindCounts::default();
        for report in self.reports.iter().filter(|r| r.kind == kind) {
            match report.outcome {
                Outcome::Applied => counts.applied += 1,
                Outcome::Skipped { .. } => counts.skipped += 1,
                Outcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// Total applied paths.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_applied()).count()
    }

    /// Total skipped paths.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped { .. }))
            .count()
    }

    /// Total failed paths.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// Returns true if no path failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

/// Applies a plan to a (directory, store) pair.
pub struct SyncExecutor<'a> {
    root: &'a Path,
    store: &'a dyn DocumentStore,
    config: &'a SyncConfig,
    resolver: &'a dyn ConflictResolver,
}

impl<'a> SyncExecutor<'a> {
    /// Creates an executor over an open store and a sync root.
    #[must_use]
    pub fn new(
        root: &'a Path,
        store: &'a dyn DocumentStore,
        config: &'a SyncConfig,
        resolver: &'a dyn ConflictResolver,
    ) -> Self {
        Self {
            root,
            store,
            config,
            resolver,
        }
    }

    /// Applies every action, sequentially, continuing past failures.
    ///
    /// The manifest is updated in memory for `Applied` and `NoOp` paths
    /// only; failed paths keep their previous entry so the next run
    /// retries them. Persisting the manifest is the caller's job, after
    /// the whole pass.
    pub fn execute(&self, plan: Vec<SyncAction>, manifest: &mut SyncManifest) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for action in plan {
            let path = action.path().clone();
            let kind = action.kind();
            let outcome = self.apply(action, manifest);
            match &outcome {
                Outcome::Failed { error } => warn!(%path, %kind, %error, "sync action failed"),
                Outcome::Skipped { reason } => debug!(%path, %kind, %reason, "sync action skipped"),
                Outcome::Applied => debug!(%path, %kind, "sync action applied"),
            }
            summary.reports.push(ItemReport {
                path,
                kind,
                outcome,
            });
        }
        summary
    }

    fn apply(&self, action: SyncAction, manifest: &mut SyncManifest) -> Outcome {
        match action {
            SyncAction::WriteToStore { path } => self.write_to_store(&path, manifest),
            SyncAction::WriteToDisk { path, entry } => self.write_to_disk(&path, &entry, manifest),
            SyncAction::DeleteOnDisk { path } => self.delete_on_disk(&path, manifest),
            SyncAction::DeleteInStore { path } => self.delete_in_store(&path, manifest),
            SyncAction::Conflict {
                path,
                disk,
                store,
                base,
            } => self.resolve_conflict(&path, disk.is_some(), store, base, manifest),
            SyncAction::NoOp { path, state } => {
                match state {
                    Some(entry) => manifest.record(path, entry.content_hash, entry.store_timestamp),
                    None => manifest.remove(&path),
                }
                Outcome::Applied
            }
        }
    }

    fn write_to_store(&self, path: &DocPath, manifest: &mut SyncManifest) -> Outcome {
        let abs = self.abs_path(path);
        let content = match fs::read(&abs) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Outcome::skipped("file removed during run");
            }
            Err(err) => return Outcome::failed(err),
        };
        if content.len() as u64 > self.config.max_content_size {
            return Outcome::skipped(format!(
                "content is {} bytes, above the {} byte limit",
                content.len(),
                self.config.max_content_size
            ));
        }
        match self.store.set(&self.config.author, path, content.clone()) {
            Ok(result) => {
                manifest.record(path.clone(), ContentHash::of(&content), result.timestamp);
                Outcome::Applied
            }
            Err(err) => Outcome::failed(err),
        }
    }

    fn write_to_disk(
        &self,
        path: &DocPath,
        entry: &DocumentEntry,
        manifest: &mut SyncManifest,
    ) -> Outcome {
        match write_file_atomic(&self.abs_path(path), &entry.content) {
            Ok(()) => {
                manifest.record(path.clone(), entry.content_hash(), entry.timestamp);
                Outcome::Applied
            }
            Err(err) => Outcome::failed(err),
        }
    }

    fn delete_on_disk(&self, path: &DocPath, manifest: &mut SyncManifest) -> Outcome {
        match fs::remove_file(self.abs_path(path)) {
            Ok(()) => {}
            // Already gone: the goal state holds.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Outcome::failed(err),
        }
        manifest.remove(path);
        Outcome::Applied
    }

    fn delete_in_store(&self, path: &DocPath, manifest: &mut SyncManifest) -> Outcome {
        match self.store.delete(&self.config.author, path) {
            Ok(_) => {
                manifest.remove(path);
                Outcome::Applied
            }
            Err(err) => Outcome::failed(err),
        }
    }

    fn resolve_conflict(
        &self,
        path: &DocPath,
        disk_present: bool,
        store_entry: Option<DocumentEntry>,
        base: LogicalTimestamp,
        manifest: &mut SyncManifest,
    ) -> Outcome {
        let disk_content = if disk_present {
            match fs::read(self.abs_path(path)) {
                Ok(content) => content,
                // Deleted between scan and apply: treat as the delete it is.
                Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
                Err(err) => return Outcome::failed(err),
            }
        } else {
            Vec::new()
        };

        let disk_side = ConflictSide {
            timestamp: base.next(),
            content: disk_content,
        };
        let store_side = ConflictSide {
            timestamp: store_entry.as_ref().map_or(base, |entry| entry.timestamp),
            content: store_entry.map(|entry| entry.content).unwrap_or_default(),
        };

        match self.resolver.resolve(path, &disk_side, &store_side) {
            Resolution::KeepDisk => {
                match self.store.set(&self.config.author, path, disk_side.content.clone()) {
                    Ok(result) => {
                        if disk_side.is_deleted() {
                            manifest.remove(path);
                        } else {
                            manifest.record(
                                path.clone(),
                                ContentHash::of(&disk_side.content),
                                result.timestamp,
                            );
                        }
                        Outcome::Applied
                    }
                    Err(err) => Outcome::failed(err),
                }
            }
            Resolution::KeepStore => {
                if store_side.is_deleted() {
                    match fs::remove_file(self.abs_path(path)) {
                        Ok(()) => {}
                        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                        Err(err) => return Outcome::failed(err),
                    }
                    manifest.remove(path);
                    Outcome::Applied
                } else {
                    match write_file_atomic(&self.abs_path(path), &store_side.content) {
                        Ok(()) => {
                            manifest.record(
                                path.clone(),
                                ContentHash::of(&store_side.content),
                                store_side.timestamp,
                            );
                            Outcome::Applied
                        }
                        Err(err) => Outcome::failed(err),
                    }
                }
            }
            Resolution::Unresolved => Outcome::failed(SyncError::ConflictUnresolved {
                path: path.clone(),
            }),
        }
    }

    fn abs_path(&self, path: &DocPath) -> PathBuf {
        let mut abs = self.root.to_path_buf();
        for segment in path.as_str().split('/') {
            abs.push(segment);
        }
        abs
    }
}

/// Writes a file through a sibling temp file and a rename, so a crash or
/// error never leaves a half-written document visible.
fn write_file_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("destination has no parent directory"))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("destination has no file name"))?;
    let tmp = parent.join(format!(".{}.tp-tmp", file_name.to_string_lossy()));
    fs::write(&tmp, content)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;
    use crate::resolver::LastWriterWins;
    use tempfile::tempdir;
    use tidepool_store::{AuthorId, MemoryStore, WorkspaceId};

    fn store() -> MemoryStore {
        MemoryStore::new(WorkspaceId::new("+notes.test").unwrap())
    }

    fn config() -> SyncConfig {
        SyncConfig::new(AuthorId::new("local").unwrap())
    }

    fn doc_path(p: &str) -> DocPath {
        DocPath::new(p).unwrap()
    }

    fn entry(store: &MemoryStore, p: &str, content: &[u8]) -> DocumentEntry {
        let author = AuthorId::new("remote").unwrap();
        store.set(&author, &doc_path(p), content.to_vec()).unwrap();
        store.get(&doc_path(p)).unwrap().unwrap()
    }

    #[test]
    fn write_to_store_records_manifest() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        let store = store();
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        let summary = executor.execute(
            vec![SyncAction::WriteToStore {
                path: doc_path("a.txt"),
            }],
            &mut manifest,
        );

        assert_eq!(summary.applied(), 1);
        assert_eq!(store.get(&doc_path("a.txt")).unwrap().unwrap().content, b"hi");
        let recorded = manifest.get(&doc_path("a.txt")).unwrap();
        assert_eq!(recorded.content_hash, ContentHash::of(b"hi"));
    }

    #[test]
    fn write_to_store_skips_vanished_file() {
        let dir = tempdir().unwrap();
        let store = store();
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        let summary = executor.execute(
            vec![SyncAction::WriteToStore {
                path: doc_path("ghost.txt"),
            }],
            &mut manifest,
        );

        assert_eq!(summary.skipped(), 1);
        assert!(manifest.is_empty());
    }

    #[test]
    fn write_to_store_skips_oversized_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; 64]).unwrap();
        let store = store();
        let config = config().with_max_content_size(16);
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        let summary = executor.execute(
            vec![SyncAction::WriteToStore {
                path: doc_path("big.bin"),
            }],
            &mut manifest,
        );

        assert_eq!(summary.counts(ActionKind::WriteToStore).skipped, 1);
        assert!(store.get(&doc_path("big.bin")).unwrap().is_none());
    }

    #[test]
    fn write_to_disk_creates_parents_without_residue() {
        let dir = tempdir().unwrap();
        let store = store();
        let doc = entry(&store, "sub/deep/b.txt", b"from store");
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        let summary = executor.execute(
            vec![SyncAction::WriteToDisk {
                path: doc_path("sub/deep/b.txt"),
                entry: doc,
            }],
            &mut manifest,
        );

        assert_eq!(summary.applied(), 1);
        let written = dir.path().join("sub/deep/b.txt");
        assert_eq!(fs::read(&written).unwrap(), b"from store");
        assert!(!written.parent().unwrap().join(".b.txt.tp-tmp").exists());
    }

    #[test]
    fn delete_on_disk_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let store = store();
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        manifest.record(
            doc_path("gone.txt"),
            ContentHash::of(b"x"),
            LogicalTimestamp::new(1),
        );
        let summary = executor.execute(
            vec![SyncAction::DeleteOnDisk {
                path: doc_path("gone.txt"),
            }],
            &mut manifest,
        );

        assert_eq!(summary.applied(), 1);
        assert!(manifest.is_empty());
    }

    #[test]
    fn delete_in_store_writes_tombstone() {
        let dir = tempdir().unwrap();
        let store = store();
        entry(&store, "a.txt", b"old");
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        manifest.record(
            doc_path("a.txt"),
            ContentHash::of(b"old"),
            LogicalTimestamp::new(1),
        );
        let summary = executor.execute(
            vec![SyncAction::DeleteInStore {
                path: doc_path("a.txt"),
            }],
            &mut manifest,
        );

        assert_eq!(summary.applied(), 1);
        assert!(store.get(&doc_path("a.txt")).unwrap().unwrap().is_tombstone());
        assert!(manifest.is_empty());
    }

    #[test]
    fn conflict_keep_store_writes_disk() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.txt"), b"disk edit").unwrap();
        let store = store();
        let doc = entry(&store, "c.txt", b"store edit");
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        // Store advanced well past the base: store wins.
        let mut manifest = SyncManifest::new();
        let base = LogicalTimestamp::new(0);
        let summary = executor.execute(
            vec![SyncAction::Conflict {
                path: doc_path("c.txt"),
                disk: None, // content re-read from disk either way
                store: Some(doc.clone()),
                base,
            }],
            &mut manifest,
        );

        // disk: None means the file is treated as deleted; store wins on ts
        assert_eq!(summary.applied(), 1);
        assert_eq!(fs::read(dir.path().join("c.txt")).unwrap(), b"store edit");
        assert_eq!(
            manifest.get(&doc_path("c.txt")).unwrap().store_timestamp,
            doc.timestamp
        );
    }

    #[test]
    fn conflict_keep_disk_writes_store() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.txt"), b"disk edit").unwrap();
        let store = store();
        let doc = entry(&store, "c.txt", b"store edit");
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        // Base equals the store's timestamp minus nothing: disk side at
        // base.next() == 2 beats the store still at 1.
        let index_entry = crate::indexer::FileEntry {
            path: doc_path("c.txt"),
            size: 9,
            modified: std::time::SystemTime::UNIX_EPOCH,
            content_hash: ContentHash::of(b"disk edit"),
        };
        let mut manifest = SyncManifest::new();
        let summary = executor.execute(
            vec![SyncAction::Conflict {
                path: doc_path("c.txt"),
                disk: Some(index_entry),
                store: Some(doc),
                base: LogicalTimestamp::new(1),
            }],
            &mut manifest,
        );

        assert_eq!(summary.applied(), 1);
        let latest = store.get(&doc_path("c.txt")).unwrap().unwrap();
        assert_eq!(latest.content, b"disk edit");
        assert_eq!(
            manifest.get(&doc_path("c.txt")).unwrap().store_timestamp,
            latest.timestamp
        );
        // Loser (disk) is untouched: it already holds the winning bytes.
        assert_eq!(fs::read(dir.path().join("c.txt")).unwrap(), b"disk edit");
    }

    #[test]
    fn unresolved_conflict_fails_the_path() {
        struct Declines;
        impl ConflictResolver for Declines {
            fn resolve(&self, _: &DocPath, _: &ConflictSide, _: &ConflictSide) -> Resolution {
                Resolution::Unresolved
            }
        }

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.txt"), b"disk").unwrap();
        let store = store();
        let doc = entry(&store, "c.txt", b"store");
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &Declines);

        let mut manifest = SyncManifest::new();
        let before = ManifestEntry {
            content_hash: ContentHash::of(b"base"),
            store_timestamp: LogicalTimestamp::new(1),
        };
        manifest.record(doc_path("c.txt"), before.content_hash, before.store_timestamp);

        let summary = executor.execute(
            vec![SyncAction::Conflict {
                path: doc_path("c.txt"),
                disk: None,
                store: Some(doc),
                base: LogicalTimestamp::new(1),
            }],
            &mut manifest,
        );

        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_clean());
        // Failed paths keep their previous manifest entry for retry.
        assert_eq!(manifest.get(&doc_path("c.txt")), Some(&before));
    }

    #[test]
    fn noop_refreshes_or_drops_manifest_state() {
        let dir = tempdir().unwrap();
        let store = store();
        let config = config();
        let executor = SyncExecutor::new(dir.path(), &store, &config, &LastWriterWins);

        let mut manifest = SyncManifest::new();
        manifest.record(doc_path("old"), ContentHash::of(b"x"), LogicalTimestamp::new(1));

        let summary = executor.execute(
            vec![
                SyncAction::NoOp {
                    path: doc_path("new"),
                    state: Some(ManifestEntry {
                        content_hash: ContentHash::of(b"y"),
                        store_timestamp: LogicalTimestamp::new(7),
                    }),
                },
                SyncAction::NoOp {
                    path: doc_path("old"),
                    state: None,
                },
            ],
            &mut manifest,
        );

        assert_eq!(summary.applied(), 2);
        assert!(manifest.get(&doc_path("new")).is_some());
        assert!(manifest.get(&doc_path("old")).is_none());
    }
}
