//! One-pass sync orchestration.
//!
//! Both endpoints are scanned independently (two read-only passes that
//! both complete before planning, so the plan sees one consistent joint
//! view), the planner reconciles them against the manifest, the executor
//! applies the plan, and the manifest is rewritten atomically at the
//! end. Interruption before the rewrite leaves the old manifest intact;
//! the next run re-plans from current state, which is idempotent.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::executor::{SyncExecutor, SyncSummary};
use crate::indexer::{PathIndexer, TraversalFailure};
use crate::manifest::{manifest_path, SyncManifest};
use crate::planner::{plan, SyncAction};
use crate::resolver::ConflictResolver;
use crate::snapshot::StoreSnapshot;
use std::path::Path;
use tidepool_store::DocumentStore;
use tracing::info;

/// Everything one sync run produced.
#[derive(Debug)]
pub struct SyncReport {
    /// Per-path outcomes from the executor.
    pub summary: SyncSummary,
    /// Subtrees the scan could not read.
    pub traversal_failures: Vec<TraversalFailure>,
}

impl SyncReport {
    /// Returns true if every path was read and applied cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.summary.is_clean() && self.traversal_failures.is_empty()
    }
}

/// Runs one full sync pass over a validated (directory, store) pair.
///
/// The store handle is passed in open; this function never opens or
/// closes stores behind the caller's back.
pub fn sync_pair(
    dir: &Path,
    store: &dyn DocumentStore,
    store_path: &Path,
    config: &SyncConfig,
    resolver: &dyn ConflictResolver,
) -> SyncResult<SyncReport> {
    let index = PathIndexer::new(dir).scan()?;
    let snapshot = StoreSnapshot::capture(store)?;

    let state_file = manifest_path(&config.state_dir_for(store_path), dir, store_path);
    let mut manifest = SyncManifest::load(&state_file)?;

    let actions = plan(&index, &snapshot, &manifest);
    let executor = SyncExecutor::new(dir, store, config, resolver);
    let summary = executor.execute(actions, &mut manifest);

    manifest.save(&state_file)?;

    info!(
        dir = %dir.display(),
        store = %store_path.display(),
        applied = summary.applied(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "sync pass complete"
    );

    Ok(SyncReport {
        summary,
        traversal_failures: index.failures,
    })
}

/// Plans a sync pass without applying anything.
///
/// Returns the ordered actions plus any scan failures, for dry-run
/// reporting.
pub fn plan_pair(
    dir: &Path,
    store: &dyn DocumentStore,
    store_path: &Path,
    config: &SyncConfig,
) -> SyncResult<(Vec<SyncAction>, Vec<TraversalFailure>)> {
    let index = PathIndexer::new(dir).scan()?;
    let snapshot = StoreSnapshot::capture(store)?;

    let state_file = manifest_path(&config.state_dir_for(store_path), dir, store_path);
    let manifest = SyncManifest::load(&state_file)?;

    Ok((plan(&index, &snapshot, &manifest), index.failures))
}
