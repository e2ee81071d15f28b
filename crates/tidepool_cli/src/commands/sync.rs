//! Sync command implementation.

use crate::CliError;
use std::path::{Path, PathBuf};
use tidepool_store::{AuthorId, DocumentStore, FileStore};
use tidepool_sync::{
    classify_endpoints, sync_pair, ActionKind, LastWriterWins, Outcome, SyncConfig,
};

/// Runs the sync command. Returns true if every path synced cleanly.
pub fn run(
    left: &Path,
    right: &Path,
    author: &str,
    state_dir: Option<PathBuf>,
) -> Result<bool, CliError> {
    let endpoints = classify_endpoints(left, right)?;

    let mut config = SyncConfig::new(AuthorId::new(author)?);
    if let Some(dir) = state_dir {
        config = config.with_state_dir(dir);
    }

    let store = FileStore::open(&endpoints.store)?;
    let report = sync_pair(
        &endpoints.dir,
        &store,
        &endpoints.store,
        &config,
        &LastWriterWins,
    )?;
    store.close()?;

    println!(
        "Synced {} with {}",
        endpoints.dir.display(),
        endpoints.store.display()
    );
    println!();
    println!("  {:<16} {:>8} {:>8} {:>8}", "action", "applied", "skipped", "failed");
    for kind in ActionKind::ALL {
        let counts = report.summary.counts(kind);
        if counts.applied + counts.skipped + counts.failed == 0 {
            continue;
        }
        println!(
            "  {:<16} {:>8} {:>8} {:>8}",
            kind.to_string(),
            counts.applied,
            counts.skipped,
            counts.failed
        );
    }

    for item in &report.summary.reports {
        match &item.outcome {
            Outcome::Failed { error } => println!("  ✗ {}: {error}", item.path),
            Outcome::Skipped { reason } => println!("  - {}: {reason}", item.path),
            Outcome::Applied => {}
        }
    }
    for failure in &report.traversal_failures {
        println!("  ✗ unreadable {}: {}", failure.path.display(), failure.message);
    }

    println!();
    if report.is_clean() {
        println!("✓ Sync complete");
    } else {
        println!("✗ Sync completed with failures");
    }
    Ok(report.is_clean())
}
