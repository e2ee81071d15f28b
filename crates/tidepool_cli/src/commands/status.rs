//! Status command implementation: a dry-run sync.

use crate::CliError;
use std::path::{Path, PathBuf};
use tidepool_store::{AuthorId, DocumentStore, FileStore};
use tidepool_sync::{classify_endpoints, plan_pair, ActionKind, SyncAction, SyncConfig};

/// Runs the status command.
pub fn run(left: &Path, right: &Path, state_dir: Option<PathBuf>) -> Result<(), CliError> {
    let endpoints = classify_endpoints(left, right)?;

    // The author is irrelevant for planning; nothing is written.
    let mut config = SyncConfig::new(AuthorId::new("status")?);
    if let Some(dir) = state_dir {
        config = config.with_state_dir(dir);
    }

    let store = FileStore::open(&endpoints.store)?;
    let (actions, failures) = plan_pair(&endpoints.dir, &store, &endpoints.store, &config)?;
    store.close()?;

    let mut pending = 0usize;
    for action in &actions {
        let label = match action {
            SyncAction::WriteToStore { .. } => "-> store",
            SyncAction::WriteToDisk { .. } => "-> disk",
            SyncAction::DeleteInStore { .. } => "xx store",
            SyncAction::DeleteOnDisk { .. } => "xx disk",
            SyncAction::Conflict { .. } => "conflict",
            SyncAction::NoOp { .. } => continue,
        };
        pending += 1;
        println!("  {label}  {}", action.path());
    }

    for failure in &failures {
        println!("  unreadable  {} ({})", failure.path.display(), failure.message);
    }

    let up_to_date = actions.len() - pending;
    println!();
    println!("{pending} pending, {up_to_date} up to date");
    let conflicts = actions
        .iter()
        .filter(|a| a.kind() == ActionKind::Conflict)
        .count();
    if conflicts > 0 {
        println!("{conflicts} conflicted");
    }
    Ok(())
}
