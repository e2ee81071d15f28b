//! List command implementation.

use crate::CliError;
use std::path::Path;
use tidepool_store::{DocumentStore, FileStore};

/// Runs the list command.
pub fn run(store_path: &Path, tombstones: bool) -> Result<(), CliError> {
    let store = FileStore::open(store_path)?;
    let entries = store.list()?;

    println!("Workspace: {}", store.workspace());
    let mut live = 0usize;
    let mut deleted = 0usize;

    for entry in &entries {
        if entry.is_tombstone() {
            deleted += 1;
            if tombstones {
                println!("  {:>8}  {:<12}  (deleted)  {}", entry.timestamp, entry.author, entry.path);
            }
        } else {
            live += 1;
            println!(
                "  {:>8}  {:<12}  {:>8} B  {}",
                entry.timestamp,
                entry.author,
                entry.content.len(),
                entry.path
            );
        }
    }

    println!();
    println!("{live} documents, {deleted} deleted");
    store.close()?;
    Ok(())
}
