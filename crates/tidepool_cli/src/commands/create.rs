//! Create command implementation.

use crate::CliError;
use std::path::Path;
use tidepool_store::{has_store_extension, FileStore, WorkspaceId};
use tidepool_sync::PreconditionError;

/// Runs the create command.
pub fn run(store_path: &Path, workspace: &str) -> Result<(), CliError> {
    if !has_store_extension(store_path) {
        return Err(PreconditionError::StoreExtension {
            path: store_path.to_path_buf(),
        }
        .into());
    }
    let workspace = WorkspaceId::new(workspace)?;

    let store = FileStore::create(store_path, workspace.clone())?;
    println!(
        "Created store {} for workspace {workspace}",
        store.path().display()
    );
    Ok(())
}
