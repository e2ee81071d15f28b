//! Sync run configuration.

use std::path::{Path, PathBuf};
use tidepool_store::AuthorId;

/// Default cap on the size of file content accepted into the store.
pub const DEFAULT_MAX_CONTENT_SIZE: u64 = 4 * 1024 * 1024;

/// Name of the default state directory placed beside the store file.
const STATE_DIR_NAME: &str = ".tidepool";

/// Configuration for a sync run.
///
/// Everything a run needs beyond its two endpoints is carried here
/// explicitly; there are no process-wide defaults.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Author to attribute store writes to.
    pub author: AuthorId,
    /// Where sync manifests are kept. `None` places a `.tidepool`
    /// directory beside the store file.
    pub state_dir: Option<PathBuf>,
    /// Files larger than this are skipped rather than written to the
    /// store.
    pub max_content_size: u64,
}

impl SyncConfig {
    /// Creates a configuration for the given author with defaults.
    #[must_use]
    pub fn new(author: AuthorId) -> Self {
        Self {
            author,
            state_dir: None,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }

    /// Overrides the manifest state directory.
    #[must_use]
    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(state_dir.into());
        self
    }

    /// Overrides the maximum accepted content size.
    #[must_use]
    pub fn with_max_content_size(mut self, max_content_size: u64) -> Self {
        self.max_content_size = max_content_size;
        self
    }

    /// Resolves the state directory for a given store file.
    #[must_use]
    pub fn state_dir_for(&self, store_path: &Path) -> PathBuf {
        match &self.state_dir {
            Some(dir) => dir.clone(),
            None => store_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(STATE_DIR_NAME),
        }
    }
}
