//! The sync manifest — persisted record of the last agreed state.
//!
//! One manifest exists per (directory, store) pair, keyed by a digest of
//! both absolute endpoint paths. It maps each synced path to the content
//! hash and store timestamp agreed at the end of the last run, letting
//! the planner distinguish "changed since last sync" from "always
//! different". Saves are atomic (`.tmp` + rename); a corrupt manifest
//! degrades to an empty one rather than aborting, trading redundant work
//! for convergence.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tidepool_store::{ContentHash, DocPath, LogicalTimestamp};
use tracing::{debug, warn};

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

/// Last agreed state for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Hash of the content both sides agreed on.
    pub content_hash: ContentHash,
    /// Store timestamp of the version both sides agreed on.
    pub store_timestamp: LogicalTimestamp,
}

/// Persisted mapping from path to last agreed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncManifest {
    version: u32,
    entries: BTreeMap<DocPath, ManifestEntry>,
}

impl Default for SyncManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Looks up the last agreed state for a path.
    #[must_use]
    pub fn get(&self, path: &DocPath) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    /// Records the agreed state for a path.
    pub fn record(&mut self, path: DocPath, content_hash: ContentHash, store_timestamp: LogicalTimestamp) {
        self.entries.insert(
            path,
            ManifestEntry {
                content_hash,
                store_timestamp,
            },
        );
    }

    /// Drops a path whose deletion both sides agree on.
    pub fn remove(&mut self, path: &DocPath) {
        self.entries.remove(path);
    }

    /// Iterates entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&DocPath, &ManifestEntry)> {
        self.entries.iter()
    }

    /// Number of recorded paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads a manifest from disk.
    ///
    /// A missing file yields an empty manifest. A file that cannot be
    /// parsed also yields an empty manifest — with a warning — because a
    /// full re-plan converges where an abort would not.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new());
            }
            Err(err) => return Err(SyncError::Io(err)),
        };
        match serde_json::from_str::<Self>(&contents) {
            Ok(manifest) if manifest.version <= MANIFEST_VERSION => Ok(manifest),
            Ok(manifest) => {
                let err = SyncError::ManifestCorrupt {
                    message: format!("unsupported manifest version: {}", manifest.version),
                };
                warn!(%err, path = %path.display(), "falling back to empty manifest");
                Ok(Self::new())
            }
            Err(parse_err) => {
                let err = SyncError::ManifestCorrupt {
                    message: parse_err.to_string(),
                };
                warn!(%err, path = %path.display(), "falling back to empty manifest");
                Ok(Self::new())
            }
        }
    }

    /// Saves the manifest atomically: write to `<path>.tmp`, then rename.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), entries = self.entries.len(), "saved manifest");
        Ok(())
    }
}

/// Location of the manifest for a (directory, store) endpoint pair.
///
/// The file name is derived from both absolute paths so that distinct
/// pairs never share a manifest.
#[must_use]
pub fn manifest_path(state_dir: &Path, dir: &Path, store: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    for endpoint in [dir, store] {
        let bytes = endpoint.to_string_lossy();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes.as_bytes());
    }
    let digest: [u8; 32] = hasher.finalize().into();
    state_dir.join(format!("{}.json", &hex::encode(digest)[..16]))
}
