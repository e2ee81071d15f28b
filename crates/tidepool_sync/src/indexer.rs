//! Directory indexing.
//!
//! Walks a directory tree into a flat, path-keyed set of file entries
//! with content hashes. The walk is iterative (an explicit work stack,
//! no recursion), never follows symbolic links, and reports subtree
//! failures per path so one unreadable directory doesn't lose the rest
//! of the scan.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tidepool_store::{ContentHash, DocPath};
use tracing::debug;

/// One file found under the sync root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the root, forward-slash separated.
    pub path: DocPath,
    /// File size in bytes.
    pub size: u64,
    /// Filesystem modification time. Informational only; never used for
    /// ordering decisions.
    pub modified: SystemTime,
    /// Hash of the file content.
    pub content_hash: ContentHash,
}

/// A traversal failure scoped to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalFailure {
    /// Where the walk failed.
    pub path: PathBuf,
    /// What went wrong.
    pub message: String,
}

/// The collected result of scanning a directory tree.
#[derive(Debug, Default)]
pub struct FileIndex {
    /// Files found, keyed by relative path.
    pub entries: BTreeMap<DocPath, FileEntry>,
    /// Subtrees or files that could not be read.
    pub failures: Vec<TraversalFailure>,
}

impl FileIndex {
    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no files were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walks a directory tree into [`FileEntry`] values.
///
/// The walk is restartable: every call to [`iter`](PathIndexer::iter) or
/// [`scan`](PathIndexer::scan) starts a fresh traversal. Traversal order
/// within a directory is name-sorted, so the resulting set is
/// deterministic for a given tree state.
#[derive(Debug, Clone)]
pub struct PathIndexer {
    root: PathBuf,
}

impl PathIndexer {
    /// Creates an indexer rooted at a directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a lazy walk of the tree.
    ///
    /// Fails with [`SyncError::RootNotFound`] if the root does not exist
    /// and [`SyncError::NotADirectory`] if it is a file. Failures inside
    /// the tree are yielded as [`SyncError::Traversal`] items.
    pub fn iter(&self) -> SyncResult<FileWalk> {
        let meta = fs::metadata(&self.root).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SyncError::RootNotFound {
                    path: self.root.clone(),
                }
            } else {
                SyncError::traversal(&self.root, err)
            }
        })?;
        if !meta.is_dir() {
            return Err(SyncError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let mut walk = FileWalk {
            root: self.root.clone(),
            stack: Vec::new(),
        };
        walk.push_children(&self.root)
            .map_err(|err| SyncError::traversal(&self.root, err))?;
        Ok(walk)
    }

    /// Runs the walk to completion, splitting entries from failures.
    pub fn scan(&self) -> SyncResult<FileIndex> {
        let mut index = FileIndex::default();
        for item in self.iter()? {
            match item {
                Ok(entry) => {
                    index.entries.insert(entry.path.clone(), entry);
                }
                Err(SyncError::Traversal { path, message }) => {
                    index.failures.push(TraversalFailure { path, message });
                }
                Err(other) => return Err(other),
            }
        }
        debug!(
            root = %self.root.display(),
            files = index.entries.len(),
            failures = index.failures.len(),
            "indexed directory"
        );
        Ok(index)
    }
}

/// Lazy depth-first walk over a directory tree.
#[derive(Debug)]
pub struct FileWalk {
    root: PathBuf,
    stack: Vec<PathBuf>,
}

impl FileWalk {
    /// Pushes a directory's children, name-sorted so that popping yields
    /// ascending order.
    fn push_children(&mut self, dir: &Path) -> std::io::Result<()> {
        let mut children = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        children.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        self.stack.extend(children);
        Ok(())
    }

    fn file_entry(&self, path: &Path, meta: &fs::Metadata) -> SyncResult<FileEntry> {
        let rel = relative_doc_path(&self.root, path)?;
        let content = fs::read(path).map_err(|err| SyncError::traversal(path, err))?;
        let modified = meta
            .modified()
            .map_err(|err| SyncError::traversal(path, err))?;
        Ok(FileEntry {
            path: rel,
            size: meta.len(),
            modified,
            content_hash: ContentHash::of(&content),
        })
    }
}

impl Iterator for FileWalk {
    type Item = SyncResult<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.stack.pop() {
            let meta = match fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(err) => return Some(Err(SyncError::traversal(path, err))),
            };
            let file_type = meta.file_type();

            // Symlinks are never followed; following them would admit
            // cycles and paths outside the root.
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                if let Err(err) = self.push_children(&path) {
                    return Some(Err(SyncError::traversal(path, err)));
                }
                continue;
            }
            if file_type.is_file() {
                return Some(self.file_entry(&path, &meta));
            }
            // Sockets, FIFOs and other special files are not documents.
        }
        None
    }
}

/// Converts an absolute path under `root` to a forward-slash relative
/// document path.
fn relative_doc_path(root: &Path, path: &Path) -> SyncResult<DocPath> {
    let rel = path
        .strip_prefix(root)
        .map_err(|err| SyncError::traversal(path, err))?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| SyncError::traversal(path, "file name is not valid UTF-8"))?;
        parts.push(part);
    }
    DocPath::new(parts.join("/")).map_err(|err| SyncError::traversal(path, err))
}
