//! Endpoint-pair preconditions.
//!
//! A sync run takes two endpoints and works out which is the directory
//! and which is the store file. Every check here is fatal and runs
//! before any other I/O, each with its own error so the CLI can exit
//! with a distinct status per violation.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tidepool_store::{has_store_extension, STORE_EXTENSION};

/// A violated precondition. Fatal; nothing has been touched.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// Neither endpoint is a directory.
    #[error("neither endpoint is a directory: {left:?}, {right:?}")]
    NeitherDirectory {
        /// First endpoint as given.
        left: PathBuf,
        /// Second endpoint as given.
        right: PathBuf,
    },

    /// Both endpoints are directories.
    #[error("both endpoints are directories: {left:?}, {right:?}")]
    BothDirectories {
        /// First endpoint as given.
        left: PathBuf,
        /// Second endpoint as given.
        right: PathBuf,
    },

    /// The store file does not exist.
    #[error("store file does not exist: {path:?} (create it first)")]
    StoreMissing {
        /// The store endpoint.
        path: PathBuf,
    },

    /// The store file does not end in the store extension.
    #[error("store file must end in .{STORE_EXTENSION}: {path:?}")]
    StoreExtension {
        /// The store endpoint.
        path: PathBuf,
    },

    /// The store file lives inside the directory being synced.
    #[error("store {store:?} is inside the sync directory {dir:?}")]
    StoreInsideTree {
        /// The store endpoint.
        store: PathBuf,
        /// The directory endpoint.
        dir: PathBuf,
    },
}

/// A validated (directory, store) endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// The directory side of the sync.
    pub dir: PathBuf,
    /// The store file side of the sync.
    pub store: PathBuf,
}

/// Works out which endpoint is the directory and which is the store,
/// then checks every precondition.
///
/// Exactly one endpoint must be an existing directory. The other must be
/// an existing `.pool` store file that is not nested inside the
/// directory being synced.
pub fn classify_endpoints(left: &Path, right: &Path) -> Result<Endpoints, PreconditionError> {
    let (dir, store) = match (left.is_dir(), right.is_dir()) {
        (true, true) => {
            return Err(PreconditionError::BothDirectories {
                left: left.to_path_buf(),
                right: right.to_path_buf(),
            });
        }
        (false, false) => {
            return Err(PreconditionError::NeitherDirectory {
                left: left.to_path_buf(),
                right: right.to_path_buf(),
            });
        }
        (true, false) => (left, right),
        (false, true) => (right, left),
    };

    if !has_store_extension(store) {
        return Err(PreconditionError::StoreExtension {
            path: store.to_path_buf(),
        });
    }
    if !store.is_file() {
        return Err(PreconditionError::StoreMissing {
            path: store.to_path_buf(),
        });
    }

    // Compare resolved paths so `dir/../dir/store.pool` style spellings
    // can't smuggle the store into the tree.
    let dir_resolved = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let store_resolved = fs::canonicalize(store).unwrap_or_else(|_| store.to_path_buf());
    if store_resolved.starts_with(&dir_resolved) {
        return Err(PreconditionError::StoreInsideTree {
            store: store.to_path_buf(),
            dir: dir.to_path_buf(),
        });
    }

    Ok(Endpoints {
        dir: dir.to_path_buf(),
        store: store.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn classifies_in_either_order() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("tree");
        fs::create_dir(&dir).unwrap();
        let store = tmp.path().join("notes.pool");
        File::create(&store).unwrap();

        let a = classify_endpoints(&dir, &store).unwrap();
        let b = classify_endpoints(&store, &dir).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dir, dir);
        assert_eq!(a.store, store);
    }

    #[test]
    fn rejects_two_directories() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();

        assert!(matches!(
            classify_endpoints(&a, &b),
            Err(PreconditionError::BothDirectories { .. })
        ));
    }

    #[test]
    fn rejects_no_directory() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.pool");
        let b = tmp.path().join("b.pool");
        File::create(&a).unwrap();
        File::create(&b).unwrap();

        assert!(matches!(
            classify_endpoints(&a, &b),
            Err(PreconditionError::NeitherDirectory { .. })
        ));
    }

    #[test]
    fn rejects_wrong_extension() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("tree");
        fs::create_dir(&dir).unwrap();
        let store = tmp.path().join("notes.sqlite");
        File::create(&store).unwrap();

        assert!(matches!(
            classify_endpoints(&dir, &store),
            Err(PreconditionError::StoreExtension { .. })
        ));
    }

    #[test]
    fn rejects_missing_store() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("tree");
        fs::create_dir(&dir).unwrap();

        assert!(matches!(
            classify_endpoints(&dir, &tmp.path().join("absent.pool")),
            Err(PreconditionError::StoreMissing { .. })
        ));
    }

    #[test]
    fn rejects_store_nested_in_tree() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("tree");
        fs::create_dir_all(dir.join("sub")).unwrap();
        let store = dir.join("sub/notes.pool");
        File::create(&store).unwrap();

        assert!(matches!(
            classify_endpoints(&dir, &store),
            Err(PreconditionError::StoreInsideTree { .. })
        ));
    }

    #[test]
    fn rejects_dot_dot_nesting() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("tree");
        fs::create_dir(&dir).unwrap();
        let store = dir.join("notes.pool");
        File::create(&store).unwrap();
        let spelled = dir.join("..").join("tree").join("notes.pool");

        assert!(matches!(
            classify_endpoints(&dir, &spelled),
            Err(PreconditionError::StoreInsideTree { .. })
        ));
    }
}
