//! File-backed document store.
//!
//! A store file is a fixed header followed by an append-only log of
//! length-prefixed CBOR document records:
//!
//! ```text
//! [0..4)   magic "TPOL"
//! [4..6)   format version, u16 LE
//! [6..10)  header length, u32 LE
//! [10..)   CBOR header (workspace, instance id)
//! then per record: [u32 LE payload length][CBOR document]
//! ```
//!
//! The log is replayed into memory on open. A truncated tail (torn by a
//! crash mid-append) is tolerated: replay stops at the last complete
//! record. Record signatures are verified during replay.

use crate::document::{DocumentEntry, WriteResult};
use crate::error::{StoreError, StoreResult};
use crate::memory::Versions;
use crate::store::DocumentStore;
use crate::types::{AuthorId, DocPath, WorkspaceId};
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// File extension store files must carry.
pub const STORE_EXTENSION: &str = "pool";

/// Magic bytes at the start of every store file.
const STORE_MAGIC: [u8; 4] = *b"TPOL";

/// Current on-disk format version.
const FORMAT_VERSION: u16 = 1;

/// Returns true if the path ends in the store extension.
#[must_use]
pub fn has_store_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(STORE_EXTENSION)
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreHeader {
    workspace: WorkspaceId,
    instance_id: Uuid,
}

/// A persistent document store backed by a single `.pool` file.
///
/// The file is held under an exclusive advisory lock for the lifetime of
/// the handle, so only one process works against a store at a time.
/// Appends are flushed per write; a process crash can tear at most the
/// record being appended, which the next open discards.
pub struct FileStore {
    path: PathBuf,
    workspace: WorkspaceId,
    instance_id: Uuid,
    file: RwLock<File>,
    inner: RwLock<Versions>,
}

impl FileStore {
    /// Creates a new empty store file.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the path exists.
    pub fn create(path: &Path, workspace: WorkspaceId) -> StoreResult<Self> {
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create_new(true)
            .open(path)?;
        lock_exclusive(&file)?;

        let instance_id = Uuid::new_v4();
        let header = StoreHeader {
            workspace: workspace.clone(),
            instance_id,
        };
        let mut header_bytes = Vec::new();
        ciborium::into_writer(&header, &mut header_bytes).map_err(StoreError::codec)?;

        file.write_all(&STORE_MAGIC)?;
        file.write_all(&FORMAT_VERSION.to_le_bytes())?;
        file.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
        file.write_all(&header_bytes)?;
        file.sync_all()?;

        debug!(path = %path.display(), %workspace, "created store file");

        Ok(Self {
            path: path.to_path_buf(),
            workspace,
            instance_id,
            file: RwLock::new(file),
            inner: RwLock::new(Versions::default()),
        })
    }

    /// Opens an existing store file and replays its log.
    ///
    /// Fails with [`StoreError::NotFound`] if the path does not exist and
    /// [`StoreError::Locked`] if another handle holds the store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut file = OpenOptions::new().read(true).append(true).open(path)?;
        lock_exclusive(&file)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let (header, body_offset) = parse_header(&bytes)?;
        let mut index = Versions::default();
        let replayed = replay(&bytes[body_offset..], &header.workspace, &mut index)?;

        debug!(
            path = %path.display(),
            workspace = %header.workspace,
            records = replayed,
            "opened store file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            workspace: header.workspace,
            instance_id: header.instance_id,
            file: RwLock::new(file),
            inner: RwLock::new(index),
        })
    }

    /// Returns the path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the id assigned to this store file at creation.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }
}

impl DocumentStore for FileStore {
    fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    fn get(&self, path: &DocPath) -> StoreResult<Option<DocumentEntry>> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(inner.latest(path).cloned())
    }

    fn list(&self) -> StoreResult<Vec<DocumentEntry>> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(inner.latest_all())
    }

    fn history(&self, path: &DocPath) -> StoreResult<Vec<DocumentEntry>> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(inner.history(path))
    }

    fn set(&self, author: &AuthorId, path: &DocPath, content: Vec<u8>) -> StoreResult<WriteResult> {
        let mut inner = self.inner.write();
        inner.check_open()?;

        let timestamp = inner.next_timestamp(author, path);
        let entry = DocumentEntry::new(&self.workspace, path.clone(), content, author.clone(), timestamp);
        let record = encode_record(&entry)?;

        // Disk first: the index only sees writes that reached the log.
        {
            let mut file = self.file.write();
            file.write_all(&record)?;
            file.flush()?;
        }

        let result = WriteResult {
            timestamp,
            signature: entry.signature,
        };
        inner.commit(entry);
        Ok(result)
    }

    fn close(&self) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.check_open()?;
        inner.closed = true;
        self.file.write().sync_all()?;
        Ok(())
    }
}

fn lock_exclusive(file: &File) -> StoreResult<()> {
    file.try_lock_exclusive().map_err(|err| {
        if err.kind() == std::io::ErrorKind::WouldBlock {
            StoreError::Locked
        } else {
            StoreError::Io(err)
        }
    })
}

fn parse_header(bytes: &[u8]) -> StoreResult<(StoreHeader, usize)> {
    if bytes.len() < 10 {
        return Err(StoreError::invalid_format("store file too short"));
    }
    if bytes[0..4] != STORE_MAGIC {
        return Err(StoreError::invalid_format("invalid store magic"));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version > FORMAT_VERSION {
        return Err(StoreError::invalid_format(format!(
            "unsupported format version: {version}"
        )));
    }
    let header_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let body_offset = 10 + header_len;
    if bytes.len() < body_offset {
        return Err(StoreError::invalid_format("store header truncated"));
    }
    let header: StoreHeader =
        ciborium::from_reader(&bytes[10..body_offset]).map_err(StoreError::codec)?;
    Ok((header, body_offset))
}

fn replay(mut bytes: &[u8], workspace: &WorkspaceId, index: &mut Versions) -> StoreResult<usize> {
    let mut replayed = 0usize;
    while !bytes.is_empty() {
        if bytes.len() < 4 {
            warn!("discarding torn record length at end of store log");
            break;
        }
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() < 4 + len {
            warn!(needed = len, available = bytes.len() - 4, "discarding torn record at end of store log");
            break;
        }
        let entry: DocumentEntry = match ciborium::from_reader(&bytes[4..4 + len]) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "discarding undecodable tail of store log");
                break;
            }
        };
        if !entry.verify(workspace) {
            return Err(StoreError::SignatureMismatch {
                path: entry.path.to_string(),
            });
        }
        index.commit(entry);
        replayed += 1;
        bytes = &bytes[4 + len..];
    }
    Ok(replayed)
}

fn encode_record(entry: &DocumentEntry) -> StoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(entry, &mut payload).map_err(StoreError::codec)?;
    let mut record = Vec::with_capacity(payload.len() + 4);
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}
