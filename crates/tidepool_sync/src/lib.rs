//! # Tidepool Sync
//!
//! Bidirectional synchronization between a filesystem subtree and a
//! Tidepool document store.
//!
//! This crate provides:
//! - [`PathIndexer`] — deterministic directory scanning with content hashes
//! - [`StoreSnapshot`] — the latest-per-path view of a document store
//! - [`plan`] — the pure reconciliation planner producing [`SyncAction`]s
//! - [`ConflictResolver`] — pluggable conflict policies ([`LastWriterWins`]
//!   by default)
//! - [`SyncExecutor`] — plan application with per-path outcomes and
//!   partial-failure semantics
//! - [`SyncManifest`] — the persisted record of the last agreed state
//! - [`sync_pair`] / [`plan_pair`] — one-pass orchestration over a
//!   (directory, store) endpoint pair
//!
//! A sync run is deterministic (the plan is a pure function of the two
//! scans and the manifest, ordered by path) and idempotent (running again
//! with no intervening changes plans all no-ops).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod executor;
mod indexer;
mod manifest;
mod planner;
mod preconditions;
mod resolver;
mod session;
mod snapshot;

pub use config::{SyncConfig, DEFAULT_MAX_CONTENT_SIZE};
pub use error::{SyncError, SyncResult};
pub use executor::{ItemReport, KindCounts, Outcome, SyncExecutor, SyncSummary};
pub use indexer::{FileEntry, FileIndex, FileWalk, PathIndexer, TraversalFailure};
pub use manifest::{manifest_path, ManifestEntry, SyncManifest};
pub use planner::{plan, ActionKind, SyncAction};
pub use preconditions::{classify_endpoints, Endpoints, PreconditionError};
pub use resolver::{ConflictResolver, ConflictSide, LastWriterWins, PreferStore, Resolution};
pub use session::{plan_pair, sync_pair, SyncReport};
pub use snapshot::StoreSnapshot;
