//! # Tidepool Store
//!
//! Versioned, multi-writer document store for Tidepool.
//!
//! This crate provides:
//! - Validated identifier types (paths, authors, workspaces)
//! - The [`DocumentStore`] trait consumed by the sync engine
//! - [`MemoryStore`] for tests and ephemeral use
//! - [`FileStore`] for persistent single-file storage
//!
//! ## Document model
//!
//! A document version is immutable once written. New writes for the same
//! path create new versions; old versions are retained as history. Every
//! version carries a per-author logical timestamp used for causal ordering
//! (wall-clock time is never consulted). An empty-content version is a
//! tombstone marking the path as deleted.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod file;
mod hash;
mod memory;
mod store;
mod types;

pub use document::{DocumentEntry, WriteResult};
pub use error::{StoreError, StoreResult};
pub use file::{has_store_extension, FileStore, STORE_EXTENSION};
pub use hash::ContentHash;
pub use memory::MemoryStore;
pub use store::DocumentStore;
pub use types::{AuthorId, DocPath, LogicalTimestamp, WorkspaceId};
