//! ankivault-store - Persistence layer for snapshots and metadata
//!
//! Provides:
//! - Atomic write primitives (temp + fsync + rename)
//! - Backup repository with staged, crash-safe snapshot directories
//! - Active pointer file with atomic replace
//! - Cross-process run lock (advisory file lock)
//! - `MetadataStore` capability trait with SQLite and Postgres backends
//! - Embedded SQL migrations framework

pub mod atomic;
pub mod db;
pub mod errors;
pub mod lock;
pub mod migrations;
pub mod pointer;
pub mod postgres;
pub mod repository;
pub mod sidecar;
pub mod sqlite;
pub mod store;

pub use errors::Result;
pub use lock::{RunLock, RunLockGuard};
pub use pointer::{ActivePointer, PointerValue};
pub use postgres::PostgresStore;
pub use repository::{BackupRepository, StagingHandle};
pub use sidecar::SnapshotSidecar;
pub use sqlite::SqliteStore;
pub use store::MetadataStore;
