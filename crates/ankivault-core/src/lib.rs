//! ankivault-core - Domain model for the backup/rollback engine
//!
//! Pure types and functions shared by the store and engine crates:
//! - Content fingerprinting for change detection
//! - Snapshot, run record and rollback event models
//! - Canonical error facility with stable codes
//! - Logging initialization

pub mod errors;
pub mod fingerprint;
pub mod logging;
pub mod model;

pub use errors::{Result, VaultError};
pub use fingerprint::{fingerprint, AssetEntry, AssetManifest};
pub use model::rollback::RollbackEvent;
pub use model::run::{RunOutcome, RunRecord, SkipReason};
pub use model::snapshot::SnapshotRecord;
pub use model::stats::{CollectionStats, DeckStats};
