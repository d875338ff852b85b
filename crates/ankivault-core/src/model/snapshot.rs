//! Snapshot records and their identifiers
//!
//! A snapshot id doubles as its directory name: a UTC capture timestamp at
//! second resolution with `:` replaced by `-` so it is filesystem-safe and
//! sorts lexicographically in creation order. Collisions (two snapshots in
//! the same second, or an id already taken on disk) are disambiguated with
//! a numeric suffix that preserves the ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::stats::CollectionStats;

/// An immutable record of one committed backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: i64,
    pub source_revision: Option<String>,
    /// Advisory counts; never used for correctness decisions
    pub stats: Option<CollectionStats>,
    /// Path of the snapshot directory, relative to the repository root
    pub storage_path: String,
}

/// Format the snapshot id for a capture timestamp, e.g. `2026-08-07T14-00-00Z`
pub fn timestamp_id(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true).replace(':', "-")
}

/// Disambiguate a colliding id; `attempt` starts at 2.
///
/// `<id>-2` sorts after `<id>` and before the next second's id, so the
/// created_at-then-id ordering contract is preserved.
pub fn disambiguated(id: &str, attempt: u32) -> String {
    format!("{id}-{attempt}")
}
