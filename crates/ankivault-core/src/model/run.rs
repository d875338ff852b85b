//! Run records - one audit row per orchestration run
//!
//! Every scheduler tick and every manual run appends exactly one record,
//! whatever the outcome. Records are append-only; pruning a snapshot may
//! later leave a `created` record pointing at a deleted id, which is a
//! valid dangling reference in the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a run produced no snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Source fingerprint matches the latest snapshot
    Unchanged,
    /// The run lock was held by another run; this tick was suppressed
    LockHeld,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unchanged => "unchanged",
            SkipReason::LockHeld => "lock_held",
        }
    }

    pub fn parse(raw: &str) -> Option<SkipReason> {
        match raw {
            "unchanged" => Some(SkipReason::Unchanged),
            "lock_held" => Some(SkipReason::LockHeld),
            _ => None,
        }
    }
}

/// Outcome of one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Created { snapshot_id: String },
    Skipped { reason: SkipReason },
    Failed { error_kind: String },
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Created { .. } => "created",
            RunOutcome::Skipped { .. } => "skipped",
            RunOutcome::Failed { .. } => "failed",
        }
    }

    /// Snapshot id for `created` outcomes
    pub fn snapshot_id(&self) -> Option<&str> {
        match self {
            RunOutcome::Created { snapshot_id } => Some(snapshot_id),
            _ => None,
        }
    }

    /// Skip reason or error kind, stored in the record's detail column
    pub fn detail(&self) -> Option<&str> {
        match self {
            RunOutcome::Created { .. } => None,
            RunOutcome::Skipped { reason } => Some(reason.as_str()),
            RunOutcome::Failed { error_kind } => Some(error_kind),
        }
    }
}

/// One append-only audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
