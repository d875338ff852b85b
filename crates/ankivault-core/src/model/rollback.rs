//! Rollback events - one audit row per rollback attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result string recorded for a successful rollback
pub const ROLLBACK_OK: &str = "ok";

/// One append-only rollback audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackEvent {
    pub id: String,
    pub target_snapshot_id: String,
    /// Pointer value before the swap; None if no pointer existed yet
    pub previous_snapshot_id: Option<String>,
    pub requested_at: DateTime<Utc>,
    /// `ok`, or the stable error code of the failure
    pub result: String,
}

impl RollbackEvent {
    pub fn succeeded(
        target_snapshot_id: String,
        previous_snapshot_id: Option<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target_snapshot_id,
            previous_snapshot_id,
            requested_at,
            result: ROLLBACK_OK.to_string(),
        }
    }

    pub fn failed(
        target_snapshot_id: String,
        previous_snapshot_id: Option<String>,
        requested_at: DateTime<Utc>,
        error_code: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target_snapshot_id,
            previous_snapshot_id,
            requested_at,
            result: error_code.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ROLLBACK_OK
    }
}
