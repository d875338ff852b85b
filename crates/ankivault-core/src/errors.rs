//! Error facility for ankivault
//!
//! One canonical taxonomy shared by every crate in the workspace. Each
//! variant maps to a stable code via [`VaultError::code`]; run records
//! persist the code string so failed runs stay classifiable after the
//! fact.

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Canonical error taxonomy for backup/rollback operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    /// The source refresh collaborator reported an error
    #[error("source refresh failed: {reason}")]
    SyncFailure { reason: String },

    /// The source refresh collaborator exceeded its time budget
    #[error("source refresh timed out after {timeout_secs}s")]
    SyncTimeout { timeout_secs: u64 },

    /// Disk I/O failure during staging, commit or payload access
    #[error("storage failure in {op}: {reason}")]
    StorageFailure { op: String, reason: String },

    /// Metadata store unreachable or rejected an operation
    #[error("metadata failure in {op}: {reason}")]
    MetadataFailure { op: String, reason: String },

    /// Snapshot id unknown to the metadata store
    #[error("snapshot not found: {snapshot_id}")]
    NotFound { snapshot_id: String },

    /// Metadata row exists but the repository cannot produce the payload
    #[error("snapshot {snapshot_id} is corrupt: {reason}")]
    Corrupt { snapshot_id: String, reason: String },

    /// Duplicate snapshot id on insert
    #[error("snapshot already exists: {snapshot_id}")]
    Conflict { snapshot_id: String },

    /// The run lock is held by another orchestration run
    #[error("run lock is held by another run")]
    LockHeld,

    /// JSON or TOML encoding/decoding failure
    #[error("serialization failure in {op}: {reason}")]
    Serialization { op: String, reason: String },

    /// Invalid configuration
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl VaultError {
    /// Stable code for this error, used in run records and log fields
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::SyncFailure { .. } => "ERR_SYNC_FAILURE",
            VaultError::SyncTimeout { .. } => "ERR_SYNC_TIMEOUT",
            VaultError::StorageFailure { .. } => "ERR_STORAGE_FAILURE",
            VaultError::MetadataFailure { .. } => "ERR_METADATA_FAILURE",
            VaultError::NotFound { .. } => "ERR_NOT_FOUND",
            VaultError::Corrupt { .. } => "ERR_CORRUPT",
            VaultError::Conflict { .. } => "ERR_CONFLICT",
            VaultError::LockHeld => "ERR_LOCK_HELD",
            VaultError::Serialization { .. } => "ERR_SERIALIZATION",
            VaultError::Config { .. } => "ERR_CONFIG",
        }
    }

    /// Storage failure from an I/O error, tagged with the failing operation
    pub fn storage(op: impl Into<String>, err: std::io::Error) -> Self {
        VaultError::StorageFailure {
            op: op.into(),
            reason: err.to_string(),
        }
    }

    /// Metadata failure with an operation tag
    pub fn metadata(op: impl Into<String>, reason: impl Into<String>) -> Self {
        VaultError::MetadataFailure {
            op: op.into(),
            reason: reason.into(),
        }
    }

    /// Serialization failure with an operation tag
    pub fn serialization(op: impl Into<String>, reason: impl Into<String>) -> Self {
        VaultError::Serialization {
            op: op.into(),
            reason: reason.into(),
        }
    }
}
