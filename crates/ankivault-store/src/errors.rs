//! Error handling for ankivault-store
//!
//! Maps backend errors onto the core VaultError taxonomy

pub use ankivault_core::errors::{Result, VaultError};

/// Create a metadata error from rusqlite::Error
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> VaultError {
    VaultError::metadata(op, err.to_string())
}

/// Create a metadata error from sqlx::Error
pub fn from_sqlx(op: &str, err: sqlx::Error) -> VaultError {
    VaultError::metadata(op, err.to_string())
}

/// Create a storage error from std::io::Error
pub fn io_error(op: &str, err: std::io::Error) -> VaultError {
    VaultError::storage(op, err)
}

/// Create a metadata error from a blocking-task join failure
pub fn join_error(op: &str, err: tokio::task::JoinError) -> VaultError {
    VaultError::metadata(op, err.to_string())
}
