//! Atomic write primitives
//!
//! Uses the write → fsync → rename pattern so that readers never observe
//! partial state. Both snapshot commit and the active-pointer swap go
//! through this module; they need identical crash semantics.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::errors::{io_error, Result};

/// Write bytes to a file and flush them to durable storage.
///
/// No rename is involved; use this for files inside a staging directory
/// whose visibility is controlled by the directory's own rename.
pub fn write_durable(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| io_error("create_file", e))?;
    file.write_all(content).map_err(|e| io_error("write_file", e))?;
    file.sync_all().map_err(|e| io_error("fsync_file", e))
}

/// Atomically replace `target` with `content`.
///
/// Writes to a `.tmp` sibling in the same directory, flushes it, renames
/// it over `target`, then flushes the directory entry. A crash before the
/// rename leaves the old file intact; after, the new one. No intermediate
/// state is observable.
pub fn atomic_replace(target: &Path, content: &[u8]) -> Result<()> {
    let temp_path = target.with_extension("tmp");
    write_durable(&temp_path, content)?;
    fs::rename(&temp_path, target).map_err(|e| io_error("rename_temp", e))?;
    if let Some(parent) = target.parent() {
        fsync_dir(parent)?;
    }
    Ok(())
}

/// Rename a fully-flushed directory or file into place and flush the
/// parent directory entry of the destination.
pub fn rename_durable(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| io_error("rename", e))?;
    if let Some(parent) = to.parent() {
        fsync_dir(parent)?;
    }
    Ok(())
}

/// Flush a directory's entries to durable storage
#[cfg(unix)]
pub fn fsync_dir(dir: &Path) -> Result<()> {
    let handle = fs::File::open(dir).map_err(|e| io_error("open_dir", e))?;
    handle.sync_all().map_err(|e| io_error("fsync_dir", e))
}

/// Directory handles cannot be opened for syncing on this platform
#[cfg(not(unix))]
pub fn fsync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
