//! Run lock - cross-process mutual exclusion for orchestration runs
//!
//! An exclusive advisory lock on a well-known file in the data root. One
//! acquisition spans an entire tick or an entire rollback, so no two
//! orchestration runs of any kind interleave - including runs from a
//! second daemon instance pointed at the same data root. The guard holds
//! the file open; dropping it releases the lock. The lock file itself is
//! never removed, so the lock survives process restarts.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::errors::{Result, VaultError};

const LOCK_FILE: &str = "run.lock";

#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
}

/// A held run lock; released on drop
#[derive(Debug)]
pub struct RunLockGuard {
    file: File,
}

impl RunLock {
    /// Lock file inside a repository state directory
    pub fn in_state_dir(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(LOCK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| VaultError::storage("open_run_lock", e))
    }

    /// Try to acquire without blocking.
    ///
    /// `LockHeld` means another run is in flight; ticks treat that as a
    /// suppressed no-op, never as an error.
    pub fn try_acquire(&self) -> Result<RunLockGuard> {
        let file = self.open()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(RunLockGuard { file }),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(VaultError::LockHeld)
            }
            Err(e) => Err(VaultError::storage("try_lock_run_lock", e)),
        }
    }

    /// Acquire, blocking until the current holder releases.
    ///
    /// Used by rollback, which must run but may not interleave with a
    /// tick. Call from a blocking-capable context.
    pub fn acquire(&self) -> Result<RunLockGuard> {
        let file = self.open()?;
        file.lock_exclusive()
            .map_err(|e| VaultError::storage("lock_run_lock", e))?;
        Ok(RunLockGuard { file })
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
