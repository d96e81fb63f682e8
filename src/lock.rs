//! File-based locking to prevent concurrent execution.
//!
//! Overlapping runs could pair a fingerprint with configuration files from a
//! different run, so `update` holds a flock-style advisory lock while it works.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A guard that holds an exclusive lock on the lock file.
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Attempt to acquire an exclusive lock on `path` without blocking.
    /// Returns an error if another instance is already running.
    pub fn acquire(path: &Path) -> Result<Self> {
        // Open without truncating so an existing lock file is never clobbered
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("Failed to set lock file permissions")?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another instance of cfsync is already running.\n\
                 If you believe this is an error, remove the lock file: {}",
                path.display()
            )
        })?;

        debug!(path = %path.display(), "Acquired lock");
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
