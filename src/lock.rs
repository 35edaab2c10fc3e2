//! Cross-process lock around the data files.

use crate::error::{AppError, AppResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive advisory lock on a lock file. Released on drop, or by the OS
/// when the process dies.
#[derive(Debug)]
pub struct StorageLock {
    path: PathBuf,
    _file: File,
}

impl StorageLock {
    /// Wait until no other holder remains, then take the lock.
    pub async fn acquire(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let lock_path = path.clone();

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| AppError::storage(&path, e))?
        .map_err(|e| AppError::storage(&path, e))?;

        debug!(path = %path.display(), "Storage lock taken");
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Storage lock released");
    }
}
