//! # Data Directory Lock
//!
//! Only one node process may own a data directory. The lock is an
//! exclusive `fs2` flock on `<data_dir>/LOCK`, holding the owner's PID,
//! released on drop.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// How long `acquire` keeps retrying a held lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from data directory locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created.
    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    /// Another process holds the lock.
    #[error("{}", already_locked_message(.pid, .path))]
    AlreadyLocked {
        /// PID recorded by the holder, if readable
        pid: Option<u32>,
        /// Lock file path
        path: PathBuf,
    },

    /// PID could not be written into the lock file.
    #[error("Failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

fn already_locked_message(pid: &Option<u32>, path: &Path) -> String {
    match pid {
        Some(pid) => format!(
            "Data directory already in use by process {} ({})",
            pid,
            path.display()
        ),
        None => format!("Data directory already in use ({})", path.display()),
    }
}

/// Exclusive lock on a data directory, held until dropped.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DataDirLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock, retrying for up to [`DEFAULT_LOCK_TIMEOUT`].
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire_with_timeout(data_dir, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, retrying with backoff until `timeout` elapses.
    pub fn acquire_with_timeout(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let path = data_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(50);

        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&path)
                .map_err(LockError::CreateFailed)?;

            if file.try_lock_exclusive().is_ok() {
                let pid = std::process::id();
                let mut file = file;
                file.set_len(0).map_err(LockError::WriteFailed)?;
                writeln!(file, "{pid}").map_err(LockError::WriteFailed)?;
                file.sync_all().map_err(LockError::WriteFailed)?;
                tracing::debug!("[ql-01] 🔒 Locked data directory {}", data_dir.display());
                return Ok(Self { file, path, pid });
            }

            if Instant::now() >= deadline {
                return Err(LockError::AlreadyLocked {
                    pid: Self::read_existing_pid(&path),
                    path,
                });
            }

            drop(file);
            std::thread::sleep(retry_delay);
            retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
        }
    }

    /// PID of the holding process (this one).
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_records_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DataDirLock::acquire(dir.path()).expect("Should acquire lock");

        let content = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(content.trim().parse::<u32>().unwrap(), std::process::id());
        assert_eq!(lock.pid(), std::process::id());
    }

    #[test]
    fn test_second_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let _held = DataDirLock::acquire(dir.path()).unwrap();

        let result = DataDirLock::acquire_with_timeout(dir.path(), Duration::from_millis(100));
        match result {
            Err(LockError::AlreadyLocked { pid, .. }) => assert_eq!(pid, Some(std::process::id())),
            other => panic!("expected AlreadyLocked, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DataDirLock::acquire(dir.path()).unwrap();
        let path = lock.path().to_path_buf();
        drop(lock);

        assert!(!path.exists());
        assert!(DataDirLock::acquire_with_timeout(dir.path(), Duration::from_millis(100)).is_ok());
    }

    #[test]
    fn test_already_locked_message() {
        let err = LockError::AlreadyLocked {
            pid: Some(42),
            path: PathBuf::from("/data/LOCK"),
        };
        assert!(err.to_string().contains("process 42"));
    }
}
