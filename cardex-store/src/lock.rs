//! Exclusive lock on the price history file.
//!
//! The lock is a sibling file created with create-new semantics. It holds the
//! owning process id and is removed when the guard drops. A lock left behind by
//! a process that is gone, or one older than the stale bound, is reclaimed.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Age after which a lock file is considered abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Guard for exclusive access to the price history.
#[derive(Debug)]
pub struct HistoryLock {
    path: PathBuf,
}

impl HistoryLock {
    /// Acquires the lock at `path` with the default stale bound.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        Self::acquire_with(path, DEFAULT_STALE_AFTER)
    }

    /// Acquires the lock at `path`.
    ///
    /// An existing lock whose owner is no longer running, or whose file is
    /// older than `stale_after`, is removed and the create is retried once.
    /// Otherwise fails with [`StoreError::Locked`].
    pub fn acquire_with(path: &Path, stale_after: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = match create_new(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let Some(reason) = stale_reason(path, stale_after) else {
                    return Err(StoreError::Locked(path.to_path_buf()));
                };
                warn!(path = %path.display(), reason, "Reclaiming stale history lock");
                match std::fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                match create_new(path) {
                    Ok(file) => file,
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        return Err(StoreError::Locked(path.to_path_buf()));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", std::process::id())?;

        debug!(path = %path.display(), "Acquired history lock");
        Ok(lock)
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Released history lock"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove history lock"),
        }
    }
}

fn create_new(path: &Path) -> std::io::Result<std::fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Says why an existing lock may be taken over, or `None` if it is held.
fn stale_reason(path: &Path, stale_after: Duration) -> Option<&'static str> {
    let owner = std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok());

    if owner.is_some_and(process_is_gone) {
        return Some("owner process is not running");
    }

    let age = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())?;
    (age > stale_after).then_some("lock file is older than the stale bound")
}

#[cfg(target_os = "linux")]
fn process_is_gone(pid: u32) -> bool {
    pid != std::process::id() && !Path::new("/proc").join(pid.to_string()).exists()
}

// Without a portable liveness check only the age bound applies.
#[cfg(not(target_os = "linux"))]
fn process_is_gone(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plant(path: &Path, contents: &str, age: Duration) {
        std::fs::write(path, contents).unwrap();
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_second_acquire_is_locked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv.lock");

        let first = HistoryLock::acquire(&path).unwrap();
        let err = HistoryLock::acquire(&path).unwrap_err();
        assert!(err.is_locked());

        let pid = std::fs::read_to_string(first.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_drop_releases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv.lock");

        drop(HistoryLock::acquire(&path).unwrap());
        assert!(!path.exists());
        assert!(HistoryLock::acquire(&path).is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lock_of_dead_process_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv.lock");
        plant(&path, "999999\n", Duration::ZERO);

        let lock = HistoryLock::acquire(&path).unwrap();
        let pid = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_fresh_lock_of_live_process_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv.lock");
        plant(&path, &format!("{}\n", std::process::id()), Duration::ZERO);

        let err = HistoryLock::acquire_with(&path, Duration::from_secs(3600)).unwrap_err();
        assert!(err.is_locked());
        assert!(path.exists());
    }

    #[test]
    fn test_old_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv.lock");
        plant(&path, "", Duration::from_secs(2 * 3600));

        assert!(HistoryLock::acquire_with(&path, Duration::from_secs(3600)).is_ok());
    }

    #[test]
    fn test_young_unreadable_lock_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv.lock");
        plant(&path, "not a pid", Duration::from_secs(60));

        let err = HistoryLock::acquire_with(&path, Duration::from_secs(3600)).unwrap_err();
        assert!(err.is_locked());
    }
}
