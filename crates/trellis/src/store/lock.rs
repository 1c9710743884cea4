//! Cross-process advisory lock file.
//!
//! The lock is a side-car file created with create-new semantics, so only
//! one process can hold it at a time. Its body records who took it and when:
//!
//! ```json
//! {"ownerId":4242,"timestampMillis":1718000000000}
//! ```
//!
//! A lock older than the configured timeout is assumed abandoned and removed
//! before the next attempt. When the body cannot be read (the holder may have
//! created the file and not written it yet) the file's modification time is
//! used as its age instead.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Body of the lock file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockBody {
    /// Process id of the holder
    pub owner_id: u32,
    /// Acquisition time in milliseconds since the Unix epoch
    pub timestamp_millis: i64,
}

impl LockBody {
    fn current() -> Self {
        Self {
            owner_id: std::process::id(),
            timestamp_millis: Utc::now().timestamp_millis(),
        }
    }
}

/// Settings for acquiring one lock file.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl FileLock {
    /// Lock at `path`.
    ///
    /// `max_retries` counts attempts after the first, so at most
    /// `max_retries + 1` creates are tried.
    pub fn new(
        path: impl Into<PathBuf>,
        timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            timeout,
            max_retries,
            retry_delay,
        }
    }

    /// Lock described by a store configuration.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.lock_path(),
            config.lock_timeout,
            config.max_retries,
            config.retry_delay,
        )
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock, waiting for a live holder to let go.
    ///
    /// # Errors
    ///
    /// - `Error::LockTimeout` once every retry found the lock held
    /// - `Error::Io` if the lock file cannot be inspected or created
    pub async fn acquire(&self) -> Result<LockGuard> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            self.remove_if_stale().await?;

            match self.try_create().await {
                Ok(()) => {
                    debug!(path = %self.path.display(), attempts, "Lock acquired");
                    return Ok(LockGuard {
                        path: self.path.clone(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempts > self.max_retries {
                        return Err(Error::LockTimeout {
                            path: self.path.clone(),
                            attempts,
                        });
                    }
                    debug!(path = %self.path.display(), attempts, "Lock held, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_create(&self) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await?;

        let written = async {
            let body = serde_json::to_vec(&LockBody::current())?;
            file.write_all(&body).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&self.path).await;
            return Err(e);
        }
        Ok(())
    }

    /// Remove the lock file if it is older than the timeout.
    async fn remove_if_stale(&self) -> Result<()> {
        let Some(age) = self.age().await? else {
            return Ok(());
        };
        if age <= self.timeout {
            return Ok(());
        }

        warn!(
            path = %self.path.display(),
            age = ?age,
            "Removing stale lock file"
        );
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Age of the current lock, or `None` if there is no lock file.
    async fn age(&self) -> Result<Option<Duration>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Ok(body) = serde_json::from_slice::<LockBody>(&content) {
            let elapsed = Utc::now().timestamp_millis() - body.timestamp_millis;
            return Ok(Some(Duration::from_millis(
                u64::try_from(elapsed).unwrap_or_default(),
            )));
        }

        let modified = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default(),
        ))
    }
}

/// A held lock.
///
/// Call [`LockGuard::release`] when done; if the guard is dropped without
/// it (a panic, an early return) the lock file is removed on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file.
    ///
    /// A lock file that is already gone is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file exists but cannot be removed.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Lock released");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Lock file already removed at release");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Lock released on drop"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Lock file already removed at drop");
            }
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove lock file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quick_lock(dir: &TempDir, max_retries: u32) -> FileLock {
        FileLock::new(
            dir.path().join("records.lock"),
            Duration::from_secs(30),
            max_retries,
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn acquire_writes_body_and_release_removes_it() {
        let dir = TempDir::new().unwrap();
        let lock = quick_lock(&dir, 0);

        let guard = lock.acquire().await.unwrap();
        let body: LockBody =
            serde_json::from_slice(&std::fs::read(lock.path()).unwrap()).unwrap();
        assert_eq!(body.owner_id, std::process::id());

        guard.release().await.unwrap();
        assert!(!lock.path().exists());
    }

    #[test]
    fn body_uses_camel_case_keys() {
        let json = serde_json::to_string(&LockBody {
            owner_id: 7,
            timestamp_millis: 12,
        })
        .unwrap();
        assert_eq!(json, r#"{"ownerId":7,"timestampMillis":12}"#);
    }

    #[tokio::test]
    async fn held_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let lock = quick_lock(&dir, 2);
        let _held = lock.acquire().await.unwrap();

        let err = lock.acquire().await.unwrap_err();

        assert!(matches!(err, Error::LockTimeout { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn drop_removes_unreleased_lock() {
        let dir = TempDir::new().unwrap();
        let lock = quick_lock(&dir, 0);

        {
            let _guard = lock.acquire().await.unwrap();
            assert!(lock.path().exists());
        }

        assert!(!lock.path().exists());
    }

    #[tokio::test]
    async fn release_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let lock = quick_lock(&dir, 0);
        let guard = lock.acquire().await.unwrap();
        std::fs::remove_file(lock.path()).unwrap();

        guard.release().await.unwrap();
    }

    #[tokio::test]
    async fn stale_body_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let lock = quick_lock(&dir, 0);
        let old = LockBody {
            owner_id: 1,
            timestamp_millis: Utc::now().timestamp_millis() - 60_000,
        };
        std::fs::write(lock.path(), serde_json::to_vec(&old).unwrap()).unwrap();

        let guard = lock.acquire().await.unwrap();
        guard.release().await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_body_falls_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        let lock = quick_lock(&dir, 1);
        std::fs::write(lock.path(), b"").unwrap();

        let err = lock.acquire().await.unwrap_err();

        assert!(matches!(err, Error::LockTimeout { .. }));
        assert!(lock.path().exists());
    }
}
