//! Scan mutual exclusion across processes
//!
//! `FileScanLock` holds an advisory exclusive lock on a file shared by every
//! process that writes the same index. `InMemoryScanLock` is the
//! single-process equivalent.
//!
//! Uses the `fs2` crate for cross-platform file locking (MSRV 1.75 compatible).

use crate::{Result, ScanError};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Proof that the scan lock is held; released on drop
pub struct HeldLock {
    _inner: Box<dyn Send + Sync>,
}

impl HeldLock {
    fn new(inner: impl Send + Sync + 'static) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl std::fmt::Debug for HeldLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeldLock").finish_non_exhaustive()
    }
}

/// Acquire-with-timeout exclusion for scan cycles
#[async_trait]
pub trait ScanLock: Send + Sync {
    /// Try to take the lock for up to `timeout`
    ///
    /// Returns `Ok(None)` when the lock is still held elsewhere after the
    /// timeout.
    async fn acquire(&self, timeout: Duration) -> Result<Option<HeldLock>>;
}

/// Advisory lock on a file
#[derive(Debug, Clone)]
pub struct FileScanLock {
    path: PathBuf,
}

struct FileGuard {
    file: File,
    path: PathBuf,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        tracing::debug!("Releasing scan lock: {}", self.path.display());
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

impl FileScanLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| ScanError::Lock(format!("{}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl ScanLock for FileScanLock {
    async fn acquire(&self, timeout: Duration) -> Result<Option<HeldLock>> {
        let file = self.open()?;
        let deadline = Instant::now() + timeout;

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    tracing::debug!("Acquired scan lock: {}", self.path.display());
                    return Ok(Some(HeldLock::new(FileGuard {
                        file,
                        path: self.path.clone(),
                    })));
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    return Err(ScanError::Lock(format!("{}: {}", self.path.display(), e)));
                }
            }
        }
    }
}

/// Process-local lock for single-process deployments and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryScanLock {
    mutex: Arc<Mutex<()>>,
}

impl InMemoryScanLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanLock for InMemoryScanLock {
    async fn acquire(&self, timeout: Duration) -> Result<Option<HeldLock>> {
        match tokio::time::timeout(timeout, self.mutex.clone().lock_owned()).await {
            Ok(guard) => Ok(Some(HeldLock::new(guard))),
            Err(_) => Ok(None),
        }
    }
}
