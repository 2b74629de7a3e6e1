//! Observable scan status
//!
//! One `ScanStatusHandle` is created at process start and cloned into the
//! scan coordinator, the extraction pool and every status reader. Only the
//! running cycle writes to it.
//!
//! `processed` is an atomic counter so extraction workers can advance it
//! without taking the lock; `flush()` copies it into the published snapshot
//! (and, when configured, into a JSON file other processes can read).
//! File writes are blocking; async callers flushing often should run them
//! on a blocking thread.

use crate::types::ScanStatus;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Inner {
    processed: AtomicU64,
    snapshot: RwLock<ScanStatus>,
    persist_path: Option<PathBuf>,
}

/// Shared handle to the process-wide scan status
#[derive(Debug, Clone, Default)]
pub struct ScanStatusHandle {
    inner: Arc<Inner>,
}

impl ScanStatusHandle {
    /// Create an in-memory status handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a status handle that also writes every flush to `path`
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                persist_path: Some(path.into()),
                ..Default::default()
            }),
        }
    }

    /// Read a status previously flushed to `path` by any process
    pub fn read_file(path: &Path) -> Option<ScanStatus> {
        let data = std::fs::read(path).ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ScanStatus {
        let mut status = self
            .inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if status.running {
            status.processed = self.inner.processed.load(Ordering::Acquire);
        }
        status
    }

    /// Whether a cycle is in progress
    pub fn is_running(&self) -> bool {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }

    /// Reset to `{running: true, processed: 0, total}`
    ///
    /// The coordinator starts with `total = 0` and calls `set_total` once
    /// change detection knows how many candidates there are, so readers see
    /// `total == 0` while the library is still being enumerated.
    pub fn begin(&self, total: u64) {
        self.update(|inner, status| {
            inner.processed.store(0, Ordering::Release);
            status.running = true;
            status.processed = 0;
            status.total = total;
            status.started_at = Some(Utc::now());
            status.last_error = None;
        });
    }

    /// Set the number of items the cycle will process
    pub fn set_total(&self, total: u64) {
        self.update(|_, status| status.total = total);
    }

    /// Count one completed item, returning the new processed count
    pub fn advance(&self) -> u64 {
        self.inner.processed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publish the atomic counter into the snapshot
    ///
    /// The counter is read under the snapshot lock and the published value
    /// only moves forward, so concurrent flushes never regress `processed`.
    pub fn flush(&self) {
        self.update(|inner, status| {
            if status.running {
                let processed = inner.processed.load(Ordering::Acquire);
                status.processed = status.processed.max(processed);
            }
        });
    }

    /// Mark the cycle finished, with the error that ended it if any
    pub fn finish(&self, error: Option<String>) {
        self.update(|inner, status| {
            status.running = false;
            status.processed = status.total;
            status.finished_at = Some(Utc::now());
            status.last_error = error;
            inner.processed.store(status.total, Ordering::Release);
        });
    }

    /// Apply `f` and mirror the result to the status file
    ///
    /// The file is written while the snapshot lock is held, so the file
    /// sees updates in the same order as in-memory readers.
    fn update(&self, f: impl FnOnce(&Inner, &mut ScanStatus)) {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.clone();
        f(&self.inner, &mut guard);

        if *guard == before {
            return;
        }
        if let Some(path) = &self.inner.persist_path {
            if let Err(e) = write_status_file(path, &guard) {
                tracing::warn!("Failed to write scan status to {}: {}", path.display(), e);
            }
        }
    }
}

fn write_status_file(path: &Path, status: &ScanStatus) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec(status).map_err(std::io::Error::other)?;
    // Write-then-rename so readers never see a torn file; the pid keeps
    // processes sharing the data directory off each other's temp file
    let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
    std::fs::write(&tmp, data)?;
    std::fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let status = ScanStatusHandle::new();
        assert!(!status.is_running());

        status.begin(0);
        status.set_total(3);
        assert_eq!(status.advance(), 1);
        assert_eq!(status.advance(), 2);

        let mid = status.snapshot();
        assert!(mid.running);
        assert_eq!(mid.processed, 2);
        assert_eq!(mid.total, 3);

        status.finish(None);
        let done = status.snapshot();
        assert!(!done.running);
        assert_eq!(done.processed, 3);
        assert!(done.finished_at.is_some());
        assert!(done.last_error.is_none());
    }

    #[test]
    fn test_concurrent_advance() {
        let status = ScanStatusHandle::new();
        status.begin(800);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let status = status.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        status.advance();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        status.flush();
        assert_eq!(status.snapshot().processed, 800);
    }

    #[test]
    fn test_failed_cycle_keeps_error() {
        let status = ScanStatusHandle::new();
        status.begin(5);
        status.finish(Some("database is locked".to_string()));

        let snapshot = status.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.last_error.as_deref(), Some("database is locked"));

        status.begin(1);
        assert!(status.snapshot().last_error.is_none());
    }

    #[test]
    fn test_status_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("data").join("scan_status.json");

        let status = ScanStatusHandle::with_file(&path);
        status.begin(10);
        status.advance();
        status.flush();

        let on_disk = ScanStatusHandle::read_file(&path).unwrap();
        assert!(on_disk.running);
        assert_eq!(on_disk.processed, 1);
        assert_eq!(on_disk.total, 10);
    }

    #[test]
    fn test_concurrent_flushes_never_regress_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("scan_status.json");

        let status = ScanStatusHandle::with_file(&path);
        status.begin(1600);

        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let reader = {
            let path = path.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut last = 0;
                let mut regressions = 0;
                while !done.load(Ordering::Acquire) {
                    if let Some(on_disk) = ScanStatusHandle::read_file(&path) {
                        if on_disk.processed < last {
                            regressions += 1;
                        }
                        last = on_disk.processed;
                    }
                }
                regressions
            })
        };

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let status = status.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        status.advance();
                        status.flush();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);

        assert_eq!(reader.join().unwrap(), 0);
        let on_disk = ScanStatusHandle::read_file(&path).unwrap();
        assert_eq!(on_disk.processed, 1600);
        assert_eq!(status.snapshot().processed, 1600);
    }

    #[test]
    fn test_flush_after_finish_is_ignored() {
        let status = ScanStatusHandle::new();
        status.begin(2);
        status.advance();
        status.finish(None);

        status.flush();
        let snapshot = status.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.processed, 2);
    }
}
