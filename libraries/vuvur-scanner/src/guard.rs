//! Single-flight scanning
//!
//! A cycle starts only when:
//! 1. no cycle is in flight in this process (atomic flag), and
//! 2. the cross-process `ScanLock` is acquired within the lock timeout.
//!
//! A trigger that loses either race is dropped, never queued. `trigger`
//! probes the lock without waiting, so a cycle running in another process
//! is reported to the caller instead of being skipped later. The initial
//! scan additionally checks the completion marker before and after taking
//! the lock, so processes starting together run it once.

use crate::coordinator::{ScanCoordinator, ScanSummary};
use crate::lock::{HeldLock, ScanLock};
use crate::marker::InitialScanMarker;
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use vuvur_core::ScanStatusHandle;

/// Why a cycle did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle is in flight in this process
    AlreadyRunning,
    /// Another process held the lock past the timeout
    LockTimeout,
    /// The initial scan has already completed
    AlreadyInitialized,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "scan already in progress"),
            Self::LockTimeout => write!(f, "scan already in progress in another process"),
            Self::AlreadyInitialized => write!(f, "initial scan already completed"),
        }
    }
}

/// Result of asking for a cycle
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Completed(ScanSummary),
    Skipped(SkipReason),
}

/// Result of a fire-and-forget trigger
#[derive(Debug)]
pub enum TriggerResponse {
    /// A cycle was started; the handle resolves when it ends
    Accepted(JoinHandle<Result<ScanOutcome>>),
    /// A cycle is already in flight here or in another process
    Rejected(SkipReason),
}

impl TriggerResponse {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

struct GuardInner {
    coordinator: ScanCoordinator,
    lock: Arc<dyn ScanLock>,
    marker: InitialScanMarker,
    lock_timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the cycle ends, including on panic
struct FlightToken(Arc<AtomicBool>);

impl Drop for FlightToken {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Entry point for every scan trigger
#[derive(Clone)]
pub struct ScanGuard {
    inner: Arc<GuardInner>,
}

impl ScanGuard {
    pub fn new(
        coordinator: ScanCoordinator,
        lock: Arc<dyn ScanLock>,
        marker: InitialScanMarker,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                coordinator,
                lock,
                marker,
                lock_timeout,
                in_flight: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn status(&self) -> &ScanStatusHandle {
        self.inner.coordinator.status()
    }

    /// Whether a cycle is in flight in this process
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    fn claim(&self) -> Option<FlightToken> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightToken(self.inner.in_flight.clone()))
    }

    /// Run one cycle now if nothing else is scanning
    pub async fn run_once(&self) -> Result<ScanOutcome> {
        let Some(token) = self.claim() else {
            tracing::info!("Scan requested while one is running, ignoring");
            return Ok(ScanOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        let Some(held) = self.inner.lock.acquire(self.inner.lock_timeout).await? else {
            tracing::warn!(
                "Could not acquire scan lock within {:?}, skipping this cycle",
                self.inner.lock_timeout
            );
            return Ok(ScanOutcome::Skipped(SkipReason::LockTimeout));
        };
        self.run_locked(token, held).await
    }

    async fn run_locked(&self, token: FlightToken, held: HeldLock) -> Result<ScanOutcome> {
        let result = self.inner.coordinator.run_cycle().await;
        // Lock first, so the guard never looks idle while the lock is still taken
        drop(held);
        drop(token);
        Ok(ScanOutcome::Completed(result?))
    }

    /// Run the initial scan unless some process already completed it
    pub async fn run_initial(&self) -> Result<ScanOutcome> {
        let marker = &self.inner.marker;
        if marker.exists() {
            tracing::info!("Initial scan already completed, skipping");
            return Ok(ScanOutcome::Skipped(SkipReason::AlreadyInitialized));
        }

        let Some(_token) = self.claim() else {
            return Ok(ScanOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        let Some(_held) = self.inner.lock.acquire(self.inner.lock_timeout).await? else {
            tracing::warn!("Could not acquire scan lock for the initial scan, skipping");
            return Ok(ScanOutcome::Skipped(SkipReason::LockTimeout));
        };

        // Another process may have finished it while we waited
        if marker.exists() {
            tracing::info!("Initial scan completed by another process");
            return Ok(ScanOutcome::Skipped(SkipReason::AlreadyInitialized));
        }

        tracing::info!("Running initial scan");
        let summary = self.inner.coordinator.run_cycle().await?;
        marker.mark()?;
        Ok(ScanOutcome::Completed(summary))
    }

    /// Start a cycle in the background without waiting for it
    ///
    /// The in-flight flag and the scan lock are both taken before this
    /// returns, so a second trigger right after an accepted one is rejected,
    /// in this process or any other sharing the lock.
    pub async fn trigger(&self) -> Result<TriggerResponse> {
        let Some(token) = self.claim() else {
            return Ok(TriggerResponse::Rejected(SkipReason::AlreadyRunning));
        };

        let Some(held) = self.inner.lock.acquire(Duration::ZERO).await? else {
            tracing::info!("Scan requested while another process is scanning, ignoring");
            return Ok(TriggerResponse::Rejected(SkipReason::LockTimeout));
        };

        let guard = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = guard.run_locked(token, held).await;
            if let Err(e) = &outcome {
                tracing::error!("Triggered scan failed: {}", e);
            }
            outcome
        });

        Ok(TriggerResponse::Accepted(handle))
    }
}
