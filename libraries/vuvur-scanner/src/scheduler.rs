//! Periodic scan scheduling
//!
//! The interval comes from a `watch` channel so settings changes apply
//! without a restart. A zero interval disables periodic scans until the
//! interval changes again. Changing the interval restarts the wait.

use crate::guard::{ScanGuard, ScanOutcome};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct ScanScheduler {
    guard: ScanGuard,
    interval: watch::Receiver<Duration>,
}

impl ScanScheduler {
    pub fn new(guard: ScanGuard, interval: watch::Receiver<Duration>) -> Self {
        Self { guard, interval }
    }

    /// Run the initial scan, then the periodic loop, on a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.guard.run_initial().await {
                Ok(outcome) => log_outcome("Initial", &outcome),
                Err(e) => tracing::error!("Initial scan failed: {}", e),
            }
            self.run().await;
        })
    }

    /// Periodic loop
    ///
    /// If the interval sender is dropped the last interval keeps applying.
    pub async fn run(mut self) {
        let mut detached = false;

        loop {
            let period = *self.interval.borrow_and_update();

            if period.is_zero() {
                if detached {
                    tracing::info!("Periodic scanning disabled");
                    return;
                }
                tracing::debug!("Periodic scanning disabled, waiting for a new interval");
                if self.interval.changed().await.is_err() {
                    detached = true;
                }
                continue;
            }

            if detached {
                tokio::time::sleep(period).await;
            } else {
                tokio::select! {
                    () = tokio::time::sleep(period) => {}
                    changed = self.interval.changed() => {
                        if changed.is_err() {
                            detached = true;
                        }
                        continue;
                    }
                }
            }

            match self.guard.run_once().await {
                Ok(outcome) => log_outcome("Periodic", &outcome),
                Err(e) => tracing::error!("Periodic scan failed: {}", e),
            }
        }
    }
}

fn log_outcome(kind: &str, outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Completed(summary) => {
            tracing::debug!("{} scan completed: {:?}", kind, summary);
        }
        ScanOutcome::Skipped(reason) => tracing::info!("{} scan skipped: {}", kind, reason),
    }
}
