//! Scan progress types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of scan progress as seen by status readers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    /// Whether a cycle is currently running
    pub running: bool,

    /// Candidates processed so far in the current (or last) cycle
    pub processed: u64,

    /// Candidates selected for extraction in the current (or last) cycle
    ///
    /// Zero while a running cycle is still enumerating the library.
    pub total: u64,

    /// When the current (or last) cycle started
    pub started_at: Option<DateTime<Utc>>,

    /// When the last cycle finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Error of the last cycle, if it failed
    pub last_error: Option<String>,
}

impl ScanStatus {
    /// Fraction of work done
    ///
    /// 0.0 while a cycle is still counting its candidates, 1.0 when an idle
    /// cycle had nothing to do.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            if self.running {
                0.0
            } else {
                1.0
            }
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}
