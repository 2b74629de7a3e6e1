//! Vuvur Library Scanner
//!
//! Keeps the media index in agreement with the files under the media roots.
//!
//! # Features
//!
//! - Incremental scans: only NEW or MODIFIED files (by size + mtime) are re-read
//! - Bounded concurrent metadata extraction; one bad file never fails a scan
//! - Batched, transactional index writes with the search index kept in step
//! - Single-flight scanning within a process and across processes
//! - One-time initial scan and a periodic interval that can be changed live
//!
//! # Architecture
//!
//! - `enumerator`: filesystem walk with recycle-bin exclusion
//! - `detector`: NEW / MODIFIED / UNCHANGED / DELETED classification
//! - `pool`: concurrent extraction with progress reporting
//! - `reconciler`: insert / update / delete batches
//! - `coordinator`: one full cycle
//! - `lock`, `marker`, `guard`: who may run a cycle, and when
//! - `scheduler`: initial + periodic triggering

mod error;

pub mod coordinator;
pub mod detector;
pub mod enumerator;
pub mod guard;
pub mod lock;
pub mod marker;
pub mod pool;
pub mod reconciler;
pub mod scheduler;

pub use coordinator::{ScanConfig, ScanCoordinator, ScanSummary};
pub use error::ScanError;
pub use guard::{ScanGuard, ScanOutcome, SkipReason, TriggerResponse};
pub use lock::{FileScanLock, HeldLock, InMemoryScanLock, ScanLock};
pub use marker::InitialScanMarker;
pub use scheduler::ScanScheduler;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, ScanError>;
