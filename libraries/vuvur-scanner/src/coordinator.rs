//! One scan cycle end to end
//!
//! enumerate -> detect -> extract -> reconcile, each stage consuming the
//! complete output of the previous one. The coordinator does no locking of
//! its own; `ScanGuard` decides whether a cycle may start.

use crate::detector::{ChangeDetector, ChangeSet};
use crate::enumerator::DiskEnumerator;
use crate::pool::{ExtractionOutcome, ExtractionPool};
use crate::reconciler::IndexReconciler;
use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vuvur_core::{MetadataExtractor, ScanStatusHandle};
use vuvur_storage::media;

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Media roots to walk
    pub roots: Vec<PathBuf>,

    /// Subtree excluded from every walk
    pub recycle_bin: Option<PathBuf>,

    /// Concurrent extraction workers (default: CPU count)
    pub workers: usize,

    /// Publish progress every N extracted files
    pub flush_every: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            recycle_bin: None,
            workers: num_cpus::get(),
            flush_every: 100,
        }
    }
}

/// What a completed cycle did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub discovered: usize,
    pub unchanged: usize,
    pub extracted: usize,
    pub failed: usize,
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    pub elapsed: Duration,
}

impl ScanSummary {
    /// True when the cycle wrote nothing
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Runs scan cycles against one index
pub struct ScanCoordinator {
    pool: SqlitePool,
    enumerator: DiskEnumerator,
    extraction: ExtractionPool,
    reconciler: IndexReconciler,
    status: ScanStatusHandle,
}

impl ScanCoordinator {
    pub fn new(
        pool: SqlitePool,
        config: &ScanConfig,
        extractor: Arc<dyn MetadataExtractor>,
        status: ScanStatusHandle,
    ) -> Self {
        let mut enumerator = DiskEnumerator::new(config.roots.clone());
        if let Some(bin) = &config.recycle_bin {
            enumerator = enumerator.exclude_recycle_bin(bin);
        }

        Self {
            reconciler: IndexReconciler::new(pool.clone()),
            extraction: ExtractionPool::new(extractor, config.workers, config.flush_every),
            enumerator,
            pool,
            status,
        }
    }

    pub fn status(&self) -> &ScanStatusHandle {
        &self.status
    }

    /// Run one full cycle
    ///
    /// Status is reset at the start and marked finished at the end whether
    /// the cycle succeeds or fails.
    pub async fn run_cycle(&self) -> Result<ScanSummary> {
        let started = Instant::now();
        tracing::info!("Starting library scan");
        self.status.begin(0);

        match self.cycle(started).await {
            Ok(summary) => {
                self.status.finish(None);
                tracing::info!(
                    "Library scan finished in {:.2}s: {} new, {} updated, {} removed, {} failed",
                    summary.elapsed.as_secs_f64(),
                    summary.inserted,
                    summary.updated,
                    summary.deleted,
                    summary.failed
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Library scan failed: {}", e);
                self.status.finish(Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn cycle(&self, started: Instant) -> Result<ScanSummary> {
        let snapshot = media::fingerprints(&self.pool).await?;
        tracing::debug!("Index contains {} records", snapshot.len());

        let enumerator = self.enumerator.clone();
        let (discovered, changes) = tokio::task::spawn_blocking(move || {
            let found = enumerator.enumerate();
            let discovered = found.len();
            (discovered, ChangeDetector::new(&snapshot).detect(found))
        })
        .await?;

        let ChangeSet {
            new,
            modified,
            unchanged,
            deleted,
        } = changes;
        tracing::info!(
            "Found {} media files: {} new, {} modified, {} unchanged, {} missing",
            discovered,
            new.len(),
            modified.len(),
            unchanged,
            deleted.len()
        );

        let new_count = new.len();
        let mut candidates = new;
        candidates.extend(modified);
        let extracted = candidates.len();
        self.status.set_total(extracted as u64);

        let mut outcomes = self.extraction.run(candidates, &self.status).await;
        let failed = outcomes.iter().filter(|o| o.is_failure()).count();

        // Outcomes keep candidate order: NEW first, then MODIFIED
        let modified_outcomes = outcomes.split_off(new_count);
        let inserts: Vec<_> = outcomes.into_iter().map(ExtractionOutcome::into_media).collect();
        let updates: Vec<_> = modified_outcomes
            .into_iter()
            .map(ExtractionOutcome::into_media)
            .collect();

        let written = self.reconciler.apply(&inserts, &updates, &deleted).await?;

        Ok(ScanSummary {
            discovered,
            unchanged,
            extracted,
            failed,
            inserted: written.inserted,
            updated: written.updated,
            deleted: written.deleted,
            elapsed: started.elapsed(),
        })
    }
}
