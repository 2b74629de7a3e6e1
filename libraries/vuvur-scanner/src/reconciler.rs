//! Applies a cycle's results to the index
//!
//! Inserts, updates and deletes are three transactions. A failure aborts
//! the remaining groups; groups already committed stay committed and the
//! next cycle re-derives whatever is still missing from a fresh enumeration.

use crate::Result;
use sqlx::SqlitePool;
use vuvur_core::ScannedMedia;
use vuvur_storage::media;

/// Rows affected per group
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileSummary {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// Writes scan results to the media index
#[derive(Debug, Clone)]
pub struct IndexReconciler {
    pool: SqlitePool,
}

impl IndexReconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert NEW, update MODIFIED, delete DELETED
    pub async fn apply(
        &self,
        inserts: &[ScannedMedia],
        updates: &[ScannedMedia],
        deletes: &[String],
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        if !inserts.is_empty() {
            tracing::info!("Adding {} new files to the index", inserts.len());
            summary.inserted = media::insert_batch(&self.pool, inserts).await?;
        }

        if !updates.is_empty() {
            tracing::info!("Updating {} modified files in the index", updates.len());
            summary.updated = media::update_batch(&self.pool, updates).await?;
        }

        if !deletes.is_empty() {
            tracing::info!("Removing {} deleted files from the index", deletes.len());
            summary.deleted = media::delete_batch(&self.pool, deletes).await?;
        }

        Ok(summary)
    }
}
