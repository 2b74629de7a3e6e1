//! Test helpers and fixtures for storage integration tests
//!
//! These helpers create test databases using REAL SQLite files (NOT in-memory)
//! so every pooled connection sees the same schema, FTS table and triggers.

#![allow(dead_code)]

use sqlx::SqlitePool;
use tempfile::TempDir;
use vuvur_core::{Fingerprint, MediaKind, MediaMetadata, ScannedMedia};

/// Test database wrapper that cleans up on drop
pub struct TestDb {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let pool = vuvur_storage::create_pool(&db_url)
            .await
            .expect("Failed to create pool");

        vuvur_storage::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            pool,
            _temp_dir: temp_dir,
        }
    }

    /// Get the pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Test fixture: a scanned image under `/media/<group>/`
pub fn scanned(path: &str, size: i64, mod_time: i64) -> ScannedMedia {
    let filename = path.rsplit('/').next().unwrap_or(path).to_string();
    let group_tag = path
        .strip_prefix("/media/")
        .and_then(|rest| rest.split_once('/'))
        .map(|(group, _)| group.to_string());

    ScannedMedia {
        path: path.to_string(),
        filename,
        kind: MediaKind::from_path(std::path::Path::new(path)).unwrap_or(MediaKind::Image),
        fingerprint: Fingerprint { size, mod_time },
        metadata: MediaMetadata::default(),
        group_tag,
    }
}

/// Test fixture: a scanned image carrying descriptive text
pub fn scanned_with_text(path: &str, text: &str) -> ScannedMedia {
    let mut item = scanned(path, 100, 1_700_000_000_000);
    item.metadata = MediaMetadata {
        width: Some(64),
        height: Some(32),
        descriptive_text: Some(text.to_string()),
        raw_metadata: Some(serde_json::json!({ "parameters": text })),
    };
    item
}
