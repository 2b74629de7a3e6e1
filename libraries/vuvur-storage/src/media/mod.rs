//! Media index storage
//!
//! The scanner is the only writer of scan-owned columns. `liked` belongs to
//! curation and is never touched by `insert_batch`/`update_batch` on an
//! existing row.
//!
//! # Example
//!
//! ```rust,no_run
//! use vuvur_storage::media;
//!
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! // Paths the scanner no longer sees on disk
//! let gone = vec!["/mnt/gallery/old.png".to_string()];
//! let removed = media::delete_batch(pool, &gone).await?;
//! # Ok(())
//! # }
//! ```

mod listing;

pub use listing::{fts_query, groups, list, paths_in_group, random, search, subgroups};

use crate::error::{Result, StorageError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use vuvur_core::{Fingerprint, MediaKind, MediaRecord, ScannedMedia};

/// Column list shared by every query that returns `MediaRecord`
pub(crate) const MEDIA_COLUMNS: &str = "media.id, media.path, media.filename, media.kind, \
     media.size, media.mod_time, media.width, media.height, media.descriptive_text, \
     media.raw_metadata, media.group_tag, media.liked";

/// Fingerprints of every indexed path (the change-detection snapshot)
pub async fn fingerprints(pool: &SqlitePool) -> Result<HashMap<String, Fingerprint>> {
    let rows = sqlx::query("SELECT path, size, mod_time FROM media")
        .fetch_all(pool)
        .await?;

    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        map.insert(
            row.try_get::<String, _>("path")?,
            Fingerprint {
                size: row.try_get("size")?,
                mod_time: row.try_get("mod_time")?,
            },
        );
    }

    Ok(map)
}

/// Get all records ordered by path
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<MediaRecord>> {
    let sql = format!("SELECT {} FROM media ORDER BY media.path", MEDIA_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(record_from_row).collect()
}

/// Get a record by ID
pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<MediaRecord>> {
    let sql = format!("SELECT {} FROM media WHERE media.id = ?", MEDIA_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(record_from_row).transpose()
}

/// Get a record by path
pub async fn get_by_path(pool: &SqlitePool, path: &str) -> Result<Option<MediaRecord>> {
    let sql = format!("SELECT {} FROM media WHERE media.path = ?", MEDIA_COLUMNS);
    let row = sqlx::query(&sql).bind(path).fetch_optional(pool).await?;
    row.as_ref().map(record_from_row).transpose()
}

/// Number of indexed records
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS cnt FROM media")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("cnt")?)
}

/// IDs of every indexed record
pub async fn all_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT id FROM media").fetch_all(pool).await?;
    rows.iter()
        .map(|row| row.try_get::<i64, _>("id").map_err(StorageError::from))
        .collect()
}

/// Insert newly discovered files in one transaction
///
/// A path that is already indexed (for example inserted by a concurrent
/// process) is upserted, so the batch never fails on the unique key.
pub async fn insert_batch(pool: &SqlitePool, items: &[ScannedMedia]) -> Result<u64> {
    if items.is_empty() {
        return Ok(0);
    }

    let now = crate::now();
    let mut tx = pool.begin().await?;
    let mut affected = 0;

    for item in items {
        let raw_metadata = encode_raw_metadata(item)?;
        let result = sqlx::query(
            r#"
            INSERT INTO media (path, filename, kind, size, mod_time, width, height,
                               descriptive_text, raw_metadata, group_tag, indexed_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                filename = excluded.filename,
                kind = excluded.kind,
                size = excluded.size,
                mod_time = excluded.mod_time,
                width = excluded.width,
                height = excluded.height,
                descriptive_text = excluded.descriptive_text,
                raw_metadata = excluded.raw_metadata,
                group_tag = excluded.group_tag,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&item.path)
        .bind(&item.filename)
        .bind(item.kind.as_str())
        .bind(item.fingerprint.size)
        .bind(item.fingerprint.mod_time)
        .bind(item.metadata.width.map(i64::from))
        .bind(item.metadata.height.map(i64::from))
        .bind(&item.metadata.descriptive_text)
        .bind(raw_metadata)
        .bind(&item.group_tag)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        affected += result.rows_affected();
    }

    tx.commit().await?;
    Ok(affected)
}

/// Update scan-owned fields of modified files in one transaction
///
/// Rows that vanished since the snapshot was taken are skipped silently.
pub async fn update_batch(pool: &SqlitePool, items: &[ScannedMedia]) -> Result<u64> {
    if items.is_empty() {
        return Ok(0);
    }

    let now = crate::now();
    let mut tx = pool.begin().await?;
    let mut affected = 0;

    for item in items {
        let raw_metadata = encode_raw_metadata(item)?;
        let result = sqlx::query(
            r#"
            UPDATE media
            SET kind = ?, size = ?, mod_time = ?, descriptive_text = ?, width = ?, height = ?,
                raw_metadata = ?, group_tag = ?, updated_at = ?
            WHERE path = ?
            "#,
        )
        .bind(item.kind.as_str())
        .bind(item.fingerprint.size)
        .bind(item.fingerprint.mod_time)
        .bind(&item.metadata.descriptive_text)
        .bind(item.metadata.width.map(i64::from))
        .bind(item.metadata.height.map(i64::from))
        .bind(raw_metadata)
        .bind(&item.group_tag)
        .bind(now)
        .bind(&item.path)
        .execute(&mut *tx)
        .await?;

        affected += result.rows_affected();
    }

    tx.commit().await?;
    Ok(affected)
}

/// Delete records by path in one transaction
pub async fn delete_batch(pool: &SqlitePool, paths: &[String]) -> Result<u64> {
    if paths.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut affected = 0;

    for path in paths {
        let result = sqlx::query("DELETE FROM media WHERE path = ?")
            .bind(path)
            .execute(&mut *tx)
            .await?;
        affected += result.rows_affected();
    }

    tx.commit().await?;
    Ok(affected)
}

/// Delete one record by ID, returning whether it existed
pub async fn delete_by_id(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM media WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Flip the liked flag, returning the new value (None if the record is gone)
pub async fn toggle_like(pool: &SqlitePool, id: i64) -> Result<Option<bool>> {
    let row = sqlx::query(
        "UPDATE media SET liked = CASE liked WHEN 0 THEN 1 ELSE 0 END WHERE id = ? RETURNING liked",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| r.try_get::<bool, _>("liked").map_err(StorageError::from))
        .transpose()
}

fn encode_raw_metadata(item: &ScannedMedia) -> Result<Option<String>> {
    item.metadata
        .raw_metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub(crate) fn record_from_row(row: &SqliteRow) -> Result<MediaRecord> {
    let kind: String = row.try_get("kind")?;
    let kind = MediaKind::from_str(&kind)
        .ok_or_else(|| StorageError::InvalidRow(format!("unknown media kind: {}", kind)))?;

    let raw_metadata = row
        .try_get::<Option<String>, _>("raw_metadata")?
        .and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Unreadable raw_metadata: {}", e);
                None
            }
        });

    Ok(MediaRecord {
        id: row.try_get("id")?,
        path: row.try_get("path")?,
        filename: row.try_get("filename")?,
        kind,
        size: row.try_get("size")?,
        mod_time: row.try_get("mod_time")?,
        width: row.try_get("width")?,
        height: row.try_get("height")?,
        descriptive_text: row.try_get("descriptive_text")?,
        raw_metadata,
        group_tag: row.try_get("group_tag")?,
        liked: row.try_get("liked")?,
    })
}
