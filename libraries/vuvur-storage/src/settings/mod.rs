//! Persisted setting overrides
//!
//! Only values a user explicitly saved are stored here. Defaults and
//! environment overrides are layered on top by
//! `vuvur_core::settings::SettingsResolver`.
//!
//! # Example
//!
//! ```rust,no_run
//! use vuvur_storage::settings;
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! settings::set_override(pool, "scan_interval", &serde_json::json!(600)).await?;
//!
//! let overrides = settings::get_overrides(pool).await?;
//! assert_eq!(overrides["scan_interval"], 600);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StorageError};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// All stored overrides
///
/// A value that no longer parses is skipped with a warning rather than
/// failing the whole read.
pub async fn get_overrides(pool: &SqlitePool) -> Result<HashMap<String, serde_json::Value>> {
    let rows = sqlx::query("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;

    let mut overrides = HashMap::with_capacity(rows.len());
    for row in rows {
        let key: String = row.try_get("key")?;
        let raw: String = row.try_get("value")?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                overrides.insert(key, value);
            }
            Err(e) => tracing::warn!("Ignoring unreadable setting {}: {}", key, e),
        }
    }

    Ok(overrides)
}

const UPSERT: &str = "INSERT INTO settings (key, value, updated_at)
     VALUES (?, ?, ?)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

fn encode(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

/// Store (or replace) one override
pub async fn set_override(pool: &SqlitePool, key: &str, value: &serde_json::Value) -> Result<()> {
    sqlx::query(UPSERT)
        .bind(key)
        .bind(encode(value)?)
        .bind(crate::now())
        .execute(pool)
        .await?;

    Ok(())
}

/// Store several overrides in one transaction
///
/// Either every key is written or none is.
pub async fn set_overrides(
    pool: &SqlitePool,
    changes: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    let now = crate::now();
    let mut tx = pool.begin().await?;

    for (key, value) in changes {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(encode(value)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}
