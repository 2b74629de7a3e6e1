//! Vuvur Storage
//!
//! `SQLite` index for the Vuvur media gallery.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each feature owns its own queries (`media`, `settings`)
//! - **Derived search**: `media_fts` is an FTS5 projection maintained by
//!   triggers, so every write through `media` keeps it consistent inside the
//!   same transaction
//! - **Batch writes**: scan reconciliation writes each insert/update/delete
//!   group in its own transaction
//!
//! # Example
//!
//! ```rust,no_run
//! use vuvur_storage::{create_pool, run_migrations, media};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://vuvur.db").await?;
//! run_migrations(&pool).await?;
//!
//! let snapshot = media::fingerprints(&pool).await?;
//! println!("{} indexed files", snapshot.len());
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod media;
pub mod settings;

pub use error::{Result, StorageError};

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://vuvur.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!("Creating pool with URL: {}", database_url);

    // Parse the URL into options so we can configure SQLite behavior
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true) // Create database file if it doesn't exist
        .journal_mode(SqliteJournalMode::Wal) // Readers never block on the scanner's writes
        .busy_timeout(std::time::Duration::from_secs(30)); // Wait up to 30s for locks

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("Pool created");

    Ok(pool)
}

/// Current time as Unix epoch seconds
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
