/// Recycle bin - delete by moving into an excluded subtree
use crate::error::Result;
use sqlx::SqlitePool;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use vuvur_core::MediaRecord;
use vuvur_storage::media;

/// What happened to the file behind a deleted record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// File moved to this path
    Moved(PathBuf),
    /// File was already gone; only the record was removed
    Missing,
}

#[derive(Debug, Clone)]
pub struct RecycleBin {
    dir: PathBuf,
}

impl RecycleBin {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move the file into the bin and remove its record
    ///
    /// The record is removed even when the file is already missing. A record
    /// that vanished concurrently (e.g. a scan reconciled it away) is not an
    /// error.
    pub async fn delete(&self, pool: &SqlitePool, record: &MediaRecord) -> Result<DeleteOutcome> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let source = PathBuf::from(&record.path);
        let outcome = match self.move_into_bin(&source, &record.filename).await {
            Ok(destination) => {
                tracing::info!("Moved {:?} to {:?}", source, destination);
                DeleteOutcome::Moved(destination)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("File {:?} already missing, removing record only", source);
                DeleteOutcome::Missing
            }
            Err(e) => return Err(e.into()),
        };

        if !media::delete_by_id(pool, record.id).await? {
            tracing::debug!("Record {} was already gone", record.id);
        }

        Ok(outcome)
    }

    async fn move_into_bin(&self, source: &Path, filename: &str) -> std::io::Result<PathBuf> {
        // Surface NotFound before picking a destination
        tokio::fs::metadata(source).await?;

        let destination = free_destination(&self.dir, filename).await?;
        match tokio::fs::rename(source, &destination).await {
            Ok(()) => Ok(destination),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
            Err(e) => {
                // Bin on another filesystem
                tracing::debug!("Rename failed ({}), copying instead", e);
                tokio::fs::copy(source, &destination).await?;
                tokio::fs::remove_file(source).await?;
                Ok(destination)
            }
        }
    }
}

/// `name`, or `stem (n).ext` for the first `n` not already taken
async fn free_destination(dir: &Path, filename: &str) -> std::io::Result<PathBuf> {
    let candidate = dir.join(filename);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let extension = path.extension().and_then(|e| e.to_str());

    let mut n = 1u32;
    loop {
        let name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}
