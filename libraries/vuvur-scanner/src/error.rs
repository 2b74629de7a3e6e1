//! Error types for the scanner

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] vuvur_storage::StorageError),

    #[error("Core error: {0}")]
    Core(#[from] vuvur_core::VuvurError),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Scan task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
