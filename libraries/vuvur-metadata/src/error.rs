/// Metadata-specific errors
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `MetadataError`
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Metadata error types
#[derive(Error, Debug)]
pub enum MetadataError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Image could not be opened or decoded
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// PNG text chunks could not be read
    #[error("PNG decode error: {0}")]
    Png(#[from] png::DecodingError),

    /// Probe process exited unsuccessfully or printed something unusable
    #[error("Video probe failed: {0}")]
    Probe(String),

    /// Probe process did not finish in time
    #[error("Video probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    /// Blocking decode task was cancelled or panicked
    #[error("Decode task failed: {0}")]
    Task(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<MetadataError> for vuvur_core::VuvurError {
    fn from(err: MetadataError) -> Self {
        vuvur_core::VuvurError::metadata(err.to_string())
    }
}
