/// Core traits for Vuvur
use crate::error::Result;
use crate::types::{MediaKind, MediaMetadata};
use async_trait::async_trait;
use std::path::Path;

/// Metadata extractor trait
///
/// Implementers read structural and descriptive metadata from one file.
/// Errors are per-file: callers index the file with empty metadata rather
/// than abandoning a batch.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extract metadata from the file at `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, decoded or probed
    async fn extract(&self, path: &Path, kind: MediaKind) -> Result<MediaMetadata>;
}
