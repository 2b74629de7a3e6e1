/// `MetadataExtractor` implementation for images and videos
use crate::error::MetadataError;
use crate::still::read_image;
use crate::video::VideoProbe;
use async_trait::async_trait;
use std::path::Path;
use vuvur_core::{MediaKind, MediaMetadata, MetadataExtractor};

/// Extracts metadata with the image decoders and an external video probe
///
/// Image decoding runs on the blocking thread pool. An `Err` means nothing
/// usable could be read; callers index the file with empty metadata.
#[derive(Debug, Clone, Default)]
pub struct MediaExtractor {
    probe: VideoProbe,
}

impl MediaExtractor {
    /// Create an extractor that probes videos with `probe`
    pub fn new(probe: VideoProbe) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl MetadataExtractor for MediaExtractor {
    async fn extract(&self, path: &Path, kind: MediaKind) -> vuvur_core::Result<MediaMetadata> {
        match kind {
            MediaKind::Image => {
                let path = path.to_path_buf();
                let metadata = tokio::task::spawn_blocking(move || read_image(&path))
                    .await
                    .map_err(|e| MetadataError::Task(e.to_string()))??;
                Ok(metadata)
            }
            MediaKind::Video => {
                let (width, height) = self.probe.dimensions(path).await?;
                Ok(MediaMetadata::dimensions(width, height))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_video_probe_failure_is_error() {
        let extractor = MediaExtractor::new(VideoProbe::new(
            "/nonexistent/ffprobe",
            std::time::Duration::from_secs(1),
        ));
        let result = extractor
            .extract(Path::new("/tmp/clip.mp4"), MediaKind::Video)
            .await;
        assert!(result.is_err());
    }
}
