/// Thumbnail and preview cache
///
/// Cached JPEGs are named `<media id>.jpg`. Images are resized in-process;
/// videos get a single frame from FFmpeg.
use crate::{
    config::ThumbnailSettings,
    error::{Result, ServerError},
};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use vuvur_core::{MediaKind, MediaRecord};

const FFMPEG_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounding box and JPEG quality for one cached variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

#[derive(Debug, Clone)]
pub struct ThumbnailService {
    thumbs_dir: PathBuf,
    previews_dir: PathBuf,
    ffmpeg_path: PathBuf,
    thumb: Variant,
    preview: Variant,
}

impl ThumbnailService {
    pub fn new(thumbs_dir: PathBuf, previews_dir: PathBuf, settings: &ThumbnailSettings) -> Self {
        Self {
            thumbs_dir,
            previews_dir,
            ffmpeg_path: settings.ffmpeg_path.clone(),
            thumb: Variant {
                max_width: settings.thumb_size,
                max_height: settings.thumb_size,
                quality: settings.thumb_quality,
            },
            preview: Variant {
                max_width: settings.preview_width,
                max_height: settings.preview_height,
                quality: settings.preview_quality,
            },
        }
    }

    /// Create cache directories
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.thumbs_dir).await?;
        tokio::fs::create_dir_all(&self.previews_dir).await?;
        Ok(())
    }

    pub fn thumb_path(&self, id: i64) -> PathBuf {
        self.thumbs_dir.join(format!("{}.jpg", id))
    }

    pub fn preview_path(&self, id: i64) -> PathBuf {
        self.previews_dir.join(format!("{}.jpg", id))
    }

    /// Path of the cached thumbnail, generating it on first use
    pub async fn thumbnail(&self, record: &MediaRecord) -> Result<PathBuf> {
        let dst = self.thumb_path(record.id);
        if tokio::fs::try_exists(&dst).await? {
            return Ok(dst);
        }
        ensure_source(record).await?;

        match record.kind {
            MediaKind::Image => self.render_image(&record.path, &dst, self.thumb).await?,
            MediaKind::Video => self.render_video_frame(&record.path, &dst).await?,
        }
        Ok(dst)
    }

    /// Path of the cached preview; videos reuse their thumbnail
    pub async fn preview(&self, record: &MediaRecord) -> Result<PathBuf> {
        if record.kind == MediaKind::Video {
            return self.thumbnail(record).await;
        }

        let dst = self.preview_path(record.id);
        if tokio::fs::try_exists(&dst).await? {
            return Ok(dst);
        }
        ensure_source(record).await?;

        self.render_image(&record.path, &dst, self.preview).await?;
        Ok(dst)
    }

    /// Drop cached files for one media id
    pub async fn evict(&self, id: i64) {
        for path in [self.thumb_path(id), self.preview_path(id)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!("Evicted {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to evict {:?}: {}", path, e),
            }
        }
    }

    /// Delete cached files whose media id is not in `live_ids`
    ///
    /// Returns the number of files removed.
    pub async fn cleanup(&self, live_ids: &HashSet<i64>) -> Result<usize> {
        let mut removed = 0;
        for dir in [&self.thumbs_dir, &self.previews_dir] {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let orphaned = match cached_id(&path) {
                    Some(id) => !live_ids.contains(&id),
                    // Leftovers from interrupted writes
                    None => true,
                };
                if !orphaned {
                    continue;
                }
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to remove cached file {:?}: {}", path, e),
                }
            }
        }

        tracing::info!("Cache cleanup removed {} files", removed);
        Ok(removed)
    }

    async fn render_image(&self, src: &str, dst: &Path, variant: Variant) -> Result<()> {
        tracing::debug!(
            "Rendering {} into {:?} ({}x{} q{})",
            src,
            dst,
            variant.max_width,
            variant.max_height,
            variant.quality
        );

        let src = PathBuf::from(src);
        let dst = dst.to_path_buf();
        tokio::task::spawn_blocking(move || write_resized(&src, &dst, variant)).await?
    }

    async fn render_video_frame(&self, src: &str, dst: &Path) -> Result<()> {
        tracing::debug!("Extracting video frame from {} into {:?}", src, dst);

        let parent = dst
            .parent()
            .ok_or_else(|| ServerError::Internal(format!("No parent for {:?}", dst)))?;
        tokio::fs::create_dir_all(parent).await?;

        // FFmpeg picks the muxer from the extension, so keep .jpg on the temp file
        let tmp = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile_in(parent)?;

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-y")
            .arg("-ss")
            .arg("00:00:01.000")
            .arg("-i")
            .arg(src)
            .arg("-vframes")
            .arg("1")
            .arg(tmp.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(FFMPEG_TIMEOUT, cmd.output())
            .await
            .map_err(|_| ServerError::Thumbnail(format!("FFmpeg timed out on {}", src)))?
            .map_err(|e| ServerError::Thumbnail(format!("Failed to run FFmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServerError::Thumbnail(format!(
                "FFmpeg failed for {}: {}",
                src,
                stderr.trim()
            )));
        }

        tmp.persist(dst).map_err(|e| ServerError::Io(e.error))?;
        Ok(())
    }
}

async fn ensure_source(record: &MediaRecord) -> Result<()> {
    if tokio::fs::try_exists(&record.path).await? {
        Ok(())
    } else {
        Err(ServerError::NotFound(format!(
            "Media file missing: {}",
            record.path
        )))
    }
}

fn write_resized(src: &Path, dst: &Path, variant: Variant) -> Result<()> {
    let img = ImageReader::open(src)?.with_guessed_format()?.decode()?;
    let img = fit_within(img, variant.max_width, variant.max_height);
    // JPEG has no alpha channel
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let parent = dst
        .parent()
        .ok_or_else(|| ServerError::Internal(format!("No parent for {:?}", dst)))?;
    std::fs::create_dir_all(parent)?;

    let mut encoded = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, variant.quality))?;

    let mut tmp = tempfile::Builder::new().suffix(".jpg").tempfile_in(parent)?;
    tmp.write_all(&encoded)?;
    tmp.persist(dst).map_err(|e| ServerError::Io(e.error))?;
    Ok(())
}

/// Shrink to fit the box, keeping aspect ratio; never enlarge
fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if img.width() <= max_width && img.height() <= max_height {
        img
    } else {
        img.thumbnail(max_width, max_height)
    }
}

fn cached_id(path: &Path) -> Option<i64> {
    if path.extension()? != "jpg" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}
