#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use vuvur_core::{MediaKind, MediaMetadata, MetadataExtractor, ScanStatusHandle};
use vuvur_metadata::{MediaExtractor, VideoProbe};
use vuvur_scanner::{
    FileScanLock, InitialScanMarker, ScanConfig, ScanCoordinator, ScanGuard, ScanLock,
};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// A media root, a data directory and a file-backed index
pub struct TestLibrary {
    pub pool: SqlitePool,
    pub root: PathBuf,
    pub data: PathBuf,
    _temp_dir: TempDir,
}

impl TestLibrary {
    pub async fn new() -> Self {
        init_tracing();

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().join("gallery");
        let data = temp_dir.path().join("data");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        let db_url = format!("sqlite://{}", data.join("test.db").display());
        let pool = vuvur_storage::create_pool(&db_url)
            .await
            .expect("Failed to create pool");
        vuvur_storage::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            pool,
            root,
            data,
            _temp_dir: temp_dir,
        }
    }

    pub fn recycle_bin(&self) -> PathBuf {
        self.root.join("recyclebin")
    }

    pub fn config(&self) -> ScanConfig {
        ScanConfig {
            roots: vec![self.root.clone()],
            recycle_bin: Some(self.recycle_bin()),
            workers: 4,
            flush_every: 2,
        }
    }

    pub fn key(&self, relative: &str) -> String {
        self.root.join(relative).to_str().unwrap().to_string()
    }

    pub fn coordinator(&self, extractor: Arc<dyn MetadataExtractor>) -> ScanCoordinator {
        ScanCoordinator::new(
            self.pool.clone(),
            &self.config(),
            extractor,
            ScanStatusHandle::new(),
        )
    }

    pub fn lock(&self) -> Arc<dyn ScanLock> {
        Arc::new(FileScanLock::new(self.data.join("scanner.lock")))
    }

    pub fn marker(&self) -> InitialScanMarker {
        InitialScanMarker::new(self.data.join(".initial_scan_complete"))
    }

    pub fn guard(&self, extractor: Arc<dyn MetadataExtractor>) -> ScanGuard {
        ScanGuard::new(
            self.coordinator(extractor),
            self.lock(),
            self.marker(),
            Duration::from_secs(1),
        )
    }
}

pub fn write_png(path: &Path, parameters: Option<&str>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), 16, 9);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    if let Some(parameters) = parameters {
        encoder
            .add_text_chunk("parameters".to_string(), parameters.to_string())
            .unwrap();
    }
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[90u8; 16 * 9 * 3]).unwrap();
}

/// JPEG with an APP1 EXIF segment holding an ASCII `UserComment`
pub fn write_jpeg_with_comment(path: &Path, comment: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(12, 8));
    let mut jpeg = Cursor::new(Vec::new());
    img.write_to(&mut jpeg, image::ImageFormat::Jpeg).unwrap();
    let jpeg = jpeg.into_inner();

    let mut user_comment = b"ASCII\0\0\0".to_vec();
    user_comment.extend_from_slice(comment.as_bytes());

    // Big-endian TIFF: IFD0 (Exif pointer) at 8, Exif IFD at 26, data at 44
    let mut tiff = b"MM\0\x2a".to_vec();
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x8769u16.to_be_bytes());
    tiff.extend_from_slice(&4u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&26u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x9286u16.to_be_bytes());
    tiff.extend_from_slice(&7u16.to_be_bytes());
    tiff.extend_from_slice(&(user_comment.len() as u32).to_be_bytes());
    tiff.extend_from_slice(&44u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&user_comment);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xff, 0xe1]);
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path, out).unwrap();
}

pub fn write_corrupt(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"\x00\x01 this is not an image \x02\x03").unwrap();
}

/// Shell script that answers like ffprobe for a fixed size
#[cfg(unix)]
pub fn fake_ffprobe(dir: &Path, width: u32, height: u32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffprobe");
    std::fs::write(
        &path,
        format!(
            "#!/bin/sh\necho '{{\"streams\": [{{\"width\": {}, \"height\": {}}}]}}'\n",
            width, height
        ),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Real extractor with a probe that always fails
pub fn real_extractor() -> Arc<dyn MetadataExtractor> {
    Arc::new(MediaExtractor::new(VideoProbe::new(
        "/nonexistent/ffprobe",
        Duration::from_secs(1),
    )))
}

/// Wraps an extractor, counting calls and peak concurrency
pub struct CountingExtractor {
    inner: Arc<dyn MetadataExtractor>,
    delay: Duration,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl CountingExtractor {
    pub fn new(inner: Arc<dyn MetadataExtractor>) -> Arc<Self> {
        Self::with_delay(inner, Duration::ZERO)
    }

    pub fn with_delay(inner: Arc<dyn MetadataExtractor>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataExtractor for CountingExtractor {
    async fn extract(&self, path: &Path, kind: MediaKind) -> vuvur_core::Result<MediaMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.inner.extract(path, kind).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
