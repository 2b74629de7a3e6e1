//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;
use vuvur_core::settings::SettingsResolver;
use vuvur_core::{MediaKind, MediaMetadata, MetadataExtractor};
use vuvur_metadata::{MediaExtractor, VideoProbe};
use vuvur_server::{api, config::ServerConfig, state::AppState};

/// A server over a temporary gallery root and data directory
pub struct TestServer {
    pub state: AppState,
    pub app: Router,
    pub root: PathBuf,
    pub data: PathBuf,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_resolver(SettingsResolver::default()).await
    }

    pub async fn with_resolver(resolver: SettingsResolver) -> Self {
        Self::build(resolver, Duration::ZERO).await
    }

    /// Every extraction sleeps for `delay` first
    pub async fn with_slow_extractor(delay: Duration) -> Self {
        Self::build(SettingsResolver::default(), delay).await
    }

    async fn build(resolver: SettingsResolver, delay: Duration) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("gallery");
        let data = temp_dir.path().join("data");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        let mut config = ServerConfig::default();
        config.library.roots = vec![root.clone()];
        config.storage.data_dir = data.clone();
        config.storage.database_url = format!("sqlite://{}", data.join("test.db").display());
        config.scanner.workers = 2;
        config.scanner.lock_timeout_secs = 1;
        config.thumbnails.ffmpeg_path = PathBuf::from("/nonexistent/ffmpeg");

        // File-backed so every pool connection sees the same database
        let pool = vuvur_storage::create_pool(&config.storage.database_url)
            .await
            .unwrap();
        vuvur_storage::run_migrations(&pool).await.unwrap();

        let extractor: Arc<dyn MetadataExtractor> = Arc::new(SlowExtractor {
            inner: MediaExtractor::new(VideoProbe::new(
                "/nonexistent/ffprobe",
                Duration::from_secs(1),
            )),
            delay,
        });

        let state = AppState::with_extractor(config, pool, resolver, extractor)
            .await
            .unwrap();
        let app = api::router(state.clone());

        Self {
            state,
            app,
            root,
            data,
            _temp_dir: temp_dir,
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Run one scan cycle to completion
    pub async fn scan(&self) {
        let outcome = self.state.guard.run_once().await.unwrap();
        assert!(matches!(outcome, vuvur_scanner::ScanOutcome::Completed(_)));
    }

    /// Wait for a triggered cycle to finish
    pub async fn wait_idle(&self) {
        for _ in 0..200 {
            if !self.state.guard.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("scan did not finish");
    }

    pub async fn id_of(&self, relative: &str) -> i64 {
        let path = self.path(relative);
        vuvur_storage::media::get_by_path(&self.state.pool, path.to_str().unwrap())
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{} not indexed", relative))
            .id
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn get_raw(&self, uri: &str, range: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }
        self.app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method("POST")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// PNG of the given size, optionally with a `parameters` text chunk
pub fn write_png(path: &Path, width: u32, height: u32, parameters: Option<&str>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    if let Some(parameters) = parameters {
        encoder
            .add_text_chunk("parameters".to_string(), parameters.to_string())
            .unwrap();
    }
    let mut writer = encoder.write_header().unwrap();
    let data = vec![120u8; (width * height * 3) as usize];
    writer.write_image_data(&data).unwrap();
}

struct SlowExtractor {
    inner: MediaExtractor,
    delay: Duration,
}

#[async_trait]
impl MetadataExtractor for SlowExtractor {
    async fn extract(&self, path: &Path, kind: MediaKind) -> vuvur_core::Result<MediaMetadata> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.extract(path, kind).await
    }
}
