/// Shared application state
use crate::config::ServerConfig;
use crate::error::Result;
use crate::services::{RecycleBin, SettingsService, ThumbnailService};
use sqlx::SqlitePool;
use std::sync::Arc;
use vuvur_core::settings::SettingsResolver;
use vuvur_core::{MetadataExtractor, ScanStatus, ScanStatusHandle};
use vuvur_metadata::{MediaExtractor, VideoProbe};
use vuvur_scanner::{FileScanLock, InitialScanMarker, ScanCoordinator, ScanGuard, ScanScheduler};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<ServerConfig>,
    pub guard: ScanGuard,
    pub settings: Arc<SettingsService>,
    pub thumbnails: Arc<ThumbnailService>,
    pub recycle_bin: Arc<RecycleBin>,
}

impl AppState {
    /// Wire the scanner and services against an already-migrated pool
    pub async fn build(
        config: ServerConfig,
        pool: SqlitePool,
        resolver: SettingsResolver,
    ) -> Result<Self> {
        let extractor = default_extractor(&config);
        Self::with_extractor(config, pool, resolver, extractor).await
    }

    /// Same as `build` with a caller-supplied extractor
    pub async fn with_extractor(
        config: ServerConfig,
        pool: SqlitePool,
        resolver: SettingsResolver,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self> {
        let guard = scan_guard(&config, pool.clone(), extractor);
        let settings = SettingsService::new(pool.clone(), resolver).await?;

        let thumbnails = ThumbnailService::new(
            config.thumbs_dir(),
            config.previews_dir(),
            &config.thumbnails,
        );
        thumbnails.initialize().await?;

        let recycle_bin = match config.recycle_bin() {
            Some(dir) => RecycleBin::new(dir),
            None => RecycleBin::new(config.storage.data_dir.join("recyclebin")),
        };

        Ok(Self {
            pool,
            config: Arc::new(config),
            guard,
            settings: Arc::new(settings),
            thumbnails: Arc::new(thumbnails),
            recycle_bin: Arc::new(recycle_bin),
        })
    }

    /// Scheduler driven by the live `scan_interval` setting
    pub fn scheduler(&self) -> ScanScheduler {
        ScanScheduler::new(self.guard.clone(), self.settings.subscribe_interval())
    }

    /// Latest scan status seen by this or any other process
    ///
    /// A scan run by another process sharing the data directory is only
    /// visible through the status file.
    pub fn scan_status(&self) -> ScanStatus {
        let local = self.guard.status().snapshot();
        if local.running {
            return local;
        }

        match ScanStatusHandle::read_file(&self.config.status_path()) {
            Some(shared) if shared.running || shared.finished_at > local.finished_at => shared,
            _ => local,
        }
    }
}

/// Extractor backed by the configured `ffprobe`
pub fn default_extractor(config: &ServerConfig) -> Arc<dyn MetadataExtractor> {
    Arc::new(MediaExtractor::new(VideoProbe::new(
        config.scanner.ffprobe_path.clone(),
        config.probe_timeout(),
    )))
}

/// Scan guard over the data directory's lock file and initial-scan marker
pub fn scan_guard(
    config: &ServerConfig,
    pool: SqlitePool,
    extractor: Arc<dyn MetadataExtractor>,
) -> ScanGuard {
    let status = ScanStatusHandle::with_file(config.status_path());
    let coordinator = ScanCoordinator::new(pool, &config.scan_config(), extractor, status);
    ScanGuard::new(
        coordinator,
        Arc::new(FileScanLock::new(config.lock_path())),
        InitialScanMarker::new(config.marker_path()),
        config.lock_timeout(),
    )
}
