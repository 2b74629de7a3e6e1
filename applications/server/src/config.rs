/// Server configuration
use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vuvur_scanner::ScanConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_library")]
    pub library: LibrarySettings,

    #[serde(default = "default_scanner")]
    pub scanner: ScannerSettings,

    #[serde(default = "default_thumbnails")]
    pub thumbnails: ThumbnailSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Lock file, initial-scan marker, status file and image caches live here
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibrarySettings {
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Defaults to `recyclebin` under the first root
    #[serde(default)]
    pub recycle_bin: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerSettings {
    /// 0 means one worker per CPU
    #[serde(default)]
    pub workers: usize,

    #[serde(default = "default_flush_every")]
    pub flush_every: u64,

    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailSettings {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    #[serde(default = "default_thumb_size")]
    pub thumb_size: u32,

    #[serde(default = "default_thumb_quality")]
    pub thumb_quality: u8,

    #[serde(default = "default_preview_width")]
    pub preview_width: u32,

    #[serde(default = "default_preview_height")]
    pub preview_height: u32,

    #[serde(default = "default_preview_quality")]
    pub preview_quality: u8,
}

impl ServerConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `config.toml` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("config.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables, e.g. VUVUR_SCANNER__WORKERS=4
        settings = settings.add_source(
            config::Environment::with_prefix("VUVUR")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("library.roots")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let mut config: Self = config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        if config.scanner.workers == 0 {
            config.scanner.workers = num_cpus::get();
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.library.roots.is_empty() {
            return Err(ServerError::Config(
                "At least one media root is required (set VUVUR_LIBRARY__ROOTS)".to_string(),
            ));
        }

        if self.scanner.workers == 0 {
            return Err(ServerError::Config(
                "scanner.workers must be at least 1".to_string(),
            ));
        }

        if self.thumbnails.thumb_quality == 0 || self.thumbnails.thumb_quality > 100 {
            return Err(ServerError::Config(
                "thumbnails.thumb_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.thumbnails.preview_quality == 0 || self.thumbnails.preview_quality > 100 {
            return Err(ServerError::Config(
                "thumbnails.preview_quality must be between 1 and 100".to_string(),
            ));
        }

        for root in &self.library.roots {
            if !root.is_dir() {
                tracing::warn!("Media root {:?} does not exist yet", root);
            }
        }

        Ok(())
    }

    pub fn recycle_bin(&self) -> Option<PathBuf> {
        self.library.recycle_bin.clone().or_else(|| {
            self.library
                .roots
                .first()
                .map(|root| root.join("recyclebin"))
        })
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            roots: self.library.roots.clone(),
            recycle_bin: self.recycle_bin(),
            workers: self.scanner.workers,
            flush_every: self.scanner.flush_every,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.scanner.lock_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.scanner.probe_timeout_secs)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.storage.data_dir.join("scanner.lock")
    }

    pub fn marker_path(&self) -> PathBuf {
        self.storage.data_dir.join(".initial_scan_complete")
    }

    pub fn status_path(&self) -> PathBuf {
        self.storage.data_dir.join("scan_status.json")
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        self.storage.data_dir.join("thumbs")
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.storage.data_dir.join("previews")
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
        data_dir: default_data_dir(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/vuvur.db".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_library() -> LibrarySettings {
    LibrarySettings {
        roots: default_roots(),
        recycle_bin: None,
    }
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/mnt/gallery")]
}

fn default_scanner() -> ScannerSettings {
    ScannerSettings {
        workers: 0,
        flush_every: default_flush_every(),
        lock_timeout_secs: default_lock_timeout_secs(),
        ffprobe_path: default_ffprobe_path(),
        probe_timeout_secs: default_probe_timeout_secs(),
    }
}

fn default_flush_every() -> u64 {
    100
}

fn default_lock_timeout_secs() -> u64 {
    10
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_thumbnails() -> ThumbnailSettings {
    ThumbnailSettings {
        ffmpeg_path: default_ffmpeg_path(),
        thumb_size: default_thumb_size(),
        thumb_quality: default_thumb_quality(),
        preview_width: default_preview_width(),
        preview_height: default_preview_height(),
        preview_quality: default_preview_quality(),
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_thumb_size() -> u32 {
    400
}

fn default_thumb_quality() -> u8 {
    75
}

fn default_preview_width() -> u32 {
    1920
}

fn default_preview_height() -> u32 {
    1080
}

fn default_preview_quality() -> u8 {
    90
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            library: default_library(),
            scanner: default_scanner(),
            thumbnails: default_thumbnails(),
        }
    }
}
