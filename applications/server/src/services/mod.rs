/// Server services
pub mod recycle_bin;
pub mod settings;
pub mod thumbnails;

pub use recycle_bin::{DeleteOutcome, RecycleBin};
pub use settings::SettingsService;
pub use thumbnails::ThumbnailService;
