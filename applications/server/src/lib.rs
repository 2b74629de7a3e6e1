//! Vuvur Server Library
//!
//! Self-hosted media gallery server: gallery browsing, curation, cached
//! thumbnails, streaming and a background library scanner.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use api::router;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use services::{RecycleBin, SettingsService, ThumbnailService};
pub use state::AppState;
