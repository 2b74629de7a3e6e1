//! Vuvur Core
//!
//! Platform-agnostic types, traits, and error handling for the Vuvur media
//! gallery.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `MediaRecord`, `ScannedMedia`, `MediaMetadata`, `Fingerprint`
//! - **Core Traits**: `MetadataExtractor`
//! - **Scan Status**: `ScanStatusHandle`, shared by the scanner and status readers
//! - **Settings**: layered runtime settings with environment-locked keys
//! - **Error Handling**: Unified `VuvurError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use vuvur_core::{MediaKind, ScanStatusHandle};
//! use std::path::Path;
//!
//! assert_eq!(MediaKind::from_path(Path::new("cat.png")), Some(MediaKind::Image));
//!
//! let status = ScanStatusHandle::new();
//! status.begin(2);
//! status.advance();
//! assert_eq!(status.snapshot().processed, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod settings;
pub mod status;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, VuvurError};
pub use status::ScanStatusHandle;
pub use traits::MetadataExtractor;

pub use types::{
    Fingerprint, GroupCount, MediaKind, MediaMetadata, MediaPage, MediaQuery, MediaRecord,
    MediaSort, ScanStatus, ScannedMedia,
};
