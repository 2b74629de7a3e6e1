//! Vuvur Metadata
//!
//! Metadata extraction for the Vuvur media gallery.
//!
//! This crate provides:
//! - Image dimensions from the file header
//! - Generation parameters from PNG text chunks
//! - EXIF tags, including best-effort `UserComment` decoding
//! - Video dimensions through an `ffprobe` subprocess with a timeout
//!
//! # Example
//!
//! ```rust,no_run
//! use vuvur_core::{MediaKind, MetadataExtractor};
//! use vuvur_metadata::{MediaExtractor, VideoProbe};
//! use std::path::Path;
//! use std::time::Duration;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = MediaExtractor::new(VideoProbe::new("ffprobe", Duration::from_secs(5)));
//! let metadata = extractor
//!     .extract(Path::new("/mnt/gallery/cat.png"), MediaKind::Image)
//!     .await?;
//! println!("{:?}", metadata.descriptive_text);
//! # Ok(())
//! # }
//! ```

mod error;
mod extractor;
mod still;
mod tags;
mod video;

pub use error::{MetadataError, Result};
pub use extractor::MediaExtractor;
pub use still::{read_image, PARAMETERS_KEYWORD};
pub use tags::{decode_user_comment, read_exif, ExifTags};
pub use video::{VideoProbe, DEFAULT_PROBE_TIMEOUT};
