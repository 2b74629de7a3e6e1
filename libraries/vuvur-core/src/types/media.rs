//! Media types shared between the scanner, storage and server
//!
//! A media item is identified by its path. The `(size, mod_time)` pair is the
//! fingerprint used to decide whether a file needs its metadata re-extracted.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions indexed as images (lowercase, without dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

/// Extensions indexed as videos (lowercase, without dot)
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv"];

/// Kind of media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video container
    Video,
}

impl MediaKind {
    /// Convert to string for database storage
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Change-detection fingerprint of a file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// File size in bytes
    pub size: i64,

    /// Modification time (Unix epoch milliseconds)
    pub mod_time: i64,
}

impl Fingerprint {
    /// Build a fingerprint from filesystem metadata
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let mod_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Self {
            size: meta.len() as i64,
            mod_time,
        }
    }
}

/// Metadata extracted from a single file
///
/// Every field is optional: a file whose extraction failed is still indexed
/// with `MediaMetadata::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Pixel width
    pub width: Option<u32>,

    /// Pixel height
    pub height: Option<u32>,

    /// Generation prompt or EXIF user comment
    pub descriptive_text: Option<String>,

    /// Structured metadata (EXIF tags, or `{"parameters": ...}`)
    pub raw_metadata: Option<serde_json::Value>,
}

impl MediaMetadata {
    /// Metadata with dimensions only
    pub fn dimensions(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// True when nothing could be extracted
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.descriptive_text.is_none()
            && self.raw_metadata.is_none()
    }
}

/// A file as observed by one scan cycle, ready to be written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedMedia {
    /// Absolute path (index key)
    pub path: String,

    /// File name component of `path`
    pub filename: String,

    /// Media kind derived from the extension
    pub kind: MediaKind,

    /// Fingerprint taken when the file was classified
    pub fingerprint: Fingerprint,

    /// Extracted metadata
    pub metadata: MediaMetadata,

    /// Top-level subdirectory under the media root
    pub group_tag: Option<String>,
}

/// A row of the media index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Unique ID
    pub id: i64,

    /// Absolute path (unique)
    pub path: String,

    /// File name
    pub filename: String,

    /// Media kind
    pub kind: MediaKind,

    /// File size in bytes
    pub size: i64,

    /// Modification time (Unix epoch milliseconds)
    pub mod_time: i64,

    /// Pixel width
    pub width: Option<i64>,

    /// Pixel height
    pub height: Option<i64>,

    /// Generation prompt or EXIF user comment
    pub descriptive_text: Option<String>,

    /// Structured metadata
    pub raw_metadata: Option<serde_json::Value>,

    /// Top-level subdirectory under the media root
    pub group_tag: Option<String>,

    /// Curation flag, never written by the scanner
    pub liked: bool,
}

impl MediaRecord {
    /// Fingerprint stored for this record
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            size: self.size,
            mod_time: self.mod_time,
        }
    }
}

/// Sort order for gallery listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaSort {
    /// Random order (new order per request)
    Random,
    /// Newest modification time first
    #[default]
    DateDesc,
    /// Oldest modification time first
    DateAsc,
    /// Filename A-Z
    FileAsc,
    /// Filename Z-A
    FileDesc,
}

impl MediaSort {
    /// All accepted values
    pub const ALL: [Self; 5] = [
        Self::Random,
        Self::DateDesc,
        Self::DateAsc,
        Self::FileAsc,
        Self::FileDesc,
    ];

    /// Convert to query-string form
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
            Self::FileAsc => "file_asc",
            Self::FileDesc => "file_desc",
        }
    }

    /// Parse from query-string form
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sort| sort.as_str() == s)
    }

    /// SQL ORDER BY clause
    pub fn order_by(&self) -> &'static str {
        match self {
            Self::Random => "ORDER BY RANDOM()",
            Self::DateDesc => "ORDER BY media.mod_time DESC, media.id DESC",
            Self::DateAsc => "ORDER BY media.mod_time ASC, media.id ASC",
            Self::FileAsc => "ORDER BY media.filename ASC, media.id ASC",
            Self::FileDesc => "ORDER BY media.filename DESC, media.id DESC",
        }
    }
}

/// Filters and pagination for a gallery listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaQuery {
    /// 1-based page number
    pub page: u32,

    /// Items per page
    pub limit: u32,

    /// Sort order
    pub sort: MediaSort,

    /// Free-text search over filename and descriptive text
    pub search: Option<String>,

    /// Exact group tag
    pub group: Option<String>,

    /// Path prefix restricting results to one subgroup directory
    pub path_prefix: Option<String>,
}

impl Default for MediaQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort: MediaSort::default(),
            search: None,
            group: None,
            path_prefix: None,
        }
    }
}

/// One page of a gallery listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPage {
    /// Total items matching the filters
    pub total_items: i64,

    /// Page number returned
    pub page: u32,

    /// Number of pages at the requested limit
    pub total_pages: i64,

    /// Items on this page
    pub items: Vec<MediaRecord>,
}

/// A group tag with the number of items it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    /// Group tag
    pub group_tag: String,

    /// Number of items
    pub count: i64,
}
