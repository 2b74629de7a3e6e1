mod media;
mod scan;

pub use media::{
    Fingerprint, GroupCount, MediaKind, MediaMetadata, MediaPage, MediaQuery, MediaRecord,
    MediaSort, ScannedMedia, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
pub use scan::ScanStatus;
