//! Still-image metadata
//!
//! Dimensions come from the image header. Descriptive text is looked up in
//! priority order:
//! 1. a PNG `parameters` text chunk (stored verbatim, and as the only key of
//!    the raw metadata)
//! 2. EXIF tags, with the user comment as descriptive text

use crate::error::{MetadataError, Result};
use crate::tags::read_exif;
use image::{ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use vuvur_core::MediaMetadata;

/// Text chunk keyword used by image generators for their parameters
pub const PARAMETERS_KEYWORD: &str = "parameters";

/// Read dimensions and descriptive metadata from an image file
///
/// Fails only when the image header cannot be read. Problems with the text
/// or EXIF sections degrade to dimensions-only metadata.
pub fn read_image(path: &Path) -> Result<MediaMetadata> {
    if !path.exists() {
        return Err(MetadataError::FileNotFound(path.display().to_string()));
    }

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let (width, height) = reader.into_dimensions()?;

    let mut metadata = MediaMetadata::dimensions(width, height);

    if format == Some(ImageFormat::Png) {
        match read_png_parameters(path) {
            Ok(Some(parameters)) => {
                metadata.raw_metadata =
                    Some(serde_json::json!({ PARAMETERS_KEYWORD: parameters.clone() }));
                metadata.descriptive_text = Some(parameters);
                return Ok(metadata);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("No PNG text for {}: {}", path.display(), e),
        }
    }

    if let Some(exif) = read_exif(path) {
        metadata.descriptive_text = exif.user_comment;
        if !exif.tags.is_empty() {
            metadata.raw_metadata = Some(serde_json::Value::Object(exif.tags));
        }
    }

    Ok(metadata)
}

/// Find the `parameters` keyword in tEXt, zTXt or iTXt chunks
fn read_png_parameters(path: &Path) -> Result<Option<String>> {
    let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    let reader = decoder.read_info()?;
    let info = reader.info();

    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == PARAMETERS_KEYWORD)
    {
        return Ok(Some(chunk.text.clone()));
    }

    if let Some(chunk) = info
        .compressed_latin1_text
        .iter()
        .find(|c| c.keyword == PARAMETERS_KEYWORD)
    {
        return Ok(Some(chunk.get_text()?));
    }

    if let Some(chunk) = info
        .utf8_text
        .iter()
        .find(|c| c.keyword == PARAMETERS_KEYWORD)
    {
        return Ok(Some(chunk.get_text()?));
    }

    Ok(None)
}
