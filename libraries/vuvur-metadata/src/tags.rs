//! EXIF tag decoding
//!
//! Byte-valued tags are decoded as best-effort text: bytes that are not valid
//! text are dropped rather than failing the file.

use exif::{Field, In, Reader, Tag, Value};
use serde_json::{Map, Value as JsonValue};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Decoded EXIF of one image
#[derive(Debug, Default)]
pub struct ExifTags {
    /// Every known primary-image tag, by tag name
    pub tags: Map<String, JsonValue>,

    /// Decoded `UserComment`, if present and non-empty
    pub user_comment: Option<String>,
}

/// Read EXIF from any container the exif reader understands
///
/// Returns `None` when the file has no readable EXIF.
pub fn read_exif(path: &Path) -> Option<ExifTags> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::trace!("No EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    let mut decoded = ExifTags::default();
    for field in exif.fields() {
        // Thumbnail IFD repeats most tags
        if field.ifd_num != In::PRIMARY || field.tag.description().is_none() {
            continue;
        }

        if field.tag == Tag::UserComment {
            if let Value::Undefined(bytes, _) = &field.value {
                decoded.user_comment = decode_user_comment(bytes);
            }
        }

        if let Some(text) = field_text(field) {
            decoded
                .tags
                .insert(field.tag.to_string(), JsonValue::String(text));
        }
    }

    Some(decoded)
}

fn field_text(field: &Field) -> Option<String> {
    let text = match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|part| decode_lossy(part))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Undefined(bytes, _) if field.tag == Tag::UserComment => {
            decode_user_comment(bytes).unwrap_or_default()
        }
        Value::Undefined(bytes, _) | Value::Byte(bytes) => decode_lossy(bytes),
        _ => field.display_value().to_string(),
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decode a `UserComment` value
///
/// The first eight bytes name the character code. UNICODE bodies are UTF-16
/// in either byte order depending on the writer; the order is guessed from
/// where the zero bytes fall.
pub fn decode_user_comment(bytes: &[u8]) -> Option<String> {
    let text = if bytes.len() < 8 {
        decode_lossy(bytes)
    } else {
        let (code, body) = bytes.split_at(8);
        match code {
            b"UNICODE\0" => decode_utf16_guess(body),
            b"ASCII\0\0\0" | b"JIS\0\0\0\0\0" | [0, 0, 0, 0, 0, 0, 0, 0] => decode_lossy(body),
            _ => decode_lossy(bytes),
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER && *c != '\0')
        .collect()
}

fn decode_utf16_guess(body: &[u8]) -> String {
    let even_zeros = body.iter().step_by(2).filter(|b| **b == 0).count();
    let odd_zeros = body.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    let big_endian = even_zeros >= odd_zeros;

    let units = body.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });

    char::decode_utf16(units)
        .filter_map(std::result::Result::ok)
        .filter(|c| *c != '\0')
        .collect()
}
