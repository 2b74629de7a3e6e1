/// Original media streaming API
use crate::{
    api::media::find_record,
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// GET /api/stream/:id
/// Stream the original file with range request support
pub async fn stream_media(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let record = find_record(&app_state, id).await?;
    let file_path = std::path::PathBuf::from(&record.path);

    // Get file metadata
    let metadata = match tokio::fs::metadata(&file_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound("Media file missing".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let file_size = metadata.len();

    // Detect MIME type
    let mime_type = mime_guess::from_path(&file_path)
        .first_or_octet_stream()
        .to_string();

    // Check for Range header
    let range_header = headers.get(header::RANGE);

    if let Some(range) = range_header {
        // Parse range header
        let range_str = range
            .to_str()
            .map_err(|_| ServerError::BadRequest("Invalid Range header".to_string()))?;

        let Some((start, end)) = parse_range(range_str, file_size) else {
            return Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{}", file_size))
                .body(Body::empty())
                .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)));
        };

        // Open file and seek to position
        let content_length = end - start + 1;
        let mut file = File::open(&file_path).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let reader = ReaderStream::new(file.take(content_length));
        let body = Body::from_stream(reader);

        return Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, content_length)
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, file_size),
            )
            .header(header::ACCEPT_RANGES, "bytes")
            .body(body)
            .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)));
    }

    // No range request - stream entire file
    let file = File::open(&file_path).await?;
    let reader = ReaderStream::new(file);
    let body = Body::from_stream(reader);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_LENGTH, file_size)
        .header(header::ACCEPT_RANGES, "bytes")
        .body(body)
        .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Parse HTTP Range header
/// Format: "bytes=start-end" or "bytes=start-"
fn parse_range(range: &str, file_size: u64) -> Option<(u64, u64)> {
    let range = range.trim().strip_prefix("bytes=")?;

    if let Some((start_str, end_str)) = range.split_once('-') {
        let start: u64 = start_str.parse().ok()?;
        let end: u64 = if end_str.is_empty() {
            file_size.checked_sub(1)?
        } else {
            end_str.parse::<u64>().ok()?.min(file_size.checked_sub(1)?)
        };

        if start <= end {
            return Some((start, end));
        }
    }

    None
}
