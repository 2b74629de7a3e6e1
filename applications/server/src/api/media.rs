/// Curation and image cache API - like, delete, thumbnails, previews
use crate::{
    error::{Result, ServerError},
    services::DeleteOutcome,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use vuvur_core::MediaRecord;
use vuvur_storage::media;

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub status: String,
    pub liked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

pub(crate) async fn find_record(app_state: &AppState, id: i64) -> Result<MediaRecord> {
    media::get_by_id(&app_state.pool, id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Media not found".to_string()))
}

/// POST /api/toggle_like/:id
pub async fn toggle_like(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<Json<LikeResponse>> {
    let liked = media::toggle_like(&app_state.pool, id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Media not found".to_string()))?;

    tracing::debug!("Media {} liked={}", id, liked);
    Ok(Json(LikeResponse {
        status: "ok".to_string(),
        liked,
    }))
}

/// POST /api/delete/:id
/// Move the file to the recycle bin and drop its record
pub async fn delete_media(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<Json<StatusResponse>> {
    let record = find_record(&app_state, id).await?;

    let outcome = app_state
        .recycle_bin
        .delete(&app_state.pool, &record)
        .await?;
    app_state.thumbnails.evict(id).await;

    let response = match outcome {
        DeleteOutcome::Moved(_) => StatusResponse {
            status: "ok".to_string(),
            message: "File moved to recycle bin".to_string(),
        },
        DeleteOutcome::Missing => StatusResponse {
            status: "warning".to_string(),
            message: "File not found, but the record was cleaned up".to_string(),
        },
    };
    Ok(Json(response))
}

/// GET /api/thumbnails/:id
pub async fn thumbnail(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<Response> {
    let record = find_record(&app_state, id).await?;
    let path = app_state.thumbnails.thumbnail(&record).await?;
    serve_jpeg(&path).await
}

/// GET /api/preview/:id
pub async fn preview(
    Path(id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<Response> {
    let record = find_record(&app_state, id).await?;
    let path = app_state.thumbnails.preview(&record).await?;
    serve_jpeg(&path).await
}

async fn serve_jpeg(path: &FsPath) -> Result<Response> {
    let file = File::open(path).await?;
    let size = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CONTENT_LENGTH, size)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(body)
        .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)))
}
