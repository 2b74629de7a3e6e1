/// Scan API - trigger, status and cache cleanup
use crate::{error::Result, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use vuvur_core::ScanStatus;
use vuvur_scanner::TriggerResponse;
use vuvur_storage::media;

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// Cached thumbnails/previews deleted
    pub removed: usize,
    pub scan: ScanResponse,
}

async fn trigger(app_state: &AppState) -> Result<(StatusCode, ScanResponse)> {
    let response = match app_state.guard.trigger().await? {
        // The cycle runs on its own; the handle is not awaited
        TriggerResponse::Accepted(_) => (
            StatusCode::ACCEPTED,
            ScanResponse {
                status: "accepted".to_string(),
                message: None,
            },
        ),
        TriggerResponse::Rejected(reason) => (
            StatusCode::CONFLICT,
            ScanResponse {
                status: "busy".to_string(),
                message: Some(reason.to_string()),
            },
        ),
    };
    Ok(response)
}

/// POST /api/scan
/// 202 when a cycle was started, 409 while one is running here or elsewhere
pub async fn trigger_scan(State(app_state): State<AppState>) -> Result<Response> {
    let (status, body) = trigger(&app_state).await?;
    tracing::info!("Scan trigger: {}", body.status);
    Ok((status, Json(body)).into_response())
}

/// GET /api/scan/status
pub async fn scan_status(State(app_state): State<AppState>) -> Json<ScanStatus> {
    Json(app_state.scan_status())
}

/// POST /api/cache/cleanup
/// Remove orphaned cache files, then request a rescan
pub async fn cleanup_cache(State(app_state): State<AppState>) -> Result<Response> {
    let live_ids: HashSet<i64> = media::all_ids(&app_state.pool)
        .await?
        .into_iter()
        .collect();
    let removed = app_state.thumbnails.cleanup(&live_ids).await?;

    let (status, scan) = trigger(&app_state).await?;
    let status = if status == StatusCode::ACCEPTED {
        StatusCode::ACCEPTED
    } else {
        // The cleanup itself succeeded
        StatusCode::OK
    };

    Ok((status, Json(CleanupResponse { removed, scan })).into_response())
}
