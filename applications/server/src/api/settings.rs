/// Settings API routes
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{extract::State, Json};
use serde_json::Value;
use vuvur_core::settings::ResolvedSettings;

/// GET /api/settings
/// Effective settings and the keys locked by the environment
pub async fn get_settings(State(app_state): State<AppState>) -> Result<Json<ResolvedSettings>> {
    let resolved = app_state.settings.current().await?;
    Ok(Json(resolved))
}

/// POST /api/settings
/// Body is a JSON object of `key: value` overrides
pub async fn update_settings(
    State(app_state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ResolvedSettings>> {
    let Value::Object(changes) = body else {
        return Err(ServerError::BadRequest(
            "Settings body must be a JSON object".to_string(),
        ));
    };

    let resolved = app_state.settings.update(&changes).await?;
    Ok(Json(resolved))
}
