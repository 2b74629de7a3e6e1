/// Server error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use vuvur_core::VuvurError;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] vuvur_storage::StorageError),

    #[error("Scan error: {0}")]
    Scan(#[from] vuvur_scanner::ScanError),

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VuvurError> for ServerError {
    fn from(err: VuvurError) -> Self {
        match err {
            VuvurError::NotFound { entity, id } => {
                ServerError::NotFound(format!("{} {}", entity, id))
            }
            VuvurError::InvalidInput(msg) => ServerError::BadRequest(msg),
            VuvurError::UnknownSetting(key) => {
                ServerError::BadRequest(format!("unknown setting: {}", key))
            }
            VuvurError::SettingLocked(key) => {
                ServerError::Forbidden(format!("setting is locked by environment: {}", key))
            }
            VuvurError::Io(e) => ServerError::Io(e),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<image::ImageError> for ServerError {
    fn from(err: image::ImageError) -> Self {
        ServerError::Thumbnail(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("background task failed: {}", err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ServerError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ServerError::Scan(ref e) => {
                tracing::error!("Scan error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Scan error".to_string())
            }
            ServerError::Thumbnail(ref msg) => {
                tracing::error!("Thumbnail error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Thumbnail generation failed".to_string(),
                )
            }
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
            ServerError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
