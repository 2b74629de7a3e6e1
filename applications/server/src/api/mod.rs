/// API route modules
pub mod gallery;
pub mod health;
pub mod media;
pub mod scan;
pub mod settings;
pub mod stream;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Every route the server exposes
pub fn router(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health))
        // Gallery
        .route("/gallery", get(gallery::list_gallery))
        .route("/gallery/groups", get(gallery::list_groups))
        .route("/gallery/subgroups", get(gallery::list_subgroups))
        .route("/search", get(gallery::search))
        .route("/files/random", get(gallery::random_files))
        .route("/random-single", get(gallery::random_single))
        // Curation
        .route("/toggle_like/:id", post(media::toggle_like))
        .route("/delete/:id", post(media::delete_media))
        // Images and streaming
        .route("/thumbnails/:id", get(media::thumbnail))
        .route("/preview/:id", get(media::preview))
        .route("/stream/:id", get(stream::stream_media))
        // Scanning
        .route("/scan", post(scan::trigger_scan))
        .route("/scan/status", get(scan::scan_status))
        .route("/cache/cleanup", post(scan::cleanup_cache))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).post(settings::update_settings),
        );

    Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
