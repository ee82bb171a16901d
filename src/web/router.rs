//! Router configuration for Web API.

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers::{download_zip, list_files, register_folder, AppState};
use super::middleware::create_cors_layer;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/add-folder", post(register_folder))
        .route("/list-files", get(list_files))
        .route("/download-zip", post(download_zip));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create a router serving the built frontend.
///
/// Unknown paths fall back to `index.html` so client-side routes such as
/// `/gallery` resolve. Returns `None` if the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let root = Path::new(static_path);
    if !root.is_dir() {
        tracing::warn!("Static directory not found: {}", static_path);
        return None;
    }

    let index = ServeFile::new(root.join("index.html"));
    let service = ServeDir::new(root).fallback(index);
    Some(Router::new().fallback_service(service))
}
