//! Top-level router of the shortening service.
//!
//! # Route Structure
//!
//! - `POST /shorten`       - Create a short code
//! - `GET  /count/{code}`  - Click count
//! - `GET  /valid/{code}`  - Validity check
//! - `GET  /health`        - Health check
//! - `GET  /{code}`        - Redirect (302), 404 unknown, 410 expired
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the router with all routes and the tracing layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(api::routes::api_routes())
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler))
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router with path normalization applied.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}
