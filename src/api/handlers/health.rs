//! Handler for health check endpoint.

use axum::{Json, extract::State};

use crate::api::dto::HealthResponse;
use crate::state::AppState;

/// Returns service health.
///
/// # Endpoint
///
/// `GET /health`
///
/// The store lives in process memory, so the service is healthy whenever it
/// can answer. Used as the readiness probe of the backing Deployment.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        links: state.store.len(),
    })
}
