//! API route configuration.

use crate::api::handlers::{count_handler, shorten_handler, valid_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Shortening and lookup routes.
///
/// # Endpoints
///
/// - `POST /shorten`        - Create a short code
/// - `GET  /count/{code}`   - Click count for a code
/// - `GET  /valid/{code}`   - Whether a code has not expired
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/count/{code}", get(count_handler))
        .route("/valid/{code}", get(valid_handler))
}
