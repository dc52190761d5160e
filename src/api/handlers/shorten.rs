//! Handler for link shortening endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::api::dto::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::time::parse_expire_at;

/// Creates a short code for a long URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// { "long_url": "https://example.com", "expire_at": "2030-01-01T00:00:00Z" }
/// ```
///
/// `expire_at` may be `""` or omitted for a link that never expires.
///
/// # Response
///
/// ```json
/// { "short_url": "ab3x" }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the body is not valid JSON, the URL is invalid,
/// or `expire_at` cannot be parsed.
pub async fn shorten_handler(
    State(state): State<AppState>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ShortenResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        AppError::bad_request("Invalid request", json!({ "reason": e.body_text() }))
    })?;

    payload.validate()?;

    let expire_at = parse_expire_at(payload.expire_at.as_deref().unwrap_or_default())
        .map_err(|e| AppError::bad_request(e.to_string(), json!({ "field": "expire_at" })))?;

    let code = state.store.create(payload.long_url, expire_at)?;

    info!(code = %code, expire_at = ?expire_at, "Short link created");

    Ok(Json(ShortenResponse { short_url: code }))
}
