//! Handler for link validity check.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::ValidityResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Reports whether a short code still redirects.
///
/// # Endpoint
///
/// `GET /valid/{code}`
///
/// `is_valid` is `false` only when the link has an expiry that has passed.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn valid_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ValidityResponse>, AppError> {
    let is_valid = state.store.check_validity(&code)?;

    Ok(Json(ValidityResponse { is_valid }))
}
