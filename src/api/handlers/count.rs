//! Handler for click count lookup.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::ClickCountResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns how many successful redirects a short code has served.
///
/// # Endpoint
///
/// `GET /count/{code}`
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn count_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClickCountResponse>, AppError> {
    let click_count = state.store.click_count(&code)?;

    Ok(Json(ClickCountResponse { click_count }))
}
