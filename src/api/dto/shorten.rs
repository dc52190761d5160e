//! DTOs for the shortening endpoint.

use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use validator::Validate;

/// Request to shorten a single URL.
///
/// `expire_at` may be omitted or sent as an empty string for links that
/// never expire.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL to shorten.
    #[validate(url(message = "Invalid URL format"))]
    pub long_url: String,

    /// RFC 3339 expiry, or zone-less `YYYY-MM-DDTHH:MM:SS` read as UTC.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub expire_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_url: String,
}
