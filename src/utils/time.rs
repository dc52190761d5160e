//! Expiry timestamp parsing.
//!
//! Every expiry is stored and compared in UTC. Inputs carrying an offset are
//! converted; inputs without one are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Zone-less layout accepted alongside RFC 3339.
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid expiration timestamp '{0}': expected RFC 3339 or YYYY-MM-DDTHH:MM:SS")]
pub struct InvalidTimestamp(pub String);

/// Parses an optional `expire_at` value.
///
/// Empty or whitespace-only input means "never expires".
///
/// # Errors
///
/// Returns [`InvalidTimestamp`] if the value is neither RFC 3339 nor the
/// zone-less `YYYY-MM-DDTHH:MM:SS` layout.
pub fn parse_expire_at(value: &str) -> Result<Option<DateTime<Utc>>, InvalidTimestamp> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(value, NAIVE_FORMAT)
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| InvalidTimestamp(value.to_string()))
}

/// Formats a timestamp the way the shortening service expects it.
pub fn format_expire_at(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}
