//! URL record entity owned by the in-memory store.

use chrono::{DateTime, Utc};

/// A long URL together with its optional expiry.
///
/// Records are immutable once stored; the click counter lives beside them
/// in [`crate::domain::store::UrlStore`], keyed by the same short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub long_url: String,
    pub expire_at: Option<DateTime<Utc>>,
}

impl UrlRecord {
    /// Creates a new record.
    pub fn new(long_url: impl Into<String>, expire_at: Option<DateTime<Utc>>) -> Self {
        Self {
            long_url: long_url.into(),
            expire_at,
        }
    }

    /// Returns true if the record has an expiry and `now` is at or past it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|e| now >= e)
    }

    /// Returns true if the record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
