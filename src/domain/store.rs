//! In-memory URL record store.
//!
//! Holds two maps keyed by short code: the [`UrlRecord`] itself and its click
//! counter. Both maps sit behind a single [`Mutex`], so a code never has a
//! record without a counter or the other way round.
//!
//! # Locking
//!
//! Every public operation takes the same store-wide lock for its whole
//! critical section. None of them perform I/O while holding it. If redirect
//! throughput ever outgrows a single lock, shard the maps by code prefix.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::domain::entities::UrlRecord;
use crate::utils::code_generator::{DEFAULT_CODE_LENGTH, generate_code, is_reserved_code};

/// Default number of fresh codes tried before [`UrlStore::create`] gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Errors returned by [`UrlStore`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("short code '{0}' not found")]
    NotFound(String),

    #[error("short code '{0}' has expired")]
    Expired(String),

    #[error("no free short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, UrlRecord>,
    counters: HashMap<String, u64>,
}

/// Single-process store for short code → record and click count.
pub struct UrlStore {
    inner: Mutex<StoreInner>,
    code_length: usize,
    max_attempts: usize,
}

impl UrlStore {
    /// Creates an empty store with default code length and retry budget.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_CODE_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }

    /// Creates an empty store issuing codes of `code_length` characters,
    /// retrying at most `max_attempts` times on collision.
    pub fn with_settings(code_length: usize, max_attempts: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            code_length,
            max_attempts: max_attempts.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Critical sections never leave the maps half-updated, so a poisoned
        // lock still guards consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `long_url` under a freshly generated short code.
    ///
    /// The counter for the new code starts at 0 and is inserted together
    /// with the record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CodeSpaceExhausted`] if every generated
    /// candidate collided with an existing or reserved code.
    pub fn create(
        &self,
        long_url: impl Into<String>,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<String, StoreError> {
        let length = self.code_length;
        self.create_with(long_url, expire_at, || generate_code(length))
    }

    /// Same as [`Self::create`], drawing candidate codes from `next_code`.
    pub(crate) fn create_with(
        &self,
        long_url: impl Into<String>,
        expire_at: Option<DateTime<Utc>>,
        mut next_code: impl FnMut() -> String,
    ) -> Result<String, StoreError> {
        let record = UrlRecord::new(long_url, expire_at);
        let mut inner = self.lock();

        for attempt in 1..=self.max_attempts {
            let code = next_code();

            if is_reserved_code(&code) || inner.records.contains_key(&code) {
                debug!(attempt, "Short code collision, retrying");
                continue;
            }

            inner.records.insert(code.clone(), record);
            inner.counters.insert(code.clone(), 0);
            metrics::counter!("shortener_links_created_total").increment(1);

            return Ok(code);
        }

        Err(StoreError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Resolves `code` to its long URL and counts the click.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the code was never issued
    /// - [`StoreError::Expired`] if the record's expiry has passed; the
    ///   counter is left untouched
    pub fn redirect(&self, code: &str) -> Result<String, StoreError> {
        let now = Utc::now();
        let mut inner = self.lock();

        let long_url = match inner.records.get(code) {
            None => return Err(StoreError::NotFound(code.to_string())),
            Some(record) if record.is_expired_at(now) => {
                return Err(StoreError::Expired(code.to_string()));
            }
            Some(record) => record.long_url.clone(),
        };

        *inner.counters.entry(code.to_string()).or_insert(0) += 1;
        metrics::counter!("shortener_redirects_total").increment(1);

        Ok(long_url)
    }

    /// Returns the number of successful redirects for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the code was never issued.
    pub fn click_count(&self, code: &str) -> Result<u64, StoreError> {
        self.lock()
            .counters
            .get(code)
            .copied()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))
    }

    /// Returns `true` unless the record for `code` has an expiry in the past.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the code was never issued.
    pub fn check_validity(&self, code: &str) -> Result<bool, StoreError> {
        let now = Utc::now();

        self.lock()
            .records
            .get(code)
            .map(|record| !record.is_expired_at(now))
            .ok_or_else(|| StoreError::NotFound(code.to_string()))
    }

    /// Returns a copy of the record stored under `code`, if any.
    pub fn get(&self, code: &str) -> Option<UrlRecord> {
        self.lock().records.get(code).cloned()
    }

    /// Number of issued short codes.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns true if no short code has been issued yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UrlStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_create_initializes_counter() {
        let store = UrlStore::new();

        let code = store.create("https://example.com", None).unwrap();

        assert_eq!(code.len(), DEFAULT_CODE_LENGTH);
        assert_eq!(store.click_count(&code), Ok(0));
        assert_eq!(
            store.get(&code),
            Some(UrlRecord::new("https://example.com", None))
        );
    }

    #[test]
    fn test_create_issues_unique_codes() {
        let store = UrlStore::new();
        let mut codes = HashSet::new();

        for i in 0..2000 {
            let code = store
                .create(format!("https://example.com/{i}"), None)
                .unwrap();
            assert!(codes.insert(code), "code issued twice");
        }

        assert_eq!(store.len(), 2000);
    }

    #[test]
    fn test_create_retries_on_collision() {
        let store = UrlStore::new();
        store
            .create_with("https://first.com", None, || "aaaa".to_string())
            .unwrap();

        let mut candidates = vec!["bbbb", "aaaa"];
        let code = store
            .create_with("https://second.com", None, || {
                candidates.pop().unwrap().to_string()
            })
            .unwrap();

        assert_eq!(code, "bbbb");
        assert_eq!(store.get("aaaa").unwrap().long_url, "https://first.com");
        assert_eq!(store.get("bbbb").unwrap().long_url, "https://second.com");
    }

    #[test]
    fn test_create_skips_reserved_codes() {
        let store = UrlStore::new();
        let mut candidates = vec!["Zq9x", "health"];

        let code = store
            .create_with("https://example.com", None, || {
                candidates.pop().unwrap().to_string()
            })
            .unwrap();

        assert_eq!(code, "Zq9x");
        assert!(store.get("health").is_none());
    }

    #[test]
    fn test_create_gives_up_after_max_attempts() {
        let store = UrlStore::with_settings(4, 3);
        store
            .create_with("https://first.com", None, || "aaaa".to_string())
            .unwrap();

        let mut calls = 0;
        let result = store.create_with("https://second.com", None, || {
            calls += 1;
            "aaaa".to_string()
        });

        assert_eq!(result, Err(StoreError::CodeSpaceExhausted { attempts: 3 }));
        assert_eq!(calls, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_redirect_increments_counter() {
        let store = UrlStore::new();
        let code = store.create("https://example.com", None).unwrap();

        assert_eq!(store.redirect(&code).unwrap(), "https://example.com");
        assert_eq!(store.redirect(&code).unwrap(), "https://example.com");

        assert_eq!(store.click_count(&code), Ok(2));
    }

    #[test]
    fn test_redirect_unknown_code() {
        let store = UrlStore::new();
        let code = store.create("https://example.com", None).unwrap();

        assert_eq!(
            store.redirect("nope"),
            Err(StoreError::NotFound("nope".to_string()))
        );
        assert_eq!(store.click_count(&code), Ok(0));
        assert!(store.click_count("nope").is_err());
    }

    #[test]
    fn test_redirect_expired_leaves_counter() {
        let store = UrlStore::new();
        let code = store
            .create(
                "https://example.com",
                Some(Utc::now() - Duration::minutes(5)),
            )
            .unwrap();

        for _ in 0..3 {
            assert_eq!(store.redirect(&code), Err(StoreError::Expired(code.clone())));
        }

        assert_eq!(store.click_count(&code), Ok(0));
    }

    #[test]
    fn test_check_validity() {
        let store = UrlStore::new();
        let forever = store.create("https://a.com", None).unwrap();
        let future = store
            .create("https://b.com", Some(Utc::now() + Duration::hours(1)))
            .unwrap();
        let past = store
            .create("https://c.com", Some(Utc::now() - Duration::hours(1)))
            .unwrap();

        assert_eq!(store.check_validity(&forever), Ok(true));
        assert_eq!(store.check_validity(&future), Ok(true));
        assert_eq!(store.check_validity(&past), Ok(false));
        assert!(matches!(
            store.check_validity("none"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_check_validity_does_not_count() {
        let store = UrlStore::new();
        let code = store.create("https://example.com", None).unwrap();

        store.check_validity(&code).unwrap();
        store.click_count(&code).unwrap();

        assert_eq!(store.click_count(&code), Ok(0));
    }

    #[test]
    fn test_concurrent_redirects_are_not_lost() {
        let store = Arc::new(UrlStore::new());
        let code = store.create("https://example.com", None).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let code = code.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.redirect(&code).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.click_count(&code), Ok(2000));
    }
}
