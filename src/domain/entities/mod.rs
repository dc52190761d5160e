//! Core business entities.
//!
//! - [`UrlRecord`] - A long URL and its optional expiry

pub mod url_record;

pub use url_record::UrlRecord;
