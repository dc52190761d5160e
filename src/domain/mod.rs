//! Domain layer containing the URL record model and its store.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`store`] - Thread-safe in-memory store owning records and click counters
//!
//! The domain layer has no knowledge of HTTP or Kubernetes. Handlers in
//! [`crate::api`] translate requests into [`store::UrlStore`] calls.

pub mod entities;
pub mod store;

pub use entities::UrlRecord;
pub use store::{StoreError, UrlStore};
