//! # ShortURL Operator
//!
//! A URL shortening service and the Kubernetes operator that manages it.
//!
//! ## Components
//!
//! - **Shortening service** ([`api`], [`domain`], [`routes`], [`server`]) - HTTP API
//!   issuing short codes, redirecting, counting clicks and reporting validity,
//!   backed by the in-memory [`domain::UrlStore`]
//! - **Client** ([`client`]) - typed HTTP client for the shortening service
//! - **Operator** ([`operator`]) - watches `ShortURL` resources, keeps the
//!   service's Deployment and Service in place and mirrors each short path's
//!   state into the resource status
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the shortening service
//! LISTEN=0.0.0.0:8080 cargo run --bin shortener
//!
//! # Install the CRD and start the operator
//! cargo run --bin operator -- --print-crd | kubectl apply -f -
//! cargo run --bin operator
//! ```
//!
//! ## Configuration
//!
//! The service reads environment variables via [`config::ServiceConfig`];
//! the operator takes flags or environment variables via
//! [`config::OperatorConfig`].

pub mod api;
pub mod client;
pub mod domain;
pub mod error;
pub mod operator;
pub mod state;
pub mod telemetry;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::client::{ClientError, HttpShortenerClient, ShortenerApi};
    pub use crate::domain::{StoreError, UrlRecord, UrlStore};
    pub use crate::error::AppError;
    pub use crate::operator::{ShortURL, ShortURLSpec, ShortURLStatus, Validity};
    pub use crate::state::AppState;
}
