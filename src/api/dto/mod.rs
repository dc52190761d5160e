//! Data Transfer Objects for API requests and responses.
//!
//! Request and response shapes are shared with [`crate::client`], which
//! speaks the same wire format from the operator side.

pub mod count;
pub mod health;
pub mod shorten;
pub mod valid;

pub use count::ClickCountResponse;
pub use health::HealthResponse;
pub use shorten::{ShortenRequest, ShortenResponse};
pub use valid::ValidityResponse;
