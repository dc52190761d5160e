//! Utility functions shared by the service and the operator.
//!
//! - [`code_generator`] - Short code generation and reserved codes
//! - [`time`] - UTC-normalized expiry parsing and formatting

pub mod code_generator;
pub mod time;
