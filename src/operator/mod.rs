//! Kubernetes operator keeping ShortURL resources in sync with the
//! shortening service.

pub mod controller;
pub mod crd;
pub mod error;
pub mod object_store;
pub mod reconciler;
pub mod resources;

pub use controller::{ControllerContext, run_controller};
pub use crd::{ShortURL, ShortURLSpec, ShortURLStatus, Validity};
pub use error::{OperatorError, Result};
pub use reconciler::{PassOutcome, Reconciler};
