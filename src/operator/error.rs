//! Error types for the ShortURL operator

use thiserror::Error;

use crate::client::ClientError;

/// Errors that can occur during a convergence pass
#[derive(Error, Debug)]
pub enum OperatorError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Object does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    /// Object already exists
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: String, id: String },

    /// Shortening service call failed
    #[error("Shortening service error: {0}")]
    Shortener(#[from] ClientError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object is missing required metadata
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Object store backend failure other than the Kubernetes API
    #[error("Object store error: {0}")]
    Store(String),
}

/// Result type for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// Check if this error is likely to clear up on its own
    pub fn is_retryable(&self) -> bool {
        match self {
            OperatorError::Kube(_) | OperatorError::Store(_) => true,
            OperatorError::Shortener(ClientError::Transport { .. }) => true,
            OperatorError::Shortener(e) => e.status().is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    /// Returns true for the "object does not exist" condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            OperatorError::NotFound { .. } => true,
            OperatorError::Kube(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }
}
