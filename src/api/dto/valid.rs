//! DTO for the validity endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidityResponse {
    pub is_valid: bool,
}
