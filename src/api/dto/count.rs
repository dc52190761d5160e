//! DTO for the click count endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickCountResponse {
    pub click_count: u64,
}
