use std::sync::Arc;

use crate::domain::UrlStore;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UrlStore>,
}

impl AppState {
    pub fn new(store: Arc<UrlStore>) -> Self {
        Self { store }
    }
}
