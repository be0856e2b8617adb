use crate::registry::Registry;
use std::sync::Arc;

/// Shared handler state. The registry is the only dependency the generated
/// HTTP surface needs.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>) -> Self {
        AppState { registry }
    }
}
