use std::sync::Arc;

use crate::proxy::MarketProxy;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<MarketProxy>,
}

impl AppState {
    pub fn new(proxy: Arc<MarketProxy>) -> Self {
        Self { proxy }
    }
}
