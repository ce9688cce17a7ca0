//! Shared application state.

use std::sync::Arc;

use gestura_core::GesturaConfig;
use gestura_runtime::Engine;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: GesturaConfig,
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(config: GesturaConfig, engine: Engine) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
        }
    }
}
