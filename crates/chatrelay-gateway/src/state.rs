use std::sync::Arc;

use chatrelay_config::AppConfig;
use chatrelay_engine::Engine;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            engine: Arc::new(Engine::new(&config)),
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;
