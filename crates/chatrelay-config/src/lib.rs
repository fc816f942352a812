pub mod loader;
pub mod model;

pub use model::{AppConfig, EngineConfig, FactsConfig, GatewayConfig, LlmConfig};
