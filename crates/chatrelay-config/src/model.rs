use serde::{Deserialize, Serialize};

/// Top-level application configuration. Built from the environment at startup
/// (`AppConfig::from_env`); tests construct it directly with `default()` and
/// override what they need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub llm: LlmConfig,
    pub facts: FactsConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Per-provider credentials and endpoint overrides. A `None` key means that
/// provider is unconfigured: using it yields a Config error, it never crashes
/// the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Endpoint overrides, used by tests to point at mock servers.
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub gemini_base_url: Option<String>,
}

/// Credentials and endpoint overrides for the real-time fact upstreams.
/// Time and crypto lookups are keyless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactsConfig {
    pub openweather_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub weather_base_url: Option<String>,
    pub time_base_url: Option<String>,
    pub crypto_base_url: Option<String>,
    pub news_base_url: Option<String>,
    pub stocks_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retained messages per conversation; oldest evicted first.
    pub history_cap: usize,
    /// Admitted requests per client per window.
    pub rate_limit: usize,
    pub rate_window_secs: u64,
    /// Maximum raw user message length in characters.
    pub max_message_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_cap: 50,
            rate_limit: 10,
            rate_window_secs: 60,
            max_message_len: 1000,
        }
    }
}
