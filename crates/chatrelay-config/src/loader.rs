use std::env;

use tracing::info;

use crate::model::{AppConfig, EngineConfig, FactsConfig, GatewayConfig, LlmConfig};

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Assemble configuration from the process environment. `.env` loading
    /// (dotenvy) is the CLI's job; this only reads what is already set.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let config = Self {
            gateway: GatewayConfig {
                host: env_opt("CHATRELAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: env_parse("PORT", 8080),
            },
            llm: LlmConfig {
                openai_api_key: env_opt("OPENAI_API_KEY"),
                anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
                gemini_api_key: env_opt("GEMINI_API_KEY"),
                openai_base_url: env_opt("OPENAI_BASE_URL"),
                anthropic_base_url: env_opt("ANTHROPIC_BASE_URL"),
                gemini_base_url: env_opt("GEMINI_BASE_URL"),
            },
            facts: FactsConfig {
                openweather_api_key: env_opt("OPENWEATHER_API_KEY"),
                news_api_key: env_opt("NEWS_API_KEY"),
                alpha_vantage_api_key: env_opt("ALPHA_VANTAGE_API_KEY"),
                weather_base_url: env_opt("WEATHER_BASE_URL"),
                time_base_url: env_opt("TIME_BASE_URL"),
                crypto_base_url: env_opt("CRYPTO_BASE_URL"),
                news_base_url: env_opt("NEWS_BASE_URL"),
                stocks_base_url: env_opt("STOCKS_BASE_URL"),
            },
            engine: EngineConfig {
                history_cap: env_parse("CHATRELAY_HISTORY_CAP", defaults.history_cap),
                rate_limit: env_parse("CHATRELAY_RATE_LIMIT", defaults.rate_limit),
                rate_window_secs: env_parse("CHATRELAY_RATE_WINDOW_SECS", defaults.rate_window_secs),
                max_message_len: env_parse("CHATRELAY_MAX_MESSAGE_LEN", defaults.max_message_len),
            },
        };

        info!(
            openai = config.llm.openai_api_key.is_some(),
            anthropic = config.llm.anthropic_api_key.is_some(),
            gemini = config.llm.gemini_api_key.is_some(),
            "loaded configuration from environment"
        );

        config
    }
}
