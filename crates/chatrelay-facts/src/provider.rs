use std::time::Duration;

use chrono::{DateTime, Utc};
use chatrelay_config::FactsConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::FactCategory;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const WEATHER_API_URL: &str = "https://api.openweathermap.org";
const TIME_API_URL: &str = "https://worldtimeapi.org";
const CRYPTO_API_URL: &str = "https://api.coingecko.com";
const NEWS_API_URL: &str = "https://newsapi.org";
const STOCKS_API_URL: &str = "https://www.alphavantage.co";

/// Query parameters for a fact lookup. All optional; each category reads the
/// ones it understands and applies its own default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactParams {
    pub city: Option<String>,
    pub timezone: Option<String>,
    pub symbol: Option<String>,
    pub topic: Option<String>,
    pub limit: Option<usize>,
}

/// Outcome of a fact lookup. This type never carries an `Err`: upstream
/// failures, timeouts and missing credentials all collapse into
/// `Unavailable` so a chat turn can proceed without the data.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FactResult {
    Available {
        category: FactCategory,
        data: Value,
        fetched_at: DateTime<Utc>,
    },
    Unavailable {
        category: FactCategory,
        reason: String,
    },
}

impl FactResult {
    fn available(category: FactCategory, data: Value) -> Self {
        FactResult::Available {
            category,
            data,
            fetched_at: Utc::now(),
        }
    }

    fn unavailable(category: FactCategory, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!(%category, %reason, "fact lookup unavailable");
        FactResult::Unavailable { category, reason }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FactResult::Available { .. })
    }
}

/// Per-category configuration state, reported by the capabilities route.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStatus {
    pub category: FactCategory,
    pub configured: bool,
    pub requires_credential: bool,
}

/// Stateless client for the auxiliary real-time data services.
pub struct FactProvider {
    client: Client,
    config: FactsConfig,
}

impl FactProvider {
    pub fn new(config: FactsConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Look up one fact. Missing credentials short-circuit before any
    /// network I/O.
    pub async fn fetch(&self, category: FactCategory, params: &FactParams) -> FactResult {
        match category {
            FactCategory::Weather => self.fetch_weather(params).await,
            FactCategory::Time => self.fetch_time(params).await,
            FactCategory::Crypto => self.fetch_crypto(params).await,
            FactCategory::News => self.fetch_news(params).await,
            FactCategory::Stocks => self.fetch_stocks(params).await,
        }
    }

    pub fn capabilities(&self) -> Vec<CategoryStatus> {
        FactCategory::ALL
            .iter()
            .map(|&category| {
                let (configured, requires_credential) = match category {
                    FactCategory::Weather => (self.config.openweather_api_key.is_some(), true),
                    FactCategory::Time => (true, false),
                    FactCategory::Crypto => (true, false),
                    FactCategory::News => (self.config.news_api_key.is_some(), true),
                    FactCategory::Stocks => (self.config.alpha_vantage_api_key.is_some(), true),
                };
                CategoryStatus {
                    category,
                    configured,
                    requires_credential,
                }
            })
            .collect()
    }

    async fn fetch_weather(&self, params: &FactParams) -> FactResult {
        let category = FactCategory::Weather;
        let Some(key) = self.config.openweather_api_key.as_deref() else {
            return FactResult::unavailable(category, "OPENWEATHER_API_KEY not set");
        };
        let city = params.city.as_deref().unwrap_or("London");
        let base = self
            .config
            .weather_base_url
            .as_deref()
            .unwrap_or(WEATHER_API_URL);
        let url = format!("{base}/data/2.5/weather");

        let body = match self
            .get_json(category, &url, &[("q", city), ("appid", key), ("units", "metric")])
            .await
        {
            Ok(body) => body,
            Err(result) => return *result,
        };

        FactResult::available(
            category,
            json!({
                "city": city,
                "description": body["weather"][0]["description"].as_str().unwrap_or("unknown"),
                "temperature_c": body["main"]["temp"],
                "feels_like_c": body["main"]["feels_like"],
                "humidity_pct": body["main"]["humidity"],
            }),
        )
    }

    async fn fetch_time(&self, params: &FactParams) -> FactResult {
        let category = FactCategory::Time;
        let timezone = params.timezone.as_deref().unwrap_or("Etc/UTC");
        let base = self.config.time_base_url.as_deref().unwrap_or(TIME_API_URL);
        let url = format!("{base}/api/timezone/{timezone}");

        let body = match self.get_json(category, &url, &[]).await {
            Ok(body) => body,
            Err(result) => return *result,
        };

        FactResult::available(
            category,
            json!({
                "timezone": timezone,
                "datetime": body["datetime"],
                "day_of_week": body["day_of_week"],
                "utc_offset": body["utc_offset"],
            }),
        )
    }

    async fn fetch_crypto(&self, params: &FactParams) -> FactResult {
        let category = FactCategory::Crypto;
        let symbol = params.symbol.as_deref().unwrap_or("bitcoin");
        let base = self
            .config
            .crypto_base_url
            .as_deref()
            .unwrap_or(CRYPTO_API_URL);
        let url = format!("{base}/api/v3/simple/price");

        let body = match self
            .get_json(
                category,
                &url,
                &[
                    ("ids", symbol),
                    ("vs_currencies", "usd"),
                    ("include_24hr_change", "true"),
                ],
            )
            .await
        {
            Ok(body) => body,
            Err(result) => return *result,
        };

        if body[symbol].is_null() {
            return FactResult::unavailable(category, format!("unknown coin id: {symbol}"));
        }

        FactResult::available(
            category,
            json!({
                "coin": symbol,
                "price_usd": body[symbol]["usd"],
                "change_24h_pct": body[symbol]["usd_24h_change"],
            }),
        )
    }

    async fn fetch_news(&self, params: &FactParams) -> FactResult {
        let category = FactCategory::News;
        let Some(key) = self.config.news_api_key.as_deref() else {
            return FactResult::unavailable(category, "NEWS_API_KEY not set");
        };
        let topic = params.topic.as_deref().unwrap_or("general");
        let limit = params.limit.unwrap_or(5).min(10).to_string();
        let base = self.config.news_base_url.as_deref().unwrap_or(NEWS_API_URL);
        let url = format!("{base}/v2/top-headlines");

        let body = match self
            .get_json(
                category,
                &url,
                &[("q", topic), ("pageSize", &limit), ("apiKey", key)],
            )
            .await
        {
            Ok(body) => body,
            Err(result) => return *result,
        };

        let headlines: Vec<Value> = body["articles"]
            .as_array()
            .map(|articles| {
                articles
                    .iter()
                    .map(|a| json!({ "title": a["title"], "source": a["source"]["name"] }))
                    .collect()
            })
            .unwrap_or_default();

        FactResult::available(category, json!({ "topic": topic, "headlines": headlines }))
    }

    async fn fetch_stocks(&self, params: &FactParams) -> FactResult {
        let category = FactCategory::Stocks;
        let Some(key) = self.config.alpha_vantage_api_key.as_deref() else {
            return FactResult::unavailable(category, "ALPHA_VANTAGE_API_KEY not set");
        };
        let symbol = params.symbol.as_deref().unwrap_or("SPY");
        let base = self
            .config
            .stocks_base_url
            .as_deref()
            .unwrap_or(STOCKS_API_URL);
        let url = format!("{base}/query");

        let body = match self
            .get_json(
                category,
                &url,
                &[("function", "GLOBAL_QUOTE"), ("symbol", symbol), ("apikey", key)],
            )
            .await
        {
            Ok(body) => body,
            Err(result) => return *result,
        };

        let quote = &body["Global Quote"];
        if !quote.is_object() || quote["05. price"].is_null() {
            return FactResult::unavailable(category, format!("no quote for symbol: {symbol}"));
        }

        FactResult::available(
            category,
            json!({
                "symbol": symbol,
                "price": quote["05. price"],
                "change_pct": quote["10. change percent"],
            }),
        )
    }

    /// Shared GET helper. Any transport or status failure becomes an
    /// `Unavailable` result (boxed so callers can `return *result`).
    async fn get_json(
        &self,
        category: FactCategory,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, Box<FactResult>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!(%category, error = %e, "fact upstream request failed");
                Box::new(FactResult::unavailable(
                    category,
                    format!("request failed: {e}"),
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Box::new(FactResult::unavailable(
                category,
                format!("upstream returned {status}"),
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            Box::new(FactResult::unavailable(
                category,
                format!("invalid upstream payload: {e}"),
            ))
        })
    }
}
