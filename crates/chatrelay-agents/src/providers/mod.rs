use std::time::Duration;

use async_trait::async_trait;
use chatrelay_common::{ChatRole, ProviderId, Result};
use serde::{Deserialize, Serialize};

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Trait for LLM vendor integrations (OpenAI, Anthropic, Gemini).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> ProviderId;

    /// Send one completion request and return the normalized response.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    /// System instruction. Each vendor decides placement: OpenAI prepends a
    /// system-role message, Anthropic uses the `system` field, Gemini folds
    /// it into the first user part.
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessagePart,
}

impl ChatMessage {
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessagePart::Text(content.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePart {
    Text(String),
    Parts(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { data_url: String },
}

/// Vendor-agnostic completion result.
#[derive(Debug, Clone, Serialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
    /// Total tokens consumed by the call, as reported by the vendor.
    pub tokens_used: u32,
}

/// Map a transport failure to the upstream error shape. Timeouts and
/// connection errors carry status 0, which the fallback logic treats as
/// retryable.
pub(crate) fn transport_error(provider: ProviderId, e: reqwest::Error) -> chatrelay_common::Error {
    let status = e.status().map(|s| s.as_u16()).unwrap_or(0);
    chatrelay_common::Error::Upstream {
        provider: provider.to_string(),
        status,
        message: format!("request failed: {e}"),
    }
}
