use std::sync::Arc;
use std::time::Duration;

use chatrelay_common::{ChatRole, Error, ProviderId, Result, StoredMessage};
use chatrelay_config::LlmConfig;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog;
use crate::providers::{
    AnthropicProvider, ChatMessage, ContentBlock, GeminiProvider, LlmProvider, LlmRequest,
    MessagePart, OpenAiProvider,
};

/// Prior messages carried into the prompt; halved when an image rides along.
const HISTORY_LIMIT: usize = 10;
const IMAGE_HISTORY_LIMIT: usize = 5;

const TEXT_TIMEOUT: Duration = Duration::from_secs(60);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

const MAX_RESPONSE_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// One fully-resolved dispatch call. The dispatcher never touches
/// conversation state; the engine appends the turn pair on success.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub provider: ProviderId,
    pub model: Option<String>,
    pub system_prompt: String,
    pub history: Vec<StoredMessage>,
    pub user_message: String,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone)]
pub enum Attachment {
    /// Image as a `data:` URL, already validated by the gateway.
    Image { data_url: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub response: String,
    pub model_used: String,
    pub provider: ProviderId,
    pub tokens_used: u32,
}

/// Routes a composed prompt to the chosen vendor, with one-shot model
/// fallback on the OpenAI path.
pub struct Dispatcher {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let mut dispatcher = Self::new();

        if let Some(key) = &config.openai_api_key {
            let mut provider = OpenAiProvider::new(key.clone());
            if let Some(base) = &config.openai_base_url {
                provider = provider.with_base_url(base.clone());
            }
            dispatcher.register(Arc::new(provider));
        }
        if let Some(key) = &config.anthropic_api_key {
            let mut provider = AnthropicProvider::new(key.clone());
            if let Some(base) = &config.anthropic_base_url {
                provider = provider.with_base_url(base.clone());
            }
            dispatcher.register(Arc::new(provider));
        }
        if let Some(key) = &config.gemini_api_key {
            let mut provider = GeminiProvider::new(key.clone());
            if let Some(base) = &config.gemini_base_url {
                provider = provider.with_base_url(base.clone());
            }
            dispatcher.register(Arc::new(provider));
        }

        dispatcher
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        info!(provider = %provider.provider_id(), "registered LLM provider");
        self.providers.push(provider);
    }

    pub fn is_configured(&self, id: ProviderId) -> bool {
        self.providers.iter().any(|p| p.provider_id() == id)
    }

    pub fn configured_providers(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.provider_id()).collect()
    }

    fn get(&self, id: ProviderId) -> Result<&Arc<dyn LlmProvider>> {
        self.providers
            .iter()
            .find(|p| p.provider_id() == id)
            .ok_or_else(|| Error::Config(format!("{id} API key not configured")))
    }

    pub async fn send(&self, request: DispatchRequest) -> Result<TurnResult> {
        // Absent or unrecognized model ids resolve to the provider default.
        let spec = request
            .model
            .as_deref()
            .and_then(|m| catalog::find(request.provider, m))
            .unwrap_or_else(|| catalog::default_model(request.provider));

        let has_image = request.attachment.is_some();
        if has_image && !spec.supports_images {
            return Err(Error::Validation(format!(
                "model {} does not support image input",
                spec.model_id
            )));
        }

        let provider = self.get(request.provider)?;

        let history_limit = if has_image {
            IMAGE_HISTORY_LIMIT
        } else {
            HISTORY_LIMIT
        };
        let skip = request.history.len().saturating_sub(history_limit);
        let mut messages: Vec<ChatMessage> = request.history[skip..]
            .iter()
            .map(|m| ChatMessage::text(m.role, m.content.clone()))
            .collect();

        messages.push(match &request.attachment {
            Some(Attachment::Image { data_url }) => ChatMessage {
                role: ChatRole::User,
                content: MessagePart::Parts(vec![
                    ContentBlock::Text {
                        text: request.user_message.clone(),
                    },
                    ContentBlock::Image {
                        data_url: data_url.clone(),
                    },
                ]),
            },
            None => ChatMessage::text(ChatRole::User, request.user_message.clone()),
        });

        let llm_request = LlmRequest {
            model: spec.model_id.to_string(),
            system: Some(request.system_prompt.clone()),
            messages,
            max_tokens: MAX_RESPONSE_TOKENS,
            temperature: TEMPERATURE,
            timeout: if has_image { IMAGE_TIMEOUT } else { TEXT_TIMEOUT },
        };

        match provider.complete(&llm_request).await {
            Ok(response) => Ok(TurnResult {
                response: response.text,
                model_used: spec.model_id.to_string(),
                provider: request.provider,
                tokens_used: response.tokens_used,
            }),
            Err(e) => {
                let fallback = catalog::fallback_model(request.provider)
                    .filter(|f| e.is_retryable() && f.model_id != spec.model_id);

                let Some(fallback) = fallback else {
                    return Err(e);
                };

                warn!(
                    primary = spec.model_id,
                    fallback = fallback.model_id,
                    error = %e,
                    "primary model failed, retrying against fallback"
                );

                let retry = LlmRequest {
                    model: fallback.model_id.to_string(),
                    ..llm_request
                };
                let response = provider.complete(&retry).await?;
                Ok(TurnResult {
                    response: response.text,
                    model_used: fallback.model_id.to_string(),
                    provider: request.provider,
                    tokens_used: response.tokens_used,
                })
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
