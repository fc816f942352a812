use async_trait::async_trait;
use chatrelay_common::{ChatRole, Error, ProviderId, Result};
use reqwest::Client;
use serde_json::json;

use super::{transport_error, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    client: Client,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn create_request_body(&self, request: &LlmRequest) -> Result<serde_json::Value> {
        let mut messages = Vec::with_capacity(request.messages.len());

        for msg in &request.messages {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::System => {
                    return Err(Error::Internal(
                        "system messages belong in the `system` field, not in `messages`"
                            .to_string(),
                    ))
                }
            };

            let content = match &msg.content {
                MessagePart::Text(text) => text.clone(),
                MessagePart::Parts(parts) => {
                    let mut texts = Vec::new();
                    for part in parts {
                        match part {
                            ContentBlock::Text { text } => texts.push(text.as_str()),
                            ContentBlock::Image { .. } => {
                                return Err(Error::Validation(
                                    "claude models do not accept image attachments".to_string(),
                                ))
                            }
                        }
                    }
                    texts.join("\n")
                }
            };

            messages.push(json!({ "role": role, "content": content }));
        }

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
            "temperature": request.temperature,
        });

        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }

        Ok(body)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Claude
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = self.create_request_body(request)?;

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::Claude, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                provider: ProviderId::Claude.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| transport_error(ProviderId::Claude, e))?;

        let text = raw["content"][0]["text"]
            .as_str()
            .ok_or_else(|| Error::Upstream {
                provider: ProviderId::Claude.to_string(),
                status: status.as_u16(),
                message: "missing content in response".to_string(),
            })?
            .trim()
            .to_string();

        let tokens_used = (raw["usage"]["input_tokens"].as_u64().unwrap_or(0)
            + raw["usage"]["output_tokens"].as_u64().unwrap_or(0)) as u32;

        Ok(LlmResponse {
            text,
            model: raw["model"]
                .as_str()
                .unwrap_or(&request.model)
                .to_string(),
            tokens_used,
        })
    }
}
