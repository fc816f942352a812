use async_trait::async_trait;
use chatrelay_common::{ChatRole, Error, ProviderId, Result};
use reqwest::Client;
use serde_json::json;

use super::{transport_error, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    api_key: String,
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Gemini has no dedicated system slot in this endpoint; the system
    /// instruction rides as a prefix on the first user part.
    fn build_request_body(&self, request: &LlmRequest) -> Result<serde_json::Value> {
        let mut contents = Vec::with_capacity(request.messages.len());
        let mut system_prefix = request.system.clone();

        for msg in &request.messages {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
                ChatRole::System => {
                    return Err(Error::Internal(
                        "system messages are folded into the first user turn".to_string(),
                    ))
                }
            };

            let mut text = match &msg.content {
                MessagePart::Text(t) => t.clone(),
                MessagePart::Parts(parts) => parts
                    .iter()
                    .map(|p| match p {
                        ContentBlock::Text { text } => Ok(text.as_str()),
                        ContentBlock::Image { .. } => Err(Error::Validation(
                            "gemini models do not accept image attachments".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join("\n"),
            };

            if msg.role == ChatRole::User {
                if let Some(system) = system_prefix.take() {
                    text = format!("{system}\n\n{text}");
                }
            }

            contents.push(json!({ "role": role, "parts": [{ "text": text }] }));
        }

        Ok(json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            },
        }))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = self.build_request_body(request)?;

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::Gemini, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                provider: ProviderId::Gemini.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| transport_error(ProviderId::Gemini, e))?;

        let text = raw["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| Error::Upstream {
                provider: ProviderId::Gemini.to_string(),
                status: status.as_u16(),
                message: "missing candidates in response".to_string(),
            })?
            .trim()
            .to_string();

        let tokens_used = raw["usageMetadata"]["totalTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32;

        Ok(LlmResponse {
            text,
            model: request.model.clone(),
            tokens_used,
        })
    }
}
