use async_trait::async_trait;
use chatrelay_common::{ChatRole, Error, ProviderId, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{transport_error, ChatMessage, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn convert_request(&self, request: &LlmRequest) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(OpenAiMessage::System {
                content: system.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(convert_message(msg));
        }

        OpenAiRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

fn convert_message(msg: &ChatMessage) -> OpenAiMessage {
    let flatten = |part: &MessagePart| match part {
        MessagePart::Text(t) => t.clone(),
        MessagePart::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    match msg.role {
        ChatRole::System => OpenAiMessage::System {
            content: flatten(&msg.content),
        },
        ChatRole::Assistant => OpenAiMessage::Assistant {
            content: flatten(&msg.content),
        },
        ChatRole::User => {
            let content = match &msg.content {
                MessagePart::Text(t) => OpenAiUserContent::Text(t.clone()),
                MessagePart::Parts(parts) => OpenAiUserContent::Parts(
                    parts
                        .iter()
                        .map(|p| match p {
                            ContentBlock::Text { text } => OpenAiContentPart::Text {
                                text: text.clone(),
                            },
                            ContentBlock::Image { data_url } => OpenAiContentPart::ImageUrl {
                                image_url: OpenAiImageUrl {
                                    url: data_url.clone(),
                                },
                            },
                        })
                        .collect(),
                ),
            };
            OpenAiMessage::User { content }
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.convert_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::OpenAi, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                provider: ProviderId::OpenAi.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| transport_error(ProviderId::OpenAi, e))?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| Error::Upstream {
            provider: ProviderId::OpenAi.to_string(),
            status: status.as_u16(),
            message: "no choices in response".to_string(),
        })?;

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default().trim().to_string(),
            model: parsed.model,
            tokens_used: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OpenAiMessage {
    System { content: String },
    User { content: OpenAiUserContent },
    Assistant { content: String },
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiUserContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}
