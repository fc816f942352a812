use std::collections::HashMap;

use chatrelay_agents::catalog;
use chatrelay_agents::dispatch::{Attachment, DispatchRequest, Dispatcher};
use chatrelay_common::{ChatRole, Error, ProviderId, Result};
use chatrelay_config::AppConfig;
use chatrelay_facts::{classify, detect_city, FactParams, FactProvider, FactResult};
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::personality::{compose, Personality};
use crate::ratelimit::RateLimiter;
use crate::store::ConversationStore;
use crate::validate::sanitize_message;

/// Per-turn options. `use_memory = false` suppresses reading history into the
/// prompt; the completed turn is still written afterward.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    pub personality: Option<String>,
    pub use_memory: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub attachment: Option<TurnAttachment>,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            personality: None,
            use_memory: true,
            provider: None,
            model: None,
            attachment: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TurnAttachment {
    Image { data_url: String },
    Document { name: String, text: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResult {
    pub response: String,
    pub model_used: String,
    pub provider: ProviderId,
    pub tokens_used: u32,
    pub conversation_length: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationInfo {
    pub length: usize,
    pub personality: Personality,
}

/// Orchestrates one chat turn end to end. Owns all mutable in-process state
/// (conversation logs, rate windows, per-user personality); instances are
/// independent, so tests build one per case.
pub struct Engine {
    store: ConversationStore,
    limiter: RateLimiter,
    personalities: DashMap<String, Personality>,
    facts: FactProvider,
    dispatcher: Dispatcher,
    max_message_len: usize,
}

impl Engine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: ConversationStore::new(config.engine.history_cap),
            limiter: RateLimiter::new(config.engine.rate_limit, config.engine.rate_window_secs),
            personalities: DashMap::new(),
            facts: FactProvider::new(config.facts.clone()),
            dispatcher: Dispatcher::from_config(&config.llm),
            max_message_len: config.engine.max_message_len,
        }
    }

    /// Rate-limit gate, called by the gateway before any turn work.
    pub fn admit(&self, client_id: &str) -> Result<()> {
        if self.limiter.admit(client_id, Utc::now()) {
            Ok(())
        } else {
            Err(Error::RateLimited {
                retry_after_secs: self.limiter.window_secs(),
            })
        }
    }

    /// Drop idle rate-limit windows; run periodically by the gateway.
    pub fn prune_rate_windows(&self) {
        self.limiter.prune_idle(Utc::now());
    }

    pub fn facts(&self) -> &FactProvider {
        &self.facts
    }

    pub fn configured_providers(&self) -> Vec<ProviderId> {
        self.dispatcher.configured_providers()
    }

    pub async fn turn(
        &self,
        user_id: &str,
        message: &str,
        options: TurnOptions,
    ) -> Result<ChatResult> {
        let message = sanitize_message(message, self.max_message_len)?;

        let provider = match options.provider.as_deref() {
            Some(p) => p.parse::<ProviderId>()?,
            None => ProviderId::OpenAi,
        };

        let personality = match options.personality.as_deref() {
            Some(tag) => Personality::parse_lenient(tag),
            None => self.personality_for(user_id),
        };

        // Attachments reshape the outgoing message; only plain text turns get
        // real-time fact detection.
        let (dispatched_message, image, fact) = match &options.attachment {
            Some(TurnAttachment::Image { data_url }) => (
                message.clone(),
                Some(Attachment::Image {
                    data_url: data_url.clone(),
                }),
                None,
            ),
            Some(TurnAttachment::Document { name, text }) => (
                format!("Document: {name}\n\nContent:\n{text}\n\nUser Question: {message}"),
                None,
                None,
            ),
            None => (message.clone(), None, self.lookup_fact(&message).await),
        };

        let system_prompt = compose(personality, fact.as_ref(), image.is_some());

        let history = if options.use_memory {
            self.store.history(user_id)
        } else {
            Vec::new()
        };

        let result = self
            .dispatcher
            .send(DispatchRequest {
                provider,
                model: options.model.clone(),
                system_prompt,
                history,
                user_message: dispatched_message.clone(),
                attachment: image,
            })
            .await?;

        // The turn pair lands only on success; a failed dispatch leaves the
        // log untouched. Memory writes are not gated by `use_memory`.
        self.store.append(user_id, ChatRole::User, dispatched_message);
        self.store
            .append(user_id, ChatRole::Assistant, result.response.clone());

        info!(
            user_id,
            provider = %result.provider,
            model = result.model_used,
            tokens = result.tokens_used,
            "completed chat turn"
        );

        Ok(ChatResult {
            response: result.response,
            model_used: result.model_used,
            provider: result.provider,
            tokens_used: result.tokens_used,
            conversation_length: self.store.len(user_id),
        })
    }

    /// Fan one message out to several models; each entry succeeds or fails on
    /// its own and nothing is written to conversation memory.
    pub async fn compare_models(
        &self,
        message: &str,
        models: &[String],
    ) -> Result<HashMap<String, String>> {
        let message = sanitize_message(message, self.max_message_len)?;
        let system_prompt = compose(Personality::Default, None, false);

        let calls = models.iter().map(|model_id| {
            let message = message.clone();
            let system_prompt = system_prompt.clone();
            async move {
                let Some(spec) = catalog::CATALOG.iter().find(|m| m.model_id == *model_id)
                else {
                    return (model_id.clone(), format!("error: unknown model {model_id}"));
                };

                let outcome = self
                    .dispatcher
                    .send(DispatchRequest {
                        provider: spec.provider,
                        model: Some(spec.model_id.to_string()),
                        system_prompt,
                        history: Vec::new(),
                        user_message: message,
                        attachment: None,
                    })
                    .await;

                match outcome {
                    Ok(result) => (model_id.clone(), result.response),
                    Err(e) => {
                        warn!(model = %model_id, error = %e, "compare-models entry failed");
                        (model_id.clone(), format!("error: {e}"))
                    }
                }
            }
        });

        Ok(join_all(calls).await.into_iter().collect())
    }

    /// Strict variant: unknown tags are an error, unlike the chat-turn path.
    pub fn change_personality(&self, user_id: &str, tag: &str) -> Result<Personality> {
        let personality: Personality = tag.parse()?;
        self.personalities.insert(user_id.to_string(), personality);
        Ok(personality)
    }

    pub fn clear(&self, user_id: &str) {
        self.store.clear(user_id);
    }

    pub fn conversation_info(&self, user_id: &str) -> ConversationInfo {
        ConversationInfo {
            length: self.store.len(user_id),
            personality: self.personality_for(user_id),
        }
    }

    fn personality_for(&self, user_id: &str) -> Personality {
        self.personalities
            .get(user_id)
            .map(|p| *p)
            .unwrap_or_default()
    }

    /// Best-effort real-time lookup. Any failure becomes an unavailable fact,
    /// which composes the same as having no fact at all.
    async fn lookup_fact(&self, message: &str) -> Option<FactResult> {
        let category = classify(message)?;
        let params = FactParams {
            city: detect_city(message).map(String::from),
            ..Default::default()
        };
        Some(self.facts.fetch(category, &params).await)
    }
}
