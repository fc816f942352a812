//! Static model catalog. Read-only at runtime; every provider carries exactly
//! one default model, and only OpenAI models accept image attachments.

use chatrelay_common::ProviderId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ModelSpec {
    pub provider: ProviderId,
    pub model_id: &'static str,
    pub display_name: &'static str,
    pub supports_images: bool,
    pub token_limit: u32,
    pub cost_per_1k_tokens: f64,
    pub is_default: bool,
}

pub const CATALOG: &[ModelSpec] = &[
    ModelSpec {
        provider: ProviderId::OpenAi,
        model_id: "gpt-4o",
        display_name: "GPT-4o",
        supports_images: true,
        token_limit: 128_000,
        cost_per_1k_tokens: 0.005,
        is_default: true,
    },
    ModelSpec {
        provider: ProviderId::OpenAi,
        model_id: "gpt-4o-mini",
        display_name: "GPT-4o mini",
        supports_images: true,
        token_limit: 128_000,
        cost_per_1k_tokens: 0.000_15,
        is_default: false,
    },
    ModelSpec {
        provider: ProviderId::OpenAi,
        model_id: "gpt-3.5-turbo",
        display_name: "GPT-3.5 Turbo",
        supports_images: false,
        token_limit: 16_385,
        cost_per_1k_tokens: 0.000_5,
        is_default: false,
    },
    ModelSpec {
        provider: ProviderId::Claude,
        model_id: "claude-3-5-sonnet-20241022",
        display_name: "Claude 3.5 Sonnet",
        supports_images: false,
        token_limit: 200_000,
        cost_per_1k_tokens: 0.003,
        is_default: true,
    },
    ModelSpec {
        provider: ProviderId::Claude,
        model_id: "claude-3-haiku-20240307",
        display_name: "Claude 3 Haiku",
        supports_images: false,
        token_limit: 200_000,
        cost_per_1k_tokens: 0.000_25,
        is_default: false,
    },
    ModelSpec {
        provider: ProviderId::Gemini,
        model_id: "gemini-1.5-pro",
        display_name: "Gemini 1.5 Pro",
        supports_images: false,
        token_limit: 1_000_000,
        cost_per_1k_tokens: 0.001_25,
        is_default: true,
    },
    ModelSpec {
        provider: ProviderId::Gemini,
        model_id: "gemini-1.5-flash",
        display_name: "Gemini 1.5 Flash",
        supports_images: false,
        token_limit: 1_000_000,
        cost_per_1k_tokens: 0.000_075,
        is_default: false,
    },
];

/// Model tried once when the primary OpenAI call fails retryably.
pub const OPENAI_FALLBACK_MODEL: &str = "gpt-4o-mini";

pub fn models_for(provider: ProviderId) -> impl Iterator<Item = &'static ModelSpec> {
    CATALOG.iter().filter(move |m| m.provider == provider)
}

pub fn find(provider: ProviderId, model_id: &str) -> Option<&'static ModelSpec> {
    CATALOG
        .iter()
        .find(|m| m.provider == provider && m.model_id == model_id)
}

pub fn default_model(provider: ProviderId) -> &'static ModelSpec {
    CATALOG
        .iter()
        .find(|m| m.provider == provider && m.is_default)
        .expect("catalog has a default model per provider")
}

/// Fallback tier exists for OpenAI only; Claude and Gemini failures are
/// terminal for that call.
pub fn fallback_model(provider: ProviderId) -> Option<&'static ModelSpec> {
    match provider {
        ProviderId::OpenAi => find(provider, OPENAI_FALLBACK_MODEL),
        ProviderId::Claude | ProviderId::Gemini => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_default_per_provider() {
        for provider in ProviderId::ALL {
            let defaults = models_for(provider).filter(|m| m.is_default).count();
            assert_eq!(defaults, 1, "{provider} must have exactly one default");
        }
    }

    #[test]
    fn only_openai_supports_images() {
        for model in CATALOG {
            if model.supports_images {
                assert_eq!(model.provider, ProviderId::OpenAi, "{}", model.model_id);
            }
        }
    }

    #[test]
    fn fallback_is_a_real_openai_model() {
        let fallback = fallback_model(ProviderId::OpenAi).unwrap();
        assert_eq!(fallback.model_id, OPENAI_FALLBACK_MODEL);
        assert!(fallback_model(ProviderId::Claude).is_none());
        assert!(fallback_model(ProviderId::Gemini).is_none());
    }
}
