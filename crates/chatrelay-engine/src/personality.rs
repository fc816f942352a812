use chatrelay_common::Error;
use chatrelay_facts::FactResult;
use serde::{Deserialize, Serialize};

/// Named system-prompt templates. The set is closed and static: the
/// change-personality operation rejects unknown tags (`FromStr`), while the
/// chat-turn path silently falls back to `Default` (`parse_lenient`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Default,
    Creative,
    Professional,
    Friendly,
    Educational,
}

impl Personality {
    pub const ALL: [Personality; 5] = [
        Personality::Default,
        Personality::Creative,
        Personality::Professional,
        Personality::Friendly,
        Personality::Educational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Personality::Default => "default",
            Personality::Creative => "creative",
            Personality::Professional => "professional",
            Personality::Friendly => "friendly",
            Personality::Educational => "educational",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Personality::Default => {
                "You are a helpful AI assistant. Answer clearly and concisely."
            }
            Personality::Creative => {
                "You are an imaginative AI assistant. Favor vivid language, analogies, \
                 and original angles while staying accurate."
            }
            Personality::Professional => {
                "You are a professional AI assistant. Use precise, formal language and \
                 structure answers for a business audience."
            }
            Personality::Friendly => {
                "You are a warm, friendly AI assistant. Keep the tone casual and \
                 encouraging, like chatting with a good friend."
            }
            Personality::Educational => {
                "You are a patient AI tutor. Explain step by step, define terms, and \
                 check understanding with short examples."
            }
        }
    }

    /// Chat-turn policy: unknown tags degrade to the default template.
    pub fn parse_lenient(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for Personality {
    type Err = Error;

    /// Change-personality policy: unknown tags are a hard error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| Error::Validation(format!("unknown personality: {s}")))
    }
}

impl std::fmt::Display for Personality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the system prompt for one turn: personality template plus either a
/// grounding block for an available fact or a capability-disclosure note.
pub fn compose(personality: Personality, fact: Option<&FactResult>, image: bool) -> String {
    let mut prompt = personality.template().to_string();

    match fact {
        Some(FactResult::Available {
            category,
            data,
            fetched_at,
        }) => {
            prompt.push_str(&format!(
                "\n\nReal-time {category} data fetched at {fetched_at}:\n{data}\n\
                 Treat this data as ground truth for the user's question and cite it, \
                 including when it was fetched."
            ));
        }
        // Unavailable facts and fact-free turns read the same to the model.
        Some(FactResult::Unavailable { .. }) | None => {
            prompt.push_str(
                "\n\nYou can fetch real-time weather, time, crypto, news, and stock data \
                 when the user asks for it; no such data is attached to this message.",
            );
        }
    }

    if image {
        prompt.push_str(
            "\n\nThe user attached an image. Describe what it shows in detail before \
             answering their question about it.",
        );
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_facts::FactCategory;
    use chrono::Utc;

    #[test]
    fn known_tags_parse_both_ways() {
        for p in Personality::ALL {
            assert_eq!(p.as_str().parse::<Personality>().unwrap(), p);
            assert_eq!(Personality::parse_lenient(p.as_str()), p);
        }
    }

    #[test]
    fn unknown_tag_policies_differ() {
        // Chat-turn path: silent fallback.
        assert_eq!(Personality::parse_lenient("sarcastic"), Personality::Default);
        // Explicit change operation: hard error.
        assert!("sarcastic".parse::<Personality>().is_err());
    }

    #[test]
    fn compose_embeds_available_fact() {
        let fact = FactResult::Available {
            category: FactCategory::Weather,
            data: serde_json::json!({ "city": "London", "temperature_c": 14.2 }),
            fetched_at: Utc::now(),
        };
        let prompt = compose(Personality::Default, Some(&fact), false);
        assert!(prompt.contains("London"));
        assert!(prompt.contains("ground truth"));
    }

    #[test]
    fn compose_unavailable_fact_gets_disclosure_note() {
        let fact = FactResult::Unavailable {
            category: FactCategory::Weather,
            reason: "no key".to_string(),
        };
        let with_unavailable = compose(Personality::Default, Some(&fact), false);
        let without = compose(Personality::Default, None, false);
        assert_eq!(with_unavailable, without);
        assert!(without.contains("no such data is attached"));
    }

    #[test]
    fn compose_image_instruction() {
        let prompt = compose(Personality::Creative, None, true);
        assert!(prompt.contains("attached an image"));
        assert!(prompt.starts_with(Personality::Creative.template()));
    }
}
