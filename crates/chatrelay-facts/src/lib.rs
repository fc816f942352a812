pub mod provider;
pub mod trigger;

pub use provider::{CategoryStatus, FactParams, FactProvider, FactResult};
pub use trigger::{classify, detect_city};

use serde::{Deserialize, Serialize};

/// Real-time data categories. Declaration order is trigger priority order:
/// when a message matches several categories, the first one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Weather,
    Time,
    Crypto,
    News,
    Stocks,
}

impl FactCategory {
    pub const ALL: [FactCategory; 5] = [
        FactCategory::Weather,
        FactCategory::Time,
        FactCategory::Crypto,
        FactCategory::News,
        FactCategory::Stocks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::Weather => "weather",
            FactCategory::Time => "time",
            FactCategory::Crypto => "crypto",
            FactCategory::News => "news",
            FactCategory::Stocks => "stocks",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for FactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
