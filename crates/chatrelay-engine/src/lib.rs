pub mod engine;
pub mod personality;
pub mod ratelimit;
pub mod store;
pub mod validate;

pub use engine::{ChatResult, ConversationInfo, Engine, TurnAttachment, TurnOptions};
pub use personality::Personality;
pub use ratelimit::RateLimiter;
pub use store::ConversationStore;
