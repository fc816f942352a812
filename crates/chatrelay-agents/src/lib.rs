pub mod catalog;
pub mod dispatch;
pub mod providers;

pub use catalog::ModelSpec;
pub use dispatch::{Attachment, Dispatcher, DispatchRequest, TurnResult};
pub use providers::{
    AnthropicProvider, ChatMessage, ContentBlock, GeminiProvider, LlmProvider, LlmRequest,
    LlmResponse, MessagePart, OpenAiProvider,
};
