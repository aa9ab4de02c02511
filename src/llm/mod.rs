// LLM abstraction layer

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsAdapter;
pub use provider::*;
pub use crate::types::{LLMMessage, LLMProvider, LLMRequest, LLMResponse, TokenUsage};
