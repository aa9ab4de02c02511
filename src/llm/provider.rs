use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::llm::chat_completions::ChatCompletionsAdapter;
use crate::types::{AppResult, LLMRequest, LLMResponse};

/// A text-generation service. Any `Err` is treated by callers as a
/// transport failure.
#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Build the configured client, or `None` when no API key is set.
pub fn client_from_config(config: &LLMConfig) -> Option<Arc<dyn LLMAdapter>> {
    let api_key = match config.active_api_key() {
        Some(key) => key,
        None => {
            warn!(provider = %config.provider, "No LLM API key configured, AI suggestions disabled");
            return None;
        }
    };

    let base_url = config.base_url();
    // The request timeout is enforced by the caller; this only guards against
    // connections that never complete.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .unwrap_or_default();

    info!(provider = %config.provider, model = %config.model, base_url = %base_url, "LLM client ready");
    Some(Arc::new(ChatCompletionsAdapter::with_client(client, &api_key, &base_url)))
}
