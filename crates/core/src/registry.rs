use crate::config::ProviderConfig;
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::{LlmProvider, ProviderError, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Registers `noop` always and `openai` when an API key is available from the
/// config or `OPENAI_API_KEY`. `OPENAI_BASE_URL` overrides the endpoint.
pub fn build_registry(config: &ProviderConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new().with_llm("noop", Arc::new(NoopProvider));

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    if let Some(key) = api_key {
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        match OpenAiProvider::new(OpenAiConfig {
            api_key: key,
            base_url,
            chat_model: config.chat_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }) {
            Ok(provider) => reg = reg.with_llm("openai", Arc::new(provider)),
            Err(e) => warn!("openai provider unavailable: {}", e),
        }
    }

    reg.set_preferred_llm(&config.name)
}

/// Resolves the configured provider.
pub fn build_llm(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    build_registry(config).llm(None)
}
