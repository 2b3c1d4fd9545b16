use crate::{GenerateRequest, GenerateResponse, LlmProvider, ProviderError};

/// Provider used when no model is configured. Every call fails.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
