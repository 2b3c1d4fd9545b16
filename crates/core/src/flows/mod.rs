//! Prompt-and-schema wrappers around the hosted model.
//!
//! Each flow interpolates a fixed template, sends it with the JSON schema its
//! reply must follow, and validates the reply into a typed value. Flows keep
//! no state and never retry.

pub mod categorize;
mod json;
pub mod key_info;
pub mod search;
pub mod summarize;

pub use categorize::{auto_categorize_documents, CategoryPrediction};
pub use key_info::extract_key_info;
pub use search::document_search;
pub use summarize::summarize_and_extract_metadata;

use providers::{GenerateRequest, LlmProvider, ProviderError};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Sends one request and parses the first JSON object in the reply as `T`.
async fn run_flow<T: DeserializeOwned>(
    llm: &dyn LlmProvider,
    request: GenerateRequest,
) -> Result<T, ProviderError> {
    debug!(flow = %request.name, "calling model");
    let resp = llm.generate(&request).await?;
    let raw = json::extract_json_object(&resp.text).ok_or_else(|| {
        ProviderError::InvalidResponse(format!("{}: no JSON object in reply", request.name))
    })?;
    serde_json::from_str(raw)
        .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", request.name, e)))
}
