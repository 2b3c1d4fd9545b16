use crate::{GenerateRequest, GenerateResponse, LlmProvider, ProviderError};
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub timeout: Duration,
}

/// Client for OpenAI-compatible `/v1/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    cfg: Arc<OpenAiConfig>,
}

impl OpenAiProvider {
    pub fn new(cfg: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        )
    }
}

/// Builds the chat body. Media turns the user message into a multi-part
/// message with one `image_url` part per attachment.
pub(crate) fn chat_body(model: &str, request: &GenerateRequest) -> Value {
    let content = if request.media.is_empty() {
        Value::String(request.prompt.clone())
    } else {
        let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
        for media in &request.media {
            parts.push(json!({
                "type": "image_url",
                "image_url": { "url": media.url },
            }));
        }
        Value::Array(parts)
    };

    let mut body = json!({
        "model": model,
        "messages": [{ "role": "user", "content": content }],
    });
    if let Some(schema) = &request.schema {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": { "name": request.name, "schema": schema },
        });
    }
    body
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessageResp,
        }
        #[derive(Deserialize)]
        struct ChatMessageResp {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct ChatApiResponse {
            model: Option<String>,
            choices: Vec<Choice>,
        }

        let body = chat_body(&self.cfg.chat_model, request);
        debug!(prompt = %request.name, media = request.media.len(), "sending chat completion");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(ProviderError::RequestFailed(format!(
                "status {} body {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        let parsed: ChatApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("reply has no content".into()))?;

        Ok(GenerateResponse {
            text,
            model: parsed.model,
        })
    }
}
