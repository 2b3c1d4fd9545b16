//! Replays canned replies keyed by prompt name.
//!
//! Used for offline runs and for driving the upload pipeline through a
//! failure at a chosen stage.

use crate::{GenerateRequest, GenerateResponse, LlmProvider, ProviderError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Each prompt name owns a queue of replies. Replies are consumed in order
/// and the last one repeats once the queue is down to a single entry.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, name: &str, text: impl Into<String>) -> Self {
        self.push(name, Scripted::Reply(text.into()));
        self
    }

    pub fn reply_json(self, name: &str, value: serde_json::Value) -> Self {
        self.reply(name, value.to_string())
    }

    pub fn fail(self, name: &str, message: impl Into<String>) -> Self {
        self.push(name, Scripted::Fail(message.into()));
        self
    }

    fn push(&self, name: &str, entry: Scripted) {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies.entry(name.to_string()).or_default().push_back(entry);
    }

    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.name == name)
            .count()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let next = {
            let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
            replies.get_mut(&request.name).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match next {
            Some(Scripted::Reply(text)) => Ok(GenerateResponse {
                text,
                model: Some("scripted".into()),
            }),
            Some(Scripted::Fail(message)) => Err(ProviderError::RequestFailed(message)),
            None => Err(ProviderError::RequestFailed(format!(
                "no scripted reply for {}",
                request.name
            ))),
        }
    }
}
