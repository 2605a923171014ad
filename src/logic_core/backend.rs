//! Model backend of the Logic Core.

use crate::config::CoreConfig;
use crate::error::{LilithError, Result};
use crate::openai::ChatClient;
use crate::protocol::CoreRequest;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// Answers a structured request with model text.
#[async_trait]
pub trait CoreBackend: Send + Sync {
    async fn complete(&self, request: &CoreRequest) -> Result<String>;
}

/// OpenAI-compatible `/v1/chat/completions` backend (Ollama, llama.cpp
/// server, vLLM, hosted APIs).
pub struct OpenAiBackend {
    client: ChatClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

impl OpenAiBackend {
    /// # Errors
    ///
    /// Returns [`LilithError::Core`] if the HTTP client cannot be built.
    pub fn new(config: &CoreConfig) -> Result<Self> {
        let client = ChatClient::new(
            &config.api_url,
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|e| LilithError::Core(e.to_string()))?;
        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.client.url()
    }
}

#[async_trait]
impl CoreBackend for OpenAiBackend {
    async fn complete(&self, request: &CoreRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": chat_messages(request),
            "stream": false,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "repeat_penalty": self.repeat_penalty,
        });
        self.client
            .complete(&body)
            .await
            .map_err(|e| LilithError::Core(e.to_string()))
    }
}

/// System (when present), then history, then the user message.
pub fn chat_messages(request: &CoreRequest) -> Vec<Value> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if !request.system.is_empty() {
        messages.push(json!({"role": "system", "content": request.system}));
    }
    for message in &request.history {
        messages.push(json!({"role": message.role, "content": message.content}));
    }
    messages.push(json!({"role": "user", "content": request.user}));
    messages
}
