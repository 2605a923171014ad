//! Minimal non-streaming client for OpenAI-compatible chat completions.
//!
//! Shared by the Logic Core backend and the vision collaborator. Works with
//! Ollama, llama.cpp server, vLLM and hosted providers.

use std::time::Duration;

/// `{base}/v1/chat/completions`, accepting a base with or without `/v1`.
pub fn chat_completions_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}/v1/chat/completions")
}

/// Failure talking to the completions endpoint.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Response(String),
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ChatClient {
    /// # Errors
    ///
    /// Returns [`CompletionError::Request`] if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: chat_completions_url(api_url),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `body` and return `choices[0].message.content`.
    pub async fn complete(&self, body: &serde_json::Value) -> Result<String, CompletionError> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Response(e.to_string()))?;
        value
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(|s| s.trim().to_owned())
            .ok_or_else(|| CompletionError::Response("missing choices[0].message.content".into()))
    }
}
