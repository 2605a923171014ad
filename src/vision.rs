//! Screen captioning: capture the screen and ask a vision model about it.

use crate::config::VisionConfig;
use crate::openai::ChatClient;
use crate::process;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::PathBuf;
use std::time::Duration;

/// Context line used when the user asks to see but vision is off.
pub const BLIND_NOTE: &str = "[SYSTEM_NOTE: User asked to see, but Vision is disabled/blind.]";

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Vision: Send + Sync {
    /// Whether [`analyze`](Self::analyze) can produce a real description.
    fn available(&self) -> bool;

    /// Describe a fresh capture of the screen in light of `query`.
    async fn analyze(&self, query: &str) -> String;
}

/// Screenshot program plus an OpenAI-compatible vision model.
pub struct ScreenVision {
    program: PathBuf,
    args: Vec<String>,
    client: ChatClient,
    model: String,
}

impl ScreenVision {
    /// # Errors
    ///
    /// Fails when the capture program is not on `PATH` or the HTTP client
    /// cannot be built.
    pub fn new(config: &VisionConfig) -> crate::Result<Self> {
        let program = which::which(&config.capture_program).map_err(|e| {
            crate::LilithError::Vision(format!("{}: {e}", config.capture_program))
        })?;
        let client = ChatClient::new(
            &config.api_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(|e| crate::LilithError::Vision(e.to_string()))?;
        Ok(Self {
            program,
            args: config.capture_args.clone(),
            client,
            model: config.model.clone(),
        })
    }

    async fn capture(&self) -> crate::Result<Vec<u8>> {
        let target = std::env::temp_dir().join(format!("lilith-capture-{}.png", uuid::Uuid::new_v4()));
        let target_str = target.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{output}", &target_str))
            .collect();

        let output = process::run(&self.program, &args, None, CAPTURE_TIMEOUT).await?;
        let bytes = if output.success {
            std::fs::read(&target).map_err(|e| crate::LilithError::Vision(format!("capture unreadable: {e}")))
        } else {
            Err(crate::LilithError::Vision(format!(
                "capture failed: {}",
                output.combined().trim()
            )))
        };
        let _ = std::fs::remove_file(&target);
        bytes
    }

    async fn describe(&self, query: &str) -> crate::Result<String> {
        let png = self.capture().await?;
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": query},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
        });
        self.client
            .complete(&body)
            .await
            .map_err(|e| crate::LilithError::Vision(e.to_string()))
    }
}

#[async_trait]
impl Vision for ScreenVision {
    fn available(&self) -> bool {
        true
    }

    async fn analyze(&self, query: &str) -> String {
        match self.describe(query).await {
            Ok(answer) => format!("[VISUAL ANALYSIS]: {answer}"),
            Err(e) => {
                tracing::warn!(error = %e, "vision analysis failed");
                format!("[BLINDED]: {e}")
            }
        }
    }
}

/// Used when vision is disabled or no capture program exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blind;

#[async_trait]
impl Vision for Blind {
    fn available(&self) -> bool {
        false
    }

    async fn analyze(&self, _query: &str) -> String {
        BLIND_NOTE.to_owned()
    }
}

pub fn from_config(config: &VisionConfig) -> Box<dyn Vision> {
    if !config.enabled {
        tracing::info!("vision disabled");
        return Box::new(Blind);
    }
    match ScreenVision::new(config) {
        Ok(vision) => Box::new(vision),
        Err(e) => {
            tracing::warn!(error = %e, "vision unavailable, running blind");
            Box::new(Blind)
        }
    }
}
