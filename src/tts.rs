//! Speech synthesis through an external command.

use crate::config::TtsConfig;
use crate::process;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Write speech for `text` to `output`. `true` when the artifact exists
    /// and is non-empty.
    async fn synthesize(&self, text: &str, output: &Path) -> bool;
}

/// Runs a program such as `edge-tts`, substituting `{text}` and `{output}`
/// in its arguments.
pub struct CommandTts {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTts {
    /// # Errors
    ///
    /// Fails when the program is not on `PATH`.
    pub fn new(config: &TtsConfig) -> crate::Result<Self> {
        let program = which::which(&config.program)
            .map_err(|e| crate::LilithError::Tts(format!("{}: {e}", config.program)))?;
        Ok(Self {
            program,
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl SpeechSynth for CommandTts {
    async fn synthesize(&self, text: &str, output: &Path) -> bool {
        let output_str = output.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{text}", text).replace("{output}", &output_str))
            .collect();

        match process::run(&self.program, &args, None, self.timeout).await {
            Ok(result) if result.success => artifact_ready(output),
            Ok(result) => {
                tracing::warn!(
                    code = ?result.code,
                    timed_out = result.timed_out,
                    stderr = %result.stderr.trim(),
                    "speech synthesis failed"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis could not start");
                false
            }
        }
    }
}

/// Used when TTS is disabled or the program is missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTts;

#[async_trait]
impl SpeechSynth for SilentTts {
    async fn synthesize(&self, _text: &str, _output: &Path) -> bool {
        false
    }
}

pub fn from_config(config: &TtsConfig) -> Box<dyn SpeechSynth> {
    if !config.enabled {
        tracing::info!("speech synthesis disabled");
        return Box::new(SilentTts);
    }
    match CommandTts::new(config) {
        Ok(tts) => Box::new(tts),
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis unavailable, replies will be text only");
            Box::new(SilentTts)
        }
    }
}

/// The output file exists and has content.
pub fn artifact_ready(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}
