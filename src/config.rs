//! Configuration shared by the Face, the Logic Core and the chat client.
//!
//! Every section is `#[serde(default)]`, so a partial `config.toml` only
//! needs the keys it changes.

use crate::error::{LilithError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LilithConfig {
    /// Process endpoints.
    pub network: NetworkConfig,
    /// Dialogue router behaviour.
    pub router: RouterConfig,
    /// Proactive idle check-ins.
    pub agency: AgencyConfig,
    /// `!good` / `!bad` reinforcement log.
    pub feedback: FeedbackConfig,
    /// File sandbox ("hands").
    pub sandbox: SandboxConfig,
    /// Long-term memory store.
    pub memory: MemoryConfig,
    /// Web search enrichment.
    pub search: WebSearchConfig,
    /// Screen captioning.
    pub vision: VisionConfig,
    /// Speech synthesis.
    pub tts: TtsConfig,
    /// Logic Core model backend and code watcher.
    pub core: CoreConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// UDP endpoints of the cooperating processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Where the Face (router) listens.
    pub face_addr: SocketAddr,
    /// Where the Logic Core listens.
    pub core_addr: SocketAddr,
    /// Where the Ears (speech-to-text) process accepts `MUTE` signals.
    pub ears_addr: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            face_addr: SocketAddr::from(([127, 0, 0, 1], 8005)),
            core_addr: SocketAddr::from(([127, 0, 0, 1], 8006)),
            ears_addr: SocketAddr::from(([127, 0, 0, 1], 8007)),
        }
    }
}

/// Router tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Receive timeout of the main loop; one agency check per expiry.
    pub heartbeat_ms: u64,
    /// How long a single Logic Core call may take.
    pub core_timeout_secs: u64,
    /// Number of user/agent exchanges kept as short-term history.
    pub history_exchanges: usize,
    /// Replies shorter than this (in characters) become a placeholder.
    pub min_reply_chars: usize,
    /// Identity instruction sent with every Core request.
    pub system_prompt: String,
    /// Substrings (lowercase) that trigger a web search.
    pub search_triggers: Vec<String>,
    /// Substrings (lowercase) that trigger a screen capture.
    pub vision_triggers: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 1000,
            core_timeout_secs: 30,
            history_exchanges: 10,
            min_reply_chars: 2,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            search_triggers: [
                "price", "news", "weather", "when", "who is", "what is", "search", "google",
                "find",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            vision_triggers: vec!["look".into(), "see".into()],
        }
    }
}

impl RouterConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn core_timeout(&self) -> Duration {
        Duration::from_secs(self.core_timeout_secs)
    }
}

/// Identity and behaviour rules given to the Logic Core model.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are SYNZ, an AI assistant. \
Your Goal: Answer the user's questions meaningfully and helpfully.\n\
RULES:\n\
1. NEVER repeat the user's input.\n\
2. If asked 'Who are you?', reply: 'I am SYNZ.'\n\
3. Be concise.";

/// Proactive check-in settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgencyConfig {
    pub enabled: bool,
    /// Seconds of silence before a check-in fires.
    pub idle_threshold_secs: u64,
    /// Pool the check-in text is drawn from.
    pub prompts: Vec<String>,
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_threshold_secs: 600,
            prompts: vec![
                "You have been quiet for a while. Are you stuck?".into(),
                "Hey! Drink some water.".into(),
                "I'm bored. Let's code something.".into(),
                "Do you want me to search for new AI papers?".into(),
            ],
        }
    }
}

impl AgencyConfig {
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }
}

/// Reinforcement log location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Append-only file receiving `!good` pairs.
    pub training_log: PathBuf,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            training_log: crate::dirs::training_log(),
        }
    }
}

/// File sandbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Directory all `!read` / `!write` / `!run` paths are confined to.
    pub root: PathBuf,
    /// Wall-clock limit for `!run`.
    pub run_timeout_secs: u64,
    /// `!read` replies are cut to this many characters.
    pub max_read_chars: usize,
    /// Captured `!run` output is cut to this many characters.
    pub max_output_chars: usize,
    /// Interpreter used for `.py` files.
    pub python: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            run_timeout_secs: 30,
            max_read_chars: 2000,
            max_output_chars: 4000,
            python: "python3".into(),
        }
    }
}

/// Long-term memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    /// Directory holding `memory.db`.
    pub root_dir: PathBuf,
    /// Snippets recalled per turn.
    pub recall_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root_dir: crate::dirs::memory_dir(),
            recall_limit: 2,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
    pub max_results: usize,
    pub timeout_secs: u64,
    /// Override of the search endpoint (mostly for tests).
    pub endpoint: Option<String>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: 3,
            timeout_secs: 8,
            endpoint: None,
        }
    }
}

impl WebSearchConfig {
    /// Engine configuration for the embedded search crate.
    pub fn to_engine_config(&self) -> lilith_search::SearchConfig {
        let mut config = lilith_search::SearchConfig {
            max_results: self.max_results,
            timeout_seconds: self.timeout_secs,
            ..Default::default()
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        config
    }
}

/// Screen captioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub enabled: bool,
    /// Screenshot program; `{output}` in `capture_args` is replaced by the
    /// PNG path.
    pub capture_program: String,
    pub capture_args: Vec<String>,
    /// OpenAI-compatible endpoint serving a vision model.
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let (program, args) = if cfg!(target_os = "macos") {
            ("screencapture", vec!["-x".to_owned(), "{output}".to_owned()])
        } else {
            ("scrot", vec!["-o".to_owned(), "{output}".to_owned()])
        };
        Self {
            enabled: true,
            capture_program: program.into(),
            capture_args: args,
            api_url: "http://127.0.0.1:11434".into(),
            api_key: None,
            model: "moondream".into(),
            timeout_secs: 60,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub enabled: bool,
    /// Synthesis program; `{text}` and `{output}` in `args` are substituted.
    pub program: String,
    pub args: Vec<String>,
    /// Audio artifact announced to clients with `[AUDIO]`.
    pub output_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "edge-tts".into(),
            args: [
                "--voice",
                "en-US-AnaNeural",
                "--text",
                "{text}",
                "--write-media",
                "{output}",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            output_path: crate::dirs::audio_output(),
            timeout_secs: 30,
        }
    }
}

/// Logic Core backend and code watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Base URL of an OpenAI-compatible server (a trailing `/v1` is fine).
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub request_timeout_secs: u64,
    /// Directory whose source files are reviewed when they change.
    pub watch_dir: Option<PathBuf>,
    pub watch_extensions: Vec<String>,
    /// Editor log tailed for new errors (e.g. Unity's `Editor.log`).
    pub watch_log: Option<PathBuf>,
    /// Case-sensitive words that make new log output worth a reaction.
    pub log_keywords: Vec<String>,
    pub watch_interval_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:11434".into(),
            model: "llama3".into(),
            api_key: None,
            max_tokens: 150,
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.1,
            request_timeout_secs: 25,
            watch_dir: None,
            watch_extensions: vec!["cs".into()],
            watch_log: None,
            log_keywords: vec!["Exception".into(), "Error".into()],
            watch_interval_ms: 2000,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write a daily-rolling log file.
    pub file_enabled: bool,
    pub directory: PathBuf,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: true,
            directory: crate::dirs::logs_dir(),
            default_filter: "lilith=info,lilith_search=warn".into(),
        }
    }
}

impl LilithConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| LilithError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LilithError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path` (or the default config file) if it exists, otherwise
    /// fall back to defaults. An explicitly given path must exist.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable or invalid file.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = crate::dirs::config_file();
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject values the router cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`LilithError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(LilithError::Config(msg.to_owned()));
        if self.router.heartbeat_ms == 0 {
            return invalid("router.heartbeat_ms must be greater than 0");
        }
        if self.router.core_timeout_secs == 0 {
            return invalid("router.core_timeout_secs must be greater than 0");
        }
        if self.router.history_exchanges == 0 {
            return invalid("router.history_exchanges must be greater than 0");
        }
        if self.network.face_addr == self.network.core_addr {
            return invalid("network.face_addr and network.core_addr must differ");
        }
        if self.sandbox.run_timeout_secs == 0 {
            return invalid("sandbox.run_timeout_secs must be greater than 0");
        }
        if self.agency.enabled && self.agency.prompts.is_empty() {
            return invalid("agency.prompts must not be empty when agency is enabled");
        }
        if self.core.request_timeout_secs == 0 {
            return invalid("core.request_timeout_secs must be greater than 0");
        }
        Ok(())
    }
}
