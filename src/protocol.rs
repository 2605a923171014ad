//! Wire vocabulary of the Face: inbound message grammar, outbound signals
//! and the Face → Logic Core request envelope.

use serde::{Deserialize, Serialize};

/// Case-insensitive marker a Body (avatar client) sends to register itself.
pub const BODY_MARKER: &str = "unity connected";
/// Acknowledgement for a Body announcement.
pub const ACK: &str = "ACK";
/// Prefix of internal events that must never be treated as user turns.
pub const SYSTEM_EVENT_PREFIX: &str = "[SYSTEM_EVENT";
/// Prefix of a failed Core call in place of a reply.
pub const CORE_ERROR_PREFIX: &str = "<ERROR";
/// Prefix of the voice artifact signal.
pub const AUDIO_PREFIX: &str = "[AUDIO]";
/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM: usize = 65_507;

/// One classified inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A Body registering its address.
    BodyAnnouncement,
    /// `!good` or `!bad`.
    Feedback(Verdict),
    /// `!read <path>`.
    Read(String),
    /// `!write <path>|<content>`.
    Write { path: String, content: String },
    /// `!write` without a pipe separator.
    MalformedWrite,
    /// `!run <path>`.
    Run(String),
    /// Text starting with `[SYSTEM_EVENT`.
    SystemEvent(String),
    /// Anything else.
    Chat(String),
}

/// Reinforcement verdict on the last exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
}

/// Classify trimmed packet text. First match wins.
pub fn parse_inbound(text: &str) -> Inbound {
    let text = text.trim();
    if text.to_lowercase().contains(BODY_MARKER) {
        return Inbound::BodyAnnouncement;
    }
    match text {
        "!good" => return Inbound::Feedback(Verdict::Good),
        "!bad" => return Inbound::Feedback(Verdict::Bad),
        _ => {}
    }
    if let Some(path) = text.strip_prefix("!read ") {
        return Inbound::Read(path.trim().to_owned());
    }
    if let Some(rest) = text.strip_prefix("!write ") {
        return match rest.split_once('|') {
            Some((path, content)) => Inbound::Write {
                path: path.trim().to_owned(),
                content: content.to_owned(),
            },
            None => Inbound::MalformedWrite,
        };
    }
    if let Some(path) = text.strip_prefix("!run ") {
        return Inbound::Run(path.trim().to_owned());
    }
    if text.starts_with(SYSTEM_EVENT_PREFIX) {
        return Inbound::SystemEvent(text.to_owned());
    }
    Inbound::Chat(text.to_owned())
}

/// `[AUDIO] <absolute path>`
pub fn audio_signal(path: &std::path::Path) -> String {
    format!("{AUDIO_PREFIX} {}", path.display())
}

/// `MUTE <seconds>` for the Ears process.
pub fn mute_signal(seconds: f64) -> String {
    format!("MUTE {seconds:.1}")
}

/// Role of a history message in a Core request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior message in a Core request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Structured request from the Face to the Logic Core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreRequest {
    pub system: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub user: String,
}

impl CoreRequest {
    /// JSON envelope sent over UDP.
    pub fn to_wire(&self) -> String {
        // A struct of strings always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| self.flatten())
    }

    /// Plain-text rendering for Cores that only take a prompt string.
    pub fn flatten(&self) -> String {
        let mut out = String::with_capacity(self.system.len() + self.user.len() + 64);
        out.push_str(&self.system);
        out.push_str("\n\n");
        for message in &self.history {
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "SYNZ",
            };
            out.push_str(speaker);
            out.push_str(": ");
            out.push_str(&message.content);
            out.push('\n');
        }
        out.push_str("User: ");
        out.push_str(&self.user);
        out.push_str("\nSYNZ:");
        out
    }

    /// Read a request as the Core receives it: a JSON envelope, or any
    /// other text taken as a lone user message.
    pub fn parse_wire(payload: &str) -> Self {
        serde_json::from_str(payload).unwrap_or_else(|_| Self {
            system: String::new(),
            history: Vec::new(),
            user: payload.to_owned(),
        })
    }
}
