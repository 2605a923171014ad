//! `!good` / `!bad` reinforcement of the last exchange.

use crate::protocol::Verdict;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REINFORCED: &str = "[SYSTEM] Memory Reinforced. Good girl/boy protocol executed.";
pub const NOTHING_TO_REINFORCE: &str = "[SYSTEM] No memory to reinforce!";
pub const DISCARDED: &str = "[SYSTEM] Memory Discarded. I'll do better next time... baka.";

/// The most recently completed user exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackState {
    pub last_user_input: String,
    pub last_agent_response: String,
}

impl FeedbackState {
    pub fn record(&mut self, input: &str, response: &str) {
        self.last_user_input = input.to_owned();
        self.last_agent_response = response.to_owned();
    }

    pub fn is_complete(&self) -> bool {
        !self.last_user_input.is_empty() && !self.last_agent_response.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_user_input.clear();
        self.last_agent_response.clear();
    }
}

/// Append-only file of reinforced exchanges.
#[derive(Debug, Clone)]
pub struct TrainingLog {
    path: PathBuf,
}

impl TrainingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `\nUser: <input>\nSYNZ: <response>\n`.
    pub fn append(&self, input: &str, response: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write!(file, "\nUser: {input}\nSYNZ: {response}\n")
    }
}

/// Apply a verdict and return the reply for the sender. The state is
/// consumed: after either verdict there is nothing left to reinforce.
pub fn apply(verdict: Verdict, state: &mut FeedbackState, log: &TrainingLog) -> String {
    match verdict {
        Verdict::Good if !state.is_complete() => NOTHING_TO_REINFORCE.to_owned(),
        Verdict::Good => {
            match log.append(&state.last_user_input, &state.last_agent_response) {
                Ok(()) => {
                    tracing::info!(path = %log.path().display(), "exchange reinforced");
                    state.clear();
                    REINFORCED.to_owned()
                }
                Err(e) => {
                    tracing::error!(error = %e, "training log write failed");
                    format!("[ERR] Training log unavailable: {e}")
                }
            }
        }
        Verdict::Bad => {
            state.clear();
            DISCARDED.to_owned()
        }
    }
}
