//! Tails an editor log and surfaces new output that looks like a failure.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LogWatcher {
    path: PathBuf,
    keywords: Vec<String>,
    offset: u64,
}

impl LogWatcher {
    /// Start at the current end of `path`; a missing file starts at zero.
    pub fn new(path: impl Into<PathBuf>, keywords: &[String]) -> Self {
        let path = path.into();
        let offset = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            keywords: keywords.to_vec(),
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Text appended since the previous call. A file that shrank was
    /// replaced, so it is read again from the start.
    pub fn read_new(&mut self) -> Option<String> {
        let len = std::fs::metadata(&self.path).ok()?.len();
        if len < self.offset {
            tracing::debug!(path = %self.path.display(), "log truncated, rereading");
            self.offset = 0;
        }
        if len == self.offset {
            return None;
        }

        let mut file = File::open(&self.path).ok()?;
        file.seek(SeekFrom::Start(self.offset)).ok()?;
        let mut bytes = Vec::new();
        if let Err(e) = file.take(len - self.offset).read_to_end(&mut bytes) {
            tracing::warn!(path = %self.path.display(), error = %e, "log read failed");
            return None;
        }
        self.offset += bytes.len() as u64;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// New log text, but only when it mentions one of the keywords.
    pub fn poll(&mut self) -> Option<String> {
        let fresh = self.read_new()?;
        is_alarming(&fresh, &self.keywords).then_some(fresh)
    }
}

/// Case-sensitive keyword match, so `error` in prose does not fire.
pub fn is_alarming(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str()))
}

/// Prompt asking the model to react to fresh errors.
pub fn error_prompt(logs: &str) -> String {
    format!("System Error:\n{logs}")
}

/// Event forwarded to the Face with the model's reaction.
pub fn error_event(reaction: &str) -> String {
    format!("[SYSTEM_EVENT: Log Watcher]: {reaction}")
}
