//! Polls a source directory and reports files whose modification time
//! changed since the previous scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug)]
pub struct CodeWatcher {
    dir: PathBuf,
    extensions: Vec<String>,
    stamps: HashMap<PathBuf, SystemTime>,
}

impl CodeWatcher {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            stamps: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Changed files and their contents, sorted by path. A file seen for
    /// the first time only records its baseline.
    pub fn scan(&mut self) -> Vec<(PathBuf, String)> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !self.watches(&path) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            match self.stamps.insert(path.clone(), modified) {
                Some(previous) if previous != modified => match std::fs::read_to_string(&path) {
                    Ok(code) => changed.push((path, code)),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "unreadable source"),
                },
                _ => {}
            }
        }
        changed.sort_by(|a, b| a.0.cmp(&b.0));
        changed
    }

    fn watches(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.extensions.iter().any(|w| w.eq_ignore_ascii_case(e)))
    }
}

/// Prompt asking the model to review changed code.
pub fn review_prompt(code: &str) -> String {
    format!("REVIEW THIS CODE:\n{code}\nIdentify any bugs briefly.")
}

/// Event forwarded to the Face with the model's review.
pub fn review_event(feedback: &str) -> String {
    format!("[SYSTEM_EVENT: Code Watcher]: {feedback}")
}
