//! File sandbox ("hands"): read, write and run files confined to one root.
//!
//! Paths are resolved against the root, normalised lexically and then
//! checked again after resolving symlinks on the longest existing prefix,
//! so neither `..` nor a symlink can reach outside the root.

use crate::config::SandboxConfig;
use crate::process;
use crate::transport::truncate_chars;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Sandbox refusal or failure. Display strings are user-facing and the
/// router prefixes them with `[ERR] `.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Access Denied: {0} is outside the sandbox.")]
    OutsideRoot(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Read Failed: {0}")]
    Read(String),

    #[error("Write Failed: {0}")]
    Write(String),

    #[error("sandbox root unavailable: {0}")]
    Root(#[from] std::io::Error),
}

/// Output of `run`: text starting with `[OK]` or `[FAIL]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub text: String,
}

impl RunOutcome {
    fn ok(output: &str) -> Self {
        Self {
            success: true,
            text: format!("[OK]\n{output}"),
        }
    }

    fn fail(reason: &str, output: &str) -> Self {
        let text = if output.is_empty() {
            format!("[FAIL] {reason}")
        } else {
            format!("[FAIL] {reason}\n{output}")
        };
        Self {
            success: false,
            text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    run_timeout: Duration,
    max_output_chars: usize,
    python: String,
}

impl Sandbox {
    /// Open the sandbox at `config.root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Root`] if the root cannot be created or
    /// resolved.
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        std::fs::create_dir_all(&config.root)?;
        let root = std::fs::canonicalize(&config.root)?;
        tracing::info!(root = %root.display(), "sandbox ready");
        Ok(Self {
            root,
            run_timeout: Duration::from_secs(config.run_timeout_secs),
            max_output_chars: config.max_output_chars,
            python: config.python.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for `path` if it stays inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::OutsideRoot`] otherwise.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let denied = || SandboxError::OutsideRoot(path.to_owned());
        let candidate = normalize(&self.root.join(path));
        if !candidate.starts_with(&self.root) {
            return Err(denied());
        }
        if !canonical_prefix(&candidate).starts_with(&self.root) {
            return Err(denied());
        }
        Ok(candidate)
    }

    /// Read a whole UTF-8 file.
    pub fn read(&self, path: &str) -> Result<String, SandboxError> {
        let abs = self.resolve(path)?;
        if !abs.exists() {
            return Err(SandboxError::NotFound(path.to_owned()));
        }
        std::fs::read_to_string(&abs).map_err(|e| SandboxError::Read(e.to_string()))
    }

    /// Write `content`, first copying an existing file to
    /// `<file>.<unix-seconds>.bak` (`<unix-seconds>-<n>` when that name is
    /// taken). Returns a `[SUCCESS] ...` status line.
    pub fn write(&self, path: &str, content: &str) -> Result<String, SandboxError> {
        let abs = self.resolve(path)?;
        let write_err = |e: std::io::Error| SandboxError::Write(e.to_string());

        let note = if abs.is_file() {
            let backup = free_backup_path(&abs, chrono::Utc::now().timestamp());
            std::fs::copy(&abs, &backup).map_err(write_err)?;
            format!("(Backup saved to {})", file_name(&backup))
        } else {
            "(New file created)".to_owned()
        };

        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&abs, content).map_err(write_err)?;
        tracing::info!(path = %abs.display(), bytes = content.len(), "sandbox write");

        Ok(format!(
            "[SUCCESS] Wrote {} bytes to {}. {note}",
            content.len(),
            file_name(&abs)
        ))
    }

    /// Execute a file inside the root: `.py` through the configured Python,
    /// `.sh` through `sh`, anything else directly. Runs with the root as the
    /// working directory.
    ///
    /// # Errors
    ///
    /// Only [`SandboxError::OutsideRoot`]; every other failure is a
    /// `[FAIL]` outcome.
    pub async fn run(&self, path: &str) -> Result<RunOutcome, SandboxError> {
        let abs = self.resolve(path)?;
        if !abs.is_file() {
            return Ok(RunOutcome::fail(&format!("File not found: {path}"), ""));
        }

        let target = abs.as_os_str().to_owned();
        let (program, args): (OsString, Vec<OsString>) = match abs.extension().and_then(|e| e.to_str()) {
            Some("py") => (self.python.clone().into(), vec![target]),
            Some("sh") => ("sh".into(), vec![target]),
            _ => (target, Vec::new()),
        };

        tracing::info!(path = %abs.display(), "sandbox run");
        let output = match process::run(&program, &args, Some(&self.root), self.run_timeout).await
        {
            Ok(output) => output,
            Err(e) => return Ok(RunOutcome::fail(&format!("could not start: {e}"), "")),
        };

        let combined = output.combined();
        let text = truncate_chars(combined.trim_end(), self.max_output_chars);
        Ok(if output.success {
            RunOutcome::ok(text)
        } else if output.timed_out {
            RunOutcome::fail(&output.stderr, "")
        } else {
            let code = output
                .code
                .map_or_else(|| "signal".to_owned(), |c| c.to_string());
            RunOutcome::fail(&format!("(exit code {code})"), text)
        })
    }
}

/// Remove `.` and resolve `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor and re-append the rest.
fn canonical_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            let mut out = canonical;
            for part in rest.iter().rev() {
                out.push(part);
            }
            return out;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_owned());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn backup_path(abs: &Path, unix_seconds: i64, attempt: u32) -> PathBuf {
    let mut name = abs.as_os_str().to_owned();
    if attempt == 0 {
        name.push(format!(".{unix_seconds}.bak"));
    } else {
        name.push(format!(".{unix_seconds}-{attempt}.bak"));
    }
    PathBuf::from(name)
}

/// First backup name for this second that does not exist yet.
fn free_backup_path(abs: &Path, unix_seconds: i64) -> PathBuf {
    let mut attempt = 0;
    loop {
        let candidate = backup_path(abs, unix_seconds, attempt);
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
