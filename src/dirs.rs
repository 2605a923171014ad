//! Filesystem locations used by the Lilith binaries.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | Linux | macOS |
//! |---------|-------|-------|
//! | Data | `~/.local/share/lilith/` | `~/Library/Application Support/lilith/` |
//! | Config | `~/.config/lilith/` | `~/Library/Application Support/lilith/` |
//!
//! `LILITH_DATA_DIR` and `LILITH_CONFIG_DIR` override the two roots.

use std::path::PathBuf;

/// Persistent data root: memory database, training log, logs, audio.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("LILITH_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("lilith"))
        .unwrap_or_else(|| PathBuf::from("/tmp/lilith-data"))
}

/// Configuration root holding `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("LILITH_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("lilith"))
        .unwrap_or_else(|| PathBuf::from("/tmp/lilith-config"))
}

/// Default configuration file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Long-term memory root (`data_dir()/memory/`).
#[must_use]
pub fn memory_dir() -> PathBuf {
    data_dir().join("memory")
}

/// Reinforcement training log (`data_dir()/training_data.txt`).
#[must_use]
pub fn training_log() -> PathBuf {
    data_dir().join("training_data.txt")
}

/// Where synthesized speech is written (`data_dir()/response.mp3`).
#[must_use]
pub fn audio_output() -> PathBuf {
    data_dir().join("response.mp3")
}
