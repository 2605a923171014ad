//! Voice output: mute the Ears, synthesize, verify the artifact.

use super::reply::strip_markup;
use crate::protocol::mute_signal;
use crate::transport::Transport;
use crate::tts::{SpeechSynth, artifact_ready};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const MIN_MUTE_SECS: f64 = 3.0;
const CHARS_PER_SEC: f64 = 10.0;

/// Seconds the microphone stays muted while `text` is spoken.
pub fn mute_duration(text: &str) -> f64 {
    (text.chars().count() as f64 / CHARS_PER_SEC).max(MIN_MUTE_SECS)
}

/// Speak `text` and return the absolute path of the audio artifact on
/// success. Failures are logged only.
pub async fn speak(
    text: &str,
    tts: &dyn SpeechSynth,
    transport: &Transport,
    ears: SocketAddr,
    output: &Path,
) -> Option<PathBuf> {
    let clean = strip_markup(text);
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    let output = std::path::absolute(output).unwrap_or_else(|_| output.to_path_buf());
    if output.exists()
        && let Err(e) = std::fs::remove_file(&output)
    {
        tracing::warn!(error = %e, "could not remove previous audio");
    }
    if let Some(parent) = output.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        tracing::warn!(dir = %parent.display(), error = %e, "could not create audio directory");
    }

    let seconds = mute_duration(clean);
    if let Err(e) = transport.send_text(&mute_signal(seconds), ears).await {
        tracing::debug!(error = %e, "ears not reachable");
    }
    tracing::debug!(seconds, "ears muted");

    if tts.synthesize(clean, &output).await && artifact_ready(&output) {
        Some(output)
    } else {
        tracing::warn!("audio generation failed or produced an empty file");
        None
    }
}
