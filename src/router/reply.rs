//! Reply post-processing: offline fallback, anti-echo and sanity fixes.

use crate::protocol::{BODY_MARKER, CORE_ERROR_PREFIX};

pub const ECHO_FILLER: &str = "I am listening.";
/// Used when the input itself was [`ECHO_FILLER`].
pub const ECHO_FILLER_ALT: &str = "Go on, I'm here.";
pub const SELF_ANNOUNCEMENT_FALLBACK: &str = "I am ready.";
pub const TOO_SHORT_PLACEHOLDER: &str = "...";

/// What post-processing changed, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// The Core call failed; the reply is an in-character offline notice.
    CoreOffline,
    /// The reply repeated the input.
    Echo,
    /// The reply contained the Body announcement marker.
    SelfAnnouncement,
    /// The reply was shorter than the minimum.
    TooShort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub correction: Option<Correction>,
}

/// Turn a raw Core reply into the text that is delivered.
pub fn postprocess(raw: &str, input: &str, min_chars: usize) -> Reply {
    let fixed = |text: &str, correction| Reply {
        text: text.to_owned(),
        correction: Some(correction),
    };

    if raw.trim_start().starts_with(CORE_ERROR_PREFIX) {
        return fixed(
            &format!("My brain is offline. ({})", raw.trim()),
            Correction::CoreOffline,
        );
    }

    let normalized = raw.trim().to_lowercase();
    if !input.trim().is_empty() && normalized == input.trim().to_lowercase() {
        tracing::warn!("blocked echoed reply");
        let filler = if ECHO_FILLER.to_lowercase() == normalized {
            ECHO_FILLER_ALT
        } else {
            ECHO_FILLER
        };
        return fixed(filler, Correction::Echo);
    }
    if normalized.contains(BODY_MARKER) {
        tracing::warn!("blocked self-announcement in reply");
        return fixed(SELF_ANNOUNCEMENT_FALLBACK, Correction::SelfAnnouncement);
    }
    if raw.trim().chars().count() < min_chars {
        return fixed(TOO_SHORT_PLACEHOLDER, Correction::TooShort);
    }

    Reply {
        text: raw.trim().to_owned(),
        correction: None,
    }
}

/// Remove inline `<...>` markup (e.g. `<SASS>`) before speaking.
/// An unterminated `<` is kept as text.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}
