//! Lilith: the SYNZ desktop companion's dialogue router ("Face") and
//! language-model server ("Logic Core").
//!
//! The processes talk over loopback UDP, one UTF-8 message per datagram:
//!
//! ```text
//! Ears (STT) ─┐                      ┌─> Logic Core (LLM)
//! chat client ─┼─> Face (router) ────┤
//! Body (Unity)┘        │             └─< code watcher events
//!                      ├─> TTS ──> [AUDIO] <path>
//!                      └─> memory / search / vision
//! ```
//!
//! - [`router`]: classification, context assembly, reply post-processing,
//!   feedback, voice fan-out and proactive check-ins.
//! - [`logic_core`]: the Logic Core server and its code watcher.
//! - [`sandbox`], [`memory`], [`search`], [`vision`], [`tts`]: the router's
//!   collaborators, each with a neutral fallback.

pub mod config;
pub mod dirs;
pub mod error;
pub mod logging;
pub mod logic_core;
pub mod memory;
pub mod openai;
pub mod process;
pub mod protocol;
pub mod router;
pub mod sandbox;
pub mod search;
pub mod transport;
pub mod tts;
pub mod vision;

pub use config::LilithConfig;
pub use error::{LilithError, Result};
pub use router::{Collaborators, Router};
pub use transport::Transport;
