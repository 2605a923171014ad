//! Error types for the Lilith router and logic core.

/// Top-level error type shared by the Face, the Logic Core and their
/// collaborators.
#[derive(Debug, thiserror::Error)]
pub enum LilithError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// UDP transport error (bind, send, receive).
    #[error("transport error: {0}")]
    Transport(String),

    /// Long-term memory storage error.
    #[error("memory error: {0}")]
    Memory(#[from] crate::memory::MemoryError),

    /// File sandbox error.
    #[error("sandbox error: {0}")]
    Sandbox(#[from] crate::sandbox::SandboxError),

    /// Logic Core backend error.
    #[error("core error: {0}")]
    Core(String),

    /// Text-to-speech error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Screen capture or vision model error.
    #[error("vision error: {0}")]
    Vision(String),

    /// Web search error.
    #[error("search error: {0}")]
    Search(#[from] lilith_search::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LilithError>;
