//! Error types for the lilith-search crate.
//!
//! Messages are stable strings suitable for logs; query text never appears
//! in them.

/// Errors that can occur during a web search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The HTTP request to the search engine failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The engine's HTML could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for lilith-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
