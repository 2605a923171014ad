//! Search configuration with sensible defaults.

use crate::error::SearchError;

/// HTML-only DuckDuckGo endpoint (no JavaScript required).
pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Configuration for a web search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Search endpoint the query form is POSTed to.
    pub endpoint: String,
    /// Maximum number of results to return.
    pub max_results: usize,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to request safe search filtering.
    pub safe_search: bool,
    /// How long to cache results in seconds. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DUCKDUCKGO_HTML_ENDPOINT.to_owned(),
            max_results: 3,
            timeout_seconds: 8,
            safe_search: true,
            cache_ttl_seconds: 600,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SearchError::Config("endpoint must not be empty".into()));
        }
        Ok(())
    }
}
