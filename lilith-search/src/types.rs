//! Search result type.

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Title of the result page.
    pub title: String,
    /// Destination URL (redirect wrappers already removed).
    pub url: String,
    /// Text snippet summarising the page.
    pub snippet: String,
}
