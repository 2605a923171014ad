//! # lilith-search
//!
//! Embedded web search for the Lilith dialogue router.
//!
//! Scrapes the HTML-only DuckDuckGo endpoint directly, so there are no API
//! keys and nothing for the user to configure. Results for a query are
//! cached in memory for a short TTL because the router tends to see the
//! same question asked twice in a row ("what is the weather" → "what is the
//! weather now").
//!
//! Search queries are logged only at trace level.

pub mod cache;
pub mod config;
pub mod duckduckgo;
pub mod error;
pub mod http;
pub mod types;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use types::SearchResult;

/// Search the web for `query`.
///
/// Returns up to `config.max_results` results. A cached result set is
/// returned when the same query was made within `config.cache_ttl_seconds`.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid configuration, and
/// [`SearchError::Http`] / [`SearchError::Parse`] when the engine cannot be
/// reached or its response cannot be read.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> lilith_search::Result<()> {
/// let config = lilith_search::SearchConfig::default();
/// let results = lilith_search::search("rust programming", &config).await?;
/// for result in &results {
///     println!("{}: {}", result.title, result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    config.validate()?;
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let key = cache::CacheKey::new(query, config);
    if config.cache_ttl_seconds > 0
        && let Some(hit) = cache::get(&key, config.cache_ttl_seconds).await
    {
        tracing::trace!(count = hit.len(), "search cache hit");
        return Ok(hit);
    }

    let results = duckduckgo::search(query, config).await?;

    if config.cache_ttl_seconds > 0 && !results.is_empty() {
        cache::insert(key, results.clone(), config.cache_ttl_seconds).await;
    }
    Ok(results)
}
