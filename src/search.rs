//! Web search enrichment for the router.

use crate::config::WebSearchConfig;
use async_trait::async_trait;
use lilith_search::SearchResult;

/// Search collaborator: a formatted context block, or `None` when nothing
/// usable came back.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Option<String>;
}

/// Live DuckDuckGo search through `lilith-search`.
pub struct LiveSearch {
    config: lilith_search::SearchConfig,
}

impl LiveSearch {
    pub fn new(config: &WebSearchConfig) -> Self {
        Self {
            config: config.to_engine_config(),
        }
    }
}

#[async_trait]
impl WebSearch for LiveSearch {
    async fn search(&self, query: &str, max_results: usize) -> Option<String> {
        let config = lilith_search::SearchConfig {
            max_results: max_results.max(1),
            ..self.config.clone()
        };
        match lilith_search::search(query, &config).await {
            Ok(results) if results.is_empty() => {
                tracing::debug!("web search returned no results");
                None
            }
            Ok(results) => Some(format_results(&results)),
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                None
            }
        }
    }
}

/// Used when search is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSearch;

#[async_trait]
impl WebSearch for NoSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Option<String> {
        None
    }
}

pub fn from_config(config: &WebSearchConfig) -> Box<dyn WebSearch> {
    if config.enabled {
        Box::new(LiveSearch::new(config))
    } else {
        tracing::info!("web search disabled");
        Box::new(NoSearch)
    }
}

/// `### search results ###` block with numbered sources.
pub fn format_results(results: &[SearchResult]) -> String {
    let mut block = String::from("### search results ###\n");
    for (i, result) in results.iter().enumerate() {
        block.push_str(&format!(
            "Source {}: {}\nURL: {}\nContent: {}\n\n",
            i + 1,
            result.title,
            result.url,
            result.snippet
        ));
    }
    block
}
