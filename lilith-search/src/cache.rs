//! Short-lived in-memory cache of search results.
//!
//! Keyed by the normalised query, the endpoint and the result limit. The
//! TTL is fixed by whichever call initialises the cache first.

use std::sync::OnceLock;
use std::time::Duration;

use moka::future::Cache;

use crate::config::SearchConfig;
use crate::types::SearchResult;

const MAX_CACHE_ENTRIES: u64 = 64;

static CACHE: OnceLock<Cache<CacheKey, Vec<SearchResult>>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    endpoint: String,
    max_results: usize,
}

impl CacheKey {
    /// Lowercases and trims the query so trivially different phrasings share
    /// an entry.
    pub fn new(query: &str, config: &SearchConfig) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            endpoint: config.endpoint.clone(),
            max_results: config.max_results,
        }
    }
}

fn cache(ttl_seconds: u64) -> &'static Cache<CacheKey, Vec<SearchResult>> {
    CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build()
    })
}

pub async fn get(key: &CacheKey, ttl_seconds: u64) -> Option<Vec<SearchResult>> {
    cache(ttl_seconds).get(key).await
}

pub async fn insert(key: CacheKey, results: Vec<SearchResult>, ttl_seconds: u64) {
    cache(ttl_seconds).insert(key, results).await;
}
