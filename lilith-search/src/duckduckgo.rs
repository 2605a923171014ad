//! DuckDuckGo HTML scraper.
//!
//! POSTs the query form to the HTML-only endpoint and reads result blocks
//! with CSS selectors. Ads are skipped and `uddg` redirect links unwrapped.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::SearchResult;
use scraper::{Html, Selector};
use url::Url;

/// Run a single query against the configured endpoint.
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>, SearchError> {
    tracing::trace!(query, "DuckDuckGo search");

    let client = http::build_client(config)?;

    let mut params = vec![("q", query)];
    if config.safe_search {
        params.push(("kp", "1"));
    }

    let html = client
        .post(&config.endpoint)
        .form(&params)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| SearchError::Http(format!("request failed: {e}")))?
        .error_for_status()
        .map_err(|e| SearchError::Http(format!("bad status: {e}")))?
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("response read failed: {e}")))?;

    parse_results(&html, config.max_results)
}

/// Parse a DuckDuckGo HTML results page.
pub fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);
    let block_sel = selector(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();
    for block in document.select(&block_sel) {
        if results.len() >= max_results {
            break;
        }
        let Some(anchor) = block.select(&title_sel).next() else {
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_owned();
        if title.is_empty() {
            continue;
        }
        let Some(url) = anchor.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };
        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_owned())
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
    }

    tracing::debug!(count = results.len(), "DuckDuckGo results parsed");
    Ok(results)
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css}: {e:?}")))
}

/// `//duckduckgo.com/l/?uddg=<encoded>&rut=...` becomes the decoded target.
fn unwrap_redirect(href: &str) -> Option<String> {
    let full = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_owned()
    };
    let parsed = Url::parse(&full).ok()?;
    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
    } else {
        Some(full)
    }
}
