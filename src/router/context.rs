//! Context assembly: enrich a turn with vision, memory and web search, then
//! build the structured Core request.

use super::Collaborators;
use super::history::History;
use crate::config::RouterConfig;
use crate::memory::format_recalled;
use crate::protocol::CoreRequest;
use crate::vision::BLIND_NOTE;

/// Whether any trigger occurs in `text` (case-insensitive substring).
pub fn has_intent(text: &str, triggers: &[String]) -> bool {
    let lower = text.to_lowercase();
    triggers.iter().any(|t| lower.contains(t.as_str()))
}

/// Limits for one round of enrichment.
#[derive(Debug, Clone, Copy)]
pub struct EnrichLimits {
    pub recall: usize,
    pub search_results: usize,
}

/// Concatenated context blocks for `text`; empty when nothing applies.
/// Collaborator failures contribute nothing.
pub async fn gather(
    text: &str,
    settings: &RouterConfig,
    collaborators: &Collaborators,
    limits: EnrichLimits,
) -> String {
    let mut blocks = Vec::new();

    if has_intent(text, &settings.vision_triggers) {
        if collaborators.vision.available() {
            tracing::info!("vision requested");
            blocks.push(collaborators.vision.analyze(text).await);
        } else {
            blocks.push(BLIND_NOTE.to_owned());
        }
    }

    match collaborators.memory.recall(text, limits.recall) {
        Ok(snippets) if !snippets.is_empty() => blocks.push(format_recalled(&snippets)),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "memory recall failed"),
    }

    if has_intent(text, &settings.search_triggers) {
        tracing::info!("searching the web");
        if let Some(results) = collaborators
            .search
            .search(text, limits.search_results)
            .await
        {
            blocks.push(format!("[SYSTEM_NOTE: Real-time search data]\n{results}"));
        }
    }

    blocks
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Structured request: identity, rolling history, context-prefixed input.
pub fn build_request(system: &str, history: &History, context: &str, text: &str) -> CoreRequest {
    let user = if context.is_empty() {
        text.to_owned()
    } else {
        format!("{context}\n\n{text}")
    };
    CoreRequest {
        system: system.to_owned(),
        history: history.to_messages(),
        user,
    }
}
