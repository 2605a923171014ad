//! Long-term memory: conversation snippets recalled by relevance.
//!
//! The router only calls [`LongTermMemory::remember`] after a user turn and
//! [`LongTermMemory::recall`] while assembling context. Ranking lives in the
//! store; the router treats recalled text as advisory context.

mod schema;
mod sqlite;

pub use sqlite::SqliteMemory;

use crate::config::MemoryConfig;

/// Memory store failure.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

/// Where a memory came from and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMetadata {
    pub source: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl MemoryMetadata {
    /// Metadata stamped with the current time.
    pub fn now(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Append-only store of past exchanges.
pub trait LongTermMemory: Send + Sync {
    /// Store `text`.
    fn remember(&self, text: &str, metadata: MemoryMetadata) -> Result<(), MemoryError>;

    /// Up to `limit` stored snippets relevant to `query`, best first.
    fn recall(&self, query: &str, limit: usize) -> Result<Vec<String>, MemoryError>;
}

/// Store used when memory is disabled or unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemory;

impl LongTermMemory for NoMemory {
    fn remember(&self, _text: &str, _metadata: MemoryMetadata) -> Result<(), MemoryError> {
        Ok(())
    }

    fn recall(&self, _query: &str, _limit: usize) -> Result<Vec<String>, MemoryError> {
        Ok(Vec::new())
    }
}

/// Open the configured store, falling back to [`NoMemory`].
pub fn from_config(config: &MemoryConfig) -> Box<dyn LongTermMemory> {
    if !config.enabled {
        tracing::info!("long-term memory disabled");
        return Box::new(NoMemory);
    }
    match SqliteMemory::open(&config.root_dir) {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "memory store unavailable, continuing without it");
            Box::new(NoMemory)
        }
    }
}

/// Render recalled snippets as a labelled context block; empty for none.
pub fn format_recalled(snippets: &[String]) -> String {
    if snippets.is_empty() {
        return String::new();
    }
    let mut block = String::from("### RECALLED MEMORIES ###\n");
    for snippet in snippets {
        block.push_str("- ");
        block.push_str(snippet);
        block.push('\n');
    }
    block
}
