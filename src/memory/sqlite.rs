//! SQLite-backed [`LongTermMemory`] with keyword-overlap ranking.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, params};

use super::schema::apply_schema;
use super::{LongTermMemory, MemoryError, MemoryMetadata};

const DB_FILENAME: &str = "memory.db";
/// Most recent rows considered per recall.
const RECALL_SCAN_LIMIT: i64 = 2000;
const FRESHNESS_WEIGHT: f32 = 0.1;
const SECS_PER_DAY: f32 = 86_400.0;

/// Memory database at `{root}/memory.db`, serialized behind a mutex.
pub struct SqliteMemory {
    root: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteMemory {
    /// Open (or create) the database under `root_dir`.
    pub fn open(root_dir: &Path) -> Result<Self, MemoryError> {
        std::fs::create_dir_all(root_dir).map_err(|e| MemoryError::Io(e.to_string()))?;
        let conn = Connection::open(root_dir.join(DB_FILENAME))?;
        apply_schema(&conn)?;
        Ok(Self {
            root: root_dir.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of stored memories.
    pub fn len(&self) -> Result<usize, MemoryError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.conn
            .lock()
            .map_err(|e| MemoryError::Lock(e.to_string()))
    }
}

impl LongTermMemory for SqliteMemory {
    fn remember(&self, text: &str, metadata: MemoryMetadata) -> Result<(), MemoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.lock()?.execute(
            "INSERT INTO memories (id, text, source, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, text, metadata.source, metadata.timestamp],
        )?;
        tracing::debug!(id = %id, source = %metadata.source, "memory stored");
        Ok(())
    }

    fn recall(&self, query: &str, limit: usize) -> Result<Vec<String>, MemoryError> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT text, created_at FROM memories ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![RECALL_SCAN_LIMIT], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let now = chrono::Utc::now().timestamp();
        let mut scored = Vec::new();
        for row in rows {
            let (text, created_at) = row?;
            if let Some(score) = score(&text, created_at, &query_tokens, now) {
                scored.push((score, text));
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(_, text)| text).collect())
    }
}

/// Lowercased alphanumeric words longer than one character.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|word| word.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Share of query tokens found in `text` plus a small freshness bonus.
/// `None` when no query token matches.
fn score(text: &str, created_at: i64, query_tokens: &[String], now: i64) -> Option<f32> {
    let text_tokens: HashSet<String> = tokenize(text).into_iter().collect();
    let overlap = query_tokens
        .iter()
        .filter(|token| text_tokens.contains(*token))
        .count();
    if overlap == 0 {
        return None;
    }
    let mut score = overlap as f32 / query_tokens.len() as f32;
    if created_at > 0 && created_at <= now {
        let age_days = (now - created_at) as f32 / SECS_PER_DAY;
        score += FRESHNESS_WEIGHT / (1.0 + age_days);
    }
    Some(score)
}
