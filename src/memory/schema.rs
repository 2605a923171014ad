//! SQLite DDL for the memory store.

use rusqlite::Connection;

/// Idempotent schema.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS memories (
    id         TEXT PRIMARY KEY,
    text       TEXT NOT NULL,
    source     TEXT NOT NULL DEFAULT 'conversation',
    created_at INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at);
"#;

pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
