//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Mapsweep state database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per query identity
CREATE TABLE IF NOT EXISTS crawl_states (
    identity TEXT PRIMARY KEY,
    raw_query TEXT NOT NULL,
    processed_count INTEGER NOT NULL DEFAULT 0,
    total_estimate INTEGER,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Captured items; seq preserves discovery order
CREATE TABLE IF NOT EXISTS crawl_items (
    identity TEXT NOT NULL REFERENCES crawl_states(identity) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    name TEXT,
    phone TEXT,
    address TEXT,
    website TEXT,
    hours TEXT,
    PRIMARY KEY (identity, seq)
);

-- Track crawl attempts (kept after a state is cleared)
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    outcome TEXT NOT NULL,
    items_captured INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_runs_identity ON runs(identity);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
