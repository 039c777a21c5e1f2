//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.

use crate::query::{QueryIdentity, ResolvedQuery};
use crate::state::{CrawlItem, CrawlState, RunOutcome};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use crate::storage::{Checkpoint, RunRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite state store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL keeps each committed checkpoint intact across process interruption
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_items(&self, identity: &str) -> StorageResult<Vec<CrawlItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, phone, address, website, hours FROM crawl_items
             WHERE identity = ?1 ORDER BY seq",
        )?;

        let items = stmt
            .query_map(params![identity], |row| {
                Ok(CrawlItem {
                    name: row.get(0)?,
                    phone: row.get(1)?,
                    address: row.get(2)?,
                    website: row.get(3)?,
                    hours: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        identity: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        outcome: RunOutcome::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunOutcome::Failed),
        items_captured: row.get::<_, i64>(6)? as u64,
    })
}

impl StateStore for SqliteStore {
    // ===== Crawl State =====

    fn load(&self, identity: &QueryIdentity) -> StorageResult<Option<CrawlState>> {
        let header = self
            .conn
            .query_row(
                "SELECT raw_query, processed_count, total_estimate, completed, updated_at
                 FROM crawl_states WHERE identity = ?1",
                params![identity.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((raw_query, processed_count, total_estimate, completed, updated_at)) = header
        else {
            return Ok(None);
        };

        if processed_count < 0 {
            return Err(StorageError::Corrupt {
                identity: identity.to_string(),
                message: format!("negative processed_count {}", processed_count),
            });
        }

        let items = self.load_items(identity.as_str())?;

        Ok(Some(CrawlState {
            identity: identity.clone(),
            raw_query,
            items,
            processed_count: processed_count as u64,
            total_estimate: total_estimate.map(|t| t.max(0) as u64),
            completed,
            updated_at,
        }))
    }

    fn checkpoint(&mut self, query: &ResolvedQuery, checkpoint: &Checkpoint) -> StorageResult<()> {
        let identity = query.identity.as_str();
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO crawl_states (identity, raw_query, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(identity) DO NOTHING",
            params![identity, query.raw, now],
        )?;

        if checkpoint.supersede {
            tx.execute(
                "DELETE FROM crawl_items WHERE identity = ?1",
                params![identity],
            )?;
            tx.execute(
                "UPDATE crawl_states SET completed = 0 WHERE identity = ?1",
                params![identity],
            )?;
        }

        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM crawl_items WHERE identity = ?1",
            params![identity],
            |row| row.get(0),
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO crawl_items (identity, seq, name, phone, address, website, hours)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (offset, item) in checkpoint.items.iter().enumerate() {
                stmt.execute(params![
                    identity,
                    next_seq + offset as i64,
                    item.name,
                    item.phone,
                    item.address,
                    item.website,
                    item.hours,
                ])?;
            }
        }

        tx.execute(
            "UPDATE crawl_states
             SET processed_count = ?2,
                 total_estimate = COALESCE(?3, total_estimate),
                 updated_at = ?4
             WHERE identity = ?1",
            params![
                identity,
                checkpoint.processed_count as i64,
                checkpoint.total_estimate.map(|t| t as i64),
                now,
            ],
        )?;

        tx.commit()?;

        tracing::debug!(
            "Checkpoint for {}: +{} items, cursor {}",
            identity,
            checkpoint.items.len(),
            checkpoint.processed_count
        );

        Ok(())
    }

    fn mark_completed(&mut self, identity: &QueryIdentity) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_states SET completed = 1, updated_at = ?2 WHERE identity = ?1",
            params![identity.as_str(), Utc::now().to_rfc3339()],
        )?;

        if updated == 0 {
            return Err(StorageError::StateNotFound(identity.to_string()));
        }

        Ok(())
    }

    fn clear(&mut self, identity: &QueryIdentity) -> StorageResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM crawl_items WHERE identity = ?1",
            params![identity.as_str()],
        )?;
        let deleted = tx.execute(
            "DELETE FROM crawl_states WHERE identity = ?1",
            params![identity.as_str()],
        )?;
        tx.commit()?;

        Ok(deleted > 0)
    }

    fn list_all(&self) -> StorageResult<Vec<(QueryIdentity, CrawlState)>> {
        let identities = {
            let mut stmt = self
                .conn
                .prepare("SELECT identity FROM crawl_states ORDER BY identity")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut states = Vec::with_capacity(identities.len());
        for identity in identities {
            let identity = QueryIdentity::from_stored(identity);
            if let Some(state) = self.load(&identity)? {
                states.push((identity, state));
            }
        }

        Ok(states)
    }

    // ===== Run Tracking =====

    fn start_run(&mut self, identity: &QueryIdentity, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (identity, started_at, config_hash, outcome) VALUES (?1, ?2, ?3, ?4)",
            params![
                identity.as_str(),
                now,
                config_hash,
                RunOutcome::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        outcome: RunOutcome,
        items_captured: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET outcome = ?1, finished_at = ?2, items_captured = ?3 WHERE id = ?4",
            params![outcome.to_db_string(), now, items_captured as i64, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }

        Ok(())
    }

    fn latest_run(&self, identity: &QueryIdentity) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, identity, started_at, finished_at, config_hash, outcome, items_captured
                 FROM runs WHERE identity = ?1 ORDER BY id DESC LIMIT 1",
                params![identity.as_str()],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }
}
