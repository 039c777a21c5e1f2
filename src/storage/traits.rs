//! Storage traits and error types
//!
//! This module defines the trait interface for crawl state backends and
//! associated error types.

use crate::query::{QueryIdentity, ResolvedQuery};
use crate::state::{CrawlState, RunOutcome};
use crate::storage::{Checkpoint, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No state stored for query: {0}")]
    StateNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt state for query {identity}: {message}")]
    Corrupt { identity: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl state backends
///
/// Each query identity owns at most one `CrawlState`. Callers serialize access
/// per identity; implementations need no cross-process coordination.
pub trait StateStore {
    // ===== Crawl State =====

    /// Loads the persisted state for a query
    ///
    /// Returns `Ok(None)` for a query that has never been crawled.
    fn load(&self, identity: &QueryIdentity) -> StorageResult<Option<CrawlState>>;

    /// Appends items and advances the cursor, creating the state if needed
    ///
    /// The checkpoint is all-or-nothing: a subsequent `load` sees either the
    /// previous checkpoint or this one, never a mix.
    fn checkpoint(&mut self, query: &ResolvedQuery, checkpoint: &Checkpoint) -> StorageResult<()>;

    /// Sets the completion flag once the source result list is exhausted
    fn mark_completed(&mut self, identity: &QueryIdentity) -> StorageResult<()>;

    /// Deletes the persisted state for a query
    ///
    /// Returns true if there was anything to delete.
    fn clear(&mut self, identity: &QueryIdentity) -> StorageResult<bool>;

    /// Enumerates every persisted state, ordered by identity
    fn list_all(&self) -> StorageResult<Vec<(QueryIdentity, CrawlState)>>;

    // ===== Run Tracking =====

    /// Records the start of a crawl attempt
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn start_run(&mut self, identity: &QueryIdentity, config_hash: &str) -> StorageResult<i64>;

    /// Records how a crawl attempt ended
    fn finish_run(
        &mut self,
        run_id: i64,
        outcome: RunOutcome,
        items_captured: u64,
    ) -> StorageResult<()>;

    /// Gets the most recent run for a query
    fn latest_run(&self, identity: &QueryIdentity) -> StorageResult<Option<RunRecord>>;
}
