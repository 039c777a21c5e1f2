//! Storage module for persisting crawl state
//!
//! This module handles all durable state for the crawler, including:
//! - SQLite database initialization and schema management
//! - Per-query crawl state (items, cursor, completion flag)
//! - Atomic checkpoints
//! - Run tracking for status reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{StateStore, StorageError, StorageResult};

use crate::state::{CrawlItem, RunOutcome};

use std::path::Path;

/// Opens (or creates) the state database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// One incremental write of newly captured items plus the updated cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    /// Items captured since the previous checkpoint, in discovery order
    pub items: Vec<CrawlItem>,

    /// New position cursor into the source result list
    pub processed_count: u64,

    /// Best-known total at this point, if the source reported one
    pub total_estimate: Option<u64>,

    /// Replace all previously stored items instead of appending
    ///
    /// Set on the first write of a restarted crawl; the old items stay
    /// visible until this checkpoint commits.
    pub supersede: bool,
}

/// Represents one crawl attempt in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub identity: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub outcome: RunOutcome,
    pub items_captured: u64,
}
