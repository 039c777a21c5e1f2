//! Integration tests for crawling, resuming, and exporting
//!
//! Crawls are driven by a scripted in-process source so the tests can stop,
//! fail, and resume at exact positions against a real on-disk store.

mod crawl_tests;
mod export_tests;

use async_trait::async_trait;
use mapsweep::crawler::{ExtractError, Extraction, ItemSource};
use mapsweep::query::ResolvedQuery;
use mapsweep::state::CrawlItem;
use mapsweep::storage::{open_store, SqliteStore};
use tokio_util::sync::CancellationToken;

/// Listing `n` (1-based) of a scripted result list
pub fn listing(query: &str, n: u64) -> CrawlItem {
    CrawlItem {
        name: Some(format!("{} {}", query, n)),
        phone: Some(format!("028 {:04}", n)),
        address: Some(format!("{} Lê Lợi, Quận 1", n)),
        website: None,
        hours: Some("08:00-17:00".to_string()),
    }
}

/// Replays a fixed result list from any start position
pub struct ScriptedSource {
    label: String,
    total: u64,
    position: u64,
    /// Cancel this token once the position reaches the given value
    cancel_at: Option<(u64, CancellationToken)>,
    /// Fail with a reported error once the position reaches the given value
    fail_at: Option<u64>,
    /// Positions the source was started from
    pub starts: Vec<u64>,
}

impl ScriptedSource {
    pub fn new(label: &str, total: u64) -> Self {
        Self {
            label: label.to_string(),
            total,
            position: 0,
            cancel_at: None,
            fail_at: None,
            starts: Vec::new(),
        }
    }

    pub fn cancel_at(mut self, position: u64, token: &CancellationToken) -> Self {
        self.cancel_at = Some((position, token.clone()));
        self
    }

    pub fn fail_at(mut self, position: u64) -> Self {
        self.fail_at = Some(position);
        self
    }
}

#[async_trait]
impl ItemSource for ScriptedSource {
    async fn start(&mut self, _query: &ResolvedQuery, from: u64) -> Result<(), ExtractError> {
        self.position = from;
        self.starts.push(from);
        Ok(())
    }

    async fn next(&mut self) -> Result<Extraction, ExtractError> {
        if self.fail_at == Some(self.position) {
            return Err(ExtractError::Reported("listing details did not load".to_string()));
        }
        if self.position >= self.total {
            return Ok(Extraction::Exhausted);
        }

        self.position += 1;
        if let Some((at, token)) = &self.cancel_at {
            if self.position >= *at {
                token.cancel();
            }
        }
        Ok(Extraction::Item(listing(&self.label, self.position)))
    }

    fn total_estimate(&self) -> Option<u64> {
        Some(self.total)
    }
}

/// Opens a fresh on-disk store inside `dir`
pub fn store_in(dir: &tempfile::TempDir) -> SqliteStore {
    open_store(&dir.path().join("state.db")).expect("Failed to open store")
}
