//! Extraction source boundary
//!
//! The crawl controller never drives a browser itself. It pulls one step at a
//! time from an `ItemSource`, which yields the next listing, a rejected position,
//! or the end of the result list.

use crate::query::ResolvedQuery;
use crate::state::CrawlItem;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an extraction source
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to launch extractor: {0}")]
    Launch(std::io::Error),

    #[error("Extractor reported an error: {0}")]
    Reported(String),

    #[error("Malformed extractor output at line {line}: {message}")]
    Protocol { line: usize, message: String },

    #[error("Extractor exited unexpectedly: {0}")]
    Exited(String),

    #[error("Invalid search URL: {0}")]
    InvalidUrl(String),

    #[error("Extraction source used before start")]
    NotStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one extraction step
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A listing was captured at the current position
    Item(CrawlItem),

    /// The current position was consumed without producing a listing
    Rejected,

    /// The result list has no more positions
    Exhausted,
}

/// A page-extraction collaborator
///
/// Each call to `next` is treated as one blocking step; cancellation is
/// only observed between steps.
#[async_trait]
pub trait ItemSource: Send {
    /// Prepares the source to yield results for `query` starting at `from_position`
    async fn start(&mut self, query: &ResolvedQuery, from_position: u64)
        -> Result<(), ExtractError>;

    /// Yields the next extraction step
    async fn next(&mut self) -> Result<Extraction, ExtractError>;

    /// Best-known total number of results, if the source has reported one
    fn total_estimate(&self) -> Option<u64>;
}
