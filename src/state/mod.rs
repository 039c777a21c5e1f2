//! State module for tracking crawl progress
//!
//! This module provides the value types that flow between the crawl controller,
//! the state store, and the export reconciler.
//!
//! # Components
//!
//! - `CrawlItem`: one captured business record with optional fields
//! - `CrawlState`: persisted progress for one query (items, cursor, completion)
//! - `RunOutcome`: how a single crawl attempt ended

mod crawl_state;
mod run_outcome;

// Re-export main types
pub use crawl_state::{CrawlItem, CrawlState};
pub use run_outcome::RunOutcome;
