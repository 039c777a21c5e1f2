//! Mapsweep: a resumable business-listing crawler
//!
//! This crate crawls business listings for free-text map-search queries, keeps a
//! durable per-query record of progress so interrupted crawls can resume, and
//! reconciles the persisted state into per-query or combined tabular exports.

pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Mapsweep operations
#[derive(Debug, Error)]
pub enum MapsweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("Extraction failed for '{identity}': {source}")]
    ExtractionFailed {
        identity: String,
        source: crawler::ExtractError,
    },

    #[error("No persisted state for query '{identity}'")]
    NoStateForQuery { identity: String },

    #[error("Store error: {0}")]
    StoreIo(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Query identity errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query is empty or whitespace-only")]
    Empty,
}

/// Result type alias for Mapsweep operations
pub type Result<T> = std::result::Result<T, MapsweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for query identity operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

// Re-export commonly used types
pub use config::{Config, SaveMode};
pub use query::{resolve, QueryIdentity, ResolvedQuery};
pub use state::{CrawlItem, CrawlState, RunOutcome};
