//! Configuration module for Mapsweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use mapsweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mapsweep.toml")).unwrap();
//! println!("Checkpoint every {} items", config.crawl.checkpoint_every);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, ExportConfig, ExtractorConfig, SaveMode, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
