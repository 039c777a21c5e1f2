use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Mapsweep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// External page-extraction process; required only for crawling
    #[serde(default)]
    pub extractor: Option<ExtractorConfig>,
}

/// State database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite state database
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Number of newly captured items between checkpoints
    #[serde(rename = "checkpoint-every", default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// Resume answer used when no one is asked
    #[serde(rename = "assume-resume", default = "default_true")]
    pub assume_resume: bool,

    /// Ask on stdin before resuming an unfinished query
    #[serde(default = "default_true")]
    pub interactive: bool,

    /// Pause between consecutive queries (milliseconds)
    #[serde(rename = "delay-between-queries", default = "default_delay")]
    pub delay_between_queries: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: default_checkpoint_every(),
            assume_resume: true,
            interactive: true,
            delay_between_queries: default_delay(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving export files
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// How multi-query results are laid out
    #[serde(rename = "save-mode", default)]
    pub save_mode: SaveMode,

    /// Prefix export file names with `YYYYMMDD_HHMMSS_`
    #[serde(rename = "timestamp-prefix", default = "default_true")]
    pub timestamp_prefix: bool,

    /// Delete completed per-query state once its export is written
    #[serde(rename = "clear-completed", default)]
    pub clear_completed: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            save_mode: SaveMode::default(),
            timestamp_prefix: true,
            clear_completed: false,
        }
    }
}

/// External extractor process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Program to launch
    pub command: String,

    /// Arguments placed before the per-query arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Base URL the query is appended to
    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,
}

/// Export layout for a multi-query run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMode {
    /// One file per query
    #[default]
    #[serde(alias = "per_query")]
    #[value(alias = "per_query")]
    PerQuery,

    /// One file for all queries, with a leading query column
    #[serde(alias = "merged")]
    #[value(alias = "merged")]
    Combined,
}

impl SaveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerQuery => "per_query",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_database_path() -> String {
    "mapsweep.db".to_string()
}

fn default_checkpoint_every() -> usize {
    5
}

fn default_delay() -> u64 {
    5000
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_search_url() -> String {
    "https://www.google.com/maps/search/".to_string()
}

fn default_true() -> bool {
    true
}
