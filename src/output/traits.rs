//! Table writer trait and types
//!
//! This module defines the interface to the spreadsheet-writing primitive and
//! the flat table shape handed to it.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A header row plus data rows, each row aligned with `columns`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table with the given header
    pub fn new(columns: Vec<&'static str>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows (header excluded)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trait for the spreadsheet-writing primitive
///
/// Given a table and a target path, produce a file. Nothing else is assumed.
pub trait TableWriter {
    /// File extension (without the dot) this writer produces
    fn extension(&self) -> &'static str;

    /// Writes the table to `path`, replacing any existing file
    fn write_table(&self, path: &Path, table: &Table) -> OutputResult<()>;
}
