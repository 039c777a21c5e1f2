//! Output module for exports and reports
//!
//! This module handles:
//! - Reconciling persisted crawl state into per-query or combined tables
//! - Writing tables to disk atomically
//! - Rendering status and end-of-run summaries

mod csv_writer;
pub mod reconciler;
pub mod summary;
mod traits;

pub use csv_writer::CsvTableWriter;
pub use reconciler::{
    combined_table, export, per_query_table, timestamp_prefix, ExportJob, ExportReport,
    ExportedFile,
};
pub use summary::{
    format_run_summary, format_status, load_status, print_run_summary, print_status, StatusRow,
};
pub use traits::{OutputError, OutputResult, Table, TableWriter};
