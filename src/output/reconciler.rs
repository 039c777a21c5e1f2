//! Export reconciler
//!
//! Reads persisted crawl state and shapes it into tables for the writer, one
//! file per query or one combined file for the whole job. Persisted state stays
//! the source of truth: exports can always be regenerated from it.

use crate::config::SaveMode;
use crate::output::traits::{Table, TableWriter};
use crate::query::QueryIdentity;
use crate::state::CrawlState;
use crate::storage::StateStore;
use crate::MapsweepError;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::PathBuf;

/// Columns of a per-query export
pub const ITEM_COLUMNS: [&str; 6] = ["Ordinal", "Name", "Phone", "Address", "Website", "Hours"];

/// Leading column added to combined exports
pub const QUERY_COLUMN: &str = "Query";

/// File stem used for combined exports
pub const COMBINED_STEM: &str = "combined";

/// A request to export one or more queries
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Queries to export, in the order their rows should appear
    pub queries: Vec<QueryIdentity>,

    pub mode: SaveMode,

    /// Directory receiving the files; created if missing
    pub output_dir: PathBuf,

    /// Prepended to every file name (e.g. `20250101_120000_`)
    pub file_prefix: String,

    /// In per-query mode, delete completed state once its file is written
    pub clear_completed: bool,
}

/// One file produced by an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,

    /// Queries whose rows are in this file
    pub queries: Vec<QueryIdentity>,

    /// Data rows written (header excluded)
    pub rows: usize,
}

/// Result of an export job
#[derive(Debug, Default)]
pub struct ExportReport {
    pub files: Vec<ExportedFile>,

    /// Queries that could not be exported, with the reason
    pub failures: Vec<(QueryIdentity, MapsweepError)>,

    /// Queries whose state was deleted after a successful export
    pub cleared: Vec<QueryIdentity>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds the `YYYYMMDD_HHMMSS_` file prefix for a point in time
pub fn timestamp_prefix(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S_").to_string()
}

/// Shapes one query's state into a per-query table
///
/// Rows follow stored insertion order; the ordinal is 1-based.
pub fn per_query_table(state: &CrawlState) -> Table {
    let mut table = Table::new(ITEM_COLUMNS.to_vec());
    for (index, item) in state.items.iter().enumerate() {
        let mut row = Vec::with_capacity(ITEM_COLUMNS.len());
        row.push((index + 1).to_string());
        row.extend(item.fields().iter().map(|f| f.to_string()));
        table.rows.push(row);
    }
    table
}

/// Shapes several queries' states into one table with a leading query column
///
/// Rows are grouped by query in the order given, then by insertion order.
pub fn combined_table(states: &[CrawlState]) -> Table {
    let mut columns = Vec::with_capacity(ITEM_COLUMNS.len() + 1);
    columns.push(QUERY_COLUMN);
    columns.extend(ITEM_COLUMNS);

    let mut table = Table::new(columns);
    for state in states {
        let label = state.display_query();
        for row in per_query_table(state).rows {
            let mut tagged = Vec::with_capacity(row.len() + 1);
            tagged.push(label.to_string());
            tagged.extend(row);
            table.rows.push(tagged);
        }
    }
    table
}

/// Runs an export job
///
/// Per-item problems (no state for a query, a per-query file that could not be
/// written) land in `ExportReport::failures`; the remaining queries still export.
/// A query listed more than once is exported once, at its first position.
/// Combined mode never clears state.
///
/// # Returns
///
/// * `Ok(ExportReport)` - Files produced plus any per-query failures
/// * `Err(MapsweepError)` - The job as a whole failed (output directory or combined file)
pub fn export(
    store: &mut dyn StateStore,
    writer: &dyn TableWriter,
    job: &ExportJob,
) -> Result<ExportReport, MapsweepError> {
    std::fs::create_dir_all(&job.output_dir)?;

    let mut report = ExportReport::default();
    let mut states = Vec::with_capacity(job.queries.len());
    let mut seen = HashSet::new();

    for identity in &job.queries {
        if !seen.insert(identity) {
            tracing::debug!("Ignoring repeated export request for '{}'", identity);
            continue;
        }
        match store.load(identity) {
            Ok(Some(state)) => states.push(state),
            Ok(None) => {
                tracing::warn!("No persisted state for '{}', skipping export", identity);
                report.failures.push((
                    identity.clone(),
                    MapsweepError::NoStateForQuery {
                        identity: identity.to_string(),
                    },
                ));
            }
            Err(e) => report.failures.push((identity.clone(), e.into())),
        }
    }

    match job.mode {
        SaveMode::PerQuery => export_per_query(store, writer, job, states, &mut report),
        SaveMode::Combined => {
            if !states.is_empty() {
                let file = export_combined(writer, job, &states)?;
                report.files.push(file);
            }
        }
    }

    Ok(report)
}

fn export_per_query(
    store: &mut dyn StateStore,
    writer: &dyn TableWriter,
    job: &ExportJob,
    states: Vec<CrawlState>,
    report: &mut ExportReport,
) {
    for state in states {
        let path = job.output_dir.join(format!(
            "{}{}.{}",
            job.file_prefix,
            state.identity,
            writer.extension()
        ));
        let table = per_query_table(&state);

        if let Err(e) = writer.write_table(&path, &table) {
            tracing::error!("Failed to write {}: {}", path.display(), e);
            report.failures.push((state.identity.clone(), e.into()));
            continue;
        }

        tracing::info!("Exported {} rows to {}", table.len(), path.display());
        report.files.push(ExportedFile {
            path,
            queries: vec![state.identity.clone()],
            rows: table.len(),
        });

        if job.clear_completed && state.completed {
            match store.clear(&state.identity) {
                Ok(_) => {
                    tracing::info!("Cleared state for '{}'", state.identity);
                    report.cleared.push(state.identity.clone());
                }
                Err(e) => {
                    tracing::warn!("Exported '{}' but could not clear it: {}", state.identity, e)
                }
            }
        }
    }
}

fn export_combined(
    writer: &dyn TableWriter,
    job: &ExportJob,
    states: &[CrawlState],
) -> Result<ExportedFile, MapsweepError> {
    let path = job.output_dir.join(format!(
        "{}{}.{}",
        job.file_prefix,
        COMBINED_STEM,
        writer.extension()
    ));
    let table = combined_table(states);

    writer.write_table(&path, &table)?;

    tracing::info!(
        "Exported {} rows from {} queries to {}",
        table.len(),
        states.len(),
        path.display()
    );

    Ok(ExportedFile {
        path,
        queries: states.iter().map(|s| s.identity.clone()).collect(),
        rows: table.len(),
    })
}
