//! Status and run summaries
//!
//! Reads per-query progress from the store and renders the plain-text reports
//! printed by `--status` and at the end of a crawl.

use crate::crawler::{BatchReport, QueryStatus};
use crate::output::reconciler::ExportReport;
use crate::state::RunOutcome;
use crate::storage::{StateStore, StorageResult};
use std::fmt::Write;

/// One line of the status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub identity: String,
    pub query: String,
    pub captured: usize,
    /// `processed/total` or `processed/?`
    pub progress: String,
    pub completed: bool,
    pub updated_at: String,
    /// Outcome of the most recent recorded run, if any
    pub last_outcome: Option<RunOutcome>,
}

/// Loads a status row for every persisted query, ordered by identity
pub fn load_status(store: &dyn StateStore) -> StorageResult<Vec<StatusRow>> {
    let mut rows = Vec::new();

    for (identity, state) in store.list_all()? {
        let last_outcome = store.latest_run(&identity)?.map(|run| run.outcome);
        rows.push(StatusRow {
            identity: identity.to_string(),
            query: state.display_query().to_string(),
            captured: state.captured(),
            progress: state.progress_label(),
            completed: state.completed,
            updated_at: state.updated_at.clone(),
            last_outcome,
        });
    }

    rows.sort_by(|a, b| a.identity.cmp(&b.identity));
    Ok(rows)
}

/// Renders the status report
pub fn format_status(rows: &[StatusRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Status ===\n");

    if rows.is_empty() {
        let _ = writeln!(out, "No persisted queries.");
        return out;
    }

    for row in rows {
        let state = if row.completed { "done" } else { "partial" };
        let _ = write!(
            out,
            "  [{}] {} ({}): {} items, position {}",
            state, row.query, row.identity, row.captured, row.progress
        );
        if let Some(outcome) = row.last_outcome {
            let _ = write!(out, ", last run {}", outcome);
        }
        let _ = writeln!(out, ", updated {}", row.updated_at);
    }

    let done = rows.iter().filter(|r| r.completed).count();
    let items: usize = rows.iter().map(|r| r.captured).sum();
    let _ = writeln!(
        out,
        "\n{} queries ({} complete, {} partial), {} items stored",
        rows.len(),
        done,
        rows.len() - done,
        items
    );
    out
}

/// Prints the status report to stdout
pub fn print_status(rows: &[StatusRow]) {
    print!("{}", format_status(rows));
}

/// Renders the end-of-run summary
pub fn format_run_summary(batch: &BatchReport, export: Option<&ExportReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Run Summary ===\n");

    for report in &batch.queries {
        let _ = writeln!(
            out,
            "  {:<12} {} ({} items)",
            report.status.label(),
            report.raw,
            report.captured
        );
        if let QueryStatus::Failed(reason) | QueryStatus::Invalid(reason) = &report.status {
            let _ = writeln!(out, "               {}", reason);
        }
    }

    let completed = batch
        .queries
        .iter()
        .filter(|r| r.status.is_complete())
        .count();
    let _ = writeln!(
        out,
        "\n{} of {} queries complete",
        completed,
        batch.queries.len()
    );

    if let Some(export) = export {
        let _ = writeln!(out, "\nExported files:");
        for file in &export.files {
            let _ = writeln!(out, "  {} ({} rows)", file.path.display(), file.rows);
        }
        for (identity, error) in &export.failures {
            let _ = writeln!(out, "  not exported: {}: {}", identity, error);
        }
        if !export.cleared.is_empty() {
            let _ = writeln!(
                out,
                "Cleared state for {} completed queries",
                export.cleared.len()
            );
        }
    }

    out
}

/// Prints the end-of-run summary to stdout
pub fn print_run_summary(batch: &BatchReport, export: Option<&ExportReport>) {
    print!("{}", format_run_summary(batch, export));
}
