//! Multi-query batch runner
//!
//! Runs the crawl controller over a list of raw queries, one at a time. A
//! failure in one query never stops the rest of the batch; cancellation stops
//! new queries from starting.

use crate::crawler::controller::{CrawlController, DEFAULT_CHECKPOINT_EVERY};
use crate::crawler::resume::ResumePolicy;
use crate::crawler::source::ItemSource;
use crate::query::{QueryIdentity, ResolvedQuery};
use crate::state::RunOutcome;
use crate::storage::StateStore;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Batch-wide settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub checkpoint_every: usize,
    pub delay_between_queries: Duration,
    /// Recorded with every run
    pub config_hash: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            delay_between_queries: Duration::ZERO,
            config_hash: String::new(),
        }
    }
}

/// Per-query result of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// Crawl reached a terminal state (Completed, AlreadyDone, or Interrupted)
    Crawled(RunOutcome),

    /// Extraction or persistence failed; anything buffered was saved if possible
    Failed(String),

    /// Query text could not be resolved to an identity
    Invalid(String),

    /// Batch was cancelled before this query started
    Skipped,
}

impl QueryStatus {
    /// True if the query's result list is fully captured
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Crawled(outcome) if outcome.is_complete())
    }

    /// Short label used in run summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Crawled(RunOutcome::Completed) => "completed",
            Self::Crawled(RunOutcome::AlreadyDone) => "already done",
            Self::Crawled(RunOutcome::Interrupted) => "interrupted",
            Self::Crawled(_) => "incomplete",
            Self::Failed(_) => "failed",
            Self::Invalid(_) => "invalid",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) | Self::Invalid(reason) => {
                write!(f, "{}: {}", self.label(), reason)
            }
            _ => f.write_str(self.label()),
        }
    }
}

/// Outcome of one query within a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    /// Query text as given
    pub raw: String,

    /// Resolved query, absent when the text was invalid
    pub query: Option<ResolvedQuery>,

    pub status: QueryStatus,

    /// Items stored for the query after its run
    pub captured: usize,
}

/// Outcome of a whole batch, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub queries: Vec<QueryReport>,
}

impl BatchReport {
    /// Identities of every query that resolved, in input order
    pub fn identities(&self) -> Vec<QueryIdentity> {
        self.queries
            .iter()
            .filter_map(|r| r.query.as_ref().map(|q| q.identity.clone()))
            .collect()
    }

    /// True if every resolved query ended complete
    pub fn all_complete(&self) -> bool {
        self.queries.iter().all(|r| r.status.is_complete())
    }
}

/// Crawls each query in order
///
/// # Arguments
///
/// * `store` - State store shared by all queries
/// * `queries` - Raw query texts; later duplicates of an identity are dropped
/// * `make_source` - Builds the extraction source for a query
/// * `resume` - Answers resume prompts for unfinished queries
/// * `cancel` - Cooperative stop signal
/// * `options` - Batch-wide settings
pub async fn run_batch<F, E>(
    store: &mut dyn StateStore,
    queries: &[String],
    mut make_source: F,
    resume: &mut dyn ResumePolicy,
    cancel: &CancellationToken,
    options: &BatchOptions,
) -> BatchReport
where
    F: FnMut(&ResolvedQuery) -> E,
    E: ItemSource,
{
    let mut report = BatchReport::default();
    let mut seen = HashSet::new();
    let mut started_any = false;

    for (index, raw) in queries.iter().enumerate() {
        let query = match ResolvedQuery::new(raw) {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!("Skipping query #{}: {}", index + 1, e);
                report.queries.push(QueryReport {
                    raw: raw.clone(),
                    query: None,
                    status: QueryStatus::Invalid(e.to_string()),
                    captured: 0,
                });
                continue;
            }
        };

        if !seen.insert(query.identity.clone()) {
            tracing::debug!("Dropping duplicate query '{}'", query.raw);
            continue;
        }

        if started_any && !options.delay_between_queries.is_zero() && !cancel.is_cancelled() {
            tokio::select! {
                _ = tokio::time::sleep(options.delay_between_queries) => {}
                _ = cancel.cancelled() => {}
            }
        }

        if cancel.is_cancelled() {
            report.queries.push(QueryReport {
                raw: raw.clone(),
                captured: stored_count(&*store, &query.identity),
                query: Some(query),
                status: QueryStatus::Skipped,
            });
            continue;
        }

        started_any = true;
        tracing::info!("[{}/{}] Crawling '{}'", index + 1, queries.len(), query.raw);

        let status = crawl_one(store, &query, &mut make_source, resume, cancel, options).await;

        report.queries.push(QueryReport {
            raw: raw.clone(),
            captured: stored_count(&*store, &query.identity),
            query: Some(query),
            status,
        });
    }

    report
}

/// Runs one query and records the attempt in the run log
async fn crawl_one<F, E>(
    store: &mut dyn StateStore,
    query: &ResolvedQuery,
    make_source: &mut F,
    resume: &mut dyn ResumePolicy,
    cancel: &CancellationToken,
    options: &BatchOptions,
) -> QueryStatus
where
    F: FnMut(&ResolvedQuery) -> E,
    E: ItemSource,
{
    let run_id = match store.start_run(&query.identity, &options.config_hash) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Cannot record run for '{}': {}", query.raw, e);
            return QueryStatus::Failed(e.to_string());
        }
    };

    let mut source = make_source(query);
    let result = CrawlController::new(&mut *store, options.checkpoint_every)
        .run(query, &mut source, resume, cancel)
        .await;

    let (status, outcome) = match result {
        Ok(crawl) => (QueryStatus::Crawled(crawl.outcome), crawl.outcome),
        Err(e) => {
            tracing::error!("'{}' failed: {}", query.raw, e);
            (QueryStatus::Failed(e.to_string()), RunOutcome::Failed)
        }
    };

    let captured = stored_count(&*store, &query.identity) as u64;
    if let Err(e) = store.finish_run(run_id, outcome, captured) {
        tracing::warn!("Cannot finish run {} for '{}': {}", run_id, query.raw, e);
    }

    status
}

fn stored_count(store: &dyn StateStore, identity: &QueryIdentity) -> usize {
    match store.load(identity) {
        Ok(Some(state)) => state.captured(),
        Ok(None) => 0,
        Err(e) => {
            tracing::warn!("Cannot read state for {}: {}", identity, e);
            0
        }
    }
}
