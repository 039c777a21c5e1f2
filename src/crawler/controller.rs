//! Crawl progress controller - per-query crawl orchestration
//!
//! This module runs one query's crawl from start to a terminal state:
//! - Consulting the state store for prior progress
//! - Deciding between fresh start, resume, restart, or nothing to do
//! - Pulling items from the extraction source
//! - Checkpointing at a fixed cadence and on every way out

use crate::crawler::resume::{ResumePolicy, ResumePrompt};
use crate::crawler::source::{ExtractError, Extraction, ItemSource};
use crate::query::{QueryIdentity, ResolvedQuery};
use crate::state::{CrawlItem, RunOutcome};
use crate::storage::{Checkpoint, StateStore, StorageResult};
use crate::MapsweepError;
use tokio_util::sync::CancellationToken;

/// Default number of newly captured items between checkpoints
pub const DEFAULT_CHECKPOINT_EVERY: usize = 5;

/// How a crawl run began
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStart {
    /// No prior state; extraction began at position 0
    Fresh,

    /// Prior state resumed from its persisted cursor
    Resumed { from: u64 },

    /// Prior state existed but resume was declined; extraction began at 0
    Restarted,

    /// Prior state was already complete; nothing was extracted
    AlreadyDone,
}

/// Summary of a finished crawl run for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub identity: QueryIdentity,
    pub start: CrawlStart,
    pub outcome: RunOutcome,

    /// Items durably checkpointed during this run
    pub captured_this_run: usize,

    /// Items stored for the query after this run
    pub total_captured: usize,

    /// Cursor position after this run
    pub processed_count: u64,
}

/// In-flight progress for one run
struct Progress {
    position: u64,
    buffer: Vec<CrawlItem>,
    /// Restarted run that has not yet replaced the old items
    supersede_pending: bool,
    /// Items from earlier runs still counted in the store
    retained: usize,
    captured: usize,
}

/// Step that ended the extraction loop
enum Stop {
    Exhausted,
    Cancelled,
    Failed(ExtractError),
}

/// Drives a single query's crawl against a state store
pub struct CrawlController<'a> {
    store: &'a mut dyn StateStore,
    checkpoint_every: usize,
}

impl<'a> CrawlController<'a> {
    /// Creates a new controller
    ///
    /// # Arguments
    ///
    /// * `store` - The state store owning every query's progress
    /// * `checkpoint_every` - Newly captured items between checkpoints (at least 1)
    pub fn new(store: &'a mut dyn StateStore, checkpoint_every: usize) -> Self {
        Self {
            store,
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// Runs the crawl for one query until it completes, is cancelled, or fails
    ///
    /// Whatever was buffered is checkpointed before returning, including when
    /// the extraction source fails.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Run reached Completed, AlreadyDone, or Interrupted
    /// * `Err(MapsweepError::ExtractionFailed)` - Source failed; buffered items were saved
    /// * `Err(MapsweepError::StoreIo)` - Store could not be read or written
    pub async fn run<E>(
        &mut self,
        query: &ResolvedQuery,
        source: &mut E,
        resume: &mut dyn ResumePolicy,
        cancel: &CancellationToken,
    ) -> Result<CrawlReport, MapsweepError>
    where
        E: ItemSource + ?Sized,
    {
        let identity = &query.identity;

        let (start, mut progress) = match self.store.load(identity)? {
            None => {
                tracing::info!("Starting fresh crawl for '{}'", query.raw);
                // Create the state up front so the query is visible even with zero items
                self.store.checkpoint(query, &Checkpoint::default())?;
                (CrawlStart::Fresh, Progress::new(0, 0, false))
            }
            Some(state) if state.completed => {
                tracing::info!(
                    "'{}' already completed with {} items",
                    query.raw,
                    state.captured()
                );
                return Ok(CrawlReport {
                    identity: identity.clone(),
                    start: CrawlStart::AlreadyDone,
                    outcome: RunOutcome::AlreadyDone,
                    captured_this_run: 0,
                    total_captured: state.captured(),
                    processed_count: state.processed_count,
                });
            }
            Some(state) => {
                let prompt = ResumePrompt::from_state(&state);
                if resume.should_resume(&prompt) {
                    tracing::info!(
                        "Resuming '{}' at position {}",
                        query.raw,
                        state.progress_label()
                    );
                    (
                        CrawlStart::Resumed {
                            from: state.processed_count,
                        },
                        Progress::new(state.processed_count, state.captured(), false),
                    )
                } else {
                    tracing::info!(
                        "Restarting '{}' from position 0; {} stored items kept until replaced",
                        query.raw,
                        state.captured()
                    );
                    (
                        CrawlStart::Restarted,
                        Progress::new(0, state.captured(), true),
                    )
                }
            }
        };

        if let Err(source_err) = source.start(query, progress.position).await {
            return Err(MapsweepError::ExtractionFailed {
                identity: identity.to_string(),
                source: source_err,
            });
        }

        let stop = loop {
            if cancel.is_cancelled() {
                break Stop::Cancelled;
            }

            match source.next().await {
                Ok(Extraction::Item(item)) => {
                    progress.buffer.push(item);
                    progress.position += 1;
                    if progress.buffer.len() >= self.checkpoint_every {
                        self.flush(query, &mut progress, source.total_estimate(), false)?;
                    }
                }
                Ok(Extraction::Rejected) => {
                    progress.position += 1;
                }
                Ok(Extraction::Exhausted) => break Stop::Exhausted,
                Err(e) if cancel.is_cancelled() => {
                    // The stop signal usually reaches the extractor too
                    tracing::debug!("Extractor error after cancellation for '{}': {}", query.raw, e);
                    break Stop::Cancelled;
                }
                Err(e) => break Stop::Failed(e),
            }
        };

        let total_estimate = source.total_estimate();

        let outcome = match stop {
            Stop::Exhausted => {
                self.flush(query, &mut progress, total_estimate, true)?;
                self.store.mark_completed(identity)?;
                tracing::info!(
                    "Completed '{}': {} items stored",
                    query.raw,
                    progress.total()
                );
                RunOutcome::Completed
            }
            Stop::Cancelled => {
                self.flush(query, &mut progress, total_estimate, false)?;
                tracing::warn!(
                    "Interrupted '{}' at position {}: {} items stored",
                    query.raw,
                    progress.position,
                    progress.total()
                );
                RunOutcome::Interrupted
            }
            Stop::Failed(source_err) => {
                if let Err(store_err) = self.flush(query, &mut progress, total_estimate, false) {
                    tracing::error!(
                        "Could not save buffered items for '{}' after extraction failure: {}",
                        query.raw,
                        store_err
                    );
                }
                tracing::warn!(
                    "Extraction failed for '{}' at position {}: {}",
                    query.raw,
                    progress.position,
                    source_err
                );
                return Err(MapsweepError::ExtractionFailed {
                    identity: identity.to_string(),
                    source: source_err,
                });
            }
        };

        Ok(CrawlReport {
            identity: identity.clone(),
            start,
            outcome,
            captured_this_run: progress.captured,
            total_captured: progress.total(),
            processed_count: progress.position,
        })
    }

    /// Writes buffered items and the cursor as one checkpoint
    ///
    /// A restarted run leaves the old items untouched until it has something to
    /// replace them with, or until its result list turns out to be exhausted.
    fn flush(
        &mut self,
        query: &ResolvedQuery,
        progress: &mut Progress,
        total_estimate: Option<u64>,
        exhausted: bool,
    ) -> StorageResult<()> {
        if progress.supersede_pending && progress.buffer.is_empty() && !exhausted {
            return Ok(());
        }

        let checkpoint = Checkpoint {
            items: std::mem::take(&mut progress.buffer),
            processed_count: progress.position,
            total_estimate,
            supersede: progress.supersede_pending,
        };

        if let Err(e) = self.store.checkpoint(query, &checkpoint) {
            // Keep the items in memory; the caller decides what to do with the error
            progress.buffer = checkpoint.items;
            return Err(e);
        }

        if checkpoint.supersede {
            progress.supersede_pending = false;
            progress.retained = 0;
        }
        progress.captured += checkpoint.items.len();

        tracing::debug!(
            "Checkpointed '{}': {} items, position {}/{}",
            query.raw,
            progress.total(),
            progress.position,
            total_estimate
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string())
        );

        Ok(())
    }
}

impl Progress {
    fn new(position: u64, retained: usize, supersede_pending: bool) -> Self {
        Self {
            position,
            buffer: Vec::new(),
            supersede_pending,
            retained,
            captured: 0,
        }
    }

    fn total(&self) -> usize {
        self.retained + self.captured
    }
}
