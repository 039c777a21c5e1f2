//! Crawl, interrupt, and resume against an on-disk store

use crate::{store_in, ScriptedSource};
use mapsweep::crawler::{CrawlController, CrawlStart, FixedResume};
use mapsweep::query::ResolvedQuery;
use mapsweep::state::RunOutcome;
use mapsweep::storage::StateStore;
use mapsweep::MapsweepError;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_interrupted_crawl_resumes_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let query = ResolvedQuery::new("nha khoa quận 1").unwrap();

    // First run stops after 30 of 57 listings
    {
        let mut store = store_in(&dir);
        let cancel = CancellationToken::new();
        let mut source = ScriptedSource::new("dental", 57).cancel_at(30, &cancel);

        let report = CrawlController::new(&mut store, 7)
            .run(&query, &mut source, &mut FixedResume(true), &cancel)
            .await
            .unwrap();

        assert_eq!(report.start, CrawlStart::Fresh);
        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert_eq!(report.total_captured, 30);
    }

    // Process restarts: a new store handle sees the checkpointed progress
    let mut store = store_in(&dir);
    let state = store.load(&query.identity).unwrap().unwrap();
    assert_eq!(state.captured(), 30);
    assert_eq!(state.processed_count, 30);
    assert_eq!(state.total_estimate, Some(57));
    assert!(!state.completed);

    let mut source = ScriptedSource::new("dental", 57);
    let report = CrawlController::new(&mut store, 7)
        .run(
            &query,
            &mut source,
            &mut FixedResume(true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.start, CrawlStart::Resumed { from: 30 });
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.captured_this_run, 27);
    assert_eq!(source.starts, vec![30]);

    let state = store.load(&query.identity).unwrap().unwrap();
    assert!(state.completed);
    assert_eq!(state.captured(), 57);
    assert_eq!(state.processed_count, 57);

    let names: HashSet<_> = state.items.iter().map(|i| i.name.clone()).collect();
    assert_eq!(names.len(), 57);
    assert_eq!(state.items[0].name.as_deref(), Some("dental 1"));
    assert_eq!(state.items[56].name.as_deref(), Some("dental 57"));
}

#[tokio::test]
async fn test_completed_query_is_not_crawled_again() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let query = ResolvedQuery::new("spa hà nội").unwrap();
    let cancel = CancellationToken::new();

    let mut source = ScriptedSource::new("spa", 12);
    CrawlController::new(&mut store, 5)
        .run(&query, &mut source, &mut FixedResume(true), &cancel)
        .await
        .unwrap();

    let mut again = ScriptedSource::new("spa", 12);
    let report = CrawlController::new(&mut store, 5)
        .run(&query, &mut again, &mut FixedResume(false), &cancel)
        .await
        .unwrap();

    assert_eq!(report.start, CrawlStart::AlreadyDone);
    assert_eq!(report.outcome, RunOutcome::AlreadyDone);
    assert_eq!(report.total_captured, 12);
    assert!(again.starts.is_empty());
}

#[tokio::test]
async fn test_extraction_failure_keeps_buffered_items() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let query = ResolvedQuery::new("cafe quận 3").unwrap();
    let cancel = CancellationToken::new();

    let mut source = ScriptedSource::new("cafe", 20).fail_at(8);
    let result = CrawlController::new(&mut store, 5)
        .run(&query, &mut source, &mut FixedResume(true), &cancel)
        .await;

    assert!(matches!(
        result,
        Err(MapsweepError::ExtractionFailed { .. })
    ));
    let state = store.load(&query.identity).unwrap().unwrap();
    assert_eq!(state.captured(), 8);
    assert_eq!(state.processed_count, 8);
    assert!(!state.completed);

    // Next attempt picks up after the last saved listing
    let mut source = ScriptedSource::new("cafe", 20);
    let report = CrawlController::new(&mut store, 5)
        .run(&query, &mut source, &mut FixedResume(true), &cancel)
        .await
        .unwrap();

    assert_eq!(report.start, CrawlStart::Resumed { from: 8 });
    assert_eq!(report.total_captured, 20);
}

#[tokio::test]
async fn test_declined_resume_replaces_old_items() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let query = ResolvedQuery::new("gym").unwrap();

    let cancel = CancellationToken::new();
    let mut source = ScriptedSource::new("old", 40).cancel_at(10, &cancel);
    CrawlController::new(&mut store, 5)
        .run(&query, &mut source, &mut FixedResume(true), &cancel)
        .await
        .unwrap();
    assert_eq!(store.load(&query.identity).unwrap().unwrap().captured(), 10);

    let mut source = ScriptedSource::new("new", 15);
    let report = CrawlController::new(&mut store, 5)
        .run(
            &query,
            &mut source,
            &mut FixedResume(false),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.start, CrawlStart::Restarted);
    assert_eq!(source.starts, vec![0]);

    let state = store.load(&query.identity).unwrap().unwrap();
    assert!(state.completed);
    assert_eq!(state.captured(), 15);
    assert!(state
        .items
        .iter()
        .all(|i| i.name.as_deref().is_some_and(|n| n.starts_with("new "))));
}

#[tokio::test]
async fn test_declined_resume_interrupted_before_any_item_keeps_old_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let query = ResolvedQuery::new("gym").unwrap();

    let cancel = CancellationToken::new();
    let mut source = ScriptedSource::new("old", 40).cancel_at(10, &cancel);
    CrawlController::new(&mut store, 5)
        .run(&query, &mut source, &mut FixedResume(true), &cancel)
        .await
        .unwrap();

    // Token is already cancelled, so the restarted run captures nothing
    let mut source = ScriptedSource::new("new", 15);
    let report = CrawlController::new(&mut store, 5)
        .run(&query, &mut source, &mut FixedResume(false), &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    let state = store.load(&query.identity).unwrap().unwrap();
    assert_eq!(state.captured(), 10);
    assert_eq!(state.processed_count, 10);
    assert_eq!(state.items[0].name.as_deref(), Some("old 1"));
}
