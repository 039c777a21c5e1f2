//! Batch crawls followed by per-query and combined exports

use crate::{store_in, ScriptedSource};
use mapsweep::config::SaveMode;
use mapsweep::crawler::{run_batch, BatchOptions, FixedResume, QueryStatus};
use mapsweep::output::{export, CsvTableWriter, ExportJob};
use mapsweep::query::ResolvedQuery;
use mapsweep::state::RunOutcome;
use mapsweep::storage::{SqliteStore, StateStore};
use mapsweep::QueryIdentity;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn sources(query: &ResolvedQuery) -> ScriptedSource {
    match query.identity.as_str() {
        "spa_ha_noi" => ScriptedSource::new("spa", 12),
        "nha_khoa_quan_1" => ScriptedSource::new("dental", 57),
        _ => ScriptedSource::new("other", 0),
    }
}

async fn crawl(store: &mut SqliteStore, queries: &[&str]) -> Vec<QueryIdentity> {
    let queries: Vec<String> = queries.iter().map(|q| q.to_string()).collect();
    let report = run_batch(
        store,
        &queries,
        sources,
        &mut FixedResume(true),
        &CancellationToken::new(),
        &BatchOptions::default(),
    )
    .await;

    assert!(report.all_complete());
    report.identities()
}

fn job(dir: &Path, queries: Vec<QueryIdentity>, mode: SaveMode, clear: bool) -> ExportJob {
    ExportJob {
        queries,
        mode,
        output_dir: dir.to_path_buf(),
        file_prefix: String::new(),
        clear_completed: clear,
    }
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_combined_export_merges_all_queries() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut store = store_in(&dir);
    let identities = crawl(&mut store, &["Spa Hà Nội", "nha khoa quận 1"]).await;

    let report = export(
        &mut store,
        &CsvTableWriter,
        &job(&out, identities.clone(), SaveMode::Combined, true),
    )
    .unwrap();

    assert!(report.is_success());
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].rows, 69);

    let (headers, rows) = read_rows(&out.join("combined.csv"));
    assert_eq!(
        headers,
        vec!["Query", "Ordinal", "Name", "Phone", "Address", "Website", "Hours"]
    );
    assert_eq!(rows.len(), 69);
    assert_eq!(rows[0][0], "Spa Hà Nội");
    assert_eq!(rows[0][1], "1");
    assert_eq!(rows[12][0], "nha khoa quận 1");
    assert_eq!(rows[12][2], "dental 1");
    assert_eq!(rows[68][1], "57");

    // Combined exports leave state in place even when clearing is requested
    for identity in &identities {
        assert!(store.load(identity).unwrap().is_some());
    }
}

#[tokio::test]
async fn test_per_query_export_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let identities = crawl(&mut store, &["spa ha noi", "nha khoa quan 1"]).await;

    let report = export(
        &mut store,
        &CsvTableWriter,
        &job(dir.path(), identities.clone(), SaveMode::PerQuery, true),
    )
    .unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.cleared, identities);

    let (headers, rows) = read_rows(&dir.path().join("spa_ha_noi.csv"));
    assert_eq!(
        headers,
        vec!["Ordinal", "Name", "Phone", "Address", "Website", "Hours"]
    );
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[3], vec!["4", "spa 4", "028 0004", "4 Lê Lợi, Quận 1", "", "08:00-17:00"]);

    let (_, rows) = read_rows(&dir.path().join("nha_khoa_quan_1.csv"));
    assert_eq!(rows.len(), 57);

    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_export_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let identities = crawl(&mut store, &["spa ha noi"]).await;

    let first = dir.path().join("first");
    let second = dir.path().join("second");
    export(
        &mut store,
        &CsvTableWriter,
        &job(&first, identities.clone(), SaveMode::PerQuery, false),
    )
    .unwrap();
    export(
        &mut store,
        &CsvTableWriter,
        &job(&second, identities, SaveMode::PerQuery, false),
    )
    .unwrap();

    let a = std::fs::read(first.join("spa_ha_noi.csv")).unwrap();
    let b = std::fs::read(second.join("spa_ha_noi.csv")).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_query_with_no_results_exports_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let identities = crawl(&mut store, &["tiệm sửa xe đạp"]).await;

    let state = store.load(&identities[0]).unwrap().unwrap();
    assert!(state.completed);
    assert_eq!(state.captured(), 0);

    let report = export(
        &mut store,
        &CsvTableWriter,
        &job(dir.path(), identities, SaveMode::PerQuery, false),
    )
    .unwrap();

    let content = std::fs::read_to_string(&report.files[0].path).unwrap();
    assert_eq!(content, "Ordinal,Name,Phone,Address,Website,Hours\n");
}

#[tokio::test]
async fn test_export_reports_unknown_query() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    let mut identities = crawl(&mut store, &["spa ha noi"]).await;
    identities.insert(0, ResolvedQuery::new("never crawled").unwrap().identity);

    let report = export(
        &mut store,
        &CsvTableWriter,
        &job(dir.path(), identities, SaveMode::Combined, false),
    )
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0.as_str(), "never_crawled");
    assert_eq!(report.files[0].rows, 12);
}

#[tokio::test]
async fn test_second_batch_reports_already_done() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);
    crawl(&mut store, &["spa ha noi"]).await;

    let report = run_batch(
        &mut store,
        &["spa ha noi".to_string()],
        sources,
        &mut FixedResume(true),
        &CancellationToken::new(),
        &BatchOptions::default(),
    )
    .await;

    assert_eq!(
        report.queries[0].status,
        QueryStatus::Crawled(RunOutcome::AlreadyDone)
    );
    assert_eq!(report.queries[0].captured, 12);
}
