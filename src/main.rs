//! Mapsweep main entry point
//!
//! This is the command-line interface for the Mapsweep resumable listing crawler.

use anyhow::{bail, Context};
use clap::Parser;
use mapsweep::config::{load_config_with_hash, Config, SaveMode};
use mapsweep::crawler::{
    run_batch, BatchOptions, CommandSource, FixedResume, PromptResume, ResumePolicy,
};
use mapsweep::output::{
    export, load_status, print_run_summary, print_status, timestamp_prefix, CsvTableWriter,
    ExportJob, ExportReport,
};
use mapsweep::query::{parse_queries, read_queries_file, read_queries_interactive, ResolvedQuery};
use mapsweep::storage::{open_store, SqliteStore, StateStore};
use mapsweep::QueryIdentity;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Mapsweep: a resumable business-listing crawler
///
/// Mapsweep crawls map-search results for each query, checkpoints progress so
/// an interrupted crawl picks up where it stopped, and exports the captured
/// listings per query or as one combined table.
#[derive(Parser, Debug)]
#[command(name = "mapsweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable business-listing crawler", long_about = None)]
struct Cli {
    /// Search queries to crawl (or export with --export-only)
    #[arg(value_name = "QUERIES")]
    queries: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Read queries from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// How to export results (overrides the config file)
    #[arg(long, value_enum, conflicts_with = "combined")]
    save_mode: Option<SaveMode>,

    /// Shorthand for --save-mode combined
    #[arg(long)]
    combined: bool,

    /// Export persisted state without crawling
    #[arg(long, conflicts_with = "status")]
    export_only: bool,

    /// Show persisted progress for every query and exit
    #[arg(long, conflicts_with = "export_only")]
    status: bool,

    /// Resume unfinished queries without asking
    #[arg(short, long, conflicts_with = "restart")]
    yes: bool,

    /// Restart unfinished queries from the beginning
    #[arg(long, conflicts_with = "yes")]
    restart: bool,

    /// Delete state for completed queries after a per-query export
    #[arg(long)]
    clear_exported: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (cfg, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            (Config::default(), String::new())
        }
    };
    apply_overrides(&mut config, &cli);

    let mut store = open_store(Path::new(&config.storage.database_path)).with_context(|| {
        format!("Failed to open state database {}", config.storage.database_path)
    })?;

    if cli.status {
        handle_status(&store)?;
    } else if cli.export_only {
        let queries = collect_queries(&cli)?;
        handle_export_only(&mut store, &config, &queries)?;
    } else {
        let mut queries = collect_queries(&cli)?;
        if queries.is_empty() && std::io::stdin().is_terminal() {
            queries = read_queries_interactive(std::io::stdin().lock(), std::io::stdout())
                .context("Failed to read queries from the terminal")?;
        }
        if queries.is_empty() {
            bail!("No queries given; pass them as arguments, with --file, or type them in");
        }
        handle_crawl(&mut store, &config, config_hash, &queries, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mapsweep=info,warn"),
            1 => EnvFilter::new("mapsweep=debug,info"),
            2 => EnvFilter::new("mapsweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.combined {
        config.export.save_mode = SaveMode::Combined;
    } else if let Some(mode) = cli.save_mode {
        config.export.save_mode = mode;
    }
    if cli.clear_exported {
        config.export.clear_completed = true;
    }
}

/// Gathers queries from arguments and the optional queries file
fn collect_queries(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let mut queries: Vec<String> = cli
        .queries
        .iter()
        .flat_map(|q| parse_queries(q))
        .collect();

    if let Some(path) = &cli.file {
        let from_file = read_queries_file(path)
            .with_context(|| format!("Failed to read queries file {}", path.display()))?;
        tracing::info!("Loaded {} queries from {}", from_file.len(), path.display());
        queries.extend(from_file);
    }

    Ok(queries)
}

/// Builds the export request for a set of queries
fn export_job(config: &Config, queries: Vec<QueryIdentity>) -> ExportJob {
    let file_prefix = if config.export.timestamp_prefix {
        timestamp_prefix(chrono::Local::now())
    } else {
        String::new()
    };

    ExportJob {
        queries,
        mode: config.export.save_mode,
        output_dir: PathBuf::from(&config.export.output_dir),
        file_prefix,
        clear_completed: config.export.clear_completed,
    }
}

/// Handles the --status mode: shows persisted progress for every query
fn handle_status(store: &SqliteStore) -> anyhow::Result<()> {
    let rows = load_status(store).context("Failed to read crawl state")?;
    print_status(&rows);
    Ok(())
}

/// Handles the --export-only mode: exports persisted state without crawling
///
/// With no queries given, every persisted query is exported.
fn handle_export_only(
    store: &mut SqliteStore,
    config: &Config,
    queries: &[String],
) -> anyhow::Result<()> {
    let identities = if queries.is_empty() {
        store
            .list_all()
            .context("Failed to list crawl state")?
            .into_iter()
            .map(|(identity, _)| identity)
            .collect()
    } else {
        let mut identities = Vec::new();
        for raw in queries {
            match ResolvedQuery::new(raw) {
                Ok(query) if !identities.contains(&query.identity) => {
                    identities.push(query.identity)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping query '{}': {}", raw, e),
            }
        }
        identities
    };

    if identities.is_empty() {
        println!("Nothing to export.");
        return Ok(());
    }

    let report = run_export(store, config, identities)?;
    for file in &report.files {
        println!("✓ Exported {} rows to {}", file.rows, file.path.display());
    }
    for (identity, error) in &report.failures {
        println!("✗ {}: {}", identity, error);
    }

    Ok(())
}

fn run_export(
    store: &mut SqliteStore,
    config: &Config,
    identities: Vec<QueryIdentity>,
) -> anyhow::Result<ExportReport> {
    let job = export_job(config, identities);
    tracing::info!(
        "Exporting {} queries ({}) to {}",
        job.queries.len(),
        job.mode,
        job.output_dir.display()
    );
    export(store, &CsvTableWriter, &job).context("Export failed")
}

/// Handles the main crawl operation, then exports what was crawled
async fn handle_crawl(
    store: &mut SqliteStore,
    config: &Config,
    config_hash: String,
    queries: &[String],
    cli: &Cli,
) -> anyhow::Result<()> {
    let Some(extractor) = config.extractor.clone() else {
        bail!("Crawling needs an [extractor] section in the configuration file");
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            signal_token.cancel();
        }
    });

    let mut resume: Box<dyn ResumePolicy> = if cli.yes {
        Box::new(FixedResume(true))
    } else if cli.restart {
        Box::new(FixedResume(false))
    } else if config.crawl.interactive {
        Box::new(PromptResume::stdio(config.crawl.assume_resume))
    } else {
        Box::new(FixedResume(config.crawl.assume_resume))
    };

    let options = BatchOptions {
        checkpoint_every: config.crawl.checkpoint_every,
        delay_between_queries: Duration::from_millis(config.crawl.delay_between_queries),
        config_hash,
    };

    tracing::info!("Starting crawl of {} queries", queries.len());
    let batch = run_batch(
        &mut *store,
        queries,
        |_query: &ResolvedQuery| CommandSource::new(extractor.clone()),
        resume.as_mut(),
        &cancel,
        &options,
    )
    .await;

    let identities = batch.identities();
    let export_report = if identities.is_empty() {
        None
    } else {
        match run_export(store, config, identities) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!("{:#}", e);
                None
            }
        }
    };

    print_run_summary(&batch, export_report.as_ref());

    if cancel.is_cancelled() {
        println!("\nInterrupted; rerun the same command to resume.");
    }

    Ok(())
}
