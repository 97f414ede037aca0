//! Regex-Sweep main entry point
//!
//! This is the command-line interface for the Regex-Sweep job engine. It acts
//! as a polling caller: it creates (or resumes) a job, advances it chunk by
//! chunk while printing each delta, then exports the full history.

use anyhow::Context;
use clap::Parser;
use regex_sweep::config::{load_config_with_hash, Config};
use regex_sweep::engine::{EngineSettings, FetchSettings, JobEngine, ReqwestFetcher};
use regex_sweep::output::{export_csv, print_statistics, RunStatistics};
use regex_sweep::state::{JobParams, Progress, UrlOutcome};
use regex_sweep::storage::open_store;
use regex_sweep::url::parse_url_list;
use regex_sweep::{matcher, SweepError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Regex-Sweep: search many web pages with one regular expression
///
/// Fetches every URL in a list, matches the raw page source against a
/// pattern and exports one CSV row per URL. Progress is persisted after
/// every chunk, so an interrupted run can be resumed with --job.
#[derive(Parser, Debug)]
#[command(name = "regex-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Search many web pages with one regular expression", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// File with URLs, one per line or comma-separated
    #[arg(long, value_name = "FILE", required_unless_present = "job")]
    urls: Option<PathBuf>,

    /// Pattern to search for, raw (`cdn\.[a-z]+`) or delimited (`/cdn/i`)
    #[arg(long, required_unless_present = "job")]
    pattern: Option<String>,

    /// Resume an existing job instead of creating one
    #[arg(long, value_name = "ID", conflicts_with_all = ["urls", "pattern", "dry_run"])]
    job: Option<String>,

    /// Process one URL per step
    #[arg(long, conflicts_with = "chunk_size")]
    sequential: bool,

    /// URLs per step (defaults to the configured chunk policy)
    #[arg(long, value_name = "N")]
    chunk_size: Option<usize>,

    /// Override the CSV output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config, URLs and pattern without fetching anything
    #[arg(long)]
    dry_run: bool,

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

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&cli, &config);
    }

    handle_run(&cli, config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("regex_sweep=info,warn"),
            1 => EnvFilter::new("regex_sweep=debug,info"),
            2 => EnvFilter::new("regex_sweep=trace,debug"),
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

fn read_urls(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;
    Ok(parse_url_list(&text))
}

fn output_path(cli: &Cli, config: &Config) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.csv_path))
}

/// Handles the --dry-run mode: validates input and shows what would run
fn handle_dry_run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    println!("=== Regex-Sweep Dry Run ===\n");

    println!("Job Defaults:");
    println!("  Concurrency: {}", config.job.concurrency);
    println!("  Start jitter: up to {}ms", config.job.delay_ms);
    println!("  Retries: {}", config.job.max_retries);
    println!("  Chunk policy: {:?}", config.job.chunk_policy);

    println!("\nFetcher:");
    println!(
        "  Timeouts: connect {}s, total {}s",
        config.fetcher.connect_timeout_secs, config.fetcher.timeout_secs
    );
    println!("  Max redirects: {}", config.fetcher.max_redirects);
    println!(
        "  Proxy: {}",
        config.fetcher.proxy.as_deref().unwrap_or("none")
    );

    println!("\nOutput:");
    println!("  Database: {}", config.store.database_path);
    println!("  CSV: {}", output_path(cli, config).display());

    let urls = match &cli.urls {
        Some(path) => read_urls(path)?,
        None => Vec::new(),
    };
    let pattern = cli.pattern.as_deref().unwrap_or_default();

    println!("\nURLs ({}):", urls.len());
    for url in &urls {
        println!("  - {}", url);
    }

    if urls.is_empty() {
        anyhow::bail!("no valid URLs found");
    }
    if !matcher::validate(pattern) {
        anyhow::bail!("invalid pattern: {}", pattern);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Pattern is valid: {}", pattern);
    println!("✓ Would search {} URLs", urls.len());

    Ok(())
}

/// Creates or resumes a job and polls it to completion
async fn handle_run(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.store.database_path))
        .with_context(|| format!("failed to open {}", config.store.database_path))?;
    let fetcher = ReqwestFetcher::new(&FetchSettings::from(&config.fetcher))
        .context("failed to build HTTP client")?;
    let engine = JobEngine::new(
        Arc::new(store),
        Arc::new(fetcher),
        EngineSettings::from_config(&config),
    );
    engine.purge_expired()?;

    let job_id = match &cli.job {
        Some(job_id) => {
            tracing::info!("Resuming job {}", job_id);
            job_id.clone()
        }
        None => {
            let urls = match &cli.urls {
                Some(path) => read_urls(path)?,
                None => Vec::new(),
            };
            let pattern = cli.pattern.as_deref().unwrap_or_default();
            engine.create_job(urls, pattern, JobParams::from(&config.job))?
        }
    };

    let job = engine.load_job(&job_id)?;
    let chunk_size = if cli.sequential {
        1
    } else {
        cli.chunk_size
            .unwrap_or_else(|| engine.default_chunk_size(&job))
    };
    println!(
        "Job {}: {} URLs, {} already done (created {})",
        job_id,
        job.total(),
        job.completed(),
        job.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; stopping after the current step");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    loop {
        if interrupted.load(Ordering::SeqCst) {
            println!("\nStopped. Resume with: --job {}", job_id);
            return Ok(());
        }

        let progress = match engine.poll(&job_id, chunk_size).await {
            Ok(progress) => progress,
            Err(SweepError::Conflict { .. }) => {
                tracing::warn!("Another process advanced job {}; continuing", job_id);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        print_delta(&progress);
        if progress.done {
            break;
        }
    }

    let results = match engine.finalize(&job_id) {
        Ok(results) => results,
        Err(e) if e.is_not_found() => {
            tracing::warn!("Job {} expired before export; nothing to write", job_id);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    let path = output_path(cli, &config);
    export_csv(&path, &results, &config.output.match_delimiter)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("\n✓ Results exported to: {}\n", path.display());

    print_statistics(&RunStatistics::from_results(&results));

    Ok(())
}

/// Prints only the outcomes produced by the latest step
fn print_delta(progress: &Progress) {
    for outcome in &progress.new_results {
        println!("  {}", describe_outcome(outcome));
    }
    println!(
        "[{:>6.2}%] {}/{}",
        progress.progress_percent, progress.completed, progress.total
    );
}

fn describe_outcome(outcome: &UrlOutcome) -> String {
    if outcome.is_success() {
        format!(
            "{} {} ({} matches)",
            outcome.http_status,
            outcome.url,
            outcome.matches.len()
        )
    } else {
        format!("ERR {} {}", outcome.url, outcome.error)
    }
}
