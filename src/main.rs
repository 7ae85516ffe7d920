//! tue-ripple command-line entry point.

use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tue_ripple::config::{
    apply_overrides, load_config_with_hash, CliOverrides, Config,
};
use tue_ripple::crawler::{run_crawl, run_fresh_crawl, CrawlOutcome};
use tue_ripple::output::{
    generate_markdown_summary, generate_summary, load_statistics, print_statistics,
};
use tue_ripple::storage::SqliteStorage;

/// tue-ripple: a polite, focused web crawler for English-language pages
/// about Tübingen.
#[derive(Parser, Debug)]
#[command(name = "tue-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A polite, focused web crawler", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Additional seed URLs, on top of the config file's quality list.
    #[arg(long = "seeds", value_name = "URL")]
    seeds: Vec<String>,

    /// Overall page budget for this run.
    #[arg(long = "max-pages", value_name = "N")]
    max_pages: Option<u32>,

    /// Baseline per-host delay, in milliseconds.
    #[arg(long = "delay", value_name = "MS")]
    delay: Option<u64>,

    /// Per-host politeness delay, in seconds (alternate unit to --delay).
    #[arg(long = "domain-delay", value_name = "S")]
    domain_delay: Option<f64>,

    /// Per-request HTTP timeout, in seconds.
    #[arg(long = "timeout", value_name = "S")]
    timeout: Option<u64>,

    /// Path to the SQLite database.
    #[arg(long = "db", value_name = "PATH")]
    db: Option<PathBuf>,

    /// Full `pages` table CSV export path.
    #[arg(long = "csv", value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Run multiple concurrent fetch workers against the same frontier.
    #[arg(long)]
    multiprocessing: bool,

    /// Worker count when --multiprocessing is set.
    #[arg(long = "max-workers", value_name = "W")]
    max_workers: Option<u32>,

    /// Frontier entries dispensed per batch.
    #[arg(long = "urls-per-batch", value_name = "B")]
    urls_per_batch: Option<u32>,

    /// Outbound HTTP/HTTPS proxy.
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// UTEMA smoothing factor, applied to both the distress check and the
    /// scorer.
    #[arg(long = "utema-beta", value_name = "F")]
    utema_beta: Option<f64>,

    /// Ignore any prior run and start from an empty frontier.
    #[arg(long = "fresh-start")]
    fresh_start: bool,

    /// Wipe persisted frontier state and exit, without crawling.
    #[arg(long = "clear-state", conflicts_with_all = ["dry_run", "stats", "export_summary"])]
    clear_state: bool,

    /// Validate configuration and print what would be crawled, then exit.
    #[arg(long = "dry-run", conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Print statistics from the database and exit.
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Write the markdown run summary from existing data and exit.
    #[arg(long = "export-summary", conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            seeds: self.seeds.clone(),
            max_pages: self.max_pages,
            delay_ms: self.delay,
            timeout_secs: self.timeout,
            db_path: self.db.as_ref().map(|p| p.display().to_string()),
            csv_path: self.csv.as_ref().map(|p| p.display().to_string()),
            multiprocessing: self.multiprocessing.then_some(true),
            max_workers: self.max_workers,
            urls_per_batch: self.urls_per_batch,
            domain_delay_ms: self.domain_delay.map(|secs| (secs * 1000.0) as u64),
            proxy: self.proxy.clone(),
            utema_beta: self.utema_beta,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!(config = %cli.config.display(), "loading configuration");
    let (mut config, config_hash) = load_config_with_hash(&cli.config)?;
    apply_overrides(&mut config, &cli.to_overrides());
    tracing::info!(hash = %config_hash, "configuration loaded");

    if cli.clear_state {
        return handle_clear_state(&config);
    }
    if cli.dry_run {
        return handle_dry_run(&config);
    }
    if cli.stats {
        return handle_stats(&config);
    }
    if cli.export_summary {
        return handle_export_summary(&config);
    }

    handle_crawl(config, cli.fresh_start).await
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tue_ripple=info,warn"),
            1 => EnvFilter::new("tue_ripple=debug,info"),
            2 => EnvFilter::new("tue_ripple=trace,debug"),
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

/// Wipes the persisted frontier, leaving the pages/errors history intact.
/// The `Storage` trait has no whole-database wipe, so "clear state" is
/// scoped to the one piece of state a fresh run actually needs gone.
fn handle_clear_state(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tue_ripple::storage::Storage;

    println!("Clearing frontier state in: {}", config.output.database_path);
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    storage.clear_frontier()?;
    println!("Done.");
    Ok(())
}

fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== tue-ripple Dry Run ===\n");

    println!("Crawler configuration:");
    println!("  max depth:            {}", config.crawler.max_depth);
    println!("  max parallel fetches: {}", config.crawler.max_parallel);
    println!("  domain delay (ms):    {}", config.crawler.domain_delay_ms);
    println!("  domain crawl ceiling: {}", config.crawler.domain_crawl_ceiling);
    println!("  max pages:            {}", config.crawler.max_pages);
    println!("  urls per batch:       {}", config.crawler.urls_per_batch);
    println!("  request timeout (s):  {}", config.crawler.request_timeout_secs);
    println!("  utema beta:           {}", config.crawler.utema_beta);
    println!("  scorer utema beta:    {}", config.crawler.scorer_utema_beta);
    println!("  multiprocessing:      {}", config.crawler.multiprocessing);
    if config.crawler.multiprocessing {
        println!("  max workers:          {}", config.crawler.max_workers);
    }
    if let Some(proxy) = &config.crawler.proxy {
        println!("  proxy:                {proxy}");
    }

    println!("\nUser agent:");
    println!("  name:    {}", config.user_agent.crawler_name);
    println!("  version: {}", config.user_agent.crawler_version);
    println!("  contact: {} ({})", config.user_agent.contact_url, config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  database: {}", config.output.database_path);
    println!("  summary:  {}", config.output.summary_path);
    if let Some(csv) = &config.output.csv_path {
        println!("  csv:      {csv}");
    }

    println!("\nQuality domains ({}):", config.quality.len());
    for entry in &config.quality {
        println!("  - {} ({} seeds)", entry.domain, entry.seeds.len());
    }

    println!("\nBlacklisted domains ({}):", config.blacklist.len());
    for entry in &config.blacklist {
        println!("  - {}", entry.domain);
    }

    let seed_count: usize = config.quality.iter().map(|q| q.seeds.len()).sum();
    println!("\nConfiguration is valid. Would start with {seed_count} seed URLs.");
    Ok(())
}

fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);
    Ok(())
}

fn handle_export_summary(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tue_ripple::storage::Storage;

    println!("Database: {}", config.output.database_path);
    println!("Summary:  {}", config.output.summary_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let run = storage
        .get_latest_run()?
        .ok_or("no crawl run found in this database")?;
    let summary = generate_summary(&storage, run.id)?;
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    println!("Summary written.");
    Ok(())
}

/// Runs a crawl to completion, reading interactive console commands from
/// stdin (`stop`/`quit`/`exit`, `stats`, `help`) alongside it.
async fn handle_crawl(config: Config, fresh_start: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.output.database_path.clone();
    let summary_path = config.output.summary_path.clone();

    tracing::info!(
        fresh_start,
        quality_domains = config.quality.len(),
        blacklisted_domains = config.blacklist.len(),
        "starting crawl"
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut crawl_handle: tokio::task::JoinHandle<tue_ripple::Result<CrawlOutcome>> =
        tokio::spawn(async move {
            if fresh_start {
                run_fresh_crawl(config, Some(stop_rx)).await
            } else {
                run_crawl(config, Some(stop_rx)).await
            }
        });

    println!("Crawl started. Console commands: stop, stats, help.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_closed = false;

    let outcome = loop {
        tokio::select! {
            biased;

            result = &mut crawl_handle => {
                break result.map_err(|e| format!("crawl task panicked: {e}"))??;
            }

            line = lines.next_line(), if !stdin_closed => {
                match line {
                    Ok(Some(command)) => handle_console_command(command.trim(), &db_path, &stop_tx),
                    Ok(None) => stdin_closed = true,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read error, disabling console");
                        stdin_closed = true;
                    }
                }
            }
        }
    };

    println!(
        "Crawl finished: {:?}, {} pages crawled (run {}).",
        outcome.status, outcome.pages_crawled, outcome.run_id
    );

    if let Ok(storage) = SqliteStorage::new(Path::new(&db_path)) {
        if let Ok(summary) = generate_summary(&storage, outcome.run_id) {
            if let Err(e) = generate_markdown_summary(&summary, Path::new(&summary_path)) {
                tracing::warn!(error = %e, "failed to write final markdown summary");
            }
        }
    }

    Ok(())
}

fn handle_console_command(command: &str, db_path: &str, stop_tx: &watch::Sender<bool>) {
    match command {
        "stop" | "quit" | "exit" => {
            println!("Stopping crawl (draining in-flight fetches)...");
            let _ = stop_tx.send(true);
        }
        "stats" => match SqliteStorage::new(Path::new(db_path)) {
            Ok(storage) => match load_statistics(&storage) {
                Ok(stats) => print_statistics(&stats),
                Err(e) => println!("failed to load statistics: {e}"),
            },
            Err(e) => println!("failed to open database: {e}"),
        },
        "help" => {
            println!("Commands: stop|quit|exit (shut down gracefully), stats, help");
        }
        "" => {}
        other => println!("unknown command: {other} (try: stop, stats, help)"),
    }
}
