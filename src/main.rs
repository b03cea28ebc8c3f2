//! dspider main entry point
//!
//! This is the command-line interface for the Kickstarter scraper and its
//! report tool.

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use dspider::config::{load_config_with_hash, validate, Config};
use dspider::crawler::build_http_client;
use dspider::kickstarter::{discover_pattern, seed_urls};
use dspider::output::{generate_report, ReportOptions, DEFAULT_COLUMNS};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// dspider: a pattern-routed crawler for the Kickstarter discover API
#[derive(Parser, Debug)]
#[command(name = "dspider")]
#[command(version)]
#[command(about = "Crawl Kickstarter projects into SQLite and export reports", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl finished projects into a SQLite database
    Crawl(CrawlArgs),

    /// Export a crawl database as per-group CSV files with monthly statistics
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Path to TOML configuration file; defaults apply without one
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent crawl workers
    #[arg(long)]
    max_concurrent_crawls: Option<usize>,

    /// Retries after a failed fetch
    #[arg(long)]
    max_crawl_retries: Option<u32>,

    /// Delay between fetch attempts in milliseconds
    #[arg(long)]
    crawl_retry_interval_ms: Option<u64>,

    /// SQLite database to write (default: kickstarter-YYYYMMDD.sqlite3)
    #[arg(long)]
    output_file: Option<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// SQLite database to read
    #[arg(long)]
    db_name: PathBuf,

    /// Table to export
    #[arg(long, default_value = "projects")]
    table: String,

    /// Comma-separated columns to export
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_COLUMNS.map(String::from))]
    columns: Vec<String>,

    /// Comma-separated columns naming a row's group
    #[arg(long, value_delimiter = ',', default_value = "slug")]
    group_by: Vec<String>,

    /// Prefix of the output files
    #[arg(long, default_value = "kickstarter")]
    output_base: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Crawl(args) => handle_crawl(args).await,
        Command::Report(args) => handle_report(args),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dspider=info,warn"),
            1 => EnvFilter::new("dspider=debug,info"),
            2 => EnvFilter::new("dspider=trace,debug"),
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

/// Loads the configuration file, if any, and applies command-line overrides
fn load_config(args: &CrawlArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(workers) = args.max_concurrent_crawls {
        config.spider.max_concurrent_crawls = workers;
    }
    if let Some(retries) = args.max_crawl_retries {
        config.spider.max_crawl_retries = retries;
    }
    if let Some(interval) = args.crawl_retry_interval_ms {
        config.spider.crawl_retry_interval_ms = interval;
    }
    if let Some(output) = &args.output_file {
        config.output.database_path = Some(output.clone());
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Database path from the config, or a dated default
fn database_path(config: &Config) -> PathBuf {
    match &config.output.database_path {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!(
            "kickstarter-{}.sqlite3",
            Local::now().format("%Y%m%d")
        )),
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    let seeds = seed_urls(&config.kickstarter);

    println!("=== dspider Dry Run ===\n");

    println!("Spider Configuration:");
    println!("  Workers: {}", config.spider.max_concurrent_crawls);
    println!("  Retries: {}", config.spider.max_crawl_retries);
    println!("  Retry interval: {}ms", config.spider.crawl_retry_interval_ms);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nOutput:");
    println!("  Database: {}", database_path(config).display());

    println!("\nRoutes:");
    println!("  Parser: {}", discover_pattern(&config.kickstarter.base_url));
    println!("  Storage: {}", config.kickstarter.project_url_pattern);

    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the crawl subcommand
async fn handle_crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    if args.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let client =
        build_http_client(&config.user_agent).context("Failed to build HTTP client")?;
    let database = database_path(&config);
    tracing::info!(
        "Crawling {} categories into {}",
        config.kickstarter.categories.len(),
        database.display()
    );

    match dspider::kickstarter::crawl(&config, client, &database).await {
        Ok(stats) => {
            tracing::info!(
                "Crawl completed successfully: {} pages fetched, {} projects stored",
                stats.fetched,
                stats.stored
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the report subcommand
fn handle_report(args: ReportArgs) -> anyhow::Result<()> {
    let options = ReportOptions {
        db_name: args.db_name,
        table: args.table,
        columns: args.columns,
        group_by: args.group_by,
        output_base: args.output_base,
    };

    tracing::info!("Exporting '{}' from {}", options.table, options.db_name.display());
    let summary = generate_report(&options)
        .with_context(|| format!("Failed to export {}", options.db_name.display()))?;

    println!(
        "✓ Exported {} rows in {} groups",
        summary.rows,
        summary.groups.len()
    );
    for file in &summary.files {
        println!("  - {}", file.display());
    }

    Ok(())
}
