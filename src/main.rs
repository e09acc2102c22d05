//! Repro-Harvest main entry point
//!
//! This is the command-line interface for the reproducibility catalog harvester.

use anyhow::Context;
use clap::Parser;
use repro_harvest::config::{load_config_with_hash, validate, Config};
use repro_harvest::crawler::crawl;
use repro_harvest::output::{load_statistics, print_statistics, print_summary};
use repro_harvest::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Repro-Harvest: a catalog harvester for reproducibility packages
///
/// Repro-Harvest walks the paginated catalog, follows every project to its
/// related-materials page, downloads the PDF and ZIP assets it links to,
/// and records each project in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "repro-harvest")]
#[command(version)]
#[command(about = "A catalog harvester for reproducibility packages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of catalog pages to visit (overrides the config)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using built-in defaults"),
    }
    let (mut config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("Failed to load configuration")?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
        validate(&config).context("Invalid --max-pages")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("repro_harvest=info,warn"),
            1 => EnvFilter::new("repro_harvest=debug,info"),
            2 => EnvFilter::new("repro_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Repro-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Catalog URL: {}", config.crawler.catalog_url);
    println!("  Pages: {} starting at {}", config.crawler.max_pages, config.crawler.start_page);
    println!("  Detail suffix: {}", config.crawler.detail_suffix);
    println!("  Detail concurrency: {}", config.crawler.detail_concurrency);
    println!("  Download concurrency: {}", config.crawler.download_concurrency);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Render JavaScript: {}", config.crawler.render_javascript);

    println!("\nAllowed Domains ({}):", config.crawler.allowed_domains.len());
    for domain in &config.crawler.allowed_domains {
        println!("  - {}", domain);
    }

    println!("\nPacing:");
    println!(
        "  Delay: {}-{}ms",
        config.pacing.min_delay_ms, config.pacing.max_delay_ms
    );
    println!(
        "  Backoff: {}ms base, {}ms cap",
        config.pacing.backoff_base_ms, config.pacing.backoff_max_ms
    );

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  User agents: {}", config.fetch.user_agents.len());
    println!("  Referers: {}", config.fetch.referers.len());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Storage root: {}", config.output.storage_root);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would visit at most {} catalog pages",
        config.crawler.max_pages
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting up to {} catalog pages into {}",
        config.crawler.max_pages,
        config.output.database_path
    );

    match crawl(config).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
