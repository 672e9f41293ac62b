//! Magpie main entry point
//!
//! Command-line interface for the magpie social-graph crawler.

use anyhow::Context;
use clap::Parser;
use magpie::config::load_config_with_hash;
use magpie::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Magpie: a social-graph crawler for rate-limited APIs
///
/// Magpie expands outward from hashtag seed searches into users, follow
/// relationships, and content interactions, pacing every remote call
/// against the API's per-credential rate limits.
#[derive(Parser, Debug)]
#[command(name = "magpie")]
#[command(version)]
#[command(about = "A social-graph crawler for rate-limited APIs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete previously collected data before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    crawl(config, &config_hash, cli.fresh)
        .await
        .context("crawl failed")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("magpie=info,warn"),
            1 => EnvFilter::new("magpie=debug,info"),
            2 => EnvFilter::new("magpie=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &magpie::Config) {
    println!("=== Magpie Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Poll interval: {}ms", config.crawler.poll_interval_ms);
    println!("  Fan-out limit: {}", config.crawler.fanout_limit);
    println!(
        "  Status interval: {}s",
        config.crawler.status_interval_secs
    );

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Credentials: {}", config.api.bearer_tokens.len());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {} ({} items)", seed.hashtag, seed.count);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling from {} seed searches",
        config.seeds.len()
    );
}
