//! Catalog-Sweep main entry point
//!
//! This is the command-line interface for the Catalog-Sweep query-space crawler.

use anyhow::Context;
use catalog_sweep::config::{load_config_with_hash, Config};
use catalog_sweep::crawler::PageProgress;
use catalog_sweep::lookup::{harvest_ids, parse_id_list};
use catalog_sweep::output::{print_crawl_summary, print_lookup_summary, write_report};
use catalog_sweep::provider::{CredentialProvider, HttpSearchProvider, StaticCredentials};
use catalog_sweep::{crawl, CrawlOptions, LookupPool};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Sweep: an adaptive query-space crawler
///
/// Catalog-Sweep enumerates a product catalog that can only be searched by
/// paging keyword and prefix queries, splitting queries whose results look
/// truncated into longer ones. It can also resolve harvested identifiers
/// back to full records.
#[derive(Parser, Debug)]
#[command(name = "catalog-sweep")]
#[command(version)]
#[command(about = "An adaptive query-space crawler for search-only catalogs", long_about = None)]
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

    /// Validate config and show what would be crawled without making any call
    #[arg(long)]
    dry_run: bool,

    /// Resolve the identifiers in FILE (one per line, or an .html listing) instead of crawling
    #[arg(long, value_name = "FILE")]
    resolve: Option<PathBuf>,

    /// Where to write the JSON report (overrides output.report-path)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.report_path));

    let credentials: Arc<dyn CredentialProvider> = match &config.api.token_env {
        Some(var) => Arc::new(StaticCredentials::from_env(var)?),
        None => Arc::new(StaticCredentials::none()),
    };
    let provider = Arc::new(
        HttpSearchProvider::new(&config.api, credentials)
            .context("Failed to build the search API client")?,
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match &cli.resolve {
        Some(ids_path) => {
            handle_resolve(&config, &config_hash, provider, ids_path, &output_path, cancel).await
        }
        None => handle_crawl(&config, &config_hash, provider.as_ref(), &output_path, cancel).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_sweep=info,warn"),
            1 => EnvFilter::new("catalog_sweep=debug,info"),
            2 => EnvFilter::new("catalog_sweep=trace,debug"),
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

/// Cancels the running crawl or lookup on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            cancel.cancel();
        }
    });
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawl_config = &config.crawl;

    println!("=== Catalog-Sweep Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Location: {}", crawl_config.location_id);
    println!("  Page size: {}", crawl_config.page_size);
    println!("  Expansion threshold: {}", crawl_config.expansion_threshold);
    println!("  Max depth: {}", crawl_config.max_depth);
    println!("  Max pages per query: {}", crawl_config.max_pages);
    println!("  Min term length: {}", crawl_config.min_term_length);
    println!(
        "  Expansion alphabet: {} ({} symbols)",
        crawl_config.expansion_alphabet,
        crawl_config.expansion_alphabet.chars().count()
    );
    match crawl_config.max_nodes {
        Some(max) => println!("  Node cap: {}", max),
        None => println!("  Node cap: none"),
    }
    println!("  On node failure: {:?}", crawl_config.on_node_failure);

    println!("\nLookup:");
    println!(
        "  Concurrency: {} (max {})",
        config.lookup.concurrency, config.lookup.max_concurrency
    );
    println!(
        "  Id selector: {} [{}]",
        config.lookup.id_selector, config.lookup.id_attribute
    );

    println!("\nAPI:");
    println!("  Endpoint: {}{}", config.api.base_url, config.api.search_path);
    println!(
        "  Timeout: {}s, retries: {}",
        config.api.timeout_secs, config.api.max_retries
    );

    println!("\nOutput:");
    println!("  Report: {}", config.output.report_path);

    println!("\nSeeds ({}):", crawl_config.seeds.len());
    for seed in &crawl_config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would create at most {} query nodes",
        crawl_config.max_nodes
            .map(|max| (max as u64).min(crawl_config.worst_case_nodes()))
            .unwrap_or_else(|| crawl_config.worst_case_nodes())
    );
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    provider: &HttpSearchProvider,
    output_path: &Path,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, location: {}",
        config.crawl.seeds.join(", "),
        config.crawl.location_id
    );

    let options = CrawlOptions::new()
        .with_cancellation(cancel)
        .with_progress(Arc::new(|progress: &PageProgress| {
            tracing::trace!(
                "Fetched page {} of '{}' (depth {})",
                progress.page,
                progress.query,
                progress.depth
            );
        }));

    let report = crawl(provider, &config.crawl, options)
        .await
        .context("Crawl failed")?;

    write_report(&report, config_hash, output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    print_crawl_summary(&report);
    println!("\n✓ Report written to: {}", output_path.display());

    Ok(())
}

/// Handles the --resolve mode: looks up every identifier in a file
async fn handle_resolve(
    config: &Config,
    config_hash: &str,
    provider: Arc<HttpSearchProvider>,
    ids_path: &Path,
    output_path: &Path,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(ids_path)
        .with_context(|| format!("Failed to read {}", ids_path.display()))?;

    let is_html = ids_path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));

    let ids = if is_html {
        harvest_ids(
            &content,
            &config.lookup.id_selector,
            &config.lookup.id_attribute,
        )?
    } else {
        parse_id_list(&content)
    };
    tracing::info!("Read {} identifiers from {}", ids.len(), ids_path.display());

    let pool = LookupPool::new(provider, config.lookup.clone()).with_cancellation(cancel);
    let outcomes = pool.resolve(&ids, &config.crawl.location_id).await;

    write_report(&outcomes, config_hash, output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    print_lookup_summary(&outcomes);
    println!("\n✓ Report written to: {}", output_path.display());

    Ok(())
}
