//! Auto-Alert main entry point
//!
//! This is the command-line interface for the Auto-Alert monitoring engine.

use anyhow::Context;
use auto_alert::config::{load_config_with_hash, Config, TierKind};
use auto_alert::model::CriteriaFile;
use auto_alert::notify::OutboxNotifier;
use auto_alert::query::build_query;
use auto_alert::storage::{open_store, CriteriaStore};
use auto_alert::MonitoringScheduler;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Auto-Alert: a listing monitor for vehicle classifieds
///
/// Auto-Alert runs saved vehicle searches against a classifieds catalog on
/// tiered schedules, deduplicates what it finds and queues notifications for
/// new matches.
#[derive(Parser, Debug)]
#[command(name = "auto-alert")]
#[command(version = "1.0.0")]
#[command(about = "A polite listing monitor for vehicle classifieds", long_about = None)]
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

    /// Validate config and show the tiers and searches without fetching
    #[arg(long, conflicts_with_all = ["stats", "once", "import_searches"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "once", "import_searches"])]
    stats: bool,

    /// Run one batch of the named tier and exit
    #[arg(long, value_name = "TIER", conflicts_with_all = ["dry_run", "stats", "import_searches"])]
    once: Option<String>,

    /// Insert or update saved searches from a TOML file and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats", "once"])]
    import_searches: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config).await?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(tier) = cli.once.as_deref() {
        handle_once(&config, tier).await?;
    } else if let Some(path) = cli.import_searches.as_deref() {
        handle_import(&config, path).await?;
    } else {
        handle_monitor(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("auto_alert=info,warn"),
            1 => EnvFilter::new("auto_alert=debug,info"),
            2 => EnvFilter::new("auto_alert=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
async fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Auto-Alert Dry Run ===\n");

    println!("Engine:");
    println!("  Browsing contexts: {}", config.engine.max_concurrent);
    println!("  Request delay: {}ms", config.engine.request_delay);
    println!("  Timeout: {}ms", config.engine.timeout_ms);
    println!(
        "  Attempts per page: {} (backoff base {}ms)",
        config.engine.max_retries, config.engine.base_delay
    );
    println!("  Page cap: {}", config.engine.page_cap);
    println!("  Concurrent cycles: {}", config.engine.max_concurrent_cycles);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nTarget:");
    println!("  Base URL: {}", config.target.base_url);
    println!("  Respect robots.txt: {}", config.target.respect_robots);
    println!("  Proxies: {}", config.proxies.identities.len());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nTiers ({}):", config.tier.len());
    for tier in &config.tier {
        match tier.kind {
            TierKind::Monitor => {
                println!("  - {} [{}] urgency {}", tier.name, tier.cron, tier.urgency())
            }
            TierKind::Cleanup => println!(
                "  - {} [{}] cleanup after {} day(s)",
                tier.name, tier.cron, tier.retain_days
            ),
        }
    }

    let store = open_store(Path::new(&config.output.database_path))?;
    let base = url::Url::parse(&config.target.base_url)?;
    let mut total = 0;
    for tier in config.tier.iter().filter(|t| t.kind == TierKind::Monitor) {
        let searches = store.list_active(&tier.name).await?;
        if searches.is_empty() {
            continue;
        }
        println!("\nActive searches in {} ({}):", tier.name, searches.len());
        for search in &searches {
            println!(
                "  - #{} {} ({}): {}",
                search.id,
                search.name,
                search.user_id,
                build_query(search).page_url(&base, 1)
            );
        }
        total += searches.len();
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would monitor {} active search(es)", total);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use auto_alert::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --import-searches mode
async fn handle_import(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read searches from {}", path.display()))?;
    let file: CriteriaFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse searches in {}", path.display()))?;

    let store = open_store(Path::new(&config.output.database_path))?;

    let mut imported = 0;
    for spec in file.search {
        let criteria = spec.into_criteria()?;
        if config.tier(&criteria.tier).is_none() {
            tracing::warn!(
                "Search '{}' uses tier '{}', which is not configured",
                criteria.name,
                criteria.tier
            );
        }
        let id = store.upsert_criteria(&criteria).await?;
        tracing::info!("Imported search #{} {} ({})", id, criteria.name, criteria.user_id);
        imported += 1;
    }

    println!("✓ Imported {} search(es) from {}", imported, path.display());
    Ok(())
}

fn build_scheduler(config: &Config) -> Result<MonitoringScheduler, Box<dyn std::error::Error>> {
    let store = Arc::new(open_store(Path::new(&config.output.database_path))?);
    let notifier = Arc::new(OutboxNotifier::new(Arc::clone(&store)));
    Ok(MonitoringScheduler::from_config(config, store, notifier)?)
}

/// Handles the --once mode: one batch of one tier
async fn handle_once(config: &Config, tier: &str) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = build_scheduler(config)?;

    let report = scheduler.run_tier_once(tier).await;
    scheduler.shutdown().await;
    let report = report?;

    println!("=== Tier {} ===\n", report.tier);
    println!("  Searches run: {}", report.selected);
    println!("  Skipped (still running): {}", report.skipped);
    for cycle in &report.cycles {
        println!(
            "  - search #{} [{}]: {} page(s), {} found, {} new, {} notified{}",
            cycle.search_id,
            cycle.status,
            cycle.pages_fetched,
            cycle.vehicles_found,
            cycle.vehicles_new,
            cycle.vehicles_notified,
            cycle
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }
    if report.pruned_vehicles > 0 || report.pruned_cycles > 0 {
        println!(
            "  Pruned: {} vehicle(s), {} cycle record(s)",
            report.pruned_vehicles, report.pruned_cycles
        );
    }

    Ok(())
}

/// Handles the default mode: runs every tier on its schedule until ctrl-c
async fn handle_monitor(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Monitoring {} with {} tier(s)",
        config.target.base_url,
        config.tier.len()
    );

    let scheduler = build_scheduler(config)?;
    scheduler.start().await?;

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Interrupt received"),
        Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
    }

    scheduler.shutdown().await;
    tracing::info!("Monitoring stopped");
    Ok(())
}
