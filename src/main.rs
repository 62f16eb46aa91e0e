//! Placeharvest main entry point
//!
//! This is the command-line interface for the placeharvest collection
//! pipeline.

use clap::Parser;
use std::path::{Path, PathBuf};

use placeharvest::checkpoint::CheckpointStore;
use placeharvest::config::{load_config_with_hash, Config};
use placeharvest::dedup::DedupIndex;
use placeharvest::executor::HttpExecutor;
use placeharvest::output::SavedCollection;
use placeharvest::phases::Pipeline;
use placeharvest::recovery;
use tracing_subscriber::EnvFilter;

const SEEN_PLACES_FILE: &str = "seen_places.json";
const PLACES_FILE: &str = "places.json";
const RECOVERY_PLACES_FILE: &str = "recovery_places.json";

/// Placeharvest: a resumable two-phase place-data collection pipeline
///
/// Placeharvest discovers places through batched search queries, fetches
/// their details, and persists everything through flat-file checkpoints
/// so an interrupted run resumes with at most one batch of lost work.
#[derive(Parser, Debug)]
#[command(name = "placeharvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable place-data collection pipeline", long_about = None)]
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

    /// JSON file of search query strings for the main run
    #[arg(long, value_name = "FILE")]
    queries: Option<PathBuf>,

    /// Skip the search phase (process the existing pending queue only)
    #[arg(long)]
    skip_search: bool,

    /// Skip the details phase (collect links only)
    #[arg(long)]
    skip_details: bool,

    /// Validate config, show persisted-state counts, and exit
    #[arg(long, conflicts_with_all = ["reset", "seed_queries", "seed_links", "reconcile"])]
    dry_run: bool,

    /// Clear all checkpoint state (saved places are kept)
    #[arg(long, conflicts_with_all = ["seed_queries", "seed_links", "reconcile"])]
    reset: bool,

    /// Replay an external query file through a recovery namespace
    #[arg(long, value_name = "FILE", conflicts_with_all = ["seed_links", "reconcile"])]
    seed_queries: Option<PathBuf>,

    /// Seed a recovery namespace's pending queue from an external link file
    #[arg(long, value_name = "FILE", conflicts_with = "reconcile")]
    seed_links: Option<PathBuf>,

    /// Re-fetch places that were seen but never saved
    #[arg(long)]
    reconcile: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
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

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.reset {
        handle_reset(&config)?;
    } else if let Some(file) = &cli.seed_queries {
        handle_seed_queries(&config, file).await?;
    } else if let Some(file) = &cli.seed_links {
        handle_seed_links(&config, file).await?;
    } else if cli.reconcile {
        handle_reconcile(&config).await?;
    } else {
        handle_run(&config, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("placeharvest=info,warn"),
            1 => EnvFilter::new("placeharvest=debug,info"),
            2 => EnvFilter::new("placeharvest=trace,debug"),
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

fn seen_places_path(config: &Config) -> PathBuf {
    Path::new(&config.storage.checkpoint_dir).join(SEEN_PLACES_FILE)
}

fn places_path(config: &Config) -> PathBuf {
    Path::new(&config.storage.output_dir).join(PLACES_FILE)
}

/// Builds a pipeline over the given checkpoint namespace and collection
/// file; the dedup index is always the canonical one
fn build_pipeline(
    config: &Config,
    checkpoint_dir: PathBuf,
    collection_path: PathBuf,
) -> anyhow::Result<Pipeline<HttpExecutor>> {
    let store = CheckpointStore::new(checkpoint_dir)?;
    let dedup = DedupIndex::open(seen_places_path(config));
    let collection = SavedCollection::load(collection_path);
    let executor = HttpExecutor::new(&config.fetch, config.pipeline.min_rating)?;
    Ok(Pipeline::new(
        store,
        dedup,
        collection,
        executor,
        config.pipeline.clone(),
    ))
}

fn recovery_pipeline(
    config: &Config,
) -> anyhow::Result<Pipeline<HttpExecutor>> {
    build_pipeline(
        config,
        recovery::recovery_namespace(&config.storage.checkpoint_dir),
        Path::new(&config.storage.output_dir).join(RECOVERY_PLACES_FILE),
    )
}

/// Handles the normal run: search, details, retry
async fn handle_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let queries = match &cli.queries {
        Some(path) => recovery::load_seed_queries(path)?,
        None if cli.skip_search => Vec::new(),
        None => anyhow::bail!("--queries FILE is required unless --skip-search is set"),
    };

    let mut pipeline = build_pipeline(
        config,
        PathBuf::from(&config.storage.checkpoint_dir),
        places_path(config),
    )?;
    pipeline.run(&queries, cli.skip_search, cli.skip_details).await;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows persisted state
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Placeharvest Dry Run ===\n");

    println!("Pipeline Configuration:");
    println!("  Search batch size: {}", config.pipeline.search_batch_size);
    println!("  Details batch size: {}", config.pipeline.details_batch_size);
    println!("  Batch delay: {}ms", config.pipeline.batch_delay_ms);
    println!(
        "  Empty-batch halt threshold: {}",
        config.pipeline.empty_batch_halt_threshold
    );
    println!(
        "  Error-rate bound: {:.0}% over {} batches",
        config.pipeline.error_rate_threshold * 100.0,
        config.pipeline.error_rate_batch_limit
    );
    println!("  Minimum rating: {:.1}", config.pipeline.min_rating);

    println!("\nFetch:");
    println!("  Search endpoint: {}", config.fetch.search_endpoint);
    println!("  Request timeout: {}ms", config.fetch.request_timeout_ms);
    println!("  User agent: {}", config.fetch.user_agent);

    println!("\nStorage:");
    println!("  Checkpoints: {}", config.storage.checkpoint_dir);
    println!("  Output: {}", config.storage.output_dir);

    let mut store = CheckpointStore::new(&config.storage.checkpoint_dir)?;
    let stats = store.stats();
    let dedup = DedupIndex::open(seen_places_path(config));
    let collection = SavedCollection::load(places_path(config));

    println!("\nPersisted State:");
    println!("  Phase: {}", stats.phase);
    println!("  Completed searches: {}", stats.completed_searches);
    println!("  Pending links: {}", stats.pending_links);
    println!("  Saved places: {}", collection.len());
    println!("  Recorded failures: {}", stats.failures);
    println!("  Seen identities: {}", dedup.count());

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --reset mode: clears checkpoint state and the dedup index
fn handle_reset(config: &Config) -> anyhow::Result<()> {
    let mut store = CheckpointStore::new(&config.storage.checkpoint_dir)?;
    store.reset();

    let mut dedup = DedupIndex::open(seen_places_path(config));
    dedup.clear();
    dedup.save();

    println!("Checkpoint state cleared: {}", config.storage.checkpoint_dir);
    println!("Saved places were NOT touched: {}", places_path(config).display());
    Ok(())
}

/// Handles the --seed-queries mode: replay a query file through a
/// recovery namespace
async fn handle_seed_queries(
    config: &Config,
    file: &Path,
) -> anyhow::Result<()> {
    let mut pipeline = recovery_pipeline(config)?;
    let mut canonical = SavedCollection::load(places_path(config));
    let merged = recovery::replay_queries(&mut pipeline, &mut canonical, file, false).await?;
    println!("Replay complete: {} new places merged", merged);
    Ok(())
}

/// Handles the --seed-links mode: pre-seed a recovery queue and fetch
async fn handle_seed_links(
    config: &Config,
    file: &Path,
) -> anyhow::Result<()> {
    let mut pipeline = recovery_pipeline(config)?;
    let mut canonical = SavedCollection::load(places_path(config));
    let merged = recovery::seed_links(&mut pipeline, &mut canonical, file).await?;
    println!("Seed-links run complete: {} new places merged", merged);
    Ok(())
}

/// Handles the --reconcile mode: re-fetch seen-but-unsaved places
async fn handle_reconcile(config: &Config) -> anyhow::Result<()> {
    let mut main_store = CheckpointStore::new(&config.storage.checkpoint_dir)?;
    let main_pending = main_store.get_pending_links().to_vec();
    let recovered_path =
        Path::new(&config.storage.checkpoint_dir).join(recovery::RECOVERED_IDS_FILE);

    let dedup = DedupIndex::open(seen_places_path(config));
    let executor = HttpExecutor::new(&config.fetch, config.pipeline.min_rating)?;
    let mut canonical = SavedCollection::load(places_path(config));
    let report = recovery::reconcile(
        &executor,
        &config.pipeline,
        &dedup,
        &mut canonical,
        &main_pending,
        &recovered_path,
    )
    .await?;
    println!(
        "Reconciliation complete: {} candidates, {} visited, {} new places merged{}",
        report.candidates,
        report.visited,
        report.merged,
        if report.halted_early { " (halted early)" } else { "" }
    );
    Ok(())
}
