//! Castnet main entry point
//!
//! This is the command-line interface for the Castnet actor/movie graph crawler.

use anyhow::{bail, Context};
use castnet::config::{load_config_with_hash, validate, Config, SeedEntry};
use castnet::crawler::run_crawl;
use castnet::output::{export_graph, format_report, load_statistics, print_statistics, write_json};
use castnet::storage::{ActorFilter, SqliteStorage, Storage};
use castnet::PageType;
use clap::{Parser, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Castnet: an actor/movie graph crawler
///
/// Castnet starts from seed actor or movie pages, extracts typed records,
/// follows the links between actors and the movies they appear in, and stores
/// the resulting graph in SQLite for later querying.
#[derive(Parser, Debug)]
#[command(name = "castnet")]
#[command(version)]
#[command(about = "An actor/movie graph crawler", long_about = None)]
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

    /// Crawl from this URL instead of the configured seeds
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Page type of --seed [default: actor]
    #[arg(long, value_enum, requires = "seed")]
    seed_type: Option<SeedType>,

    /// Stop after this many pages (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, group = "mode")]
    dry_run: bool,

    /// Show graph statistics from the database and exit
    #[arg(long, group = "mode")]
    stats: bool,

    /// Print actors matching a filter as JSON (repeatable; filters are OR-ed)
    #[arg(long, value_name = "QUERY", group = "mode")]
    query: Vec<String>,

    /// Print the actor with this name as JSON
    #[arg(long, value_name = "NAME", group = "mode")]
    actor: Option<String>,

    /// Export every stored record as JSON to this path
    #[arg(long, value_name = "PATH", group = "mode")]
    export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeedType {
    Actor,
    Movie,
}

impl From<SeedType> for PageType {
    fn from(seed_type: SeedType) -> Self {
        match seed_type {
            SeedType::Actor => PageType::Actor,
            SeedType::Movie => PageType::Movie,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if !cli.query.is_empty() {
        handle_query(&config, &cli.query)?;
    } else if let Some(name) = &cli.actor {
        handle_actor(&config, name)?;
    } else if let Some(path) = &cli.export {
        handle_export(&config, path)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("castnet=info,warn"),
            1 => EnvFilter::new("castnet=debug,info"),
            2 => EnvFilter::new("castnet=trace,debug"),
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

/// Applies command-line seed and page-limit overrides, revalidating the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(url) = &cli.seed {
        config.seeds = vec![SeedEntry {
            url: url.clone(),
            page_type: cli.seed_type.unwrap_or(SeedType::Actor).into(),
        }];
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    validate(config).context("invalid command-line override")?;
    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    if !path.exists() {
        bail!("database {} does not exist; run a crawl first", path.display());
    }
    Ok(SqliteStorage::new(path)?)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Castnet Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Download delay: {}ms", config.crawler.download_delay_ms);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );
    println!(
        "  Retries: {} (backoff {}ms)",
        config.crawler.max_retries, config.crawler.retry_backoff_ms
    );
    match config.crawler.max_pages {
        0 => println!("  Max pages: unlimited"),
        n => println!("  Max pages: {}", n),
    }
    println!("  Obey robots.txt: {}", config.crawler.obey_robots);

    println!("\nSite: {}", config.site.root);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Rotation: {:?}", config.user_agent.rotation);
    if config.user_agent.identities.is_empty() {
        println!("  Identities: built-in browser pool");
    } else {
        println!("  Identities ({}):", config.user_agent.identities.len());
        for identity in &config.user_agent.identities {
            println!("    * {}", identity);
        }
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {} {}", seed.page_type, seed.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --query mode: prints matching actors as JSON
fn handle_query(config: &Config, queries: &[String]) -> anyhow::Result<()> {
    let filters: Vec<ActorFilter> = queries.iter().map(|q| ActorFilter::parse(q)).collect();
    let storage = open_database(config)?;
    let actors = storage.find_actors(&filters)?;
    tracing::info!("{} actors match", actors.len());

    write_json(&actors, &mut io::stdout().lock())?;
    Ok(())
}

/// Handles the --actor mode: prints one actor as JSON
fn handle_actor(config: &Config, name: &str) -> anyhow::Result<()> {
    let storage = open_database(config)?;
    match storage.find_actor_by_name(name)? {
        Some(actor) => write_json(&actor, &mut io::stdout().lock())?,
        None => bail!("no actor named '{}'", name),
    }
    Ok(())
}

/// Handles the --export mode: writes every record to a JSON file
fn handle_export(config: &Config, path: &Path) -> anyhow::Result<()> {
    println!("=== Exporting Graph ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", path.display());
    println!();

    let storage = open_database(config)?;
    let graph = export_graph(&storage, path)
        .with_context(|| format!("failed to export to {}", path.display()))?;

    println!(
        "✓ Exported {} actors and {} movies",
        graph.actors.len(),
        graph.movies.len()
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} from {} seed(s)",
        config.site.root,
        config.seeds.len()
    );

    match run_crawl(config, config_hash).await {
        Ok(report) => {
            print!("{}", format_report(&report));
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
