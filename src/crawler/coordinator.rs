//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires one crawl together:
//! - Opening storage and recording the run
//! - Loading robots.txt and settling the politeness delay
//! - Seeding the frontier and starting the item writer
//! - Running the worker pool until the frontier drains or an interrupt closes it
//! - Recording the final report on the run

use crate::config::Config;
use crate::crawler::emitter::{spawn_writer, Emitter, StorageSink};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher, RetryPolicy};
use crate::crawler::frontier::{Admission, Frontier};
use crate::crawler::identity::build_rotation;
use crate::crawler::politeness::{effective_delay, Politeness};
use crate::crawler::scheduler::{CrawlContext, Scheduler};
use crate::crawler::task::Task;
use crate::crawler::CrawlReport;
use crate::robots::fetch_robots;
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::url::ensure_on_site;
use crate::CastnetError;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    site_root: Url,
    seeds: Vec<Task>,
    fetcher: Arc<dyn PageFetcher>,
    storage: SqliteStorage,
    run_id: i64,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded on the run
    pub fn new(config: Config, config_hash: &str) -> Result<Self, CastnetError> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let fetcher = HttpFetcher::with_timeout(timeout)?;
        Self::with_fetcher(config, config_hash, Arc::new(fetcher))
    }

    /// Creates a coordinator that fetches through `fetcher`
    pub fn with_fetcher(
        config: Config,
        config_hash: &str,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, CastnetError> {
        let site_root = Url::parse(&config.site.root)?;
        let seeds = config
            .seeds
            .iter()
            .map(|seed| Ok(Task::new(ensure_on_site(&seed.url, &site_root)?, seed.page_type)))
            .collect::<Result<Vec<_>, CastnetError>>()?;

        let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let run_id = storage.create_run(config_hash)?;

        Ok(Self {
            config,
            site_root,
            seeds,
            fetcher,
            storage,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Runs the crawl until the frontier drains
    pub async fn run(self) -> Result<CrawlReport, CastnetError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the crawl until the frontier drains or `shutdown` resolves
    ///
    /// On shutdown the frontier is closed, in-flight fetches finish, and the run
    /// is recorded as interrupted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<CrawlReport, CastnetError>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let Self {
            config,
            site_root,
            seeds,
            fetcher,
            storage,
            run_id,
        } = self;
        let crawler = &config.crawler;

        tracing::info!("Starting crawl run {} of {}", run_id, site_root);

        let identities = build_rotation(&config.user_agent);
        let robots = if crawler.obey_robots {
            Some(fetch_robots(fetcher.as_ref(), &site_root, &identities.next_identity()).await)
        } else {
            None
        };

        let configured_delay = Duration::from_millis(crawler.download_delay_ms);
        let robots_delay = robots
            .as_ref()
            .and_then(|r| r.crawl_delay(&config.user_agent.crawler_name));
        let delay = effective_delay(configured_delay, robots_delay);
        if delay > configured_delay {
            tracing::info!("robots.txt raises the politeness delay to {:?}", delay);
        }

        let frontier = Arc::new(Frontier::new());
        if crawler.max_pages > 0 {
            frontier.limit_dispatches(crawler.max_pages);
        }
        let seeds_admitted = seeds
            .into_iter()
            .map(|seed| frontier.enqueue(seed))
            .filter(|admission| *admission == Admission::Accepted)
            .count() as u64;

        let (items, writer) = spawn_writer(StorageSink::new(storage, run_id));

        let context = CrawlContext {
            frontier: Arc::clone(&frontier),
            fetcher,
            identities,
            politeness: Politeness::new(delay),
            retry: RetryPolicy::new(
                crawler.max_retries,
                Duration::from_millis(crawler.retry_backoff_ms),
            ),
            robots,
            robots_agent: config.user_agent.crawler_name.clone(),
            site_root,
            emitter: Emitter::new(Arc::clone(&frontier), items),
        };
        let workers = usize::try_from(crawler.max_concurrent_fetches).unwrap_or(1);

        let crawl = Scheduler::new(context, workers).run();
        tokio::pin!(crawl);
        tokio::pin!(shutdown);

        let mut interrupted = false;
        let stats = tokio::select! {
            stats = &mut crawl => stats,
            _ = &mut shutdown => {
                tracing::warn!("Interrupt received, closing frontier and draining in-flight fetches");
                interrupted = true;
                frontier.close();
                crawl.await
            }
        };

        let (sink, written) = writer
            .await
            .map_err(|e| CastnetError::Writer(e.to_string()))?;
        let mut storage = sink.into_inner();

        let report = CrawlReport {
            pages_fetched: stats.pages_fetched,
            pages_failed: stats.pages_failed,
            robots_denied: stats.robots_denied,
            actors: written.actors,
            movies: written.movies,
            empty_records: written.empty,
            tasks_admitted: stats.tasks_admitted + seeds_admitted,
            tasks_duplicate: stats.tasks_duplicate,
            elapsed: started.elapsed(),
        };

        let status = if interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        storage.finish_run(run_id, status, &report)?;

        if written.failed > 0 {
            tracing::warn!("{} records could not be stored", written.failed);
        }
        tracing::info!(
            "Crawl run {} {}: {} pages fetched, {} failed in {:?}",
            run_id,
            status.to_db_string(),
            report.pages_fetched,
            report.pages_failed,
            report.elapsed
        );

        Ok(report)
    }
}

/// Runs a crawl over HTTP, stopping early on Ctrl-C
///
/// # Example
///
/// ```no_run
/// use castnet::config::load_config_with_hash;
/// use castnet::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("castnet.toml"))?;
/// let report = run_crawl(config, &hash).await?;
/// println!("{} pages", report.pages_fetched);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<CrawlReport, CastnetError> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run_until(interrupt()).await
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be watched
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
