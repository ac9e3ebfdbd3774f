//! Fetch scheduler: a fixed pool of workers draining the frontier
//!
//! Each worker repeatedly takes a task, checks robots.txt, fetches the page
//! under the shared politeness delay, routes the markup to the extractor for the
//! task's page type and emits the result. Workers share nothing but the
//! frontier, the politeness slot and a few counters.

use crate::crawler::emitter::Emitter;
use crate::crawler::fetcher::{fetch_with_retry, PageFetcher, RetryPolicy};
use crate::crawler::frontier::Frontier;
use crate::crawler::identity::IdentityRotation;
use crate::crawler::politeness::Politeness;
use crate::crawler::task::Task;
use crate::extract::{classify, PageContext};
use crate::robots::ParsedRobots;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Everything a worker needs, shared by all workers of one crawl
pub struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub identities: Arc<dyn IdentityRotation>,
    pub politeness: Politeness,
    pub retry: RetryPolicy,
    /// Rules to obey, or None to fetch everything
    pub robots: Option<ParsedRobots>,
    /// Product token matched against robots.txt groups
    pub robots_agent: String,
    pub site_root: Url,
    pub emitter: Emitter,
}

/// Counters collected while the pool runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub pages_fetched: u64,
    pub pages_failed: u64,
    pub robots_denied: u64,
    pub tasks_admitted: u64,
    pub tasks_duplicate: u64,
}

#[derive(Debug, Default)]
struct Counters {
    pages_fetched: AtomicU64,
    pages_failed: AtomicU64,
    robots_denied: AtomicU64,
    tasks_admitted: AtomicU64,
    tasks_duplicate: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            robots_denied: self.robots_denied.load(Ordering::Relaxed),
            tasks_admitted: self.tasks_admitted.load(Ordering::Relaxed),
            tasks_duplicate: self.tasks_duplicate.load(Ordering::Relaxed),
        }
    }
}

/// Runs the worker pool until the frontier is drained or closed
pub struct Scheduler {
    context: Arc<CrawlContext>,
    workers: usize,
}

impl Scheduler {
    pub fn new(context: CrawlContext, workers: usize) -> Self {
        Self {
            context: Arc::new(context),
            workers: workers.max(1),
        }
    }

    /// Runs all workers to completion
    ///
    /// Dropping the context on return closes the item stream.
    pub async fn run(self) -> SchedulerStats {
        let counters = Arc::new(Counters::default());
        let mut pool = JoinSet::new();

        for worker_id in 0..self.workers {
            let context = Arc::clone(&self.context);
            let counters = Arc::clone(&counters);
            pool.spawn(async move { run_worker(worker_id, context, counters).await });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }

        counters.snapshot()
    }
}

async fn run_worker(worker_id: usize, context: Arc<CrawlContext>, counters: Arc<Counters>) {
    tracing::debug!("Worker {} started", worker_id);

    while let Some(task) = context.frontier.next_task().await {
        let _dispatched = Completion(&context.frontier);
        process_task(&context, &counters, &task).await;
    }

    tracing::debug!("Worker {} finished", worker_id);
}

/// Marks a dispatched task complete when dropped, including on unwind
struct Completion<'a>(&'a Frontier);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Fetch, classify, extract and emit one task
async fn process_task(context: &CrawlContext, counters: &Counters, task: &Task) {
    if let Some(robots) = &context.robots {
        if !robots.is_allowed(task.target(), &context.robots_agent) {
            tracing::info!("{} disallowed by robots.txt", task.target());
            counters.robots_denied.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }

    tracing::debug!("Fetching {}", task);
    let page = match fetch_with_retry(
        context.fetcher.as_ref(),
        task.target(),
        context.identities.as_ref(),
        &context.politeness,
        &context.retry,
    )
    .await
    {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Dropping {}: {}", task, e);
            counters.pages_failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let fetched = counters.pages_fetched.fetch_add(1, Ordering::Relaxed) + 1;
    if page.final_url != *task.target() {
        tracing::debug!("{} redirected to {}", task.target(), page.final_url);
    }

    let extraction = classify(task.page_type()).extract(&PageContext {
        html: &page.body,
        url: task.target(),
        site_root: &context.site_root,
    });

    context.emitter.emit_item(extraction.item);
    let stats = context.emitter.emit_tasks(extraction.children);
    counters
        .tasks_admitted
        .fetch_add(stats.admitted, Ordering::Relaxed);
    counters
        .tasks_duplicate
        .fetch_add(stats.duplicate, Ordering::Relaxed);

    if fetched % 10 == 0 {
        tracing::info!(
            "Progress: {} pages fetched, {} pending, {} in flight",
            fetched,
            context.frontier.pending_len(),
            context.frontier.in_flight()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::emitter::spawn_writer;
    use crate::crawler::fetcher::{FetchError, FetchedPage};
    use crate::crawler::identity::FixedIdentity;
    use crate::item::Item;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const ROOT: &str = "https://en.wikipedia.org";

    /// Serves canned pages and records every request
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
        /// Path whose fetch panics
        broken: Option<String>,
    }

    impl FakeSite {
        fn page(mut self, path: &str, body: &str) -> Self {
            self.pages.insert(format!("{}{}", ROOT, path), body.to_string());
            self
        }

        fn broken(mut self, path: &str) -> Self {
            self.broken = Some(path.to_string());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSite {
        async fn fetch(&self, url: &Url, _identity: &str) -> Result<FetchedPage, FetchError> {
            self.requests.lock().unwrap().push(url.path().to_string());
            tokio::task::yield_now().await;
            if self.broken.as_deref() == Some(url.path()) {
                panic!("fetcher bug on {}", url);
            }
            match self.pages.get(url.as_str()) {
                Some(body) => Ok(FetchedPage {
                    final_url: url.clone(),
                    status_code: 200,
                    body: body.clone(),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn actor_page(name: &str, movies: &[&str]) -> String {
        let links: String = movies
            .iter()
            .map(|m| format!(r#"<li><a href="/wiki/{}">{}</a></li>"#, m, m))
            .collect();
        format!(
            r#"<html><body><h1 id="firstHeading">{}</h1>
            <h2 id="Filmography">Filmography</h2><ul>{}</ul>
            <h2 id="References">References</h2></body></html>"#,
            name, links
        )
    }

    fn movie_page(name: &str, actors: &[&str]) -> String {
        let links: String = actors
            .iter()
            .map(|a| format!(r#"<a href="/wiki/{}">{}</a><br>"#, a, a))
            .collect();
        format!(
            r#"<html><body><h1 id="firstHeading">{}</h1>
            <table class="infobox"><tr><th>Starring</th><td>{}</td></tr>
            <tr><th>Box office</th><td>$10 million</td></tr></table></body></html>"#,
            name, links
        )
    }

    /// Two actors and two movies, all linking to each other
    fn cyclic_site() -> FakeSite {
        FakeSite::default()
            .page("/wiki/Actor_A", &actor_page("Actor A", &["Movie_X", "Movie_Y"]))
            .page("/wiki/Actor_B", &actor_page("Actor B", &["Movie_X"]))
            .page("/wiki/Movie_X", &movie_page("Movie X", &["Actor_A", "Actor_B"]))
            .page("/wiki/Movie_Y", &movie_page("Movie Y", &["Actor_A", "Actor_B"]))
    }

    async fn crawl(
        site: Arc<FakeSite>,
        seeds: Vec<Task>,
        robots: Option<ParsedRobots>,
        workers: usize,
    ) -> (SchedulerStats, Vec<Item>) {
        let frontier = Arc::new(Frontier::with_seeds(seeds));
        let (items, writer) = spawn_writer(Vec::new());

        let context = CrawlContext {
            frontier: Arc::clone(&frontier),
            fetcher: site,
            identities: Arc::new(FixedIdentity::new("castnet-test")),
            politeness: Politeness::new(Duration::ZERO),
            retry: RetryPolicy::none(),
            robots,
            robots_agent: "castnet".to_string(),
            site_root: Url::parse(ROOT).unwrap(),
            emitter: Emitter::new(frontier, items),
        };

        let stats = Scheduler::new(context, workers).run().await;
        let (items, _) = writer.await.unwrap();
        (stats, items)
    }

    fn seed_actor(path: &str) -> Task {
        Task::actor(Url::parse(&format!("{}{}", ROOT, path)).unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cycle_terminates_and_fetches_each_page_once() {
        let site = Arc::new(cyclic_site());
        let (stats, items) = crawl(Arc::clone(&site), vec![seed_actor("/wiki/Actor_A")], None, 4).await;

        let mut requests = site.requests();
        requests.sort();
        assert_eq!(
            requests,
            vec!["/wiki/Actor_A", "/wiki/Actor_B", "/wiki/Movie_X", "/wiki/Movie_Y"]
        );
        assert_eq!(stats.pages_fetched, 4);
        assert_eq!(stats.pages_failed, 0);
        assert_eq!(items.len(), 4);
        assert!(stats.tasks_duplicate > 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_dropped() {
        let site = Arc::new(
            FakeSite::default().page("/wiki/Actor_A", &actor_page("Actor A", &["Missing_Film"])),
        );
        let (stats, items) = crawl(site, vec![seed_actor("/wiki/Actor_A")], None, 2).await;

        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.pages_failed, 1);
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_robots_denied_tasks_are_never_fetched() {
        let site = Arc::new(cyclic_site());
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /wiki/Movie_Y");
        let (stats, items) = crawl(
            Arc::clone(&site),
            vec![seed_actor("/wiki/Actor_A")],
            Some(robots),
            2,
        )
        .await;

        assert!(!site.requests().contains(&"/wiki/Movie_Y".to_string()));
        assert_eq!(stats.robots_denied, 1);
        assert_eq!(stats.pages_fetched, 3);
        assert_eq!(items.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_task_still_lets_crawl_terminate() {
        let site = Arc::new(cyclic_site().broken("/wiki/Movie_Y"));
        let crawl = crawl(Arc::clone(&site), vec![seed_actor("/wiki/Actor_A")], None, 2);
        let (stats, items) = tokio::time::timeout(Duration::from_secs(5), crawl)
            .await
            .expect("crawl hung after a worker panicked");

        assert!(site.requests().contains(&"/wiki/Movie_Y".to_string()));
        assert_eq!(stats.pages_fetched, 3);
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_emits_typed_records() {
        let site = Arc::new(cyclic_site());
        let (_, items) = crawl(site, vec![seed_actor("/wiki/Actor_B")], None, 1).await;

        let actors = items.iter().filter(|i| matches!(i, Item::Actor(_))).count();
        let movies = items.iter().filter(|i| matches!(i, Item::Movie(_))).count();
        assert_eq!(actors, 2);
        assert_eq!(movies, 2);
    }
}
