//! Crawler module for page fetching and graph extraction
//!
//! This module contains the core crawling logic, including:
//! - The dedup frontier shared by all workers
//! - HTTP fetching with identity rotation, politeness delay and retries
//! - The worker pool that fetches, extracts and emits
//! - Overall crawl coordination

mod coordinator;
mod emitter;
mod fetcher;
mod frontier;
mod identity;
mod politeness;
mod scheduler;
mod task;

pub use coordinator::{run_crawl, Coordinator};
pub use emitter::{spawn_writer, EmitStats, Emitter, ItemSink, StorageSink, WriterSummary};
pub use fetcher::{
    build_http_client, fetch_with_retry, FetchError, FetchedPage, HttpFetcher, PageFetcher,
    RetryPolicy,
};
pub use frontier::{Admission, Frontier};
pub use identity::{
    build_rotation, FixedIdentity, IdentityRotation, RandomIdentity, RoundRobinIdentity,
    DEFAULT_IDENTITIES,
};
pub use politeness::{effective_delay, Politeness, MAX_ROBOTS_DELAY};
pub use scheduler::{CrawlContext, Scheduler, SchedulerStats};
pub use task::{PageType, Task};

use std::time::Duration;

/// Summary of one crawl, returned to the caller and recorded on the run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_fetched: u64,
    /// Pages dropped after exhausting retries
    pub pages_failed: u64,
    /// Tasks skipped because robots.txt disallows them
    pub robots_denied: u64,
    pub actors: u64,
    pub movies: u64,
    /// Pages whose structure could not be read
    pub empty_records: u64,
    /// Tasks admitted to the frontier, seeds included
    pub tasks_admitted: u64,
    /// Discoveries dropped as already seen
    pub tasks_duplicate: u64,
    pub elapsed: Duration,
}
