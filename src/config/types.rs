use crate::crawler::PageType;
use serde::Deserialize;

/// Main configuration structure for Castnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "seed")]
    pub seeds: Vec<SeedEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between the start of two requests (milliseconds)
    #[serde(rename = "download-delay-ms", default = "default_download_delay_ms")]
    pub download_delay_ms: u64,

    /// Number of concurrent fetch-and-extract workers
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Timeout applied to each individual fetch (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay of the exponential retry backoff (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Stop admitting work after this many dispatched pages (0 = unlimited)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,

    /// Consult the site's robots.txt before fetching
    #[serde(rename = "obey-robots", default = "default_obey_robots")]
    pub obey_robots: bool,
}

/// The crawled site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL; only links on this host are followed
    pub root: String,
}

/// Outgoing client identity configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Token matched against robots.txt user-agent groups
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// How identities are picked for each request
    #[serde(default)]
    pub rotation: RotationStrategy,

    /// Identity pool; empty means the built-in browser pool
    #[serde(default)]
    pub identities: Vec<String>,
}

/// Identity rotation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationStrategy {
    #[default]
    Random,
    RoundRobin,
    Fixed,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A crawl starting point
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub url: String,

    #[serde(rename = "page-type")]
    pub page_type: PageType,
}

fn default_download_delay_ms() -> u64 {
    1000
}

fn default_max_concurrent_fetches() -> u32 {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_obey_robots() -> bool {
    true
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            download_delay_ms: default_download_delay_ms(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_pages: 0,
            obey_robots: default_obey_robots(),
        }
    }
}
