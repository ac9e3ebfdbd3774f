//! Robots.txt handling module
//!
//! The site's robots.txt is fetched once when a crawl starts. It decides which
//! tasks may be fetched and can raise the politeness delay.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::PageFetcher;
use url::Url;

/// Fetches and parses robots.txt for the site
///
/// Any failure (unreachable host, non-success status) yields allow-all rules.
pub async fn fetch_robots(fetcher: &dyn PageFetcher, site_root: &Url, identity: &str) -> ParsedRobots {
    let robots_url = match site_root.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", site_root, e);
            return ParsedRobots::allow_all();
        }
    };

    match fetcher.fetch(&robots_url, identity).await {
        Ok(page) => {
            tracing::info!("Loaded robots.txt from {}", robots_url);
            ParsedRobots::from_content(&page.body)
        }
        Err(e) => {
            tracing::warn!("robots.txt unavailable ({}), allowing all paths", e);
            ParsedRobots::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::HttpFetcher;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_robots_parses_rules() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /w/\nCrawl-delay: 2"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let root = Url::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let robots = fetch_robots(&fetcher, &root, "castnet-test").await;

        assert!(!robots.is_allowed(&root.join("/w/index.php").unwrap(), "castnet"));
        assert!(robots.is_allowed(&root.join("/wiki/Se7en").unwrap(), "castnet"));
        assert_eq!(robots.crawl_delay("castnet"), Some(2.0));
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let root = Url::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let robots = fetch_robots(&fetcher, &root, "castnet-test").await;

        assert!(robots.is_allowed(&root.join("/w/index.php").unwrap(), "castnet"));
    }
}
