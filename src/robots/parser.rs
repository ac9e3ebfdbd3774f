//! Robots.txt rules for the crawled site
//!
//! Path matching is delegated to the robotstxt crate; `Crawl-delay`, which it
//! does not expose, is read from the user-agent groups directly.

use robotstxt::DefaultMatcher;
use url::Url;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content; empty means allow all
    content: String,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Permissive rules, used when robots.txt is missing or unreachable
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Checks whether `url` may be fetched by the crawler named `agent`
    pub fn is_allowed(&self, url: &Url, agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url.as_str())
    }

    /// Crawl delay in seconds that applies to `agent`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, agent: &str) -> Option<f64> {
        let agent = agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut for_agent = None;
        let mut for_wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    let names_agent = group_agents
                        .iter()
                        .any(|ua| !ua.is_empty() && ua != "*" && agent.contains(ua.as_str()));
                    if names_agent {
                        for_agent = Some(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        for_wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        for_agent.or(for_wildcard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://en.wikipedia.org").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed(&url("/wiki/Se7en"), "castnet"));
        assert!(robots.is_allowed(&url("/w/index.php"), "castnet"));
    }

    #[test]
    fn test_disallow_all() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed(&url("/"), "castnet"));
        assert!(!robots.is_allowed(&url("/wiki/Se7en"), "castnet"));
    }

    #[test]
    fn test_disallow_prefix() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /w/");
        assert!(robots.is_allowed(&url("/wiki/Se7en"), "castnet"));
        assert!(!robots.is_allowed(&url("/w/index.php?title=Se7en"), "castnet"));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let content = "User-agent: *\nDisallow: /wiki/\nAllow: /wiki/Se7en";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed(&url("/wiki/Se7en"), "castnet"));
        assert!(!robots.is_allowed(&url("/wiki/Invictus"), "castnet"));
    }

    #[test]
    fn test_specific_agent_group() {
        let content = "User-agent: castnet\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed(&url("/wiki/Se7en"), "castnet"));
        assert!(robots.is_allowed(&url("/wiki/Se7en"), "otherbot"));
    }

    #[test]
    fn test_garbage_allows_everything() {
        let robots = ParsedRobots::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed(&url("/wiki/Se7en"), "castnet"));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /w/");
        assert_eq!(robots.crawl_delay("castnet"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let content = "User-agent: *\nCrawl-delay: 10\n\nUser-agent: castnet\nCrawl-delay: 2.5";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("castnet"), Some(2.5));
        assert_eq!(robots.crawl_delay("otherbot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let content = "User-agent: bota\nUser-agent: castnet\nDisallow: /x\nCrawl-delay: 3";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("CastNet"), Some(3.0));
        assert_eq!(robots.crawl_delay("botc"), None);
    }

    #[test]
    fn test_crawl_delay_absent() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /w/");
        assert_eq!(robots.crawl_delay("castnet"), None);
        assert_eq!(ParsedRobots::allow_all().crawl_delay("castnet"), None);
    }
}
