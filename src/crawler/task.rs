//! Crawl tasks: a target URL tagged with the kind of page expected there

use crate::url::dedup_key;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The kind of page a task points at
///
/// The type is fixed by whoever creates the task (a seed or the extractor of the
/// linking page) and decides which extractor parses the fetched markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Actor,
    Movie,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Movie => "movie",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    target: Url,
    page_type: PageType,
}

impl Task {
    pub fn new(target: Url, page_type: PageType) -> Self {
        Self { target, page_type }
    }

    pub fn actor(target: Url) -> Self {
        Self::new(target, PageType::Actor)
    }

    pub fn movie(target: Url) -> Self {
        Self::new(target, PageType::Movie)
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    /// Key used by the frontier's seen set
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.target)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.page_type, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_tag_page_type() {
        let url = Url::parse("https://en.wikipedia.org/wiki/Se7en").unwrap();
        assert_eq!(Task::movie(url.clone()).page_type(), PageType::Movie);
        assert_eq!(Task::actor(url).page_type(), PageType::Actor);
    }

    #[test]
    fn test_dedup_key_matches_url_key() {
        let url = Url::parse("https://en.wikipedia.org/wiki/Se7en").unwrap();
        assert_eq!(Task::movie(url).dedup_key(), "/wiki/se7en");
    }

    #[test]
    fn test_display() {
        let url = Url::parse("https://en.wikipedia.org/wiki/Se7en").unwrap();
        assert_eq!(
            Task::movie(url).to_string(),
            "movie https://en.wikipedia.org/wiki/Se7en"
        );
    }
}
