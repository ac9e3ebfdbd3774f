//! Markup helpers shared by the extractors
//!
//! Every lookup here returns an `Option`; the extractors decide per field what a
//! missing node means.

use crate::extract::PageContext;
use crate::url::{dedup_key, resolve_link};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::str::FromStr;
use url::Url;

/// Parses a CSS selector
pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Returns the first element in the document matching `css`
pub(crate) fn find_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = selector(css)?;
    document.select(&selector).next()
}

/// Extracts the page title from the article heading
pub fn page_title(document: &Html) -> Option<String> {
    find_first(document, "#firstHeading")
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// All text under an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of a text node, or of everything under an element node
pub(crate) fn node_text(node: &Node, element: Option<ElementRef<'_>>) -> String {
    match node {
        Node::Text(text) => collapse_whitespace(text),
        Node::Element(_) => element.map(element_text).unwrap_or_default(),
        _ => String::new(),
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the first contiguous run of ASCII digits in `text`
///
/// Everything around the run is ignored, so "(aged 84)" yields 84 and
/// "$28.3 million" yields 28. Returns None when there are no digits or the run
/// does not fit in `T`.
///
/// # Examples
///
/// ```
/// use castnet::extract::first_digit_run;
///
/// assert_eq!(first_digit_run::<u32>(" (age 87)"), Some(87));
/// assert_eq!(first_digit_run::<u64>("$327.3 million"), Some(327));
/// assert_eq!(first_digit_run::<u32>("unknown"), None);
/// ```
pub fn first_digit_run<T: FromStr>(text: &str) -> Option<T> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Distinct links in first-encounter order
#[derive(Debug, Default)]
pub(crate) struct LinkSet {
    seen: HashSet<String>,
    links: Vec<Url>,
}

impl LinkSet {
    pub(crate) fn push(&mut self, url: Url) {
        if self.seen.insert(dedup_key(&url)) {
            self.links.push(url);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<Url> {
        self.links
    }
}

/// Collects every followable link at or under `element`
pub(crate) fn collect_links(element: ElementRef<'_>, page: &PageContext<'_>, links: &mut LinkSet) {
    let Some(anchors) = selector("a[href]") else {
        return;
    };

    let own_href = (element.value().name() == "a")
        .then(|| element.value().attr("href"))
        .flatten();

    let hrefs = own_href
        .into_iter()
        .chain(element.select(&anchors).filter_map(|a| a.value().attr("href")));

    for href in hrefs {
        if let Some(url) = resolve_link(href, page.url, page.site_root) {
            links.push(url);
        }
    }
}
