//! URL handling module for Castnet
//!
//! This module resolves links found in page markup against the crawled site and
//! computes the normalized keys the frontier deduplicates on.

mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

pub use normalize::dedup_key;

/// Parses a URL and checks that it belongs to the crawled site
///
/// The fragment is dropped so the returned URL can be used as a task target
/// and as the canonical record URL.
///
/// # Examples
///
/// ```
/// use castnet::url::ensure_on_site;
/// use url::Url;
///
/// let root = Url::parse("https://en.wikipedia.org").unwrap();
/// let url = ensure_on_site("https://en.wikipedia.org/wiki/Se7en#Plot", &root).unwrap();
/// assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/Se7en");
/// assert!(ensure_on_site("https://example.com/wiki/Se7en", &root).is_err());
/// ```
pub fn ensure_on_site(url_str: &str, root: &Url) -> UrlResult<Url> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    if !is_same_site(&url, root) {
        return Err(UrlError::OffSite {
            url: url_str.to_string(),
            site: root.to_string(),
        });
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves an `href` found on `base` into a crawlable URL on the site
///
/// Returns None if the link should not be followed:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only links (same page anchors)
/// - unparsable or non-HTTP(S) targets
/// - targets on another host
pub fn resolve_link(href: &str, base: &Url, root: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    if !is_same_site(&absolute, root) {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}

/// Checks whether two URLs share a host (case-insensitive) and explicit port
pub fn is_same_site(url: &Url, root: &Url) -> bool {
    match (url.host_str(), root.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b) && url.port() == root.port(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("https://en.wikipedia.org").unwrap()
    }

    fn base() -> Url {
        Url::parse("https://en.wikipedia.org/wiki/Morgan_Freeman").unwrap()
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve_link("/wiki/Se7en", &base(), &root()).unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/Se7en");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve_link("Invictus_(film)", &base(), &root()).unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/Invictus_(film)");
    }

    #[test]
    fn test_resolve_strips_fragment() {
        let url = resolve_link("/wiki/Se7en#Cast", &base(), &root()).unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/Se7en");
    }

    #[test]
    fn test_skip_fragment_only() {
        assert!(resolve_link("#cite_note-3", &base(), &root()).is_none());
    }

    #[test]
    fn test_skip_special_schemes() {
        assert!(resolve_link("javascript:void(0)", &base(), &root()).is_none());
        assert!(resolve_link("mailto:info@example.com", &base(), &root()).is_none());
        assert!(resolve_link("tel:+1234567890", &base(), &root()).is_none());
        assert!(resolve_link("data:text/html,<h1>x</h1>", &base(), &root()).is_none());
    }

    #[test]
    fn test_skip_off_site() {
        assert!(resolve_link("https://www.imdb.com/name/nm0000151/", &base(), &root()).is_none());
        assert!(resolve_link("//de.wikipedia.org/wiki/Se7en", &base(), &root()).is_none());
    }

    #[test]
    fn test_skip_empty() {
        assert!(resolve_link("   ", &base(), &root()).is_none());
    }

    #[test]
    fn test_same_site_ignores_host_case_and_scheme() {
        let other = Url::parse("http://EN.Wikipedia.org/wiki/Se7en").unwrap();
        assert!(is_same_site(&other, &root()));
    }

    #[test]
    fn test_same_site_respects_explicit_port() {
        let local = Url::parse("http://127.0.0.1:8080/").unwrap();
        let same = Url::parse("http://127.0.0.1:8080/wiki/A").unwrap();
        let other = Url::parse("http://127.0.0.1:9090/wiki/A").unwrap();
        assert!(is_same_site(&same, &local));
        assert!(!is_same_site(&other, &local));
    }

    #[test]
    fn test_ensure_on_site_rejects_bad_scheme() {
        let result = ensure_on_site("ftp://en.wikipedia.org/wiki/Se7en", &root());
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_ensure_on_site_rejects_garbage() {
        assert!(matches!(
            ensure_on_site("not a url", &root()),
            Err(UrlError::Parse(_))
        ));
    }
}
