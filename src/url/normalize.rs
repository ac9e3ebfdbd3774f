use url::Url;

/// Computes the key the frontier deduplicates on
///
/// All targets share one host, so the key ignores scheme, host and fragment and
/// keeps only the lower-cased path and query:
///
/// 1. Lowercase the path
/// 2. Remove a trailing slash (except for root /)
/// 3. Append the query string, lower-cased, if present
///
/// # Examples
///
/// ```
/// use castnet::url::dedup_key;
/// use url::Url;
///
/// let a = Url::parse("https://en.wikipedia.org/wiki/Se7en").unwrap();
/// let b = Url::parse("http://EN.wikipedia.org/wiki/SE7EN/#Plot").unwrap();
/// assert_eq!(dedup_key(&a), dedup_key(&b));
/// ```
pub fn dedup_key(url: &Url) -> String {
    let mut key = normalize_path(url.path());

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(&query.to_lowercase());
    }

    key
}

/// Lower-cases a path and removes its trailing slash
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let lowered = path.to_lowercase();
    if lowered.len() > 1 && lowered.ends_with('/') {
        lowered[..lowered.len() - 1].to_string()
    } else {
        lowered
    }
}
