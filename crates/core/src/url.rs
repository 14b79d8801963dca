//! Stateless helpers that find URLs in free text and derive their lookup domain.

use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?[-a-zA-Z0-9._]+/?[-a-zA-Z0-9()@:%_+.~#?&/=]+")
        .expect("valid URL regex")
});

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.)?((?:[a-z0-9_-]+\.)+[a-z0-9_-]+)(?::[0-9]+)?(?:[/?#].*)?$",
    )
    .expect("valid domain regex")
});

/// Every URL-shaped substring of `text`, left to right.
///
/// The iterator borrows `text` and can be recreated at will; it holds no shared state.
pub fn extract_urls(text: &str) -> impl Iterator<Item = &str> {
    URL_RE.find_iter(text).map(|m| m.as_str())
}

/// The first URL in `text`, for consumers that handle one link per message.
#[must_use]
pub fn first_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

/// Lowercased host of `url` without scheme, `www.`, port or path.
///
/// Accepts bare domains (`example.com/path`) as well as full URLs. Returns an empty
/// string when the input is not shaped like a host, which callers read as "no rule".
///
/// ```rust
/// use linkfix_core::url::extract_domain;
///
/// assert_eq!(extract_domain("https://www.example.com/path?x=1"), "example.com");
/// assert_eq!(extract_domain("not a url"), "");
/// ```
#[must_use]
pub fn extract_domain(url: &str) -> String {
    DOMAIN_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Drops the first `?` and everything after it.
#[must_use]
pub fn remove_query_params(url: &str) -> &str {
    url.split_once('?').map_or(url, |(head, _)| head)
}
