//! Host extraction and href resolution helpers shared by the fetcher and
//! the extractor.

use reqwest::Url;

/// Extracts the hostname from a page URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Resolves `href` against `base`, leaving absolute hrefs untouched.
///
/// Returns `None` for blank hrefs and for hrefs the URL parser rejects.
pub(crate) fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!(href, error = %e, "dropping unresolvable href");
            None
        }
    }
}

/// Parses `url` as an absolute http(s) URL.
pub(crate) fn parse_http_url(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url.trim()).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        "http" | "https" => Err("URL has no host".to_string()),
        other => Err(format!("unsupported scheme \"{other}\"")),
    }
}
