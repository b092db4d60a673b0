//! URL canonicalization and link resolution.

use url::Url;

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string before fetching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host (done by the parser)
/// 4. Remove fragment (#...)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    ensure_http(&parsed)?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve an anchor `href` against the page it was found on.
///
/// Relative paths, protocol-relative and absolute hrefs are accepted;
/// `mailto:`, `javascript:` and other non-http targets are rejected.
pub fn resolve_href(base: &Url, href: &str) -> Result<Url, UrlError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = base.join(href).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    ensure_http(&resolved)?;
    resolved.set_fragment(None);

    Ok(resolved)
}

/// Whether two URLs point at the same site, ignoring scheme and a leading `www.`.
///
/// Explicit ports must match; a default port for either scheme counts as none.
pub fn same_site(a: &Url, b: &Url) -> bool {
    fn site(url: &Url) -> Option<String> {
        url.host_str().map(|h| h.trim_start_matches("www.").to_string())
    }
    site(a).is_some() && site(a) == site(b) && a.port() == b.port()
}

fn ensure_http(url: &Url) -> Result<(), UrlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}
