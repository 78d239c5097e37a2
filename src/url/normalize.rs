use crate::url::extract_domain;
use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a user-supplied crawl target into the job's base URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Remove one trailing slash
/// 3. Prepend `https://` when the input has no `http://`/`https://` scheme
///
/// This never fails: a target that still cannot be parsed is rejected later,
/// when the crawl run parses its base URL, and fails that job.
///
/// # Examples
///
/// ```
/// use crawl_lab::url::normalize_target_url;
///
/// assert_eq!(normalize_target_url("example.com/"), "https://example.com");
/// assert_eq!(normalize_target_url("http://example.com/blog/"), "http://example.com/blog");
/// ```
pub fn normalize_target_url(target: &str) -> String {
    let trimmed = target.trim();
    let without_slash = trimmed.strip_suffix('/').unwrap_or(trimmed);

    if has_http_scheme(without_slash) {
        without_slash.to_string()
    } else {
        format!("https://{}", without_slash)
    }
}

fn has_http_scheme(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Parses a job's base URL and returns it together with its host
///
/// # Returns
///
/// * `Ok((Url, String))` - The parsed URL and its lowercase host
/// * `Err(UrlError)` - The URL is malformed, not HTTP(S), or has no host
pub fn parse_base_url(base_url: &str) -> UrlResult<(Url, String)> {
    let url = Url::parse(base_url).map_err(|e| UrlError::Parse(format!("{}: {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = extract_domain(&url).ok_or_else(|| UrlError::MissingHost(base_url.to_string()))?;

    Ok((url, host))
}

/// Returns the canonical queue key for a URL string
///
/// Parsable URLs are re-serialized (so `https://ex.com` and `https://ex.com/`
/// compare equal) with their fragment removed. Unparsable input is kept as-is.
pub fn canonical_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.trim().to_string(),
    }
}
