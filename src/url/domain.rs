use url::Url;

/// Extracts the host from a URL for scope comparisons
///
/// The host is lowercased and a trailing root dot (`example.com.`) is removed,
/// so fully-qualified and plain spellings of a host compare equal. Returns
/// `None` for URLs without a host (`data:`, `mailto:` and similar).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_lab::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
///
/// let url = Url::parse("https://example.com./").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_end_matches('.').to_lowercase())
        .filter(|h| !h.is_empty())
}
