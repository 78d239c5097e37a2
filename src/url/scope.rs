use crate::url::extract_domain;
use url::Url;

/// Checks whether a host belongs to the crawled site
///
/// A host is in scope when it equals the base host or is a subdomain of it:
/// for `example.com`, that is `example.com`, `blog.example.com` and
/// `api.v2.example.com`, but not `notexample.com`.
///
/// # Examples
///
/// ```
/// use crawl_lab::url::is_same_site;
///
/// assert!(is_same_site("example.com", "example.com"));
/// assert!(is_same_site("blog.example.com", "example.com"));
/// assert!(!is_same_site("notexample.com", "example.com"));
/// assert!(!is_same_site("example.org", "example.com"));
/// ```
pub fn is_same_site(candidate: &str, base_host: &str) -> bool {
    if base_host.is_empty() {
        return false;
    }
    let candidate = candidate.to_ascii_lowercase();
    let base_host = base_host.to_ascii_lowercase();
    candidate == base_host || candidate.ends_with(&format!(".{}", base_host))
}

/// Internal/external classification of an extracted link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same host or a subdomain of it; fed back into the crawl queue
    Internal,
    /// Any other host, or a URL without a host
    External,
}

impl LinkScope {
    /// Classifies a link against the host of the page it was found on
    ///
    /// `resolved` is `None` when the href could not be resolved into an
    /// absolute URL. Such hrefs are classified `Internal`: in practice they are
    /// same-site relative paths that failed strict parsing. The crawl scheduler
    /// drops them later at its own scope check, so the fallback only affects
    /// the stored classification, never what gets fetched.
    pub fn classify(resolved: Option<&Url>, base_host: &str) -> Self {
        let Some(url) = resolved else {
            return Self::Internal;
        };

        match extract_domain(url) {
            Some(host) if is_same_site(&host, base_host) => Self::Internal,
            _ => Self::External,
        }
    }

    /// Returns true for internal links
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}
