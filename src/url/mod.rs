//! URL handling module for Crawl-Lab
//!
//! This module provides crawl-target normalization, host extraction, site
//! scope checks, and internal/external link classification.

mod domain;
mod normalize;
mod scope;

pub use domain::extract_domain;
pub use normalize::{canonical_url, normalize_target_url, parse_base_url};
pub use scope::{is_same_site, LinkScope};

use url::Url;

/// Checks whether a raw URL string may be fetched as part of a site crawl
///
/// The URL must parse, use HTTP(S), and have a host inside the site scope.
///
/// # Examples
///
/// ```
/// use crawl_lab::url::in_crawl_scope;
///
/// assert!(in_crawl_scope("https://blog.example.com/post", "example.com"));
/// assert!(!in_crawl_scope("https://example.org/", "example.com"));
/// assert!(!in_crawl_scope("not a url", "example.com"));
/// ```
pub fn in_crawl_scope(raw: &str, base_host: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    extract_domain(&url)
        .map(|host| is_same_site(&host, base_host))
        .unwrap_or(false)
}
