//! Sitemap XML scanning
//!
//! Sitemaps are scanned with regular expressions rather than parsed as XML:
//! real-world sitemaps are frequently malformed, and only the `<loc>` values
//! and the document kind matter here.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LOC: Regex =
        Regex::new(r"(?is)<loc\s*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</loc\s*>").unwrap();
    static ref INDEX_MARKER: Regex = Regex::new(r"(?i)<sitemapindex\b|<sitemap\b").unwrap();
}

/// The two kinds of sitemap documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// A `<sitemapindex>` whose `<loc>`s point at further sitemaps
    Index,
    /// A `<urlset>` whose `<loc>`s are pages
    Urlset,
}

impl SitemapKind {
    /// Detects the kind of a sitemap document
    pub fn detect(xml: &str) -> Self {
        if is_sitemap_index(xml) {
            Self::Index
        } else {
            Self::Urlset
        }
    }
}

/// Returns every non-empty `<loc>` value of a sitemap, in document order
///
/// Values are trimmed, unwrapped from CDATA sections and have the predefined
/// XML entities decoded.
///
/// # Examples
///
/// ```
/// use crawl_lab::extract::parse_sitemap_locs;
///
/// let xml = "<urlset><url><loc>https://ex.com/a</loc></url></urlset>";
/// assert_eq!(parse_sitemap_locs(xml), vec!["https://ex.com/a".to_string()]);
/// ```
pub fn parse_sitemap_locs(xml: &str) -> Vec<String> {
    LOC.captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_xml(m.as_str().trim()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Returns true when the document is a sitemap index
///
/// A document is an index when it declares a `<sitemapindex>` root or contains
/// `<sitemap>` children.
pub fn is_sitemap_index(xml: &str) -> bool {
    INDEX_MARKER.is_match(xml)
}

fn unescape_xml(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
