//! HTML signal extraction
//!
//! Every function here tolerates malformed markup: the HTML5 parser always
//! produces a document, and anything that can't be read is simply absent from
//! the result.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::url::{extract_domain, LinkScope};

/// An image found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// Absolute image URL, or the raw `src` if it could not be resolved
    pub url: String,

    /// The `alt` attribute as written; `None` when the attribute is missing
    pub alt: Option<String>,
}

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Absolute target URL without fragment, or the raw href if it could not be resolved
    pub url: String,

    /// Whitespace-collapsed anchor text
    pub anchor_text: String,

    /// Internal/external classification relative to the page's host
    pub scope: LinkScope,
}

impl ExtractedLink {
    pub fn is_internal(&self) -> bool {
        self.scope.is_internal()
    }
}

/// Returns the trimmed text of the first `<title>`, if non-empty
pub fn extract_title(html: &str) -> Option<String> {
    title_of(&Html::parse_document(html))
}

/// Returns the `content` of the first `<meta name="description">`, if non-empty
///
/// The `name` attribute is matched case-insensitively.
pub fn extract_meta_description(html: &str) -> Option<String> {
    meta_description_of(&Html::parse_document(html))
}

/// Returns the text of every non-empty `<h1>`, in document order
pub fn extract_h1s(html: &str) -> Vec<String> {
    headings_of(&Html::parse_document(html), "h1")
}

/// Returns the text of every non-empty `<h2>`, in document order
pub fn extract_h2s(html: &str) -> Vec<String> {
    headings_of(&Html::parse_document(html), "h2")
}

/// Extracts every usable `<img>` of a document
///
/// `src` is resolved against `base_url`. Images without a `src`, with an empty
/// one, or with a `data:` URI are skipped.
///
/// # Examples
///
/// ```
/// use crawl_lab::extract::extract_images;
///
/// let images = extract_images(r#"<img src="/a.png" alt="A">"#, "https://ex.com");
/// assert_eq!(images.len(), 1);
/// assert_eq!(images[0].url, "https://ex.com/a.png");
/// assert_eq!(images[0].alt.as_deref(), Some("A"));
/// ```
pub fn extract_images(html: &str, base_url: &str) -> Vec<ExtractedImage> {
    let base = Url::parse(base_url).ok();
    images_of(&Html::parse_document(html), base.as_ref())
}

/// Extracts every followable anchor of a document
///
/// `javascript:`, `mailto:`, `tel:`, empty and fragment-only hrefs are
/// skipped. Each link is classified internal when its host is the host of
/// `base_url` or a subdomain of it.
///
/// # Examples
///
/// ```
/// use crawl_lab::extract::extract_links;
///
/// let html = r#"<a href="/about">About</a><a href="https://other.org/">Other</a>"#;
/// let links = extract_links(html, "https://example.com/");
/// assert_eq!(links[0].url, "https://example.com/about");
/// assert!(links[0].is_internal());
/// assert!(!links[1].is_internal());
/// ```
pub fn extract_links(html: &str, base_url: &str) -> Vec<ExtractedLink> {
    let base = Url::parse(base_url).ok();
    links_of(&Html::parse_document(html), base.as_ref())
}

pub(crate) fn title_of(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn meta_description_of(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .map(|name| name.trim().eq_ignore_ascii_case("description"))
                .unwrap_or(false)
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn headings_of(document: &Html, tag: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(tag) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| collapsed_text(&element))
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn images_of(document: &Html, base: Option<&Url>) -> Vec<ExtractedImage> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for element in document.select(&selector) {
        let Some(src) = element.value().attr("src").map(str::trim) else {
            continue;
        };
        if src.is_empty() || starts_with_ignore_case(src, "data:") {
            continue;
        }

        let url = resolve(src, base)
            .map(|u| u.to_string())
            .unwrap_or_else(|| src.to_string());

        images.push(ExtractedImage {
            url,
            alt: element.value().attr("alt").map(str::to_string),
        });
    }

    images
}

pub(crate) fn links_of(document: &Html, base: Option<&Url>) -> Vec<ExtractedLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let base_host = base.and_then(extract_domain).unwrap_or_default();

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if is_unfollowable(href) {
            continue;
        }

        let resolved = resolve(href, base).map(|mut u| {
            u.set_fragment(None);
            u
        });
        let scope = LinkScope::classify(resolved.as_ref(), &base_host);
        let url = resolved
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string());

        links.push(ExtractedLink {
            url,
            anchor_text: collapsed_text(&element),
            scope,
        });
    }

    links
}

fn resolve(reference: &str, base: Option<&Url>) -> Option<Url> {
    match base {
        Some(base) => base.join(reference).ok(),
        None => Url::parse(reference).ok(),
    }
}

fn is_unfollowable(href: &str) -> bool {
    href.is_empty()
        || href.starts_with('#')
        || starts_with_ignore_case(href, "javascript:")
        || starts_with_ignore_case(href, "mailto:")
        || starts_with_ignore_case(href, "tel:")
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

fn collapsed_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
