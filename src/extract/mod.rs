//! Extraction of SEO signals from fetched documents
//!
//! This module turns raw markup into structured data:
//! - Page signals (title, meta description, headings, images, links)
//! - Visible word counts
//! - Sitemap `<loc>` values and sitemap kind
//!
//! Nothing here performs I/O or returns errors; malformed input yields empty
//! or partial results.

mod html;
mod sitemap;
mod text;

pub use html::{
    extract_h1s, extract_h2s, extract_images, extract_links, extract_meta_description,
    extract_title, ExtractedImage, ExtractedLink,
};
pub use sitemap::{is_sitemap_index, parse_sitemap_locs, SitemapKind};
pub use text::count_words;

use scraper::Html;
use url::Url;

/// Everything the crawler records about a successfully fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1s: Vec<String>,
    pub h2s: Vec<String>,
    pub word_count: usize,
    pub images: Vec<ExtractedImage>,
    pub links: Vec<ExtractedLink>,
}

impl PageSignals {
    /// The first H1, as stored on the page record
    pub fn first_h1(&self) -> Option<&str> {
        self.h1s.first().map(String::as_str)
    }

    /// Links classified internal, in document order
    pub fn internal_links(&self) -> impl Iterator<Item = &ExtractedLink> {
        self.links.iter().filter(|link| link.is_internal())
    }
}

/// Turns a page body into [`PageSignals`]
///
/// The crawl scheduler only depends on this trait, so the markup parser can be
/// swapped without touching the crawl loop.
pub trait PageExtractor: Send + Sync {
    /// Extracts signals from `body`, resolving references against `page_url`
    fn extract(&self, body: &str, page_url: &Url) -> PageSignals;
}

/// Default extractor backed by the `scraper` HTML5 parser
///
/// The document is parsed once and every signal is read from the same tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupExtractor;

impl PageExtractor for MarkupExtractor {
    fn extract(&self, body: &str, page_url: &Url) -> PageSignals {
        let document = Html::parse_document(body);

        PageSignals {
            title: html::title_of(&document),
            meta_description: html::meta_description_of(&document),
            h1s: html::headings_of(&document, "h1"),
            h2s: html::headings_of(&document, "h2"),
            word_count: count_words(body),
            images: html::images_of(&document, Some(page_url)),
            links: html::links_of(&document, Some(page_url)),
        }
    }
}
