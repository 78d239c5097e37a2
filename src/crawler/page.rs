//! Fetch-and-extract for a single page
//!
//! A page either yields a full record with its images and links, or, when the
//! fetch fails, a placeholder record with status 0. Neither outcome aborts the
//! job; only storage failures propagate.

use crate::crawler::fetcher::{fetch_url, FetchError};
use crate::crawler::job_log::JobLogger;
use crate::crawler::{lock_storage, SharedStorage};
use crate::extract::PageExtractor;
use crate::storage::{NewPage, Storage};
use crate::Result;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of crawling one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was fetched (with any status) and recorded
    Crawled {
        page_id: i64,
        status_code: u16,
        /// Internal links found on the page, in document order
        internal_links: Vec<String>,
    },

    /// The fetch failed; a status-0 record was written
    Failed { page_id: i64 },

    /// Cancellation interrupted the fetch; nothing was written
    Cancelled,
}

/// Everything a page crawl needs besides the URL
pub struct PageContext<'a> {
    pub client: &'a Client,
    pub extractor: &'a dyn PageExtractor,
    pub storage: &'a SharedStorage,
    pub logger: &'a JobLogger,
    pub timeout: Duration,
    pub cancel: &'a CancellationToken,
}

/// Fetches one page, extracts its signals and persists the results
///
/// # Returns
///
/// * `Ok(PageOutcome)` - The page outcome; fetch failures are not errors
/// * `Err(CrawlError)` - The URL could not be parsed or persisting failed
pub async fn crawl_page(ctx: &PageContext<'_>, url: &str) -> Result<PageOutcome> {
    let page_url = Url::parse(url)?;
    let job_id = ctx.logger.job_id();

    let fetched = match fetch_url(ctx.client, url, ctx.timeout, ctx.cancel).await {
        Ok(fetched) => fetched,
        Err(FetchError::Cancelled) => {
            tracing::debug!(job_id, "Fetch of {} cancelled", url);
            return Ok(PageOutcome::Cancelled);
        }
        Err(e) => {
            ctx.logger.error(
                &format!("Failed to crawl {}", url),
                Some(json!({ "error": e.to_string() })),
            );

            let page_id = lock_storage(ctx.storage)?.insert_page(job_id, &NewPage::failed(url))?;
            return Ok(PageOutcome::Failed { page_id });
        }
    };

    let signals = ctx.extractor.extract(&fetched.body, &page_url);

    let page = NewPage {
        url: url.to_string(),
        status_code: fetched.status_code,
        title: signals.title.clone(),
        meta_description: signals.meta_description.clone(),
        h1: signals.first_h1().map(str::to_string),
        word_count: Some(signals.word_count as i64),
        load_time_ms: Some(fetched.elapsed_ms as i64),
    };

    let page_id = {
        let mut storage = lock_storage(ctx.storage)?;
        let page_id = storage.insert_page(job_id, &page)?;

        for image in &signals.images {
            storage.insert_image(page_id, &image.url, image.alt.as_deref())?;
        }

        for link in &signals.links {
            storage.insert_link(page_id, &link.url, &link.anchor_text, link.is_internal())?;
        }

        page_id
    };

    ctx.logger.info(
        &format!("Crawled {}", url),
        Some(json!({
            "status": fetched.status_code,
            "loadTimeMs": fetched.elapsed_ms,
            "images": signals.images.len(),
            "links": signals.links.len(),
        })),
    );

    Ok(PageOutcome::Crawled {
        page_id,
        status_code: fetched.status_code,
        internal_links: signals
            .internal_links()
            .map(|link| link.url.clone())
            .collect(),
    })
}
