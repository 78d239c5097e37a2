//! Sitemap discovery
//!
//! Resolves the initial URL set of a crawl from the well-known sitemap
//! locations of a site, expanding sitemap indexes breadth-first.

use crate::crawler::fetcher::fetch_url;
use crate::crawler::job_log::JobLogger;
use crate::extract::{parse_sitemap_locs, SitemapKind};
use reqwest::Client;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sitemap locations tried for every site, relative to the base URL
pub const SITEMAP_PATHS: [&str; 3] = ["sitemap.xml", "sitemap_index.xml", "wp-sitemap.xml"];

/// Discovers page URLs from a site's sitemaps
pub struct SitemapDiscoverer {
    client: Client,
    timeout: Duration,
}

impl SitemapDiscoverer {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Returns the deduplicated page URLs of every reachable sitemap
    ///
    /// URLs are returned in first-seen order. Non-200 responses and fetch
    /// failures are logged as warnings and skipped; an empty result is a
    /// normal outcome. Each sitemap URL is fetched at most once, so indexes
    /// that reference themselves or each other terminate.
    pub async fn discover(
        &self,
        base_url: &str,
        logger: &JobLogger,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let base = base_url.trim_end_matches('/');
        let mut queue: VecDeque<String> = SITEMAP_PATHS
            .iter()
            .map(|path| format!("{}/{}", base, path))
            .collect();
        let mut fetched: HashSet<String> = HashSet::new();

        let mut seen: HashSet<String> = HashSet::new();
        let mut urls = Vec::new();

        while let Some(sitemap_url) = queue.pop_front() {
            if cancel.is_cancelled() {
                break;
            }
            if !fetched.insert(sitemap_url.clone()) {
                continue;
            }

            logger.info(&format!("Fetching sitemap: {}", sitemap_url), None);

            let page = match fetch_url(&self.client, &sitemap_url, self.timeout, cancel).await {
                Ok(page) => page,
                Err(e) => {
                    logger.warn(
                        &format!("Failed to fetch sitemap: {}", sitemap_url),
                        Some(json!({ "error": e.to_string() })),
                    );
                    continue;
                }
            };

            if page.status_code != 200 {
                logger.warn(
                    &format!("Sitemap returned {}: {}", page.status_code, sitemap_url),
                    None,
                );
                continue;
            }

            let locs = parse_sitemap_locs(&page.body);
            match SitemapKind::detect(&page.body) {
                SitemapKind::Index => {
                    logger.info(
                        &format!("Found sitemap index with {} sitemaps", locs.len()),
                        None,
                    );
                    queue.extend(locs);
                }
                SitemapKind::Urlset => {
                    logger.info(&format!("Found {} URLs in sitemap", locs.len()), None);
                    for loc in locs {
                        if seen.insert(loc.clone()) {
                            urls.push(loc);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            job_id = logger.job_id(),
            "Sitemap discovery checked {} locations, found {} URLs",
            fetched.len(),
            urls.len()
        );

        urls
    }
}
