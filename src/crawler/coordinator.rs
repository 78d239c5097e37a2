//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! a crawl job, including:
//! - Creating the job and resolving per-run options
//! - Seeding the queue from sitemaps (or the base URL)
//! - Driving fetch-and-extract page by page under the cap and pacing
//! - Observing cancellation and finalizing the job

use crate::config::{validate_crawler_config, Config, CrawlerConfig};
use crate::crawler::job_log::JobLogger;
use crate::crawler::lifecycle::JobLifecycle;
use crate::crawler::page::{crawl_page, PageContext, PageOutcome};
use crate::crawler::scheduler::{Dequeued, Scheduler};
use crate::crawler::sitemap::SitemapDiscoverer;
use crate::crawler::{build_http_client, SharedStorage};
use crate::extract::{MarkupExtractor, PageExtractor};
use crate::storage::open_storage;
use crate::url::{normalize_target_url, parse_base_url};
use crate::{ConfigResult, Result};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Per-run overrides of the `[crawler]` configuration
///
/// Unset fields fall back to the configuration file (500 pages, 1000 ms delay
/// and 30000 ms timeout by default).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    pub max_pages: Option<u32>,
    pub delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl CrawlOptions {
    /// Applies the overrides to a crawler configuration and validates the result
    pub fn resolve(&self, base: &CrawlerConfig) -> ConfigResult<CrawlerConfig> {
        let mut resolved = base.clone();
        if let Some(max_pages) = self.max_pages {
            resolved.max_pages = max_pages;
        }
        if let Some(delay_ms) = self.delay_ms {
            resolved.delay_ms = delay_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            resolved.timeout_ms = timeout_ms;
        }

        validate_crawler_config(&resolved)?;
        Ok(resolved)
    }
}

/// How a crawl job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The queue was exhausted or the page cap was reached
    Completed { pages_crawled: u32 },

    /// The job was cancelled; its status was left (or set) to `cancelled`
    Cancelled { pages_crawled: u32 },

    /// A job-level error ended the run
    Failed { message: String },
}

/// A finished crawl job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub job_id: i64,
    pub outcome: CrawlOutcome,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: SharedStorage,
    client: Client,
    extractor: Arc<dyn PageExtractor>,
    cancel: CancellationToken,
    config_hash: Option<String>,
}

impl Coordinator {
    /// Creates a new coordinator over an existing store
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - The store jobs are written to
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - The HTTP client could not be built
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            extractor: Arc::new(MarkupExtractor),
            cancel: CancellationToken::new(),
            config_hash: None,
        })
    }

    /// Creates a coordinator over the database named in the configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        Self::new(config, Arc::new(Mutex::new(storage)))
    }

    /// Replaces the page extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Records the configuration file hash in each job's start log entry
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = Some(config_hash.into());
        self
    }

    /// Token that cancels every crawl run by this coordinator
    ///
    /// Cancelling it stops the in-flight fetch and the pacing sleep at once;
    /// the job is then marked `cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn storage(&self) -> SharedStorage {
        self.storage.clone()
    }

    /// Runs one crawl job to its end
    ///
    /// The target is normalized (one trailing slash removed, `https://`
    /// prepended when no HTTP scheme is given) before the job is created.
    /// Errors inside the run fail the job and are reported in the returned
    /// outcome; only invalid options and storage failures around job creation
    /// are returned as `Err`.
    pub async fn crawl(&self, target_url: &str, options: &CrawlOptions) -> Result<CrawlReport> {
        let crawler_config = options.resolve(&self.config.crawler)?;
        let base_url = normalize_target_url(target_url);

        let lifecycle =
            JobLifecycle::create(self.storage.clone(), &base_url, self.cancel.child_token())?;
        let job_id = lifecycle.job_id();
        let logger = JobLogger::new(self.storage.clone(), job_id);

        logger.info(
            &format!("Starting crawl for {}", base_url),
            Some(json!({
                "maxPages": crawler_config.max_pages,
                "delayMs": crawler_config.delay_ms,
                "timeoutMs": crawler_config.timeout_ms,
                "configHash": self.config_hash,
            })),
        );

        let started = Instant::now();
        let outcome = match self
            .run_job(&lifecycle, &logger, &base_url, &crawler_config)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                logger.error(&format!("Crawl failed: {}", message), None);
                if let Err(e) = lifecycle.fail(&message) {
                    tracing::error!(job_id, "Failed to mark job as failed: {}", e);
                }
                CrawlOutcome::Failed { message }
            }
        };

        tracing::info!(
            job_id,
            "Crawl finished in {:?}: {:?}",
            started.elapsed(),
            outcome
        );

        Ok(CrawlReport { job_id, outcome })
    }

    async fn run_job(
        &self,
        lifecycle: &JobLifecycle,
        logger: &JobLogger,
        base_url: &str,
        config: &CrawlerConfig,
    ) -> Result<CrawlOutcome> {
        let (_, base_host) = parse_base_url(base_url)?;
        let cancel = lifecycle.cancellation_token();

        let discoverer = SitemapDiscoverer::new(
            self.client.clone(),
            Duration::from_millis(config.sitemap_timeout_ms),
        );
        let mut seeds = discoverer.discover(base_url, logger, cancel).await;
        if seeds.is_empty() {
            seeds.push(base_url.to_string());
        }

        let mut scheduler = Scheduler::new(
            &base_host,
            &seeds,
            config.max_pages,
            Duration::from_millis(config.delay_ms),
        );

        let total_pages = scheduler.queue_len().min(config.max_pages as usize);
        lifecycle.set_total_pages(total_pages as i64)?;
        logger.info(&format!("Found {} URLs to crawl", seeds.len()), None);

        let ctx = PageContext {
            client: &self.client,
            extractor: self.extractor.as_ref(),
            storage: &self.storage,
            logger,
            timeout: Duration::from_millis(config.timeout_ms),
            cancel,
        };

        while scheduler.has_work() {
            if lifecycle.poll_cancelled()? {
                return Ok(cancelled(logger, &scheduler));
            }

            let url = match scheduler.next_url() {
                Some(Dequeued::Fetch(url)) => url,
                Some(Dequeued::OutOfScope(url)) => {
                    tracing::debug!(job_id = logger.job_id(), "Skipping out-of-scope URL {}", url);
                    continue;
                }
                None => break,
            };

            let internal_links = match crawl_page(&ctx, &url).await? {
                PageOutcome::Crawled { internal_links, .. } => internal_links,
                PageOutcome::Failed { .. } => Vec::new(),
                PageOutcome::Cancelled => {
                    lifecycle.poll_cancelled()?;
                    return Ok(cancelled(logger, &scheduler));
                }
            };

            let crawled = scheduler.record_crawled();
            lifecycle.set_crawled_pages(crawled as i64)?;

            let added = scheduler.enqueue_discovered(&internal_links);
            tracing::debug!(
                job_id = logger.job_id(),
                "Page {}/{} done, {} new URLs queued, {} pending",
                crawled,
                config.max_pages,
                added,
                scheduler.queue_len()
            );

            if !scheduler.pace(cancel).await {
                lifecycle.poll_cancelled()?;
                return Ok(cancelled(logger, &scheduler));
            }
        }

        let pages_crawled = scheduler.crawled();
        if lifecycle.complete(pages_crawled as i64)? {
            logger.info(
                &format!("Crawl completed! {} pages crawled", pages_crawled),
                None,
            );
            Ok(CrawlOutcome::Completed { pages_crawled })
        } else {
            // Cancelled between the last poll and finalization
            Ok(cancelled(logger, &scheduler))
        }
    }
}

fn cancelled(logger: &JobLogger, scheduler: &Scheduler) -> CrawlOutcome {
    logger.warn("Crawl cancelled by user", None);
    CrawlOutcome::Cancelled {
        pages_crawled: scheduler.crawled(),
    }
}
