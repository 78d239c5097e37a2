//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Sitemap discovery of the initial URL set
//! - HTTP fetching with per-request timeouts and cancellation
//! - Queue scheduling, the page cap and request pacing
//! - Job lifecycle and the per-job event log
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod job_log;
mod lifecycle;
mod page;
mod scheduler;
mod sitemap;

pub use coordinator::{Coordinator, CrawlOptions, CrawlOutcome, CrawlReport};
pub use fetcher::{build_http_client, fetch_url, FetchError, FetchedPage};
pub use job_log::JobLogger;
pub use lifecycle::JobLifecycle;
pub use page::{crawl_page, PageContext, PageOutcome};
pub use scheduler::{CrawlQueue, Dequeued, Scheduler};
pub use sitemap::{SitemapDiscoverer, SITEMAP_PATHS};

use crate::config::Config;
use crate::storage::{JobSummary, SqliteStorage, Storage, StorageError, StorageResult};
use crate::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// Store shared between the crawl loop, its logger and external callers
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Locks the shared store; a poisoned lock is reported as a storage error
pub(crate) fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Runs a complete crawl job
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the database named in the configuration
/// 2. Create a `running` job for the normalized target
/// 3. Seed the queue from sitemaps, or the base URL when none are found
/// 4. Fetch, extract and persist pages until the queue or the cap is exhausted
/// 5. Finalize the job as completed, failed or cancelled
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `target_url` - Site to crawl; the scheme defaults to `https://`
/// * `options` - Per-run overrides of the configured limits
///
/// # Returns
///
/// * `Ok(i64)` - The ID of the job, whatever its final status
/// * `Err(CrawlError)` - The options were invalid or the job could not be created
pub async fn start_crawl(config: Config, target_url: &str, options: &CrawlOptions) -> Result<i64> {
    let coordinator = Coordinator::open(config)?;
    let report = coordinator.crawl(target_url, options).await?;
    Ok(report.job_id)
}

/// Returns a job with its page, image, link and log counts
pub fn get_crawl_status<S: Storage>(storage: &S, job_id: i64) -> Result<Option<JobSummary>> {
    Ok(storage.get_job_summary(job_id)?)
}

/// Requests cancellation of a running job
///
/// The crawl loop observes the status change before its next page. Returns
/// false if the job had already finished.
pub fn cancel_crawl<S: Storage>(storage: &mut S, job_id: i64) -> Result<bool> {
    storage.cancel_job(job_id).map_err(|e| match e {
        StorageError::JobNotFound(id) => crate::CrawlError::JobNotFound(id),
        other => other.into(),
    })
}
