//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::JobStatus;
use crate::storage::{
    ImageFilter, ImageListing, ImageRecord, JobRecord, JobSummary, LinkCounts, LinkRecord,
    LogLevel, LogRecord, NewPage, PageFilter, PageListing, PageRecord,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Crawl job not found: {0}")]
    JobNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler and its
/// reports. Every job-level state change goes through here, including external
/// cancellation, which the crawl loop observes by re-reading the job.
pub trait Storage {
    // ===== Job Management =====

    /// Creates a new crawl job in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created job
    fn create_job(&mut self, target_url: &str) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<Option<JobRecord>>;

    /// Reads only the status of a job
    fn get_job_status(&self, job_id: i64) -> StorageResult<Option<JobStatus>>;

    /// Records the estimated number of pages for a job
    fn set_total_pages(&mut self, job_id: i64, total_pages: i64) -> StorageResult<()>;

    /// Records the number of pages attempted so far
    fn set_crawled_pages(&mut self, job_id: i64, crawled_pages: i64) -> StorageResult<()>;

    /// Moves a running job to a terminal status
    ///
    /// Only rows still `running` are updated, so a job cancelled externally is
    /// never overwritten.
    ///
    /// # Returns
    ///
    /// `true` if the job was finalized, `false` if it had already left `running`
    fn finish_job(
        &mut self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> StorageResult<bool>;

    /// Cancels a running job and records a warning in its log
    ///
    /// # Returns
    ///
    /// `true` if the job was cancelled, `false` if it was already terminal
    fn cancel_job(&mut self, job_id: i64) -> StorageResult<bool>;

    /// Gets a job with page, image, link and log counts
    fn get_job_summary(&self, job_id: i64) -> StorageResult<Option<JobSummary>>;

    /// Lists jobs newest first with their counts
    fn list_jobs(&self, limit: u32) -> StorageResult<Vec<JobSummary>>;

    /// Deletes a job and every row that belongs to it
    ///
    /// # Returns
    ///
    /// `true` if the job existed
    fn delete_job(&mut self, job_id: i64) -> StorageResult<bool>;

    // ===== Page Management =====

    /// Inserts a crawled page for a job
    ///
    /// # Returns
    ///
    /// The page ID
    fn insert_page(&mut self, job_id: i64, page: &NewPage) -> StorageResult<i64>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Gets a page of a job by URL
    fn get_page_by_url(&self, job_id: i64, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Lists the pages of a job, newest first, with image and link counts
    fn list_pages(&self, job_id: i64, filter: &PageFilter) -> StorageResult<Vec<PageListing>>;

    /// Counts the pages of a job
    fn count_pages(&self, job_id: i64) -> StorageResult<i64>;

    // ===== Image and Link Management =====

    /// Inserts one image row for a page
    fn insert_image(&mut self, page_id: i64, url: &str, alt: Option<&str>) -> StorageResult<i64>;

    /// Inserts one link row for a page
    fn insert_link(
        &mut self,
        page_id: i64,
        url: &str,
        anchor_text: &str,
        is_internal: bool,
    ) -> StorageResult<i64>;

    /// Gets all images of a page
    fn get_page_images(&self, page_id: i64) -> StorageResult<Vec<ImageRecord>>;

    /// Gets all links of a page
    fn get_page_links(&self, page_id: i64) -> StorageResult<Vec<LinkRecord>>;

    /// Lists the images of a job in insertion order
    fn list_images(&self, job_id: i64, filter: &ImageFilter) -> StorageResult<Vec<ImageListing>>;

    /// Counts the images of a job, returning `(total, missing_alt)`
    fn count_images(&self, job_id: i64) -> StorageResult<(i64, i64)>;

    /// Counts the internal and external links of a job
    fn count_links(&self, job_id: i64) -> StorageResult<LinkCounts>;

    // ===== Job Log =====

    /// Appends a log entry to a job
    fn append_log(
        &mut self,
        job_id: i64,
        level: LogLevel,
        message: &str,
        detail: Option<&serde_json::Value>,
    ) -> StorageResult<i64>;

    /// Lists log entries of a job newest first, optionally of a single level
    fn list_logs(
        &self,
        job_id: i64,
        level: Option<LogLevel>,
        limit: u32,
    ) -> StorageResult<Vec<LogRecord>>;
}
