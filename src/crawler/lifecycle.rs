//! Crawl job lifecycle
//!
//! A job is created `running` and finalized exactly once. External
//! cancellation arrives through the store; the lifecycle polls it and mirrors
//! it into the in-process cancellation token.

use crate::crawler::{lock_storage, SharedStorage};
use crate::state::JobStatus;
use crate::storage::{Storage, StorageResult};
use tokio_util::sync::CancellationToken;

/// Owns the status transitions of one crawl job
pub struct JobLifecycle {
    storage: SharedStorage,
    job_id: i64,
    cancel: CancellationToken,
}

impl JobLifecycle {
    /// Creates a new `running` job for the target
    pub fn create(
        storage: SharedStorage,
        target_url: &str,
        cancel: CancellationToken,
    ) -> StorageResult<Self> {
        let job_id = lock_storage(&storage)?.create_job(target_url)?;
        tracing::info!(job_id, "Created crawl job for {}", target_url);

        Ok(Self {
            storage,
            job_id,
            cancel,
        })
    }

    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Re-reads the job status and reports whether the job was cancelled
    ///
    /// A cancelled row trips the cancellation token. A token cancelled in
    /// process is written through to the row.
    pub fn poll_cancelled(&self) -> StorageResult<bool> {
        let status = lock_storage(&self.storage)?.get_job_status(self.job_id)?;

        if status == Some(JobStatus::Cancelled) {
            self.cancel.cancel();
            return Ok(true);
        }

        if self.cancel.is_cancelled() {
            self.mark_cancelled()?;
            return Ok(true);
        }

        Ok(false)
    }

    pub fn set_total_pages(&self, total_pages: i64) -> StorageResult<()> {
        lock_storage(&self.storage)?.set_total_pages(self.job_id, total_pages)
    }

    pub fn set_crawled_pages(&self, crawled_pages: i64) -> StorageResult<()> {
        lock_storage(&self.storage)?.set_crawled_pages(self.job_id, crawled_pages)
    }

    /// Finalizes a normal run; returns false if the job already left `running`
    pub fn complete(&self, crawled_pages: i64) -> StorageResult<bool> {
        let mut storage = lock_storage(&self.storage)?;
        storage.set_crawled_pages(self.job_id, crawled_pages)?;
        storage.finish_job(self.job_id, JobStatus::Completed, None)
    }

    /// Finalizes a run that hit a job-level error
    pub fn fail(&self, message: &str) -> StorageResult<bool> {
        lock_storage(&self.storage)?.finish_job(self.job_id, JobStatus::Failed, Some(message))
    }

    /// Records an in-process cancellation on the job row
    pub fn mark_cancelled(&self) -> StorageResult<bool> {
        lock_storage(&self.storage)?.finish_job(self.job_id, JobStatus::Cancelled, None)
    }

    pub fn status(&self) -> StorageResult<Option<JobStatus>> {
        lock_storage(&self.storage)?.get_job_status(self.job_id)
    }
}
