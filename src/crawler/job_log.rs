//! Per-job event log
//!
//! Every entry is persisted as a `crawl_logs` row and mirrored to `tracing`
//! with the job ID as a structured field. A failed write is reported through
//! `tracing` and otherwise ignored: losing a log line never aborts a crawl.

use crate::crawler::{lock_storage, SharedStorage};
use crate::storage::{LogLevel, Storage};
use serde_json::Value;

/// Appends structured, timestamped events to one crawl job
#[derive(Clone)]
pub struct JobLogger {
    storage: SharedStorage,
    job_id: i64,
}

impl JobLogger {
    pub fn new(storage: SharedStorage, job_id: i64) -> Self {
        Self { storage, job_id }
    }

    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn info(&self, message: &str, detail: Option<Value>) {
        self.log(LogLevel::Info, message, detail);
    }

    pub fn warn(&self, message: &str, detail: Option<Value>) {
        self.log(LogLevel::Warn, message, detail);
    }

    pub fn error(&self, message: &str, detail: Option<Value>) {
        self.log(LogLevel::Error, message, detail);
    }

    /// Records one entry
    pub fn log(&self, level: LogLevel, message: &str, detail: Option<Value>) {
        let job_id = self.job_id;
        match level {
            LogLevel::Info => tracing::info!(job_id, "{}", message),
            LogLevel::Warn => tracing::warn!(job_id, "{}", message),
            LogLevel::Error => tracing::error!(job_id, "{}", message),
        }

        let written = lock_storage(&self.storage)
            .and_then(|mut storage| storage.append_log(job_id, level, message, detail.as_ref()));

        if let Err(e) = written {
            tracing::warn!(job_id, "Failed to persist job log entry: {}", e);
        }
    }
}
