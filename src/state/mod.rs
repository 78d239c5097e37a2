//! State module for tracking crawl job progress
//!
//! # Components
//!
//! - `JobStatus`: the crawl job lifecycle (running, completed, failed, cancelled)

mod job_status;

pub use job_status::JobStatus;
