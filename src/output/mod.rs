//! Output module for reports and exports
//!
//! This module handles:
//! - The SEO audit of a crawl job and its score
//! - Rendering audits as markdown
//! - Exporting crawled pages as CSV
//! - Plain-text listings for the command line

pub mod audit;
mod export;
mod markdown;
pub mod stats;
mod traits;

pub use audit::{build_audit, AuditReport};
pub use export::{export_pages_csv, write_pages_csv, CSV_HEADERS};
pub use markdown::{format_audit_markdown, write_audit_markdown};
pub use traits::{OutputError, OutputResult};
