//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Crawl job lifecycle records
//! - Crawled pages with their images and links
//! - The append-only job log
//! - Listing and aggregate queries used by reports

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::JobStatus;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl job in the database
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: i64,
    pub target_url: String,
    pub status: JobStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total_pages: i64,
    pub crawled_pages: i64,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// A crawl job together with aggregate counts of its persisted rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    #[serde(flatten)]
    pub job: JobRecord,
    pub page_count: i64,
    pub image_count: i64,
    pub link_count: i64,
    pub log_count: i64,
}

/// A page row to be inserted
///
/// A status code of 0 marks a page whose fetch failed; such rows carry no
/// extracted metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPage {
    pub url: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub word_count: Option<i64>,
    pub load_time_ms: Option<i64>,
}

impl NewPage {
    /// Placeholder row for a URL whose fetch failed
    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Represents a crawled page in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: i64,
    pub job_id: i64,
    pub url: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub word_count: Option<i64>,
    pub load_time_ms: Option<i64>,
    pub crawled_at: String,
}

/// A page with the number of images and links recorded for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageListing {
    #[serde(flatten)]
    pub page: PageRecord,
    pub image_count: i64,
    pub link_count: i64,
}

/// Represents an image found on a crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: i64,
    pub page_id: i64,
    pub url: String,
    pub alt: Option<String>,
}

impl ImageRecord {
    /// True when the alt text is absent or empty
    pub fn is_missing_alt(&self) -> bool {
        self.alt.as_deref().map(str::trim).unwrap_or("").is_empty()
    }
}

/// An image together with the URL of the page it was found on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListing {
    #[serde(flatten)]
    pub image: ImageRecord,
    pub page_url: String,
}

/// Represents a link found on a crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: i64,
    pub page_id: i64,
    pub url: String,
    pub anchor_text: String,
    pub is_internal: bool,
}

/// Internal/external link totals for a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCounts {
    pub internal: i64,
    pub external: i64,
}

impl LinkCounts {
    pub fn total(&self) -> i64 {
        self.internal + self.external
    }
}

/// Represents a job log entry in the database
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    pub job_id: i64,
    pub level: LogLevel,
    pub message: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: String,
}

/// Severity of a job log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown log level '{}' (expected info, warn or error)", s))
    }
}

/// Status-code filter for page listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Exactly 200
    Ok,
    /// Exactly 404
    NotFound,
    /// Any status of 400 or above
    Error,
    /// 300 to 399
    Redirect,
}

impl StatusFilter {
    pub(crate) fn sql_condition(&self) -> &'static str {
        match self {
            Self::Ok => "p.status_code = 200",
            Self::NotFound => "p.status_code = 404",
            Self::Error => "p.status_code >= 400",
            Self::Redirect => "p.status_code >= 300 AND p.status_code < 400",
        }
    }

    pub fn matches(&self, status_code: u16) -> bool {
        match self {
            Self::Ok => status_code == 200,
            Self::NotFound => status_code == 404,
            Self::Error => status_code >= 400,
            Self::Redirect => (300..400).contains(&status_code),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ok" | "200" => Ok(Self::Ok),
            "not-found" | "404" => Ok(Self::NotFound),
            "error" => Ok(Self::Error),
            "redirect" | "3xx" => Ok(Self::Redirect),
            _ => Err(format!(
                "unknown status filter '{}' (expected ok, not-found, error or redirect)",
                s
            )),
        }
    }
}

/// URL-type filter for page listings, matched as path substrings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlTypeFilter {
    Product,
    Blog,
    Category,
}

impl UrlTypeFilter {
    /// Path fragments identifying this type (compared case-insensitively)
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Product => &["/product"],
            Self::Blog => &["/blog", "/post", "/article", "/news"],
            Self::Category => &["/category", "/collection"],
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        self.patterns().iter().any(|p| url.contains(p))
    }
}

impl FromStr for UrlTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "blog" => Ok(Self::Blog),
            "category" => Ok(Self::Category),
            _ => Err(format!(
                "unknown URL type '{}' (expected product, blog or category)",
                s
            )),
        }
    }
}

/// Filters for [`Storage::list_pages`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFilter {
    pub status: Option<StatusFilter>,
    pub url_type: Option<UrlTypeFilter>,
    pub limit: Option<u32>,
}

/// Filters for [`Storage::list_images`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageFilter {
    /// Only images whose alt text is absent or empty
    pub missing_alt_only: bool,
    pub limit: Option<u32>,
}

/// Default number of jobs returned by job listings
pub const DEFAULT_JOB_LIMIT: u32 = 50;

/// Default number of entries returned by log listings
pub const DEFAULT_LOG_LIMIT: u32 = 100;
