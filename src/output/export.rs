//! CSV export of crawled pages

use crate::output::traits::OutputResult;
use crate::storage::{PageFilter, PageRecord, Storage};
use crate::{CrawlError, Result};
use std::io::Write;

/// Column headers of the page export
pub const CSV_HEADERS: [&str; 6] = [
    "URL",
    "Status",
    "Title",
    "Load Time (ms)",
    "Word Count",
    "Crawled At",
];

/// Writes pages as CSV, one row per page, in the given order
///
/// Missing values are written as empty fields.
pub fn write_pages_csv<'a, W, I>(writer: W, pages: I) -> OutputResult<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a PageRecord>,
{
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADERS)?;

    let mut rows = 0;
    for page in pages {
        csv.write_record([
            page.url.clone(),
            page.status_code.to_string(),
            page.title.clone().unwrap_or_default(),
            optional(page.load_time_ms),
            optional(page.word_count),
            page.crawled_at.clone(),
        ])?;
        rows += 1;
    }

    csv.flush()?;
    Ok(rows)
}

/// Exports the filtered pages of a job, newest first
///
/// Returns the number of rows written.
pub fn export_pages_csv<S, W>(storage: &S, job_id: i64, filter: &PageFilter, writer: W) -> Result<usize>
where
    S: Storage,
    W: Write,
{
    if storage.get_job(job_id)?.is_none() {
        return Err(CrawlError::JobNotFound(job_id));
    }

    let pages = storage.list_pages(job_id, filter)?;
    let rows = write_pages_csv(writer, pages.iter().map(|listing| &listing.page))?;

    tracing::info!(job_id, "Exported {} pages as CSV", rows);
    Ok(rows)
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
