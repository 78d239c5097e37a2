//! Plain-text rendering of jobs, pages, images and logs
//!
//! Used by the command-line interface for its non-JSON output.

use crate::storage::{ImageListing, JobSummary, LogRecord, PageListing};

/// Formats one job with its aggregate counts
pub fn format_job_summary(summary: &JobSummary) -> String {
    let job = &summary.job;
    let mut out = String::new();

    out.push_str(&format!("=== Crawl Job {} ===\n\n", job.id));
    out.push_str(&format!("  Target: {}\n", job.target_url));
    out.push_str(&format!("  Status: {}\n", job.status));
    out.push_str(&format!("  Started: {}\n", job.started_at));
    if let Some(completed) = &job.completed_at {
        out.push_str(&format!("  Completed: {}\n", completed));
    }
    out.push_str(&format!(
        "  Progress: {} / {} pages\n",
        job.crawled_pages, job.total_pages
    ));
    if let Some(error) = &job.error_message {
        out.push_str(&format!("  Error: {}\n", error));
    }
    out.push('\n');

    out.push_str(&format!("  Pages recorded: {}\n", summary.page_count));
    out.push_str(&format!("  Images found: {}\n", summary.image_count));
    out.push_str(&format!("  Links found: {}\n", summary.link_count));
    out.push_str(&format!("  Log entries: {}\n", summary.log_count));

    out
}

pub fn print_job_summary(summary: &JobSummary) {
    print!("{}", format_job_summary(summary));
}

/// Prints a table of jobs, newest first
pub fn print_jobs(jobs: &[JobSummary]) {
    if jobs.is_empty() {
        println!("No crawl jobs found");
        return;
    }

    println!(
        "{:>6}  {:<10}  {:>7}  {:>7}  {:<24}  {}",
        "ID", "STATUS", "PAGES", "IMAGES", "CREATED", "TARGET"
    );
    for summary in jobs {
        let job = &summary.job;
        println!(
            "{:>6}  {:<10}  {:>7}  {:>7}  {:<24}  {}",
            job.id, job.status, summary.page_count, summary.image_count, job.created_at, job.target_url
        );
    }
}

/// Prints pages with their status, load time and counts
pub fn print_pages(pages: &[PageListing]) {
    if pages.is_empty() {
        println!("No pages found");
        return;
    }

    for listing in pages {
        let page = &listing.page;
        let load_time = page
            .load_time_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "[{}] {} ({}, {} images, {} links)",
            page.status_code, page.url, load_time, listing.image_count, listing.link_count
        );
        if let Some(title) = &page.title {
            println!("      {}", title);
        }
    }
    println!("\n{} pages", pages.len());
}

/// Prints images, flagging those without alt text
pub fn print_images(images: &[ImageListing], total: i64, missing_alt: i64) {
    for listing in images {
        let alt = match &listing.image.alt {
            Some(alt) if !listing.image.is_missing_alt() => alt.as_str(),
            _ => "(missing alt)",
        };
        println!("{}  {}  [{}]", listing.image.url, alt, listing.page_url);
    }

    println!(
        "\n{} images shown, {} total, {} missing alt text",
        images.len(),
        total,
        missing_alt
    );
}

/// Prints log entries as `time level message`
pub fn print_logs(logs: &[LogRecord]) {
    for log in logs {
        match &log.detail {
            Some(detail) => println!(
                "{} {:<5} {} {}",
                log.created_at, log.level, log.message, detail
            ),
            None => println!("{} {:<5} {}", log.created_at, log.level, log.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobStatus;
    use crate::storage::JobRecord;

    #[test]
    fn test_format_job_summary() {
        let summary = JobSummary {
            job: JobRecord {
                id: 3,
                target_url: "https://example.com".to_string(),
                status: JobStatus::Failed,
                started_at: "2024-01-01T00:00:00.000Z".to_string(),
                completed_at: Some("2024-01-01T00:00:05.000Z".to_string()),
                total_pages: 10,
                crawled_pages: 4,
                error_message: Some("disk full".to_string()),
                created_at: "2024-01-01T00:00:00.000Z".to_string(),
            },
            page_count: 4,
            image_count: 12,
            link_count: 40,
            log_count: 9,
        };

        let text = format_job_summary(&summary);
        assert!(text.starts_with("=== Crawl Job 3 ==="));
        assert!(text.contains("  Status: failed\n"));
        assert!(text.contains("  Progress: 4 / 10 pages\n"));
        assert!(text.contains("  Error: disk full\n"));
        assert!(text.contains("  Log entries: 9\n"));
    }
}
