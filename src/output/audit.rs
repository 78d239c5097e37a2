//! SEO audit of a finished crawl job
//!
//! The audit counts pages with common on-page problems and condenses them into
//! a 0-100 score. Each issue deducts its share of affected pages (of affected
//! images for alt text) times its weight; total deductions are capped at 75.

use crate::state::JobStatus;
use crate::storage::{
    ImageFilter, ImageListing, JobRecord, LinkCounts, PageFilter, PageRecord, Storage,
};
use crate::{CrawlError, Result};
use serde::Serialize;

/// Pages slower than this are reported as slow
pub const SLOW_PAGE_MS: i64 = 3000;

/// Pages with fewer words than this are reported as thin content
pub const THIN_CONTENT_WORDS: i64 = 300;

/// Status codes from this value up are reported as broken
pub const BROKEN_STATUS: u16 = 400;

/// Upper bound on deductions, so the score never drops below 25 from issues alone
pub const MAX_DEDUCTION: f64 = 75.0;

/// Maximum number of images listed in the missing-alt details
pub const MISSING_ALT_DETAIL_LIMIT: usize = 50;

const WEIGHT_MISSING_TITLE: f64 = 15.0;
const WEIGHT_MISSING_META: f64 = 10.0;
const WEIGHT_MISSING_H1: f64 = 10.0;
const WEIGHT_MISSING_ALT: f64 = 8.0;
const WEIGHT_SLOW: f64 = 7.0;
const WEIGHT_BROKEN: f64 = 20.0;
const WEIGHT_THIN: f64 = 5.0;

/// Complete audit of one job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub job: AuditJob,
    pub scores: AuditScores,
    pub totals: AuditTotals,
    pub issues: IssueCounts,
    pub issue_details: IssueDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditJob {
    pub id: i64,
    pub url: String,
    pub status: JobStatus,
    /// Completion time, or creation time for jobs that never finished
    pub crawled_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditScores {
    pub seo: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTotals {
    pub pages: i64,
    pub images: i64,
    pub links: i64,
    pub internal_links: i64,
    pub external_links: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCounts {
    pub missing_title: i64,
    pub missing_meta_description: i64,
    pub missing_h1: i64,
    pub missing_alt_images: i64,
    pub slow_pages: i64,
    pub broken_pages: i64,
    pub thin_content: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    pub pages_with_missing_title: Vec<PageIssue>,
    pub pages_with_missing_meta: Vec<PageIssue>,
    pub pages_with_missing_h1: Vec<PageIssue>,
    pub slow_pages: Vec<SlowPage>,
    pub broken_pages: Vec<BrokenPage>,
    pub images_with_missing_alt: Vec<MissingAltImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageIssue {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowPage {
    pub url: String,
    pub load_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenPage {
    pub url: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAltImage {
    pub image_url: String,
    pub page_url: String,
}

/// Loads a job's pages, images and link counts and audits them
///
/// # Returns
///
/// * `Ok(AuditReport)` - The audit
/// * `Err(CrawlError::JobNotFound)` - No job has this ID
pub fn build_audit<S: Storage>(storage: &S, job_id: i64) -> Result<AuditReport> {
    let job = storage
        .get_job(job_id)?
        .ok_or(CrawlError::JobNotFound(job_id))?;

    let pages: Vec<PageRecord> = storage
        .list_pages(job_id, &PageFilter::default())?
        .into_iter()
        .map(|listing| listing.page)
        .collect();
    let images = storage.list_images(job_id, &ImageFilter::default())?;
    let links = storage.count_links(job_id)?;

    tracing::debug!(
        job_id,
        "Auditing {} pages, {} images, {} links",
        pages.len(),
        images.len(),
        links.total()
    );

    Ok(audit_job(&job, &pages, &images, links))
}

/// Audits already loaded job data
pub fn audit_job(
    job: &JobRecord,
    pages: &[PageRecord],
    images: &[ImageListing],
    links: LinkCounts,
) -> AuditReport {
    let totals = AuditTotals {
        pages: pages.len() as i64,
        images: images.len() as i64,
        links: links.total(),
        internal_links: links.internal,
        external_links: links.external,
    };

    let mut details = IssueDetails::default();
    let mut issues = IssueCounts::default();

    for page in pages {
        if is_blank(page.title.as_deref()) {
            issues.missing_title += 1;
            details.pages_with_missing_title.push(page_issue(page));
        }
        if is_blank(page.meta_description.as_deref()) {
            issues.missing_meta_description += 1;
            details.pages_with_missing_meta.push(page_issue(page));
        }
        if is_blank(page.h1.as_deref()) {
            issues.missing_h1 += 1;
            details.pages_with_missing_h1.push(page_issue(page));
        }
        if let Some(load_time) = page.load_time_ms.filter(|&ms| ms > SLOW_PAGE_MS) {
            issues.slow_pages += 1;
            details.slow_pages.push(SlowPage {
                url: page.url.clone(),
                load_time,
            });
        }
        if page.status_code >= BROKEN_STATUS {
            issues.broken_pages += 1;
            details.broken_pages.push(BrokenPage {
                url: page.url.clone(),
                status_code: page.status_code,
            });
        }
        // Zero words (or no count at all) means nothing was extracted
        if matches!(page.word_count, Some(words) if words > 0 && words < THIN_CONTENT_WORDS) {
            issues.thin_content += 1;
        }
    }

    for listing in images.iter().filter(|l| l.image.is_missing_alt()) {
        issues.missing_alt_images += 1;
        if details.images_with_missing_alt.len() < MISSING_ALT_DETAIL_LIMIT {
            details.images_with_missing_alt.push(MissingAltImage {
                image_url: listing.image.url.clone(),
                page_url: listing.page_url.clone(),
            });
        }
    }

    AuditReport {
        job: AuditJob {
            id: job.id,
            url: job.target_url.clone(),
            status: job.status,
            crawled_at: job
                .completed_at
                .clone()
                .unwrap_or_else(|| job.created_at.clone()),
        },
        scores: AuditScores {
            seo: seo_score(&issues, &totals),
        },
        totals,
        issues,
        issue_details: details,
    }
}

/// Computes the 0-100 SEO score from issue counts
pub fn seo_score(issues: &IssueCounts, totals: &AuditTotals) -> u8 {
    let mut deductions = 0.0;

    if totals.pages > 0 {
        let pages = totals.pages as f64;
        deductions += issues.missing_title as f64 / pages * WEIGHT_MISSING_TITLE;
        deductions += issues.missing_meta_description as f64 / pages * WEIGHT_MISSING_META;
        deductions += issues.missing_h1 as f64 / pages * WEIGHT_MISSING_H1;
        deductions += issues.broken_pages as f64 / pages * WEIGHT_BROKEN;
        deductions += issues.slow_pages as f64 / pages * WEIGHT_SLOW;
        deductions += issues.thin_content as f64 / pages * WEIGHT_THIN;
    }

    if totals.images > 0 {
        deductions += issues.missing_alt_images as f64 / totals.images as f64 * WEIGHT_MISSING_ALT;
    }

    let score = (100.0 - deductions.min(MAX_DEDUCTION)).round().max(0.0);
    score as u8
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn page_issue(page: &PageRecord) -> PageIssue {
    PageIssue {
        url: page.url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ImageRecord, NewPage, SqliteStorage};

    fn job() -> JobRecord {
        JobRecord {
            id: 1,
            target_url: "https://example.com".to_string(),
            status: JobStatus::Completed,
            started_at: "2024-01-01T00:00:00.000Z".to_string(),
            completed_at: Some("2024-01-01T00:10:00.000Z".to_string()),
            total_pages: 2,
            crawled_pages: 2,
            error_message: None,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn page(id: i64, url: &str) -> PageRecord {
        PageRecord {
            id,
            job_id: 1,
            url: url.to_string(),
            status_code: 200,
            title: Some("Title".to_string()),
            meta_description: Some("Description".to_string()),
            h1: Some("Heading".to_string()),
            word_count: Some(800),
            load_time_ms: Some(250),
            crawled_at: "2024-01-01T00:01:00.000Z".to_string(),
        }
    }

    fn image(id: i64, alt: Option<&str>) -> ImageListing {
        ImageListing {
            image: ImageRecord {
                id,
                page_id: 1,
                url: format!("https://example.com/{}.png", id),
                alt: alt.map(str::to_string),
            },
            page_url: "https://example.com/".to_string(),
        }
    }

    #[test]
    fn test_clean_site_scores_100() {
        let pages = vec![page(1, "https://example.com/"), page(2, "https://example.com/a")];
        let report = audit_job(&job(), &pages, &[image(1, Some("Logo"))], LinkCounts::default());

        assert_eq!(report.scores.seo, 100);
        assert_eq!(report.issues, IssueCounts::default());
        assert_eq!(report.job.crawled_at, "2024-01-01T00:10:00.000Z");
    }

    #[test]
    fn test_empty_job_scores_100() {
        let report = audit_job(&job(), &[], &[], LinkCounts::default());
        assert_eq!(report.scores.seo, 100);
        assert_eq!(report.totals, AuditTotals::default());
    }

    #[test]
    fn test_issue_counting() {
        let mut blank = page(1, "https://example.com/blank");
        blank.title = Some("   ".to_string());
        blank.meta_description = None;
        blank.h1 = None;
        blank.word_count = Some(120);
        blank.load_time_ms = Some(4500);

        let mut broken = page(2, "https://example.com/gone");
        broken.status_code = 404;

        let mut failed = page(3, "https://example.com/down");
        failed.status_code = 0;
        failed.word_count = None;
        failed.load_time_ms = None;

        let pages = vec![blank, broken, failed];
        let images = vec![image(1, None), image(2, Some(" ")), image(3, Some("ok"))];
        let links = LinkCounts {
            internal: 5,
            external: 2,
        };

        let report = audit_job(&job(), &pages, &images, links);

        assert_eq!(report.issues.missing_title, 1);
        assert_eq!(report.issues.missing_meta_description, 1);
        assert_eq!(report.issues.missing_h1, 1);
        assert_eq!(report.issues.slow_pages, 1);
        assert_eq!(report.issues.broken_pages, 1);
        assert_eq!(report.issues.thin_content, 1);
        assert_eq!(report.issues.missing_alt_images, 2);
        assert_eq!(report.totals.links, 7);
        assert_eq!(
            report.issue_details.broken_pages,
            vec![BrokenPage {
                url: "https://example.com/gone".to_string(),
                status_code: 404
            }]
        );
        assert_eq!(report.issue_details.slow_pages[0].load_time, 4500);
    }

    #[test]
    fn test_score_weights() {
        let totals = AuditTotals {
            pages: 4,
            images: 10,
            ..AuditTotals::default()
        };
        let issues = IssueCounts {
            missing_title: 2,
            missing_alt_images: 5,
            ..IssueCounts::default()
        };

        // 2/4 * 15 + 5/10 * 8 = 11.5 -> 88.5 rounds to 89
        assert_eq!(seo_score(&issues, &totals), 89);
    }

    #[test]
    fn test_deductions_are_capped() {
        let totals = AuditTotals {
            pages: 1,
            images: 1,
            ..AuditTotals::default()
        };
        let issues = IssueCounts {
            missing_title: 1,
            missing_meta_description: 1,
            missing_h1: 1,
            missing_alt_images: 1,
            slow_pages: 1,
            broken_pages: 1,
            thin_content: 1,
        };

        assert_eq!(seo_score(&issues, &totals), 25);
    }

    #[test]
    fn test_missing_alt_details_are_capped() {
        let images: Vec<ImageListing> = (0..60).map(|i| image(i, None)).collect();
        let report = audit_job(&job(), &[page(1, "https://example.com/")], &images, LinkCounts::default());

        assert_eq!(report.issues.missing_alt_images, 60);
        assert_eq!(
            report.issue_details.images_with_missing_alt.len(),
            MISSING_ALT_DETAIL_LIMIT
        );
    }

    #[test]
    fn test_unfinished_job_uses_created_at() {
        let mut running = job();
        running.status = JobStatus::Running;
        running.completed_at = None;

        let report = audit_job(&running, &[], &[], LinkCounts::default());
        assert_eq!(report.job.crawled_at, running.created_at);
    }

    #[test]
    fn test_build_audit_from_storage() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let job_id = storage.create_job("https://example.com").unwrap();
        let page_id = storage
            .insert_page(
                job_id,
                &NewPage {
                    url: "https://example.com/".to_string(),
                    status_code: 200,
                    title: Some("Home".to_string()),
                    word_count: Some(50),
                    load_time_ms: Some(100),
                    ..NewPage::default()
                },
            )
            .unwrap();
        storage.insert_image(page_id, "https://example.com/a.png", None).unwrap();
        storage
            .insert_link(page_id, "https://example.com/about", "About", true)
            .unwrap();

        let report = build_audit(&storage, job_id).unwrap();
        assert_eq!(report.totals.pages, 1);
        assert_eq!(report.totals.internal_links, 1);
        assert_eq!(report.issues.missing_meta_description, 1);
        assert_eq!(report.issues.missing_h1, 1);
        assert_eq!(report.issues.thin_content, 1);
        assert_eq!(report.issues.missing_alt_images, 1);
        // 10 + 10 + 5 + 8 = 33 -> 67
        assert_eq!(report.scores.seo, 67);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"]["missingMetaDescription"], 1);
        assert_eq!(json["issueDetails"]["imagesWithMissingAlt"][0]["pageUrl"], "https://example.com/");
    }

    #[test]
    fn test_build_audit_unknown_job() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            build_audit(&storage, 99),
            Err(CrawlError::JobNotFound(99))
        ));
    }
}
