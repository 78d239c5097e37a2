//! Markdown audit report generation
//!
//! This module renders an [`AuditReport`] as a human-readable markdown
//! document: job information, totals, the issue table and detail lists.

use crate::output::audit::AuditReport;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown rendering of an audit to a file
///
/// # Arguments
///
/// * `report` - The audit to render
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_audit_markdown(report: &AuditReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_audit_markdown(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats an audit as markdown
pub fn format_audit_markdown(report: &AuditReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# SEO Audit: {}\n\n", report.job.url));

    md.push_str("## Job Information\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", report.job.id));
    md.push_str(&format!("- **Status**: {}\n", report.job.status));
    md.push_str(&format!("- **Crawled**: {}\n", report.job.crawled_at));
    md.push_str(&format!("- **SEO Score**: {}/100\n\n", report.scores.seo));

    let totals = &report.totals;
    md.push_str("## Totals\n\n");
    md.push_str(&format!("- **Pages**: {}\n", totals.pages));
    md.push_str(&format!("- **Images**: {}\n", totals.images));
    md.push_str(&format!(
        "- **Links**: {} ({} internal, {} external)\n\n",
        totals.links, totals.internal_links, totals.external_links
    ));

    let issues = &report.issues;
    md.push_str("## Issues\n\n");
    md.push_str("| Issue | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Missing title | {} |\n", issues.missing_title));
    md.push_str(&format!(
        "| Missing meta description | {} |\n",
        issues.missing_meta_description
    ));
    md.push_str(&format!("| Missing H1 | {} |\n", issues.missing_h1));
    md.push_str(&format!(
        "| Images missing alt text | {} |\n",
        issues.missing_alt_images
    ));
    md.push_str(&format!("| Slow pages (> 3s) | {} |\n", issues.slow_pages));
    md.push_str(&format!("| Broken pages (4xx/5xx) | {} |\n", issues.broken_pages));
    md.push_str(&format!(
        "| Thin content (< 300 words) | {} |\n\n",
        issues.thin_content
    ));

    let details = &report.issue_details;

    if !details.broken_pages.is_empty() {
        md.push_str("## Broken Pages\n\n");
        for page in &details.broken_pages {
            md.push_str(&format!("- `{}` {}\n", page.status_code, page.url));
        }
        md.push('\n');
    }

    if !details.slow_pages.is_empty() {
        md.push_str("## Slow Pages\n\n");
        for page in &details.slow_pages {
            md.push_str(&format!("- {} ({} ms)\n", page.url, page.load_time));
        }
        md.push('\n');
    }

    push_url_section(
        &mut md,
        "Pages Missing a Title",
        details.pages_with_missing_title.iter().map(|p| p.url.as_str()),
    );
    push_url_section(
        &mut md,
        "Pages Missing a Meta Description",
        details.pages_with_missing_meta.iter().map(|p| p.url.as_str()),
    );
    push_url_section(
        &mut md,
        "Pages Missing an H1",
        details.pages_with_missing_h1.iter().map(|p| p.url.as_str()),
    );

    if !details.images_with_missing_alt.is_empty() {
        md.push_str("## Images Missing Alt Text\n\n");
        md.push_str("| Image | Page |\n");
        md.push_str("|-------|------|\n");
        for image in &details.images_with_missing_alt {
            md.push_str(&format!("| {} | {} |\n", image.image_url, image.page_url));
        }
        if (details.images_with_missing_alt.len() as i64) < issues.missing_alt_images {
            md.push_str(&format!(
                "\n_Showing {} of {} images._\n",
                details.images_with_missing_alt.len(),
                issues.missing_alt_images
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Generated by Crawl-Lab v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    md
}

fn push_url_section<'a>(md: &mut String, heading: &str, urls: impl Iterator<Item = &'a str>) {
    let mut urls = urls.peekable();
    if urls.peek().is_none() {
        return;
    }

    md.push_str(&format!("## {}\n\n", heading));
    for url in urls {
        md.push_str(&format!("- {}\n", url));
    }
    md.push('\n');
}
