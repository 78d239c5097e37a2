//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    ImageFilter, ImageListing, ImageRecord, JobRecord, JobSummary, LinkCounts, LinkRecord,
    LogLevel, LogRecord, NewPage, PageFilter, PageListing, PageRecord,
};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const JOB_SUMMARY_SELECT: &str = "
    SELECT j.id, j.target_url, j.status, j.started_at, j.completed_at,
           j.total_pages, j.crawled_pages, j.error_message, j.created_at,
           (SELECT COUNT(*) FROM crawled_pages p WHERE p.job_id = j.id),
           (SELECT COUNT(*) FROM crawled_images i
                JOIN crawled_pages p ON p.id = i.page_id WHERE p.job_id = j.id),
           (SELECT COUNT(*) FROM crawled_links l
                JOIN crawled_pages p ON p.id = l.page_id WHERE p.job_id = j.id),
           (SELECT COUNT(*) FROM crawl_logs g WHERE g.job_id = j.id)
    FROM crawl_jobs j";

const PAGE_COLUMNS: &str = "p.id, p.job_id, p.url, p.status_code, p.title, p.meta_description,
    p.h1, p.word_count, p.load_time_ms, p.crawled_at";

const MISSING_ALT: &str = "(i.alt IS NULL OR TRIM(i.alt) = '')";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// The database is opened in WAL mode with a busy timeout so that another
    /// process (for example a `cancel` invocation) can write to it while a
    /// crawl is running.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn job_exists(&self, job_id: i64) -> StorageResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM crawl_jobs WHERE id = ?1",
                params![job_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn limit_clause(limit: Option<u32>) -> String {
    limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default()
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        target_url: row.get(1)?,
        status: JobStatus::from_db_string(&row.get::<_, String>(2)?).unwrap_or(JobStatus::Failed),
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        total_pages: row.get(5)?,
        crawled_pages: row.get(6)?,
        error_message: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<JobSummary> {
    Ok(JobSummary {
        job: job_from_row(row)?,
        page_count: row.get(9)?,
        image_count: row.get(10)?,
        link_count: row.get(11)?,
        log_count: row.get(12)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        url: row.get(2)?,
        status_code: row.get(3)?,
        title: row.get(4)?,
        meta_description: row.get(5)?,
        h1: row.get(6)?,
        word_count: row.get(7)?,
        load_time_ms: row.get(8)?,
        crawled_at: row.get(9)?,
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        page_id: row.get(1)?,
        url: row.get(2)?,
        alt: row.get(3)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Job Management =====

    fn create_job(&mut self, target_url: &str) -> StorageResult<i64> {
        let now = now();
        self.conn.execute(
            "INSERT INTO crawl_jobs (target_url, status, started_at, created_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![target_url, JobStatus::Running.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<Option<JobRecord>> {
        let job = self
            .conn
            .query_row(
                "SELECT id, target_url, status, started_at, completed_at,
                        total_pages, crawled_pages, error_message, created_at
                 FROM crawl_jobs WHERE id = ?1",
                params![job_id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn get_job_status(&self, job_id: i64) -> StorageResult<Option<JobStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM crawl_jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.and_then(|s| JobStatus::from_db_string(&s)))
    }

    fn set_total_pages(&mut self, job_id: i64, total_pages: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_jobs SET total_pages = ?1 WHERE id = ?2",
            params![total_pages, job_id],
        )?;
        Ok(())
    }

    fn set_crawled_pages(&mut self, job_id: i64, crawled_pages: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_jobs SET crawled_pages = ?1 WHERE id = ?2",
            params![crawled_pages, job_id],
        )?;
        Ok(())
    }

    fn finish_job(
        &mut self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> StorageResult<bool> {
        if !JobStatus::Running.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: JobStatus::Running,
                to: status,
            });
        }

        let changed = self.conn.execute(
            "UPDATE crawl_jobs
             SET status = ?1, completed_at = ?2, error_message = COALESCE(?3, error_message)
             WHERE id = ?4 AND status = ?5",
            params![
                status.to_db_string(),
                now(),
                error_message,
                job_id,
                JobStatus::Running.to_db_string()
            ],
        )?;
        Ok(changed > 0)
    }

    fn cancel_job(&mut self, job_id: i64) -> StorageResult<bool> {
        if !self.job_exists(job_id)? {
            return Err(StorageError::JobNotFound(job_id));
        }

        let now = now();
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE crawl_jobs SET status = ?1, completed_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                JobStatus::Cancelled.to_db_string(),
                now,
                job_id,
                JobStatus::Running.to_db_string()
            ],
        )?;

        if changed > 0 {
            tx.execute(
                "INSERT INTO crawl_logs (job_id, level, message, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    job_id,
                    LogLevel::Warn.to_db_string(),
                    "Job cancelled by user",
                    now
                ],
            )?;
        }

        tx.commit()?;
        Ok(changed > 0)
    }

    fn get_job_summary(&self, job_id: i64) -> StorageResult<Option<JobSummary>> {
        let sql = format!("{} WHERE j.id = ?1", JOB_SUMMARY_SELECT);
        let summary = self
            .conn
            .query_row(&sql, params![job_id], summary_from_row)
            .optional()?;
        Ok(summary)
    }

    fn list_jobs(&self, limit: u32) -> StorageResult<Vec<JobSummary>> {
        let sql = format!(
            "{} ORDER BY j.created_at DESC, j.id DESC LIMIT ?1",
            JOB_SUMMARY_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let jobs = stmt
            .query_map(params![limit], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(jobs)
    }

    fn delete_job(&mut self, job_id: i64) -> StorageResult<bool> {
        if !self.job_exists(job_id)? {
            return Ok(false);
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM crawled_images
             WHERE page_id IN (SELECT id FROM crawled_pages WHERE job_id = ?1)",
            params![job_id],
        )?;
        tx.execute(
            "DELETE FROM crawled_links
             WHERE page_id IN (SELECT id FROM crawled_pages WHERE job_id = ?1)",
            params![job_id],
        )?;
        tx.execute(
            "DELETE FROM crawled_pages WHERE job_id = ?1",
            params![job_id],
        )?;
        tx.execute("DELETE FROM crawl_logs WHERE job_id = ?1", params![job_id])?;
        tx.execute("DELETE FROM crawl_jobs WHERE id = ?1", params![job_id])?;
        tx.commit()?;

        Ok(true)
    }

    // ===== Page Management =====

    fn insert_page(&mut self, job_id: i64, page: &NewPage) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawled_pages
                (job_id, url, status_code, title, meta_description, h1,
                 word_count, load_time_ms, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                job_id,
                page.url,
                page.status_code,
                page.title,
                page.meta_description,
                page.h1,
                page.word_count,
                page.load_time_ms,
                now()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        let sql = format!("SELECT {} FROM crawled_pages p WHERE p.id = ?1", PAGE_COLUMNS);
        self.conn
            .query_row(&sql, params![page_id], page_from_row)
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn get_page_by_url(&self, job_id: i64, url: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM crawled_pages p WHERE p.job_id = ?1 AND p.url = ?2",
            PAGE_COLUMNS
        );
        let page = self
            .conn
            .query_row(&sql, params![job_id, url], page_from_row)
            .optional()?;
        Ok(page)
    }

    fn list_pages(&self, job_id: i64, filter: &PageFilter) -> StorageResult<Vec<PageListing>> {
        let mut sql = format!(
            "SELECT {},
                (SELECT COUNT(*) FROM crawled_images i WHERE i.page_id = p.id),
                (SELECT COUNT(*) FROM crawled_links l WHERE l.page_id = p.id)
             FROM crawled_pages p
             WHERE p.job_id = ?1",
            PAGE_COLUMNS
        );

        if let Some(status) = filter.status {
            sql.push_str(&format!(" AND ({})", status.sql_condition()));
        }

        if let Some(url_type) = filter.url_type {
            let conditions = url_type
                .patterns()
                .iter()
                .map(|pattern| format!("p.url LIKE '%{}%'", pattern))
                .collect::<Vec<_>>()
                .join(" OR ");
            sql.push_str(&format!(" AND ({})", conditions));
        }

        sql.push_str(" ORDER BY p.crawled_at DESC, p.id DESC");
        sql.push_str(&limit_clause(filter.limit));

        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![job_id], |row| {
                Ok(PageListing {
                    page: page_from_row(row)?,
                    image_count: row.get(10)?,
                    link_count: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn count_pages(&self, job_id: i64) -> StorageResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawled_pages WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ===== Image and Link Management =====

    fn insert_image(&mut self, page_id: i64, url: &str, alt: Option<&str>) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawled_images (page_id, url, alt) VALUES (?1, ?2, ?3)",
            params![page_id, url, alt],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_link(
        &mut self,
        page_id: i64,
        url: &str,
        anchor_text: &str,
        is_internal: bool,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawled_links (page_id, url, anchor_text, is_internal)
             VALUES (?1, ?2, ?3, ?4)",
            params![page_id, url, anchor_text, is_internal],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_page_images(&self, page_id: i64) -> StorageResult<Vec<ImageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, page_id, url, alt FROM crawled_images WHERE page_id = ?1 ORDER BY id",
        )?;

        let images = stmt
            .query_map(params![page_id], image_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }

    fn get_page_links(&self, page_id: i64) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, page_id, url, anchor_text, is_internal
             FROM crawled_links WHERE page_id = ?1 ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![page_id], |row| {
                Ok(LinkRecord {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    url: row.get(2)?,
                    anchor_text: row.get(3)?,
                    is_internal: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    fn list_images(&self, job_id: i64, filter: &ImageFilter) -> StorageResult<Vec<ImageListing>> {
        let mut sql = String::from(
            "SELECT i.id, i.page_id, i.url, i.alt, p.url
             FROM crawled_images i
             JOIN crawled_pages p ON p.id = i.page_id
             WHERE p.job_id = ?1",
        );

        if filter.missing_alt_only {
            sql.push_str(&format!(" AND {}", MISSING_ALT));
        }

        sql.push_str(" ORDER BY i.id");
        sql.push_str(&limit_clause(filter.limit));

        let mut stmt = self.conn.prepare(&sql)?;
        let images = stmt
            .query_map(params![job_id], |row| {
                Ok(ImageListing {
                    image: image_from_row(row)?,
                    page_url: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }

    fn count_images(&self, job_id: i64) -> StorageResult<(i64, i64)> {
        let sql = format!(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN {} THEN 1 ELSE 0 END), 0)
             FROM crawled_images i
             JOIN crawled_pages p ON p.id = i.page_id
             WHERE p.job_id = ?1",
            MISSING_ALT
        );

        let counts = self.conn.query_row(&sql, params![job_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        Ok(counts)
    }

    fn count_links(&self, job_id: i64) -> StorageResult<LinkCounts> {
        let counts = self.conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN l.is_internal THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN l.is_internal THEN 0 ELSE 1 END), 0)
             FROM crawled_links l
             JOIN crawled_pages p ON p.id = l.page_id
             WHERE p.job_id = ?1",
            params![job_id],
            |row| {
                Ok(LinkCounts {
                    internal: row.get(0)?,
                    external: row.get(1)?,
                })
            },
        )?;
        Ok(counts)
    }

    // ===== Job Log =====

    fn append_log(
        &mut self,
        job_id: i64,
        level: LogLevel,
        message: &str,
        detail: Option<&serde_json::Value>,
    ) -> StorageResult<i64> {
        let detail = detail.map(serde_json::to_string).transpose()?;

        self.conn.execute(
            "INSERT INTO crawl_logs (job_id, level, message, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job_id, level.to_db_string(), message, detail, now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_logs(
        &self,
        job_id: i64,
        level: Option<LogLevel>,
        limit: u32,
    ) -> StorageResult<Vec<LogRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, job_id, level, message, detail, created_at
             FROM crawl_logs
             WHERE job_id = ?1 AND (?2 IS NULL OR level = ?2)
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
        )?;

        let logs = stmt
            .query_map(
                params![job_id, level.map(|l| l.to_db_string()), limit],
                |row| {
                    Ok(LogRecord {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        level: LogLevel::from_db_string(&row.get::<_, String>(2)?)
                            .unwrap_or(LogLevel::Info),
                        message: row.get(3)?,
                        detail: row
                            .get::<_, Option<String>>(4)?
                            .and_then(|raw| serde_json::from_str(&raw).ok()),
                        created_at: row.get(5)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}
