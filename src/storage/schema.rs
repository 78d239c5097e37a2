//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Crawl-Lab database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl invocation
CREATE TABLE IF NOT EXISTS crawl_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_url TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    total_pages INTEGER NOT NULL DEFAULT 0,
    crawled_pages INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_jobs_status ON crawl_jobs(status);

-- One row per attempted URL; status_code 0 marks a failed fetch
CREATE TABLE IF NOT EXISTS crawled_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES crawl_jobs(id),
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    title TEXT,
    meta_description TEXT,
    h1 TEXT,
    word_count INTEGER,
    load_time_ms INTEGER,
    crawled_at TEXT NOT NULL,
    UNIQUE(job_id, url)
);

CREATE INDEX IF NOT EXISTS idx_crawled_pages_job ON crawled_pages(job_id);
CREATE INDEX IF NOT EXISTS idx_crawled_pages_url ON crawled_pages(url);

CREATE TABLE IF NOT EXISTS crawled_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES crawled_pages(id),
    url TEXT NOT NULL,
    alt TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawled_images_page ON crawled_images(page_id);

CREATE TABLE IF NOT EXISTS crawled_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES crawled_pages(id),
    url TEXT NOT NULL,
    anchor_text TEXT NOT NULL DEFAULT '',
    is_internal INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawled_links_page ON crawled_links(page_id);

-- Append-only job log; detail holds a JSON document
CREATE TABLE IF NOT EXISTS crawl_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES crawl_jobs(id),
    level TEXT NOT NULL,
    message TEXT NOT NULL,
    detail TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_logs_job ON crawl_logs(job_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
