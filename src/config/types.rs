use serde::Deserialize;

/// Default page cap for a single crawl job
pub const DEFAULT_MAX_PAGES: u32 = 500;

/// Default pause between two page fetches (milliseconds)
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Default per-page request timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default per-sitemap request timeout (milliseconds)
pub const DEFAULT_SITEMAP_TIMEOUT_MS: u64 = 10_000;

/// Main configuration structure for Crawl-Lab
///
/// Every section is optional; a missing section falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched per job
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Pause between consecutive page fetches (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Timeout for a single page fetch (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Timeout for a single sitemap fetch (milliseconds)
    #[serde(rename = "sitemap-timeout-ms")]
    pub sitemap_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            sitemap_timeout_ms: DEFAULT_SITEMAP_TIMEOUT_MS,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Short purpose shown in the user agent comment
    pub description: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "CrawlLab".to_string(),
            crawler_version: "1.0".to_string(),
            description: "SEO Audit Bot".to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `Name/Version (Description)` or
    /// `Name/Version (Description; +ContactURL)` when a contact URL is set.
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} ({}; +{})",
                self.crawler_name, self.crawler_version, self.description, contact
            ),
            None => format!(
                "{}/{} ({})",
                self.crawler_name, self.crawler_version, self.description
            ),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./crawl-lab.db".to_string(),
        }
    }
}
