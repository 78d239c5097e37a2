//! Configuration module for Crawl-Lab
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_lab::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-lab.toml")).unwrap();
//! println!("Crawler will stop after {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, OutputConfig, UserAgentConfig, DEFAULT_DELAY_MS, DEFAULT_MAX_PAGES,
    DEFAULT_SITEMAP_TIMEOUT_MS, DEFAULT_TIMEOUT_MS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub(crate) use validation::validate_crawler_config;
