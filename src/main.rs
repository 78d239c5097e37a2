//! Crawl-Lab main entry point
//!
//! This is the command-line interface for the Crawl-Lab SEO site crawler.

use clap::{Parser, Subcommand, ValueEnum};
use crawl_lab::config::{load_config_with_hash, Config};
use crawl_lab::crawler::{cancel_crawl, get_crawl_status, Coordinator, CrawlOptions, CrawlOutcome};
use crawl_lab::output::{build_audit, export_pages_csv, format_audit_markdown, stats};
use crawl_lab::storage::{
    open_storage, ImageFilter, LogLevel, PageFilter, SqliteStorage, StatusFilter, Storage,
    UrlTypeFilter, DEFAULT_JOB_LIMIT, DEFAULT_LOG_LIMIT,
};
use crawl_lab::CrawlError;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Crawl-Lab: an SEO site crawler
///
/// Crawl-Lab discovers a site's pages through its sitemaps or by following
/// same-site links, records titles, descriptions, headings, images, links and
/// word counts for each page, and audits the result.
#[derive(Parser, Debug)]
#[command(name = "crawl-lab")]
#[command(version = "1.0.0")]
#[command(about = "An SEO site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the database path from the configuration
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and record its pages
    Crawl {
        /// Site to crawl; `https://` is assumed when no scheme is given
        url: String,

        /// Maximum number of pages to fetch
        #[arg(long)]
        max_pages: Option<u32>,

        /// Delay between requests in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Per-page request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the final job summary as JSON
        #[arg(long)]
        json: bool,
    },

    #[command(flatten)]
    Query(QueryCommand),
}

/// Commands that read or edit the database without crawling
#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Show a job with its page, image, link and log counts
    Status {
        job_id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Request cancellation of a running job
    Cancel { job_id: i64 },

    /// List recent jobs, newest first
    Jobs {
        #[arg(long, default_value_t = DEFAULT_JOB_LIMIT)]
        limit: u32,

        #[arg(long)]
        json: bool,
    },

    /// Show a job's log entries, newest first
    Logs {
        job_id: i64,

        /// Only show entries of this level (info, warn, error)
        #[arg(long)]
        level: Option<LogLevel>,

        #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: u32,

        #[arg(long)]
        json: bool,
    },

    /// List a job's crawled pages, newest first
    Pages {
        job_id: i64,

        #[command(flatten)]
        filter: PageFilterArgs,

        #[arg(long)]
        json: bool,
    },

    /// List the images found by a job
    Images {
        job_id: i64,

        /// Only list images without alt text
        #[arg(long)]
        missing_alt: bool,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Export a job's pages as CSV
    Export {
        job_id: i64,

        #[command(flatten)]
        filter: PageFilterArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Audit a job's pages and compute its SEO score
    Audit {
        job_id: i64,

        #[arg(long, value_enum, default_value_t = AuditFormat::Markdown)]
        format: AuditFormat,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a job and everything recorded for it
    Delete { job_id: i64 },
}

#[derive(clap::Args, Debug)]
struct PageFilterArgs {
    /// Status filter: ok, not-found, error or redirect
    #[arg(long)]
    status: Option<StatusFilter>,

    /// URL type filter: product, blog or category
    #[arg(long)]
    url_type: Option<UrlTypeFilter>,

    #[arg(long)]
    limit: Option<u32>,
}

impl From<&PageFilterArgs> for PageFilter {
    fn from(args: &PageFilterArgs) -> Self {
        PageFilter {
            status: args.status,
            url_type: args.url_type,
            limit: args.limit,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AuditFormat {
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    (cfg, Some(hash))
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => (Config::default(), None),
    };

    if let Some(database) = &cli.database {
        config.output.database_path = database.display().to_string();
    }

    match cli.command {
        Command::Crawl {
            url,
            max_pages,
            delay_ms,
            timeout_ms,
            json,
        } => {
            let options = CrawlOptions {
                max_pages,
                delay_ms,
                timeout_ms,
            };
            handle_crawl(config, config_hash, &url, &options, json).await
        }
        Command::Query(command) => {
            let mut storage = open_storage(Path::new(&config.output.database_path))?;
            handle_query(&mut storage, command)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_lab=info,warn"),
            1 => EnvFilter::new("crawl_lab=debug,info"),
            2 => EnvFilter::new("crawl_lab=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(io::stderr)
        .init();
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    url: &str,
    options: &CrawlOptions,
    json: bool,
) -> CliResult {
    let mut coordinator = Coordinator::open(config)?;
    if let Some(hash) = config_hash {
        coordinator = coordinator.with_config_hash(hash);
    }

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling crawl");
            cancel.cancel();
        }
    });

    let report = coordinator.crawl(url, options).await?;
    match &report.outcome {
        CrawlOutcome::Completed { pages_crawled } => {
            tracing::info!("Crawl completed successfully ({} pages)", pages_crawled)
        }
        CrawlOutcome::Cancelled { pages_crawled } => {
            tracing::warn!("Crawl cancelled after {} pages", pages_crawled)
        }
        CrawlOutcome::Failed { message } => tracing::error!("Crawl failed: {}", message),
    }

    let storage = coordinator.storage();
    let summary = {
        let storage = storage.lock().map_err(|_| "storage lock poisoned")?;
        get_crawl_status(&*storage, report.job_id)?
    };

    if let Some(summary) = summary {
        if json {
            print_json(&summary)?;
        } else {
            stats::print_job_summary(&summary);
        }
    }

    if let CrawlOutcome::Failed { message } = report.outcome {
        return Err(message.into());
    }

    Ok(())
}

/// Handles every command that only reads or edits the database
fn handle_query(storage: &mut SqliteStorage, command: QueryCommand) -> CliResult {
    match command {
        QueryCommand::Status { job_id, json } => {
            let summary = get_crawl_status(&*storage, job_id)?.ok_or(CrawlError::JobNotFound(job_id))?;
            if json {
                print_json(&summary)?;
            } else {
                stats::print_job_summary(&summary);
            }
        }

        QueryCommand::Cancel { job_id } => {
            if cancel_crawl(storage, job_id)? {
                println!("Cancellation requested for job {}", job_id);
            } else {
                println!("Job {} is not running", job_id);
            }
        }

        QueryCommand::Jobs { limit, json } => {
            let jobs = storage.list_jobs(limit)?;
            if json {
                print_json(&jobs)?;
            } else {
                stats::print_jobs(&jobs);
            }
        }

        QueryCommand::Logs {
            job_id,
            level,
            limit,
            json,
        } => {
            ensure_job(storage, job_id)?;
            let logs = storage.list_logs(job_id, level, limit)?;
            if json {
                print_json(&logs)?;
            } else {
                stats::print_logs(&logs);
            }
        }

        QueryCommand::Pages {
            job_id,
            filter,
            json,
        } => {
            ensure_job(storage, job_id)?;
            let pages = storage.list_pages(job_id, &PageFilter::from(&filter))?;
            if json {
                print_json(&pages)?;
            } else {
                stats::print_pages(&pages);
            }
        }

        QueryCommand::Images {
            job_id,
            missing_alt,
            limit,
            json,
        } => {
            ensure_job(storage, job_id)?;
            let filter = ImageFilter {
                missing_alt_only: missing_alt,
                limit,
            };
            let images = storage.list_images(job_id, &filter)?;
            let (total, missing) = storage.count_images(job_id)?;
            if json {
                print_json(&serde_json::json!({
                    "images": images,
                    "total": total,
                    "missingAlt": missing,
                }))?;
            } else {
                stats::print_images(&images, total, missing);
            }
        }

        QueryCommand::Export {
            job_id,
            filter,
            output,
        } => {
            let filter = PageFilter::from(&filter);
            let rows = match &output {
                Some(path) => export_pages_csv(&*storage, job_id, &filter, File::create(path)?)?,
                None => export_pages_csv(&*storage, job_id, &filter, io::stdout().lock())?,
            };
            if let Some(path) = output {
                println!("✓ Exported {} pages to: {}", rows, path.display());
            }
        }

        QueryCommand::Audit {
            job_id,
            format,
            output,
        } => {
            let report = build_audit(&*storage, job_id)?;
            let rendered = match format {
                AuditFormat::Json => serde_json::to_string_pretty(&report)?,
                AuditFormat::Markdown => format_audit_markdown(&report),
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!(
                        "✓ Audit of job {} (score {}) written to: {}",
                        job_id,
                        report.scores.seo,
                        path.display()
                    );
                }
                None => println!("{}", rendered),
            }
        }

        QueryCommand::Delete { job_id } => {
            if !storage.delete_job(job_id)? {
                return Err(CrawlError::JobNotFound(job_id).into());
            }
            println!("✓ Deleted job {}", job_id);
        }
    }

    Ok(())
}

fn ensure_job(storage: &SqliteStorage, job_id: i64) -> Result<(), CrawlError> {
    match storage.get_job(job_id)? {
        Some(_) => Ok(()),
        None => Err(CrawlError::JobNotFound(job_id)),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
