//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against a file-backed database.

use crawl_lab::config::Config;
use crawl_lab::crawler::{get_crawl_status, Coordinator, CrawlOptions, CrawlOutcome};
use crawl_lab::output::{build_audit, export_pages_csv};
use crawl_lab::state::JobStatus;
use crawl_lab::storage::{LogLevel, PageFilter, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration writing to a database inside `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.output.database_path = dir.path().join("crawl.db").display().to_string();
    config.crawler.delay_ms = 0;
    config.crawler.timeout_ms = 5_000;
    config.crawler.sitemap_timeout_ms = 2_000;
    config
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_sitemap_seeds_the_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    let index = format!(
        "<?xml version=\"1.0\"?><sitemapindex>\
            <sitemap><loc>{0}/sitemap-pages.xml</loc></sitemap>\
            <sitemap><loc>{0}/sitemap_index.xml</loc></sitemap>\
         </sitemapindex>",
        base
    );
    let urlset = format!(
        "<?xml version=\"1.0\"?><urlset>\
            <url><loc>{0}/</loc></url>\
            <url><loc>{0}/about</loc></url>\
         </urlset>",
        base
    );

    mount_page(
        &server,
        "/sitemap_index.xml",
        ResponseTemplate::new(200).set_body_string(index),
        1,
    )
    .await;
    mount_page(
        &server,
        "/sitemap-pages.xml",
        ResponseTemplate::new(200).set_body_string(urlset),
        1,
    )
    .await;
    mount_page(&server, "/", html_page("Home", "<h1>Home</h1>"), 1).await;
    mount_page(&server, "/about", html_page("About", "<h1>About us</h1>"), 1).await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::open(create_test_config(&dir)).unwrap();
    let report = coordinator
        .crawl(&base, &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed { pages_crawled: 2 });

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    let job = storage.get_job(report.job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_pages, 2);
    assert_eq!(job.crawled_pages, 2);

    let about = storage
        .get_page_by_url(report.job_id, &format!("{}/about", base))
        .unwrap()
        .unwrap();
    assert_eq!(about.title.as_deref(), Some("About"));
    assert_eq!(about.h1.as_deref(), Some("About us"));

    let infos: Vec<String> = storage
        .list_logs(report.job_id, Some(LogLevel::Info), 100)
        .unwrap()
        .into_iter()
        .map(|log| log.message)
        .collect();
    assert!(infos.contains(&"Found sitemap index with 2 sitemaps".to_string()));
    assert!(infos.contains(&"Found 2 URLs in sitemap".to_string()));
    assert!(infos.contains(&"Crawl completed! 2 pages crawled".to_string()));
}

#[tokio::test]
async fn test_links_are_followed_without_refetching() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/">Home</a>
               <a href="https://external.example/">Elsewhere</a>"#,
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/a",
        html_page("A", r#"<a href="/">Home</a> <a href="/b#top">B</a>"#),
        1,
    )
    .await;
    mount_page(&server, "/b", html_page("B", r#"<a href="/a">A</a>"#), 1).await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::open(create_test_config(&dir)).unwrap();
    let report = coordinator
        .crawl(&server.uri(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed { pages_crawled: 3 });

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_pages(report.job_id).unwrap(), 3);

    let links = storage.count_links(report.job_id).unwrap();
    assert_eq!(links.external, 1);
    assert_eq!(links.internal, 6);

    // No sitemap was found, so the crawl fell back to the base URL
    let warnings = storage
        .list_logs(report.job_id, Some(LogLevel::Warn), 100)
        .unwrap();
    assert_eq!(warnings.len(), 3);

    let fetched = requested_paths(&server).await;
    assert!(!fetched.iter().any(|p| p.contains("external")));
}

#[tokio::test]
async fn test_page_cap_limits_the_crawl() {
    let server = MockServer::start().await;

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/link-{0}">Link {0}</a>"#, i))
        .collect();
    mount_page(&server, "/", html_page("Home", &links), 1).await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::open(create_test_config(&dir)).unwrap();
    let options = CrawlOptions {
        max_pages: Some(1),
        ..CrawlOptions::default()
    };
    let report = coordinator.crawl(&server.uri(), &options).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed { pages_crawled: 1 });

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    let job = storage.get_job(report.job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.crawled_pages, 1);
    assert_eq!(job.total_pages, 1);
    assert_eq!(storage.count_pages(report.job_id).unwrap(), 1);

    let fetched = requested_paths(&server).await;
    assert!(!fetched.iter().any(|p| p.starts_with("/link-")));
}

#[tokio::test]
async fn test_failed_page_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page("Home", r#"<a href="/slow">Slow</a> <a href="/ok">OK</a>"#),
        1,
    )
    .await;
    mount_page(
        &server,
        "/slow",
        html_page("Slow", "").set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    mount_page(&server, "/ok", html_page("OK", "<p>fine</p>"), 1).await;

    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::open(create_test_config(&dir)).unwrap();
    let options = CrawlOptions {
        timeout_ms: Some(300),
        ..CrawlOptions::default()
    };
    let report = coordinator.crawl(&server.uri(), &options).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed { pages_crawled: 3 });

    let slow_url = format!("{}/slow", server.uri());
    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();

    let slow = storage
        .get_page_by_url(report.job_id, &slow_url)
        .unwrap()
        .unwrap();
    assert_eq!(slow.status_code, 0);
    assert_eq!(slow.title, None);
    assert_eq!(slow.load_time_ms, None);

    let ok = storage
        .get_page_by_url(report.job_id, &format!("{}/ok", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(ok.status_code, 200);

    let errors = storage
        .list_logs(report.job_id, Some(LogLevel::Error), 100)
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, format!("Failed to crawl {}", slow_url));
}

/// Cancels the job through a second database connection when a page is served
struct CancelOnRequest {
    db_path: PathBuf,
    job_id: i64,
}

impl Respond for CancelOnRequest {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut storage = SqliteStorage::new(&self.db_path).unwrap();
        assert!(storage.cancel_job(self.job_id).unwrap());
        html_page("A", r#"<a href="/b">B</a>"#)
    }
}

#[tokio::test]
async fn test_external_cancel_stops_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let db_path = Path::new(&config.output.database_path).to_path_buf();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/c">C</a>"#,
        ),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(CancelOnRequest { db_path, job_id: 1 })
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/b", html_page("B", ""), 0).await;
    mount_page(&server, "/c", html_page("C", ""), 0).await;

    let coordinator = Coordinator::open(config).unwrap();
    let report = coordinator
        .crawl(&server.uri(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(report.job_id, 1);
    assert_eq!(report.outcome, CrawlOutcome::Cancelled { pages_crawled: 2 });

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    let job = storage.get_job(report.job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.crawled_pages, 2);
    assert_eq!(storage.count_pages(report.job_id).unwrap(), 2);

    let messages: Vec<String> = storage
        .list_logs(report.job_id, None, 100)
        .unwrap()
        .into_iter()
        .map(|log| log.message)
        .collect();
    assert!(messages.contains(&"Job cancelled by user".to_string()));
    assert!(messages.contains(&"Crawl cancelled by user".to_string()));
    assert!(!messages.iter().any(|m| m.starts_with("Crawl completed")));
}

#[tokio::test]
async fn test_malformed_target_fails_the_job() {
    let dir = TempDir::new().unwrap();
    let coordinator = Coordinator::open(create_test_config(&dir)).unwrap();

    let report = coordinator
        .crawl("http://exa mple.com", &CrawlOptions::default())
        .await
        .unwrap();

    let CrawlOutcome::Failed { message } = &report.outcome else {
        panic!("expected a failed crawl, got {:?}", report.outcome);
    };

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    let job = storage.get_job(report.job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some(message.as_str()));
    assert!(job.completed_at.is_some());
    assert_eq!(storage.count_pages(report.job_id).unwrap(), 0);
}

#[tokio::test]
async fn test_reports_over_a_finished_job() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<h1>Welcome</h1><img src="/hero.png"><a href="/blog/first">Post</a>"#,
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/blog/first",
        ResponseTemplate::new(404).set_body_string("<html><body>gone</body></html>"),
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let db_path = PathBuf::from(&config.output.database_path);

    let job_id = crawl_lab::start_crawl(config, &server.uri(), &CrawlOptions::default())
        .await
        .unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();

    let summary = get_crawl_status(&storage, job_id).unwrap().unwrap();
    assert_eq!(summary.job.status, JobStatus::Completed);
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.image_count, 1);
    assert_eq!(summary.link_count, 1);

    let audit = build_audit(&storage, job_id).unwrap();
    assert_eq!(audit.issues.broken_pages, 1);
    assert_eq!(audit.issues.missing_alt_images, 1);
    assert_eq!(audit.issues.missing_title, 1);
    assert!(audit.scores.seo < 100);

    let mut csv = Vec::new();
    let rows = export_pages_csv(&storage, job_id, &PageFilter::default(), &mut csv).unwrap();
    assert_eq!(rows, 2);
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.starts_with("URL,Status,Title,Load Time (ms),Word Count,Crawled At\n"));
    assert!(csv.contains(&format!("{}/blog/first,404,", server.uri())));
}
