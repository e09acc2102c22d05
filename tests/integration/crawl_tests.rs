//! Integration tests for the harvester
//!
//! These tests use wiremock as the catalog site and run the full
//! catalog -> detail -> download -> store cycle end-to-end over HTTP.

use repro_harvest::config::{Config, CrawlerConfig, FetchConfig, OutputConfig, PacingConfig};
use repro_harvest::crawler::run_crawl;
use repro_harvest::output::load_statistics;
use repro_harvest::state::StopReason;
use repro_harvest::storage::{AssetStatus, SqliteStorage, Storage};
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, root: &Path, max_pages: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages,
            catalog_url: format!("{}/index.php/catalog/?&page={{page}}", base_url),
            allowed_domains: vec!["127.0.0.1".to_string()],
            ..CrawlerConfig::default()
        },
        pacing: PacingConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        },
        fetch: FetchConfig {
            timeout_secs: 5,
            connect_timeout_secs: 5,
            ..FetchConfig::default()
        },
        output: OutputConfig {
            database_path: root.join("data/projects.db").to_string_lossy().into_owned(),
            storage_root: root.join("downloads").to_string_lossy().into_owned(),
        },
        ..Config::default()
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn catalog_body(ids: &[u32]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="catalog-item"><a class="d-flex" href="/index.php/catalog/{}">Study {}</a></div>"#,
                id, id
            )
        })
        .collect();
    format!(
        r#"<html><body>{}<a class="d-flex" href="/index.php/catalog/?&page=2">Next</a></body></html>"#,
        items
    )
}

fn detail_body(title: Option<&str>, pdf: Option<&str>, zip: Option<&str>) -> String {
    let title = title
        .map(|t| format!(r#"<h1 id="dataset-title"><span>{}</span></h1>"#, t))
        .unwrap_or_default();
    let pdf = pdf
        .map(|href| format!(r#"<a class="btn download" data-extension="pdf" href="{}">PDF</a>"#, href))
        .unwrap_or_default();
    let zip = zip
        .map(|href| format!(r#"<a class="btn download" data-extension="zip" href="{}">ZIP</a>"#, href))
        .unwrap_or_default();
    format!("<html><body>{}{}{}</body></html>", title, pdf, zip)
}

async fn mount_catalog(server: &MockServer, page: u32, ids: &[u32]) {
    Mock::given(method("GET"))
        .and(path("/index.php/catalog/"))
        .and(query_param("page", page.to_string()))
        .respond_with(html(catalog_body(ids)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/index.php/catalog/{}/related-materials", id)))
        .respond_with(html(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_asset(server: &MockServer, asset_path: &str, body: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path(asset_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_end_to_end() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().expect("Failed to create temp dir");

    // Catalog requests must carry browser-like headers
    Mock::given(method("GET"))
        .and(path("/index.php/catalog/"))
        .and(query_param("page", "1"))
        .and(header_exists("user-agent"))
        .and(header_exists("referer"))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(html(catalog_body(&[1, 2])))
        .expect(1)
        .mount(&server)
        .await;
    mount_catalog(&server, 2, &[]).await;

    mount_detail(
        &server,
        1,
        detail_body(
            Some("Jobs and Growth in Africa"),
            Some("/files/1/report.pdf"),
            Some("/files/1/package.zip"),
        ),
    )
    .await;
    mount_detail(&server, 2, detail_body(None, Some("/files/2/notes.pdf"), None)).await;

    mount_asset(&server, "/files/1/report.pdf", b"%PDF-1.4 report").await;
    mount_asset(&server, "/files/1/package.zip", b"PK\x03\x04").await;
    mount_asset(&server, "/files/2/notes.pdf", b"%PDF-1.4 notes").await;

    let config = create_test_config(&base_url, dir.path(), 5);
    let summary = run_crawl(config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.catalog_pages_fetched, 2);
    assert_eq!(summary.detail_requests, 2);
    assert_eq!(summary.records_persisted, 2);
    assert_eq!(summary.downloads_succeeded, 3);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyPage));

    let zip_path = dir.path().join("downloads/Jobs_and_Growth_in_Africa/package.zip");
    assert_eq!(std::fs::read(&zip_path).expect("zip missing"), b"PK\x03\x04");
    assert!(dir.path().join("downloads/default/notes.pdf").exists());

    let storage = SqliteStorage::new(&dir.path().join("data/projects.db")).expect("Failed to open DB");
    let first = storage
        .rows_for_page(&format!("{}/index.php/catalog/1/related-materials", base_url))
        .expect("Query failed");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].project_name, "Jobs and Growth in Africa");
    assert_eq!(
        first[0].zip_file_path.as_deref(),
        Some(zip_path.to_string_lossy().as_ref())
    );
    assert_eq!(
        first[0].pdf_link.as_deref(),
        Some(format!("{}/files/1/report.pdf", base_url).as_str())
    );

    let second = storage
        .rows_for_page(&format!("{}/index.php/catalog/2/related-materials", base_url))
        .expect("Query failed");
    assert_eq!(second[0].project_name, "");
    assert_eq!(second[0].zip_link, None);
    assert_eq!(second[0].zip_file_path, None);
}

#[tokio::test]
async fn test_max_pages_limits_pagination() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_catalog(&server, 1, &[10, 11]).await;
    Mock::given(method("GET"))
        .and(path("/index.php/catalog/"))
        .and(query_param("page", "2"))
        .respond_with(html(catalog_body(&[12])))
        .expect(0)
        .mount(&server)
        .await;
    mount_detail(&server, 10, detail_body(Some("Ten"), None, None)).await;
    mount_detail(&server, 11, detail_body(Some("Eleven"), None, None)).await;

    let config = create_test_config(&server.uri(), dir.path(), 1);
    let summary = run_crawl(config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.stop_reason, Some(StopReason::MaxPages));
    assert_eq!(summary.records_persisted, 2);

    let storage = SqliteStorage::new(&dir.path().join("data/projects.db")).expect("Failed to open DB");
    assert_eq!(storage.count_projects().expect("Count failed"), 2);
}

#[tokio::test]
async fn test_catalog_server_error_retried_then_stops() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/index.php/catalog/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), dir.path(), 5);
    config.crawler.max_retries = 2;

    let summary = run_crawl(config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.catalog_pages_failed, 1);
    assert_eq!(summary.detail_requests, 0);
    assert_eq!(summary.stop_reason, Some(StopReason::FetchFailed));
}

#[tokio::test]
async fn test_failed_download_is_isolated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_catalog(&server, 1, &[20]).await;
    mount_detail(
        &server,
        20,
        detail_body(Some("Partial"), Some("/files/20/ok.pdf"), Some("/files/20/gone.zip")),
    )
    .await;
    mount_asset(&server, "/files/20/ok.pdf", b"%PDF").await;
    Mock::given(method("GET"))
        .and(path("/files/20/gone.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path(), 1);
    let summary = run_crawl(config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.downloads_succeeded, 1);
    assert_eq!(summary.downloads_failed, 1);
    assert_eq!(summary.records_persisted, 1);

    let storage = SqliteStorage::new(&dir.path().join("data/projects.db")).expect("Failed to open DB");
    let rows = storage.list_projects().expect("Query failed");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].zip_link.is_some());
    assert_eq!(rows[0].zip_file_path, None);

    let assets = storage.get_assets(rows[0].id).expect("Query failed");
    let statuses: Vec<AssetStatus> = assets.iter().map(|a| a.status).collect();
    assert!(statuses.contains(&AssetStatus::Success));
    assert!(statuses.contains(&AssetStatus::Failed));
    assert!(!dir.path().join("downloads/Partial/gone.zip").exists());
}

#[tokio::test]
async fn test_recrawl_appends_rows() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_catalog(&server, 1, &[30]).await;
    Mock::given(method("GET"))
        .and(path("/index.php/catalog/30/related-materials"))
        .respond_with(html(detail_body(Some("Again"), None, None)))
        .expect(2)
        .mount(&server)
        .await;

    for _ in 0..2 {
        let config = create_test_config(&server.uri(), dir.path(), 1);
        run_crawl(config, CancellationToken::new())
            .await
            .expect("Crawl failed");
    }

    let storage = SqliteStorage::new(&dir.path().join("data/projects.db")).expect("Failed to open DB");
    let stats = load_statistics(&storage).expect("Stats failed");
    assert_eq!(stats.total_rows, 2);
    assert_eq!(stats.distinct_pages, 1);
    assert_eq!(stats.assets_by_status.get(&AssetStatus::Skipped), Some(&4));
}

#[tokio::test]
async fn test_cancelled_crawl_issues_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .respond_with(html(catalog_body(&[1])))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = create_test_config(&server.uri(), dir.path(), 3);
    let summary = run_crawl(config, cancel).await.expect("Crawl failed");

    assert_eq!(summary.stop_reason, Some(StopReason::Cancelled));
    assert_eq!(summary.catalog_pages_fetched, 0);
}
