//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the harvest, including:
//! - Walking catalog pages strictly in index order
//! - Admitting detail requests after offsite and duplicate filtering
//! - Running detail workers with bounded parallelism
//! - Feeding records through the locator and download manager into storage
//! - Stopping on the global cancellation signal

use crate::config::Config;
use crate::crawler::downloader::DownloadManager;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::{FetchClient, HttpFetcher};
use crate::crawler::locator::locate;
use crate::crawler::scheduler::{PacedFetcher, Pacer, RetryPolicy};
use crate::model::{AssetKind, AssetResult, CrawlRequest, DownloadStatus, ProjectRecord};
use crate::output::CrawlSummary;
use crate::state::CrawlState;
use crate::storage::{open_storage, Storage, StorageError};
use crate::url::{catalog_page_url, is_allowed_domain};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What happened to one admitted detail request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailReport {
    /// Cancelled before the worker got a permit
    Cancelled,
    FetchFailed,
    Stored {
        persisted: bool,
        downloads_succeeded: u32,
        downloads_failed: u32,
    },
}

/// Everything a detail worker needs, cloned into each spawned task
#[derive(Clone)]
struct DetailWorker {
    client: Arc<dyn FetchClient>,
    retry: RetryPolicy,
    extractor: Extractor,
    downloads: DownloadManager,
    storage: Arc<Mutex<dyn Storage>>,
    storage_root: PathBuf,
    permits: Arc<Semaphore>,
    render: bool,
}

impl DetailWorker {
    async fn run(self, url: Url, cancel: CancellationToken) -> DetailReport {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return DetailReport::Cancelled,
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return DetailReport::Cancelled,
            },
        };

        tracing::debug!("Fetching detail page {}", url);
        let request = CrawlRequest::detail(url.clone(), self.render);
        let page = match self.retry.fetch(self.client.as_ref(), request).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Detail page {} failed: {}", url, e);
                return DetailReport::FetchFailed;
            }
        };

        let record = Arc::new(self.extractor.extract_record(&page.text(), &page.url));
        if record.project_name.is_empty() {
            tracing::debug!("No title on {}", record.project_page);
        }

        let tasks = locate(&record, &self.storage_root);
        let mut assets = self.downloads.download_all(tasks).await;
        for kind in AssetKind::ALL {
            if record.link(kind).is_none() {
                assets.push(AssetResult::skipped(kind));
            }
        }

        let downloads_succeeded = count_fetched(&assets, DownloadStatus::is_success);
        let downloads_failed =
            count_fetched(&assets, |status| matches!(status, DownloadStatus::Failed(_)));

        let persisted = match self.persist(&record, &assets) {
            Ok(id) => {
                tracing::info!(
                    "Stored project {} '{}' ({} assets downloaded)",
                    id,
                    record.project_name,
                    downloads_succeeded
                );
                true
            }
            Err(e) => {
                tracing::error!("Failed to store {}: {}", record.project_page, e);
                false
            }
        };

        DetailReport::Stored {
            persisted,
            downloads_succeeded,
            downloads_failed,
        }
    }

    fn persist(
        &self,
        record: &ProjectRecord,
        assets: &[AssetResult],
    ) -> Result<i64, StorageError> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| StorageError::Database(format!("storage lock poisoned: {}", e)))?;
        storage.persist(record, assets)
    }
}

/// Counts downloads this record ran itself; reused outcomes are not counted
fn count_fetched(assets: &[AssetResult], pred: impl Fn(&DownloadStatus) -> bool) -> u32 {
    assets
        .iter()
        .filter(|asset| asset.fetched && pred(asset.status()))
        .count() as u32
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    client: Arc<dyn FetchClient>,
    storage: Arc<Mutex<dyn Storage>>,
    extractor: Extractor,
    downloads: DownloadManager,
    retry: RetryPolicy,
    detail_permits: Arc<Semaphore>,
    seen_details: HashSet<Url>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `client` - Fetch client shared by catalog, detail and asset requests
    /// * `storage` - The store; the coordinator becomes its sole owner
    pub fn new(config: Config, client: Arc<dyn FetchClient>, storage: impl Storage + 'static) -> Self {
        let retry = RetryPolicy::new(config.crawler.max_retries, Pacer::new(config.pacing.clone()));
        let extractor = Extractor::new(config.selectors.clone(), config.crawler.detail_suffix.clone());
        let downloads = DownloadManager::new(
            Arc::clone(&client),
            config.crawler.download_concurrency as usize,
        )
        .with_retry(retry.clone());
        let detail_permits = Arc::new(Semaphore::new(config.crawler.detail_concurrency.max(1) as usize));
        let storage: Arc<Mutex<dyn Storage>> = Arc::new(Mutex::new(storage));

        Self {
            config: Arc::new(config),
            client,
            storage,
            extractor,
            downloads,
            retry,
            detail_permits,
            seen_details: HashSet::new(),
        }
    }

    /// Shared handle to the store
    pub fn storage(&self) -> Arc<Mutex<dyn Storage>> {
        Arc::clone(&self.storage)
    }

    /// Runs the crawl until pagination stops and all detail workers drain
    ///
    /// Catalog pages are fetched one at a time in index order. Each link
    /// found is admitted as a detail request running concurrently with
    /// further pagination. Once `cancel` fires, no catalog page or detail
    /// request is started; detail workers already running finish and
    /// persist their records.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<CrawlSummary, HarvestError> {
        let started = Instant::now();
        let crawler = &self.config.crawler;
        let mut state = CrawlState::new(crawler.start_page, crawler.max_pages);
        let mut summary = CrawlSummary::default();
        let mut workers: JoinSet<DetailReport> = JoinSet::new();
        self.seen_details.clear();

        tracing::info!(
            "Starting crawl of up to {} catalog pages from page {}",
            crawler.max_pages,
            crawler.start_page
        );

        while let Some(page) = state.next_pending() {
            if cancel.is_cancelled() {
                tracing::info!("Cancellation requested, not fetching catalog page {}", page);
                state.cancel();
                break;
            }

            state.dispatch(page)?;
            let url = catalog_page_url(&self.config.crawler.catalog_url, page)?;
            tracing::debug!("Fetching catalog page {}: {}", page, url);

            let request = CrawlRequest::catalog(url, page, self.config.crawler.render_javascript);
            let fetched = tokio::select! {
                _ = cancel.cancelled() => None,
                result = self.retry.fetch(self.client.as_ref(), request) => Some(result),
            };

            let Some(result) = fetched else {
                tracing::info!("Cancellation requested while fetching catalog page {}", page);
                state.cancel();
                state.record_failed(page, "cancelled")?;
                break;
            };

            match result {
                Ok(content) => {
                    summary.catalog_pages_fetched += 1;
                    let links = self.extractor.extract_links(&content.text(), &content.url);
                    tracing::info!("Catalog page {} yielded {} project links", page, links.len());

                    let link_count = links.len();
                    for link in links {
                        self.admit_detail(link, &mut workers, &mut summary, &cancel);
                    }

                    if let Some(next) = state.record_parsed(page, link_count)? {
                        tracing::debug!("Catalog page {} scheduled", next);
                    }
                }
                Err(e) => {
                    summary.catalog_pages_failed += 1;
                    tracing::warn!("Catalog page {} failed, stopping pagination: {}", page, e);
                    state.record_failed(page, e.to_string())?;
                }
            }
        }

        summary.stop_reason = state.stop_reason();
        tracing::info!(
            "Pagination finished after {} pages, waiting for {} detail workers",
            state.dispatched_count(),
            workers.len()
        );

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => tally(&mut summary, report),
                Err(e) => {
                    tracing::error!("Detail worker failed: {}", e);
                    summary.records_failed += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        summary.log();
        Ok(summary)
    }

    /// Filters a detail link and spawns its worker
    fn admit_detail(
        &mut self,
        url: Url,
        workers: &mut JoinSet<DetailReport>,
        summary: &mut CrawlSummary,
        cancel: &CancellationToken,
    ) {
        if cancel.is_cancelled() {
            return;
        }

        if !is_allowed_domain(&url, &self.config.crawler.allowed_domains) {
            tracing::debug!("Dropping offsite detail request {}", url);
            return;
        }

        if !self.seen_details.insert(url.clone()) {
            tracing::debug!("Dropping duplicate detail request {}", url);
            return;
        }

        summary.detail_requests += 1;
        let worker = DetailWorker {
            client: Arc::clone(&self.client),
            retry: self.retry.clone(),
            extractor: self.extractor.clone(),
            downloads: self.downloads.clone(),
            storage: Arc::clone(&self.storage),
            storage_root: PathBuf::from(&self.config.output.storage_root),
            permits: Arc::clone(&self.detail_permits),
            render: self.config.crawler.render_javascript,
        };
        workers.spawn(worker.run(url, cancel.clone()));
    }
}

fn tally(summary: &mut CrawlSummary, report: DetailReport) {
    match report {
        DetailReport::Cancelled => {}
        DetailReport::FetchFailed => summary.detail_failures += 1,
        DetailReport::Stored {
            persisted,
            downloads_succeeded,
            downloads_failed,
        } => {
            if persisted {
                summary.records_persisted += 1;
            } else {
                summary.records_failed += 1;
            }
            summary.downloads_succeeded += downloads_succeeded;
            summary.downloads_failed += downloads_failed;
        }
    }
}

/// Runs the main crawl operation
///
/// This function wires the production collaborators together:
///
/// 1. Open (or create) the SQLite store; failure here is fatal
/// 2. Build the HTTP fetch client with pacing in front of it
/// 3. Run the coordinator until pagination stops and workers drain
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `cancel` - Global stop signal
///
/// # Example
///
/// ```no_run
/// use repro_harvest::config::Config;
/// use repro_harvest::crawler::run_crawl;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = run_crawl(Config::default(), CancellationToken::new()).await?;
/// println!("{} records stored", summary.records_persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, cancel: CancellationToken) -> Result<CrawlSummary, HarvestError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let fetcher = HttpFetcher::new(config.fetch.clone())?;
    let client: Arc<dyn FetchClient> =
        Arc::new(PacedFetcher::new(fetcher, Pacer::new(config.pacing.clone())));

    let mut coordinator = Coordinator::new(config, client, storage);
    coordinator.run(cancel).await
}
