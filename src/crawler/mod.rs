//! Crawler module for catalog harvesting
//!
//! This module contains the core harvesting logic, including:
//! - The fetch client seam and its HTTP implementation
//! - HTML extraction for catalog and detail pages
//! - Asset location and concurrent downloads
//! - Request pacing and retry backoff
//! - Overall crawl coordination

mod coordinator;
mod downloader;
mod extractor;
mod fetcher;
mod locator;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator};
pub use downloader::{DownloadError, DownloadManager};
pub use extractor::Extractor;
pub use fetcher::{build_http_client, FetchClient, FetchError, HttpFetcher, Page};
pub use locator::{dest_path, locate, project_dir_name, DEFAULT_PROJECT_DIR};
pub use scheduler::{PacedFetcher, Pacer, RetryPolicy};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::HarvestError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl that stops on Ctrl-C
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the storage layer
/// 2. Build the paced HTTP client
/// 3. Walk catalog pages and admit detail requests
/// 4. Download assets and persist one row per project
/// 5. Return the summary once all workers have drained
///
/// The first Ctrl-C stops admitting new work; running detail workers finish.
pub async fn crawl(config: Config) -> Result<CrawlSummary, HarvestError> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            signal_token.cancel();
        }
    });

    let result = run_crawl(config, cancel).await;
    watcher.abort();
    result
}
