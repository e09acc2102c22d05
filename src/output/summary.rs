//! End-of-crawl summary
//!
//! The coordinator fills a [`CrawlSummary`] while it runs and returns it
//! when pagination has stopped and every detail worker has drained.

use crate::state::StopReason;
use std::time::Duration;

/// Counters for one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub catalog_pages_fetched: u32,
    pub catalog_pages_failed: u32,

    /// Detail requests admitted after offsite and duplicate filtering
    pub detail_requests: u32,

    /// Detail pages whose fetch failed; no row is written for them
    pub detail_failures: u32,

    pub records_persisted: u32,
    pub records_failed: u32,
    pub downloads_succeeded: u32,
    pub downloads_failed: u32,

    /// Why pagination ended
    pub stop_reason: Option<StopReason>,

    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Logs the summary at info level
    pub fn log(&self) {
        tracing::info!(
            "Crawl finished in {:.1}s: {} catalog pages ({} failed), {} detail requests ({} failed)",
            self.elapsed.as_secs_f64(),
            self.catalog_pages_fetched,
            self.catalog_pages_failed,
            self.detail_requests,
            self.detail_failures
        );
        tracing::info!(
            "Records: {} persisted, {} failed; downloads: {} succeeded, {} failed",
            self.records_persisted,
            self.records_failed,
            self.downloads_succeeded,
            self.downloads_failed
        );
        if let Some(reason) = self.stop_reason {
            tracing::info!("Pagination stopped: {}", reason);
        }
    }
}

/// Prints a summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!(
        "Catalog pages: {} fetched, {} failed",
        summary.catalog_pages_fetched, summary.catalog_pages_failed
    );
    println!(
        "Detail pages: {} requested, {} failed",
        summary.detail_requests, summary.detail_failures
    );
    println!(
        "Records: {} persisted, {} failed",
        summary.records_persisted, summary.records_failed
    );
    println!(
        "Downloads: {} succeeded, {} failed",
        summary.downloads_succeeded, summary.downloads_failed
    );
    match summary.stop_reason {
        Some(reason) => println!("Stopped: {}", reason),
        None => println!("Stopped: unknown"),
    }
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
}
