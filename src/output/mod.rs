//! Output module for crawl summaries and database statistics
//!
//! This module handles:
//! - The per-run [`CrawlSummary`] returned by the coordinator
//! - Statistics over everything stored in the database

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use summary::{print_summary, CrawlSummary};
