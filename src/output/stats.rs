//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! statistics about everything stored so far.

use crate::model::AssetKind;
use crate::storage::{AssetStatus, Storage, StorageResult};
use std::collections::HashMap;

/// Database statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of project rows (re-crawls included)
    pub total_rows: u64,

    /// Number of distinct project pages
    pub distinct_pages: u64,

    pub rows_with_pdf_link: u64,
    pub rows_with_zip_link: u64,

    /// Rows whose ZIP archive was stored on disk
    pub rows_with_stored_zip: u64,

    /// Asset outcome counts by status
    pub assets_by_status: HashMap<AssetStatus, u64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        total_rows: storage.count_projects()?,
        distinct_pages: storage.count_distinct_pages()?,
        rows_with_pdf_link: storage.count_with_link(AssetKind::Pdf)?,
        rows_with_zip_link: storage.count_with_link(AssetKind::Zip)?,
        rows_with_stored_zip: storage.count_stored_zips()?,
        assets_by_status: storage.count_assets_by_status()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Project rows: {}", stats.total_rows);
    println!("  Distinct project pages: {}", stats.distinct_pages);
    println!("  Rows with PDF link: {}", stats.rows_with_pdf_link);
    println!("  Rows with ZIP link: {}", stats.rows_with_zip_link);
    println!();

    println!("Assets by Status:");
    for status in AssetStatus::ALL {
        let count = stats.assets_by_status.get(&status).copied().unwrap_or(0);
        println!("  {}: {}", status.to_db_string(), count);
    }
    println!();

    println!(
        "ZIP Coverage: {:.1}% ({} / {} linked archives stored)",
        stats.zip_coverage(),
        stats.rows_with_stored_zip,
        stats.rows_with_zip_link
    );
}

impl CrawlStatistics {
    /// Percentage of rows with a ZIP link whose archive was stored
    pub fn zip_coverage(&self) -> f64 {
        if self.rows_with_zip_link == 0 {
            return 0.0;
        }
        (self.rows_with_stored_zip as f64 / self.rows_with_zip_link as f64) * 100.0
    }
}
