//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{AssetKind, AssetResult, ProjectRecord};
use crate::storage::{AssetRow, AssetStatus, PersistedRow};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store exclusively owns its handle; callers share it behind a mutex.
pub trait Storage: Send {
    // ===== Writes =====

    /// Persists one project record together with its asset results
    ///
    /// Runs as a single transaction: either the `projects` row and every
    /// `assets` row are written, or nothing is. Each `assets` row carries the
    /// kind and source URL of its own slot. `zip_file_path` is the stored
    /// path of the ZIP slot's outcome when that outcome succeeded.
    ///
    /// # Returns
    ///
    /// The id of the new `projects` row
    fn persist(
        &mut self,
        record: &ProjectRecord,
        assets: &[AssetResult],
    ) -> StorageResult<i64>;

    // ===== Reads =====

    /// Gets every project row in insertion order
    fn list_projects(&self) -> StorageResult<Vec<PersistedRow>>;

    /// Gets all rows written for one project page
    fn rows_for_page(&self, project_page: &str) -> StorageResult<Vec<PersistedRow>>;

    /// Gets the asset rows of a project row
    fn get_assets(&self, project_id: i64) -> StorageResult<Vec<AssetRow>>;

    // ===== Statistics =====

    /// Counts project rows
    fn count_projects(&self) -> StorageResult<u64>;

    /// Counts distinct project pages
    fn count_distinct_pages(&self) -> StorageResult<u64>;

    /// Counts rows carrying a link of the given kind
    fn count_with_link(&self, kind: AssetKind) -> StorageResult<u64>;

    /// Counts rows whose ZIP was stored
    fn count_stored_zips(&self) -> StorageResult<u64>;

    /// Counts asset rows by status
    fn count_assets_by_status(&self) -> StorageResult<HashMap<AssetStatus, u64>>;
}
