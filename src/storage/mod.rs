//! Storage module for persisting harvested projects
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Atomic persistence of a project row and its asset outcomes
//! - Read queries backing `--stats` and the tests

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::model::AssetKind;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A row of the append-only `projects` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRow {
    pub id: i64,
    pub project_name: String,
    pub project_page: String,
    pub pdf_link: Option<String>,
    pub zip_link: Option<String>,
    pub zip_file_path: Option<String>,
    /// RFC 3339 UTC timestamp of the write
    pub download_date: String,
}

/// A row of the `assets` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRow {
    pub id: i64,
    pub project_id: i64,
    pub asset_kind: AssetKind,
    pub source_url: Option<String>,
    pub dest_path: Option<String>,
    pub status: AssetStatus,
    pub error: Option<String>,
    pub recorded_at: String,
}

/// Stored status of an asset outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetStatus {
    Success,
    Failed,
    Skipped,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 3] = [Self::Success, Self::Failed, Self::Skipped];

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}
