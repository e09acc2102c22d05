//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{AssetKind, AssetResult, DownloadStatus, ProjectRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{AssetRow, AssetStatus, PersistedRow};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::path::Path;

const PROJECT_COLUMNS: &str =
    "id, project_name, project_page, pdf_link, zip_link, zip_file_path, download_date";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories are created and the schema is applied
    /// idempotently, so opening an existing database is safe.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened database at {}", path.display());
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedRow> {
    Ok(PersistedRow {
        id: row.get(0)?,
        project_name: row.get(1)?,
        project_page: row.get(2)?,
        pdf_link: row.get(3)?,
        zip_link: row.get(4)?,
        zip_file_path: row.get(5)?,
        download_date: row.get(6)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Writes =====

    fn persist(
        &mut self,
        record: &ProjectRecord,
        assets: &[AssetResult],
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let zip_file_path = assets
            .iter()
            .filter(|asset| asset.kind == AssetKind::Zip)
            .find_map(|asset| asset.stored_path())
            .map(|path| path.to_string_lossy().into_owned());

        // Dropping the transaction without commit rolls everything back
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO projects (project_name, project_page, pdf_link, zip_link, zip_file_path, download_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.project_name,
                record.project_page.as_str(),
                record.pdf_link.as_ref().map(|u| u.as_str()),
                record.zip_link.as_ref().map(|u| u.as_str()),
                zip_file_path,
                now
            ],
        )?;
        let project_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO assets (project_id, asset_kind, source_url, dest_path, status, error, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for asset in assets {
                let error = match asset.status() {
                    DownloadStatus::Failed(reason) => Some(reason.as_str()),
                    _ => None,
                };

                stmt.execute(params![
                    project_id,
                    asset.kind.to_db_string(),
                    asset.source_url.as_ref().map(|u| u.as_str()),
                    asset.dest_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                    asset.status().to_db_string(),
                    error,
                    now
                ])?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Persisted project {} ({}) with {} asset rows",
            project_id,
            record.project_page,
            assets.len()
        );
        Ok(project_id)
    }

    // ===== Reads =====

    fn list_projects(&self) -> StorageResult<Vec<PersistedRow>> {
        let sql = format!("SELECT {} FROM projects ORDER BY id", PROJECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn rows_for_page(&self, project_page: &str) -> StorageResult<Vec<PersistedRow>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE project_page = ?1 ORDER BY id",
            PROJECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_page], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_assets(&self, project_id: i64) -> StorageResult<Vec<AssetRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, asset_kind, source_url, dest_path, status, error, recorded_at
             FROM assets WHERE project_id = ?1 ORDER BY id",
        )?;

        let raw = stmt
            .query_map(params![project_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(id, project_id, kind, source_url, dest_path, status, error, recorded_at)| {
                    Ok(AssetRow {
                        id,
                        project_id,
                        asset_kind: AssetKind::from_db_string(&kind)
                            .ok_or_else(|| StorageError::InvalidData(format!("asset kind '{}'", kind)))?,
                        source_url,
                        dest_path,
                        status: AssetStatus::from_db_string(&status)
                            .ok_or_else(|| StorageError::InvalidData(format!("asset status '{}'", status)))?,
                        error,
                        recorded_at,
                    })
                },
            )
            .collect()
    }

    // ===== Statistics =====

    fn count_projects(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM projects")
    }

    fn count_distinct_pages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT project_page) FROM projects")
    }

    fn count_with_link(&self, kind: AssetKind) -> StorageResult<u64> {
        match kind {
            AssetKind::Pdf => self.count("SELECT COUNT(*) FROM projects WHERE pdf_link IS NOT NULL"),
            AssetKind::Zip => self.count("SELECT COUNT(*) FROM projects WHERE zip_link IS NOT NULL"),
        }
    }

    fn count_stored_zips(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM projects WHERE zip_file_path IS NOT NULL")
    }

    fn count_assets_by_status(&self) -> StorageResult<HashMap<AssetStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM assets GROUP BY status")?;

        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status_str, count) = row?;
            if let Some(status) = AssetStatus::from_db_string(&status_str) {
                counts.insert(status, count as u64);
            } else {
                tracing::warn!("Ignoring unknown asset status '{}'", status_str);
            }
        }

        Ok(counts)
    }
}
