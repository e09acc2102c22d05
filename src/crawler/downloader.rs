//! Concurrent asset downloads
//!
//! The download manager fetches every task of a batch through the shared
//! [`FetchClient`] under a bounded permit pool and writes bodies to their
//! destination paths. Failures are reported as [`DownloadStatus::Failed`]
//! outcomes; nothing here returns an error to the caller.
//!
//! Destination paths are claimed manager-wide: the first task for a path
//! runs the download and every later task for that path, in the same batch
//! or in a concurrent one, waits for and reuses its outcome.

use crate::crawler::fetcher::{FetchClient, FetchError};
use crate::crawler::scheduler::RetryPolicy;
use crate::model::{AssetResult, CrawlRequest, DownloadOutcome, DownloadStatus, DownloadTask};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};

/// Errors for a single asset download
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download pool closed")]
    PoolClosed,
}

type OutcomeCell = Arc<OnceCell<Arc<DownloadOutcome>>>;

/// Bounded-concurrency downloader shared by all detail workers
#[derive(Clone)]
pub struct DownloadManager {
    client: Arc<dyn FetchClient>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
    claimed: Arc<Mutex<HashMap<PathBuf, OutcomeCell>>>,
}

impl DownloadManager {
    /// Creates a manager allowing at most `concurrency` downloads at once
    ///
    /// The permit pool and the destination claims are shared by every
    /// clone, so both hold across all records processed concurrently.
    pub fn new(client: Arc<dyn FetchClient>, concurrency: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            retry: RetryPolicy::none(),
            claimed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Downloads a batch of tasks
    ///
    /// Returns one result per input task, in input order. A task whose
    /// destination path was already claimed is not fetched: its result
    /// points at the claiming task's outcome and has `fetched` unset.
    pub async fn download_all(&self, tasks: Vec<DownloadTask>) -> Vec<AssetResult> {
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let manager = self.clone();
                let fallback = task.clone();
                (fallback, tokio::spawn(async move { manager.resolve(task).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (task, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Download worker for {} failed: {}", task.source_url, e);
                    let status = DownloadStatus::Failed(e.to_string());
                    let outcome = Arc::new(DownloadOutcome::finished(task.clone(), status));
                    AssetResult::resolved(&task, outcome, true)
                }
            };
            results.push(result);
        }
        results
    }

    /// Resolves one task against the destination claims
    async fn resolve(&self, task: DownloadTask) -> AssetResult {
        let cell = self.claim(&task.dest_path);
        let mut fetched = false;

        let outcome = cell
            .get_or_init(|| {
                fetched = true;
                let manager = self.clone();
                let task = task.clone();
                async move { Arc::new(manager.download_one(task).await) }
            })
            .await;

        if !fetched {
            tracing::debug!(
                "Reusing download of {} for {}",
                task.dest_path.display(),
                task.source_url
            );
        }
        AssetResult::resolved(&task, Arc::clone(outcome), fetched)
    }

    fn claim(&self, dest_path: &Path) -> OutcomeCell {
        let mut claimed = self
            .claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(claimed.entry(dest_path.to_path_buf()).or_default())
    }

    async fn download_one(&self, task: DownloadTask) -> DownloadOutcome {
        let status = match self.fetch_to_disk(&task).await {
            Ok(path) => {
                tracing::info!("Downloaded {} to {}", task.source_url, path.display());
                DownloadStatus::Success(path)
            }
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", task.source_url, e);
                DownloadStatus::Failed(e.to_string())
            }
        };
        DownloadOutcome::finished(task, status)
    }

    async fn fetch_to_disk(&self, task: &DownloadTask) -> Result<PathBuf, DownloadError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DownloadError::PoolClosed)?;

        let request = CrawlRequest::asset(task.source_url.clone(), task.kind);
        let page = self.retry.fetch(self.client.as_ref(), request).await?;

        write_asset(&task.dest_path, &page.body).await?;
        Ok(task.dest_path.clone())
    }
}

/// Writes an asset body, creating parent directories as needed
///
/// The body goes to a sibling `.part` file first and is renamed into place,
/// so a reader never sees a half-written asset at `path`. A failed write or
/// rename removes the `.part` file.
async fn write_asset(path: &Path, body: &[u8]) -> Result<(), DownloadError> {
    let write_err = |source| DownloadError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = match tokio::fs::write(&partial, body).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("Could not remove {}: {}", partial.display(), cleanup);
            }
        }
        return Err(write_err(e));
    }
    Ok(())
}
