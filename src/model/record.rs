use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Kind of downloadable asset on a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Pdf,
    Zip,
}

impl AssetKind {
    pub const ALL: [AssetKind; 2] = [AssetKind::Pdf, AssetKind::Zip];

    /// File extension as it appears in the download link markup
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Zip => "zip",
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        self.extension()
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(Self::Pdf),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Metadata extracted from one project detail page
///
/// `project_page` is the record's identity. Records are never changed after
/// extraction; download results travel separately as [`DownloadOutcome`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub project_name: String,
    pub project_page: Url,
    pub pdf_link: Option<Url>,
    pub zip_link: Option<Url>,
}

impl ProjectRecord {
    /// Returns the link for the given asset kind, if the page had one
    pub fn link(&self, kind: AssetKind) -> Option<&Url> {
        match kind {
            AssetKind::Pdf => self.pdf_link.as_ref(),
            AssetKind::Zip => self.zip_link.as_ref(),
        }
    }
}

/// One asset to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub record: Arc<ProjectRecord>,
    pub kind: AssetKind,
    pub source_url: Url,
    pub dest_path: PathBuf,
}

/// Result of a single asset download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Body written to the stored path
    Success(PathBuf),

    /// Fetch or write failed
    Failed(String),

    /// The record had no link for this asset kind
    Skipped,
}

impl DownloadStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Outcome of one asset for one record
///
/// Skipped outcomes have no task because nothing was downloadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub kind: AssetKind,
    pub task: Option<DownloadTask>,
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn finished(task: DownloadTask, status: DownloadStatus) -> Self {
        Self {
            kind: task.kind,
            task: Some(task),
            status,
        }
    }

    pub fn skipped(kind: AssetKind) -> Self {
        Self {
            kind,
            task: None,
            status: DownloadStatus::Skipped,
        }
    }

    /// Path the asset was stored at, when the download succeeded
    pub fn stored_path(&self) -> Option<&PathBuf> {
        match &self.status {
            DownloadStatus::Success(path) => Some(path),
            _ => None,
        }
    }
}

/// One requested asset slot of a record and the outcome that resolved it
///
/// Slots whose tasks share a destination path share one `outcome`. `kind`,
/// `source_url` and `dest_path` always describe the slot's own request, and
/// `fetched` is set only on the slot whose request ran the download.
#[derive(Debug, Clone)]
pub struct AssetResult {
    pub kind: AssetKind,
    pub source_url: Option<Url>,
    pub dest_path: Option<PathBuf>,
    pub outcome: Arc<DownloadOutcome>,
    pub fetched: bool,
}

impl AssetResult {
    pub fn resolved(task: &DownloadTask, outcome: Arc<DownloadOutcome>, fetched: bool) -> Self {
        Self {
            kind: task.kind,
            source_url: Some(task.source_url.clone()),
            dest_path: Some(task.dest_path.clone()),
            outcome,
            fetched,
        }
    }

    pub fn skipped(kind: AssetKind) -> Self {
        Self {
            kind,
            source_url: None,
            dest_path: None,
            outcome: Arc::new(DownloadOutcome::skipped(kind)),
            fetched: false,
        }
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.outcome.status
    }

    pub fn stored_path(&self) -> Option<&PathBuf> {
        self.outcome.stored_path()
    }
}
