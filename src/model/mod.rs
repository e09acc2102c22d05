//! Value types flowing through the harvest pipeline
//!
//! - `CrawlRequest`: an immutable request handed to the fetch client
//! - `ProjectRecord`: the metadata extracted from one detail page
//! - `DownloadTask` / `DownloadOutcome`: one asset download and its result
//! - `AssetResult`: one asset slot of a record, pointing at its outcome

mod record;
mod request;

pub use record::{AssetKind, AssetResult, DownloadOutcome, DownloadStatus, DownloadTask, ProjectRecord};
pub use request::{CrawlRequest, RequestKind};
