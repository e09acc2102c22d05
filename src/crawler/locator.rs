//! Asset locator: turns a project record into download tasks
//!
//! Destination paths are deterministic:
//! `<storage-root>/<sanitized project name or "default">/<file name of the source URL>`.

use crate::model::{AssetKind, DownloadTask, ProjectRecord};
use crate::url::{file_name_from_url, sanitize_path_segment};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Folder used when a project has no usable name
pub const DEFAULT_PROJECT_DIR: &str = "default";

/// Emits one download task per populated link on the record
///
/// A record with neither link yields no tasks; it is still persisted.
pub fn locate(record: &Arc<ProjectRecord>, storage_root: &Path) -> Vec<DownloadTask> {
    AssetKind::ALL
        .into_iter()
        .filter_map(|kind| {
            record.link(kind).map(|url| DownloadTask {
                record: Arc::clone(record),
                kind,
                source_url: url.clone(),
                dest_path: dest_path(storage_root, &record.project_name, url, kind),
            })
        })
        .collect()
}

/// Computes where an asset is stored
pub fn dest_path(storage_root: &Path, project_name: &str, source_url: &Url, kind: AssetKind) -> PathBuf {
    let folder = project_dir_name(project_name);
    let file = file_name_from_url(source_url)
        .unwrap_or_else(|| format!("asset.{}", kind.extension()));
    storage_root.join(folder).join(file)
}

/// Folder name for a project
pub fn project_dir_name(project_name: &str) -> String {
    sanitize_path_segment(project_name).unwrap_or_else(|| DEFAULT_PROJECT_DIR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, pdf: Option<&str>, zip: Option<&str>) -> Arc<ProjectRecord> {
        Arc::new(ProjectRecord {
            project_name: name.to_string(),
            project_page: Url::parse("https://example.com/catalog/1/related-materials").unwrap(),
            pdf_link: pdf.map(|u| Url::parse(u).unwrap()),
            zip_link: zip.map(|u| Url::parse(u).unwrap()),
        })
    }

    #[test]
    fn test_both_links_yield_two_tasks() {
        let record = record(
            "Trade Study",
            Some("https://example.com/files/report.pdf"),
            Some("https://example.com/files/package.zip"),
        );
        let tasks = locate(&record, Path::new("downloads"));

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].kind, AssetKind::Pdf);
        assert_eq!(tasks[0].dest_path, PathBuf::from("downloads/Trade_Study/report.pdf"));
        assert_eq!(tasks[1].kind, AssetKind::Zip);
        assert_eq!(tasks[1].dest_path, PathBuf::from("downloads/Trade_Study/package.zip"));
        assert!(Arc::ptr_eq(&tasks[0].record, &record));
    }

    #[test]
    fn test_pdf_only_yields_one_task() {
        let record = record("X", Some("https://example.com/r.pdf"), None);
        let tasks = locate(&record, Path::new("downloads"));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].kind, AssetKind::Pdf);
    }

    #[test]
    fn test_no_links_yield_no_tasks() {
        let record = record("X", None, None);
        assert!(locate(&record, Path::new("downloads")).is_empty());
    }

    #[test]
    fn test_empty_name_uses_default_folder() {
        let record = record("", None, Some("https://example.com/files/pkg.zip"));
        let tasks = locate(&record, Path::new("/data"));
        assert_eq!(tasks[0].dest_path, PathBuf::from("/data/default/pkg.zip"));
    }

    #[test]
    fn test_file_name_fallback() {
        let url = Url::parse("https://example.com/download/").unwrap();
        let path = dest_path(Path::new("root"), "P", &url, AssetKind::Zip);
        assert_eq!(path, PathBuf::from("root/P/asset.zip"));
    }

    #[test]
    fn test_dest_path_is_deterministic() {
        let url = Url::parse("https://example.com/a/b/c.pdf").unwrap();
        assert_eq!(
            dest_path(Path::new("r"), "Name", &url, AssetKind::Pdf),
            dest_path(Path::new("r"), "Name", &url, AssetKind::Pdf)
        );
    }

    #[test]
    fn test_name_cannot_escape_root() {
        assert_eq!(project_dir_name("../../etc"), "etc");
        assert_eq!(project_dir_name(".."), DEFAULT_PROJECT_DIR);
    }
}
