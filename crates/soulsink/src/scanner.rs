//! Discovery of finalized data files written by one task.

use soulsink_core::storage::{FileEntry, ListDirRef};
use tracing::debug;

use crate::error::StorageError;

/// Default substring marking a file its writer has not closed yet.
pub const DEFAULT_IN_PROGRESS_MARKER: &str = ".inprogress";

/// A finalized data file found in a partition directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: String,
    pub size: u64,
}

/// Lists a partition directory and keeps one task's closed files.
#[derive(Clone)]
pub struct FileScanner {
    listing: ListDirRef,
    in_progress_marker: String,
}

impl std::fmt::Debug for FileScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileScanner")
            .field("backend", &self.listing.backend())
            .field("in_progress_marker", &self.in_progress_marker)
            .finish()
    }
}

impl FileScanner {
    pub fn new(listing: ListDirRef, in_progress_marker: impl Into<String>) -> Self {
        Self {
            listing,
            in_progress_marker: in_progress_marker.into(),
        }
    }

    pub fn in_progress_marker(&self) -> &str {
        &self.in_progress_marker
    }

    /// Files in `partition_dir` whose path contains `task_prefix` and not
    /// the in-progress marker, in listing order.
    ///
    /// An empty directory yields no files; a missing one is an error.
    pub async fn scan(
        &self,
        partition_dir: &str,
        task_prefix: &str,
    ) -> Result<Vec<ScannedFile>, StorageError> {
        let entries = self.listing.list_status(partition_dir).await?;
        let listed = entries.len();
        let files: Vec<ScannedFile> = entries
            .into_iter()
            .filter(|entry| self.is_task_file(entry, task_prefix))
            .map(|entry| ScannedFile {
                path: entry.path,
                size: entry.len,
            })
            .collect();

        debug!(
            dir = %partition_dir,
            prefix = %task_prefix,
            listed,
            matched = files.len(),
            "Scanned partition directory"
        );
        Ok(files)
    }

    fn is_task_file(&self, entry: &FileEntry, task_prefix: &str) -> bool {
        !entry.is_dir
            && entry.path.contains(task_prefix)
            && !entry.path.contains(self.in_progress_marker.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use soulsink_core::storage::{ListDir, LocalFileSystem};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Returns a fixed listing in a fixed order.
    struct StaticListing(Vec<FileEntry>);

    #[async_trait]
    impl ListDir for StaticListing {
        async fn list_status(&self, _dir: &str) -> Result<Vec<FileEntry>, StorageError> {
            Ok(self.0.clone())
        }

        fn backend(&self) -> &'static str {
            "static"
        }
    }

    #[tokio::test]
    async fn test_filters_by_prefix_marker_and_kind() {
        let listing = StaticListing(vec![
            FileEntry::file("/t/dt=1/t1-part-2", 20),
            FileEntry::file("/t/dt=1/t0-part-0", 5),
            FileEntry::dir("/t/dt=1/t1-subdir"),
            FileEntry::file("/t/dt=1/t1-.inprogress.x", 7),
            FileEntry::file("/t/dt=1/t1-part-0", 10),
        ]);
        let scanner = FileScanner::new(Arc::new(listing), DEFAULT_IN_PROGRESS_MARKER);

        let files = scanner.scan("/t/dt=1", "t1-").await.unwrap();

        // Listing order is kept.
        assert_eq!(
            files,
            vec![
                ScannedFile {
                    path: "/t/dt=1/t1-part-2".to_string(),
                    size: 20
                },
                ScannedFile {
                    path: "/t/dt=1/t1-part-0".to_string(),
                    size: 10
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_marker() {
        let listing = StaticListing(vec![
            FileEntry::file("/t/p/task-a.tmp", 1),
            FileEntry::file("/t/p/task-a.parquet", 2),
        ]);
        let scanner = FileScanner::new(Arc::new(listing), ".tmp");

        let files = scanner.scan("/t/p", "task-a").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "/t/p/task-a.parquet");
    }

    #[tokio::test]
    async fn test_local_partition_dir() {
        let temp_dir = TempDir::new().unwrap();
        let partition = temp_dir.path().join("dt=2024-01-01");
        std::fs::create_dir_all(&partition).unwrap();
        std::fs::write(partition.join("t0-part-0"), b"abcd").unwrap();
        std::fs::write(partition.join("t0-.inprogress.1"), b"ab").unwrap();

        let scanner = FileScanner::new(Arc::new(LocalFileSystem::new()), DEFAULT_IN_PROGRESS_MARKER);
        let files = scanner
            .scan(partition.to_str().unwrap(), "t0-")
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("dt=2024-01-01/t0-part-0"));
        assert_eq!(files[0].size, 4);
    }

    #[tokio::test]
    async fn test_missing_dir_is_error_empty_dir_is_not() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = FileScanner::new(Arc::new(LocalFileSystem::new()), DEFAULT_IN_PROGRESS_MARKER);

        let empty = scanner
            .scan(temp_dir.path().to_str().unwrap(), "t0-")
            .await
            .unwrap();
        assert!(empty.is_empty());

        let missing = temp_dir.path().join("nope");
        let err = scanner
            .scan(missing.to_str().unwrap(), "t0-")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
