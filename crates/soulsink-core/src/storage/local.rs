//! Local filesystem listing.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use snafu::prelude::*;
use tracing::debug;
use url::Url;

use super::{FileEntry, ListDir, join_path};
use crate::emit;
use crate::error::{InvalidUrlSnafu, StorageError};
use crate::metrics::events::{DirectoryListed, DirectoryListingFailed};

const BACKEND: &str = "local";

/// Lists directories on the local filesystem.
///
/// Symlinks are reported as they are, never followed: a link to a directory
/// is neither descended into nor sized by its target.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    async fn read_entries(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let (local, is_url) = local_dir(dir)?;
        let mut read_dir = match tokio::fs::read_dir(&local).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::DirectoryMissing {
                    path: dir.to_string(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotADirectory => {
                return Err(StorageError::NotADirectory {
                    path: dir.to_string(),
                });
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: dir.to_string(),
                    source,
                });
            }
        };

        let io_err = |source| StorageError::Io {
            path: dir.to_string(),
            source,
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(io_err)? {
            // DirEntry metadata is lstat-based, so links are not traversed.
            let metadata = entry.metadata().await.map_err(io_err)?;
            // file:// locations keep their URL form in listed paths.
            let path = if is_url {
                join_path(dir, &entry.file_name().to_string_lossy())
            } else {
                entry.path().to_string_lossy().into_owned()
            };
            if metadata.is_dir() {
                entries.push(FileEntry::dir(path));
            } else {
                entries.push(FileEntry::file(path, metadata.len()));
            }
        }
        Ok(entries)
    }
}

/// Resolve a plain path or a `file://` URL to a local directory.
fn local_dir(dir: &str) -> Result<(PathBuf, bool), StorageError> {
    if !dir.starts_with("file:") {
        return Ok((PathBuf::from(dir), false));
    }
    let path = Url::parse(dir)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .context(InvalidUrlSnafu { url: dir })?;
    Ok((path, true))
}

#[async_trait]
impl ListDir for LocalFileSystem {
    async fn list_status(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let start = Instant::now();
        match self.read_entries(dir).await {
            Ok(entries) => {
                debug!(dir = %dir, count = entries.len(), "Listed local directory");
                emit!(DirectoryListed {
                    backend: BACKEND,
                    entries: entries.len(),
                    duration: start.elapsed(),
                });
                Ok(entries)
            }
            Err(e) => {
                emit!(DirectoryListingFailed { backend: BACKEND });
                Err(e)
            }
        }
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sorted(mut entries: Vec<FileEntry>) -> Vec<FileEntry> {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    #[tokio::test]
    async fn test_lists_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.parquet"), b"12345").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        std::fs::write(temp_dir.path().join("nested").join("hidden.parquet"), b"1").unwrap();

        let dir = temp_dir.path().to_str().unwrap();
        let entries = sorted(LocalFileSystem::new().list_status(dir).await.unwrap());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], FileEntry::file(format!("{dir}/a.parquet"), 5));
        assert_eq!(entries[1], FileEntry::dir(format!("{dir}/nested")));
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let entries = LocalFileSystem::new()
            .list_status(temp_dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("dt=2024-01-01");

        let err = LocalFileSystem::new()
            .list_status(missing.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_file_url_lists_local_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("dt=1")).unwrap();
        std::fs::write(temp_dir.path().join("dt=1").join("t0-part-0"), b"abc").unwrap();

        let location = Url::from_directory_path(temp_dir.path()).unwrap();
        let dir = join_path(location.as_str(), "dt=1");
        let entries = LocalFileSystem::new().list_status(&dir).await.unwrap();

        assert_eq!(entries, vec![FileEntry::file(format!("{dir}/t0-part-0"), 3)]);
    }

    #[tokio::test]
    async fn test_missing_file_url_directory() {
        let temp_dir = TempDir::new().unwrap();
        let location = Url::from_directory_path(temp_dir.path()).unwrap();

        let err = LocalFileSystem::new()
            .list_status(&join_path(location.as_str(), "dt=9"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_file_url_with_remote_host_is_invalid() {
        let err = local_dir("file://server/share").unwrap_err();
        assert!(matches!(err, StorageError::InvalidUrl { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_directory_not_followed() {
        let target = TempDir::new().unwrap();
        std::fs::write(target.path().join("far.parquet"), b"123").unwrap();

        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(target.path(), temp_dir.path().join("link")).unwrap();

        let entries = LocalFileSystem::new()
            .list_status(temp_dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_dir);
        assert!(entries[0].path.ends_with("/link"));
    }
}
