//! Directory listing capability used to discover committed data files.
//!
//! The committer never writes to storage; it only needs a single-level
//! listing of a partition directory. [`ListDir`] abstracts that over the
//! local filesystem and any `object_store` backend.

mod local;
mod object;

pub use local::LocalFileSystem;
pub use object::ObjectStoreListing;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::StorageError;

/// A reference-counted listing backend.
pub type ListDirRef = Arc<dyn ListDir>;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Fully qualified path of the entry.
    pub path: String,
    pub is_dir: bool,
    /// Size in bytes; zero for directories.
    pub len: u64,
}

impl FileEntry {
    pub fn file(path: impl Into<String>, len: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            len,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            len: 0,
        }
    }
}

/// Single-level directory listing.
///
/// Implementations return entries in the backend's own order and must
/// distinguish a missing directory ([`StorageError::DirectoryMissing`]) from
/// an empty one (`Ok(vec![])`) where the backend can tell them apart.
#[async_trait]
pub trait ListDir: Send + Sync {
    /// List the immediate children of `dir`.
    async fn list_status(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError>;

    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;
}

/// Join a table root and a partition descriptor into a directory path.
///
/// ```
/// use soulsink_core::storage::join_path;
///
/// assert_eq!(join_path("/warehouse/t", "dt=2024-01-01"), "/warehouse/t/dt=2024-01-01");
/// assert_eq!(join_path("s3://b/t/", "/dt=1"), "s3://b/t/dt=1");
/// assert_eq!(join_path("/warehouse/t", ""), "/warehouse/t");
/// ```
pub fn join_path(root: &str, child: &str) -> String {
    let root = root.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if child.is_empty() {
        root.to_string()
    } else {
        format!("{root}/{child}")
    }
}

/// Pick a listing backend for a table location.
///
/// Locations with a URL scheme other than `file` go through `object_store`,
/// keyed relative to the location itself. Plain paths and `file://` URLs
/// use the local filesystem, which resolves `file://` directories itself.
pub fn listing_for_location(
    location: &str,
    options: HashMap<String, String>,
) -> Result<ListDirRef, StorageError> {
    match Url::parse(location) {
        // One-letter schemes are Windows drive letters.
        Ok(url) if url.scheme() != "file" && url.scheme().len() > 1 => {
            Ok(Arc::new(ObjectStoreListing::for_url_with_options(location, options)?))
        }
        _ => Ok(Arc::new(LocalFileSystem::new())),
    }
}
