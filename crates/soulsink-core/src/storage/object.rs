//! Listing over any `object_store` backend (S3, GCS, Azure, memory, local).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use object_store::{ObjectStore, ObjectStoreScheme};
use object_store::path::Path;
use snafu::prelude::*;
use tracing::debug;
use url::Url;

use super::{FileEntry, ListDir};
use crate::emit;
use crate::error::{InvalidUrlSnafu, ObjectStoreSnafu, OutsideLocationSnafu, StorageError};
use crate::metrics::events::{DirectoryListed, DirectoryListingFailed};

const BACKEND: &str = "object_store";

/// Lists "directories" of an object store through delimiter listing.
///
/// Object stores have no real directories, so a prefix with no objects
/// lists as empty rather than missing. Paths are exchanged in the same
/// URL form as the table location: `base` is that location and `root` is
/// the store key it resolves to.
#[derive(Clone)]
pub struct ObjectStoreListing {
    store: Arc<dyn ObjectStore>,
    /// Location URL without a trailing slash.
    base: String,
    root: Path,
}

impl std::fmt::Debug for ObjectStoreListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreListing")
            .field("base", &self.base)
            .field("root", &self.root)
            .finish()
    }
}

impl ObjectStoreListing {
    /// Wrap an existing store whose keys are rendered under `base`.
    pub fn new(store: Arc<dyn ObjectStore>, base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            store,
            base: base.trim_end_matches('/').to_string(),
            root: Path::default(),
        }
    }

    /// Wrap an existing store rooted at a location URL.
    ///
    /// The store key for the location is resolved the way `object_store`
    /// does, so userinfo (`abfss://container@account...`) and ports
    /// (`http://localhost:9000/...`) stay part of the rendered paths.
    pub fn at_location(store: Arc<dyn ObjectStore>, location: &str) -> Result<Self, StorageError> {
        let parsed = Url::parse(location)
            .ok()
            .context(InvalidUrlSnafu { url: location })?;
        let (_, root) = ObjectStoreScheme::parse(&parsed)
            .map_err(object_store::Error::from)
            .context(ObjectStoreSnafu)?;
        Ok(Self {
            store,
            base: location.trim_end_matches('/').to_string(),
            root,
        })
    }

    /// Build a listing backend for a storage URL such as `s3://bucket/warehouse`.
    pub fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let parsed = Url::parse(url).ok().context(InvalidUrlSnafu { url })?;
        let (store, root) = object_store::parse_url_opts(&parsed, options).context(ObjectStoreSnafu)?;
        Ok(Self {
            store: Arc::from(store),
            base: url.trim_end_matches('/').to_string(),
            root,
        })
    }

    /// Map a path under `base` to its store key.
    fn key_of(&self, dir: &str) -> Result<String, StorageError> {
        let rest = dir
            .strip_prefix(self.base.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .context(OutsideLocationSnafu {
                path: dir,
                location: self.base.as_str(),
            })?
            .trim_matches('/');
        let root = self.root.as_ref();
        Ok(match (root.is_empty(), rest.is_empty()) {
            (true, _) => rest.to_string(),
            (false, true) => root.to_string(),
            (false, false) => format!("{root}/{rest}"),
        })
    }

    fn qualify(&self, key: &Path) -> String {
        let key = key.as_ref();
        let root = self.root.as_ref();
        let rest = if root.is_empty() {
            key
        } else {
            key.strip_prefix(root).unwrap_or(key).trim_start_matches('/')
        };
        format!("{}/{}", self.base, rest)
    }

    async fn read_entries(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let key = self.key_of(dir)?;
        let prefix = (!key.is_empty()).then(|| Path::from(key));
        let listing = self
            .store
            .list_with_delimiter(prefix.as_ref())
            .await
            .context(ObjectStoreSnafu)?;

        let mut entries = Vec::with_capacity(listing.common_prefixes.len() + listing.objects.len());
        entries.extend(
            listing
                .common_prefixes
                .iter()
                .map(|p| FileEntry::dir(self.qualify(p))),
        );
        entries.extend(
            listing
                .objects
                .iter()
                .map(|meta| FileEntry::file(self.qualify(&meta.location), meta.size as u64)),
        );
        Ok(entries)
    }
}

#[async_trait]
impl ListDir for ObjectStoreListing {
    async fn list_status(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let start = Instant::now();
        match self.read_entries(dir).await {
            Ok(entries) => {
                debug!(dir = %dir, count = entries.len(), "Listed object store prefix");
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
