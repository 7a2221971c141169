//! A catalog persisted as a single JSON document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::Mutex;
use tracing::debug;

use super::document::CatalogDocument;
use super::CatalogClient;
use crate::error::{CatalogDecodeSnafu, CatalogEncodeSnafu, CatalogError, CatalogIoSnafu};
use crate::model::{CommitOp, DataCommitInfo, MetaInfo, TableInfo};

/// Catalog stored in one JSON file.
///
/// Every mutation rewrites the whole document through a temp file and a
/// rename, so readers never observe a half-applied commit. The mutex
/// serializes writers within this process only.
#[derive(Debug)]
pub struct JsonFileCatalog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register `table` unless a table with the same name exists.
    ///
    /// Returns the stored description, which keeps the existing table id.
    pub async fn ensure_table(&self, table: TableInfo) -> Result<TableInfo, CatalogError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        if let Ok(existing) = document.lookup_table(&table.table_name) {
            return Ok(existing);
        }
        document.register_table(table.clone())?;
        self.write(&document).await?;
        Ok(table)
    }

    pub async fn register_table(&self, table: TableInfo) -> Result<(), CatalogError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        document.register_table(table)?;
        self.write(&document).await
    }

    /// Current contents; an absent file reads as an empty catalog.
    pub async fn document(&self) -> Result<CatalogDocument, CatalogError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<CatalogDocument, CatalogError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CatalogDocument::default()),
            Err(source) => {
                return Err(CatalogError::CatalogIo {
                    path: self.display(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).context(CatalogDecodeSnafu {
            path: self.display(),
        })
    }

    async fn write(&self, document: &CatalogDocument) -> Result<(), CatalogError> {
        let bytes = serde_json::to_vec_pretty(document).context(CatalogEncodeSnafu)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(CatalogIoSnafu {
                    path: parent.display().to_string(),
                })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.context(CatalogIoSnafu {
            path: tmp.display().to_string(),
        })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context(CatalogIoSnafu {
                path: self.display(),
            })?;

        debug!(path = %self.display(), bytes = bytes.len(), "Catalog document written");
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for JsonFileCatalog {
    async fn lookup_table(&self, table_name: &str) -> Result<TableInfo, CatalogError> {
        self.document().await?.lookup_table(table_name)
    }

    async fn commit_data(
        &self,
        meta: &MetaInfo,
        append_mode: bool,
        commit_op: CommitOp,
    ) -> Result<bool, CatalogError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        if !document.commit_data(meta, append_mode, commit_op) {
            return Ok(false);
        }
        self.write(&document).await?;
        Ok(true)
    }

    async fn batch_commit_data_commit_info(
        &self,
        infos: &[DataCommitInfo],
    ) -> Result<(), CatalogError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        document.insert_data_commit_infos(infos);
        self.write(&document).await
    }
}
