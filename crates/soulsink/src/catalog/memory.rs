//! A catalog held in process memory.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::document::{CatalogDocument, PartitionVersion};
use super::CatalogClient;
use crate::error::CatalogError;
use crate::model::{CommitOp, DataCommitInfo, MetaInfo, TableInfo};

/// Catalog backed by a shared [`CatalogDocument`].
///
/// Clones share the same contents, so a test can keep a handle for
/// inspection while the committer owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    document: Arc<Mutex<CatalogDocument>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_table(&self, table: TableInfo) -> Result<(), CatalogError> {
        self.document.lock().await.register_table(table)
    }

    pub async fn partition_version(
        &self,
        table_id: &str,
        partition_desc: &str,
    ) -> Option<PartitionVersion> {
        self.document
            .lock()
            .await
            .partition_version(table_id, partition_desc)
            .cloned()
    }

    /// Snapshot chain of a partition, empty if it was never committed.
    pub async fn snapshot_chain(&self, table_id: &str, partition_desc: &str) -> Vec<Uuid> {
        self.partition_version(table_id, partition_desc)
            .await
            .map(|v| v.snapshot)
            .unwrap_or_default()
    }

    pub async fn data_commit_info(&self, commit_id: &Uuid) -> Option<DataCommitInfo> {
        self.document.lock().await.data_commit_info(commit_id).cloned()
    }

    pub async fn data_commit_infos(&self, table_id: &str, partition_desc: &str) -> Vec<DataCommitInfo> {
        self.document
            .lock()
            .await
            .data_commit_infos(table_id, partition_desc)
    }

    pub async fn snapshots_without_manifest(&self, table_id: &str, partition_desc: &str) -> Vec<Uuid> {
        self.document
            .lock()
            .await
            .snapshots_without_manifest(table_id, partition_desc)
    }

    /// Copy of the whole document.
    pub async fn document(&self) -> CatalogDocument {
        self.document.lock().await.clone()
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn lookup_table(&self, table_name: &str) -> Result<TableInfo, CatalogError> {
        self.document.lock().await.lookup_table(table_name)
    }

    async fn commit_data(
        &self,
        meta: &MetaInfo,
        append_mode: bool,
        commit_op: CommitOp,
    ) -> Result<bool, CatalogError> {
        Ok(self
            .document
            .lock()
            .await
            .commit_data(meta, append_mode, commit_op))
    }

    async fn batch_commit_data_commit_info(
        &self,
        infos: &[DataCommitInfo],
    ) -> Result<(), CatalogError> {
        self.document.lock().await.insert_data_commit_infos(infos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartitionInfo;

    #[tokio::test]
    async fn test_clones_share_contents() {
        let catalog = InMemoryCatalog::new();
        let handle = catalog.clone();
        let table = TableInfo::new("events", "/warehouse/events");
        catalog.register_table(table.clone()).await.unwrap();

        let id = Uuid::new_v4();
        let meta = MetaInfo {
            table_info: table.clone(),
            partitions: vec![PartitionInfo {
                table_id: table.table_id.clone(),
                partition_desc: "dt=1".to_string(),
                commit_op: CommitOp::Append,
                snapshot: vec![id],
            }],
        };
        assert!(catalog.commit_data(&meta, true, CommitOp::Append).await.unwrap());
        assert_eq!(handle.snapshot_chain(&table.table_id, "dt=1").await, vec![id]);
        assert_eq!(
            handle.snapshots_without_manifest(&table.table_id, "dt=1").await,
            vec![id]
        );

        catalog
            .batch_commit_data_commit_info(&[DataCommitInfo::builder(id, &table.table_id, "dt=1").build()])
            .await
            .unwrap();
        assert!(handle.data_commit_info(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_lookup_unknown_table() {
        let catalog = InMemoryCatalog::new();
        let err = catalog.lookup_table("nope").await.unwrap_err();
        assert!(matches!(err, CatalogError::TableNotFound { .. }));
    }
}
