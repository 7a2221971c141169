//! The metadata catalog that makes committed files visible.
//!
//! A commit reaches the catalog in two calls: [`CatalogClient::commit_data`]
//! advances each partition's snapshot chain, then
//! [`CatalogClient::batch_commit_data_commit_info`] stores the manifests those
//! snapshots reference.

mod document;
mod file;
mod memory;

pub use document::{CatalogDocument, PartitionVersion};
pub use file::JsonFileCatalog;
pub use memory::InMemoryCatalog;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::model::{CommitOp, DataCommitInfo, MetaInfo, TableInfo};

/// A reference-counted catalog client.
pub type CatalogClientRef = Arc<dyn CatalogClient>;

/// Operations the committer needs from a catalog backend.
///
/// Implementations must serialize `commit_data` calls: several committer
/// instances may append to the same table concurrently.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Look up a table by name.
    ///
    /// Fails with [`CatalogError::TableNotFound`] for unknown names.
    async fn lookup_table(&self, table_name: &str) -> Result<TableInfo, CatalogError>;

    /// Atomically advance the snapshot chain of every partition in `meta`.
    ///
    /// Returns `Ok(false)` when the catalog rejects the append (unknown
    /// table id, a snapshot id already present, a partition listed twice);
    /// in that case no partition is changed.
    async fn commit_data(
        &self,
        meta: &MetaInfo,
        append_mode: bool,
        commit_op: CommitOp,
    ) -> Result<bool, CatalogError>;

    /// Store manifests keyed by their commit id.
    async fn batch_commit_data_commit_info(
        &self,
        infos: &[DataCommitInfo],
    ) -> Result<(), CatalogError>;
}
