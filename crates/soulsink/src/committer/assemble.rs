//! Building the two catalog payloads of one commit.

use uuid::Uuid;

use crate::model::{CommitOp, DataCommitInfo, FileOp, MetaInfo, PartitionInfo, TableInfo};
use crate::scanner::ScannedFile;

/// Files discovered for one drained partition, with its fresh snapshot id.
#[derive(Debug, Clone)]
pub struct PartitionFiles {
    pub partition_desc: String,
    pub snapshot_id: Uuid,
    pub files: Vec<ScannedFile>,
}

impl PartitionFiles {
    /// Pair a partition with a newly generated snapshot id.
    pub fn new(partition_desc: impl Into<String>, files: Vec<ScannedFile>) -> Self {
        Self {
            partition_desc: partition_desc.into(),
            snapshot_id: Uuid::new_v4(),
            files,
        }
    }
}

/// Phase-A and Phase-B payloads, index-aligned by partition.
#[derive(Debug, Clone)]
pub struct CommitPayload {
    pub meta: MetaInfo,
    pub manifests: Vec<DataCommitInfo>,
}

impl CommitPayload {
    pub fn snapshot_ids(&self) -> Vec<Uuid> {
        self.manifests.iter().map(|m| m.commit_id).collect()
    }

    pub fn file_count(&self) -> usize {
        self.manifests.iter().map(|m| m.file_ops.len()).sum()
    }
}

/// Build one `PartitionInfo` and one `DataCommitInfo` per partition.
///
/// Partitions without files still get a manifest with no file operations.
pub fn assemble(
    table: &TableInfo,
    partitions: Vec<PartitionFiles>,
    exist_cols: &str,
    timestamp: i64,
) -> CommitPayload {
    let mut infos = Vec::with_capacity(partitions.len());
    let mut manifests = Vec::with_capacity(partitions.len());

    for partition in partitions {
        infos.push(PartitionInfo {
            table_id: table.table_id.clone(),
            partition_desc: partition.partition_desc.clone(),
            commit_op: CommitOp::Append,
            snapshot: vec![partition.snapshot_id],
        });

        let manifest = DataCommitInfo::builder(
            partition.snapshot_id,
            &table.table_id,
            partition.partition_desc,
        )
        .commit_op(CommitOp::Append)
        .timestamp(timestamp)
        .file_ops(
            partition
                .files
                .into_iter()
                .map(|file| FileOp::add(file.path, file.size, exist_cols)),
        )
        .build();
        manifests.push(manifest);
    }

    CommitPayload {
        meta: MetaInfo {
            table_info: table.clone(),
            partitions: infos,
        },
        manifests,
    }
}
