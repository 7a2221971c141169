//! Records exchanged between writers, the committer and the catalog.
//!
//! These are plain values. The only constructor with behaviour is
//! [`DataCommitInfoBuilder`], which accumulates file operations for one
//! partition before the manifest is frozen.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkpoint id that marks the final drain of a bounded stream.
pub const END_OF_INPUT: i64 = i64::MAX;

/// A writer's report that it finished its files for a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub checkpoint_id: i64,
    pub task_id: u32,
    pub number_of_tasks: u32,
    pub table_name: String,
    /// Filename prefix shared by every file this task wrote.
    pub task_data_path: String,
    #[serde(default)]
    pub partitions: BTreeSet<String>,
}

impl DataInfo {
    /// True for the end-of-input sentinel.
    pub fn is_end_of_input(&self) -> bool {
        self.checkpoint_id == END_OF_INPUT
    }
}

/// Commit mode recorded on partitions and manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommitOp {
    #[default]
    Append,
}

impl CommitOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitOp::Append => "append",
        }
    }
}

impl std::fmt::Display for CommitOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation applied to a single data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileOpKind {
    #[default]
    Add,
}

/// Catalog description of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_id: String,
    pub table_name: String,
    /// Root directory under which partition subdirectories live.
    pub table_path: String,
    #[serde(default)]
    pub table_schema: String,
}

impl TableInfo {
    /// Describe a new table with a freshly generated id.
    pub fn new(table_name: impl Into<String>, table_path: impl Into<String>) -> Self {
        Self {
            table_id: format!("table_{}", Uuid::new_v4().simple()),
            table_name: table_name.into(),
            table_path: table_path.into(),
            table_schema: String::new(),
        }
    }
}

/// A new version of one partition: the snapshot ids to append to its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub table_id: String,
    pub partition_desc: String,
    pub commit_op: CommitOp,
    pub snapshot: Vec<Uuid>,
}

/// One file in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOp {
    pub path: String,
    pub size: u64,
    pub op: FileOpKind,
    /// Comma-separated column list present in the file.
    pub exist_cols: String,
}

impl FileOp {
    pub fn add(path: impl Into<String>, size: u64, exist_cols: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size,
            op: FileOpKind::Add,
            exist_cols: exist_cols.into(),
        }
    }
}

/// The manifest of files referenced by one partition snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCommitInfo {
    /// Equal to the snapshot id appended in the matching [`PartitionInfo`].
    pub commit_id: Uuid,
    pub table_id: String,
    pub partition_desc: String,
    pub commit_op: CommitOp,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub file_ops: Vec<FileOp>,
}

impl DataCommitInfo {
    pub fn builder(
        commit_id: Uuid,
        table_id: impl Into<String>,
        partition_desc: impl Into<String>,
    ) -> DataCommitInfoBuilder {
        DataCommitInfoBuilder {
            commit_id,
            table_id: table_id.into(),
            partition_desc: partition_desc.into(),
            commit_op: CommitOp::Append,
            timestamp: 0,
            file_ops: Vec::new(),
        }
    }
}

/// Accumulates the file operations of a manifest.
#[derive(Debug, Clone)]
pub struct DataCommitInfoBuilder {
    commit_id: Uuid,
    table_id: String,
    partition_desc: String,
    commit_op: CommitOp,
    timestamp: i64,
    file_ops: Vec<FileOp>,
}

impl DataCommitInfoBuilder {
    pub fn commit_op(mut self, commit_op: CommitOp) -> Self {
        self.commit_op = commit_op;
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append one file; order of calls is preserved.
    pub fn file_op(mut self, op: FileOp) -> Self {
        self.file_ops.push(op);
        self
    }

    pub fn file_ops(mut self, ops: impl IntoIterator<Item = FileOp>) -> Self {
        self.file_ops.extend(ops);
        self
    }

    pub fn build(self) -> DataCommitInfo {
        DataCommitInfo {
            commit_id: self.commit_id,
            table_id: self.table_id,
            partition_desc: self.partition_desc,
            commit_op: self.commit_op,
            timestamp: self.timestamp,
            file_ops: self.file_ops,
        }
    }
}

/// Phase-A payload: the table and the partition versions to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub table_info: TableInfo,
    pub partitions: Vec<PartitionInfo>,
}
