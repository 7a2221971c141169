//! Catalog contents shared by the in-memory and file backends.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CatalogError;
use crate::model::{CommitOp, DataCommitInfo, MetaInfo, TableInfo};

/// Current version of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionVersion {
    /// Incremented once per accepted commit, starting at 0.
    pub version: i64,
    pub commit_op: CommitOp,
    /// Every snapshot id the partition currently references, oldest first.
    pub snapshot: Vec<Uuid>,
}

/// Tables, partition versions and manifests of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Tables keyed by name.
    #[serde(default)]
    tables: IndexMap<String, TableInfo>,
    /// Partition versions keyed by table id, then partition descriptor.
    #[serde(default)]
    partitions: BTreeMap<String, BTreeMap<String, PartitionVersion>>,
    /// Manifests keyed by commit id, in insertion order.
    #[serde(default)]
    data_commits: IndexMap<Uuid, DataCommitInfo>,
}

impl CatalogDocument {
    pub fn register_table(&mut self, table: TableInfo) -> Result<(), CatalogError> {
        if self.tables.contains_key(&table.table_name) {
            return Err(CatalogError::TableExists {
                table_name: table.table_name,
            });
        }
        self.tables.insert(table.table_name.clone(), table);
        Ok(())
    }

    pub fn lookup_table(&self, table_name: &str) -> Result<TableInfo, CatalogError> {
        self.tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| CatalogError::TableNotFound {
                table_name: table_name.to_string(),
            })
    }

    /// Apply a Phase-A commit. Returns false, changing nothing, on rejection.
    pub fn commit_data(&mut self, meta: &MetaInfo, append_mode: bool, commit_op: CommitOp) -> bool {
        let table_id = &meta.table_info.table_id;
        if !self.tables.values().any(|t| &t.table_id == table_id) {
            warn!(table_id = %table_id, "Rejecting commit for unknown table id");
            return false;
        }

        let mut seen = HashSet::new();
        for partition in &meta.partitions {
            if &partition.table_id != table_id || !seen.insert(partition.partition_desc.as_str()) {
                warn!(
                    table_id = %table_id,
                    partition = %partition.partition_desc,
                    "Rejecting commit with inconsistent partition list"
                );
                return false;
            }
            let existing = self.partition_version(table_id, &partition.partition_desc);
            if let Some(current) = existing {
                if partition.snapshot.iter().any(|id| current.snapshot.contains(id)) {
                    warn!(
                        table_id = %table_id,
                        partition = %partition.partition_desc,
                        "Rejecting commit with snapshot id already in chain"
                    );
                    return false;
                }
            }
        }

        let table_partitions = self.partitions.entry(table_id.clone()).or_default();
        for partition in &meta.partitions {
            let next = match table_partitions.get(&partition.partition_desc) {
                Some(current) => {
                    let mut snapshot = if append_mode {
                        current.snapshot.clone()
                    } else {
                        Vec::new()
                    };
                    snapshot.extend(partition.snapshot.iter().copied());
                    PartitionVersion {
                        version: current.version + 1,
                        commit_op,
                        snapshot,
                    }
                }
                None => PartitionVersion {
                    version: 0,
                    commit_op,
                    snapshot: partition.snapshot.clone(),
                },
            };
            debug!(
                table_id = %table_id,
                partition = %partition.partition_desc,
                version = next.version,
                "Advanced partition snapshot chain"
            );
            table_partitions.insert(partition.partition_desc.clone(), next);
        }
        true
    }

    pub fn insert_data_commit_infos(&mut self, infos: &[DataCommitInfo]) {
        for info in infos {
            self.data_commits.insert(info.commit_id, info.clone());
        }
    }

    pub fn partition_version(&self, table_id: &str, partition_desc: &str) -> Option<&PartitionVersion> {
        self.partitions.get(table_id)?.get(partition_desc)
    }

    pub fn data_commit_info(&self, commit_id: &Uuid) -> Option<&DataCommitInfo> {
        self.data_commits.get(commit_id)
    }

    /// Manifests of one partition, in insertion order.
    pub fn data_commit_infos(&self, table_id: &str, partition_desc: &str) -> Vec<DataCommitInfo> {
        self.data_commits
            .values()
            .filter(|info| info.table_id == table_id && info.partition_desc == partition_desc)
            .cloned()
            .collect()
    }

    /// Snapshot ids referenced by a partition that have no stored manifest.
    pub fn snapshots_without_manifest(&self, table_id: &str, partition_desc: &str) -> Vec<Uuid> {
        self.partition_version(table_id, partition_desc)
            .map(|version| {
                version
                    .snapshot
                    .iter()
                    .filter(|id| !self.data_commits.contains_key(*id))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }
}
