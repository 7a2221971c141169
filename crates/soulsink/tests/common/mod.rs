//! Shared doubles for committer integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use soulsink::catalog::{CatalogClient, InMemoryCatalog};
use soulsink::checkpoint::{InMemoryState, TriggerState};
use soulsink::error::{CatalogError, StorageError};
use soulsink::model::{CommitOp, DataCommitInfo, DataInfo, MetaInfo, TableInfo};
use soulsink::{Committer, SinkOptions};
use soulsink_core::storage::{FileEntry, ListDir};

pub const TABLE: &str = "events";
pub const LOCATION: &str = "/warehouse/events";

/// One call made against the catalog.
#[derive(Debug, Clone)]
pub enum CatalogCall {
    Lookup(String),
    CommitData {
        meta: MetaInfo,
        append_mode: bool,
        commit_op: CommitOp,
    },
    BatchCommit(Vec<DataCommitInfo>),
}

#[derive(Debug, Default)]
struct Faults {
    reject_commits: usize,
    fail_commits: usize,
    fail_manifests: bool,
}

/// In-memory catalog that records every call and can inject failures.
#[derive(Debug, Default)]
pub struct RecordingCatalog {
    pub inner: InMemoryCatalog,
    calls: Mutex<Vec<CatalogCall>>,
    faults: Mutex<Faults>,
}

impl RecordingCatalog {
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commit_data_calls(&self) -> Vec<MetaInfo> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CatalogCall::CommitData { meta, .. } => Some(meta),
                _ => None,
            })
            .collect()
    }

    pub fn batch_calls(&self) -> Vec<Vec<DataCommitInfo>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CatalogCall::BatchCommit(infos) => Some(infos),
                _ => None,
            })
            .collect()
    }

    /// Make the next `n` Phase-A calls return false.
    pub fn reject_next_commits(&self, n: usize) {
        self.faults.lock().unwrap().reject_commits = n;
    }

    /// Make the next `n` Phase-A calls fail with an error.
    pub fn fail_next_commits(&self, n: usize) {
        self.faults.lock().unwrap().fail_commits = n;
    }

    /// Make every Phase-B call fail.
    pub fn fail_manifests(&self, fail: bool) {
        self.faults.lock().unwrap().fail_manifests = fail;
    }

    fn record(&self, call: CatalogCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CatalogClient for RecordingCatalog {
    async fn lookup_table(&self, table_name: &str) -> Result<TableInfo, CatalogError> {
        self.record(CatalogCall::Lookup(table_name.to_string()));
        self.inner.lookup_table(table_name).await
    }

    async fn commit_data(
        &self,
        meta: &MetaInfo,
        append_mode: bool,
        commit_op: CommitOp,
    ) -> Result<bool, CatalogError> {
        self.record(CatalogCall::CommitData {
            meta: meta.clone(),
            append_mode,
            commit_op,
        });
        {
            let mut faults = self.faults.lock().unwrap();
            if faults.reject_commits > 0 {
                faults.reject_commits -= 1;
                return Ok(false);
            }
            if faults.fail_commits > 0 {
                faults.fail_commits -= 1;
                return Err(CatalogError::CatalogIo {
                    path: "snapshots".to_string(),
                    source: std::io::Error::other("injected snapshot failure"),
                });
            }
        }
        self.inner.commit_data(meta, append_mode, commit_op).await
    }

    async fn batch_commit_data_commit_info(
        &self,
        infos: &[DataCommitInfo],
    ) -> Result<(), CatalogError> {
        self.record(CatalogCall::BatchCommit(infos.to_vec()));
        if self.faults.lock().unwrap().fail_manifests {
            return Err(CatalogError::CatalogIo {
                path: "manifests".to_string(),
                source: std::io::Error::other("injected manifest failure"),
            });
        }
        self.inner.batch_commit_data_commit_info(infos).await
    }
}

/// Listing backend serving fixed directory contents.
///
/// Directories never registered list as missing.
#[derive(Debug, Default)]
pub struct StaticListing {
    dirs: Mutex<HashMap<String, Vec<FileEntry>>>,
}

impl StaticListing {
    /// Register `dir` with files of the given names and sizes, in order.
    pub fn with_files(&self, dir: &str, files: &[(&str, u64)]) {
        let entries = files
            .iter()
            .map(|(name, len)| FileEntry::file(format!("{dir}/{name}"), *len))
            .collect();
        self.dirs.lock().unwrap().insert(dir.to_string(), entries);
    }

    pub fn with_entries(&self, dir: &str, entries: Vec<FileEntry>) {
        self.dirs.lock().unwrap().insert(dir.to_string(), entries);
    }
}

#[async_trait]
impl ListDir for StaticListing {
    async fn list_status(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        self.dirs
            .lock()
            .unwrap()
            .get(dir)
            .cloned()
            .ok_or_else(|| StorageError::DirectoryMissing {
                path: dir.to_string(),
            })
    }

    fn backend(&self) -> &'static str {
        "static"
    }
}

/// A committer wired to shared doubles so it can be "restarted".
pub struct Harness {
    pub catalog: Arc<RecordingCatalog>,
    pub listing: Arc<StaticListing>,
    pub state: InMemoryState<TriggerState>,
    pub table: TableInfo,
    pub options: SinkOptions,
}

impl Harness {
    pub async fn new() -> Self {
        let catalog = Arc::new(RecordingCatalog::default());
        let table = TableInfo::new(TABLE, LOCATION);
        catalog.inner.register_table(table.clone()).await.unwrap();
        Self {
            catalog,
            listing: Arc::new(StaticListing::default()),
            state: InMemoryState::new(),
            table,
            options: SinkOptions::new(LOCATION).with_exist_columns("id,ts"),
        }
    }

    /// A fresh committer instance over the shared catalog, listing and state.
    pub async fn committer(&self, is_restored: bool) -> Committer {
        let mut committer = Committer::new(
            TABLE,
            self.options.clone(),
            self.catalog.clone(),
            self.listing.clone(),
        );
        committer
            .initialize(is_restored, Arc::new(self.state.clone()))
            .await
            .unwrap();
        committer
    }

    pub fn partition_dir(partition: &str) -> String {
        format!("{LOCATION}/{partition}")
    }
}

pub fn report(
    checkpoint_id: i64,
    task_id: u32,
    number_of_tasks: u32,
    task_data_path: &str,
    partitions: &[&str],
) -> DataInfo {
    DataInfo {
        checkpoint_id,
        task_id,
        number_of_tasks,
        table_name: TABLE.to_string(),
        task_data_path: task_data_path.to_string(),
        partitions: partitions
            .iter()
            .map(|p| p.to_string())
            .collect::<BTreeSet<_>>(),
    }
}
