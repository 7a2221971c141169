//! The checkpoint-aligned commit coordinator.
//!
//! A [`Committer`] collects writer reports, waits until every parallel
//! writer has reported for a checkpoint, then registers the files it finds
//! in the drained partitions with the catalog in two phases:
//!
//! 1. `commit_data` appends one fresh snapshot id per partition;
//! 2. `batch_commit_data_commit_info` stores the manifests those ids name.
//!
//! Phase 2 only runs if the catalog accepted phase 1. Partitions that never
//! reached the catalog (lookup or listing failure, rejected append) are put
//! back at the front of the pending set and the failure is surfaced. A
//! crash or error after phase 1 leaves snapshots without manifests; those
//! partitions are not retried.

mod assemble;

pub use assemble::{CommitPayload, PartitionFiles, assemble};

use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use snafu::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::CatalogClientRef;
use crate::checkpoint::TriggerStateRef;
use crate::config::SinkOptions;
use crate::emit;
use crate::error::{CatalogSnafu, CommitError, NotInitializedSnafu};
use crate::metrics::events::{
    CommitCompleted, CommitFailed, CommitRejected, FilesCommitted, PartitionsCommitted,
    PendingPartitions, QuorumReached, QuorumViolation,
};
use crate::model::{CommitOp, DataInfo};
use crate::quorum::TaskQuorum;
use crate::scanner::FileScanner;
use crate::trigger::PartitionTrigger;
use soulsink_core::storage::{ListDirRef, join_path};

/// Watermark before any tick has been observed.
pub const NO_WATERMARK: i64 = i64::MIN;

/// Partition directories listed concurrently during one commit.
const SCAN_CONCURRENCY: usize = 8;

/// Result of a commit that reached the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub checkpoint_id: i64,
    pub table_id: String,
    /// Committed partitions, in the order they were drained.
    pub partitions: Vec<String>,
    /// Snapshot id of each partition, index-aligned with `partitions`.
    pub snapshot_ids: Vec<Uuid>,
    pub files: usize,
}

/// Coordinates commits for one operator instance.
///
/// Calls on one instance must not overlap; the host runtime serializes
/// them, so no internal locking is done.
pub struct Committer {
    /// Label used for logs and metrics.
    table: String,
    options: SinkOptions,
    catalog: CatalogClientRef,
    scanner: FileScanner,
    trigger: Option<PartitionTrigger>,
    /// Allocated on the first record, which fixes the writer count.
    quorum: Option<TaskQuorum>,
    current_watermark: i64,
}

impl std::fmt::Debug for Committer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Committer")
            .field("table", &self.table)
            .field("options", &self.options)
            .field("scanner", &self.scanner)
            .field("trigger", &self.trigger)
            .field("quorum", &self.quorum)
            .field("current_watermark", &self.current_watermark)
            .finish()
    }
}

impl Committer {
    pub fn new(
        table: impl Into<String>,
        options: SinkOptions,
        catalog: CatalogClientRef,
        listing: ListDirRef,
    ) -> Self {
        let scanner = FileScanner::new(listing, options.file_in_progress_part_prefix.clone());
        Self {
            table: table.into(),
            options,
            catalog,
            scanner,
            trigger: None,
            quorum: None,
            current_watermark: NO_WATERMARK,
        }
    }

    /// Build the partition trigger, restoring it from `state` if `is_restored`.
    ///
    /// Must be called exactly once, before any record.
    pub async fn initialize(
        &mut self,
        is_restored: bool,
        state: TriggerStateRef,
    ) -> Result<(), CommitError> {
        ensure!(self.trigger.is_none(), crate::error::AlreadyInitializedSnafu);

        let trigger = PartitionTrigger::create(is_restored, state).await?;
        info!(
            table = %self.table,
            is_restored,
            pending = trigger.pending_len(),
            "Committer initialized"
        );
        emit!(PendingPartitions {
            table: self.table.clone(),
            count: trigger.pending_len(),
        });

        self.trigger = Some(trigger);
        self.quorum = None;
        self.current_watermark = NO_WATERMARK;
        Ok(())
    }

    /// Handle one writer report; commits when it completes its checkpoint.
    ///
    /// Returns the commit summary if a commit reached the catalog. An
    /// inconsistent report is rejected before any state changes.
    pub async fn process_element(
        &mut self,
        info: DataInfo,
    ) -> Result<Option<CommitSummary>, CommitError> {
        ensure!(self.trigger.is_some(), NotInitializedSnafu);

        if let Err(source) = self.check_report(&info) {
            emit!(QuorumViolation {
                table: self.table.clone(),
            });
            return Err(CommitError::Quorum { source });
        }

        let trigger = self.trigger.as_mut().context(NotInitializedSnafu)?;
        for partition in &info.partitions {
            trigger.add_partition(partition.as_str());
        }

        let completed = match self.quorum.as_mut() {
            Some(quorum) => quorum.add(info.checkpoint_id, info.task_id),
            None => {
                let mut quorum = TaskQuorum::new(info.number_of_tasks)?;
                let completed = quorum.add(info.checkpoint_id, info.task_id);
                self.quorum = Some(quorum);
                completed
            }
        };
        if !completed {
            return Ok(None);
        }

        debug!(
            table = %self.table,
            checkpoint_id = info.checkpoint_id,
            "All tasks reported"
        );
        emit!(QuorumReached {
            table: self.table.clone(),
            checkpoint_id: info.checkpoint_id,
        });

        self.commit(&info).await
    }

    fn check_report(&self, info: &DataInfo) -> Result<(), crate::error::QuorumError> {
        match &self.quorum {
            Some(quorum) => quorum.validate(info.task_id, info.number_of_tasks),
            None => TaskQuorum::new(info.number_of_tasks)?.validate(info.task_id, info.number_of_tasks),
        }
    }

    /// Drain the partitions committable at `info.checkpoint_id` and commit
    /// them in two phases.
    ///
    /// Does nothing, and never touches the catalog, if no partition is
    /// pending.
    pub async fn commit(&mut self, info: &DataInfo) -> Result<Option<CommitSummary>, CommitError> {
        let trigger = self.trigger.as_mut().context(NotInitializedSnafu)?;
        let partitions = if info.is_end_of_input() {
            trigger.end_input()
        } else {
            trigger.committable_partitions(info.checkpoint_id)
        };

        if partitions.is_empty() {
            debug!(
                table = %self.table,
                checkpoint_id = info.checkpoint_id,
                "No pending partitions, skipping commit"
            );
            return Ok(None);
        }

        let start = Instant::now();

        let payload = match self.prepare(info, &partitions).await {
            Ok(payload) => payload,
            Err(e) => {
                self.restore_partitions(partitions);
                emit!(CommitFailed {
                    table: self.table.clone(),
                    stage: if matches!(e, CommitError::Listing { .. }) {
                        "listing"
                    } else {
                        "lookup"
                    },
                });
                return Err(e);
            }
        };

        match self
            .catalog
            .commit_data(&payload.meta, true, CommitOp::Append)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    table = %self.table,
                    checkpoint_id = info.checkpoint_id,
                    partitions = partitions.len(),
                    "Catalog rejected append, partitions returned to trigger"
                );
                let count = partitions.len();
                self.restore_partitions(partitions);
                emit!(CommitRejected {
                    table: self.table.clone(),
                });
                return Err(CommitError::CommitRejected {
                    table_name: info.table_name.clone(),
                    checkpoint_id: info.checkpoint_id,
                    partitions: count,
                });
            }
            Err(source) => {
                self.restore_partitions(partitions);
                emit!(CommitFailed {
                    table: self.table.clone(),
                    stage: "snapshot",
                });
                return Err(CommitError::SnapshotCommit { source });
            }
        }

        if let Err(source) = self
            .catalog
            .batch_commit_data_commit_info(&payload.manifests)
            .await
        {
            warn!(
                table = %self.table,
                checkpoint_id = info.checkpoint_id,
                snapshots = payload.manifests.len(),
                "Manifest commit failed after snapshots were appended"
            );
            emit!(CommitFailed {
                table: self.table.clone(),
                stage: "manifest",
            });
            return Err(CommitError::Manifest { source });
        }

        let summary = CommitSummary {
            checkpoint_id: info.checkpoint_id,
            table_id: payload.meta.table_info.table_id.clone(),
            snapshot_ids: payload.snapshot_ids(),
            files: payload.file_count(),
            partitions,
        };

        info!(
            table = %self.table,
            checkpoint_id = summary.checkpoint_id,
            partitions = summary.partitions.len(),
            files = summary.files,
            "Committed checkpoint"
        );
        emit!(CommitCompleted {
            table: self.table.clone(),
            duration: start.elapsed(),
        });
        emit!(PartitionsCommitted {
            table: self.table.clone(),
            count: summary.partitions.len() as u64,
        });
        emit!(FilesCommitted {
            table: self.table.clone(),
            count: summary.files as u64,
        });

        Ok(Some(summary))
    }

    /// Look up the table and scan every partition for the reporting task's
    /// files. Results keep the drain order.
    async fn prepare(
        &self,
        info: &DataInfo,
        partitions: &[String],
    ) -> Result<CommitPayload, CommitError> {
        let table = self
            .catalog
            .lookup_table(&info.table_name)
            .await
            .context(CatalogSnafu)?;

        let location = self.options.location_path.as_str();
        let task_prefix = info.task_data_path.as_str();
        let scanner = &self.scanner;
        let scanned: Vec<PartitionFiles> = stream::iter(partitions.to_vec())
            .map(|partition| async move {
                let dir = join_path(location, &partition);
                match scanner.scan(&dir, task_prefix).await {
                    Ok(files) => Ok(PartitionFiles::new(partition, files)),
                    Err(source) => Err(CommitError::Listing { partition, source }),
                }
            })
            .buffered(SCAN_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(assemble(
            &table,
            scanned,
            &self.options.file_exist_column,
            chrono::Utc::now().timestamp_millis(),
        ))
    }

    fn restore_partitions(&mut self, partitions: Vec<String>) {
        if let Some(trigger) = self.trigger.as_mut() {
            trigger.return_partitions(partitions);
        }
    }

    /// Record a watermark tick. It is persisted with the next snapshot but
    /// never affects what gets committed.
    pub fn on_watermark(&mut self, timestamp: i64) {
        self.current_watermark = timestamp;
    }

    /// Persist the pending partitions for `checkpoint_id`. No catalog I/O.
    pub async fn snapshot_state(&self, checkpoint_id: i64) -> Result<(), CommitError> {
        let trigger = self.trigger.as_ref().context(NotInitializedSnafu)?;
        trigger
            .snapshot_state(checkpoint_id, self.current_watermark)
            .await?;
        emit!(PendingPartitions {
            table: self.table.clone(),
            count: trigger.pending_len(),
        });
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn options(&self) -> &SinkOptions {
        &self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.trigger.is_some()
    }

    pub fn current_watermark(&self) -> i64 {
        self.current_watermark
    }

    /// Watermark recovered from restored state, if any.
    pub fn restored_watermark(&self) -> Option<i64> {
        self.trigger.as_ref().and_then(|t| t.restored_watermark())
    }

    /// Partitions waiting for a commit, oldest first.
    pub fn pending_partitions(&self) -> Vec<String> {
        self.trigger
            .as_ref()
            .map(|t| t.pending_partitions())
            .unwrap_or_default()
    }

    /// Writer count fixed by the first record, if one arrived.
    pub fn total_tasks(&self) -> Option<u32> {
        self.quorum.as_ref().map(|q| q.total_tasks())
    }
}
