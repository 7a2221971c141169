//! Internal events for coordinator metrics emission.
//!
//! Every event carries a `table` label so multi-table deployments can be
//! observed per table.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

pub use soulsink_core::InternalEvent;

// ============================================================================
// Quorum events
// ============================================================================

/// Event emitted when every task reported for a checkpoint.
pub struct QuorumReached {
    pub table: String,
    pub checkpoint_id: i64,
}

impl InternalEvent for QuorumReached {
    fn emit(self) {
        trace!(table = %self.table, checkpoint_id = self.checkpoint_id, "Quorum reached");
        counter!("soulsink_quorums_reached_total", "table" => self.table).increment(1);
    }
}

/// Event emitted when a record is refused for inconsistent task counts.
pub struct QuorumViolation {
    pub table: String,
}

impl InternalEvent for QuorumViolation {
    fn emit(self) {
        trace!(table = %self.table, "Quorum violation");
        counter!("soulsink_quorum_violations_total", "table" => self.table).increment(1);
    }
}

// ============================================================================
// Commit events
// ============================================================================

/// Event emitted when both commit phases succeed.
pub struct CommitCompleted {
    pub table: String,
    pub duration: Duration,
}

impl InternalEvent for CommitCompleted {
    fn emit(self) {
        trace!(
            table = %self.table,
            duration_ms = self.duration.as_millis(),
            "Commit completed"
        );
        histogram!("soulsink_commit_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when the catalog refuses a snapshot append.
pub struct CommitRejected {
    pub table: String,
}

impl InternalEvent for CommitRejected {
    fn emit(self) {
        trace!(table = %self.table, "Commit rejected");
        counter!("soulsink_commits_rejected_total", "table" => self.table).increment(1);
    }
}

/// Event emitted when a commit fails for any other reason.
pub struct CommitFailed {
    pub table: String,
    /// Short failure class, e.g. "listing" or "manifest".
    pub stage: &'static str,
}

impl InternalEvent for CommitFailed {
    fn emit(self) {
        trace!(table = %self.table, stage = self.stage, "Commit failed");
        counter!("soulsink_commits_failed_total", "table" => self.table, "stage" => self.stage)
            .increment(1);
    }
}

/// Event emitted with the number of partitions in a successful commit.
pub struct PartitionsCommitted {
    pub table: String,
    pub count: u64,
}

impl InternalEvent for PartitionsCommitted {
    fn emit(self) {
        trace!(table = %self.table, count = self.count, "Partitions committed");
        counter!("soulsink_partitions_committed_total", "table" => self.table)
            .increment(self.count);
    }
}

/// Event emitted with the number of files in a successful commit.
pub struct FilesCommitted {
    pub table: String,
    pub count: u64,
}

impl InternalEvent for FilesCommitted {
    fn emit(self) {
        trace!(table = %self.table, count = self.count, "Files committed");
        counter!("soulsink_files_committed_total", "table" => self.table).increment(self.count);
    }
}

// ============================================================================
// State events
// ============================================================================

/// Event emitted to track partitions waiting for a checkpoint.
pub struct PendingPartitions {
    pub table: String,
    pub count: usize,
}

impl InternalEvent for PendingPartitions {
    fn emit(self) {
        gauge!("soulsink_pending_partitions", "table" => self.table).set(self.count as f64);
    }
}

/// Event emitted to track the size of a stored trigger snapshot.
pub struct CheckpointStateSize {
    pub bytes: usize,
}

impl InternalEvent for CheckpointStateSize {
    fn emit(self) {
        gauge!("soulsink_checkpoint_state_bytes").set(self.bytes as f64);
    }
}
