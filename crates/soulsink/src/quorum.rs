//! Per-checkpoint arrival tracking for parallel writers.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::QuorumError;

/// Counts distinct task reports per checkpoint until every writer has
/// reported.
///
/// An entry exists only while a checkpoint is incomplete; it is dropped on
/// the report that completes it. The quorum is not persisted: after a
/// restart writers replay their reports for in-flight checkpoints.
#[derive(Debug)]
pub struct TaskQuorum {
    total_tasks: u32,
    arrivals: HashMap<i64, HashSet<u32>>,
}

impl TaskQuorum {
    /// Create a quorum expecting `total_tasks` distinct writers.
    pub fn new(total_tasks: u32) -> Result<Self, QuorumError> {
        if total_tasks == 0 {
            return Err(QuorumError::ZeroTasks);
        }
        Ok(Self {
            total_tasks,
            arrivals: HashMap::new(),
        })
    }

    pub fn total_tasks(&self) -> u32 {
        self.total_tasks
    }

    /// Check that a report is consistent with this quorum without recording it.
    pub fn validate(&self, task_id: u32, number_of_tasks: u32) -> Result<(), QuorumError> {
        if number_of_tasks != self.total_tasks {
            return Err(QuorumError::TaskCountMismatch {
                expected: self.total_tasks,
                reported: number_of_tasks,
            });
        }
        if task_id >= self.total_tasks {
            return Err(QuorumError::TaskOutOfRange {
                task_id,
                total_tasks: self.total_tasks,
            });
        }
        Ok(())
    }

    /// Record a report. Returns true iff this call completed the checkpoint.
    ///
    /// Duplicate reports for the same `(checkpoint_id, task_id)` return false.
    pub fn add(&mut self, checkpoint_id: i64, task_id: u32) -> bool {
        let arrived = self.arrivals.entry(checkpoint_id).or_default();
        if !arrived.insert(task_id) {
            debug!(checkpoint_id, task_id, "Duplicate task report ignored");
            return false;
        }

        let count = arrived.len();
        if count < self.total_tasks as usize {
            debug!(
                checkpoint_id,
                task_id,
                arrived = count,
                total = self.total_tasks,
                "Task report recorded"
            );
            return false;
        }

        self.arrivals.remove(&checkpoint_id);
        true
    }

    /// Number of checkpoints still waiting for reports.
    pub fn pending_checkpoints(&self) -> usize {
        self.arrivals.len()
    }
}
