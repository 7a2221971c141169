//! Tracks partitions awaiting commit and persists them across failover.

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::checkpoint::{TriggerState, TriggerStateRef};
use crate::error::StateError;

/// Names the partitions a checkpoint commit must register.
///
/// Partitions are kept in one flat, insertion-ordered set. Every drain
/// consumes the whole set, so the checkpoint at which a partition was first
/// observed is never needed: anything pending when checkpoint `c` completes
/// was observed at or before `c`.
pub struct PartitionTrigger {
    pending: IndexSet<String>,
    state: TriggerStateRef,
    /// Watermark recovered from the restored snapshot, if any.
    restored_watermark: Option<i64>,
}

impl std::fmt::Debug for PartitionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionTrigger")
            .field("pending", &self.pending)
            .field("restored_watermark", &self.restored_watermark)
            .finish()
    }
}

impl PartitionTrigger {
    /// Create a trigger backed by `state`.
    ///
    /// With `is_restored` the pending set is rehydrated from the most recent
    /// stored snapshot; otherwise the trigger starts empty and any state left
    /// in the store is ignored until the next snapshot overwrites it.
    pub async fn create(is_restored: bool, state: TriggerStateRef) -> Result<Self, StateError> {
        let mut trigger = Self {
            pending: IndexSet::new(),
            state,
            restored_watermark: None,
        };

        if is_restored {
            if let Some(snapshot) = trigger.state.load().await?.pop() {
                info!(
                    checkpoint_id = snapshot.checkpoint_id,
                    pending = snapshot.pending.len(),
                    "Restored partition trigger"
                );
                trigger.pending.extend(snapshot.pending);
                trigger.restored_watermark = Some(snapshot.watermark);
            }
        }

        Ok(trigger)
    }

    /// Mark a partition as pending. Returns false if it already was.
    pub fn add_partition(&mut self, partition: impl Into<String>) -> bool {
        let partition = partition.into();
        let added = self.pending.insert(partition);
        if added {
            debug!(pending = self.pending.len(), "Partition added to trigger");
        }
        added
    }

    /// Drain every partition pending at or before `checkpoint_id`.
    pub fn committable_partitions(&mut self, checkpoint_id: i64) -> Vec<String> {
        let drained: Vec<String> = self.pending.drain(..).collect();
        debug!(
            checkpoint_id,
            count = drained.len(),
            "Drained committable partitions"
        );
        drained
    }

    /// Drain everything at end of input.
    pub fn end_input(&mut self) -> Vec<String> {
        let drained: Vec<String> = self.pending.drain(..).collect();
        debug!(count = drained.len(), "Drained partitions at end of input");
        drained
    }

    /// Put back partitions whose commit never reached the catalog.
    ///
    /// They go in front of anything observed since the drain, preserving
    /// observation order.
    pub fn return_partitions(&mut self, partitions: Vec<String>) {
        if partitions.is_empty() {
            return;
        }
        let mut restored: IndexSet<String> = partitions.into_iter().collect();
        restored.extend(self.pending.drain(..));
        self.pending = restored;
        debug!(pending = self.pending.len(), "Returned partitions to trigger");
    }

    /// Persist the pending set for checkpoint `checkpoint_id`.
    pub async fn snapshot_state(&self, checkpoint_id: i64, watermark: i64) -> Result<(), StateError> {
        let snapshot = TriggerState::new(checkpoint_id, watermark, self.pending_partitions());
        self.state.store(vec![snapshot]).await?;
        debug!(
            checkpoint_id,
            pending = self.pending.len(),
            "Snapshotted partition trigger"
        );
        Ok(())
    }

    /// Pending partitions in observation order.
    pub fn pending_partitions(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, partition: &str) -> bool {
        self.pending.contains(partition)
    }

    pub fn restored_watermark(&self) -> Option<i64> {
        self.restored_watermark
    }
}
