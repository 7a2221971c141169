//! Operator-managed checkpoint state.
//!
//! The host runtime owns durability: the committer asks a
//! [`CheckpointedState`] to `store` its list state while a checkpoint is
//! being taken and to `load` it when the operator is restored. Nothing else
//! about the host is visible to the committer.

mod file;
mod memory;

pub use file::JsonFileState;
pub use memory::InMemoryState;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// List state that survives operator failover.
///
/// `store` replaces the whole list atomically; `load` returns the list from
/// the most recent completed `store`, or an empty list if there was none.
#[async_trait]
pub trait CheckpointedState<T: Send + 'static>: Send + Sync {
    async fn load(&self) -> Result<Vec<T>, StateError>;

    async fn store(&self, items: Vec<T>) -> Result<(), StateError>;
}

/// Shared handle to the trigger's checkpointed state.
pub type TriggerStateRef = Arc<dyn CheckpointedState<TriggerState>>;

fn default_schema_version() -> u32 {
    1
}

/// Snapshot of a partition trigger taken at a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    /// Schema version for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Checkpoint the snapshot was taken for.
    pub checkpoint_id: i64,
    /// Operator watermark at snapshot time. Informational only.
    pub watermark: i64,
    /// Partitions not yet committed, in observation order.
    pub pending: Vec<String>,
}

impl TriggerState {
    pub fn new(checkpoint_id: i64, watermark: i64, pending: Vec<String>) -> Self {
        Self {
            schema_version: default_schema_version(),
            checkpoint_id,
            watermark,
            pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_state_json_shape() {
        let state = TriggerState::new(7, 1_700_000_000_000, vec!["dt=1".to_string()]);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["checkpoint_id"], 7);
        assert_eq!(json["pending"][0], "dt=1");
    }

    #[test]
    fn test_trigger_state_schema_version_defaults() {
        let json = r#"{"checkpoint_id":3,"watermark":-1,"pending":[]}"#;
        let state: TriggerState = serde_json::from_str(json).unwrap();
        assert_eq!(state.schema_version, 1);
        assert_eq!(state.checkpoint_id, 3);
    }
}
