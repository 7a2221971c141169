//! Lifecycle hooks a streaming host calls on a sink operator.
//!
//! The host delivers records, watermark ticks and checkpoint barriers in
//! order, never concurrently. [`HostEvent`] is the serialized form of that
//! stream and [`drive`] replays it against any [`SinkOperator`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checkpoint::TriggerStateRef;
use crate::committer::{CommitSummary, Committer};
use crate::error::CommitError;
use crate::model::DataInfo;

/// Hooks invoked by the host runtime.
#[async_trait]
pub trait SinkOperator: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once before any other hook.
    async fn init(&mut self, is_restored: bool) -> Result<(), Self::Error>;

    async fn on_record(&mut self, record: DataInfo) -> Result<(), Self::Error>;

    /// Persist operator state for `checkpoint_id`.
    async fn on_checkpoint_snapshot(&mut self, checkpoint_id: i64) -> Result<(), Self::Error>;

    async fn on_watermark(&mut self, timestamp: i64) -> Result<(), Self::Error>;
}

/// One entry of a host event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HostEvent {
    Record(DataInfo),
    Watermark { timestamp: i64 },
    Checkpoint { checkpoint_id: i64 },
}

/// Deliver one event to the matching hook.
pub async fn dispatch<O>(operator: &mut O, event: HostEvent) -> Result<(), O::Error>
where
    O: SinkOperator + ?Sized,
{
    match event {
        HostEvent::Record(record) => operator.on_record(record).await,
        HostEvent::Watermark { timestamp } => operator.on_watermark(timestamp).await,
        HostEvent::Checkpoint { checkpoint_id } => {
            operator.on_checkpoint_snapshot(checkpoint_id).await
        }
    }
}

/// Deliver events in order, stopping at the first error.
///
/// Returns the number of events delivered.
pub async fn drive<O, I>(operator: &mut O, events: I) -> Result<usize, O::Error>
where
    O: SinkOperator + ?Sized,
    I: IntoIterator<Item = HostEvent>,
{
    let mut delivered = 0;
    for event in events {
        dispatch(operator, event).await?;
        delivered += 1;
    }
    debug!(delivered, "Event stream drained");
    Ok(delivered)
}

/// A [`Committer`] bound to the state store it checkpoints into.
pub struct CommitOperator {
    committer: Committer,
    state: TriggerStateRef,
    last_commit: Option<CommitSummary>,
    commits: usize,
}

impl std::fmt::Debug for CommitOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitOperator")
            .field("committer", &self.committer)
            .field("last_commit", &self.last_commit)
            .field("commits", &self.commits)
            .finish()
    }
}

impl CommitOperator {
    pub fn new(committer: Committer, state: TriggerStateRef) -> Self {
        Self {
            committer,
            state,
            last_commit: None,
            commits: 0,
        }
    }

    pub fn committer(&self) -> &Committer {
        &self.committer
    }

    /// Summary of the most recent commit that reached the catalog.
    pub fn last_commit(&self) -> Option<&CommitSummary> {
        self.last_commit.as_ref()
    }

    /// Number of commits that reached the catalog.
    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

#[async_trait]
impl SinkOperator for CommitOperator {
    type Error = CommitError;

    async fn init(&mut self, is_restored: bool) -> Result<(), CommitError> {
        self.committer
            .initialize(is_restored, self.state.clone())
            .await
    }

    async fn on_record(&mut self, record: DataInfo) -> Result<(), CommitError> {
        if let Some(summary) = self.committer.process_element(record).await? {
            self.last_commit = Some(summary);
            self.commits += 1;
        }
        Ok(())
    }

    async fn on_checkpoint_snapshot(&mut self, checkpoint_id: i64) -> Result<(), CommitError> {
        self.committer.snapshot_state(checkpoint_id).await
    }

    async fn on_watermark(&mut self, timestamp: i64) -> Result<(), CommitError> {
        self.committer.on_watermark(timestamp);
        Ok(())
    }
}
