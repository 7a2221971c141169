//! Soulsink: checkpoint-aligned commit coordinator for lakehouse streaming sinks.
//!
//! Writers flush files into partition directories and report each
//! checkpoint they finished. Once every parallel writer has reported, the
//! [`Committer`] registers the newly visible files with the metadata
//! catalog as one append snapshot per partition.
//!
//! - `quorum` - per-checkpoint writer arrival tracking
//! - `trigger` - pending partitions, persisted across failover
//! - `scanner` - finalized-file discovery in a partition directory
//! - `committer` - the two-phase catalog commit
//! - `catalog` / `checkpoint` - catalog and state backends
//! - `operator` / `runner` - host lifecycle hooks and the CLI host

pub mod catalog;
pub mod checkpoint;
pub mod committer;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod operator;
pub mod quorum;
pub mod runner;
pub mod scanner;
pub mod trigger;

pub use catalog::{CatalogClient, CatalogClientRef, InMemoryCatalog, JsonFileCatalog};
pub use checkpoint::{CheckpointedState, InMemoryState, JsonFileState, TriggerState};
pub use committer::{CommitSummary, Committer};
pub use config::{Config, SinkOptions, TableConfig};
pub use error::{CommitError, RunError};
pub use model::{DataCommitInfo, DataInfo, END_OF_INPUT, FileOp, MetaInfo, PartitionInfo, TableInfo};
pub use operator::{CommitOperator, HostEvent, SinkOperator, drive};
pub use quorum::TaskQuorum;
pub use runner::{CliArgs, ReplaySummary, run};
pub use scanner::FileScanner;
pub use trigger::PartitionTrigger;

// Re-export from soulsink-core
pub use soulsink_core::{
    ListDir, ListDirRef, LocalFileSystem, ObjectStoreListing, init_metrics, init_tracing,
};
