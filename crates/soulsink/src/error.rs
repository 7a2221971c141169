//! Error types for the soulsink commit coordinator.

use snafu::prelude::*;

pub use soulsink_core::error::{ConfigError, MetricsError, StorageError};

/// Errors raised by a catalog backend.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CatalogError {
    /// No table is registered under the requested name.
    #[snafu(display("Table not found in catalog: {table_name}"))]
    TableNotFound { table_name: String },

    /// A table with the same name is already registered.
    #[snafu(display("Table already registered in catalog: {table_name}"))]
    TableExists { table_name: String },

    /// Failed to encode the catalog document.
    #[snafu(display("Failed to encode catalog document: {source}"))]
    CatalogEncode { source: serde_json::Error },

    /// Failed to decode the catalog document.
    #[snafu(display("Failed to decode catalog document {path}: {source}"))]
    CatalogDecode {
        path: String,
        source: serde_json::Error,
    },

    /// IO error reading or writing the catalog.
    #[snafu(display("Catalog IO error at {path}: {source}"))]
    CatalogIo {
        path: String,
        source: std::io::Error,
    },
}

/// Errors raised while loading or storing operator checkpoint state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StateError {
    /// Failed to encode state.
    #[snafu(display("Failed to encode checkpoint state: {source}"))]
    StateEncode { source: serde_json::Error },

    /// Failed to decode state.
    #[snafu(display("Failed to decode checkpoint state {path}: {source}"))]
    StateDecode {
        path: String,
        source: serde_json::Error,
    },

    /// IO error reading or writing state.
    #[snafu(display("Checkpoint state IO error at {path}: {source}"))]
    StateIo {
        path: String,
        source: std::io::Error,
    },
}

/// Inconsistent task reports.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum QuorumError {
    /// A writer reported a different parallelism than earlier writers.
    #[snafu(display(
        "Task count mismatch: quorum expects {expected} tasks, record reports {reported}"
    ))]
    TaskCountMismatch { expected: u32, reported: u32 },

    /// A task id outside `0..number_of_tasks`.
    #[snafu(display("Task id {task_id} out of range for {total_tasks} tasks"))]
    TaskOutOfRange { task_id: u32, total_tasks: u32 },

    /// A record declaring zero parallel writers.
    #[snafu(display("Number of tasks must be at least 1"))]
    ZeroTasks,
}

/// Top-level errors surfaced by the committer to its host.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CommitError {
    /// A lifecycle hook was called before `initialize`.
    #[snafu(display("Committer used before initialize"))]
    NotInitialized,

    /// `initialize` was called twice.
    #[snafu(display("Committer already initialized"))]
    AlreadyInitialized,

    /// Inconsistent task reports.
    #[snafu(display("Quorum inconsistency: {source}"))]
    Quorum { source: QuorumError },

    /// Table lookup or other catalog failure before Phase A.
    #[snafu(display("Catalog error: {source}"))]
    Catalog { source: CatalogError },

    /// Listing a partition directory failed.
    #[snafu(display("Failed to list partition {partition}: {source}"))]
    Listing {
        partition: String,
        source: StorageError,
    },

    /// Phase A rejected the append; partitions were returned to the trigger.
    #[snafu(display(
        "Catalog rejected append commit for table {table_name} at checkpoint {checkpoint_id} ({partitions} partitions)"
    ))]
    CommitRejected {
        table_name: String,
        checkpoint_id: i64,
        partitions: usize,
    },

    /// Phase A failed with an error rather than a rejection.
    #[snafu(display("Snapshot commit failed: {source}"))]
    SnapshotCommit { source: CatalogError },

    /// Phase B failed after Phase A advanced the snapshot chains.
    #[snafu(display("Manifest commit failed after snapshots were appended: {source}"))]
    Manifest { source: CatalogError },

    /// Loading or storing trigger state failed.
    #[snafu(display("Checkpoint state error: {source}"))]
    State { source: StateError },
}

impl CommitError {
    /// True when the table name was not known to the catalog.
    pub fn is_table_not_found(&self) -> bool {
        matches!(
            self,
            CommitError::Catalog {
                source: CatalogError::TableNotFound { .. }
            }
        )
    }
}

impl From<QuorumError> for CommitError {
    fn from(source: QuorumError) -> Self {
        CommitError::Quorum { source }
    }
}

impl From<StateError> for CommitError {
    fn from(source: StateError) -> Self {
        CommitError::State { source }
    }
}

/// Errors from the CLI runner.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Metrics setup error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },

    /// A committer failed.
    #[snafu(display("Table {table}: {source}"))]
    Commit { table: String, source: CommitError },

    /// Catalog setup failed.
    #[snafu(display("Catalog setup failed: {source}"))]
    CatalogSetup { source: CatalogError },

    /// The event stream could not be read.
    #[snafu(display("Failed to read events at line {line}: {source}"))]
    EventRead { line: usize, source: std::io::Error },

    /// An event line could not be parsed.
    #[snafu(display("Failed to parse event at line {line}: {source}"))]
    EventParse {
        line: usize,
        source: serde_json::Error,
    },

    /// A table's location has no usable listing backend.
    #[snafu(display("Table {table}: storage setup failed: {source}"))]
    StorageSetup { table: String, source: StorageError },

    /// Two table entries resolve to the same catalog table name.
    #[snafu(display("Catalog table '{table_name}' is configured more than once"))]
    DuplicateTableName { table_name: String },

    /// A record named a table with no configured committer.
    #[snafu(display("No table configured for record with table_name '{table_name}'"))]
    UnknownTable { table_name: String },
}

impl From<ConfigError> for RunError {
    fn from(source: ConfigError) -> Self {
        RunError::Config { source }
    }
}

impl From<MetricsError> for RunError {
    fn from(source: MetricsError) -> Self {
        RunError::Metrics { source }
    }
}
