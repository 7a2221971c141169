//! soulsink-core: shared components for the soulsink commit coordinator.
//!
//! - `storage/` - single-level directory listing over local disk and object stores
//! - `config/` - YAML loading with environment interpolation and multi-file merging
//! - `metrics/` - Prometheus recorder, HTTP endpoint and the `InternalEvent` pattern
//! - `error` - storage, config and metrics error types
//! - `tracing` - subscriber setup for binaries

pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod tracing;

pub use config::{ConfigArgs, ConfigPath, Mergeable, MetricsConfig, load_from_paths};
pub use error::{ConfigError, MetricsError, StorageError};
pub use crate::metrics::{
    DEFAULT_METRICS_ADDR, InternalEvent, MetricsController, init_global as init_metrics,
    init_test as init_metrics_test,
};
pub use storage::{
    FileEntry, ListDir, ListDirRef, LocalFileSystem, ObjectStoreListing, join_path,
    listing_for_location,
};
pub use crate::tracing::init_tracing;
