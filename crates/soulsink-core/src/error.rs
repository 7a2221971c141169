//! Common error types shared by the soulsink crates.
//!
//! Storage listing, configuration loading and metrics setup each get their
//! own error enum; the committer crate wraps them in its own taxonomy.

use std::path::PathBuf;

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur while listing partition directories.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// The directory to list does not exist.
    #[snafu(display("Directory does not exist: {path}"))]
    DirectoryMissing { path: String },

    /// The path exists but is not a directory.
    #[snafu(display("Not a directory: {path}"))]
    NotADirectory { path: String },

    /// IO error during a listing.
    #[snafu(display("IO error while listing {path}: {source}"))]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// A listed path does not lie under the backend's table location.
    #[snafu(display("Path {path} is outside storage location {location}"))]
    OutsideLocation { path: String, location: String },
}

impl StorageError {
    /// Check if this error means the listed directory is absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::DirectoryMissing { .. } => true,
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Table location path is empty.
    #[snafu(display("Table '{table}' has empty location_path"))]
    EmptyLocationPath { table: String },

    /// In-progress marker is empty, which would exclude every file.
    #[snafu(display("Table '{table}' has empty file_in_progress_part_prefix"))]
    EmptyInProgressPrefix { table: String },

    /// Table key cannot name a state file on its own.
    #[snafu(display("Table key '{table}' must not contain path separators"))]
    InvalidTableKey { table: String },

    /// Catalog path is empty.
    #[snafu(display("Catalog path cannot be empty"))]
    EmptyCatalogPath,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },

    /// Duplicate component keys found across config files.
    #[snafu(display("Duplicate component keys: {}", keys.join(", ")))]
    DuplicateComponents { keys: Vec<String> },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: PathBuf },

    /// Failed to read configuration directory.
    #[snafu(display("Failed to read directory {}", path.display()))]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Multiple configuration errors occurred.
    #[snafu(display("Multiple config errors:\n{}", errors.join("\n")))]
    MultipleErrors { errors: Vec<String> },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Metrics address could not be parsed.
    #[snafu(display("Failed to parse metrics address: {source}"))]
    AddressParse { source: std::net::AddrParseError },

    /// Metrics server already initialized (double-init attempted).
    #[snafu(display("Metrics server already initialized"))]
    AlreadyInitialized,

    /// Metrics server not initialized (controller accessed before init).
    #[snafu(display("Metrics server not initialized"))]
    NotInitialized,
}
