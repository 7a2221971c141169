//! Configuration for the soulsink commit coordinator.

mod table_key;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use soulsink_core::config::{
    ConfigArgs, ConfigPath, InterpolationResult, Mergeable, MetricsConfig, interpolate,
    load_from_paths,
};
pub use table_key::TableKey;

use crate::error::ConfigError;
use crate::scanner::DEFAULT_IN_PROGRESS_MARKER;

/// The options a committer recognizes for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkOptions {
    /// Table root directory; partition directories live directly under it.
    pub location_path: String,
    /// Comma-separated column list stamped into every file operation.
    #[serde(default)]
    pub file_exist_column: String,
    /// Substring marking files their writer has not closed yet.
    #[serde(default = "default_in_progress_prefix")]
    pub file_in_progress_part_prefix: String,
}

impl SinkOptions {
    pub fn new(location_path: impl Into<String>) -> Self {
        Self {
            location_path: location_path.into(),
            file_exist_column: String::new(),
            file_in_progress_part_prefix: default_in_progress_prefix(),
        }
    }

    pub fn with_exist_columns(mut self, columns: impl Into<String>) -> Self {
        self.file_exist_column = columns.into();
        self
    }

    pub fn with_in_progress_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_in_progress_part_prefix = prefix.into();
        self
    }

    pub fn validate(&self, table: &str) -> Result<(), ConfigError> {
        if self.location_path.trim().is_empty() {
            return Err(ConfigError::EmptyLocationPath {
                table: table.to_string(),
            });
        }
        if self.file_in_progress_part_prefix.is_empty() {
            return Err(ConfigError::EmptyInProgressPrefix {
                table: table.to_string(),
            });
        }
        Ok(())
    }
}

fn default_in_progress_prefix() -> String {
    DEFAULT_IN_PROGRESS_MARKER.to_string()
}

/// Configuration for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(flatten)]
    pub options: SinkOptions,
    /// Catalog table name; defaults to the table key.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Register the table in the catalog on startup if it is missing.
    #[serde(default)]
    pub create_if_missing: bool,
    /// Options for object store locations (credentials, region, endpoint).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

impl TableConfig {
    /// The catalog name records for this table must carry.
    pub fn resolved_table_name(&self, key: &TableKey) -> String {
        self.table_name
            .clone()
            .unwrap_or_else(|| key.id().to_string())
    }
}

/// Location of the JSON catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("soulsink-catalog.json")
}

/// Directory holding one trigger state file per table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

impl StateConfig {
    pub fn state_path(&self, key: &TableKey) -> PathBuf {
        self.dir.join(key.state_file_name())
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("soulsink-state")
}

/// Main configuration.
///
/// # Example
///
/// ```yaml
/// tables:
///   events:
///     location_path: /warehouse/events
///     file_exist_column: "id,ts,payload"
///     create_if_missing: true
///   users:
///     location_path: ${WAREHOUSE}/users
///     table_name: dim_users
///
/// catalog:
///   path: /var/lib/soulsink/catalog.json
///
/// state:
///   dir: /var/lib/soulsink/state
///
/// metrics:
///   address: "0.0.0.0:9090"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tables: IndexMap<TableKey, TableConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Mergeable for Config {
    type Key = TableKey;
    type Component = TableConfig;

    fn components_mut(&mut self) -> &mut IndexMap<Self::Key, Self::Component> {
        &mut self.tables
    }

    fn merge_settings(&mut self, other: &Self) {
        if other.catalog != CatalogConfig::default() {
            self.catalog = other.catalog.clone();
        }
        if other.state != StateConfig::default() {
            self.state = other.state.clone();
        }
        self.metrics.merge_from(&other.metrics);
    }

    fn parse_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|source| ConfigError::YamlParse { source })
    }
}

impl Config {
    /// Load, merge and validate configuration from files and directories.
    pub fn from_paths(paths: &[ConfigPath]) -> Result<Self, ConfigError> {
        let config: Self = load_from_paths(paths)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile { source })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        let config = Self::parse_yaml(&result.text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every table and the catalog location.
    ///
    /// All table errors are collected before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCatalogPath);
        }

        let mut errors: Vec<ConfigError> = self
            .tables
            .iter()
            .filter_map(|(key, table)| {
                if key.has_path_separator() {
                    return Some(ConfigError::InvalidTableKey {
                        table: key.id().to_string(),
                    });
                }
                table.options.validate(key.id()).err()
            })
            .collect();

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleErrors {
                errors: errors.iter().map(|e| e.to_string()).collect(),
            }),
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&TableKey, &TableConfig)> {
        self.tables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal() {
        let config = Config::parse(
            r#"
tables:
  events:
    location_path: /warehouse/events
"#,
        )
        .unwrap();

        let (key, table) = config.tables().next().unwrap();
        assert_eq!(key.id(), "events");
        assert_eq!(table.options.location_path, "/warehouse/events");
        assert_eq!(table.options.file_exist_column, "");
        assert_eq!(table.options.file_in_progress_part_prefix, ".inprogress");
        assert_eq!(table.resolved_table_name(key), "events");
        assert!(!table.create_if_missing);
        assert_eq!(config.catalog, CatalogConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
tables:
  users:
    location_path: /warehouse/users
    file_exist_column: "id,name"
    file_in_progress_part_prefix: "_tmp"
    table_name: dim_users
    create_if_missing: true
    storage_options:
      region: eu-west-1
catalog:
  path: /data/catalog.json
state:
  dir: /data/state
metrics:
  address: "127.0.0.1:9999"
"#,
        )
        .unwrap();

        let key = TableKey::new("users");
        let table = &config.tables[&key];
        assert_eq!(table.options.file_exist_column, "id,name");
        assert_eq!(table.options.file_in_progress_part_prefix, "_tmp");
        assert_eq!(table.resolved_table_name(&key), "dim_users");
        assert!(table.create_if_missing);
        assert_eq!(table.storage_options["region"], "eu-west-1");
        assert_eq!(config.catalog.path, PathBuf::from("/data/catalog.json"));
        assert_eq!(
            config.state.state_path(&key),
            PathBuf::from("/data/state/users.json")
        );
        assert_eq!(config.metrics.address, "127.0.0.1:9999");
    }

    #[test]
    fn test_empty_location_path_rejected() {
        let err = Config::parse(
            r#"
tables:
  events:
    location_path: ""
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("events"));
    }

    #[test]
    fn test_table_key_with_separator_rejected() {
        let err = Config::parse(
            r#"
tables:
  "db/events":
    location_path: /warehouse/a
  db_events:
    location_path: /warehouse/b
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTableKey { ref table } if table == "db/events"));
    }

    #[test]
    fn test_empty_in_progress_prefix_rejected() {
        let options = SinkOptions::new("/t").with_in_progress_prefix("");
        assert!(matches!(
            options.validate("t").unwrap_err(),
            ConfigError::EmptyInProgressPrefix { .. }
        ));
    }

    #[test]
    fn test_env_interpolation() {
        // SAFETY: test-local variable name.
        unsafe { std::env::set_var("SOULSINK_TEST_WAREHOUSE", "/mnt/wh") };
        let config = Config::parse(
            r#"
tables:
  events:
    location_path: ${SOULSINK_TEST_WAREHOUSE}/events
"#,
        )
        .unwrap();
        assert_eq!(
            config.tables[&TableKey::new("events")].options.location_path,
            "/mnt/wh/events"
        );
    }

    #[test]
    fn test_from_paths_merges_and_detects_duplicates() {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(body.as_bytes()).unwrap();
            path
        };
        let a = write("a.yaml", "tables:\n  events:\n    location_path: /e\n");
        let b = write(
            "b.yaml",
            "tables:\n  users:\n    location_path: /u\ncatalog:\n  path: /c.json\n",
        );

        let config = Config::from_paths(&[ConfigPath::file(&a), ConfigPath::file(&b)]).unwrap();
        assert_eq!(config.table_count(), 2);
        assert_eq!(config.catalog.path, PathBuf::from("/c.json"));

        let dup = write("c.yaml", "tables:\n  events:\n    location_path: /other\n");
        let err = Config::from_paths(&[ConfigPath::file(&a), ConfigPath::file(&dup)]).unwrap_err();
        assert!(err.to_string().contains("events"));
    }
}
