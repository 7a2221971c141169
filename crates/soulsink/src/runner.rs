//! Command-line host: replays an event stream against configured tables.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use indexmap::IndexMap;
use snafu::prelude::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use soulsink_core::storage::listing_for_location;

use crate::catalog::{CatalogClientRef, JsonFileCatalog};
use crate::checkpoint::{JsonFileState, TriggerState};
use crate::committer::Committer;
use crate::config::{Config, ConfigArgs, TableKey};
use crate::error::{
    CatalogSetupSnafu, CommitSnafu, EventParseSnafu, EventReadSnafu, RunError, StorageSetupSnafu,
};
use crate::model::{DataInfo, TableInfo};
use crate::operator::{CommitOperator, HostEvent, SinkOperator, dispatch};

/// Command-line arguments for the `soulsink` binary.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "soulsink", version, about = "Checkpoint-aligned lakehouse commit coordinator")]
pub struct CliArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Newline-delimited JSON host events; stdin when omitted
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Ignore stored trigger state and start every table empty
    #[arg(long)]
    pub fresh: bool,
}

/// What a replay did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub commits: usize,
}

struct RoutedTable {
    key: TableKey,
    operator: CommitOperator,
    /// Whether stored state existed when the router was built.
    has_state: bool,
}

/// Routes records to the committer of their table and broadcasts
/// watermarks and checkpoints to all of them.
pub struct TableRouter {
    /// Keyed by catalog table name.
    tables: IndexMap<String, RoutedTable>,
}

impl std::fmt::Debug for TableRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRouter")
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TableRouter {
    /// One committer per configured table over a shared JSON catalog.
    ///
    /// Tables with `create_if_missing` are registered in the catalog first.
    pub async fn from_config(config: &Config) -> Result<Self, RunError> {
        let catalog = Arc::new(JsonFileCatalog::new(&config.catalog.path));
        let mut tables = IndexMap::with_capacity(config.table_count());

        for (key, table_config) in config.tables() {
            let table_name = table_config.resolved_table_name(key);
            ensure!(
                !tables.contains_key(&table_name),
                crate::error::DuplicateTableNameSnafu {
                    table_name: table_name.clone()
                }
            );

            if table_config.create_if_missing {
                let registered = catalog
                    .ensure_table(TableInfo::new(
                        table_name.clone(),
                        table_config.options.location_path.clone(),
                    ))
                    .await
                    .context(CatalogSetupSnafu)?;
                debug!(table = %key, table_id = %registered.table_id, "Catalog table ready");
            }

            let listing = listing_for_location(
                &table_config.options.location_path,
                table_config.storage_options.clone(),
            )
            .context(StorageSetupSnafu {
                table: key.to_string(),
            })?;

            let state = JsonFileState::<TriggerState>::new(config.state.state_path(key));
            let has_state = state.exists();

            let catalog_ref: CatalogClientRef = catalog.clone();
            let committer = Committer::new(
                key.id(),
                table_config.options.clone(),
                catalog_ref,
                listing,
            );
            tables.insert(
                table_name,
                RoutedTable {
                    key: key.clone(),
                    operator: CommitOperator::new(committer, Arc::new(state)),
                    has_state,
                },
            );
        }

        Ok(Self { tables })
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn operator(&self, table_name: &str) -> Option<&CommitOperator> {
        self.tables.get(table_name).map(|t| &t.operator)
    }

    /// Commits that reached the catalog across all tables.
    pub fn commit_count(&self) -> usize {
        self.tables.values().map(|t| t.operator.commit_count()).sum()
    }
}

#[async_trait]
impl SinkOperator for TableRouter {
    type Error = RunError;

    /// Restores only tables that have stored state.
    async fn init(&mut self, is_restored: bool) -> Result<(), RunError> {
        for table in self.tables.values_mut() {
            let restore = is_restored && table.has_state;
            table.operator.init(restore).await.context(CommitSnafu {
                table: table.key.to_string(),
            })?;
        }
        Ok(())
    }

    async fn on_record(&mut self, record: DataInfo) -> Result<(), RunError> {
        let table = self
            .tables
            .get_mut(&record.table_name)
            .context(crate::error::UnknownTableSnafu {
                table_name: record.table_name.clone(),
            })?;
        table.operator.on_record(record).await.context(CommitSnafu {
            table: table.key.to_string(),
        })
    }

    async fn on_checkpoint_snapshot(&mut self, checkpoint_id: i64) -> Result<(), RunError> {
        for table in self.tables.values_mut() {
            table
                .operator
                .on_checkpoint_snapshot(checkpoint_id)
                .await
                .context(CommitSnafu {
                    table: table.key.to_string(),
                })?;
        }
        Ok(())
    }

    async fn on_watermark(&mut self, timestamp: i64) -> Result<(), RunError> {
        for table in self.tables.values_mut() {
            table
                .operator
                .on_watermark(timestamp)
                .await
                .context(CommitSnafu {
                    table: table.key.to_string(),
                })?;
        }
        Ok(())
    }
}

/// Read newline-delimited [`HostEvent`]s and deliver each to `router`.
///
/// Blank lines are skipped. Stops at the first unreadable, unparsable or
/// failing event.
pub async fn replay<R>(router: &mut TableRouter, reader: R) -> Result<ReplaySummary, RunError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no: usize = 0;
    let mut events = 0;
    let commits_before = router.commit_count();

    while let Some(line) = lines.next_line().await.context(EventReadSnafu {
        line: line_no + 1,
    })? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: HostEvent =
            serde_json::from_str(&line).context(EventParseSnafu { line: line_no })?;
        dispatch(router, event).await?;
        events += 1;
    }

    Ok(ReplaySummary {
        events,
        commits: router.commit_count() - commits_before,
    })
}

/// Load configuration, start metrics and replay the event stream.
pub async fn run(args: CliArgs) -> Result<ReplaySummary, RunError> {
    let config = Config::from_paths(&args.config.config_paths())?;
    soulsink_core::init_metrics(&config.metrics.address)?;
    run_with_config(&config, args.events, !args.fresh).await
}

/// Replay against an already loaded configuration, without metrics setup.
pub async fn run_with_config(
    config: &Config,
    events: Option<PathBuf>,
    restore: bool,
) -> Result<ReplaySummary, RunError> {
    let mut router = TableRouter::from_config(config).await?;
    router.init(restore).await?;
    info!(tables = config.table_count(), "Committers initialized");

    let summary = match events {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .context(EventReadSnafu { line: 0usize })?;
            replay(&mut router, BufReader::new(file)).await?
        }
        None => replay(&mut router, BufReader::new(tokio::io::stdin())).await?,
    };

    info!(
        events = summary.events,
        commits = summary.commits,
        "Event stream finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SinkOptions, TableConfig};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, tables: &[(&str, &str)]) -> Config {
        let mut config = Config::default();
        config.catalog.path = dir.path().join("catalog.json");
        config.state.dir = dir.path().join("state");
        for (key, location) in tables {
            config.tables.insert(
                TableKey::new(*key),
                TableConfig {
                    options: SinkOptions::new(*location),
                    table_name: None,
                    create_if_missing: true,
                    storage_options: HashMap::new(),
                },
            );
        }
        config
    }

    #[tokio::test]
    async fn test_replay_commits_and_checkpoints() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("events");
        std::fs::create_dir_all(location.join("dt=1")).unwrap();
        std::fs::write(location.join("dt=1").join("t0-part-0"), b"abc").unwrap();
        let config = config_for(&dir, &[("events", location.to_str().unwrap())]);

        let mut router = TableRouter::from_config(&config).await.unwrap();
        router.init(true).await.unwrap();

        let stream = concat!(
            r#"{"kind":"watermark","timestamp":10}"#,
            "\n\n",
            r#"{"kind":"record","checkpoint_id":1,"task_id":0,"number_of_tasks":1,"table_name":"events","task_data_path":"t0-","partitions":["dt=1"]}"#,
            "\n",
            r#"{"kind":"checkpoint","checkpoint_id":1}"#,
            "\n",
        );
        let summary = replay(&mut router, stream.as_bytes()).await.unwrap();
        assert_eq!(summary, ReplaySummary { events: 3, commits: 1 });

        let last = router.operator("events").unwrap().last_commit().unwrap();
        assert_eq!(last.files, 1);
        assert!(config.state.state_path(&TableKey::new("events")).exists());
    }

    #[tokio::test]
    async fn test_unknown_table_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, &[("events", "/nowhere")]);
        let mut router = TableRouter::from_config(&config).await.unwrap();
        router.init(false).await.unwrap();

        let stream = r#"{"kind":"record","checkpoint_id":1,"task_id":0,"number_of_tasks":1,"table_name":"other","task_data_path":"t0-"}"#;
        let err = replay(&mut router, stream.as_bytes()).await.unwrap_err();
        assert!(matches!(err, RunError::UnknownTable { ref table_name } if table_name == "other"));
    }

    #[tokio::test]
    async fn test_bad_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, &[("events", "/nowhere")]);
        let mut router = TableRouter::from_config(&config).await.unwrap();
        router.init(false).await.unwrap();

        let stream = "{\"kind\":\"watermark\",\"timestamp\":1}\nnot json\n";
        let err = replay(&mut router, stream.as_bytes()).await.unwrap_err();
        assert!(matches!(err, RunError::EventParse { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_duplicate_table_names_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(&dir, &[("a", "/a"), ("b", "/b")]);
        config.tables[1].table_name = Some("a".to_string());
        let err = TableRouter::from_config(&config).await.unwrap_err();
        assert!(matches!(err, RunError::DuplicateTableName { .. }));
    }
}
