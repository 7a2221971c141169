//! Checkpoint state persisted as a JSON file.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::prelude::*;
use tracing::debug;

use super::CheckpointedState;
use crate::emit;
use crate::error::{StateDecodeSnafu, StateEncodeSnafu, StateError, StateIoSnafu};
use crate::metrics::events::CheckpointStateSize;

/// List state stored as one JSON array in a file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-store leaves the previous state intact.
#[derive(Debug)]
pub struct JsonFileState<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileState<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a previous `store` left state behind.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl<T> CheckpointedState<T> for JsonFileState<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self) -> Result<Vec<T>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StateError::StateIo {
                    path: self.display(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).context(StateDecodeSnafu {
            path: self.display(),
        })
    }

    async fn store(&self, items: Vec<T>) -> Result<(), StateError> {
        let bytes = serde_json::to_vec_pretty(&items).context(StateEncodeSnafu)?;
        emit!(CheckpointStateSize { bytes: bytes.len() });

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(StateIoSnafu {
                    path: parent.display().to_string(),
                })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.context(StateIoSnafu {
            path: tmp.display().to_string(),
        })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context(StateIoSnafu {
                path: self.display(),
            })?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Stored checkpoint state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::TriggerState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let state: JsonFileState<TriggerState> =
            JsonFileState::new(temp_dir.path().join("trigger.json"));
        assert!(!state.exists());
        assert!(state.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_then_load_from_new_handle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("events.json");

        let state: JsonFileState<TriggerState> = JsonFileState::new(&path);
        state
            .store(vec![TriggerState::new(4, -1, vec!["a".into(), "b".into()])])
            .await
            .unwrap();

        let reopened: JsonFileState<TriggerState> = JsonFileState::new(&path);
        assert!(reopened.exists());
        let loaded = reopened.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].checkpoint_id, 4);
        assert_eq!(loaded[0].pending, vec!["a", "b"]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trigger.json");
        std::fs::write(&path, b"{not json").unwrap();

        let state: JsonFileState<TriggerState> = JsonFileState::new(&path);
        let err = state.load().await.unwrap_err();
        assert!(matches!(err, StateError::StateDecode { .. }));
    }
}
