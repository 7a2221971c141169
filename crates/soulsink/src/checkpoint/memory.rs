//! In-process checkpoint state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::CheckpointedState;
use crate::error::StateError;

/// List state kept in memory.
///
/// Clones share the same storage, so a test (or an embedding host) can hand
/// one clone to an operator, drop the operator, and restore a new operator
/// from another clone.
#[derive(Debug)]
pub struct InMemoryState<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for InMemoryState<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for InMemoryState<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> InMemoryState<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T> CheckpointedState<T> for InMemoryState<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self) -> Result<Vec<T>, StateError> {
        Ok(self.items.lock().await.clone())
    }

    async fn store(&self, items: Vec<T>) -> Result<(), StateError> {
        *self.items.lock().await = items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_until_stored() {
        let state: InMemoryState<String> = InMemoryState::new();
        assert!(state.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let state = InMemoryState::<i32>::new();
        let other = state.clone();

        state.store(vec![1, 2]).await.unwrap();
        assert_eq!(other.load().await.unwrap(), vec![1, 2]);

        other.store(vec![3]).await.unwrap();
        assert_eq!(state.load().await.unwrap(), vec![3]);
    }
}
