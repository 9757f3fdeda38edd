//! Checkpoint stores for `DistributorIndex` records.
//!
//! ```rust
//! use process_distributor::client::CheckpointStore;
//! use process_distributor::constants::{DISTRIBUTOR_INDEX, NOLEVEL};
//! use process_distributor::models::{DistributorIndex, ItemStatus};
//! use process_distributor::storage::InMemoryCheckpointStore;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryCheckpointStore::new();
//! let index = DistributorIndex::new(NOLEVEL, 4, ItemStatus::new("STEP"), "req-1", "step-1", vec![]);
//! store
//!     .persist_distributor_index(DISTRIBUTOR_INDEX, "op-1", &index)
//!     .await
//!     .unwrap();
//! let stored = store.get_distributor_index(DISTRIBUTOR_INDEX, "op-1").await.unwrap();
//! assert_eq!(stored, Some(index));
//! # });
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use super::write_atomic;
use crate::client::CheckpointStore;
use crate::error::StoreError;
use crate::models::DistributorIndex;

type CheckpointKey = (String, String);

/// Checkpoints kept in memory, with the full write history per operation
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    current: RwLock<HashMap<CheckpointKey, DistributorIndex>>,
    history: RwLock<HashMap<CheckpointKey, Vec<DistributorIndex>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a checkpoint without recording a write
    pub fn insert(&self, namespace: &str, operation_id: &str, index: DistributorIndex) {
        self.current
            .write()
            .insert((namespace.to_string(), operation_id.to_string()), index);
    }

    /// Every checkpoint persisted for the operation, oldest first
    pub fn writes(&self, namespace: &str, operation_id: &str) -> Vec<DistributorIndex> {
        self.history
            .read()
            .get(&(namespace.to_string(), operation_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get_distributor_index(
        &self,
        namespace: &str,
        operation_id: &str,
    ) -> Result<Option<DistributorIndex>, StoreError> {
        Ok(self
            .current
            .read()
            .get(&(namespace.to_string(), operation_id.to_string()))
            .cloned())
    }

    async fn persist_distributor_index(
        &self,
        namespace: &str,
        operation_id: &str,
        index: &DistributorIndex,
    ) -> Result<(), StoreError> {
        let key = (namespace.to_string(), operation_id.to_string());
        self.history
            .write()
            .entry(key.clone())
            .or_default()
            .push(index.clone());
        self.current.write().insert(key, index.clone());
        Ok(())
    }
}

/// Checkpoints stored as `<dir>/<namespace>/<operation_id>.json`
#[derive(Debug, Clone)]
pub struct FilesystemCheckpointStore {
    dir: PathBuf,
}

impl FilesystemCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, namespace: &str, operation_id: &str) -> PathBuf {
        self.dir
            .join(namespace)
            .join(format!("{operation_id}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FilesystemCheckpointStore {
    async fn get_distributor_index(
        &self,
        namespace: &str,
        operation_id: &str,
    ) -> Result<Option<DistributorIndex>, StoreError> {
        let path = self.path(namespace, operation_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn persist_distributor_index(
        &self,
        namespace: &str,
        operation_id: &str,
        index: &DistributorIndex,
    ) -> Result<(), StoreError> {
        let path = self.path(namespace, operation_id);
        let json = serde_json::to_vec_pretty(index)?;
        write_atomic(&path, &json).await?;
        debug!(
            operation_id = %operation_id,
            offset = index.offset,
            path = %path.display(),
            "Checkpoint written"
        );
        Ok(())
    }
}
