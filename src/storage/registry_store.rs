//! Durable backing of the worker registry.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

use super::write_atomic;
use crate::client::RegistryStore;
use crate::error::StoreError;
use crate::models::WorkerBean;

/// Worker list serialized as a JSON array in one file
#[derive(Debug, Clone)]
pub struct JsonFileRegistryStore {
    path: PathBuf,
}

impl JsonFileRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistryStore for JsonFileRegistryStore {
    async fn load(&self) -> Result<Vec<WorkerBean>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, workers: &[WorkerBean]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(workers)?;
        write_atomic(&self.path, &json).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRegistryStore {
    workers: RwLock<Vec<WorkerBean>>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(workers: Vec<WorkerBean>) -> Self {
        Self {
            workers: RwLock::new(workers),
        }
    }

    pub fn workers(&self) -> Vec<WorkerBean> {
        self.workers.read().clone()
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn load(&self) -> Result<Vec<WorkerBean>, StoreError> {
        Ok(self.workers())
    }

    async fn save(&self, workers: &[WorkerBean]) -> Result<(), StoreError> {
        *self.workers.write() = workers.to_vec();
        Ok(())
    }
}
