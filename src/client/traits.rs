//! # Collaborator Traits
//!
//! Contracts of the systems the distributor consumes but does not own: the
//! remote worker transport, the element workspace, the checkpoint store, the
//! process metadata store and the durable worker registry.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

use crate::error::{SourceError, StoreError, WorkerClientError};
use crate::models::{DescriptionStep, DistributorIndex, ItemStatus, WorkerBean};

/// Lazily read lines of a workspace object
pub type LineStream = BoxStream<'static, Result<String, SourceError>>;

/// Remote execution interface of one worker
///
/// The transport is opaque to the distributor; only the call/response
/// contract matters. Implementations must be cheap to share across tasks.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Run the step on the listed elements and return the worker's status
    ///
    /// # Returns
    ///
    /// * `Ok(ItemStatus)` - the worker answered, whatever the business outcome
    /// * `Err(WorkerClientError::NotFound | Server)` - the worker may be down
    /// * `Err(WorkerClientError::Client)` - the request itself was rejected
    async fn submit_step(
        &self,
        description: &DescriptionStep,
    ) -> Result<ItemStatus, WorkerClientError>;

    /// Health endpoint of the worker
    async fn check_status(&self) -> Result<(), WorkerClientError>;
}

/// Builds the client used to reach a registered worker
pub trait WorkerClientFactory: Send + Sync {
    fn client_for(&self, worker: &WorkerBean) -> Arc<dyn WorkerClient>;
}

/// Workspace holding the element listings of an operation
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Names of the entries under `path` in `container`, sorted
    async fn list_directory(&self, container: &str, path: &str)
        -> Result<Vec<String>, SourceError>;

    /// Whole content of one object
    async fn read_blob(&self, container: &str, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Line cursor over one object; lines are pulled on demand
    async fn read_lines(&self, container: &str, path: &str) -> Result<LineStream, SourceError>;
}

/// Durable store of `DistributorIndex` checkpoints, keyed by operation id
///
/// Writes for one operation are sequential, so last-write-wins is enough.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_distributor_index(
        &self,
        namespace: &str,
        operation_id: &str,
    ) -> Result<Option<DistributorIndex>, StoreError>;

    async fn persist_distributor_index(
        &self,
        namespace: &str,
        operation_id: &str,
        index: &DistributorIndex,
    ) -> Result<(), StoreError>;
}

/// External progress counters of a running process
#[async_trait]
pub trait ProcessMetadataStore: Send + Sync {
    /// Add `delta` elements to the step's total, or to its processed count
    /// when `completed` is set
    async fn update_step(
        &self,
        operation_id: &str,
        step_id: &str,
        delta: usize,
        completed: bool,
        tenant_id: i32,
    ) -> Result<(), StoreError>;
}

/// Durable backing of the worker registry
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn load(&self) -> Result<Vec<WorkerBean>, StoreError>;

    /// Replace the stored worker list
    async fn save(&self, workers: &[WorkerBean]) -> Result<(), StoreError>;
}
