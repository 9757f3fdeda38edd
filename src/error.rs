//! Error types for the process distributor.
//!

use crate::models::PauseOrCancelAction;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributorError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("You run the wrong step {found}. The step from saved distributor index is: {expected}")]
    WrongStep { expected: String, found: String },
    #[error("DistributorIndex not found for the operation {0}")]
    CheckpointNotFound(String),
    #[error("Checkpoint store error: {0}")]
    Checkpoint(#[from] StoreError),
    #[error("Element source error: {0}")]
    Source(#[from] SourceError),
    #[error("Process metadata error: {0}")]
    Metadata(String),
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Internal error: {0}")]
    Internal(String),
    /// Control outcome, not a failure: unwinds `distribute` after a pause or cancel
    #[error("Distribution interrupted by {0}")]
    PauseCancel(PauseOrCancelAction),
}

impl From<serde_json::Error> for DistributorError {
    fn from(error: serde_json::Error) -> Self {
        DistributorError::Configuration(format!("JSON serialization error: {error}"))
    }
}

impl From<crate::config::ConfigurationError> for DistributorError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        DistributorError::Configuration(error.to_string())
    }
}

impl DistributorError {
    /// Configuration-class errors are never retried
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DistributorError::Configuration(_)
                | DistributorError::InvalidParameter(_)
                | DistributorError::WrongStep { .. }
                | DistributorError::Pool(PoolError::FamilyNotFound(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, DistributorError>;

/// Failures raised by a `WorkerTask` while calling its worker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerTaskError {
    /// Health check budget exhausted; the worker must be unregistered
    #[error("Worker {worker_id} is unreachable")]
    Unreachable { worker_id: String },
    #[error("Worker executor error: {0}")]
    Executor(String),
    #[error("Step already completed")]
    StepAlreadyCompleted,
}

/// Errors returned by the remote worker transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerClientError {
    #[error("Worker not found: {0}")]
    NotFound(String),
    #[error("Worker server error: {0}")]
    Server(String),
    #[error("Worker client error: {0}")]
    Client(String),
}

impl WorkerClientError {
    /// Errors that justify polling the worker health endpoint
    pub fn is_unavailability(&self) -> bool {
        matches!(self, WorkerClientError::NotFound(_) | WorkerClientError::Server(_))
    }
}

/// Worker registry and family pool errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("No worker family registered for {0}")]
    FamilyNotFound(String),
    #[error("Worker {worker_id} not found in the family {family}")]
    WorkerNotFound { family: String, worker_id: String },
    #[error("Worker family {0} has no registered worker")]
    NoWorkers(String),
    #[error("Worker family {0} queue is closed")]
    Closed(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Element source (workspace) errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Element not found: {container}/{path}")]
    NotFound { container: String, path: String },
    #[error("Element source I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Element source parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(error: serde_json::Error) -> Self {
        SourceError::Parse(error.to_string())
    }
}

/// Checkpoint and registry store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
