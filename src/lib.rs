#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Process Distributor
//!
//! Batch distribution engine of a workflow platform: fans a workflow step out
//! over a pool of remote workers, tracks progress in resumable checkpoints and
//! aggregates every worker answer into one step status.
//!
//! ## Overview
//!
//! A step names a worker family and a distribution: where its elements come
//! from (a single element, a directory, a JSON list, ordered levels, linked
//! pages or a JSONL stream). The distributor batches the elements, dispatches
//! every batch concurrently through the family's bounded pool, merges the
//! results and writes a checkpoint before moving on. A paused, cancelled or
//! crashed distribution resumes from that checkpoint.
//!
//! ## Module Organization
//!
//! - [`models`] - Steps, distributions, checkpoints and the `ItemStatus` model
//! - [`orchestration`] - `ProcessDistributor` and `WorkerTask`
//! - [`registry`] - Worker families and their bounded pools
//! - [`state_machine`] - Worker task lifecycle
//! - [`client`] - Collaborator traits (workers, workspace, stores)
//! - [`storage`] - In-memory and filesystem collaborator implementations
//! - [`resilience`] - Worker health polling
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use process_distributor::config::ConfigManager;
//! use process_distributor::models::{Distribution, PauseRecover, RequestContext, Step};
//! use process_distributor::orchestration::ProcessDistributor;
//! use process_distributor::registry::WorkerRegistry;
//! use process_distributor::storage::{
//!     FilesystemCheckpointStore, FilesystemElementSource, JsonFileRegistryStore,
//!     NoopProcessMetadataStore,
//! };
//! use process_distributor::client::WorkerClientFactory;
//! use std::sync::Arc;
//!
//! # async fn example(clients: Arc<dyn WorkerClientFactory>) -> Result<(), Box<dyn std::error::Error>> {
//! process_distributor::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//!
//! let registry = WorkerRegistry::load(
//!     manager.config(),
//!     Arc::new(JsonFileRegistryStore::new(&manager.config().registry.worker_db_path)),
//!     clients,
//! )
//! .await?;
//!
//! let distributor = ProcessDistributor::new(
//!     &manager,
//!     Arc::new(registry),
//!     Arc::new(FilesystemCheckpointStore::new("data/checkpoints")),
//!     Arc::new(NoopProcessMetadataStore),
//!     Arc::new(FilesystemElementSource::new("data/workspace")),
//! );
//!
//! let step = Arc::new(Step::new(
//!     "step-1",
//!     "STP_UNIT_CHECK",
//!     "DefaultWorker",
//!     Distribution::file_listing("units.json"),
//! ));
//! let status = distributor
//!     .distribute(&RequestContext::new(0, "req-1"), step, "op-1", PauseRecover::NoRecover)
//!     .await;
//! println!("{}{}", status.global_status(), status.status_meter_message());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod resilience;
pub mod state_machine;
pub mod storage;

pub use config::{ConfigManager, DistributorConfig};
pub use error::{DistributorError, PoolError, Result, WorkerTaskError};
pub use models::{
    Distribution, DistributionKind, DistributorIndex, ItemStatus, PauseOrCancelAction,
    PauseRecover, RequestContext, StatusCode, Step, WorkerBean,
};
pub use orchestration::{ProcessDistributor, WorkerTask};
pub use registry::{WorkerFamilyPool, WorkerRegistry};
