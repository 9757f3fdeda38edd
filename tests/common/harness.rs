#![allow(dead_code)]

use std::sync::Arc;

use process_distributor::config::{ConfigManager, DistributorConfig, HealthCheckConfig};
use process_distributor::constants::DISTRIBUTOR_INDEX;
use process_distributor::models::{
    Distribution, DistributorIndex, ItemStatus, PauseRecover, RequestContext, Step, WorkerBean,
};
use process_distributor::orchestration::ProcessDistributor;
use process_distributor::registry::WorkerRegistry;
use process_distributor::storage::{
    InMemoryCheckpointStore, InMemoryElementSource, InMemoryProcessMetadataStore,
    InMemoryRegistryStore,
};

use super::mock_workers::{ScriptedWorker, ScriptedWorkerFactory};

pub const FAMILY: &str = "DefaultWorker";
pub const OPERATION_ID: &str = "op-1";
pub const STEP_ID: &str = "step-1";
pub const STEP_NAME: &str = "STP_UNIT_CHECK";

/// Small batches and a one-shot health check so failures surface quickly
pub fn test_config(distributor_batch_size: usize, worker_bulk_size: usize) -> DistributorConfig {
    DistributorConfig {
        distributor_batch_size,
        worker_bulk_size,
        family_queue_size: 32,
        health_check: HealthCheckConfig {
            max_attempts: 1,
            initial_backoff_ms: 1,
            backoff_multiplier: 1.0,
            max_backoff_ms: 1,
        },
        ..DistributorConfig::default()
    }
}

pub fn step(distribution: Distribution) -> Arc<Step> {
    Arc::new(Step::new(STEP_ID, STEP_NAME, FAMILY, distribution))
}

pub fn context() -> RequestContext {
    RequestContext::new(0, "req-1")
}

/// Distributor wired to in-memory collaborators and scripted workers
pub struct Harness {
    pub distributor: ProcessDistributor,
    pub registry: Arc<WorkerRegistry>,
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    pub metadata: Arc<InMemoryProcessMetadataStore>,
    pub source: Arc<InMemoryElementSource>,
    pub registry_store: Arc<InMemoryRegistryStore>,
    pub factory: Arc<ScriptedWorkerFactory>,
    pub worker: Arc<ScriptedWorker>,
}

impl Harness {
    pub fn new(config: DistributorConfig) -> Self {
        Self::with_worker(config, ScriptedWorker::new())
    }

    /// `worker` answers for every worker id without a dedicated script
    pub fn with_worker(config: DistributorConfig, worker: ScriptedWorker) -> Self {
        let manager = ConfigManager::from_config(config).expect("valid test configuration");
        let worker = Arc::new(worker);
        let factory = Arc::new(ScriptedWorkerFactory::new(Arc::clone(&worker)));
        let registry_store = Arc::new(InMemoryRegistryStore::new());
        let registry = Arc::new(WorkerRegistry::new(
            manager.config(),
            registry_store.clone(),
            factory.clone(),
        ));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let metadata = Arc::new(InMemoryProcessMetadataStore::new());
        let source = Arc::new(InMemoryElementSource::new());

        let distributor = ProcessDistributor::new(
            &manager,
            Arc::clone(&registry),
            checkpoints.clone(),
            metadata.clone(),
            source.clone(),
        );

        Self {
            distributor,
            registry,
            checkpoints,
            metadata,
            source,
            registry_store,
            factory,
            worker,
        }
    }

    pub async fn add_worker(&self, worker_id: &str, capacity: usize) {
        self.registry
            .register_worker(WorkerBean::new(FAMILY, worker_id, "localhost", 8096).with_capacity(capacity))
            .await
            .expect("worker registration");
    }

    pub async fn run(&self, step: &Arc<Step>) -> ItemStatus {
        self.distributor
            .distribute(&context(), Arc::clone(step), OPERATION_ID, PauseRecover::NoRecover)
            .await
    }

    pub async fn resume(&self, step: &Arc<Step>, pause_recover: PauseRecover) -> ItemStatus {
        self.distributor
            .distribute(&context(), Arc::clone(step), OPERATION_ID, pause_recover)
            .await
    }

    pub fn checkpoint_writes(&self) -> Vec<DistributorIndex> {
        self.checkpoints.writes(DISTRIBUTOR_INDEX, OPERATION_ID)
    }

    pub fn seed_checkpoint(&self, index: DistributorIndex) {
        self.checkpoints.insert(DISTRIBUTOR_INDEX, OPERATION_ID, index);
    }

    pub fn put_file_listing(&self, path: &str, elements: &[&str]) {
        self.source
            .put_json(OPERATION_ID, path, &elements)
            .expect("serializable listing");
    }
}

pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}
