//! # Worker Registry
//!
//! Maps worker family names to their `WorkerFamilyPool`. Every mutation is
//! written to the durable registry store so the pools can be rebuilt after a
//! restart; a failed write is logged and the in-memory change kept.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{instrument, warn};

use super::family_pool::WorkerFamilyPool;
use crate::client::{RegistryStore, WorkerClientFactory};
use crate::config::DistributorConfig;
use crate::error::{PoolError, StoreError};
use crate::logging::log_worker_operation;
use crate::models::WorkerBean;
use crate::resilience::HealthCheckPolicy;

pub struct WorkerRegistry {
    pools: RwLock<HashMap<String, Arc<WorkerFamilyPool>>>,
    store: Arc<dyn RegistryStore>,
    client_factory: Arc<dyn WorkerClientFactory>,
    queue_size: usize,
    policy: HealthCheckPolicy,
    /// Serializes snapshot and save so the store sees mutations in order
    persist_lock: Mutex<()>,
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("families", &self.families())
            .field("queue_size", &self.queue_size)
            .finish()
    }
}

impl WorkerRegistry {
    pub fn new(
        config: &DistributorConfig,
        store: Arc<dyn RegistryStore>,
        client_factory: Arc<dyn WorkerClientFactory>,
    ) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            store,
            client_factory,
            queue_size: config.family_queue_size,
            policy: HealthCheckPolicy::new(&config.health_check),
            persist_lock: Mutex::new(()),
        }
    }

    /// Build a registry and restore the workers found in `store`
    pub async fn load(
        config: &DistributorConfig,
        store: Arc<dyn RegistryStore>,
        client_factory: Arc<dyn WorkerClientFactory>,
    ) -> Result<Self, StoreError> {
        let registry = Self::new(config, store, client_factory);
        let workers = registry.store.load().await?;
        let restored = workers.len();
        for bean in workers {
            registry.pool_or_create(&bean.family).register_worker(bean);
        }
        log_worker_operation(
            "load",
            "*",
            None,
            "OK",
            Some(&format!("{restored} workers restored")),
        );
        Ok(registry)
    }

    fn pool_or_create(&self, family: &str) -> Arc<WorkerFamilyPool> {
        if let Some(pool) = self.pools.read().get(family) {
            return Arc::clone(pool);
        }
        let mut pools = self.pools.write();
        Arc::clone(pools.entry(family.to_string()).or_insert_with(|| {
            Arc::new(WorkerFamilyPool::new(
                family,
                self.queue_size,
                Arc::clone(&self.client_factory),
                self.policy.clone(),
            ))
        }))
    }

    /// Add a worker, creating its family pool on first use
    #[instrument(skip(self, bean), fields(family = %bean.family, worker_id = %bean.worker_id))]
    pub async fn register_worker(&self, bean: WorkerBean) -> Result<(), PoolError> {
        if bean.family.trim().is_empty() || bean.worker_id.trim().is_empty() {
            return Err(PoolError::BadRequest(
                "worker family and worker id are required".to_string(),
            ));
        }
        let family = bean.family.clone();
        let worker_id = bean.worker_id.clone();
        self.pool_or_create(&family).register_worker(bean);
        log_worker_operation("register", &family, Some(&worker_id), "OK", None);
        self.persist().await;
        Ok(())
    }

    /// Register a worker from its JSON description
    ///
    /// The family in the payload must match `family`; `worker_id` always wins
    /// over any id the payload carries.
    pub async fn register_worker_json(
        &self,
        family: &str,
        worker_id: &str,
        json: &str,
    ) -> Result<(), PoolError> {
        let mut bean: WorkerBean = serde_json::from_str(json)
            .map_err(|e| PoolError::BadRequest(format!("invalid worker description: {e}")))?;
        if bean.family != family {
            return Err(PoolError::BadRequest(format!(
                "worker family {} does not match {}",
                bean.family, family
            )));
        }
        bean.worker_id = worker_id.to_string();
        if bean.name.is_empty() {
            bean.name = worker_id.to_string();
        }
        self.register_worker(bean).await
    }

    #[instrument(skip(self))]
    pub async fn unregister_worker(&self, family: &str, worker_id: &str) -> Result<(), PoolError> {
        let pool = self.find_pool_for(family)?;
        pool.unregister_worker(worker_id).await?;
        log_worker_operation("unregister", family, Some(worker_id), "OK", None);
        self.persist().await;
        Ok(())
    }

    /// Pool of `family`, fully initialised, or `FamilyNotFound`
    pub fn find_pool_for(&self, family: &str) -> Result<Arc<WorkerFamilyPool>, PoolError> {
        self.pools
            .read()
            .get(family)
            .cloned()
            .ok_or_else(|| PoolError::FamilyNotFound(family.to_string()))
    }

    pub fn families(&self) -> Vec<String> {
        let mut families: Vec<String> = self.pools.read().keys().cloned().collect();
        families.sort();
        families
    }

    /// Every registered worker, ordered by family then worker id
    pub fn workers(&self) -> Vec<WorkerBean> {
        let pools: Vec<Arc<WorkerFamilyPool>> = self.pools.read().values().cloned().collect();
        let mut workers: Vec<WorkerBean> = pools.iter().flat_map(|pool| pool.workers()).collect();
        workers.sort_by(|a, b| (&a.family, &a.worker_id).cmp(&(&b.family, &b.worker_id)));
        workers
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let workers = self.workers();
        if let Err(e) = self.store.save(&workers).await {
            warn!(error = %e, workers = workers.len(), "Failed to persist worker registry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WorkerClient;
    use crate::error::WorkerClientError;
    use crate::models::{DescriptionStep, ItemStatus};
    use crate::storage::{InMemoryRegistryStore, JsonFileRegistryStore};
    use async_trait::async_trait;

    struct IdleClient;

    #[async_trait]
    impl WorkerClient for IdleClient {
        async fn submit_step(
            &self,
            _description: &DescriptionStep,
        ) -> Result<ItemStatus, WorkerClientError> {
            Ok(ItemStatus::new("ACTION"))
        }

        async fn check_status(&self) -> Result<(), WorkerClientError> {
            Ok(())
        }
    }

    struct IdleFactory;

    impl WorkerClientFactory for IdleFactory {
        fn client_for(&self, _worker: &WorkerBean) -> Arc<dyn WorkerClient> {
            Arc::new(IdleClient)
        }
    }

    fn registry(store: Arc<InMemoryRegistryStore>) -> WorkerRegistry {
        WorkerRegistry::new(&DistributorConfig::default(), store, Arc::new(IdleFactory))
    }

    #[tokio::test]
    async fn test_register_is_idempotent_and_persisted() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let registry = registry(Arc::clone(&store));

        let bean = WorkerBean::new("DefaultWorker", "w1", "localhost", 8098);
        registry.register_worker(bean.clone()).await.unwrap();
        registry.register_worker(bean.clone()).await.unwrap();

        let pool = registry.find_pool_for("DefaultWorker").unwrap();
        assert_eq!(pool.worker_count(), 1);
        assert_eq!(store.workers(), vec![bean]);
    }

    #[tokio::test]
    async fn test_unknown_family_and_worker() {
        let registry = registry(Arc::new(InMemoryRegistryStore::new()));
        assert_eq!(
            registry.find_pool_for("Nope").unwrap_err(),
            PoolError::FamilyNotFound("Nope".into())
        );

        registry
            .register_worker(WorkerBean::new("F", "w1", "localhost", 1))
            .await
            .unwrap();
        assert_eq!(
            registry.unregister_worker("F", "w2").await.unwrap_err(),
            PoolError::WorkerNotFound {
                family: "F".into(),
                worker_id: "w2".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unregister_keeps_empty_family() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let registry = registry(Arc::clone(&store));
        registry
            .register_worker(WorkerBean::new("F", "w1", "localhost", 1))
            .await
            .unwrap();
        registry.unregister_worker("F", "w1").await.unwrap();

        assert_eq!(registry.find_pool_for("F").unwrap().worker_count(), 0);
        assert!(store.workers().is_empty());
    }

    #[tokio::test]
    async fn test_register_worker_json_checks_family() {
        let registry = registry(Arc::new(InMemoryRegistryStore::new()));
        let json = r#"{"name":"w","family":"DefaultWorker","capacity":2,
            "configuration":{"serverHost":"localhost","serverPort":8098}}"#;

        let err = registry
            .register_worker_json("OtherWorker", "w1", json)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::BadRequest(_)));

        registry
            .register_worker_json("DefaultWorker", "w1", json)
            .await
            .unwrap();
        let workers = registry.workers();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].worker_id, "w1");
        assert_eq!(workers[0].capacity, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_reach_the_store_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileRegistryStore::new(dir.path().join("workers.json")));

        for round in 0..10 {
            let registry = Arc::new(WorkerRegistry::new(
                &DistributorConfig::default(),
                store.clone(),
                Arc::new(IdleFactory),
            ));
            let family = format!("F{round}");

            let registrations = (0..8).map(|i| {
                let registry = Arc::clone(&registry);
                let family = family.clone();
                tokio::spawn(async move {
                    registry
                        .register_worker(WorkerBean::new(family, format!("w{i}"), "localhost", 1))
                        .await
                })
            });
            for result in futures::future::join_all(registrations).await {
                result.unwrap().unwrap();
            }

            let removals = (0..3).map(|i| {
                let registry = Arc::clone(&registry);
                let family = family.clone();
                tokio::spawn(async move { registry.unregister_worker(&family, &format!("w{i}")).await })
            });
            for result in futures::future::join_all(removals).await {
                result.unwrap().unwrap();
            }

            let durable = store.load().await.unwrap();
            assert_eq!(durable, registry.workers(), "round {round}");
            assert_eq!(durable.len(), 5);

            let reloaded =
                WorkerRegistry::load(&DistributorConfig::default(), store.clone(), Arc::new(IdleFactory))
                    .await
                    .unwrap();
            assert_eq!(reloaded.find_pool_for(&family).unwrap().worker_count(), 5);
        }
    }

    #[tokio::test]
    async fn test_load_restores_pools() {
        let store = Arc::new(InMemoryRegistryStore::with_workers(vec![
            WorkerBean::new("A", "a1", "localhost", 1),
            WorkerBean::new("A", "a2", "localhost", 2),
            WorkerBean::new("B", "b1", "localhost", 3),
        ]));
        let registry = WorkerRegistry::load(
            &DistributorConfig::default(),
            store,
            Arc::new(IdleFactory),
        )
        .await
        .unwrap();

        assert_eq!(registry.families(), vec!["A", "B"]);
        assert_eq!(registry.find_pool_for("A").unwrap().worker_count(), 2);
    }
}
