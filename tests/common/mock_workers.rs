#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use process_distributor::client::{WorkerClient, WorkerClientFactory};
use process_distributor::error::WorkerClientError;
use process_distributor::models::{DescriptionStep, ItemStatus, StatusCode, WorkerBean};

/// Callback run on every worker call, before the answer is built
pub type CallHook = Box<dyn Fn(&DescriptionStep) + Send + Sync>;

/// Worker answering with one child status per element
///
/// Elements default to `OK`; `with_status` scripts a different answer for one
/// element. The worker-level status is the worst element status.
pub struct ScriptedWorker {
    statuses: HashMap<String, StatusCode>,
    calls: Mutex<Vec<Vec<String>>>,
    hook: Mutex<Option<CallHook>>,
    reachable: AtomicBool,
}

impl Default for ScriptedWorker {
    fn default() -> Self {
        Self {
            statuses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
            reachable: AtomicBool::new(true),
        }
    }
}

impl ScriptedWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, element: &str, status: StatusCode) -> Self {
        self.statuses.insert(element.to_string(), status);
        self
    }

    /// A worker whose calls and health checks all fail
    pub fn unreachable() -> Self {
        let worker = Self::default();
        worker.reachable.store(false, Ordering::SeqCst);
        worker
    }

    pub fn on_call(&self, hook: impl Fn(&DescriptionStep) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    pub fn clear_hook(&self) {
        *self.hook.lock() = None;
    }

    /// Element lists of every call received, in call order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Every element received, in call order
    pub fn elements(&self) -> Vec<String> {
        self.calls.lock().iter().flatten().cloned().collect()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl WorkerClient for ScriptedWorker {
    async fn submit_step(
        &self,
        description: &DescriptionStep,
    ) -> Result<ItemStatus, WorkerClientError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(WorkerClientError::NotFound("worker is gone".to_string()));
        }

        self.calls.lock().push(description.object_names().to_vec());
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(description);
        }

        let mut response = ItemStatus::new(description.work_params.current_step.clone());
        for element in description.object_names() {
            let status = self
                .statuses
                .get(element)
                .copied()
                .unwrap_or(StatusCode::Ok);
            response.put_item_status(element.clone(), ItemStatus::new(element.clone()).increment(status));
        }
        Ok(response)
    }

    async fn check_status(&self) -> Result<(), WorkerClientError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WorkerClientError::NotFound("worker is gone".to_string()))
        }
    }
}

/// Hands out the scripted worker registered for a worker id, or the default one
pub struct ScriptedWorkerFactory {
    default: Arc<ScriptedWorker>,
    workers: RwLock<HashMap<String, Arc<ScriptedWorker>>>,
}

impl ScriptedWorkerFactory {
    pub fn new(default: Arc<ScriptedWorker>) -> Self {
        Self {
            default,
            workers: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_worker(&self, worker_id: &str, worker: Arc<ScriptedWorker>) {
        self.workers.write().insert(worker_id.to_string(), worker);
    }
}

impl WorkerClientFactory for ScriptedWorkerFactory {
    fn client_for(&self, worker: &WorkerBean) -> Arc<dyn WorkerClient> {
        match self.workers.read().get(&worker.worker_id) {
            Some(scripted) => Arc::clone(scripted) as Arc<dyn WorkerClient>,
            None => Arc::clone(&self.default) as Arc<dyn WorkerClient>,
        }
    }
}
