//! # Worker Family Pool
//!
//! Bounded execution context of one worker family. Submitted tasks wait in a
//! queue of fixed depth; every registered worker runs a dispatch loop that
//! pulls from the queue while it has free capacity, so the number of calls in
//! flight never exceeds the summed worker capacity and a full queue makes
//! submitters wait.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::client::{WorkerClient, WorkerClientFactory};
use crate::error::{PoolError, WorkerTaskError};
use crate::models::{ItemStatus, WorkerBean};
use crate::orchestration::WorkerTask;
use crate::resilience::HealthCheckPolicy;

type TaskResult = Result<ItemStatus, WorkerTaskError>;

struct QueuedTask {
    task: Arc<WorkerTask>,
    reply: oneshot::Sender<TaskResult>,
}

struct RegisteredWorker {
    bean: WorkerBean,
    shutdown: watch::Sender<bool>,
}

/// Pending result of a submitted task
#[derive(Debug)]
pub struct TaskHandle {
    worker_family: String,
    reply: oneshot::Receiver<TaskResult>,
}

impl TaskHandle {
    /// Wait for the task to run; a task dropped from the queue is an executor error
    pub async fn join(self) -> TaskResult {
        self.reply.await.unwrap_or_else(|_| {
            Err(WorkerTaskError::Executor(format!(
                "task dropped by worker family {} before completion",
                self.worker_family
            )))
        })
    }
}

pub struct WorkerFamilyPool {
    family: String,
    queue_size: usize,
    sender: mpsc::Sender<QueuedTask>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedTask>>>,
    workers: RwLock<HashMap<String, RegisteredWorker>>,
    client_factory: Arc<dyn WorkerClientFactory>,
    policy: HealthCheckPolicy,
}

impl std::fmt::Debug for WorkerFamilyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerFamilyPool")
            .field("family", &self.family)
            .field("queue_size", &self.queue_size)
            .field("workers", &self.worker_ids())
            .finish()
    }
}

impl WorkerFamilyPool {
    pub fn new(
        family: impl Into<String>,
        queue_size: usize,
        client_factory: Arc<dyn WorkerClientFactory>,
        policy: HealthCheckPolicy,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        Self {
            family: family.into(),
            queue_size,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            workers: RwLock::new(HashMap::new()),
            client_factory,
            policy,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn worker_count(&self) -> usize {
        self.workers.read().len()
    }

    pub fn worker_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workers.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn workers(&self) -> Vec<WorkerBean> {
        self.workers
            .read()
            .values()
            .map(|worker| worker.bean.clone())
            .collect()
    }

    /// Total number of calls the family runs concurrently
    pub fn capacity(&self) -> usize {
        self.workers
            .read()
            .values()
            .map(|worker| worker.bean.capacity.max(1))
            .sum()
    }

    /// Add a worker and start its dispatch loop; re-registering replaces it
    ///
    /// Must be called from within a Tokio runtime.
    pub fn register_worker(&self, bean: WorkerBean) {
        let client = self.client_factory.client_for(&bean);
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(run_dispatch_loop(
            self.family.clone(),
            bean.worker_id.clone(),
            bean.capacity.max(1),
            client,
            Arc::clone(&self.receiver),
            shutdown_rx,
            self.policy.clone(),
        ));

        let worker_id = bean.worker_id.clone();
        let previous = self
            .workers
            .write()
            .insert(worker_id.clone(), RegisteredWorker { bean, shutdown });
        if let Some(previous) = previous {
            let _ = previous.shutdown.send(true);
            debug!(family = %self.family, worker_id = %worker_id, "Worker re-registered");
        } else {
            info!(family = %self.family, worker_id = %worker_id, "Worker added to family pool");
        }
    }

    /// Stop a worker's dispatch loop; tasks already running finish
    ///
    /// When the last worker leaves, queued tasks are dropped so their
    /// submitters are released with an error instead of waiting forever.
    pub async fn unregister_worker(&self, worker_id: &str) -> Result<(), PoolError> {
        let removed = self.workers.write().remove(worker_id);
        let Some(worker) = removed else {
            return Err(PoolError::WorkerNotFound {
                family: self.family.clone(),
                worker_id: worker_id.to_string(),
            });
        };
        let _ = worker.shutdown.send(true);
        info!(family = %self.family, worker_id = %worker_id, "Worker removed from family pool");

        if self.worker_count() == 0 {
            self.drain().await;
        }
        Ok(())
    }

    /// Queue a task, waiting while the queue is full
    pub async fn submit(&self, task: Arc<WorkerTask>) -> Result<TaskHandle, PoolError> {
        if self.worker_count() == 0 {
            return Err(PoolError::NoWorkers(self.family.clone()));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(QueuedTask {
                task,
                reply: reply_tx,
            })
            .await
            .map_err(|_| PoolError::Closed(self.family.clone()))?;

        // The last worker may have left while the task was being queued
        if self.worker_count() == 0 {
            self.drain().await;
        }

        Ok(TaskHandle {
            worker_family: self.family.clone(),
            reply: reply_rx,
        })
    }

    async fn drain(&self) {
        let mut receiver = self.receiver.lock().await;
        let mut dropped = 0usize;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(
                family = %self.family,
                dropped = dropped,
                "Worker family has no worker left, queued tasks dropped"
            );
        }
    }
}

impl Drop for WorkerFamilyPool {
    fn drop(&mut self) {
        for worker in self.workers.get_mut().values() {
            let _ = worker.shutdown.send(true);
        }
    }
}

async fn run_dispatch_loop(
    family: String,
    worker_id: String,
    capacity: usize,
    client: Arc<dyn WorkerClient>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedTask>>>,
    mut shutdown: watch::Receiver<bool>,
    policy: HealthCheckPolicy,
) {
    let semaphore = Arc::new(Semaphore::new(capacity));
    debug!(family = %family, worker_id = %worker_id, capacity = capacity, "Dispatch loop started");

    loop {
        let permit = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let queued = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            item = async { receiver.lock().await.recv().await } => match item {
                Some(queued) => queued,
                None => break,
            },
        };

        let client = Arc::clone(&client);
        let worker_id = worker_id.clone();
        let policy = policy.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let result = queued
                .task
                .execute(client.as_ref(), &worker_id, &policy)
                .await;
            if queued.reply.send(result).is_err() {
                debug!(worker_id = %worker_id, "Task submitter gone before result delivery");
            }
        });
    }

    debug!(family = %family, worker_id = %worker_id, "Dispatch loop stopped");
}
