//! # Worker Task
//!
//! One worker call for one sub-batch of elements. The branch taken depends on
//! the step action read when the task actually starts running, so a pause
//! requested after submission still stops tasks waiting in the family queue.
//! A task already calling its worker is never interrupted.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::WorkerClient;
use crate::error::{WorkerClientError, WorkerTaskError};
use crate::models::{
    DescriptionStep, ItemStatus, PauseOrCancelAction, RequestContext, StatusCode, Step,
    WorkerParameters,
};
use crate::resilience::{HealthCheckOutcome, HealthCheckPolicy};
use crate::state_machine::{WorkerTaskEvent, WorkerTaskState, WorkerTaskStateMachine};

/// Status returned by a task skipped because of `action`
///
/// The item id and the single child are both the action name, with an
/// `UNKNOWN` severity.
pub fn interruption_status(action: PauseOrCancelAction) -> ItemStatus {
    let name = action.as_str();
    ItemStatus::new(name).set_item_status(name, ItemStatus::new(name).increment(StatusCode::Unknown))
}

/// Whether `status` is the sentinel returned for `action`
pub fn is_interruption(status: &ItemStatus, action: PauseOrCancelAction) -> bool {
    status.item_id() == action.as_str() && status.global_status() == StatusCode::Unknown
}

#[derive(Debug)]
pub struct WorkerTask {
    id: Uuid,
    step: Arc<Step>,
    params: WorkerParameters,
    state: WorkerTaskStateMachine,
}

impl WorkerTask {
    pub fn new(
        step: Arc<Step>,
        operation_id: &str,
        elements: Vec<String>,
        context: RequestContext,
    ) -> Self {
        let params = WorkerParameters {
            container_name: operation_id.to_string(),
            object_name_list: elements,
            current_step: step.step_name().to_string(),
            step_unique_id: step.id().to_string(),
            context,
        };
        Self {
            id: Uuid::new_v4(),
            step,
            params,
            state: WorkerTaskStateMachine::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn elements(&self) -> &[String] {
        &self.params.object_name_list
    }

    pub fn state(&self) -> WorkerTaskState {
        self.state.current_state()
    }

    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }

    /// Run the task against `client`, the worker identified by `worker_id`
    pub async fn execute(
        &self,
        client: &dyn WorkerClient,
        worker_id: &str,
        policy: &HealthCheckPolicy,
    ) -> Result<ItemStatus, WorkerTaskError> {
        let action = self.step.action();
        match action {
            PauseOrCancelAction::Pause => {
                self.transition(WorkerTaskEvent::Pause)?;
                debug!(task_id = %self.id, step_id = %self.step.id(), "Task skipped, step paused");
                Ok(interruption_status(action))
            }
            PauseOrCancelAction::Cancel => {
                self.transition(WorkerTaskEvent::Cancel)?;
                debug!(task_id = %self.id, step_id = %self.step.id(), "Task skipped, step cancelled");
                Ok(interruption_status(action))
            }
            PauseOrCancelAction::Complete => Err(WorkerTaskError::StepAlreadyCompleted),
            PauseOrCancelAction::Run
            | PauseOrCancelAction::Recover
            | PauseOrCancelAction::Replay => self.call_worker(client, worker_id, policy).await,
        }
    }

    async fn call_worker(
        &self,
        client: &dyn WorkerClient,
        worker_id: &str,
        policy: &HealthCheckPolicy,
    ) -> Result<ItemStatus, WorkerTaskError> {
        self.transition(WorkerTaskEvent::Start)?;

        let description = DescriptionStep {
            step: self.step.descriptor(),
            work_params: self.params.clone(),
        };

        debug!(
            task_id = %self.id,
            worker_id = %worker_id,
            step_name = %self.step.step_name(),
            elements = self.elements().len(),
            "Calling worker"
        );

        match client.submit_step(&description).await {
            Ok(status) => {
                self.transition(WorkerTaskEvent::Complete)?;
                Ok(status)
            }
            Err(e) => Err(self.handle_call_error(e, client, worker_id, policy).await),
        }
    }

    async fn handle_call_error(
        &self,
        error: WorkerClientError,
        client: &dyn WorkerClient,
        worker_id: &str,
        policy: &HealthCheckPolicy,
    ) -> WorkerTaskError {
        warn!(task_id = %self.id, worker_id = %worker_id, error = %error, "Worker call failed");
        if !error.is_unavailability() {
            return WorkerTaskError::Executor(error.to_string());
        }

        match policy.await_recovery(client, worker_id).await {
            HealthCheckOutcome::Unreachable => WorkerTaskError::Unreachable {
                worker_id: worker_id.to_string(),
            },
            HealthCheckOutcome::Recovered { .. } => WorkerTaskError::Executor(error.to_string()),
        }
    }

    fn transition(&self, event: WorkerTaskEvent) -> Result<WorkerTaskState, WorkerTaskError> {
        self.state
            .transition(event)
            .map_err(|e| WorkerTaskError::Executor(e.to_string()))
    }
}
