//! # Step Model
//!
//! A `Step` is one workflow action applied to a distribution of elements. Its
//! pause/cancel action is the only field mutated from outside a running
//! distribution, so it is stored atomically and read by every `WorkerTask`
//! when it starts executing.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use super::distribution::Distribution;
use super::status::ItemStatus;

/// Pause/cancel action carried by a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PauseOrCancelAction {
    /// Normal execution
    #[default]
    Run = 0,
    /// Resume from a stored checkpoint
    Recover = 1,
    /// Re-run a step that already ran
    Replay = 2,
    Pause = 3,
    Cancel = 4,
    /// The step finished; no worker may be called for it any more
    Complete = 5,
}

impl From<u8> for PauseOrCancelAction {
    fn from(value: u8) -> Self {
        match value {
            0 => PauseOrCancelAction::Run,
            1 => PauseOrCancelAction::Recover,
            2 => PauseOrCancelAction::Replay,
            3 => PauseOrCancelAction::Pause,
            4 => PauseOrCancelAction::Cancel,
            _ => PauseOrCancelAction::Complete, // Default to the state that calls nothing
        }
    }
}

impl PauseOrCancelAction {
    /// Item id of the sentinel status returned by tasks skipped by this action
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseOrCancelAction::Run => "ACTION_RUN",
            PauseOrCancelAction::Recover => "ACTION_RECOVER",
            PauseOrCancelAction::Replay => "ACTION_REPLAY",
            PauseOrCancelAction::Pause => "ACTION_PAUSE",
            PauseOrCancelAction::Cancel => "ACTION_CANCEL",
            PauseOrCancelAction::Complete => "ACTION_COMPLETE",
        }
    }
}

impl fmt::Display for PauseOrCancelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a `distribute` call relates to an earlier interrupted run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PauseRecover {
    /// Fresh run, ignore any checkpoint
    #[default]
    NoRecover,
    /// Resume after a pause requested through the API
    RecoverFromApiPause,
    /// Resume after the server stopped
    RecoverFromServerPause,
}

/// Whether a KO result must stop the workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessBehavior {
    #[default]
    Blocking,
    NoBlocking,
}

/// Serializable snapshot of a step, sent to workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    pub id: String,
    pub step_name: String,
    pub worker_group_id: String,
    pub behavior: ProcessBehavior,
    pub distribution: Distribution,
    pub action: PauseOrCancelAction,
}

#[derive(Debug)]
pub struct Step {
    id: String,
    step_name: String,
    worker_group_id: String,
    behavior: ProcessBehavior,
    distribution: Distribution,
    action: AtomicU8,
    responses: Mutex<ItemStatus>,
}

impl Step {
    pub fn new(
        id: impl Into<String>,
        step_name: impl Into<String>,
        worker_group_id: impl Into<String>,
        distribution: Distribution,
    ) -> Self {
        let step_name = step_name.into();
        Self {
            id: id.into(),
            responses: Mutex::new(ItemStatus::new(step_name.clone())),
            step_name,
            worker_group_id: worker_group_id.into(),
            behavior: ProcessBehavior::default(),
            distribution,
            action: AtomicU8::new(PauseOrCancelAction::Run as u8),
        }
    }

    pub fn with_behavior(mut self, behavior: ProcessBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_action(self, action: PauseOrCancelAction) -> Self {
        self.set_action(action);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn worker_group_id(&self) -> &str {
        &self.worker_group_id
    }

    pub fn behavior(&self) -> ProcessBehavior {
        self.behavior
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn action(&self) -> PauseOrCancelAction {
        PauseOrCancelAction::from(self.action.load(Ordering::Acquire))
    }

    pub fn set_action(&self, action: PauseOrCancelAction) {
        self.action.store(action as u8, Ordering::Release);
    }

    /// Snapshot of the aggregated step responses
    pub fn responses(&self) -> ItemStatus {
        self.responses.lock().clone()
    }

    pub fn set_responses(&self, responses: ItemStatus) {
        *self.responses.lock() = responses;
    }

    /// Mutate the aggregated responses under the step lock
    pub fn update_responses<R>(&self, f: impl FnOnce(&mut ItemStatus) -> R) -> R {
        f(&mut self.responses.lock())
    }

    pub fn descriptor(&self) -> StepDescriptor {
        StepDescriptor {
            id: self.id.clone(),
            step_name: self.step_name.clone(),
            worker_group_id: self.worker_group_id.clone(),
            behavior: self.behavior,
            distribution: self.distribution.clone(),
            action: self.action(),
        }
    }
}
