use serde::{Deserialize, Serialize};

use super::states::WorkerTaskState;

/// Events that can trigger worker task state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerTaskEvent {
    /// The pool picked the task up and the step action allows a worker call
    Start,
    /// The worker call returned
    Complete,
    /// The step action was pause when the task ran
    Pause,
    /// The step action was cancel when the task ran
    Cancel,
}

impl WorkerTaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Pause => "pause",
            Self::Cancel => "cancel",
        }
    }

    /// State reached when the event is accepted
    pub fn target_state(&self) -> WorkerTaskState {
        match self {
            Self::Start => WorkerTaskState::Running,
            Self::Complete => WorkerTaskState::Completed,
            Self::Pause => WorkerTaskState::Pause,
            Self::Cancel => WorkerTaskState::Cancel,
        }
    }
}
