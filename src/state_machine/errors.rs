use thiserror::Error;

use super::{events::WorkerTaskEvent, states::WorkerTaskState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on event {event}")]
    InvalidTransition {
        from: WorkerTaskState,
        event: &'static str,
    },
}

impl StateMachineError {
    pub fn invalid(from: WorkerTaskState, event: WorkerTaskEvent) -> Self {
        Self::InvalidTransition {
            from,
            event: event.event_type(),
        }
    }
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
