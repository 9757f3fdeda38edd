use std::sync::atomic::{AtomicU8, Ordering};

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::WorkerTaskEvent,
    states::WorkerTaskState,
};

/// Lock-free state holder of a `WorkerTask`
///
/// Transitions are one directional: `Pending -> Running -> Completed`, and
/// `Pending | Running -> Pause | Cancel`. Terminal states never change.
#[derive(Debug, Default)]
pub struct WorkerTaskStateMachine {
    state: AtomicU8,
}

impl WorkerTaskStateMachine {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerTaskState::Pending as u8),
        }
    }

    pub fn current_state(&self) -> WorkerTaskState {
        WorkerTaskState::from(self.state.load(Ordering::Acquire))
    }

    /// Apply `event`, failing if the current state does not allow it
    pub fn transition(&self, event: WorkerTaskEvent) -> StateMachineResult<WorkerTaskState> {
        let target = event.target_state();
        let mut current = self.current_state();
        loop {
            if !Self::allowed(current, event) {
                return Err(StateMachineError::invalid(current, event));
            }
            match self.state.compare_exchange(
                current as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(target),
                Err(actual) => current = WorkerTaskState::from(actual),
            }
        }
    }

    fn allowed(from: WorkerTaskState, event: WorkerTaskEvent) -> bool {
        match event {
            WorkerTaskEvent::Start => from == WorkerTaskState::Pending,
            WorkerTaskEvent::Complete => from == WorkerTaskState::Running,
            WorkerTaskEvent::Pause | WorkerTaskEvent::Cancel => !from.is_terminal(),
        }
    }
}
