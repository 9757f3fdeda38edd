// State machine for worker tasks
//
// A worker task moves one way through PENDING -> RUNNING -> COMPLETED, or
// ends in PAUSE / CANCEL when the step action stops it before the worker call.

pub mod errors;
pub mod events;
pub mod states;
pub mod task_state_machine;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::WorkerTaskEvent;
pub use states::WorkerTaskState;
pub use task_state_machine::WorkerTaskStateMachine;
