use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one `WorkerTask`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum WorkerTaskState {
    /// Submitted to a family pool, not yet picked up
    #[default]
    Pending = 0,
    /// Calling the worker
    Running = 1,
    /// Worker answered; the elements are settled
    Completed = 2,
    /// Skipped because the step was paused
    Pause = 3,
    /// Skipped because the step was cancelled
    Cancel = 4,
}

impl From<u8> for WorkerTaskState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Pause,
            _ => Self::Cancel,
        }
    }
}

impl WorkerTaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Pause | Self::Cancel)
    }

    /// Elements of a task in any other state must be checkpointed as remaining
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for WorkerTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Pause => write!(f, "pause"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

impl std::str::FromStr for WorkerTaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "pause" => Ok(Self::Pause),
            "cancel" => Ok(Self::Cancel),
            _ => Err(format!("Invalid worker task state: {s}")),
        }
    }
}
