//! # Data Models
//!
//! Steps, distribution descriptors, checkpoints, worker identities and the
//! `ItemStatus` outcome model they all report through.

pub mod distribution;
pub mod distributor_index;
pub mod params;
pub mod status;
pub mod step;
pub mod worker;

pub use distribution::{ChainedFile, Distribution, DistributionKind, JsonLineModel};
pub use distributor_index::DistributorIndex;
pub use params::{DescriptionStep, RequestContext, WorkerParameters};
pub use status::{ItemStatus, StatusCode, STATUS_LEVELS};
pub use step::{PauseOrCancelAction, PauseRecover, ProcessBehavior, Step, StepDescriptor};
pub use worker::{WorkerBean, WorkerConfiguration};
