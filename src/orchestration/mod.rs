//! # Orchestration
//!
//! Distribution of a step over its elements:
//!
//! - **ProcessDistributor**: resolves the elements of a step, runs the
//!   checkpointed batch loop for every level and exposes pause/cancel
//! - **WorkerTask**: one worker call for one sub-batch, honouring the step
//!   action at the moment it runs
//! - **elements**: parsers for file listings, multi-level files, linked pages
//!   and JSONL records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use process_distributor::models::{Distribution, PauseRecover, RequestContext, Step};
//! use process_distributor::orchestration::ProcessDistributor;
//! use std::sync::Arc;
//!
//! # async fn example(distributor: ProcessDistributor) {
//! let step = Arc::new(Step::new(
//!     "step-1",
//!     "STP_UNIT_CHECK",
//!     "DefaultWorker",
//!     Distribution::file_listing("units.json").with_bulk_size(16),
//! ));
//! let context = RequestContext::new(0, "request-1");
//! let status = distributor
//!     .distribute(&context, step, "operation-1", PauseRecover::NoRecover)
//!     .await;
//! println!("step finished with {}", status.global_status());
//! # }
//! ```

mod batch;
pub mod distributor;
pub mod elements;
pub mod worker_task;

pub use distributor::ProcessDistributor;
pub use worker_task::{interruption_status, is_interruption, WorkerTask};
