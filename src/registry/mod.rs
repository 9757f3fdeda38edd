//! # Worker Registry
//!
//! Worker families and the bounded pools that execute worker tasks for them.

pub mod family_pool;
pub mod worker_registry;

pub use family_pool::{TaskHandle, WorkerFamilyPool};
pub use worker_registry::WorkerRegistry;
