//! # Distributor Constants
//!
//! Sentinel identifiers and defaults shared by the distributor, the worker
//! tasks and the registry.

/// Checkpoint namespace under which `DistributorIndex` records are stored
pub const DISTRIBUTOR_INDEX: &str = "distributorIndex";

/// Level used in checkpoints of distributions that have no levels
pub const NOLEVEL: &str = "_no_level";

/// Item id recorded when a distribution resolves to no element
pub const OBJECTS_LIST_EMPTY: &str = "OBJECTS_LIST_EMPTY";

/// Item id recorded when a worker call fails outright
pub const WORKER_CALL_EXCEPTION: &str = "WORKER_CALL_EXCEPTION";

/// Suffix appended to unit ids listed in a multi-level file
pub const JSON_EXTENSION: &str = ".json";

/// Default tuning values, overridable through `DistributorConfig`
pub mod defaults {
    /// Worker calls dispatched between two checkpoints
    pub const DISTRIBUTOR_BATCH_SIZE: usize = 100;
    /// Elements sent in one worker call
    pub const WORKER_BULK_SIZE: usize = 10;
    /// Pending tasks a worker family accepts before submitters wait
    pub const FAMILY_QUEUE_SIZE: usize = 15;
    /// Health checks performed before a worker is declared unreachable
    pub const STATUS_CHECK_RETRY: u32 = 3;
    pub const STATUS_CHECK_INITIAL_BACKOFF_MS: u64 = 1000;
    pub const STATUS_CHECK_BACKOFF_MULTIPLIER: f64 = 1.5;
    pub const STATUS_CHECK_MAX_BACKOFF_MS: u64 = 10_000;
    /// Durable worker registry file
    pub const WORKER_DB_PATH: &str = "data/worker.db";
}
