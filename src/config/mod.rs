//! # Distributor Configuration
//!
//! Tuning values for batching, family queues, worker health checks and the
//! durable worker registry.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use process_distributor::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from(Some("config/distributor.yaml".as_ref()))?;
//! let batch_size = manager.config().distributor_batch_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root distributor configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DistributorConfig {
    /// Worker calls dispatched concurrently between two checkpoints
    pub distributor_batch_size: usize,

    /// Elements per worker call when the distribution does not set one
    pub worker_bulk_size: usize,

    /// Bounded queue depth of every worker family pool
    pub family_queue_size: usize,

    /// Worker health polling after a failed call
    pub health_check: HealthCheckConfig,

    /// Durable worker registry
    pub registry: RegistryConfig,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            distributor_batch_size: defaults::DISTRIBUTOR_BATCH_SIZE,
            worker_bulk_size: defaults::WORKER_BULK_SIZE,
            family_queue_size: defaults::FAMILY_QUEUE_SIZE,
            health_check: HealthCheckConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

/// Health check retry budget and backoff for unreachable workers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::STATUS_CHECK_RETRY,
            initial_backoff_ms: defaults::STATUS_CHECK_INITIAL_BACKOFF_MS,
            backoff_multiplier: defaults::STATUS_CHECK_BACKOFF_MULTIPLIER,
            max_backoff_ms: defaults::STATUS_CHECK_MAX_BACKOFF_MS,
        }
    }
}

impl HealthCheckConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// File holding the serialized list of registered workers
    pub worker_db_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            worker_db_path: PathBuf::from(defaults::WORKER_DB_PATH),
        }
    }
}

impl DistributorConfig {
    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.distributor_batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "distributor_batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        if self.worker_bulk_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker_bulk_size",
                "0",
                "bulk size must be greater than 0",
            ));
        }

        if self.family_queue_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "family_queue_size",
                "0",
                "queue size must be greater than 0",
            ));
        }

        if self.health_check.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "health_check.max_attempts",
                "0",
                "at least one health check is required",
            ));
        }

        if self.health_check.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "health_check.backoff_multiplier",
                self.health_check.backoff_multiplier.to_string(),
                "multiplier must be at least 1.0",
            ));
        }

        Ok(())
    }
}
