//! # Worker Health Check Policy
//!
//! After a failed worker call, the task polls the worker's health endpoint a
//! bounded number of times with exponential backoff before declaring the
//! worker unreachable.

use std::time::Duration;
use tracing::{debug, warn};

use crate::client::WorkerClient;
use crate::config::HealthCheckConfig;

/// Outcome of a health polling round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckOutcome {
    /// The worker answered a health check after `attempts` polls
    Recovered { attempts: u32 },
    /// The retry budget ran out
    Unreachable,
}

#[derive(Debug, Clone)]
pub struct HealthCheckPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    backoff_multiplier: f64,
    max_backoff: Duration,
}

impl HealthCheckPolicy {
    pub fn new(config: &HealthCheckConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff(),
            backoff_multiplier: config.backoff_multiplier,
            max_backoff: config.max_backoff(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the given attempt, starting at 0, capped at the max backoff
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = (self.initial_backoff.as_millis() as f64 * factor)
            .min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }

    /// Poll `client` until it answers or the budget is exhausted
    pub async fn await_recovery(
        &self,
        client: &dyn WorkerClient,
        worker_id: &str,
    ) -> HealthCheckOutcome {
        for attempt in 0..self.max_attempts {
            tokio::time::sleep(self.delay_for(attempt)).await;
            match client.check_status().await {
                Ok(()) => {
                    debug!(worker_id = %worker_id, attempt = attempt + 1, "Worker answered health check");
                    return HealthCheckOutcome::Recovered {
                        attempts: attempt + 1,
                    };
                }
                Err(e) => {
                    warn!(
                        worker_id = %worker_id,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Worker health check failed"
                    );
                }
            }
        }
        HealthCheckOutcome::Unreachable
    }
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self::new(&HealthCheckConfig::default())
    }
}
