//! # Resilience Module
//!
//! Bounded health polling of workers whose calls failed, so a dead worker is
//! unregistered instead of stalling its family.

pub mod health_check;

pub use health_check::{HealthCheckOutcome, HealthCheckPolicy};
