//! Process metadata stores receiving step progress counters.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::client::ProcessMetadataStore;
use crate::error::StoreError;

/// Element counters of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepProgress {
    /// Elements announced for processing
    pub total: usize,
    /// Elements a worker answered for
    pub processed: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryProcessMetadataStore {
    progress: DashMap<(String, String), StepProgress>,
}

impl InMemoryProcessMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self, operation_id: &str, step_id: &str) -> StepProgress {
        self.progress
            .get(&(operation_id.to_string(), step_id.to_string()))
            .map(|entry| *entry)
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessMetadataStore for InMemoryProcessMetadataStore {
    async fn update_step(
        &self,
        operation_id: &str,
        step_id: &str,
        delta: usize,
        completed: bool,
        _tenant_id: i32,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .progress
            .entry((operation_id.to_string(), step_id.to_string()))
            .or_default();
        if completed {
            entry.processed += delta;
        } else {
            entry.total += delta;
        }
        Ok(())
    }
}

/// Discards progress updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProcessMetadataStore;

#[async_trait]
impl ProcessMetadataStore for NoopProcessMetadataStore {
    async fn update_step(
        &self,
        _operation_id: &str,
        _step_id: &str,
        _delta: usize,
        _completed: bool,
        _tenant_id: i32,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}
