//! # Distributor Index
//!
//! The checkpoint persisted after every dispatched batch so that a paused or
//! crashed distribution can resume where it stopped.

use serde::{Deserialize, Serialize};

use super::status::ItemStatus;

/// Resumable position of a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributorIndex {
    /// Current level name, the linked page name, or `NOLEVEL`
    pub level: String,
    /// Number of fully settled elements within the level
    pub offset: usize,
    pub item_status: ItemStatus,
    pub request_id: String,
    pub step_id: String,
    /// Elements of the last batch whose tasks did not complete
    #[serde(default)]
    pub remaining_elements: Vec<String>,
    #[serde(default)]
    pub level_finished: bool,
}

impl DistributorIndex {
    pub fn new(
        level: impl Into<String>,
        offset: usize,
        item_status: ItemStatus,
        request_id: impl Into<String>,
        step_id: impl Into<String>,
        remaining_elements: Vec<String>,
    ) -> Self {
        Self {
            level: level.into(),
            offset,
            item_status,
            request_id: request_id.into(),
            step_id: step_id.into(),
            remaining_elements,
            level_finished: false,
        }
    }

    pub fn with_level_finished(mut self, level_finished: bool) -> Self {
        self.level_finished = level_finished;
        self
    }
}
