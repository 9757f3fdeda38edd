//! # Item Status Aggregation
//!
//! `StatusCode` is the ordered severity model and `ItemStatus` the hierarchical
//! outcome record merged by the distributor as worker responses come back.
//!
//! Merging always keeps the worse severity, so the global status of a parent is
//! never lower than the status of any of its children.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Number of severity levels tracked by a status meter
pub const STATUS_LEVELS: usize = 5;

/// Ordered severity: `Unknown < Ok < Warning < Ko < Fatal`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    #[default]
    Unknown,
    Ok,
    Warning,
    Ko,
    Fatal,
}

impl StatusCode {
    pub const ALL: [StatusCode; STATUS_LEVELS] = [
        StatusCode::Unknown,
        StatusCode::Ok,
        StatusCode::Warning,
        StatusCode::Ko,
        StatusCode::Fatal,
    ];

    /// Index of this severity in a status meter
    pub fn level(&self) -> usize {
        *self as usize
    }

    pub fn is_greater_or_equal_to_ko(&self) -> bool {
        *self >= StatusCode::Ko
    }

    pub fn is_greater_or_equal_to_fatal(&self) -> bool {
        *self >= StatusCode::Fatal
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::Ok => "OK",
            StatusCode::Warning => "WARNING",
            StatusCode::Ko => "KO",
            StatusCode::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatusCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(StatusCode::Unknown),
            "OK" => Ok(StatusCode::Ok),
            "WARNING" => Ok(StatusCode::Warning),
            "KO" => Ok(StatusCode::Ko),
            "FATAL" => Ok(StatusCode::Fatal),
            _ => Err(format!("Invalid status code: {s}")),
        }
    }
}

/// Hierarchical outcome of an item, a worker call, or a whole step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatus {
    item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default)]
    global_status: StatusCode,
    #[serde(default)]
    status_meter: [u64; STATUS_LEVELS],
    #[serde(default)]
    items_status: IndexMap<String, ItemStatus>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    data: Map<String, Value>,
}

impl ItemStatus {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            message: None,
            global_status: StatusCode::Unknown,
            status_meter: [0; STATUS_LEVELS],
            items_status: IndexMap::new(),
            data: Map::new(),
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn global_status(&self) -> StatusCode {
        self.global_status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn status_meter(&self) -> &[u64; STATUS_LEVELS] {
        &self.status_meter
    }

    /// Count recorded for one severity
    pub fn count(&self, code: StatusCode) -> u64 {
        self.status_meter[code.level()]
    }

    pub fn items_status(&self) -> &IndexMap<String, ItemStatus> {
        &self.items_status
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemStatus> {
        self.items_status.get(item_id)
    }

    /// Remove a child entry, keeping the insertion order of the others
    pub fn remove_item(&mut self, item_id: &str) -> Option<ItemStatus> {
        self.items_status.shift_remove(item_id)
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Record one occurrence of `code`
    pub fn increment(self, code: StatusCode) -> Self {
        self.increment_by(code, 1)
    }

    /// Record `count` occurrences of `code`, raising the global status if needed
    pub fn increment_by(mut self, code: StatusCode, count: u64) -> Self {
        self.record(code, count);
        self
    }

    /// In-place variant of [`increment`](Self::increment)
    pub fn record(&mut self, code: StatusCode, count: u64) {
        self.status_meter[code.level()] += count;
        self.global_status = self.global_status.max(code);
    }

    /// Attach `details` as the child `item_id`, merging into an existing child
    pub fn set_item_status(mut self, item_id: impl Into<String>, details: ItemStatus) -> Self {
        self.put_item_status(item_id, details);
        self
    }

    /// In-place variant of [`set_item_status`](Self::set_item_status)
    pub fn put_item_status(&mut self, item_id: impl Into<String>, details: ItemStatus) {
        let item_id = item_id.into();
        self.global_status = self.global_status.max(details.global_status);
        add_meters(&mut self.status_meter, &details.status_meter);
        extend_data(&mut self.data, &details.data);

        match self.items_status.get_mut(&item_id) {
            Some(existing) => existing.combine(details),
            None => {
                self.items_status.insert(item_id, details);
            }
        }
    }

    /// Fold a composite status (typically one worker response) into this one
    ///
    /// The composite counts once at its global severity and its children are
    /// merged key by key.
    pub fn merge(&mut self, composite: ItemStatus) {
        self.record(composite.global_status, 1);
        extend_data(&mut self.data, &composite.data);

        for (key, value) in composite.items_status {
            self.global_status = self.global_status.max(value.global_status);
            match self.items_status.get_mut(&key) {
                Some(existing) => existing.combine(value),
                None => {
                    self.items_status.insert(key, value);
                }
            }
        }
    }

    /// Sum meters, keep the worse severity and merge children recursively
    fn combine(&mut self, other: ItemStatus) {
        add_meters(&mut self.status_meter, &other.status_meter);
        self.global_status = self.global_status.max(other.global_status);
        if other.global_status.is_greater_or_equal_to_ko() {
            extend_data(&mut self.data, &other.data);
        }
        if self.message.is_none() {
            self.message = other.message;
        }

        for (key, value) in other.items_status {
            if key == self.item_id {
                continue;
            }
            match self.items_status.get_mut(&key) {
                Some(existing) => existing.combine(value),
                None => {
                    self.items_status.insert(key, value);
                }
            }
        }
    }

    /// Whether the workflow must stop after this status
    pub fn shall_stop(&self, blocking: bool) -> bool {
        self.global_status.is_greater_or_equal_to_fatal()
            || (blocking && self.global_status.is_greater_or_equal_to_ko())
    }

    /// Human readable meter, e.g. `" OK:3 KO:1"`
    pub fn status_meter_message(&self) -> String {
        StatusCode::ALL
            .iter()
            .filter(|code| self.status_meter[code.level()] > 0)
            .map(|code| format!(" {}:{}", code, self.status_meter[code.level()]))
            .collect()
    }

    /// Highest severity found among the direct children
    pub fn max_child_status(&self) -> Option<StatusCode> {
        self.items_status.values().map(|s| s.global_status).max()
    }
}

fn add_meters(target: &mut [u64; STATUS_LEVELS], other: &[u64; STATUS_LEVELS]) {
    for (t, o) in target.iter_mut().zip(other.iter()) {
        *t += o;
    }
}

fn extend_data(target: &mut Map<String, Value>, other: &Map<String, Value>) {
    for (key, value) in other {
        target.insert(key.clone(), value.clone());
    }
}
