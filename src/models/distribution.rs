//! # Distribution Descriptors
//!
//! Where the element names of a step come from, and the page/record formats
//! read by the linked-file and JSONL kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::StatusCode;
use crate::error::{DistributorError, Result};

/// Element source of a step, one variant per enumeration strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionKind {
    /// One logical element; the container itself when no element is given
    Single {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<String>,
    },
    /// Every entry of a directory in the workspace container
    DirectoryListing { element: String },
    /// A JSON array of element ids stored in one blob
    FileListing { element: String },
    /// A JSON object of level name to element ids, processed in key order
    MultiLevelFile { element: String },
    /// First page of a chain of `ChainedFile` pages
    LinkedFiles { element: String },
    /// A newline delimited stream of `JsonLineModel` records
    JsonlStream { element: String },
}

impl DistributionKind {
    pub fn name(&self) -> &'static str {
        match self {
            DistributionKind::Single { .. } => "SINGLE",
            DistributionKind::DirectoryListing { .. } => "DIRECTORY_LISTING",
            DistributionKind::FileListing { .. } => "FILE_LISTING",
            DistributionKind::MultiLevelFile { .. } => "MULTI_LEVEL_FILE",
            DistributionKind::LinkedFiles { .. } => "LINKED_FILES",
            DistributionKind::JsonlStream { .. } => "JSONL_STREAM",
        }
    }
}

fn default_status_on_empty() -> StatusCode {
    StatusCode::Ko
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    #[serde(flatten)]
    kind: DistributionKind,
    /// Elements per worker call, overriding the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bulk_size: Option<usize>,
    #[serde(default = "default_status_on_empty")]
    status_on_empty_distribution: StatusCode,
}

impl Distribution {
    pub fn new(kind: DistributionKind) -> Self {
        Self {
            kind,
            bulk_size: None,
            status_on_empty_distribution: default_status_on_empty(),
        }
    }

    pub fn single() -> Self {
        Self::new(DistributionKind::Single { element: None })
    }

    pub fn directory_listing(element: impl Into<String>) -> Self {
        Self::new(DistributionKind::DirectoryListing {
            element: element.into(),
        })
    }

    pub fn file_listing(element: impl Into<String>) -> Self {
        Self::new(DistributionKind::FileListing {
            element: element.into(),
        })
    }

    pub fn multi_level_file(element: impl Into<String>) -> Self {
        Self::new(DistributionKind::MultiLevelFile {
            element: element.into(),
        })
    }

    pub fn linked_files(element: impl Into<String>) -> Self {
        Self::new(DistributionKind::LinkedFiles {
            element: element.into(),
        })
    }

    pub fn jsonl_stream(element: impl Into<String>) -> Self {
        Self::new(DistributionKind::JsonlStream {
            element: element.into(),
        })
    }

    pub fn with_bulk_size(mut self, bulk_size: usize) -> Self {
        self.bulk_size = Some(bulk_size);
        self
    }

    pub fn with_status_on_empty(mut self, status: StatusCode) -> Self {
        self.status_on_empty_distribution = status;
        self
    }

    pub fn kind(&self) -> &DistributionKind {
        &self.kind
    }

    pub fn bulk_size(&self) -> Option<usize> {
        self.bulk_size
    }

    pub fn status_on_empty(&self) -> StatusCode {
        self.status_on_empty_distribution
    }

    /// Element reference, if any
    pub fn element(&self) -> Option<&str> {
        match &self.kind {
            DistributionKind::Single { element } => element.as_deref(),
            DistributionKind::DirectoryListing { element }
            | DistributionKind::FileListing { element }
            | DistributionKind::MultiLevelFile { element }
            | DistributionKind::LinkedFiles { element }
            | DistributionKind::JsonlStream { element } => Some(element.as_str()),
        }
    }

    /// Reject descriptors that cannot be resolved
    pub fn validate(&self) -> Result<()> {
        if self.bulk_size == Some(0) {
            return Err(DistributorError::InvalidParameter(
                "distribution bulk size must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.kind, DistributionKind::Single { .. })
            && self.element().map_or(true, |e| e.trim().is_empty())
        {
            return Err(DistributorError::InvalidParameter(format!(
                "{} distribution requires an element reference",
                self.kind.name()
            )));
        }
        Ok(())
    }
}

/// One page of a `LINKED_FILES` distribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainedFile {
    #[serde(default)]
    pub elements: Vec<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_file: Option<String>,
}

impl ChainedFile {
    /// Element ids of the page, null entries dropped
    pub fn element_ids(&self) -> Vec<String> {
        self.elements.iter().flatten().cloned().collect()
    }
}

/// One record of a `JSONL_STREAM` distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLineModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distrib_group: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}
