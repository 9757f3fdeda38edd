//! Parsing of the element listings read from the workspace.

use indexmap::IndexMap;
use serde_json::Value;

use crate::constants::JSON_EXTENSION;
use crate::error::{DistributorError, Result};
use crate::models::{ChainedFile, JsonLineModel};

fn element_name(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Flat JSON array of element ids; anything else yields no element
pub fn parse_file_listing(bytes: &[u8]) -> Result<Vec<String>> {
    let value: Value = serde_json::from_slice(bytes)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(element_name).collect(),
        _ => Vec::new(),
    })
}

/// Ordered levels of a multi-level file, ids suffixed with `.json`
pub fn parse_levels(bytes: &[u8]) -> Result<Vec<(String, Vec<String>)>> {
    let levels: IndexMap<String, Value> = serde_json::from_slice(bytes)?;
    Ok(levels
        .into_iter()
        .map(|(level, ids)| {
            let ids = match ids {
                Value::Array(items) => items
                    .iter()
                    .filter_map(element_name)
                    .map(|id| format!("{id}{JSON_EXTENSION}"))
                    .collect(),
                _ => Vec::new(),
            };
            (level, ids)
        })
        .collect())
}

pub fn parse_chained_file(bytes: &[u8]) -> Result<ChainedFile> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Element id of one JSONL record; blank lines and records without id yield none
pub fn parse_json_line(line: &str, line_number: usize) -> Result<Option<String>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let model: JsonLineModel = serde_json::from_str(line).map_err(|e| {
        DistributorError::InvalidParameter(format!("invalid JSON line {line_number}: {e}"))
    })?;
    Ok(model.id)
}
