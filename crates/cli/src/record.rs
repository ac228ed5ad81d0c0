//! Configuration record files
//!
//! A file holds either a full ConfigMap manifest or a bare map of the
//! record's data keys. Values may be YAML block strings, as stored in the
//! cluster, or inline mappings for hand-written files.

use rightsizing_lib::ConfigRecord;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as YAML: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path} must contain a mapping")]
    NotAMapping { path: String },

    #[error("{path}: data key {key:?} must be a string")]
    BadKey { path: String, key: Value },

    #[error("{path}: failed to re-encode value of {key}: {source}")]
    Encode {
        path: String,
        key: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Record(#[from] rightsizing_lib::Error),
}

/// Read and decode a configuration record file
pub fn load_record(path: &Path) -> Result<ConfigRecord, RecordFileError> {
    let label = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| RecordFileError::Read {
        path: label.clone(),
        source,
    })?;
    let data = parse_record_data(&label, &content)?;
    Ok(ConfigRecord::from_data(&label, &data)?)
}

/// Extract the record data map from file content
pub fn parse_record_data(label: &str, content: &str) -> Result<BTreeMap<String, String>, RecordFileError> {
    let root: Value = serde_yaml::from_str(content).map_err(|source| RecordFileError::Parse {
        path: label.to_string(),
        source,
    })?;
    let root = root.as_mapping().ok_or_else(|| RecordFileError::NotAMapping {
        path: label.to_string(),
    })?;

    let data = if is_manifest(root) {
        match root.get("data") {
            Some(Value::Mapping(data)) => data,
            Some(Value::Null) | None => return Ok(BTreeMap::new()),
            Some(_) => {
                return Err(RecordFileError::NotAMapping {
                    path: format!("{} data", label),
                })
            }
        }
    } else {
        root
    };

    let mut out = BTreeMap::new();
    for (key, value) in data {
        let key = key.as_str().ok_or_else(|| RecordFileError::BadKey {
            path: label.to_string(),
            key: key.clone(),
        })?;
        let value = match value {
            Value::String(s) => s.clone(),
            other => serde_yaml::to_string(other).map_err(|source| RecordFileError::Encode {
                path: label.to_string(),
                key: key.to_string(),
                source,
            })?,
        };
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

fn is_manifest(root: &Mapping) -> bool {
    root.contains_key("kind") || root.contains_key("apiVersion") || root.contains_key("metadata")
}
