//! Rule document types (PrometheusRule wire format)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RULE_API_VERSION: &str = "monitoring.coreos.com/v1";
pub const RULE_KIND: &str = "PrometheusRule";

/// A generated recording-rule document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: DocumentMeta,
    pub spec: RuleDocumentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocumentSpec {
    pub groups: Vec<RuleGroup>,
}

/// Rules evaluated together at one interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub rules: Vec<Rule>,
}

/// A single recording rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub record: String,
    pub expr: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl RuleDocument {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, groups: Vec<RuleGroup>) -> Self {
        Self {
            api_version: RULE_API_VERSION.to_string(),
            kind: RULE_KIND.to_string(),
            metadata: DocumentMeta {
                name: name.into(),
                namespace: namespace.into(),
            },
            spec: RuleDocumentSpec { groups },
        }
    }

    pub fn groups(&self) -> &[RuleGroup] {
        &self.spec.groups
    }

    pub fn group(&self, name: &str) -> Option<&RuleGroup> {
        self.spec.groups.iter().find(|g| g.name == name)
    }

    /// Find a record by name across all groups
    pub fn record(&self, record: &str) -> Option<&Rule> {
        self.spec
            .groups
            .iter()
            .flat_map(|g| g.rules.iter())
            .find(|r| r.record == record)
    }

    /// Total number of records in the document
    pub fn record_count(&self) -> usize {
        self.spec.groups.iter().map(|g| g.rules.len()).sum()
    }

    /// Serialized form used for embedding and change detection
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
