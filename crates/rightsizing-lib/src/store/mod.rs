//! Resource store abstraction
//!
//! The reconciler only talks to the cluster through [`ResourceStore`]. Two
//! implementations are provided:
//! - [`InMemoryStore`] for tests and offline previews
//! - [`KubeStore`] backed by the Kubernetes API

mod cluster;
mod memory;

pub use cluster::KubeStore;
pub use memory::{InMemoryStore, StoreOp};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors returned by a resource store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Kinds of resource the reconciler manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The source-of-truth configuration record (a ConfigMap)
    ConfigRecord,
    Placement,
    AddOnTemplate,
    ClusterManagementAddOn,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::ConfigRecord,
        ResourceKind::Placement,
        ResourceKind::AddOnTemplate,
        ResourceKind::ClusterManagementAddOn,
    ];

    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigRecord => "ConfigMap",
            ResourceKind::Placement => "Placement",
            ResourceKind::AddOnTemplate => "AddOnTemplate",
            ResourceKind::ClusterManagementAddOn => "ClusterManagementAddOn",
        }
    }

    pub fn group(&self) -> &'static str {
        match self {
            ResourceKind::ConfigRecord => "",
            ResourceKind::Placement => "cluster.open-cluster-management.io",
            ResourceKind::AddOnTemplate | ResourceKind::ClusterManagementAddOn => {
                "addon.open-cluster-management.io"
            }
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            ResourceKind::ConfigRecord => "v1",
            ResourceKind::Placement => "v1beta1",
            ResourceKind::AddOnTemplate | ResourceKind::ClusterManagementAddOn => "v1alpha1",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::ConfigRecord => "configmaps",
            ResourceKind::Placement => "placements",
            ResourceKind::AddOnTemplate => "addontemplates",
            ResourceKind::ClusterManagementAddOn => "clustermanagementaddons",
        }
    }

    pub fn is_namespaced(&self) -> bool {
        matches!(self, ResourceKind::ConfigRecord | ResourceKind::Placement)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a stored resource. Cluster-scoped resources have no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub name: String,
    pub namespace: Option<String>,
}

impl ResourceKey {
    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A stored resource.
///
/// `content` holds every top-level field except metadata: `data` for a
/// configuration record, `spec` for the addon resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub key: ResourceKey,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub content: serde_json::Value,
}

impl Resource {
    pub fn new(kind: ResourceKind, key: ResourceKey, content: serde_json::Value) -> Self {
        Self {
            kind,
            key,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            content,
        }
    }

    /// Configuration record wrapping `data`
    pub fn config_record(key: ResourceKey, data: &BTreeMap<String, String>) -> Self {
        Self::new(
            ResourceKind::ConfigRecord,
            key,
            serde_json::json!({ "data": data }),
        )
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// String data of a configuration record. Non-string values are skipped.
    pub fn data(&self) -> BTreeMap<String, String> {
        self.content
            .get("data")
            .and_then(|d| d.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn spec(&self) -> Option<&serde_json::Value> {
        self.content.get("spec")
    }
}

/// Storage backend for managed resources
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, kind: ResourceKind, key: &ResourceKey) -> Result<Resource, StoreError>;

    /// Create a resource; fails with `AlreadyExists` if the key is taken
    async fn create(&self, resource: &Resource) -> Result<(), StoreError>;

    /// Replace an existing resource; fails with `NotFound` if absent
    async fn update(&self, resource: &Resource) -> Result<(), StoreError>;

    async fn delete(&self, kind: ResourceKind, key: &ResourceKey) -> Result<(), StoreError>;
}
