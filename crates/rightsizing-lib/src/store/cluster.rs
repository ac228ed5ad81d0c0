//! Kubernetes-backed resource store
//!
//! Configuration records are typed ConfigMaps. The Open Cluster Management
//! resources have no generated bindings and go through `DynamicObject`.

use super::{Resource, ResourceKey, ResourceKind, ResourceStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use std::collections::BTreeMap;
use tracing::debug;

/// Resource store talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the in-cluster or kubeconfig defaults
    pub async fn try_default() -> Result<Self, StoreError> {
        let client = Client::try_default().await.map_err(map_kube_error)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// API resource descriptor for a dynamic kind
    pub fn api_resource(kind: ResourceKind) -> ApiResource {
        let gvk = GroupVersionKind::gvk(kind.group(), kind.version(), kind.as_str());
        ApiResource::from_gvk_with_plural(&gvk, kind.plural())
    }

    fn config_maps(&self, key: &ResourceKey) -> Result<Api<ConfigMap>, StoreError> {
        let ns = require_namespace(ResourceKind::ConfigRecord, key)?;
        Ok(Api::namespaced(self.client.clone(), ns))
    }

    fn dynamic(&self, kind: ResourceKind, key: &ResourceKey) -> Result<Api<DynamicObject>, StoreError> {
        let ar = Self::api_resource(kind);
        if kind.is_namespaced() {
            let ns = require_namespace(kind, key)?;
            Ok(Api::namespaced_with(self.client.clone(), ns, &ar))
        } else {
            Ok(Api::all_with(self.client.clone(), &ar))
        }
    }
}

fn require_namespace(kind: ResourceKind, key: &ResourceKey) -> Result<&str, StoreError> {
    key.namespace
        .as_deref()
        .ok_or_else(|| StoreError::Backend(format!("{} {} requires a namespace", kind, key.name)))
}

fn map_kube_error(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => StoreError::NotFound,
        kube::Error::Api(resp) if resp.code == 409 => StoreError::AlreadyExists,
        other => StoreError::Backend(other.to_string()),
    }
}

/// Lay the resource's identity, labels and annotations over `base`.
///
/// On replace `base` is the live metadata, so the resourceVersion,
/// finalizers, owner references and anything else set by other
/// controllers are sent back unchanged.
fn metadata(resource: &Resource, base: ObjectMeta) -> ObjectMeta {
    let non_empty = |map: &BTreeMap<String, String>| (!map.is_empty()).then(|| map.clone());
    ObjectMeta {
        name: Some(resource.key.name.clone()),
        namespace: resource
            .kind
            .is_namespaced()
            .then(|| resource.key.namespace.clone())
            .flatten(),
        labels: non_empty(&resource.labels),
        annotations: non_empty(&resource.annotations),
        managed_fields: None,
        ..base
    }
}

fn from_config_map(key: &ResourceKey, cm: ConfigMap) -> Resource {
    let data = cm.data.unwrap_or_default();
    let mut resource = Resource::config_record(key.clone(), &data);
    resource.labels = cm.metadata.labels.unwrap_or_default();
    resource.annotations = cm.metadata.annotations.unwrap_or_default();
    resource
}

fn to_config_map(resource: &Resource, base: ConfigMap) -> ConfigMap {
    ConfigMap {
        metadata: metadata(resource, base.metadata),
        data: Some(resource.data()),
        ..base
    }
}

fn from_dynamic(kind: ResourceKind, key: &ResourceKey, obj: DynamicObject) -> Resource {
    let mut resource = Resource::new(kind, key.clone(), obj.data);
    resource.labels = obj.metadata.labels.unwrap_or_default();
    resource.annotations = obj.metadata.annotations.unwrap_or_default();
    resource
}

fn to_dynamic(resource: &Resource, base: ObjectMeta) -> DynamicObject {
    let ar = KubeStore::api_resource(resource.kind);
    let mut obj = DynamicObject::new(&resource.key.name, &ar).data(resource.content.clone());
    obj.metadata = metadata(resource, base);
    obj
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get(&self, kind: ResourceKind, key: &ResourceKey) -> Result<Resource, StoreError> {
        match kind {
            ResourceKind::ConfigRecord => {
                let cm = self
                    .config_maps(key)?
                    .get(&key.name)
                    .await
                    .map_err(map_kube_error)?;
                Ok(from_config_map(key, cm))
            }
            _ => {
                let obj = self
                    .dynamic(kind, key)?
                    .get(&key.name)
                    .await
                    .map_err(map_kube_error)?;
                Ok(from_dynamic(kind, key, obj))
            }
        }
    }

    async fn create(&self, resource: &Resource) -> Result<(), StoreError> {
        let pp = PostParams::default();
        match resource.kind {
            ResourceKind::ConfigRecord => {
                self.config_maps(&resource.key)?
                    .create(&pp, &to_config_map(resource, ConfigMap::default()))
                    .await
                    .map_err(map_kube_error)?;
            }
            kind => {
                self.dynamic(kind, &resource.key)?
                    .create(&pp, &to_dynamic(resource, ObjectMeta::default()))
                    .await
                    .map_err(map_kube_error)?;
            }
        }
        debug!(kind = %resource.kind, name = %resource.key, "Created resource");
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> Result<(), StoreError> {
        // Replace is built on the live object so metadata owned by others survives.
        let pp = PostParams::default();
        let name = &resource.key.name;
        match resource.kind {
            ResourceKind::ConfigRecord => {
                let api = self.config_maps(&resource.key)?;
                let live = api.get(name).await.map_err(map_kube_error)?;
                let desired = to_config_map(resource, live);
                api.replace(name, &pp, &desired)
                    .await
                    .map_err(map_kube_error)?;
            }
            kind => {
                let api = self.dynamic(kind, &resource.key)?;
                let live = api.get(name).await.map_err(map_kube_error)?;
                let desired = to_dynamic(resource, live.metadata);
                api.replace(name, &pp, &desired)
                    .await
                    .map_err(map_kube_error)?;
            }
        }
        debug!(kind = %resource.kind, name = %resource.key, "Updated resource");
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, key: &ResourceKey) -> Result<(), StoreError> {
        let dp = DeleteParams::default();
        match kind {
            ResourceKind::ConfigRecord => {
                self.config_maps(key)?
                    .delete(&key.name, &dp)
                    .await
                    .map_err(map_kube_error)?;
            }
            _ => {
                self.dynamic(kind, key)?
                    .delete(&key.name, &dp)
                    .await
                    .map_err(map_kube_error)?;
            }
        }
        Ok(())
    }
}
