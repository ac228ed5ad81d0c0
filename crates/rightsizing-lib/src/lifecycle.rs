//! Dependent resource lifecycle: upserts, best-effort deletes and cleanup
//!
//! Multi-resource writes are not transactional. A failed upsert aborts the
//! caller and a later attempt converges; deletes never fail.

use crate::component::ComponentConfig;
use crate::error::{Error, Result};
use crate::models::{ComponentIdentity, PlacementSpec};
use crate::observability::RightSizingMetrics;
use crate::rules::RuleDocument;
use crate::store::{Resource, ResourceKey, ResourceKind, ResourceStore, StoreError};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

pub const SPEC_HASH_ANNOTATION: &str = "observability.open-cluster-management.io/spec-hash";
pub const ADDON_LIFECYCLE_ANNOTATION: &str = "addon.open-cluster-management.io/lifecycle";
pub const ADDON_LIFECYCLE_ADDON_MANAGER: &str = "addon-manager";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "rightsizing-controller";
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";

/// Outcome of [`upsert_dependent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Everything needed to publish one component's addon resources
#[derive(Debug, Clone)]
pub struct AddonSpec {
    pub component: ComponentIdentity,
    pub addon_name: String,
    pub template_name: String,
    pub placement_name: String,
    /// Binding namespace the placement is created in
    pub placement_namespace: String,
    pub rules: RuleDocument,
    pub placement: PlacementSpec,
}

/// Attach the visibility labels every managed resource carries
pub fn with_visibility_labels(resource: Resource, component: ComponentIdentity) -> Resource {
    resource
        .with_label(MANAGED_BY_LABEL, MANAGED_BY_VALUE)
        .with_label(COMPONENT_LABEL, component.as_str())
}

/// Create `desired`, or overwrite the content of the existing resource.
///
/// Existing labels and annotations are kept unless `desired` sets the same
/// key. A create that races another writer is retried once as an update.
pub async fn upsert_dependent(store: &dyn ResourceStore, desired: &Resource) -> Result<Upserted> {
    let target = format!("{} {}", desired.kind, desired.key);

    match store.get(desired.kind, &desired.key).await {
        Ok(existing) => {
            update_existing(store, existing, desired, &target).await?;
            info!(kind = %desired.kind, name = %desired.key, "Updated resource");
            Ok(Upserted::Updated)
        }
        Err(StoreError::NotFound) => match store.create(desired).await {
            Ok(()) => {
                info!(kind = %desired.kind, name = %desired.key, "Created resource");
                Ok(Upserted::Created)
            }
            Err(StoreError::AlreadyExists) => {
                debug!(kind = %desired.kind, name = %desired.key, "Lost create race, updating instead");
                let existing = store
                    .get(desired.kind, &desired.key)
                    .await
                    .map_err(|e| Error::store("get", &target, e))?;
                update_existing(store, existing, desired, &target).await?;
                info!(kind = %desired.kind, name = %desired.key, "Updated resource");
                Ok(Upserted::Updated)
            }
            Err(e) => Err(Error::store("create", target, e)),
        },
        Err(e) => Err(Error::store("get", target, e)),
    }
}

async fn update_existing(
    store: &dyn ResourceStore,
    mut existing: Resource,
    desired: &Resource,
    target: &str,
) -> Result<()> {
    existing.labels.extend(desired.labels.clone());
    existing.annotations.extend(desired.annotations.clone());
    existing.content = desired.content.clone();
    store
        .update(&existing)
        .await
        .map_err(|e| Error::store("update", target, e))
}

/// Delete a resource if it exists. Never fails.
pub async fn delete_if_present(store: &dyn ResourceStore, kind: ResourceKind, key: &ResourceKey) {
    match store.delete(kind, key).await {
        Ok(()) => info!(kind = %kind, name = %key, "Deleted resource"),
        Err(StoreError::NotFound) => debug!(kind = %kind, name = %key, "Resource not found, skipping delete"),
        Err(e) => {
            RightSizingMetrics::new().inc_cleanup_errors();
            error!(kind = %kind, name = %key, error = %e, "Failed to delete resource");
        }
    }
}

/// SHA-256 hex digest of a serialized rule document
pub fn spec_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Upsert the AddOnTemplate, Placement and ClusterManagementAddOn for a
/// component, in that order. Returns the template's spec hash.
pub async fn apply_addon(store: &dyn ResourceStore, addon: &AddonSpec) -> Result<String> {
    let rules = serde_json::to_value(&addon.rules)?;
    let hash = spec_hash(&addon.rules.to_json_bytes()?);

    let template = Resource::new(
        ResourceKind::AddOnTemplate,
        ResourceKey::cluster(&addon.template_name),
        json!({
            "spec": {
                "addonName": addon.addon_name,
                "agentSpec": {
                    "workload": {
                        "manifests": [rules]
                    }
                }
            }
        }),
    )
    .with_annotation(SPEC_HASH_ANNOTATION, &hash);
    upsert_dependent(store, &with_visibility_labels(template, addon.component)).await?;

    let placement = Resource::new(
        ResourceKind::Placement,
        ResourceKey::namespaced(&addon.placement_name, &addon.placement_namespace),
        json!({ "spec": addon.placement }),
    );
    upsert_dependent(store, &with_visibility_labels(placement, addon.component)).await?;

    let cmao = Resource::new(
        ResourceKind::ClusterManagementAddOn,
        ResourceKey::cluster(&addon.addon_name),
        json!({
            "spec": {
                "addOnMeta": {
                    "displayName": format!("Observability Right-Sizing ({})", addon.addon_name),
                    "description": "Deploys PrometheusRule resources for ACM right-sizing metrics collection"
                },
                "supportedConfigs": [{
                    "group": ResourceKind::AddOnTemplate.group(),
                    "resource": ResourceKind::AddOnTemplate.plural(),
                    "defaultConfig": { "name": addon.template_name }
                }],
                "installStrategy": {
                    "type": "Placements",
                    "placements": [{
                        "name": addon.placement_name,
                        "namespace": addon.placement_namespace,
                        "rolloutStrategy": { "type": "All" }
                    }]
                }
            }
        }),
    )
    .with_annotation(ADDON_LIFECYCLE_ANNOTATION, ADDON_LIFECYCLE_ADDON_MANAGER);
    upsert_dependent(store, &with_visibility_labels(cmao, addon.component)).await?;

    info!(
        component = %addon.component,
        addon = %addon.addon_name,
        namespace = %addon.placement_namespace,
        spec_hash = %hash,
        "Addon resources applied"
    );
    Ok(hash)
}

/// Remove a component's resources, best effort.
///
/// The addon, template and placement (in `namespace`) always go. The
/// configuration record in `config_namespace` is kept when `soft` is set.
pub async fn cleanup_component(
    store: &dyn ResourceStore,
    config: &ComponentConfig,
    namespace: &str,
    config_namespace: &str,
    soft: bool,
) {
    let names = &config.names;
    info!(
        component = %config.identity,
        namespace = %namespace,
        config_namespace = %config_namespace,
        soft,
        "Cleaning up component resources"
    );

    delete_if_present(store, ResourceKind::ClusterManagementAddOn, &ResourceKey::cluster(names.addon)).await;
    delete_if_present(store, ResourceKind::AddOnTemplate, &ResourceKey::cluster(names.template)).await;
    delete_if_present(
        store,
        ResourceKind::Placement,
        &ResourceKey::namespaced(names.placement, namespace),
    )
    .await;

    if !soft {
        delete_if_present(
            store,
            ResourceKind::ConfigRecord,
            &ResourceKey::namespaced(names.config_record, config_namespace),
        )
        .await;
    }
}
