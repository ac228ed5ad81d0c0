//! Cluster status of each component's resources

use anyhow::{Context, Result};
use colored::Colorize;
use rightsizing_lib::component::ResourceNames;
use rightsizing_lib::lifecycle::SPEC_HASH_ANNOTATION;
use rightsizing_lib::{
    ComponentIdentity, KubeStore, Resource, ResourceKey, ResourceKind, ResourceStore, StoreError,
    DEFAULT_BINDING_NAMESPACE,
};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{color_presence, print_table, OutputFormat};

/// Observed state of one managed resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceState {
    pub component: ComponentIdentity,
    pub kind: &'static str,
    pub name: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

async fn lookup(store: &dyn ResourceStore, kind: ResourceKind, key: &ResourceKey) -> Result<Option<Resource>> {
    match store.get(kind, key).await {
        Ok(resource) => Ok(Some(resource)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to get {} {}", kind, key)),
    }
}

/// Namespace the addon's install strategy points its placement at
fn placement_namespace(addon: &Resource) -> Option<String> {
    addon
        .spec()?
        .pointer("/installStrategy/placements/0/namespace")?
        .as_str()
        .map(str::to_string)
}

fn short_hash(hash: &str) -> String {
    format!("spec-hash {}", hash.chars().take(12).collect::<String>())
}

fn state(component: ComponentIdentity, kind: ResourceKind, key: &ResourceKey, found: &Option<Resource>) -> ResourceState {
    ResourceState {
        component,
        kind: kind.as_str(),
        name: key.to_string(),
        present: found.is_some(),
        detail: None,
    }
}

/// Inspect every resource a component owns.
///
/// The placement is looked up in the namespace the addon references, or
/// the default binding namespace when the addon is absent.
pub async fn inspect_component(
    store: &dyn ResourceStore,
    component: ComponentIdentity,
    config_namespace: &str,
) -> Result<Vec<ResourceState>> {
    let names = ResourceNames::for_identity(component);
    let mut states = Vec::with_capacity(ResourceKind::ALL.len());

    let record_key = ResourceKey::namespaced(names.config_record, config_namespace);
    let record = lookup(store, ResourceKind::ConfigRecord, &record_key).await?;
    states.push(state(component, ResourceKind::ConfigRecord, &record_key, &record));

    let addon_key = ResourceKey::cluster(names.addon);
    let addon = lookup(store, ResourceKind::ClusterManagementAddOn, &addon_key).await?;
    states.push(state(component, ResourceKind::ClusterManagementAddOn, &addon_key, &addon));

    let template_key = ResourceKey::cluster(names.template);
    let template = lookup(store, ResourceKind::AddOnTemplate, &template_key).await?;
    let mut template_state = state(component, ResourceKind::AddOnTemplate, &template_key, &template);
    template_state.detail = template
        .as_ref()
        .and_then(|t| t.annotations.get(SPEC_HASH_ANNOTATION))
        .map(|hash| short_hash(hash));
    states.push(template_state);

    let binding = addon
        .as_ref()
        .and_then(placement_namespace)
        .unwrap_or_else(|| DEFAULT_BINDING_NAMESPACE.to_string());
    let placement_key = ResourceKey::namespaced(names.placement, binding);
    let placement = lookup(store, ResourceKind::Placement, &placement_key).await?;
    states.push(state(component, ResourceKind::Placement, &placement_key, &placement));

    Ok(states)
}

/// Print the status of every component's resources
pub async fn show_status(store: &KubeStore, config_namespace: &str, format: OutputFormat) -> Result<()> {
    let mut states = Vec::new();
    for component in ComponentIdentity::ALL {
        states.extend(inspect_component(store, component, config_namespace).await?);
    }

    if matches!(format, OutputFormat::Table) {
        println!("{}", "Right-Sizing Resources".bold());
        println!("Config namespace: {}", config_namespace.cyan());
        println!();
    }

    let rows: Vec<StatusRow> = states
        .iter()
        .map(|s| StatusRow {
            component: s.component.to_string(),
            kind: s.kind.to_string(),
            name: s.name.clone(),
            status: color_presence(s.present),
            detail: s.detail.clone().unwrap_or_default(),
        })
        .collect();

    print_table(&states, rows, format)
}
