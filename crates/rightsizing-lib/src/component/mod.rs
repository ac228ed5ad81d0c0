//! Per-component wiring
//!
//! A [`ComponentConfig`] ties a component identity to its fixed resource
//! names, its rule variant, its default configuration and the
//! [`ApplyChanges`] implementation that publishes a decoded record.

pub mod namespace;
pub mod virtualization;

use crate::error::{Error, Result};
use crate::lifecycle::{apply_addon, AddonSpec};
use crate::models::{ComponentIdentity, ConfigRecord, DEFAULT_BINDING_NAMESPACE};
use crate::observability::RightSizingMetrics;
use crate::rules::{generate, RuleVariant};
use crate::store::ResourceStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Supplies the data used to seed a missing configuration record
pub type DefaultConfigFn = fn() -> Result<BTreeMap<String, String>>;

/// Fixed names of a component's resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNames {
    pub config_record: &'static str,
    pub placement: &'static str,
    pub addon: &'static str,
    pub template: &'static str,
}

impl ResourceNames {
    pub fn for_identity(identity: ComponentIdentity) -> Self {
        match identity {
            ComponentIdentity::Namespace => namespace::NAMES,
            ComponentIdentity::Virtualization => virtualization::NAMES,
        }
    }
}

/// Publishes a decoded configuration record
#[async_trait]
pub trait ApplyChanges: Send + Sync {
    async fn apply(&self, record: &ConfigRecord, binding_namespace: &str) -> Result<()>;
}

/// Static configuration of one component
#[derive(Clone)]
pub struct ComponentConfig {
    pub identity: ComponentIdentity,
    pub names: ResourceNames,
    pub variant: RuleVariant,
    pub default_namespace: String,
    pub default_config: DefaultConfigFn,
    pub applier: Arc<dyn ApplyChanges>,
}

impl ComponentConfig {
    pub fn new(
        identity: ComponentIdentity,
        names: ResourceNames,
        variant: RuleVariant,
        store: Arc<dyn ResourceStore>,
    ) -> Self {
        Self {
            identity,
            names,
            variant,
            default_namespace: DEFAULT_BINDING_NAMESPACE.to_string(),
            default_config: default_config_data,
            applier: Arc::new(AddonApplier::new(store, identity, names, variant)),
        }
    }

    /// Replace the applier, keeping everything else
    pub fn with_applier(mut self, applier: Arc<dyn ApplyChanges>) -> Self {
        self.applier = applier;
        self
    }

    /// Build the config for a component identity
    pub fn for_identity(identity: ComponentIdentity, store: Arc<dyn ResourceStore>) -> Self {
        match identity {
            ComponentIdentity::Namespace => namespace::config(store),
            ComponentIdentity::Virtualization => virtualization::config(store),
        }
    }
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("identity", &self.identity)
            .field("names", &self.names)
            .field("variant", &self.variant)
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}

/// Rule variant generated for a component
pub fn rule_variant(identity: ComponentIdentity) -> RuleVariant {
    match identity {
        ComponentIdentity::Namespace => RuleVariant::Workload,
        ComponentIdentity::Virtualization => RuleVariant::VirtualMachine,
    }
}

/// Seed data shared by both components
pub fn default_config_data() -> Result<BTreeMap<String, String>> {
    ConfigRecord::seed().to_data()
}

/// Generates the rule document and publishes it as addon resources
pub struct AddonApplier {
    store: Arc<dyn ResourceStore>,
    identity: ComponentIdentity,
    names: ResourceNames,
    variant: RuleVariant,
    metrics: RightSizingMetrics,
}

impl AddonApplier {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        identity: ComponentIdentity,
        names: ResourceNames,
        variant: RuleVariant,
    ) -> Self {
        Self {
            store,
            identity,
            names,
            variant,
            metrics: RightSizingMetrics::new(),
        }
    }
}

#[async_trait]
impl ApplyChanges for AddonApplier {
    async fn apply(&self, record: &ConfigRecord, binding_namespace: &str) -> Result<()> {
        let rules = generate(self.variant, &record.rule_config).map_err(Error::Validation)?;
        self.metrics
            .set_rule_records(self.identity.as_str(), rules.record_count() as i64);

        let addon = AddonSpec {
            component: self.identity,
            addon_name: self.names.addon.to_string(),
            template_name: self.names.template.to_string(),
            placement_name: self.names.placement.to_string(),
            placement_namespace: binding_namespace.to_string(),
            rules,
            placement: record.placement.spec.clone(),
        };
        apply_addon(self.store.as_ref(), &addon).await?;
        Ok(())
    }
}
