//! Namespace right-sizing: generic workload metrics

use super::{ComponentConfig, ResourceNames};
use crate::models::ComponentIdentity;
use crate::rules::RuleVariant;
use crate::store::ResourceStore;
use std::sync::Arc;

pub const NAMES: ResourceNames = ResourceNames {
    config_record: "rs-namespace-config",
    placement: "rs-namespace-placement",
    addon: "observability-rightsizing-namespace",
    template: "rs-namespace-template",
};

pub fn config(store: Arc<dyn ResourceStore>) -> ComponentConfig {
    ComponentConfig::new(ComponentIdentity::Namespace, NAMES, RuleVariant::Workload, store)
}
