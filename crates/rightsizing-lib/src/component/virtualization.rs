//! Virtualization right-sizing: KubeVirt virtual-machine metrics

use super::{ComponentConfig, ResourceNames};
use crate::models::ComponentIdentity;
use crate::rules::RuleVariant;
use crate::store::ResourceStore;
use std::sync::Arc;

pub const NAMES: ResourceNames = ResourceNames {
    config_record: "rs-virt-config",
    placement: "rs-virt-placement",
    addon: "observability-rightsizing-virtualization",
    template: "rs-virtualization-template",
};

pub fn config(store: Arc<dyn ResourceStore>) -> ComponentConfig {
    ComponentConfig::new(
        ComponentIdentity::Virtualization,
        NAMES,
        RuleVariant::VirtualMachine,
        store,
    )
}
