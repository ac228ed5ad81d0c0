//! Recording-rule generation for right-sizing
//!
//! This module provides:
//! - Namespace selector and label-join construction from filter criteria
//! - A per-variant metric catalog (generic workloads and virtual machines)
//! - The PrometheusRule document model and its generator

mod catalog;
mod document;
mod filters;
mod generator;

#[cfg(test)]
mod tests;

pub use catalog::{ComputeResource, Measure, MetricTemplate, RuleVariant, Scope, Window};
pub use document::{DocumentMeta, Rule, RuleDocument, RuleDocumentSpec, RuleGroup, RULE_API_VERSION, RULE_KIND};
pub use filters::{label_join, namespace_selector};
pub use generator::generate;
