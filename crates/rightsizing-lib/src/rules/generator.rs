//! Table-driven recording-rule generation

use super::catalog::{ComputeResource, Measure, RuleVariant, Scope, Window, SELECTOR};
use super::document::{Rule, RuleDocument, RuleGroup};
use super::filters::{label_join, namespace_selector};
use crate::error::ValidationError;
use crate::models::{RuleConfig, MONITORING_NAMESPACE};
use std::collections::BTreeMap;

/// Generate the four-group rule document for `variant` from `config`.
///
/// Filters are validated before anything is built, so an invalid
/// configuration never yields a partial document.
pub fn generate(variant: RuleVariant, config: &RuleConfig) -> Result<RuleDocument, ValidationError> {
    let selector = namespace_selector(&config.namespace_filter_criteria)?;
    let join = label_join(&config.label_filter_criteria)?;

    let builder = GroupBuilder {
        variant,
        selector: &selector,
        join: &join,
        percentage: config.recommendation_percentage,
    };

    let mut groups = Vec::with_capacity(4);
    for scope in Scope::ALL {
        groups.push(builder.sampled(scope));
        groups.push(builder.rollup(scope));
    }

    Ok(RuleDocument::new(variant.document_name(), MONITORING_NAMESPACE, groups))
}

struct GroupBuilder<'a> {
    variant: RuleVariant,
    selector: &'a str,
    join: &'a str,
    percentage: i64,
}

impl GroupBuilder<'_> {
    /// 5m group: one sampled record per metric template
    fn sampled(&self, scope: Scope) -> RuleGroup {
        let by = self.variant.sum_by(scope);
        let rules = self
            .variant
            .metrics()
            .iter()
            .map(|metric| {
                let query = metric.template.replace(SELECTOR, self.selector);
                let mut expr = format!("max_over_time(sum({}) by ({})[5m:])", query, by);
                if !self.join.is_empty() {
                    expr.push(' ');
                    expr.push_str(self.join);
                }
                Rule {
                    record: self
                        .variant
                        .record_name(scope, metric.resource, metric.measure, Window::FiveMinutes),
                    expr,
                    labels: BTreeMap::new(),
                }
            })
            .collect();

        self.group(scope, Window::FiveMinutes, rules)
    }

    /// 1d group: a rollup per sampled record, and a recommendation per resource
    /// derived from that resource's usage rollup
    fn rollup(&self, scope: Scope) -> RuleGroup {
        let mut rules = Vec::new();

        for resource in ComputeResource::ALL {
            for metric in self.variant.metrics().iter().filter(|m| m.resource == resource) {
                rules.push(daily(
                    self.variant.record_name(scope, resource, metric.measure, Window::OneDay),
                    self.daily_max(scope, resource, metric.measure),
                ));
            }
            rules.push(daily(
                self.variant
                    .record_name(scope, resource, Measure::Recommendation, Window::OneDay),
                format!(
                    "{} * ({}/100)",
                    self.variant
                        .record_name(scope, resource, Measure::Usage, Window::OneDay),
                    self.percentage
                ),
            ));
        }

        self.group(scope, Window::OneDay, rules)
    }

    fn daily_max(&self, scope: Scope, resource: ComputeResource, measure: Measure) -> String {
        format!(
            "max_over_time({}[1d])",
            self.variant
                .record_name(scope, resource, measure, Window::FiveMinutes)
        )
    }

    fn group(&self, scope: Scope, window: Window, rules: Vec<Rule>) -> RuleGroup {
        RuleGroup {
            name: self.variant.group_name(scope, window),
            interval: Some(window.interval().to_string()),
            rules,
        }
    }
}

fn daily(record: String, expr: String) -> Rule {
    let mut labels = BTreeMap::new();
    labels.insert("profile".to_string(), "Max OverAll".to_string());
    labels.insert("aggregation".to_string(), "1d".to_string());
    Rule { record, expr, labels }
}
