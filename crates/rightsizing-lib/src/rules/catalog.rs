//! Metric templates and naming tables for both rule variants
//!
//! Every record and group name in a generated document comes from this
//! module. Downstream rollups and recommendations reference sampled records
//! by name, so names must change here and nowhere else.

use std::fmt;

/// Placeholder replaced with the namespace selector in metric templates
pub(crate) const SELECTOR: &str = "$selector";

/// Which metric family a rule document is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleVariant {
    /// Generic pod/container metrics
    Workload,
    /// KubeVirt virtual-machine metrics
    VirtualMachine,
}

/// Aggregation scope of a rule group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Namespace,
    Cluster,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Namespace, Scope::Cluster];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Namespace => "namespace",
            Scope::Cluster => "cluster",
        }
    }
}

/// Evaluation window of a rule group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    FiveMinutes,
    OneDay,
}

impl Window {
    /// Evaluation interval of the group
    pub fn interval(&self) -> &'static str {
        match self {
            Window::FiveMinutes => "5m",
            Window::OneDay => "15m",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeResource {
    Cpu,
    Memory,
}

impl ComputeResource {
    pub const ALL: [ComputeResource; 2] = [ComputeResource::Cpu, ComputeResource::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeResource::Cpu => "cpu",
            ComputeResource::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    RequestHard,
    Request,
    Usage,
    Recommendation,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::RequestHard => "request_hard",
            Measure::Request => "request",
            Measure::Usage => "usage",
            Measure::Recommendation => "recommendation",
        }
    }
}

/// A sampled metric: what to measure and the PromQL that measures it
#[derive(Debug, Clone, Copy)]
pub struct MetricTemplate {
    pub resource: ComputeResource,
    pub measure: Measure,
    pub template: &'static str,
}

const WORKLOAD_METRICS: &[MetricTemplate] = &[
    MetricTemplate {
        resource: ComputeResource::Cpu,
        measure: Measure::RequestHard,
        template: r#"kube_resourcequota{$selector, resource="requests.cpu", type="hard"}"#,
    },
    MetricTemplate {
        resource: ComputeResource::Cpu,
        measure: Measure::Request,
        template: r#"kube_pod_container_resource_requests{$selector, container!="", resource="cpu"}"#,
    },
    MetricTemplate {
        resource: ComputeResource::Cpu,
        measure: Measure::Usage,
        template: r#"node_namespace_pod_container:container_cpu_usage_seconds_total:sum_irate{$selector, container!=""}"#,
    },
    MetricTemplate {
        resource: ComputeResource::Memory,
        measure: Measure::RequestHard,
        template: r#"kube_resourcequota{$selector, resource="requests.memory", type="hard"}"#,
    },
    MetricTemplate {
        resource: ComputeResource::Memory,
        measure: Measure::Request,
        template: r#"kube_pod_container_resource_requests{$selector, container!="", resource="memory"}"#,
    },
    MetricTemplate {
        resource: ComputeResource::Memory,
        measure: Measure::Usage,
        template: r#"container_memory_working_set_bytes{$selector, container!=""}"#,
    },
];

// CPU requests of a VM are cores x sockets x threads.
const VIRTUAL_MACHINE_METRICS: &[MetricTemplate] = &[
    MetricTemplate {
        resource: ComputeResource::Cpu,
        measure: Measure::Request,
        template: concat!(
            r#"kubevirt_vm_resource_requests{$selector, unit="cores", resource="cpu"}"#,
            r#" * on(name, namespace, resource) "#,
            r#"kubevirt_vm_resource_requests{$selector, unit="sockets", resource="cpu"}"#,
            r#" * on(name, namespace, resource) "#,
            r#"kubevirt_vm_resource_requests{$selector, unit="threads", resource="cpu"}"#,
        ),
    },
    MetricTemplate {
        resource: ComputeResource::Cpu,
        measure: Measure::Usage,
        template: r#"rate(kubevirt_vmi_cpu_usage_seconds_total{$selector}[5m:])"#,
    },
    MetricTemplate {
        resource: ComputeResource::Memory,
        measure: Measure::Request,
        template: r#"kubevirt_vm_resource_requests{$selector, resource="memory"}"#,
    },
    MetricTemplate {
        resource: ComputeResource::Memory,
        measure: Measure::Usage,
        template: r#"kubevirt_vmi_memory_available_bytes{$selector} - kubevirt_vmi_memory_usable_bytes{$selector}"#,
    },
];

impl RuleVariant {
    /// Sampled metrics in record order
    pub fn metrics(&self) -> &'static [MetricTemplate] {
        match self {
            RuleVariant::Workload => WORKLOAD_METRICS,
            RuleVariant::VirtualMachine => VIRTUAL_MACHINE_METRICS,
        }
    }

    /// Name of the generated PrometheusRule
    pub fn document_name(&self) -> &'static str {
        match self {
            RuleVariant::Workload => "acm-rs-namespace-prometheus-rules",
            RuleVariant::VirtualMachine => "acm-rs-virt-prometheus-rules",
        }
    }

    fn record_prefix(&self) -> &'static str {
        match self {
            RuleVariant::Workload => "acm_rs",
            RuleVariant::VirtualMachine => "acm_rs_vm",
        }
    }

    fn group_prefix(&self) -> &'static str {
        match self {
            RuleVariant::Workload => "acm-right-sizing",
            RuleVariant::VirtualMachine => "acm-vm-right-sizing",
        }
    }

    /// Labels a sampled series is summed by within a scope
    pub fn sum_by(&self, scope: Scope) -> &'static str {
        match (self, scope) {
            (RuleVariant::Workload, Scope::Namespace) => "namespace",
            (RuleVariant::VirtualMachine, Scope::Namespace) => "name, namespace",
            (_, Scope::Cluster) => "cluster",
        }
    }

    pub fn group_name(&self, scope: Scope, window: Window) -> String {
        // The namespace 1d group is the only one with a plural suffix.
        let suffix = match (scope, window) {
            (_, Window::FiveMinutes) => "5m.rule",
            (Scope::Namespace, Window::OneDay) => "1d.rules",
            (Scope::Cluster, Window::OneDay) => "1d.rule",
        };
        format!("{}-{}-{}", self.group_prefix(), scope.as_str(), suffix)
    }

    pub fn record_name(&self, scope: Scope, resource: ComputeResource, measure: Measure, window: Window) -> String {
        let base = format!(
            "{}:{}:{}_{}",
            self.record_prefix(),
            scope.as_str(),
            resource.as_str(),
            measure.as_str()
        );
        match window {
            Window::FiveMinutes => format!("{}:5m", base),
            Window::OneDay => base,
        }
    }
}

impl fmt::Display for RuleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleVariant::Workload => f.write_str("workload"),
            RuleVariant::VirtualMachine => f.write_str("virtual-machine"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_has_selector() {
        for variant in [RuleVariant::Workload, RuleVariant::VirtualMachine] {
            for metric in variant.metrics() {
                assert!(
                    metric.template.contains(SELECTOR),
                    "{} template for {:?} has no selector",
                    variant,
                    metric.measure
                );
            }
        }
    }

    #[test]
    fn test_record_names() {
        assert_eq!(
            RuleVariant::Workload.record_name(
                Scope::Namespace,
                ComputeResource::Cpu,
                Measure::RequestHard,
                Window::FiveMinutes
            ),
            "acm_rs:namespace:cpu_request_hard:5m"
        );
        assert_eq!(
            RuleVariant::VirtualMachine.record_name(
                Scope::Cluster,
                ComputeResource::Memory,
                Measure::Recommendation,
                Window::OneDay
            ),
            "acm_rs_vm:cluster:memory_recommendation"
        );
    }

    #[test]
    fn test_group_names() {
        let v = RuleVariant::Workload;
        assert_eq!(v.group_name(Scope::Namespace, Window::FiveMinutes), "acm-right-sizing-namespace-5m.rule");
        assert_eq!(v.group_name(Scope::Namespace, Window::OneDay), "acm-right-sizing-namespace-1d.rules");
        assert_eq!(v.group_name(Scope::Cluster, Window::FiveMinutes), "acm-right-sizing-cluster-5m.rule");
        assert_eq!(v.group_name(Scope::Cluster, Window::OneDay), "acm-right-sizing-cluster-1d.rule");

        let vm = RuleVariant::VirtualMachine;
        assert_eq!(vm.group_name(Scope::Namespace, Window::OneDay), "acm-vm-right-sizing-namespace-1d.rules");
        assert_eq!(vm.group_name(Scope::Cluster, Window::FiveMinutes), "acm-vm-right-sizing-cluster-5m.rule");
    }

    #[test]
    fn test_vm_variant_has_no_hard_limits() {
        assert!(RuleVariant::VirtualMachine
            .metrics()
            .iter()
            .all(|m| m.measure != Measure::RequestHard));
    }
}
