//! Tests for rule document generation
//!
//! These tests verify:
//! - Group layout and record counts for both variants
//! - Filter propagation into sampled expressions
//! - Recommendation expressions and 1d labels

use super::*;
use crate::error::ValidationError;
use crate::models::{LabelFilter, NamespaceFilter, RuleConfig, MONITORING_NAMESPACE};

fn config_with(namespace: NamespaceFilter, labels: Vec<LabelFilter>, percentage: i64) -> RuleConfig {
    RuleConfig {
        namespace_filter_criteria: namespace,
        label_filter_criteria: labels,
        recommendation_percentage: percentage,
    }
}

fn excluding(patterns: &[&str]) -> NamespaceFilter {
    NamespaceFilter {
        inclusion_criteria: Vec::new(),
        exclusion_criteria: patterns.iter().map(|s| s.to_string()).collect(),
    }
}

fn env_filter(include: &[&str]) -> LabelFilter {
    LabelFilter {
        label_name: "label_env".to_string(),
        inclusion_criteria: include.iter().map(|s| s.to_string()).collect(),
        exclusion_criteria: Vec::new(),
    }
}

mod layout_tests {
    use super::*;

    #[test]
    fn test_workload_document_layout() {
        let doc = generate(RuleVariant::Workload, &RuleConfig::seed()).unwrap();

        assert_eq!(doc.api_version, "monitoring.coreos.com/v1");
        assert_eq!(doc.kind, "PrometheusRule");
        assert_eq!(doc.metadata.name, "acm-rs-namespace-prometheus-rules");
        assert_eq!(doc.metadata.namespace, MONITORING_NAMESPACE);

        let names: Vec<&str> = doc.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "acm-right-sizing-namespace-5m.rule",
                "acm-right-sizing-namespace-1d.rules",
                "acm-right-sizing-cluster-5m.rule",
                "acm-right-sizing-cluster-1d.rule",
            ]
        );

        let counts: Vec<usize> = doc.groups().iter().map(|g| g.rules.len()).collect();
        assert_eq!(counts, vec![6, 8, 6, 8]);

        let intervals: Vec<Option<&str>> =
            doc.groups().iter().map(|g| g.interval.as_deref()).collect();
        assert_eq!(intervals, vec![Some("5m"), Some("15m"), Some("5m"), Some("15m")]);
    }

    #[test]
    fn test_virtual_machine_document_layout() {
        let doc = generate(RuleVariant::VirtualMachine, &RuleConfig::seed()).unwrap();

        assert_eq!(doc.metadata.name, "acm-rs-virt-prometheus-rules");
        assert_eq!(doc.groups()[0].name, "acm-vm-right-sizing-namespace-5m.rule");
        assert_eq!(doc.groups()[3].name, "acm-vm-right-sizing-cluster-1d.rule");

        let counts: Vec<usize> = doc.groups().iter().map(|g| g.rules.len()).collect();
        assert_eq!(counts, vec![4, 6, 4, 6]);
        assert_eq!(doc.record_count(), 20);
        assert!(doc.record("acm_rs_vm:namespace:cpu_request_hard:5m").is_none());
    }

    #[test]
    fn test_workload_record_order() {
        let doc = generate(RuleVariant::Workload, &RuleConfig::seed()).unwrap();

        let sampled: Vec<&str> = doc.groups()[0].rules.iter().map(|r| r.record.as_str()).collect();
        assert_eq!(
            sampled,
            vec![
                "acm_rs:namespace:cpu_request_hard:5m",
                "acm_rs:namespace:cpu_request:5m",
                "acm_rs:namespace:cpu_usage:5m",
                "acm_rs:namespace:memory_request_hard:5m",
                "acm_rs:namespace:memory_request:5m",
                "acm_rs:namespace:memory_usage:5m",
            ]
        );

        let daily: Vec<&str> = doc.groups()[3].rules.iter().map(|r| r.record.as_str()).collect();
        assert_eq!(
            daily,
            vec![
                "acm_rs:cluster:cpu_request_hard",
                "acm_rs:cluster:cpu_request",
                "acm_rs:cluster:cpu_usage",
                "acm_rs:cluster:cpu_recommendation",
                "acm_rs:cluster:memory_request_hard",
                "acm_rs:cluster:memory_request",
                "acm_rs:cluster:memory_usage",
                "acm_rs:cluster:memory_recommendation",
            ]
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = RuleConfig::seed();
        let a = generate(RuleVariant::Workload, &config).unwrap();
        let b = generate(RuleVariant::Workload, &config).unwrap();
        assert_eq!(a.to_json_bytes().unwrap(), b.to_json_bytes().unwrap());
    }
}

mod expression_tests {
    use super::*;

    #[test]
    fn test_selector_in_every_sampled_record() {
        let config = config_with(excluding(&["openshift.*", "kube-.*"]), Vec::new(), 110);

        for variant in [RuleVariant::Workload, RuleVariant::VirtualMachine] {
            let doc = generate(variant, &config).unwrap();
            for group in [&doc.groups()[0], &doc.groups()[2]] {
                for rule in &group.rules {
                    assert!(
                        rule.expr.contains(r#"namespace!~"openshift.*|kube-.*""#),
                        "{} lacks selector: {}",
                        rule.record,
                        rule.expr
                    );
                    assert!(!rule.expr.contains("$selector"));
                    assert!(rule.labels.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_sampled_expression_shape() {
        let doc = generate(RuleVariant::Workload, &RuleConfig::seed()).unwrap();

        let ns = doc.record("acm_rs:namespace:memory_usage:5m").unwrap();
        assert_eq!(
            ns.expr,
            r#"max_over_time(sum(container_memory_working_set_bytes{namespace!~"openshift.*", container!=""}) by (namespace)[5m:])"#
        );

        let cluster = doc.record("acm_rs:cluster:memory_usage:5m").unwrap();
        assert!(cluster.expr.ends_with("by (cluster)[5m:])"));

        let vm = generate(RuleVariant::VirtualMachine, &RuleConfig::seed()).unwrap();
        let vm_ns = vm.record("acm_rs_vm:namespace:cpu_request:5m").unwrap();
        assert!(vm_ns.expr.contains(r#"unit="sockets""#));
        assert!(vm_ns.expr.ends_with("by (name, namespace)[5m:])"));
    }

    #[test]
    fn test_label_join_appended_to_sampled_records_only() {
        let config = config_with(excluding(&["openshift.*"]), vec![env_filter(&["prod", "staging"])], 110);
        let doc = generate(RuleVariant::Workload, &config).unwrap();
        let join = r#"* on (namespace) group_left() (kube_namespace_labels{label_env=~"prod|staging"} or kube_namespace_labels{label_env=""})"#;

        let sampled = doc.record("acm_rs:namespace:cpu_usage:5m").unwrap();
        assert!(sampled.expr.ends_with(&format!(") {}", join)));

        let rollup = doc.record("acm_rs:namespace:cpu_usage").unwrap();
        assert!(!rollup.expr.contains("kube_namespace_labels"));
    }

    #[test]
    fn test_daily_rollups_and_labels() {
        let doc = generate(RuleVariant::VirtualMachine, &RuleConfig::seed()).unwrap();

        let rollup = doc.record("acm_rs_vm:namespace:memory_request").unwrap();
        assert_eq!(rollup.expr, "max_over_time(acm_rs_vm:namespace:memory_request:5m[1d])");

        for group in [&doc.groups()[1], &doc.groups()[3]] {
            for rule in &group.rules {
                assert_eq!(rule.labels.get("profile").map(String::as_str), Some("Max OverAll"));
                assert_eq!(rule.labels.get("aggregation").map(String::as_str), Some("1d"));
            }
        }
    }

    #[test]
    fn test_percentage_embedded_verbatim() {
        let config = config_with(NamespaceFilter::default(), Vec::new(), 150);
        let doc = generate(RuleVariant::Workload, &config).unwrap();

        let rec = doc.record("acm_rs:namespace:cpu_recommendation").unwrap();
        assert_eq!(rec.expr, "acm_rs:namespace:cpu_usage * (150/100)");

        let config = config_with(NamespaceFilter::default(), Vec::new(), 0);
        let doc = generate(RuleVariant::VirtualMachine, &config).unwrap();
        let rec = doc.record("acm_rs_vm:cluster:memory_recommendation").unwrap();
        assert_eq!(rec.expr, "acm_rs_vm:cluster:memory_usage * (0/100)");
    }

    #[test]
    fn test_references_resolve_within_document() {
        for variant in [RuleVariant::Workload, RuleVariant::VirtualMachine] {
            let doc = generate(variant, &RuleConfig::seed()).unwrap();
            for group in [&doc.groups()[1], &doc.groups()[3]] {
                for (i, rule) in group.rules.iter().enumerate() {
                    if rule.record.ends_with("_recommendation") {
                        let input = rule.expr.split(' ').next().unwrap();
                        assert!(
                            group.rules[..i].iter().any(|r| r.record == input),
                            "{} references {} before it is recorded",
                            rule.record,
                            input
                        );
                    } else {
                        let sampled = rule
                            .expr
                            .trim_start_matches("max_over_time(")
                            .trim_end_matches("[1d])");
                        assert!(doc.record(sampled).is_some(), "{} has no input", rule.record);
                    }
                }
            }
        }
    }
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_conflicting_namespace_filter_rejected() {
        let config = config_with(
            NamespaceFilter {
                inclusion_criteria: vec!["my-app-.*".to_string()],
                exclusion_criteria: vec!["openshift.*".to_string()],
            },
            Vec::new(),
            110,
        );

        for variant in [RuleVariant::Workload, RuleVariant::VirtualMachine] {
            assert_eq!(
                generate(variant, &config).unwrap_err(),
                ValidationError::ConflictingNamespaceFilter
            );
        }
    }

    #[test]
    fn test_conflicting_label_filter_rejected() {
        let mut filter = env_filter(&["prod"]);
        filter.exclusion_criteria = vec!["dev".to_string()];
        let config = config_with(excluding(&["openshift.*"]), vec![filter], 110);

        assert!(matches!(
            generate(RuleVariant::Workload, &config),
            Err(ValidationError::ConflictingLabelFilter { .. })
        ));
    }
}
