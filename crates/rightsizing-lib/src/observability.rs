//! Observability infrastructure for the right-sizing controller
//!
//! Provides:
//! - Prometheus metrics (reconcile latency, outcomes, enabled components, rule sizes)
//! - Structured lifecycle events with tracing

use crate::reconcile::Transition;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::info;

/// Histogram buckets for reconcile latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RightSizingMetricsInner> = OnceLock::new();

struct RightSizingMetricsInner {
    reconcile_latency_seconds: HistogramVec,
    reconciliations: IntCounterVec,
    component_enabled: IntGaugeVec,
    rule_records: IntGaugeVec,
    cleanup_errors: IntCounter,
}

impl RightSizingMetricsInner {
    fn new() -> Self {
        Self {
            reconcile_latency_seconds: register_histogram_vec!(
                "rightsizing_reconcile_latency_seconds",
                "Time spent in one reconciliation attempt",
                &["component"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register reconcile_latency_seconds"),

            reconciliations: register_int_counter_vec!(
                "rightsizing_reconciliations_total",
                "Reconciliation attempts by component and outcome",
                &["component", "outcome"]
            )
            .expect("Failed to register reconciliations_total"),

            component_enabled: register_int_gauge_vec!(
                "rightsizing_component_enabled",
                "Whether a right-sizing component is enabled (1) or disabled (0)",
                &["component"]
            )
            .expect("Failed to register component_enabled"),

            rule_records: register_int_gauge_vec!(
                "rightsizing_rule_records",
                "Number of recording rules in the last generated document",
                &["component"]
            )
            .expect("Failed to register rule_records"),

            cleanup_errors: register_int_counter!(
                "rightsizing_cleanup_errors_total",
                "Deletes that failed during best-effort cleanup"
            )
            .expect("Failed to register cleanup_errors_total"),
        }
    }
}

/// Handle to the process-global right-sizing metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct RightSizingMetrics {
    _private: (),
}

impl Default for RightSizingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RightSizingMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RightSizingMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RightSizingMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_reconcile_latency(&self, component: &str, duration_secs: f64) {
        self.inner()
            .reconcile_latency_seconds
            .with_label_values(&[component])
            .observe(duration_secs);
    }

    pub fn inc_reconciliations(&self, component: &str, outcome: &str) {
        self.inner()
            .reconciliations
            .with_label_values(&[component, outcome])
            .inc();
    }

    pub fn set_component_enabled(&self, component: &str, enabled: bool) {
        self.inner()
            .component_enabled
            .with_label_values(&[component])
            .set(i64::from(enabled));
    }

    pub fn set_rule_records(&self, component: &str, count: i64) {
        self.inner()
            .rule_records
            .with_label_values(&[component])
            .set(count);
    }

    pub fn inc_cleanup_errors(&self) {
        self.inner().cleanup_errors.inc();
    }
}

/// Structured logger for controller lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log the transition made by a successful reconciliation attempt
    pub fn log_transition(&self, component: &str, namespace: &str, transition: &Transition) {
        match transition {
            Transition::Activated => info!(
                event = "component_activated",
                instance = %self.instance,
                component = %component,
                namespace = %namespace,
                "Right-sizing component activated"
            ),
            Transition::Rebound { previous } => info!(
                event = "component_rebound",
                instance = %self.instance,
                component = %component,
                namespace = %namespace,
                previous_namespace = %previous,
                "Right-sizing component moved to a new binding namespace"
            ),
            Transition::Refreshed => info!(
                event = "component_refreshed",
                instance = %self.instance,
                component = %component,
                namespace = %namespace,
                "Right-sizing component refreshed"
            ),
            Transition::Disabled => info!(
                event = "component_disabled",
                instance = %self.instance,
                component = %component,
                "Right-sizing component disabled"
            ),
        }
    }

    pub fn log_startup(&self, version: &str, config_namespace: &str) {
        info!(
            event = "controller_started",
            instance = %self.instance,
            controller_version = %version,
            config_namespace = %config_namespace,
            "Right-sizing controller started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Right-sizing controller shutting down"
        );
    }
}
