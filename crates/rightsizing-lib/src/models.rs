//! Core data models for right-sizing reconciliation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Recommendation percentage used when the configuration omits it
pub const DEFAULT_RECOMMENDATION_PERCENTAGE: i64 = 110;

/// Namespace the generated PrometheusRule is deployed to on managed clusters
pub const MONITORING_NAMESPACE: &str = "openshift-monitoring";

/// Binding namespace used when no explicit binding is configured
pub const DEFAULT_BINDING_NAMESPACE: &str = "open-cluster-management-global-set";

/// Namespace holding the configuration records
pub const DEFAULT_CONFIG_NAMESPACE: &str = "open-cluster-management-observability";

/// The only label filter that participates in query generation
pub const RECOGNIZED_LABEL: &str = "label_env";

/// Configuration record data key holding the serialized [`RuleConfig`]
pub const RULE_CONFIG_KEY: &str = "prometheusRuleConfig";

/// Configuration record data key holding the serialized [`PlacementConfiguration`]
pub const PLACEMENT_CONFIG_KEY: &str = "placementConfiguration";

/// Label filtering criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelFilter {
    pub label_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusion_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusion_criteria: Vec<String>,
}

/// Namespace filtering criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceFilter {
    #[serde(default)]
    pub inclusion_criteria: Vec<String>,
    #[serde(default)]
    pub exclusion_criteria: Vec<String>,
}

/// Rule generation settings read from the configuration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    #[serde(default)]
    pub namespace_filter_criteria: NamespaceFilter,
    #[serde(default)]
    pub label_filter_criteria: Vec<LabelFilter>,
    #[serde(default = "default_recommendation_percentage")]
    pub recommendation_percentage: i64,
}

fn default_recommendation_percentage() -> i64 {
    DEFAULT_RECOMMENDATION_PERCENTAGE
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            namespace_filter_criteria: NamespaceFilter::default(),
            label_filter_criteria: Vec::new(),
            recommendation_percentage: DEFAULT_RECOMMENDATION_PERCENTAGE,
        }
    }
}

impl RuleConfig {
    /// Rule configuration seeded into a fresh configuration record
    pub fn seed() -> Self {
        Self {
            namespace_filter_criteria: NamespaceFilter {
                inclusion_criteria: Vec::new(),
                exclusion_criteria: vec!["openshift.*".to_string()],
            },
            ..Default::default()
        }
    }
}

/// Placement spec, owned by the placement subsystem and passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementSpec(pub serde_json::Value);

impl Default for PlacementSpec {
    fn default() -> Self {
        Self(serde_json::Value::Object(Default::default()))
    }
}

/// Placement section of the configuration record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfiguration {
    #[serde(default)]
    pub spec: PlacementSpec,
}

impl PlacementConfiguration {
    /// Placement seeded into a fresh configuration record: every cluster,
    /// including ones that are temporarily unreachable.
    pub fn seed() -> Self {
        Self {
            spec: PlacementSpec(serde_json::json!({
                "tolerations": [
                    { "key": "cluster.open-cluster-management.io/unreachable", "operator": "Exists" },
                    { "key": "cluster.open-cluster-management.io/unavailable", "operator": "Exists" }
                ]
            })),
        }
    }
}

/// Decoded payload of a configuration record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub rule_config: RuleConfig,
    pub placement: PlacementConfiguration,
}

impl ConfigRecord {
    /// Decode the record from configuration record data.
    ///
    /// `record` names the source and only appears in errors.
    pub fn from_data(record: &str, data: &BTreeMap<String, String>) -> Result<Self> {
        let rule_config = decode_key(record, data, RULE_CONFIG_KEY)?;
        let placement = decode_key(record, data, PLACEMENT_CONFIG_KEY)?;
        Ok(Self {
            rule_config,
            placement,
        })
    }

    /// Serialize into the two data keys of a configuration record
    pub fn to_data(&self) -> Result<BTreeMap<String, String>> {
        let mut data = BTreeMap::new();
        data.insert(RULE_CONFIG_KEY.to_string(), to_yaml(&self.rule_config, RULE_CONFIG_KEY)?);
        data.insert(
            PLACEMENT_CONFIG_KEY.to_string(),
            to_yaml(&self.placement, PLACEMENT_CONFIG_KEY)?,
        );
        Ok(data)
    }

    /// Record used to seed a missing configuration record
    pub fn seed() -> Self {
        Self {
            rule_config: RuleConfig::seed(),
            placement: PlacementConfiguration::seed(),
        }
    }
}

fn decode_key<T: serde::de::DeserializeOwned>(
    record: &str,
    data: &BTreeMap<String, String>,
    key: &'static str,
) -> Result<T> {
    let raw = data.get(key).ok_or_else(|| Error::MissingConfigKey {
        record: record.to_string(),
        key,
    })?;
    serde_yaml::from_str(raw).map_err(|source| Error::Decode {
        record: record.to_string(),
        key,
        source,
    })
}

fn to_yaml<T: Serialize>(value: &T, what: &'static str) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| Error::Encode {
        what,
        message: e.to_string(),
    })
}

/// The two independent right-sizing components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentIdentity {
    Namespace,
    Virtualization,
}

impl ComponentIdentity {
    pub const ALL: [ComponentIdentity; 2] =
        [ComponentIdentity::Namespace, ComponentIdentity::Virtualization];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentIdentity::Namespace => "namespace",
            ComponentIdentity::Virtualization => "virtualization",
        }
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "namespace" => Ok(ComponentIdentity::Namespace),
            "virtualization" => Ok(ComponentIdentity::Virtualization),
            other => Err(Error::UnknownComponent(other.to_string())),
        }
    }
}

/// Runtime state of one component, carried between reconciliation attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentState {
    pub bound_namespace: String,
    pub enabled: bool,
}

impl ComponentState {
    /// Initial state: disabled and bound to `default_namespace`
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            bound_namespace: default_namespace.into(),
            enabled: false,
        }
    }
}

/// Desired state for both components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    pub namespace_enabled: bool,
    pub namespace_binding: String,
    pub virtualization_enabled: bool,
    pub virtualization_binding: String,
    pub config_namespace: String,
}

impl Options {
    /// Desired `(enabled, binding)` for a component; the binding may be empty
    pub fn desired(&self, component: ComponentIdentity) -> (bool, &str) {
        match component {
            ComponentIdentity::Namespace => (self.namespace_enabled, &self.namespace_binding),
            ComponentIdentity::Virtualization => {
                (self.virtualization_enabled, &self.virtualization_binding)
            }
        }
    }

    /// Whether any right-sizing component is enabled
    pub fn any_enabled(&self) -> bool {
        self.namespace_enabled || self.virtualization_enabled
    }
}

/// Values handed to the addon packaging layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightSizingValues {
    pub namespace_enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace_binding: String,
    pub virtualization_enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub virtualization_binding: String,
}

impl RightSizingValues {
    /// Returns `None` when neither component is enabled
    pub fn from_options(opts: &Options) -> Option<Self> {
        if !opts.any_enabled() {
            return None;
        }
        Some(Self {
            namespace_enabled: opts.namespace_enabled,
            namespace_binding: opts.namespace_binding.clone(),
            virtualization_enabled: opts.virtualization_enabled,
            virtualization_binding: opts.virtualization_binding.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_config_percentage_defaults_when_absent() {
        let config: RuleConfig = serde_yaml::from_str("namespaceFilterCriteria: {}\n").unwrap();
        assert_eq!(config.recommendation_percentage, 110);
        assert!(config.label_filter_criteria.is_empty());
    }

    #[test]
    fn test_rule_config_keeps_explicit_percentage() {
        let config: RuleConfig = serde_yaml::from_str("recommendationPercentage: 150\n").unwrap();
        assert_eq!(config.recommendation_percentage, 150);
    }

    #[test]
    fn test_seeded_rule_config() {
        let config = RuleConfig::seed();
        assert_eq!(config.recommendation_percentage, DEFAULT_RECOMMENDATION_PERCENTAGE);
        assert_eq!(
            config.namespace_filter_criteria.exclusion_criteria,
            vec!["openshift.*".to_string()]
        );
        assert!(config.namespace_filter_criteria.inclusion_criteria.is_empty());
        assert!(config.label_filter_criteria.is_empty());
    }

    #[test]
    fn test_config_record_data_keys() {
        let data = ConfigRecord::seed().to_data().unwrap();
        assert!(data[RULE_CONFIG_KEY].contains("recommendationPercentage"));
        assert!(data[RULE_CONFIG_KEY].contains("namespaceFilterCriteria"));
        assert!(data[PLACEMENT_CONFIG_KEY].contains("tolerations"));

        let decoded = ConfigRecord::from_data("rs-namespace-config", &data).unwrap();
        assert_eq!(decoded, ConfigRecord::seed());
    }

    #[test]
    fn test_config_record_missing_key() {
        let mut data = BTreeMap::new();
        data.insert(RULE_CONFIG_KEY.to_string(), "recommendationPercentage: 120\n".to_string());

        let err = ConfigRecord::from_data("rs-virt-config", &data).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingConfigKey { key: PLACEMENT_CONFIG_KEY, .. }
        ));
    }

    #[test]
    fn test_config_record_invalid_yaml() {
        let mut data = BTreeMap::new();
        data.insert(RULE_CONFIG_KEY.to_string(), "recommendationPercentage: [".to_string());
        data.insert(PLACEMENT_CONFIG_KEY.to_string(), "spec: {}\n".to_string());

        let err = ConfigRecord::from_data("rs-namespace-config", &data).unwrap_err();
        assert!(matches!(err, Error::Decode { key: RULE_CONFIG_KEY, .. }));
    }

    #[test]
    fn test_component_identity_parsing() {
        assert_eq!(
            "namespace".parse::<ComponentIdentity>().unwrap(),
            ComponentIdentity::Namespace
        );
        assert_eq!(
            "virtualization".parse::<ComponentIdentity>().unwrap(),
            ComponentIdentity::Virtualization
        );
        assert!(matches!(
            "storage".parse::<ComponentIdentity>(),
            Err(Error::UnknownComponent(name)) if name == "storage"
        ));
    }

    #[test]
    fn test_component_state_starts_disabled() {
        let state = ComponentState::new(DEFAULT_BINDING_NAMESPACE);
        assert!(!state.enabled);
        assert_eq!(state.bound_namespace, DEFAULT_BINDING_NAMESPACE);
    }

    #[test]
    fn test_options_desired() {
        let opts = Options {
            namespace_enabled: true,
            namespace_binding: "team-a".to_string(),
            virtualization_enabled: false,
            virtualization_binding: String::new(),
            config_namespace: DEFAULT_CONFIG_NAMESPACE.to_string(),
        };

        assert_eq!(opts.desired(ComponentIdentity::Namespace), (true, "team-a"));
        assert_eq!(opts.desired(ComponentIdentity::Virtualization), (false, ""));
        assert!(opts.any_enabled());
        assert!(!Options::default().any_enabled());
    }

    #[test]
    fn test_values_from_options() {
        assert!(RightSizingValues::from_options(&Options::default()).is_none());

        let opts = Options {
            virtualization_enabled: true,
            virtualization_binding: "vm-team".to_string(),
            ..Default::default()
        };
        let values = RightSizingValues::from_options(&opts).unwrap();
        assert!(!values.namespace_enabled);
        assert!(values.virtualization_enabled);
        assert_eq!(values.virtualization_binding, "vm-team");

        let json = serde_json::to_value(&values).unwrap();
        assert!(json.get("namespaceBinding").is_none());
        assert_eq!(json["virtualizationBinding"], "vm-team");
    }
}
