//! Offline commands: render, validate and defaults

use anyhow::Result;
use colored::Colorize;
use rightsizing_lib::component::{rule_variant, ResourceNames};
use rightsizing_lib::lifecycle::{spec_hash, with_visibility_labels};
use rightsizing_lib::rules::{generate, RuleDocument};
use rightsizing_lib::{ComponentIdentity, ConfigRecord};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::output::{print_error, print_info, print_success, render_document, DocumentFormat};
use crate::record::load_record;

/// Generated document and the hash the controller would annotate it with
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendered {
    pub spec_hash: String,
    pub document: RuleDocument,
}

/// Decode a record file and generate its rule document
pub fn render_record(component: ComponentIdentity, path: &Path) -> Result<Rendered> {
    let record = load_record(path)?;
    let document = generate(rule_variant(component), &record.rule_config)?;
    let spec_hash = spec_hash(&document.to_json_bytes()?);
    Ok(Rendered { spec_hash, document })
}

/// Print the rule document generated from a record file
pub fn render(component: ComponentIdentity, path: &Path, format: DocumentFormat) -> Result<()> {
    let rendered = render_record(component, path)?;

    match format {
        DocumentFormat::Yaml => {
            println!("# spec-hash: {}", rendered.spec_hash);
            print!("{}", render_document(&rendered.document, format)?);
        }
        DocumentFormat::Json => println!("{}", render_document(&rendered, format)?),
    }
    Ok(())
}

/// Check a record file. Returns whether it is valid.
pub fn validate(component: ComponentIdentity, path: &Path) -> bool {
    match render_record(component, path) {
        Ok(rendered) => {
            print_success(&format!(
                "{} is a valid {} configuration ({} records)",
                path.display(),
                component,
                rendered.document.record_count()
            ));
            true
        }
        Err(e) => {
            print_error(&format!("{} is invalid: {:#}", path.display(), e));
            false
        }
    }
}

/// The configuration record the controller seeds for a component
pub fn default_manifest(component: ComponentIdentity, config_namespace: &str) -> Result<serde_json::Value> {
    let data = ConfigRecord::seed().to_data()?;
    let names = ResourceNames::for_identity(component);
    let seeded = with_visibility_labels(
        rightsizing_lib::Resource::config_record(
            rightsizing_lib::ResourceKey::namespaced(names.config_record, config_namespace),
            &data,
        ),
        component,
    );

    Ok(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": names.config_record,
            "namespace": config_namespace,
            "labels": seeded.labels,
        },
        "data": data,
    }))
}

/// Print the default configuration record for a component
pub fn defaults(component: ComponentIdentity, config_namespace: &str, format: DocumentFormat) -> Result<()> {
    print_info(&format!(
        "Default {} configuration, seeded when {} is missing",
        component.as_str().cyan(),
        ResourceNames::for_identity(component).config_record
    ));
    let manifest = default_manifest(component, config_namespace)?;
    print!("{}", render_document(&manifest, format)?);
    if matches!(format, DocumentFormat::Json) {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_record_data;
    use std::io::Write;

    fn record_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_manifest_round_trips_through_record_parser() {
        let manifest = default_manifest(ComponentIdentity::Virtualization, "obs").unwrap();
        assert_eq!(manifest["metadata"]["name"], "rs-virt-config");
        assert_eq!(manifest["metadata"]["labels"]["app.kubernetes.io/component"], "virtualization");

        let yaml = render_document(&manifest, DocumentFormat::Yaml).unwrap();
        let data = parse_record_data("defaults", &yaml).unwrap();
        assert_eq!(ConfigRecord::from_data("defaults", &data).unwrap(), ConfigRecord::seed());
    }

    #[test]
    fn test_render_uses_component_variant() {
        let manifest = default_manifest(ComponentIdentity::Namespace, "obs").unwrap();
        let file = record_file(&render_document(&manifest, DocumentFormat::Yaml).unwrap());

        let workload = render_record(ComponentIdentity::Namespace, file.path()).unwrap();
        let vm = render_record(ComponentIdentity::Virtualization, file.path()).unwrap();

        assert_ne!(workload.document.metadata.name, vm.document.metadata.name);
        assert_ne!(workload.spec_hash, vm.spec_hash);
        assert_eq!(workload.spec_hash.len(), 64);
    }

    #[test]
    fn test_validate_rejects_conflicting_filters() {
        let file = record_file(
            r#"
prometheusRuleConfig:
  namespaceFilterCriteria:
    inclusionCriteria: [team-a]
    exclusionCriteria: [team-b]
placementConfiguration:
  spec: {}
"#,
        );

        assert!(!validate(ComponentIdentity::Namespace, file.path()));
    }
}
