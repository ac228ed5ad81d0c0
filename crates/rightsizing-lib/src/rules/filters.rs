//! PromQL selector and label-join construction from filter criteria

use crate::error::ValidationError;
use crate::models::{LabelFilter, NamespaceFilter, RECOGNIZED_LABEL};

/// Build the namespace matcher placed inside every sampled metric selector.
///
/// Criteria are partial regexes and are joined with `|` verbatim.
pub fn namespace_selector(filter: &NamespaceFilter) -> Result<String, ValidationError> {
    let include = &filter.inclusion_criteria;
    let exclude = &filter.exclusion_criteria;

    if !include.is_empty() && !exclude.is_empty() {
        return Err(ValidationError::ConflictingNamespaceFilter);
    }
    if !include.is_empty() {
        return Ok(format!(r#"namespace=~"{}""#, include.join("|")));
    }
    if !exclude.is_empty() {
        return Ok(format!(r#"namespace!~"{}""#, exclude.join("|")));
    }
    Ok(r#"namespace!="""#.to_string())
}

/// Build the namespace-label join appended to sampled metrics.
///
/// Only the first `label_env` filter with criteria counts. Namespaces without
/// the label still match through the empty-value alternative. Returns an empty
/// string when no join applies.
pub fn label_join(filters: &[LabelFilter]) -> Result<String, ValidationError> {
    for filter in filters.iter().filter(|f| f.label_name == RECOGNIZED_LABEL) {
        let include = &filter.inclusion_criteria;
        let exclude = &filter.exclusion_criteria;

        if !include.is_empty() && !exclude.is_empty() {
            return Err(ValidationError::ConflictingLabelFilter {
                label: RECOGNIZED_LABEL.to_string(),
            });
        }

        let selector = if !include.is_empty() {
            format!(
                r#"kube_namespace_labels{{{}=~"{}"}}"#,
                RECOGNIZED_LABEL,
                include.join("|")
            )
        } else if !exclude.is_empty() {
            format!(
                r#"kube_namespace_labels{{{}!~"{}"}}"#,
                RECOGNIZED_LABEL,
                exclude.join("|")
            )
        } else {
            continue;
        };

        return Ok(format!(
            r#"* on (namespace) group_left() ({} or kube_namespace_labels{{{}=""}})"#,
            selector, RECOGNIZED_LABEL
        ));
    }

    Ok(String::new())
}
