//! Error types for right-sizing reconciliation

use crate::models::ComponentIdentity;
use crate::store::StoreError;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Filter configuration that cannot be turned into a rule document.
///
/// These are operator mistakes in the configuration record and are never
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("only one of inclusion or exclusion criteria allowed for namespaceFilterCriteria")]
    ConflictingNamespaceFilter,

    #[error("only one of inclusion or exclusion criteria allowed for {label}")]
    ConflictingLabelFilter { label: String },
}

/// Errors surfaced by a reconciliation attempt
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid rule configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("{action} {resource} failed: {source}")]
    Store {
        action: &'static str,
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("configuration record {record} is missing key {key}")]
    MissingConfigKey { record: String, key: &'static str },

    #[error("failed to decode {key} from configuration record {record}: {source}")]
    Decode {
        record: String,
        key: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode {what}: {message}")]
    Encode { what: &'static str, message: String },

    #[error("unknown component type: {0}")]
    UnknownComponent(String),

    #[error("{component} right-sizing failed: {source}")]
    Component {
        component: ComponentIdentity,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn store(action: &'static str, resource: impl Into<String>, source: StoreError) -> Self {
        Error::Store {
            action,
            resource: resource.into(),
            source,
        }
    }

    pub(crate) fn in_component(self, component: ComponentIdentity) -> Self {
        Error::Component {
            component,
            source: Box::new(self),
        }
    }

    /// Returns true if the error came from invalid filter configuration
    pub fn is_validation(&self) -> bool {
        match self {
            Error::Validation(_) => true,
            Error::Component { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encode {
            what: "resource content",
            message: e.to_string(),
        }
    }
}
