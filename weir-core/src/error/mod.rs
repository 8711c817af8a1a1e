use thiserror::Error;

use crate::template::TemplateError;
use crate::types::PropertyType;

/// Validation and parse failures raised while loading a manifest. Fatal at
/// startup; none of these are recoverable at runtime.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to auto-detect manifest format (neither valid JSON nor valid YAML)")]
    UnknownFormat,

    #[error("duplicate flow '{0}'")]
    DuplicateFlow(String),
    #[error("duplicate resource '{id}' in flow '{flow}'")]
    DuplicateNode { flow: String, id: String },
    #[error("node with the id '{id}' in flow '{flow}' is a reserved keyword")]
    ReservedKeyword { flow: String, id: String },
    #[error("duplicate service '{0}'")]
    DuplicateService(String),

    #[error("reference '{reference}' in node '{node}' of flow '{flow}' points ahead of its declaration")]
    ForwardReference {
        flow: String,
        node: String,
        reference: String,
    },
    #[error("reference '{reference}' in flow '{flow}' does not resolve to a known resource")]
    UnknownReference { flow: String, reference: String },

    #[error("unknown service '{service}' referenced by node '{node}' in flow '{flow}'")]
    UnknownService {
        flow: String,
        node: String,
        service: String,
    },
    #[error("unknown method '{method}' on service '{service}' referenced by node '{node}' in flow '{flow}'")]
    UnknownMethod {
        flow: String,
        node: String,
        service: String,
        method: String,
    },
    #[error("endpoint references unknown flow '{0}'")]
    UnknownFlow(String),
    #[error("unknown codec '{0}'")]
    UnknownCodec(String),
    #[error("unknown listener '{0}'")]
    UnknownListener(String),
    #[error("unknown transport '{transport}' configured for service '{service}'")]
    UnknownTransport { service: String, transport: String },

    #[error("invalid default for property '{path}': expected {expected}")]
    InvalidDefault { path: String, expected: PropertyType },

    #[error(transparent)]
    Template(#[from] TemplateError),
}
