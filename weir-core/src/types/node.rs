use crate::types::{ErrorObject, ParameterMap};

/// A single step in a flow, typically one upstream service call.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<Call>,

    /// Compensating call executed when a later node fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<Call>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<ErrorObject>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Call {
    pub service: String,
    pub method: String,

    #[serde(default, skip_serializing_if = "ParameterMap::is_empty")]
    pub request: ParameterMap,

    #[serde(default, skip_serializing_if = "ParameterMap::is_empty")]
    pub response: ParameterMap,
}
