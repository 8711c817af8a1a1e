use std::collections::BTreeMap;

use crate::types::{ParameterMap, Property};

/// The rendered error response recipe for a flow or node.
///
/// Inheritance at bind time: a node's override falls back to the flow's
/// `on_error`, which falls back to the built-in default of status 500 and
/// the error's underlying text.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Property>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Property>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Property>,

    /// Schema of the failure body; also used to decode an upstream error
    /// payload into the `error` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ParameterMap>,
}
