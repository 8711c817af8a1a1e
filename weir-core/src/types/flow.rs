use std::collections::BTreeMap;

use crate::types::{ErrorObject, Node, ParameterMap, Property};

/// A named, ordered call graph with an input and output schema.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Flow {
    pub name: String,

    #[serde(default, skip_serializing_if = "ParameterMap::is_empty")]
    pub input: ParameterMap,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,

    #[serde(default, skip_serializing_if = "ParameterMap::is_empty")]
    pub output: ParameterMap,

    /// Error recipe used when a failing node carries no override of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<ErrorObject>,

    /// Optional pass-through target; proxied when no output body is mapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<Forward>,
}

impl Flow {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Forward {
    pub service: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: BTreeMap<String, Property>,
}
