use std::collections::BTreeMap;

use crate::types::Property;

/// A request or response payload description: a property tree for the body
/// plus a header map. Helper functions referenced by template expressions are
/// registered at bind time, not inside the manifest.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ParameterMap {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: BTreeMap<String, Property>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Property>,
}

impl ParameterMap {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_none()
    }
}
