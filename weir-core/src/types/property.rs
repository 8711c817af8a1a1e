use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::template::Reference;
use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    String,
    Bytes,
    Enum,
    Message,
    Array,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Bool => "bool",
            PropertyType::Int32 => "int32",
            PropertyType::Int64 => "int64",
            PropertyType::Uint32 => "uint32",
            PropertyType::Uint64 => "uint64",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::Bytes => "bytes",
            PropertyType::Enum => "enum",
            PropertyType::Message => "message",
            PropertyType::Array => "array",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Required,
    #[default]
    Optional,
    Repeated,
}

/// The universal typed value node of the manifest data model.
///
/// Exactly one of `{default, reference, nested, repeated}` resolves a
/// property's runtime value; type and label are immutable once constructed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: PropertyType,

    #[serde(default)]
    pub label: Label,

    /// Literal fallback, expressed as a JSON scalar matching `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,

    /// Field map for `message` properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<BTreeMap<String, Property>>,

    /// Element template for `array` properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<Box<Property>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl Property {
    pub fn scalar(kind: PropertyType) -> Self {
        Self {
            kind,
            label: Label::Optional,
            default: None,
            reference: None,
            nested: None,
            repeated: None,
            enum_values: None,
        }
    }

    pub fn referenced(kind: PropertyType, reference: Reference) -> Self {
        Self {
            reference: Some(reference),
            ..Self::scalar(kind)
        }
    }

    /// The typed default literal, if one is configured and matches `kind`.
    pub fn default_value(&self) -> Option<Value> {
        self.default
            .as_ref()
            .and_then(|literal| Value::from_json(self.kind, literal))
    }
}
