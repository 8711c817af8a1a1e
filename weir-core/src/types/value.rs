use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::types::PropertyType;

/// A resolved runtime value as held by the reference store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(String),
    Array(Vec<Value>),
    Message(BTreeMap<String, Value>),
}

impl Value {
    pub fn kind(&self) -> PropertyType {
        match self {
            Value::Bool(_) => PropertyType::Bool,
            Value::Int32(_) => PropertyType::Int32,
            Value::Int64(_) => PropertyType::Int64,
            Value::Uint32(_) => PropertyType::Uint32,
            Value::Uint64(_) => PropertyType::Uint64,
            Value::Float(_) => PropertyType::Float,
            Value::Double(_) => PropertyType::Double,
            Value::String(_) => PropertyType::String,
            Value::Bytes(_) => PropertyType::Bytes,
            Value::Enum(_) => PropertyType::Enum,
            Value::Array(_) => PropertyType::Array,
            Value::Message(_) => PropertyType::Message,
        }
    }

    /// The typed zero a missing reference without a default resolves to.
    pub fn zero(kind: PropertyType) -> Value {
        match kind {
            PropertyType::Bool => Value::Bool(false),
            PropertyType::Int32 => Value::Int32(0),
            PropertyType::Int64 => Value::Int64(0),
            PropertyType::Uint32 => Value::Uint32(0),
            PropertyType::Uint64 => Value::Uint64(0),
            PropertyType::Float => Value::Float(0.0),
            PropertyType::Double => Value::Double(0.0),
            PropertyType::String => Value::String(String::new()),
            PropertyType::Bytes => Value::Bytes(Vec::new()),
            PropertyType::Enum => Value::Enum(String::new()),
            PropertyType::Message => Value::Message(BTreeMap::new()),
            PropertyType::Array => Value::Array(Vec::new()),
        }
    }

    /// Coerce a literal into the kind a property declares. Used for manifest
    /// defaults and for decoding wire payloads into the store.
    pub fn from_json(kind: PropertyType, value: &JsonValue) -> Option<Value> {
        match (kind, value) {
            (PropertyType::Bool, JsonValue::Bool(b)) => Some(Value::Bool(*b)),
            (PropertyType::Int32, JsonValue::Number(n)) => {
                n.as_i64().and_then(|v| i32::try_from(v).ok()).map(Value::Int32)
            }
            (PropertyType::Int64, JsonValue::Number(n)) => n.as_i64().map(Value::Int64),
            (PropertyType::Uint32, JsonValue::Number(n)) => {
                n.as_u64().and_then(|v| u32::try_from(v).ok()).map(Value::Uint32)
            }
            (PropertyType::Uint64, JsonValue::Number(n)) => n.as_u64().map(Value::Uint64),
            (PropertyType::Float, JsonValue::Number(n)) => n.as_f64().map(|v| Value::Float(v as f32)),
            (PropertyType::Double, JsonValue::Number(n)) => n.as_f64().map(Value::Double),
            (PropertyType::String, JsonValue::String(s)) => Some(Value::String(s.clone())),
            (PropertyType::Bytes, JsonValue::String(s)) => Some(Value::Bytes(s.clone().into_bytes())),
            (PropertyType::Enum, JsonValue::String(s)) => Some(Value::Enum(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int32(v) => JsonValue::from(*v),
            Value::Int64(v) => JsonValue::from(*v),
            Value::Uint32(v) => JsonValue::from(*v),
            Value::Uint64(v) => JsonValue::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bytes(b) => JsonValue::String(String::from_utf8_lossy(b).into_owned()),
            Value::Enum(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Message(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Coerce between integer widths. Any other cross-kind conversion is
    /// rejected; the caller surfaces a type mismatch.
    pub fn coerce(self, target: PropertyType) -> Result<Value, Value> {
        if self.kind() == target {
            return Ok(self);
        }

        let widened: Option<i128> = match &self {
            Value::Int32(v) => Some(i128::from(*v)),
            Value::Int64(v) => Some(i128::from(*v)),
            Value::Uint32(v) => Some(i128::from(*v)),
            Value::Uint64(v) => Some(i128::from(*v)),
            _ => None,
        };

        let Some(widened) = widened else {
            return Err(self);
        };

        let narrowed = match target {
            PropertyType::Int32 => i32::try_from(widened).ok().map(Value::Int32),
            PropertyType::Int64 => i64::try_from(widened).ok().map(Value::Int64),
            PropertyType::Uint32 => u32::try_from(widened).ok().map(Value::Uint32),
            PropertyType::Uint64 => u64::try_from(widened).ok().map(Value::Uint64),
            _ => None,
        };

        narrowed.ok_or(self)
    }

    /// Canonical string form used for header values: booleans `true`/`false`,
    /// integers decimal, floats in shortest round-trip notation.
    pub fn canonical_string(&self) -> String {
        match self {
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Enum(s) => s.clone(),
            Value::Array(_) | Value::Message(_) => self.to_json().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}
