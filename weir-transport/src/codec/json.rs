use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use weir_core::types::{ParameterMap, Property, PropertyType, Value};
use weir_refs::{resolve_property, Store};

use crate::codec::{Constructor, Manager};
use crate::error::CodecError;

/// The built-in JSON codec. Schema-driven: both directions walk the bound
/// parameter map, never the raw payload shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Constructor for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn new_manager(
        &self,
        resource: &str,
        schema: &ParameterMap,
    ) -> Result<Box<dyn Manager>, CodecError> {
        Ok(Box::new(JsonManager {
            resource: resource.to_string(),
            schema: schema.clone(),
        }))
    }
}

pub struct JsonManager {
    resource: String,
    schema: ParameterMap,
}

impl Manager for JsonManager {
    fn name(&self) -> &str {
        "json"
    }

    fn marshal(&self, store: &Store) -> Result<Vec<u8>, CodecError> {
        let Some(body) = &self.schema.body else {
            return Ok(Vec::new());
        };

        let rendered = render(body, store)?.unwrap_or(JsonValue::Null);
        serde_json::to_vec(&rendered).map_err(|e| CodecError::InvalidPayload(e.to_string()))
    }

    fn unmarshal(&self, payload: &[u8], store: &Store) -> Result<(), CodecError> {
        let Some(body) = &self.schema.body else {
            store.store_empty(&self.resource);
            return Ok(());
        };

        if payload.is_empty() {
            store.store_empty(&self.resource);
            return Ok(());
        }

        let json: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| CodecError::InvalidPayload(e.to_string()))?;

        decode(body, "", &json, &self.resource, store)?;
        store.store_empty(&self.resource);
        Ok(())
    }

    fn property(&self, store: &Store, path: &str) -> Option<Value> {
        if let Some(value) = store.load(&self.resource, path) {
            return Some(value);
        }

        let body = self.schema.body.as_ref()?;
        let property = lookup(body, path)?;
        resolve_property(property, store).ok().flatten()
    }
}

/// Render a property subtree against the store. `None` omits the field.
fn render(property: &Property, store: &Store) -> Result<Option<JsonValue>, CodecError> {
    match property.kind {
        PropertyType::Message => {
            if property.reference.is_some() {
                return Ok(resolve_property(property, store)?.map(|value| value.to_json()));
            }

            let Some(fields) = &property.nested else {
                return Ok(None);
            };

            let mut object = serde_json::Map::new();
            for (name, field) in fields {
                if let Some(value) = render(field, store)? {
                    object.insert(name.clone(), value);
                }
            }
            Ok(Some(JsonValue::Object(object)))
        }
        PropertyType::Array => {
            Ok(resolve_property(property, store)?.map(|value| value.to_json()))
        }
        _ => Ok(resolve_property(property, store)?.map(|value| value.to_json())),
    }
}

/// Decode a JSON subtree into the resource frame, schema-guided. Unknown
/// payload fields are ignored; missing fields stay unwritten so reads fall
/// back to defaults.
fn decode(
    property: &Property,
    path: &str,
    json: &JsonValue,
    resource: &str,
    store: &Store,
) -> Result<(), CodecError> {
    // The whole subtree is stored at its own path as well, so references can
    // address containers, not just leaves. The root lands at the empty path.
    let value = typed(property, path, json)?;
    store.store_value(resource, path, value);

    if property.kind == PropertyType::Message {
        if let (Some(fields), JsonValue::Object(object)) = (&property.nested, json) {
            for (name, field) in fields {
                if let Some(child) = object.get(name) {
                    decode(field, &join(path, name), child, resource, store)?;
                }
            }
        }
    }

    Ok(())
}

/// Convert a JSON subtree into a typed value per the schema property.
fn typed(property: &Property, path: &str, json: &JsonValue) -> Result<Value, CodecError> {
    match property.kind {
        PropertyType::Message => {
            let JsonValue::Object(object) = json else {
                return Err(mismatch(path, property.kind));
            };
            let mut fields = BTreeMap::new();
            if let Some(nested) = &property.nested {
                for (name, field) in nested {
                    if let Some(child) = object.get(name) {
                        fields.insert(name.clone(), typed(field, &join(path, name), child)?);
                    }
                }
            }
            Ok(Value::Message(fields))
        }
        PropertyType::Array => {
            let JsonValue::Array(items) = json else {
                return Err(mismatch(path, property.kind));
            };
            let Some(template) = &property.repeated else {
                return Ok(Value::Array(Vec::new()));
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(typed(template, path, item)?);
            }
            Ok(Value::Array(out))
        }
        kind => Value::from_json(kind, json).ok_or_else(|| mismatch(path, kind)),
    }
}

fn lookup<'a>(property: &'a Property, path: &str) -> Option<&'a Property> {
    let mut current = property;
    for segment in path.split('.') {
        current = current.nested.as_ref()?.get(segment)?;
    }
    Some(current)
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn mismatch(path: &str, expected: PropertyType) -> CodecError {
    CodecError::UnexpectedType {
        path: path.to_string(),
        expected,
    }
}
