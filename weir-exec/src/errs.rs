use std::collections::BTreeMap;

use weir_core::types::{ErrorObject, Property, Value};
use weir_refs::{resolve_property, Store};
use weir_transport::codec::{Constructor, Manager};
use weir_transport::CodecError;

use crate::error::ExecutionError;

pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// An error recipe bound to a codec, ready to be rendered against a store
/// whose `error` scope is populated.
pub struct CompiledErrorObject {
    status: Option<Property>,
    message: Option<Property>,
    params: BTreeMap<String, Property>,
    response: Option<Box<dyn Manager>>,
}

impl CompiledErrorObject {
    /// Compile an error object with the given codec. `None` yields the
    /// built-in default: status 500, the error's underlying text, no body.
    pub fn compile(
        object: Option<&ErrorObject>,
        codec: &dyn Constructor,
    ) -> Result<Self, CodecError> {
        let Some(object) = object else {
            return Ok(Self {
                status: None,
                message: None,
                params: BTreeMap::new(),
                response: None,
            });
        };

        let response = object
            .response
            .as_ref()
            .map(|schema| codec.new_manager(weir_core::template::ERROR_RESOURCE, schema))
            .transpose()?;

        Ok(Self {
            status: object.status.clone(),
            message: object.message.clone(),
            params: object.params.clone(),
            response,
        })
    }

    /// Status code via template expansion; defaults to 500.
    pub fn resolve_status(&self, store: &Store) -> u16 {
        let Some(property) = &self.status else {
            return DEFAULT_ERROR_STATUS;
        };

        match resolve_property(property, store) {
            Ok(Some(value)) => status_from_value(value).unwrap_or(DEFAULT_ERROR_STATUS),
            _ => DEFAULT_ERROR_STATUS,
        }
    }

    /// Message via template expansion; defaults to the origin's text.
    pub fn resolve_message(&self, store: &Store, origin: &ExecutionError) -> String {
        let Some(property) = &self.message else {
            return origin.to_string();
        };

        match resolve_property(property, store) {
            Ok(Some(value)) => value.canonical_string(),
            _ => origin.to_string(),
        }
    }

    /// Render the failure body, when a response map is configured.
    pub fn render(&self, store: &Store) -> Result<Option<Vec<u8>>, CodecError> {
        self.response
            .as_ref()
            .map(|manager| manager.marshal(store))
            .transpose()
    }

    /// Resolve the configured params into the `error` scope so templates in
    /// the response map can address them.
    pub fn populate_params(&self, store: &Store) {
        for (name, property) in &self.params {
            if let Ok(Some(value)) = resolve_property(property, store) {
                store.store_value(weir_core::template::ERROR_RESOURCE, name, value);
            }
        }
    }
}

fn status_from_value(value: Value) -> Option<u16> {
    match value {
        Value::Int32(v) => u16::try_from(v).ok(),
        Value::Int64(v) => u16::try_from(v).ok(),
        Value::Uint32(v) => u16::try_from(v).ok(),
        Value::Uint64(v) => u16::try_from(v).ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
