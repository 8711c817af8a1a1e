use std::collections::BTreeMap;

use thiserror::Error;
use weir_core::template::Reference;
use weir_core::types::{Label, Property, PropertyType, Value};

use crate::store::{HeaderMap, Store};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("type mismatch resolving '{reference}': expected {expected}, found {found}")]
    TypeMismatch {
        reference: String,
        expected: PropertyType,
        found: PropertyType,
    },
}

/// Resolve a scalar property's runtime value against the store.
///
/// A set reference reads the referenced resource; a missing value falls back
/// to the property default, then the typed zero. Integer widths coerce
/// freely; any other kind mismatch is fatal to the invocation.
///
/// Returns `None` only for optional properties with no reference and no
/// default, which renderers omit from the payload.
pub fn resolve_property(property: &Property, store: &Store) -> Result<Option<Value>, ResolveError> {
    if let Some(reference) = &property.reference {
        if let Some(value) = load_reference(reference, property.kind, store)? {
            return Ok(Some(value));
        }
        return Ok(Some(fallback(property)));
    }

    if let Some(default) = property.default_value() {
        return Ok(Some(default));
    }

    match property.label {
        Label::Required => Ok(Some(Value::zero(property.kind))),
        Label::Optional | Label::Repeated => Ok(None),
    }
}

/// Load and coerce the value a reference points at. `None` when the store
/// holds nothing at the referenced path.
pub fn load_reference(
    reference: &Reference,
    expected: PropertyType,
    store: &Store,
) -> Result<Option<Value>, ResolveError> {
    let Some(value) = store.load_in(&reference.resource, reference.section, &reference.path) else {
        return Ok(None);
    };

    let found = value.kind();
    match value.coerce(expected) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ResolveError::TypeMismatch {
            reference: reference.to_string(),
            expected,
            found,
        }),
    }
}

/// Render a header property map to wire strings in canonical form. Entries
/// that resolve to nothing are omitted.
pub fn resolve_header(
    header: &BTreeMap<String, Property>,
    store: &Store,
) -> Result<HeaderMap, ResolveError> {
    let mut out = HeaderMap::new();
    for (key, property) in header {
        if let Some(value) = resolve_property(property, store)? {
            out.insert(key.to_lowercase(), value.canonical_string());
        }
    }
    Ok(out)
}

fn fallback(property: &Property) -> Value {
    property
        .default_value()
        .unwrap_or_else(|| Value::zero(property.kind))
}
