use std::collections::BTreeMap;

use weir_core::template::{parse, Reference};
use weir_core::types::{Label, Property, PropertyType, Value};
use weir_refs::{resolve_header, resolve_property, ResolveError, Store};

fn referenced(kind: PropertyType, reference: &str) -> Property {
    Property::referenced(kind, parse(reference).expect("reference parses"))
}

#[test]
fn references_resolve_to_the_stored_value() {
    let store = Store::new();
    store.store_value("a", "title", Value::String("delectus".to_string()));

    let property = referenced(PropertyType::String, "{{ a:title }}");
    let value = resolve_property(&property, &store).expect("resolves");
    assert_eq!(value, Some(Value::String("delectus".to_string())));
}

#[test]
fn missing_references_fall_back_to_the_default() {
    let store = Store::new();
    let mut property = referenced(PropertyType::String, "{{ a:title }}");
    property.default = Some(serde_json::json!("fallback"));

    let value = resolve_property(&property, &store).expect("resolves");
    assert_eq!(value, Some(Value::String("fallback".to_string())));
}

#[test]
fn missing_references_without_default_yield_the_typed_zero() {
    let store = Store::new();

    let string = referenced(PropertyType::String, "{{ a:title }}");
    assert_eq!(
        resolve_property(&string, &store).expect("resolves"),
        Some(Value::String(String::new()))
    );

    let boolean = referenced(PropertyType::Bool, "{{ a:done }}");
    assert_eq!(
        resolve_property(&boolean, &store).expect("resolves"),
        Some(Value::Bool(false))
    );

    let int = referenced(PropertyType::Int64, "{{ a:count }}");
    assert_eq!(
        resolve_property(&int, &store).expect("resolves"),
        Some(Value::Int64(0))
    );
}

#[test]
fn integer_widths_coerce() {
    let store = Store::new();
    store.store_value("a", "count", Value::Int64(7));

    let narrow = referenced(PropertyType::Int32, "{{ a:count }}");
    assert_eq!(
        resolve_property(&narrow, &store).expect("resolves"),
        Some(Value::Int32(7))
    );

    let unsigned = referenced(PropertyType::Uint64, "{{ a:count }}");
    assert_eq!(
        resolve_property(&unsigned, &store).expect("resolves"),
        Some(Value::Uint64(7))
    );
}

#[test]
fn out_of_range_coercion_is_a_type_mismatch() {
    let store = Store::new();
    store.store_value("a", "count", Value::Int64(-1));

    let unsigned = referenced(PropertyType::Uint32, "{{ a:count }}");
    let err = resolve_property(&unsigned, &store).unwrap_err();
    assert!(matches!(err, ResolveError::TypeMismatch { .. }));
}

#[test]
fn cross_kind_references_are_a_type_mismatch() {
    let store = Store::new();
    store.store_value("a", "title", Value::String("text".to_string()));

    let boolean = referenced(PropertyType::Bool, "{{ a:title }}");
    let err = resolve_property(&boolean, &store).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::TypeMismatch { expected: PropertyType::Bool, found: PropertyType::String, .. }
    ));
}

#[test]
fn optional_properties_without_sources_are_omitted() {
    let store = Store::new();
    let property = Property::scalar(PropertyType::String);

    assert_eq!(resolve_property(&property, &store).expect("resolves"), None);
}

#[test]
fn required_properties_without_sources_resolve_to_zero() {
    let store = Store::new();
    let mut property = Property::scalar(PropertyType::Int32);
    property.label = Label::Required;

    assert_eq!(
        resolve_property(&property, &store).expect("resolves"),
        Some(Value::Int32(0))
    );
}

#[test]
fn headers_render_in_canonical_form() {
    let store = Store::new();
    store.store_value("a", "done", Value::Bool(true));
    store.store_value("a", "count", Value::Int64(12));
    store.store_value("a", "ratio", Value::Double(0.5));

    let mut header: BTreeMap<String, Property> = BTreeMap::new();
    header.insert("X-Done".to_string(), referenced(PropertyType::Bool, "{{ a:done }}"));
    header.insert("X-Count".to_string(), referenced(PropertyType::Int64, "{{ a:count }}"));
    header.insert("X-Ratio".to_string(), referenced(PropertyType::Double, "{{ a:ratio }}"));

    let rendered = resolve_header(&header, &store).expect("resolves");
    assert_eq!(rendered.get("x-done"), Some(&"true".to_string()));
    assert_eq!(rendered.get("x-count"), Some(&"12".to_string()));
    assert_eq!(rendered.get("x-ratio"), Some(&"0.5".to_string()));
}

#[test]
fn header_references_read_other_resources_headers() {
    let store = Store::new();
    let mut incoming = weir_refs::HeaderMap::new();
    incoming.insert("authorization".to_string(), "Bearer x".to_string());
    store.store_header("input", incoming);

    let property = Property {
        kind: PropertyType::String,
        label: Label::Optional,
        default: None,
        reference: Some(Reference {
            resource: "input".to_string(),
            section: weir_core::template::Section::Header,
            path: "authorization".to_string(),
        }),
        nested: None,
        repeated: None,
        enum_values: None,
    };

    let value = resolve_property(&property, &store).expect("resolves");
    assert_eq!(value, Some(Value::String("Bearer x".to_string())));
}
