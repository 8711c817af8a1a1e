use weir_core::types::{ParameterMap, Value};
use weir_refs::Store;
use weir_transport::codec::{Constructor, JsonCodec};
use weir_transport::CodecError;

fn schema(body: serde_json::Value) -> ParameterMap {
    serde_json::from_value(serde_json::json!({ "body": body })).expect("schema parses")
}

#[test]
fn unmarshal_stores_typed_values_by_path() {
    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {
            "id": {"type": "int64"},
            "title": {"type": "string"},
            "completed": {"type": "bool"},
            "user": {"type": "message", "nested": {
                "name": {"type": "string"}
            }}
        }
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    let store = Store::new();
    manager
        .unmarshal(
            br#"{"id": 1, "title": "delectus", "completed": false, "user": {"name": "bret"}}"#,
            &store,
        )
        .expect("payload decodes");

    assert_eq!(store.load("a", "id"), Some(Value::Int64(1)));
    assert_eq!(store.load("a", "title"), Some(Value::String("delectus".to_string())));
    assert_eq!(store.load("a", "completed"), Some(Value::Bool(false)));
    assert_eq!(store.load("a", "user.name"), Some(Value::String("bret".to_string())));
}

#[test]
fn unmarshal_ignores_unknown_payload_fields() {
    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {"id": {"type": "int64"}}
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    let store = Store::new();
    manager
        .unmarshal(br#"{"id": 2, "unknown": {"nested": true}}"#, &store)
        .expect("payload decodes");

    assert_eq!(store.load("a", "id"), Some(Value::Int64(2)));
    assert_eq!(store.load("a", "unknown"), None);
}

#[test]
fn unmarshal_rejects_invalid_json() {
    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {"id": {"type": "int64"}}
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    let store = Store::new();
    let err = manager.unmarshal(b"{not json", &store).unwrap_err();
    assert!(matches!(err, CodecError::InvalidPayload(_)));
}

#[test]
fn unmarshal_rejects_kind_mismatches() {
    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {"id": {"type": "int64"}}
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    let store = Store::new();
    let err = manager.unmarshal(br#"{"id": "one"}"#, &store).unwrap_err();
    assert!(matches!(err, CodecError::UnexpectedType { ref path, .. } if path == "id"));
}

#[test]
fn unmarshal_decodes_arrays_through_the_element_template() {
    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {
            "tags": {"type": "array", "repeated": {"type": "string"}}
        }
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    let store = Store::new();
    manager
        .unmarshal(br#"{"tags": ["x", "y"]}"#, &store)
        .expect("payload decodes");

    assert_eq!(
        store.load("a", "tags"),
        Some(Value::Array(vec![
            Value::String("x".to_string()),
            Value::String("y".to_string()),
        ]))
    );
}

#[test]
fn marshal_expands_references_against_the_store() {
    let store = Store::new();
    store.store_value("a", "id", Value::Int64(1));
    store.store_value("b", "username", Value::String("bret".to_string()));

    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {
            "id": {"type": "int64", "reference": "{{ a:id }}"},
            "username": {"type": "string", "reference": "{{ b:username }}"}
        }
    }));

    let manager = JsonCodec.new_manager("output", &map).expect("manager builds");
    let rendered: serde_json::Value =
        serde_json::from_slice(&manager.marshal(&store).expect("marshals")).expect("valid JSON");

    assert_eq!(
        rendered,
        serde_json::json!({"id": 1, "username": "bret"})
    );
}

#[test]
fn marshal_omits_unresolved_optional_fields() {
    let store = Store::new();

    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {
            "present": {"type": "string", "default": "yes"},
            "absent": {"type": "string"}
        }
    }));

    let manager = JsonCodec.new_manager("output", &map).expect("manager builds");
    let rendered: serde_json::Value =
        serde_json::from_slice(&manager.marshal(&store).expect("marshals")).expect("valid JSON");

    assert_eq!(rendered, serde_json::json!({"present": "yes"}));
}

#[test]
fn property_reads_the_store_first_and_the_schema_second() {
    let store = Store::new();
    store.store_value("a", "id", Value::Int64(9));

    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {
            "id": {"type": "int64"},
            "label": {"type": "string", "default": "todo"}
        }
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    assert_eq!(manager.property(&store, "id"), Some(Value::Int64(9)));
    assert_eq!(
        manager.property(&store, "label"),
        Some(Value::String("todo".to_string()))
    );
    assert_eq!(manager.property(&store, "missing"), None);
}

#[test]
fn empty_payload_records_an_empty_frame() {
    let map = schema(serde_json::json!({
        "type": "message",
        "nested": {"id": {"type": "int64"}}
    }));

    let manager = JsonCodec.new_manager("a", &map).expect("manager builds");
    let store = Store::new();
    manager.unmarshal(b"", &store).expect("empty payload is fine");
    assert!(store.has_frame("a"));
}
