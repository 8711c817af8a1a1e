mod common;

use common::{manifest, mock_options, mock_service, Behavior, MockTransport};
use weir_exec::bind;
use weir_transport::IncomingRequest;

/// A payload the endpoint codec cannot decode is a protocol-level bad
/// request; the flow never runs.
#[tokio::test]
async fn undecodable_request_bodies_return_bad_request() {
    let manifest = manifest(serde_json::json!({
        "services": [mock_service(&["work"])],
        "flows": [{
            "name": "checked",
            "input": {
                "body": {"type": "message", "nested": {"id": {"type": "int64"}}}
            },
            "nodes": [
                {"id": "a", "call": {"service": "api", "method": "work"}}
            ]
        }],
        "endpoints": [{"listener": "test", "flow": "checked", "codec": "json"}]
    }));

    let transport = MockTransport::new();
    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&manifest, &options).await.expect("manifest binds");

    let response = listener
        .dispatch()
        .dispatch(IncomingRequest {
            header: Default::default(),
            body: b"{broken".to_vec(),
            deadline: None,
        })
        .await;

    assert_eq!(response.status, 400);
    assert!(transport.started().is_empty(), "the flow must not run");
}

/// A node-level error recipe overrides the flow's, and its templates can
/// address the populated error scope.
#[tokio::test]
async fn node_error_recipes_override_the_flow_default() {
    let manifest = manifest(serde_json::json!({
        "services": [mock_service(&["work"])],
        "flows": [{
            "name": "custom-errors",
            "on_error": {
                "status": {"type": "int32", "default": 500},
                "message": {"type": "string", "default": "flow default"}
            },
            "nodes": [
                {
                    "id": "a",
                    "call": {"service": "api", "method": "work"},
                    "on_error": {
                        "status": {"type": "int32", "default": 422},
                        "message": {"type": "string", "reference": "{{ error:message }}"},
                        "response": {
                            "body": {"type": "message", "nested": {
                                "code": {"type": "int32", "reference": "{{ error:status }}"},
                                "reason": {"type": "string", "reference": "{{ error:message }}"}
                            }}
                        }
                    }
                }
            ]
        }],
        "endpoints": [{"listener": "test", "flow": "custom-errors", "codec": "json"}]
    }));

    let transport = MockTransport::new();
    transport.behave("work", Behavior::status(500));

    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&manifest, &options).await.expect("manifest binds");

    let response = listener
        .dispatch()
        .dispatch(IncomingRequest::default())
        .await;

    assert_eq!(response.status, 422);
    let body: serde_json::Value = serde_json::from_slice(&response.body).expect("valid JSON");
    assert_eq!(
        body,
        serde_json::json!({"code": 500, "reason": "upstream returned status 500"})
    );
}

/// An upstream error payload decodes into the error scope through the
/// configured response schema and is addressable from the rendered body.
#[tokio::test]
async fn upstream_error_payloads_decode_into_the_error_scope() {
    let manifest = manifest(serde_json::json!({
        "services": [mock_service(&["work"])],
        "flows": [{
            "name": "decoded-errors",
            "on_error": {
                "status": {"type": "int32", "default": 409},
                "response": {
                    "body": {"type": "message", "nested": {
                        "detail": {"type": "string", "reference": "{{ error:detail }}"}
                    }}
                }
            },
            "nodes": [
                {"id": "a", "call": {"service": "api", "method": "work"}}
            ]
        }],
        "endpoints": [{"listener": "test", "flow": "decoded-errors", "codec": "json"}]
    }));

    let transport = MockTransport::new();
    let mut behavior = Behavior::status(409);
    behavior.body = br#"{"detail": "out of stock"}"#.to_vec();
    transport.behave("work", behavior);

    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&manifest, &options).await.expect("manifest binds");

    let response = listener
        .dispatch()
        .dispatch(IncomingRequest::default())
        .await;

    assert_eq!(response.status, 409);
    let body: serde_json::Value = serde_json::from_slice(&response.body).expect("valid JSON");
    assert_eq!(body, serde_json::json!({"detail": "out of stock"}));
}

/// Without any configured recipe the built-in default applies: status 500
/// and the error's underlying text.
#[tokio::test]
async fn missing_error_recipes_fall_back_to_internal() {
    let manifest = manifest(serde_json::json!({
        "services": [mock_service(&["work"])],
        "flows": [{
            "name": "bare",
            "nodes": [
                {"id": "a", "call": {"service": "api", "method": "work"}}
            ]
        }],
        "endpoints": [{"listener": "test", "flow": "bare", "codec": "json"}]
    }));

    let transport = MockTransport::new();
    transport.behave("work", Behavior::status(503));

    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&manifest, &options).await.expect("manifest binds");

    let response = listener
        .dispatch()
        .dispatch(IncomingRequest::default())
        .await;

    assert_eq!(response.status, 500);
    let text = String::from_utf8_lossy(&response.body);
    assert!(text.contains("node 'a' failed"), "unexpected body: {text}");
    assert!(text.contains("503"), "unexpected body: {text}");
}

/// A runtime type mismatch is fatal to the invocation and surfaces as
/// Internal, never through the error recipe.
#[tokio::test]
async fn type_mismatches_surface_as_internal() {
    let manifest = manifest(serde_json::json!({
        "services": [mock_service(&["first", "second"])],
        "flows": [{
            "name": "mismatch",
            "on_error": {
                "status": {"type": "int32", "default": 409},
                "message": {"type": "string", "default": "should not be used"}
            },
            "nodes": [
                {"id": "a", "call": {"service": "api", "method": "first", "response": {
                    "body": {"type": "message", "nested": {"title": {"type": "string"}}}
                }}},
                {"id": "b", "call": {"service": "api", "method": "second", "request": {
                    "body": {"type": "message", "nested": {
                        "flag": {"type": "bool", "reference": "{{ a:title }}"}
                    }}
                }}}
            ]
        }],
        "endpoints": [{"listener": "test", "flow": "mismatch", "codec": "json"}]
    }));

    let transport = MockTransport::new();
    transport.behave("first", Behavior::json(serde_json::json!({"title": "text"})));

    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&manifest, &options).await.expect("manifest binds");

    let response = listener
        .dispatch()
        .dispatch(IncomingRequest::default())
        .await;

    assert_eq!(response.status, 500);
    let text = String::from_utf8_lossy(&response.body);
    assert!(text.contains("type mismatch"), "unexpected body: {text}");
    assert!(
        transport.completed_call("second").is_none(),
        "the mismatching call must not reach the upstream"
    );
}

/// Binding rejects endpoints whose listener or codec is not registered.
#[tokio::test]
async fn binding_rejects_unknown_plugins() {
    let transport = MockTransport::new();
    let (options, _listener) = mock_options(&transport);

    let unknown_listener = manifest(serde_json::json!({
        "flows": [{"name": "empty", "nodes": []}],
        "endpoints": [{"listener": "ghost", "flow": "empty"}]
    }));
    let err = bind(&unknown_listener, &options).await.unwrap_err();
    assert!(err.to_string().contains("unknown listener 'ghost'"));

    let unknown_codec = manifest(serde_json::json!({
        "flows": [{"name": "empty", "nodes": []}],
        "endpoints": [{"listener": "test", "flow": "empty", "codec": "protobuf"}]
    }));
    let err = bind(&unknown_codec, &options).await.unwrap_err();
    assert!(err.to_string().contains("unknown codec 'protobuf'"));
}
