mod common;

use std::time::Duration;

use common::{manifest, mock_options, mock_service, Behavior, MockTransport};
use weir_exec::bind;
use weir_transport::IncomingRequest;

fn slow_chain() -> weir_core::Manifest {
    manifest(serde_json::json!({
        "services": [mock_service(&["create_a", "undo_a", "create_b", "create_c"])],
        "flows": [{
            "name": "slow",
            "nodes": [
                {
                    "id": "a",
                    "call": {"service": "api", "method": "create_a", "response": {
                        "body": {"type": "message", "nested": {"token": {"type": "string"}}}
                    }},
                    "rollback": {"service": "api", "method": "undo_a"}
                },
                {
                    "id": "b",
                    "call": {"service": "api", "method": "create_b", "request": {
                        "body": {"type": "message", "nested": {
                            "token": {"type": "string", "reference": "{{ a:token }}"}
                        }}
                    }}
                },
                {
                    "id": "c",
                    "call": {"service": "api", "method": "create_c", "request": {
                        "body": {"type": "message", "nested": {
                            "token": {"type": "string", "reference": "{{ b:token }}"}
                        }}
                    }}
                }
            ]
        }],
        "endpoints": [{"listener": "test", "flow": "slow", "codec": "json"}]
    }))
}

/// Cancelling mid-flight: the running node observes the cancellation, later
/// nodes never start, completed work is rolled back, and the endpoint
/// answers with a cancellation-class status.
#[tokio::test]
async fn deadline_cancels_running_nodes_and_rolls_back() {
    let transport = MockTransport::new();
    transport.behave(
        "create_a",
        Behavior::json(serde_json::json!({"token": "t-1"})).delayed(Duration::from_millis(10)),
    );
    transport.behave(
        "create_b",
        Behavior::json(serde_json::json!({})).delayed(Duration::from_secs(30)),
    );

    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&slow_chain(), &options).await.expect("manifest binds");

    let response = listener
        .dispatch()
        .dispatch(IncomingRequest {
            header: Default::default(),
            body: Vec::new(),
            deadline: Some(Duration::from_millis(150)),
        })
        .await;

    assert_eq!(response.status, 499, "cancellation-class status expected");

    let started = transport.started();
    assert!(started.contains(&"create_b".to_string()), "b was in flight");
    assert!(!started.contains(&"create_c".to_string()), "c never starts");
    assert!(
        transport.completed_call("create_b").is_none(),
        "b's transport call observed the cancellation"
    );
    assert!(
        transport.completed_call("undo_a").is_some(),
        "completed work is still rolled back"
    );
}

/// All workers reach a terminal state within bounded time once cancellation
/// is asserted, even with a long upstream delay configured.
#[tokio::test]
async fn cancellation_terminates_the_invocation_promptly() {
    let transport = MockTransport::new();
    transport.behave("create_a", Behavior::json(serde_json::json!({"token": "t"})));
    transport.behave(
        "create_b",
        Behavior::json(serde_json::json!({})).delayed(Duration::from_secs(600)),
    );

    let (options, listener) = mock_options(&transport);
    let _runtime = bind(&slow_chain(), &options).await.expect("manifest binds");

    let dispatch = listener.dispatch();
    let response = tokio::time::timeout(
        Duration::from_secs(5),
        dispatch.dispatch(IncomingRequest {
            header: Default::default(),
            body: Vec::new(),
            deadline: Some(Duration::from_millis(50)),
        }),
    )
    .await
    .expect("invocation must terminate well before the upstream delay");

    assert_eq!(response.status, 499);
}
