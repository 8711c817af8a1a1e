use std::collections::BTreeMap;
use std::sync::Arc;

use weir_core::template::ERROR_RESOURCE;
use weir_core::types::{Property, Value};
use weir_refs::{resolve_header, Store};
use weir_transport::codec::Manager;
use weir_transport::{CallContext, CallerMethod, CodecError, TransportError};

use crate::error::{ExecutionError, NodeFailure};

/// A call compiled against its transport method and codec managers.
pub struct CompiledCall {
    pub method: Arc<dyn CallerMethod>,
    pub request_header: BTreeMap<String, Property>,
    pub request: Box<dyn Manager>,
    pub response: Box<dyn Manager>,
}

/// A node with its statically derived predecessors attached.
pub struct CompiledNode {
    pub id: String,
    pub index: usize,
    /// Indices of the nodes this one waits on.
    pub deps: Vec<usize>,
    pub call: Option<CompiledCall>,
    pub rollback: Option<CompiledCall>,
    /// Decodes an upstream error payload into the `error` scope, bound to
    /// the codec of the called service.
    pub error_decoder: Option<Box<dyn Manager>>,
}

/// Execute a single node against the store: resolve the request, invoke the
/// transport, record the response. A node without a call records an empty
/// frame and succeeds immediately.
pub async fn execute(
    node: &CompiledNode,
    ctx: &CallContext,
    store: &Store,
) -> Result<(), ExecutionError> {
    let Some(call) = &node.call else {
        store.store_empty(&node.id);
        return Ok(());
    };

    let header = resolve_header(&call.request_header, store)?;
    let body = call
        .request
        .marshal(store)
        .map_err(|e| codec_failure(&node.id, e))?;

    let response = match call.method.send(ctx, body, &header).await {
        Ok(response) => response,
        Err(TransportError::Cancelled) => return Err(ExecutionError::Cancelled),
        Err(e) => {
            record_error_context(store, None, e.to_string());
            return Err(ExecutionError::node_failed(
                &node.id,
                NodeFailure::Transport(e),
            ));
        }
    };

    if response.status >= 400 {
        record_error_context(
            store,
            Some(response.status),
            format!("upstream returned status {}", response.status),
        );
        store.store_header(ERROR_RESOURCE, response.header);

        if let Some(decoder) = &node.error_decoder {
            // Best effort: an undecodable error body must not mask the
            // upstream failure.
            let _ = decoder.unmarshal(&response.body, store);
        }

        return Err(ExecutionError::node_failed(
            &node.id,
            NodeFailure::Status {
                status: response.status,
            },
        ));
    }

    call.response
        .unmarshal(&response.body, store)
        .map_err(|e| codec_failure(&node.id, e))?;
    store.store_header(&node.id, response.header);

    Ok(())
}

/// Execute a node's compensating call. The response body is discarded; a
/// frame is only ever written once per invocation.
pub async fn execute_rollback(
    node: &CompiledNode,
    ctx: &CallContext,
    store: &Store,
) -> Result<(), ExecutionError> {
    let Some(call) = &node.rollback else {
        return Ok(());
    };

    let header = resolve_header(&call.request_header, store)?;
    let body = call
        .request
        .marshal(store)
        .map_err(|e| codec_failure(&node.id, e))?;

    let response = call
        .method
        .send(ctx, body, &header)
        .await
        .map_err(|e| ExecutionError::node_failed(&node.id, NodeFailure::Transport(e)))?;

    if response.status >= 400 {
        return Err(ExecutionError::node_failed(
            &node.id,
            NodeFailure::Status {
                status: response.status,
            },
        ));
    }

    Ok(())
}

/// Seed the `error` scope with the failure's status and message so error
/// templates can address `{{ error:status }}` and `{{ error:message }}`.
fn record_error_context(store: &Store, status: Option<u16>, message: String) {
    store.store_value(
        ERROR_RESOURCE,
        "status",
        Value::Int64(i64::from(status.unwrap_or(500))),
    );
    store.store_value(ERROR_RESOURCE, "message", Value::String(message));
}

/// Reference resolution failures inside a codec are fatal type mismatches;
/// everything else is a node-local failure.
fn codec_failure(node: &str, error: CodecError) -> ExecutionError {
    match error {
        CodecError::Resolve(e) => ExecutionError::TypeMismatch(e),
        other => ExecutionError::node_failed(node, NodeFailure::Codec(other)),
    }
}
