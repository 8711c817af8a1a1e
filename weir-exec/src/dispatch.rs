use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::error;
use uuid::Uuid;

use weir_core::template::INPUT_RESOURCE;
use weir_core::types::Property;
use weir_refs::{resolve_header, HeaderMap, Store};
use weir_transport::codec::Manager;
use weir_transport::{
    CallContext, CallerMethod, Dispatch, IncomingRequest, OutgoingResponse,
};

use crate::error::ExecutionError;
use crate::errs::{CompiledErrorObject, DEFAULT_ERROR_STATUS};
use crate::events::{Event, EventSink};
use crate::flow::FlowManager;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_CLIENT_CLOSED: u16 = 499;

/// A pass-through target rendered when a flow maps no output body.
pub struct CompiledForward {
    pub method: Arc<dyn CallerMethod>,
    pub header: BTreeMap<String, Property>,
}

/// The listener-facing side of one endpoint: decodes the request into the
/// store, executes the flow, and encodes the response or the rendered
/// error. The sole point translating internal error kinds to protocol
/// status.
pub struct EndpointDispatcher {
    flow: Arc<FlowManager>,
    request: Box<dyn Manager>,
    response: Option<Box<dyn Manager>>,
    response_header: BTreeMap<String, Property>,
    forward: Option<CompiledForward>,
    /// Effective error recipe per node id, inheritance already applied.
    node_errors: HashMap<String, Arc<CompiledErrorObject>>,
    flow_error: Arc<CompiledErrorObject>,
    deadline: Option<Duration>,
    events: Arc<dyn EventSink>,
}

impl EndpointDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow: Arc<FlowManager>,
        request: Box<dyn Manager>,
        response: Option<Box<dyn Manager>>,
        response_header: BTreeMap<String, Property>,
        forward: Option<CompiledForward>,
        node_errors: HashMap<String, Arc<CompiledErrorObject>>,
        flow_error: Arc<CompiledErrorObject>,
        deadline: Option<Duration>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            flow,
            request,
            response,
            response_header,
            forward,
            node_errors,
            flow_error,
            deadline,
            events,
        }
    }

    async fn respond(
        &self,
        ctx: &CallContext,
        store: &Store,
        raw_body: Vec<u8>,
    ) -> OutgoingResponse {
        let header = match resolve_header(&self.response_header, store) {
            Ok(header) => header,
            Err(e) => return internal(&ExecutionError::TypeMismatch(e)),
        };

        if let Some(codec) = &self.response {
            return match codec.marshal(store) {
                Ok(body) => OutgoingResponse {
                    status: STATUS_OK,
                    header,
                    body,
                },
                Err(e) => internal(&ExecutionError::Transport(e.into())),
            };
        }

        if let Some(forward) = &self.forward {
            return self.forward_request(forward, ctx, store, raw_body, header).await;
        }

        OutgoingResponse {
            status: STATUS_OK,
            header,
            body: Vec::new(),
        }
    }

    async fn forward_request(
        &self,
        forward: &CompiledForward,
        ctx: &CallContext,
        store: &Store,
        raw_body: Vec<u8>,
        mut header: HeaderMap,
    ) -> OutgoingResponse {
        let forward_header = match resolve_header(&forward.header, store) {
            Ok(resolved) => resolved,
            Err(e) => return internal(&ExecutionError::TypeMismatch(e)),
        };

        let mut outgoing = store.header(INPUT_RESOURCE);
        outgoing.extend(forward_header);

        match forward.method.send(ctx, raw_body, &outgoing).await {
            Ok(response) => {
                header.extend(response.header);
                OutgoingResponse {
                    status: response.status,
                    header,
                    body: response.body,
                }
            }
            Err(e) => internal(&ExecutionError::Transport(e)),
        }
    }

    /// Locate the error recipe for the failure's root cause and render the
    /// protocol-level failure through it.
    fn fail(&self, err: ExecutionError, store: &Store) -> OutgoingResponse {
        match &err {
            ExecutionError::Cancelled => OutgoingResponse {
                status: STATUS_CLIENT_CLOSED,
                header: HeaderMap::new(),
                body: err.to_string().into_bytes(),
            },
            ExecutionError::NodeFailed { node, .. } => {
                let object = self
                    .node_errors
                    .get(node)
                    .unwrap_or(&self.flow_error)
                    .clone();

                object.populate_params(store);
                let status = object.resolve_status(store);
                let message = object.resolve_message(store, &err);

                let body = match object.render(store) {
                    Ok(Some(body)) => body,
                    Ok(None) => message.into_bytes(),
                    Err(render_error) => {
                        error!(%render_error, "unable to render error response");
                        message.into_bytes()
                    }
                };

                OutgoingResponse {
                    status,
                    header: HeaderMap::new(),
                    body,
                }
            }
            _ => internal(&err),
        }
    }
}

#[async_trait]
impl Dispatch for EndpointDispatcher {
    async fn dispatch(&self, request: IncomingRequest) -> OutgoingResponse {
        let invocation = Uuid::new_v4();
        let store = self.flow.new_store();

        store.store_header(INPUT_RESOURCE, request.header.clone());
        if let Err(e) = self.request.unmarshal(&request.body, &store) {
            return OutgoingResponse {
                status: STATUS_BAD_REQUEST,
                header: HeaderMap::new(),
                body: format!("invalid message body: {e}").into_bytes(),
            };
        }

        let ctx = CallContext {
            cancel: CancellationToken::new(),
            deadline: request.deadline.or(self.deadline),
        };

        self.events
            .emit(Event::FlowStarted {
                invocation,
                flow: self.flow.name.clone(),
            })
            .await;

        match self.flow.run(invocation, &ctx, &store).await {
            Ok(()) => {
                self.events
                    .emit(Event::FlowSucceeded {
                        invocation,
                        flow: self.flow.name.clone(),
                    })
                    .await;
                self.respond(&ctx, &store, request.body).await
            }
            Err(err) => {
                self.events
                    .emit(Event::FlowFailed {
                        invocation,
                        flow: self.flow.name.clone(),
                        message: err.to_string(),
                    })
                    .await;
                self.fail(err, &store)
            }
        }
    }
}

fn internal(err: &ExecutionError) -> OutgoingResponse {
    OutgoingResponse {
        status: DEFAULT_ERROR_STATUS,
        header: HeaderMap::new(),
        body: err.to_string().into_bytes(),
    }
}
