use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use weir_core::types::{Functions, Service};
use weir_refs::HeaderMap;

use crate::error::TransportError;

/// Cancellation and deadline carried through a single invocation. Cloned
/// into every transport call so in-flight requests observe both.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub cancel: CancellationToken,
    pub deadline: Option<Duration>,
}

/// A transport plug-in able to reach services over one protocol.
pub trait Caller: Send + Sync {
    fn name(&self) -> &str;

    /// Open a connection handle for the given service. Helper functions are
    /// handed through so transports can evaluate templated options.
    fn dial(
        &self,
        service: &Service,
        functions: &Functions,
        options: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Connection>, TransportError>;
}

/// A dialed service exposing its unary methods.
pub trait Connection: Send + Sync {
    fn method(&self, name: &str) -> Option<Arc<dyn CallerMethod>>;
}

/// One unary method of a dialed service.
#[async_trait]
pub trait CallerMethod: Send + Sync {
    async fn send(
        &self,
        ctx: &CallContext,
        body: Vec<u8>,
        header: &HeaderMap,
    ) -> Result<CallResponse, TransportError>;
}

/// The raw upstream response. Status uses HTTP semantics; callers for other
/// protocols map their native status space onto it before returning.
#[derive(Debug, Clone)]
pub struct CallResponse {
    pub status: u16,
    pub header: HeaderMap,
    pub body: Vec<u8>,
}

/// A decoded request as handed from a listener to an endpoint.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    pub header: HeaderMap,
    pub body: Vec<u8>,
    pub deadline: Option<Duration>,
}

/// The rendered response a listener writes back to the wire.
#[derive(Debug, Clone)]
pub struct OutgoingResponse {
    pub status: u16,
    pub header: HeaderMap,
    pub body: Vec<u8>,
}

/// The contract by which a listener hands a decoded request to a flow and
/// receives a response or a rendered error. This is the sole point where
/// transport-native failures and internal error kinds translate.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: IncomingRequest) -> OutgoingResponse;
}

/// An endpoint bound to its flow dispatcher, ready to be routed by a
/// listener.
#[derive(Clone)]
pub struct BoundEndpoint {
    pub flow: String,
    pub options: BTreeMap<String, String>,
    pub dispatch: Arc<dyn Dispatch>,
}

/// A protocol server accepting external requests and invoking flows.
///
/// `handle` is idempotent: every invocation replaces the previous routing
/// table atomically without interrupting in-flight requests.
#[async_trait]
pub trait Listener: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, endpoints: Vec<BoundEndpoint>) -> Result<(), TransportError>;

    /// Serve until closed.
    async fn serve(&self) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}
