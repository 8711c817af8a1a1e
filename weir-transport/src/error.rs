use thiserror::Error;

use weir_core::types::PropertyType;
use weir_refs::ResolveError;

/// Network or transport-level failure of a single call. Wrapped into a node
/// failure by the executor; never surfaced raw to a caller.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("call cancelled")]
    Cancelled,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("response too large (>{max_bytes} bytes)")]
    ResponseTooLarge { max_bytes: usize },
    #[error("listener error: {0}")]
    Listener(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("transport error: {0}")]
    Other(String),
}

/// Wire encode/decode failure. At the endpoint boundary this maps to a
/// protocol-level bad request; inside a node it becomes a node failure.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("unexpected type at '{path}': expected {expected}")]
    UnexpectedType { path: String, expected: PropertyType },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
