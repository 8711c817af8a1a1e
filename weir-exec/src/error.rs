use thiserror::Error;

use weir_core::ManifestError;
use weir_refs::ResolveError;
use weir_transport::{CodecError, TransportError};

/// Runtime failure of a flow invocation.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A reference resolved to an incompatible type. Fatal to the
    /// invocation; surfaced as Internal.
    #[error(transparent)]
    TypeMismatch(#[from] ResolveError),

    /// A node's call returned non-success or marshalling failed.
    /// Recoverable: triggers the rollback path.
    #[error("node '{node}' failed: {source}")]
    NodeFailed { node: String, source: NodeFailure },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invocation cancelled")]
    Cancelled,
}

impl ExecutionError {
    pub fn node_failed(node: impl Into<String>, source: NodeFailure) -> Self {
        Self::NodeFailed {
            node: node.into(),
            source,
        }
    }
}

/// Origin of a node failure, wrapped so the first cause survives rollback.
#[derive(Debug, Error)]
pub enum NodeFailure {
    #[error("upstream returned status {status}")]
    Status { status: u16 },
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Codec(CodecError),
}
