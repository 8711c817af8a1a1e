#![forbid(unsafe_code)]

pub mod codec;
mod contract;
mod error;
pub mod grpc;
pub mod http;

pub use crate::contract::{
    BoundEndpoint, CallContext, CallResponse, Caller, CallerMethod, Connection, Dispatch,
    IncomingRequest, Listener, OutgoingResponse,
};
pub use crate::error::{CodecError, TransportError};
