#![forbid(unsafe_code)]

//! The flow execution engine: dependency-aware scheduling, per-node
//! execution with rollback, error resolution and endpoint dispatch.
//! Manifest parsing and static analysis live in `weir-core`.

pub mod compile;
pub mod dispatch;
pub mod error;
pub mod errs;
pub mod events;
pub mod executor;
pub mod flow;

pub use crate::compile::{bind, compile_flow, Options, Runtime};
pub use crate::dispatch::EndpointDispatcher;
pub use crate::error::{ExecutionError, NodeFailure};
pub use crate::errs::CompiledErrorObject;
pub use crate::events::{Event, EventSink, NoOpEventSink, RecordingEventSink, TracingEventSink};
pub use crate::executor::{CompiledCall, CompiledNode};
pub use crate::flow::{FlowManager, NodeState};
