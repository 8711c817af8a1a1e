use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle notifications emitted by the flow manager and dispatcher.
#[derive(Debug, Clone)]
pub enum Event {
    FlowStarted {
        invocation: Uuid,
        flow: String,
    },
    FlowSucceeded {
        invocation: Uuid,
        flow: String,
    },
    FlowFailed {
        invocation: Uuid,
        flow: String,
        message: String,
    },
    NodeStarted {
        invocation: Uuid,
        node: String,
    },
    NodeSucceeded {
        invocation: Uuid,
        node: String,
    },
    NodeFailed {
        invocation: Uuid,
        node: String,
        message: String,
    },
    NodeSkipped {
        invocation: Uuid,
        node: String,
    },
    RollbackStarted {
        invocation: Uuid,
        node: String,
    },
    RollbackFailed {
        invocation: Uuid,
        node: String,
        message: String,
    },
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

/// Forwards events to the tracing subscriber.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::FlowStarted { invocation, flow } => {
                tracing::info!(%invocation, flow, "flow started")
            }
            Event::FlowSucceeded { invocation, flow } => {
                tracing::info!(%invocation, flow, "flow succeeded")
            }
            Event::FlowFailed {
                invocation,
                flow,
                message,
            } => tracing::error!(%invocation, flow, cause = %message, "flow failed"),
            Event::NodeStarted { invocation, node } => {
                tracing::debug!(%invocation, node, "node started")
            }
            Event::NodeSucceeded { invocation, node } => {
                tracing::debug!(%invocation, node, "node succeeded")
            }
            Event::NodeFailed {
                invocation,
                node,
                message,
            } => tracing::error!(%invocation, node, cause = %message, "node failed"),
            Event::NodeSkipped { invocation, node } => {
                tracing::debug!(%invocation, node, "node skipped")
            }
            Event::RollbackStarted { invocation, node } => {
                tracing::info!(%invocation, node, "rollback started")
            }
            Event::RollbackFailed {
                invocation,
                node,
                message,
            } => tracing::error!(%invocation, node, cause = %message, "rollback failed"),
        }
    }
}

/// A recorded event with both a monotonic instant (for ordering assertions)
/// and a wall-clock timestamp.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: Event,
    pub at: Instant,
    pub timestamp: DateTime<Utc>,
}

/// Buffers every emitted event; the observation point used by tests.
#[derive(Default)]
pub struct RecordingEventSink {
    entries: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RecordedEvent> {
        self.entries.lock().expect("event buffer poisoned").clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.entries().into_iter().map(|entry| entry.event).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: Event) {
        self.entries
            .lock()
            .expect("event buffer poisoned")
            .push(RecordedEvent {
                event,
                at: Instant::now(),
                timestamp: Utc::now(),
            });
    }
}

/// Fans an event out to every registered sink.
#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}
