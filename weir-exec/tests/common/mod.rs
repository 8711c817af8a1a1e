#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use weir_core::types::{Functions, Manifest, Service};
use weir_exec::Options;
use weir_refs::HeaderMap;
use weir_transport::codec::JsonCodec;
use weir_transport::{
    BoundEndpoint, CallContext, CallResponse, Caller, CallerMethod, Connection, Dispatch,
    Listener, TransportError,
};

/// Scripted reply for one mock method.
#[derive(Clone)]
pub struct Behavior {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay: Duration,
    pub error: Option<TransportError>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: 200,
            body: b"{}".to_vec(),
            delay: Duration::ZERO,
            error: None,
        }
    }
}

impl Behavior {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            body: body.to_string().into_bytes(),
            ..Self::default()
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }
}

/// A completed upstream call with its observation window.
#[derive(Clone)]
pub struct CallRecord {
    pub method: String,
    pub body: Vec<u8>,
    pub header: HeaderMap,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct MockState {
    behaviors: Mutex<HashMap<String, Behavior>>,
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<CallRecord>>,
}

/// In-process transport double. Records every call entry and every
/// completed call so tests can assert ordering and overlap.
#[derive(Default, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn behave(&self, method: &str, behavior: Behavior) {
        self.state
            .behaviors
            .lock()
            .expect("behavior table poisoned")
            .insert(method.to_string(), behavior);
    }

    /// Methods that entered `send`, in order, completed or not.
    pub fn started(&self) -> Vec<String> {
        self.state.started.lock().expect("call log poisoned").clone()
    }

    pub fn completed(&self) -> Vec<CallRecord> {
        self.state.completed.lock().expect("call log poisoned").clone()
    }

    pub fn completed_call(&self, method: &str) -> Option<CallRecord> {
        self.completed()
            .into_iter()
            .find(|record| record.method == method)
    }
}

impl Caller for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    fn dial(
        &self,
        _service: &Service,
        _functions: &Functions,
        _options: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        Ok(Arc::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
}

impl Connection for MockConnection {
    fn method(&self, name: &str) -> Option<Arc<dyn CallerMethod>> {
        Some(Arc::new(MockMethod {
            name: name.to_string(),
            state: self.state.clone(),
        }))
    }
}

struct MockMethod {
    name: String,
    state: Arc<MockState>,
}

#[async_trait]
impl CallerMethod for MockMethod {
    async fn send(
        &self,
        ctx: &CallContext,
        body: Vec<u8>,
        header: &HeaderMap,
    ) -> Result<CallResponse, TransportError> {
        let behavior = self
            .state
            .behaviors
            .lock()
            .expect("behavior table poisoned")
            .get(&self.name)
            .cloned()
            .unwrap_or_default();

        let started = Instant::now();
        self.state
            .started
            .lock()
            .expect("call log poisoned")
            .push(self.name.clone());

        if !behavior.delay.is_zero() {
            tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(behavior.delay) => {}
            }
        }

        self.state
            .completed
            .lock()
            .expect("call log poisoned")
            .push(CallRecord {
                method: self.name.clone(),
                body,
                header: header.clone(),
                started,
                finished: Instant::now(),
            });

        if let Some(error) = behavior.error {
            return Err(error);
        }

        Ok(CallResponse {
            status: behavior.status,
            header: HeaderMap::new(),
            body: behavior.body,
        })
    }
}

/// Listener double capturing the endpoints it is handed.
#[derive(Default)]
pub struct CollectingListener {
    endpoints: Mutex<Vec<BoundEndpoint>>,
}

impl CollectingListener {
    pub fn dispatch(&self) -> Arc<dyn Dispatch> {
        self.endpoints
            .lock()
            .expect("endpoint table poisoned")
            .first()
            .expect("listener received no endpoints")
            .dispatch
            .clone()
    }
}

#[async_trait]
impl Listener for CollectingListener {
    fn name(&self) -> &str {
        "test"
    }

    async fn handle(&self, endpoints: Vec<BoundEndpoint>) -> Result<(), TransportError> {
        *self.endpoints.lock().expect("endpoint table poisoned") = endpoints;
        Ok(())
    }

    async fn serve(&self) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub fn manifest(value: serde_json::Value) -> Manifest {
    serde_json::from_value(value).expect("manifest parses")
}

/// Options wired with the mock transport, the JSON codec and a collecting
/// listener named `test`.
pub fn mock_options(transport: &MockTransport) -> (Options, Arc<CollectingListener>) {
    let listener = Arc::new(CollectingListener::default());

    let mut options = Options::default();
    options
        .callers
        .insert("mock".to_string(), Arc::new(transport.clone()));
    options.codecs.insert("json".to_string(), Arc::new(JsonCodec));
    options
        .listeners
        .insert("test".to_string(), listener.clone());

    (options, listener)
}

/// The service block every test manifest shares.
pub fn mock_service(methods: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "name": "api",
        "transport": "mock",
        "codec": "json",
        "host": "mock://api",
        "methods": methods
            .iter()
            .map(|name| serde_json::json!({"name": name}))
            .collect::<Vec<_>>(),
    })
}
