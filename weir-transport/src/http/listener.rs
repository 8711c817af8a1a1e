use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use weir_refs::HeaderMap;

use crate::contract::{BoundEndpoint, IncomingRequest, Listener};
use crate::error::TransportError;

const MAX_REQUEST_BYTES: usize = 4 * 1024 * 1024;

type RouteTable = HashMap<(String, String), BoundEndpoint>;

/// The built-in HTTP listener. Routes on method + path taken from endpoint
/// options; the routing table swaps atomically on every `handle` call while
/// in-flight requests keep the table they started with.
pub struct HttpListener {
    addr: SocketAddr,
    routes: Arc<RwLock<Arc<RouteTable>>>,
    shutdown: CancellationToken,
}

impl HttpListener {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            routes: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
            shutdown: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Listener for HttpListener {
    fn name(&self) -> &str {
        "http"
    }

    async fn handle(&self, endpoints: Vec<BoundEndpoint>) -> Result<(), TransportError> {
        let mut table = RouteTable::new();
        for endpoint in endpoints {
            let path = endpoint
                .options
                .get("endpoint")
                .cloned()
                .unwrap_or_else(|| format!("/{}", endpoint.flow));
            let method = endpoint
                .options
                .get("method")
                .cloned()
                .unwrap_or_else(|| "GET".to_string())
                .to_uppercase();

            table.insert((method, path), endpoint);
        }

        info!(routes = table.len(), "http listener received new endpoints");
        *self.routes.write().expect("route table lock poisoned") = Arc::new(table);
        Ok(())
    }

    async fn serve(&self) -> Result<(), TransportError> {
        info!(addr = %self.addr, "serving http listener");

        let state = AppState {
            routes: self.routes.clone(),
        };
        let app = Router::new().fallback(route).with_state(state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| TransportError::Listener(e.to_string()))?;

        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| TransportError::Listener(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        info!("closing http listener");
        self.shutdown.cancel();
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    routes: Arc<RwLock<Arc<RouteTable>>>,
}

async fn route(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().as_str().to_uppercase();
    let path = request.uri().path().to_string();

    let table = state
        .routes
        .read()
        .expect("route table lock poisoned")
        .clone();
    let Some(endpoint) = table.get(&(method, path)) else {
        return plain_response(404, HeaderMap::new(), Vec::new());
    };

    let mut header = HeaderMap::new();
    for (key, value) in request.headers() {
        if let Ok(text) = value.to_str() {
            header.insert(key.to_string().to_lowercase(), text.to_string());
        }
    }

    let body = match axum::body::to_bytes(request.into_body(), MAX_REQUEST_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => return plain_response(400, HeaderMap::new(), Vec::new()),
    };

    let outgoing = endpoint
        .dispatch
        .dispatch(IncomingRequest {
            header,
            body,
            deadline: None,
        })
        .await;

    plain_response(outgoing.status, outgoing.header, outgoing.body)
}

fn plain_response(status: u16, header: HeaderMap, body: Vec<u8>) -> Response {
    let mut builder = Response::builder().status(status);
    for (key, value) in &header {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
