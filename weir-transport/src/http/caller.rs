use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use weir_core::types::{Functions, Service};
use weir_refs::HeaderMap;

use crate::contract::{CallContext, CallResponse, Caller, CallerMethod, Connection};
use crate::error::TransportError;

const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// HTTP transport caller backed by a shared reqwest client.
pub struct HttpCaller {
    client: reqwest::Client,
}

impl Default for HttpCaller {
    fn default() -> Self {
        // Client creation should never fail in practice; surfacing a better
        // error at call time is not possible from a constructor.
        let client = reqwest::Client::builder()
            .user_agent(concat!("weir/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| panic!("failed to create HTTP client: {e}"));
        Self { client }
    }
}

impl Caller for HttpCaller {
    fn name(&self) -> &str {
        "http"
    }

    fn dial(
        &self,
        service: &Service,
        _functions: &Functions,
        _options: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        let host = service.host.trim_end_matches('/').to_string();

        let mut methods: BTreeMap<String, Arc<dyn CallerMethod>> = BTreeMap::new();
        for method in &service.methods {
            let endpoint = method
                .options
                .get("endpoint")
                .cloned()
                .unwrap_or_else(|| "/".to_string());
            let verb = method
                .options
                .get("method")
                .cloned()
                .unwrap_or_else(|| "GET".to_string());

            methods.insert(
                method.name.clone(),
                Arc::new(HttpMethod {
                    client: self.client.clone(),
                    url: format!("{host}{endpoint}"),
                    verb: verb.to_uppercase(),
                }),
            );
        }

        Ok(Arc::new(HttpConnection { methods }))
    }
}

pub struct HttpConnection {
    methods: BTreeMap<String, Arc<dyn CallerMethod>>,
}

impl Connection for HttpConnection {
    fn method(&self, name: &str) -> Option<Arc<dyn CallerMethod>> {
        self.methods.get(name).cloned()
    }
}

pub struct HttpMethod {
    client: reqwest::Client,
    url: String,
    verb: String,
}

#[async_trait]
impl CallerMethod for HttpMethod {
    async fn send(
        &self,
        ctx: &CallContext,
        body: Vec<u8>,
        header: &HeaderMap,
    ) -> Result<CallResponse, TransportError> {
        let method: reqwest::Method = self
            .verb
            .parse()
            .map_err(|_| TransportError::Other(format!("invalid HTTP method '{}'", self.verb)))?;

        let mut builder = self.client.request(method, &self.url);
        if let Some(deadline) = ctx.deadline {
            builder = builder.timeout(deadline);
        }
        for (key, value) in header {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(TransportError::Cancelled),
            response = builder.send() => response.map_err(map_reqwest_error)?,
        };

        let status = response.status().as_u16();
        let mut response_header = HeaderMap::new();
        for (key, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                response_header.insert(key.to_string().to_lowercase(), text.to_string());
            }
        }

        let bytes = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(TransportError::Cancelled),
            bytes = response.bytes() => bytes.map_err(map_reqwest_error)?,
        };
        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(TransportError::ResponseTooLarge {
                max_bytes: MAX_RESPONSE_BYTES,
            });
        }

        Ok(CallResponse {
            status,
            header: response_header,
            body: bytes.to_vec(),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }
    if e.is_connect() || e.is_request() {
        return TransportError::Network(e.to_string());
    }
    TransportError::Other(e.to_string())
}
