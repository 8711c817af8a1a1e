//! gRPC boundary pieces: the status-code mapping and the method routing
//! table a wire binding consumes. The server framework itself plugs in
//! behind the [`Listener`](crate::contract::Listener) contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::contract::BoundEndpoint;

/// gRPC status codes, numbered per the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    Unauthenticated = 16,
}

/// Map an integer status resolved by the error resolver onto a gRPC code.
/// Any 2xx is OK; unmapped statuses are Unknown.
pub fn code_from_status(status: u16) -> Code {
    if (200..300).contains(&status) {
        return Code::Ok;
    }

    match status {
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::NotFound,
        408 => Code::DeadlineExceeded,
        409 => Code::AlreadyExists,
        429 => Code::ResourceExhausted,
        500 => Code::Internal,
        501 => Code::Unimplemented,
        503 => Code::Unavailable,
        504 => Code::DeadlineExceeded,
        _ => Code::Unknown,
    }
}

/// Request payloads the endpoint codec cannot decode surface as
/// ResourceExhausted at the gRPC boundary, not through the status table.
pub fn code_for_decode_failure() -> Code {
    Code::ResourceExhausted
}

/// Routing table keyed by fully qualified method name
/// (`package.Service/Method`). Replaced atomically on endpoint updates.
#[derive(Default)]
pub struct MethodTable {
    methods: RwLock<Arc<HashMap<String, BoundEndpoint>>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the FQN for an endpoint from its `package`, `service` and
    /// `method` options, falling back to the flow name as the method.
    pub fn qualified_name(endpoint: &BoundEndpoint) -> String {
        let package = endpoint.options.get("package").map(String::as_str).unwrap_or("");
        let service = endpoint
            .options
            .get("service")
            .map(String::as_str)
            .unwrap_or("Weir");
        let method = endpoint
            .options
            .get("method")
            .map(String::as_str)
            .unwrap_or(endpoint.flow.as_str());

        if package.is_empty() {
            format!("{service}/{method}")
        } else {
            format!("{package}.{service}/{method}")
        }
    }

    pub fn replace(&self, endpoints: Vec<BoundEndpoint>) {
        let mut table = HashMap::with_capacity(endpoints.len());
        for endpoint in endpoints {
            table.insert(Self::qualified_name(&endpoint), endpoint);
        }
        *self.methods.write().expect("method table lock poisoned") = Arc::new(table);
    }

    pub fn lookup(&self, fqn: &str) -> Option<BoundEndpoint> {
        self.methods
            .read()
            .expect("method table lock poisoned")
            .get(fqn)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.methods.read().expect("method table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
