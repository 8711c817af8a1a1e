mod json;

pub use json::JsonCodec;

use weir_core::types::{ParameterMap, Value};
use weir_refs::Store;

use crate::error::CodecError;

/// Builds codec managers for a resource and schema pair.
pub trait Constructor: Send + Sync {
    fn name(&self) -> &str;

    fn new_manager(
        &self,
        resource: &str,
        schema: &ParameterMap,
    ) -> Result<Box<dyn Manager>, CodecError>;
}

/// A bidirectional wire-format ↔ store translator bound to one resource and
/// one schema at flow build time.
pub trait Manager: Send + Sync {
    fn name(&self) -> &str;

    /// Render the schema against the store into wire bytes. Reference
    /// expansion happens here; missing values fall back per property.
    fn marshal(&self, store: &Store) -> Result<Vec<u8>, CodecError>;

    /// Decode wire bytes into the manager's resource frame.
    fn unmarshal(&self, payload: &[u8], store: &Store) -> Result<(), CodecError>;

    /// Resolve a single property of the schema by dotted path.
    fn property(&self, store: &Store, path: &str) -> Option<Value>;
}
