use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::Value;

/// A named helper available to template expressions.
pub trait HelperFunction: Send + Sync {
    fn call(&self, args: &[Value]) -> Result<Value, FunctionError>;
}

/// Registry of helper functions, passed to transport callers at dial time
/// instead of living in a process-wide table.
pub type Functions = BTreeMap<String, Arc<dyn HelperFunction>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionError {
    #[error("function expects {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
