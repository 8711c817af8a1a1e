#![forbid(unsafe_code)]

mod resolve;
mod store;

pub use resolve::{load_reference, resolve_header, resolve_property, ResolveError};
pub use store::{HeaderMap, Store};
