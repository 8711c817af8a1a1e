mod endpoint;
mod error_object;
mod flow;
mod functions;
mod manifest;
mod node;
mod parameter_map;
mod property;
mod service;
mod value;

pub use endpoint::Endpoint;
pub use error_object::ErrorObject;
pub use flow::{Flow, Forward};
pub use functions::{FunctionError, Functions, HelperFunction};
pub use manifest::Manifest;
pub use node::{Call, Node};
pub use parameter_map::ParameterMap;
pub use property::{Label, Property, PropertyType};
pub use service::{Service, ServiceMethod};
pub use value::Value;
