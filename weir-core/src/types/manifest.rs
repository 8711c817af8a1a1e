use crate::types::{Endpoint, Flow, Service};

/// The declarative input consumed at startup: services, flows and the
/// endpoints exposing them. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Flow>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
}

impl Manifest {
    pub fn flow(&self, name: &str) -> Option<&Flow> {
        self.flows.iter().find(|flow| flow.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Merge another manifest into this one. Later definitions append;
    /// duplicate detection runs afterwards as a separate check.
    pub fn merge(&mut self, other: Manifest) {
        self.services.extend(other.services);
        self.flows.extend(other.flows);
        self.endpoints.extend(other.endpoints);
    }
}
