use std::collections::BTreeMap;

/// An upstream service reachable through a transport caller.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Service {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,

    pub transport: String,
    pub codec: String,
    pub host: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<ServiceMethod>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl Service {
    pub fn fully_qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    pub fn method(&self, name: &str) -> Option<&ServiceMethod> {
        self.methods.iter().find(|method| method.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServiceMethod {
    pub name: String,

    /// Transport-specific options, e.g. `endpoint` and `method` for HTTP.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}
