use std::collections::BTreeMap;

/// Binds a flow to a listener under a codec. Shared by concurrent
/// invocations once the manifest is loaded.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub listener: String,
    pub flow: String,

    #[serde(default = "default_codec")]
    pub codec: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

fn default_codec() -> String {
    "json".to_string()
}
