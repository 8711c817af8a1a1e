use std::collections::BTreeSet;

use crate::error::ManifestError;
use crate::template::is_reserved;
use crate::types::{Flow, Manifest, Node, ParameterMap, Property, Value};

/// Validate a manifest for duplicate definitions, reserved ids, dangling
/// service or flow references and default literals that contradict their
/// declared type. Runs once at load; any violation aborts bootstrap.
pub fn check_manifest(manifest: &Manifest) -> Result<(), ManifestError> {
    service_duplicates(manifest)?;
    flow_duplicates(&manifest.flows)?;

    for flow in &manifest.flows {
        node_services(manifest, flow)?;
        flow_defaults(flow)?;
    }

    for endpoint in &manifest.endpoints {
        if manifest.flow(&endpoint.flow).is_none() {
            return Err(ManifestError::UnknownFlow(endpoint.flow.clone()));
        }
    }

    Ok(())
}

/// Check for duplicate flow definitions and, per flow, duplicate nodes.
pub fn flow_duplicates(flows: &[Flow]) -> Result<(), ManifestError> {
    let mut seen = BTreeSet::new();
    for flow in flows {
        if !seen.insert(flow.name.as_str()) {
            return Err(ManifestError::DuplicateFlow(flow.name.clone()));
        }

        node_duplicates(&flow.name, &flow.nodes)?;
    }

    Ok(())
}

/// Check for duplicate node ids and ids claiming a reserved keyword.
pub fn node_duplicates(flow: &str, nodes: &[Node]) -> Result<(), ManifestError> {
    let mut seen = BTreeSet::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(ManifestError::DuplicateNode {
                flow: flow.to_string(),
                id: node.id.clone(),
            });
        }

        if is_reserved(&node.id) {
            return Err(ManifestError::ReservedKeyword {
                flow: flow.to_string(),
                id: node.id.clone(),
            });
        }
    }

    Ok(())
}

fn service_duplicates(manifest: &Manifest) -> Result<(), ManifestError> {
    let mut seen = BTreeSet::new();
    for service in &manifest.services {
        if !seen.insert(service.name.as_str()) {
            return Err(ManifestError::DuplicateService(service.name.clone()));
        }
    }

    Ok(())
}

fn flow_defaults(flow: &Flow) -> Result<(), ManifestError> {
    check_map_defaults("input", &flow.input)?;
    check_map_defaults("output", &flow.output)?;

    for node in &flow.nodes {
        for call in [node.call.as_ref(), node.rollback.as_ref()].into_iter().flatten() {
            check_map_defaults(&node.id, &call.request)?;
            check_map_defaults(&node.id, &call.response)?;
        }
    }

    Ok(())
}

fn check_map_defaults(root: &str, map: &ParameterMap) -> Result<(), ManifestError> {
    for (name, property) in &map.header {
        check_property_default(&format!("{root}.{name}"), property)?;
    }
    if let Some(body) = &map.body {
        check_property_default(root, body)?;
    }
    Ok(())
}

fn check_property_default(path: &str, property: &Property) -> Result<(), ManifestError> {
    if let Some(literal) = &property.default {
        if Value::from_json(property.kind, literal).is_none() {
            return Err(ManifestError::InvalidDefault {
                path: path.to_string(),
                expected: property.kind,
            });
        }
    }

    if let Some(nested) = &property.nested {
        for (name, field) in nested {
            check_property_default(&format!("{path}.{name}"), field)?;
        }
    }
    if let Some(repeated) = &property.repeated {
        check_property_default(path, repeated)?;
    }

    Ok(())
}

fn node_services(manifest: &Manifest, flow: &Flow) -> Result<(), ManifestError> {
    for node in &flow.nodes {
        for call in [node.call.as_ref(), node.rollback.as_ref()].into_iter().flatten() {
            let service = manifest.service(&call.service).ok_or_else(|| {
                ManifestError::UnknownService {
                    flow: flow.name.clone(),
                    node: node.id.clone(),
                    service: call.service.clone(),
                }
            })?;

            if service.method(&call.method).is_none() {
                return Err(ManifestError::UnknownMethod {
                    flow: flow.name.clone(),
                    node: node.id.clone(),
                    service: call.service.clone(),
                    method: call.method.clone(),
                });
            }
        }
    }

    if let Some(forward) = &flow.forward {
        if manifest.service(&forward.service).is_none() {
            return Err(ManifestError::UnknownService {
                flow: flow.name.clone(),
                node: "forward".to_string(),
                service: forward.service.clone(),
            });
        }
    }

    Ok(())
}
