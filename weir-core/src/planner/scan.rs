use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::template::{is_reserved, Reference};
use crate::types::{Call, ErrorObject, Node, ParameterMap, Property};

/// Resources referenced by each node, derived from the properties reachable
/// through its call and rollback maps. Reserved resources never appear.
pub(crate) fn scan_nodes(nodes: &[Node]) -> BTreeMap<String, BTreeSet<String>> {
    let mut out = BTreeMap::new();
    for node in nodes {
        let mut resources = BTreeSet::new();
        if let Some(call) = &node.call {
            scan_call(call, &mut resources);
        }
        if let Some(rollback) = &node.rollback {
            scan_call(rollback, &mut resources);
        }
        if let Some(on_error) = &node.on_error {
            scan_error_object(on_error, &mut resources);
        }
        out.insert(node.id.clone(), resources);
    }
    out
}

/// Every reference reachable from a parameter map, reserved ones included.
pub(crate) fn scan_map_references(map: &ParameterMap) -> Vec<Reference> {
    let mut refs = Vec::new();
    for property in map.header.values() {
        collect_references(property, &mut refs);
    }
    if let Some(body) = &map.body {
        collect_references(body, &mut refs);
    }
    refs
}

fn scan_call(call: &Call, resources: &mut BTreeSet<String>) {
    for map in [&call.request, &call.response] {
        for reference in scan_map_references(map) {
            if !is_reserved(&reference.resource) {
                resources.insert(reference.resource);
            }
        }
    }
}

fn scan_error_object(object: &ErrorObject, resources: &mut BTreeSet<String>) {
    let mut refs = Vec::new();
    if let Some(status) = &object.status {
        collect_references(status, &mut refs);
    }
    if let Some(message) = &object.message {
        collect_references(message, &mut refs);
    }
    for property in object.params.values() {
        collect_references(property, &mut refs);
    }
    if let Some(response) = &object.response {
        refs.extend(scan_map_references(response));
    }

    for reference in refs {
        if !is_reserved(&reference.resource) {
            resources.insert(reference.resource);
        }
    }
}

fn collect_references(property: &Property, out: &mut Vec<Reference>) {
    if let Some(reference) = &property.reference {
        out.push(reference.clone());
    }
    if let Some(nested) = &property.nested {
        for field in nested.values() {
            collect_references(field, out);
        }
    }
    if let Some(repeated) = &property.repeated {
        collect_references(repeated, out);
    }
}
