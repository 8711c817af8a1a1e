use std::collections::{BTreeMap, BTreeSet};

use crate::error::ManifestError;
use crate::planner::scan::scan_nodes;
use crate::template::is_reserved;
use crate::types::Flow;

/// The static dependency analysis of a single flow. Computed once at load
/// and attached to the compiled nodes for O(1) access at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Predecessor set per node id.
    pub depends_on: BTreeMap<String, BTreeSet<String>>,
    /// Node ids grouped by dependency depth; level 0 has no predecessors.
    /// Rollback walks these in reverse.
    pub levels: Vec<Vec<String>>,
}

/// Derive each node's predecessors from reference usage and reject forward
/// references. References may only point at nodes earlier in the manifest
/// order, which makes the runtime graph a DAG by construction.
pub fn analyze(flow: &Flow) -> Result<Analysis, ManifestError> {
    let order: Vec<&str> = flow.nodes.iter().map(|node| node.id.as_str()).collect();
    let referenced = scan_nodes(&flow.nodes);

    let mut depends_on: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (index, node) in flow.nodes.iter().enumerate() {
        let mut deps = BTreeSet::new();
        for resource in referenced.get(&node.id).into_iter().flatten() {
            match order.iter().position(|id| id == resource) {
                Some(position) if position < index => {
                    deps.insert(resource.clone());
                }
                Some(_) => {
                    return Err(ManifestError::ForwardReference {
                        flow: flow.name.clone(),
                        node: node.id.clone(),
                        reference: resource.clone(),
                    });
                }
                None => {
                    return Err(ManifestError::UnknownReference {
                        flow: flow.name.clone(),
                        reference: resource.clone(),
                    });
                }
            }
        }
        depends_on.insert(node.id.clone(), deps);
    }

    validate_output(flow, &order)?;

    let levels = compute_levels(&order, &depends_on);
    Ok(Analysis { depends_on, levels })
}

/// Output references may address any node or reserved resource; the flow
/// output resolves only after every node completed.
fn validate_output(flow: &Flow, order: &[&str]) -> Result<(), ManifestError> {
    for reference in crate::planner::scan::scan_map_references(&flow.output) {
        if is_reserved(&reference.resource) {
            continue;
        }
        if !order.contains(&reference.resource.as_str()) {
            return Err(ManifestError::UnknownReference {
                flow: flow.name.clone(),
                reference: reference.resource,
            });
        }
    }
    Ok(())
}

fn compute_levels(
    order: &[&str],
    depends_on: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<Vec<String>> {
    let mut level: BTreeMap<&str, usize> = BTreeMap::new();
    for &node in order {
        let depth = depends_on
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|dep| level.get(dep.as_str()).copied())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        level.insert(node, depth);
    }

    let max_level = level.values().copied().max().unwrap_or(0);
    let mut levels = vec![Vec::<String>::new(); if order.is_empty() { 0 } else { max_level + 1 }];
    for &node in order {
        levels[level[node]].push(node.to_string());
    }
    levels
}
