// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of a protocol graph.
//!
//! Used on freshly built workflows and on workflows read back from a project.
//! The checks run in order:
//!
//! 1. **Uniqueness**: every protocol id appears once
//! 2. **References**: every input source and prerequisite names an existing protocol
//! 3. **Ports**: bound input ports and read output ports are declared by the classes
//! 4. **Cycles**: DFS with a recursion stack, reporting the cycle path
//!
//! Cycle detection needs a structurally valid graph, so it only runs when the
//! earlier checks found nothing. Errors from the first three are accumulated
//! so a broken workflow file is reported in one pass.

use crate::errors::ValidationError;
use crate::graph::node::{NodeId, ProtocolNode};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Validate `nodes`, returning every problem found.
pub fn validate_graph(nodes: &[ProtocolNode]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_ids(nodes) {
        errors.extend(duplicate_errors);
    }

    if let Err(unresolved_errors) = validate_references(nodes) {
        errors.extend(unresolved_errors);
    }

    if let Err(port_errors) = validate_ports(nodes) {
        errors.extend(port_errors);
    }

    if errors.is_empty() {
        if let Err(cycle_errors) = validate_acyclic(nodes) {
            errors.extend(cycle_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_ids(nodes: &[ProtocolNode]) -> Result<(), Vec<ValidationError>> {
    let mut seen_ids = HashSet::new();
    let mut errors = Vec::new();

    for node in nodes {
        if !seen_ids.insert(node.id) {
            errors.push(ValidationError::DuplicateNodeId { node_id: node.id });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_references(nodes: &[ProtocolNode]) -> Result<(), Vec<ValidationError>> {
    let ids: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
    let mut errors = Vec::new();

    for node in nodes {
        for dependency in node.upstream() {
            if !ids.contains(&dependency) {
                errors.push(ValidationError::UnresolvedDependency {
                    node_id: node.id,
                    missing_dependency: dependency,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Unresolved sources are left to `validate_references`.
fn validate_ports(nodes: &[ProtocolNode]) -> Result<(), Vec<ValidationError>> {
    let by_id: HashMap<NodeId, &ProtocolNode> = nodes.iter().map(|n| (n.id, n)).collect();
    let mut errors = Vec::new();

    for node in nodes {
        for (port, binding) in &node.inputs {
            if !node.class.has_input(port) {
                errors.push(ValidationError::UnknownInputPort {
                    node_id: node.id,
                    class: node.class.class_name().to_string(),
                    port: port.clone(),
                });
            }
            for source in binding.ports() {
                let Some(upstream) = by_id.get(&source.node) else {
                    continue;
                };
                if !upstream.class.has_output(&source.output) {
                    errors.push(ValidationError::UnknownOutputPort {
                        node_id: node.id,
                        source_id: source.node,
                        class: upstream.class.class_name().to_string(),
                        port: source.output.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// DFS over the forward graph (dependency -> dependents); a back edge to a
/// node still on the recursion stack closes a cycle.
fn validate_acyclic(nodes: &[ProtocolNode]) -> Result<(), Vec<ValidationError>> {
    // ordered so the reported cycle is stable between runs
    let mut graph: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for node in nodes {
        graph.entry(node.id).or_default();
    }
    for node in nodes {
        for dependency in node.upstream() {
            graph.entry(dependency).or_default().push(node.id);
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for &node_id in graph.keys() {
        if !visited.contains(&node_id) {
            if let Some(cycle) =
                dfs_cycle_detection(node_id, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

fn dfs_cycle_detection(
    node: NodeId,
    graph: &BTreeMap<NodeId, Vec<NodeId>>,
    visited: &mut HashSet<NodeId>,
    rec_stack: &mut HashSet<NodeId>,
    path: &mut Vec<NodeId>,
) -> Option<Vec<NodeId>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(&node) {
        for &neighbor in neighbors {
            if !visited.contains(&neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&neighbor) {
                let cycle_start = path.iter().position(|x| *x == neighbor).unwrap_or(0);
                let mut cycle = path[cycle_start..].to_vec();
                cycle.push(neighbor);
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(&node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{InputBinding, Stage};
    use crate::graph::protocol::ProtocolClass;

    fn node(id: u32, class: ProtocolClass) -> ProtocolNode {
        ProtocolNode::new(NodeId(id), class, format!("node {}", id), Stage::Movies)
    }

    fn bind(node: &mut ProtocolNode, port: &str, source: u32, output: &str) {
        node.inputs
            .insert(port.to_string(), InputBinding::Port(NodeId(source).port(output)));
    }

    #[test]
    fn test_valid_empty_graph() {
        assert!(validate_graph(&[]).is_ok());
    }

    #[test]
    fn test_valid_linear_chain() {
        let import = node(1, ProtocolClass::ImportMovies);
        let mut gain = node(2, ProtocolClass::MovieGain);
        bind(&mut gain, "inputMovies", 1, "outputMovies");
        let mut align = node(3, ProtocolClass::MovieCorr);
        bind(&mut align, "inputMovies", 2, "outputMovies");
        assert!(validate_graph(&[import, gain, align]).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let errors = validate_graph(&[
            node(1, ProtocolClass::ImportMovies),
            node(1, ProtocolClass::ImportMovies),
        ])
        .unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateNodeId { node_id: NodeId(1) }]);
    }

    #[test]
    fn test_unresolved_dependency() {
        let mut gain = node(2, ProtocolClass::MovieGain);
        bind(&mut gain, "inputMovies", 1, "outputMovies");
        let errors = validate_graph(&[gain]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Protocol 2 depends on 1 which does not exist"
        );
    }

    #[test]
    fn test_undeclared_ports() {
        let import = node(1, ProtocolClass::ImportMovies);
        let mut gain = node(2, ProtocolClass::MovieGain);
        bind(&mut gain, "inputMicrographs", 1, "outputMovies");
        let mut align = node(3, ProtocolClass::MovieCorr);
        bind(&mut align, "inputMovies", 1, "outputParticles");

        let errors = validate_graph(&[import, gain, align]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::UnknownInputPort { .. }));
        assert!(matches!(
            errors[1],
            ValidationError::UnknownOutputPort { source_id: NodeId(1), .. }
        ));
    }

    #[test]
    fn test_cycle_through_prerequisites() {
        let mut a = node(1, ProtocolClass::TriggerData);
        let mut b = node(2, ProtocolClass::TriggerData);
        let mut c = node(3, ProtocolClass::TriggerData);
        a.prerequisites.push(NodeId(3));
        b.prerequisites.push(NodeId(1));
        c.prerequisites.push(NodeId(2));

        let errors = validate_graph(&[a, b, c]).unwrap_err();
        match &errors[0] {
            ValidationError::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_cycle_skipped_when_references_fail() {
        let mut a = node(1, ProtocolClass::TriggerData);
        a.prerequisites.push(NodeId(1));
        a.prerequisites.push(NodeId(42));
        let errors = validate_graph(&[a]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::UnresolvedDependency { .. }));
    }
}
