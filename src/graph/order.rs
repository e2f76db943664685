// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{GraphError, ValidationError};
use crate::graph::node::{NodeId, ProtocolNode};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Topological order of `nodes` (Kahn's algorithm).
///
/// Among the nodes ready at the same time the lowest id goes first, so a graph
/// built in dependency order comes back in creation order.
///
/// Nodes whose upstream ids are not in `nodes` are treated as having those
/// edges satisfied; run [`validate_graph`](crate::graph::validate_graph)
/// first when that matters.
pub fn execution_order(nodes: &[ProtocolNode]) -> Result<Vec<NodeId>, GraphError> {
    let mut in_degree: HashMap<NodeId, usize> = nodes.iter().map(|n| (n.id, 0)).collect();
    let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    for node in nodes {
        for upstream in node.upstream() {
            if !in_degree.contains_key(&upstream) {
                continue;
            }
            dependents.entry(upstream).or_default().push(node.id);
            *in_degree.entry(node.id).or_insert(0) += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| Reverse(*id))
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for dependent in dependents.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*dependent));
                }
            }
        }
    }

    if order.len() != in_degree.len() {
        let mut stuck: Vec<NodeId> = in_degree
            .iter()
            .filter(|(id, _)| !order.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        stuck.sort();
        return Err(GraphError::Invalid(vec![ValidationError::CyclicDependency {
            cycle: stuck,
        }]));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Stage;
    use crate::graph::protocol::ProtocolClass;

    fn node(id: u32, after: &[u32]) -> ProtocolNode {
        let mut node = ProtocolNode::new(NodeId(id), ProtocolClass::TriggerData, "t", Stage::Particles);
        node.prerequisites = after.iter().map(|a| NodeId(*a)).collect();
        node
    }

    #[test]
    fn ties_are_broken_by_id() {
        let nodes = vec![node(3, &[]), node(1, &[]), node(2, &[1])];
        let order = execution_order(&nodes).unwrap();
        assert_eq!(order, vec![NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn dependencies_come_first_even_with_higher_ids() {
        let nodes = vec![node(1, &[5]), node(5, &[]), node(2, &[1])];
        let order = execution_order(&nodes).unwrap();
        assert_eq!(order, vec![NodeId(5), NodeId(1), NodeId(2)]);
    }

    #[test]
    fn diamond() {
        let nodes = vec![node(1, &[]), node(2, &[1]), node(3, &[1]), node(4, &[2, 3])];
        let order = execution_order(&nodes).unwrap();
        assert_eq!(order, vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
    }

    #[test]
    fn cycle_is_reported() {
        let nodes = vec![node(1, &[2]), node(2, &[1]), node(3, &[])];
        let err = execution_order(&nodes).unwrap_err();
        match err {
            GraphError::Invalid(errors) => assert_eq!(
                errors,
                vec![ValidationError::CyclicDependency {
                    cycle: vec![NodeId(1), NodeId(2)]
                }]
            ),
            other => panic!("unexpected error: {}", other),
        }
    }
}
