// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::NodeId;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while validating a protocol graph
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A circular dependency was detected in the protocol graph
    CyclicDependency {
        /// The cycle path showing the circular dependency
        cycle: Vec<NodeId>,
    },
    /// A node references a node that doesn't exist
    UnresolvedDependency {
        node_id: NodeId,
        missing_dependency: NodeId,
    },
    /// Two nodes share the same id
    DuplicateNodeId { node_id: NodeId },
    /// A node binds an input port its class does not declare
    UnknownInputPort {
        node_id: NodeId,
        class: String,
        port: String,
    },
    /// A node reads an output port its source class does not declare
    UnknownOutputPort {
        node_id: NodeId,
        source_id: NodeId,
        class: String,
        port: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                let path: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                write!(f, "Cyclic dependency detected: {}", path.join(" -> "))
            }
            ValidationError::UnresolvedDependency {
                node_id,
                missing_dependency,
            } => write!(
                f,
                "Protocol {} depends on {} which does not exist",
                node_id, missing_dependency
            ),
            ValidationError::DuplicateNodeId { node_id } => {
                write!(f, "Duplicate protocol id: {}", node_id)
            }
            ValidationError::UnknownInputPort {
                node_id,
                class,
                port,
            } => write!(
                f,
                "Protocol {} ({}) has no input port '{}'",
                node_id, class, port
            ),
            ValidationError::UnknownOutputPort {
                node_id,
                source_id,
                class,
                port,
            } => write!(
                f,
                "Protocol {} reads '{}' from {} ({}) which has no such output",
                node_id, port, source_id, class
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while assembling a workflow graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Protocol {0} does not exist")]
    UnknownNode(NodeId),

    #[error("{class} has no input port '{port}' (protocol {node})")]
    UnknownInputPort {
        node: NodeId,
        class: &'static str,
        port: String,
    },

    #[error("{class} has no output port '{port}' (protocol {node})")]
    UnknownOutputPort {
        node: NodeId,
        class: &'static str,
        port: String,
    },

    #[error("Protocol {node} cannot depend on protocol {upstream} created after it")]
    ForwardReference { node: NodeId, upstream: NodeId },

    #[error("Fan-in input '{port}' of protocol {node} has no sources")]
    EmptyFanIn { node: NodeId, port: String },

    #[error("No {0} enabled for this workflow")]
    MissingAlternative(&'static str),

    #[error("Graph validation failed:\n  - {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n  - "))]
    Invalid(Vec<ValidationError>),
}
