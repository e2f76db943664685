// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Incremental construction of a protocol graph.
//!
//! Nodes get increasing ids as they are added and are registered right away:
//! the stage label is applied and the node can be put on the summary list.
//! Every binding is checked when it is made, so a wrong port name fails at the
//! line that wrote it rather than when the external scheduler runs the node.
//!
//! # Example
//! ```
//! use cryobox::graph::{GraphBuilder, ProtocolClass, Stage};
//!
//! # fn main() -> Result<(), cryobox::errors::GraphError> {
//! let mut builder = GraphBuilder::new();
//! let import = builder
//!     .add(ProtocolClass::ImportMovies, "import movies", Stage::Movies)
//!     .param("dataStreaming", true)
//!     .summary()
//!     .id();
//! builder
//!     .add(ProtocolClass::MovieGain, "Xmipp - movie gain", Stage::Movies)
//!     .input("inputMovies", import.port("outputMovies"))?;
//!
//! let graph = builder.finish()?;
//! assert_eq!(graph.nodes.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::errors::GraphError;
use crate::graph::labels::LabelRegistry;
use crate::graph::node::{InputBinding, NodeId, PortRef, ProtocolNode, Stage};
use crate::graph::order::execution_order;
use crate::graph::protocol::ProtocolClass;
use crate::graph::validation::validate_graph;
use crate::observability::messages::graph::ProtocolRegistered;
use crate::observability::messages::StructuredLog;
use serde::{Deserialize, Serialize};

/// An assembled, validated workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub nodes: Vec<ProtocolNode>,
    pub labels: LabelRegistry,
    /// Protocols watched by the summary monitor
    pub summary: Vec<NodeId>,
}

impl WorkflowGraph {
    pub fn node(&self, id: NodeId) -> Option<&ProtocolNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Node with the given display label.
    pub fn find(&self, label: &str) -> Option<&ProtocolNode> {
        self.nodes.iter().find(|n| n.label == label)
    }

    pub fn of_class(&self, class: ProtocolClass) -> Vec<&ProtocolNode> {
        self.nodes.iter().filter(|n| n.class == class).collect()
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        validate_graph(&self.nodes).map_err(GraphError::Invalid)
    }

    pub fn execution_order(&self) -> Result<Vec<NodeId>, GraphError> {
        execution_order(&self.nodes)
    }
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<ProtocolNode>,
    labels: LabelRegistry,
    summary: Vec<NodeId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a node. Ids start at 1.
    pub fn add(
        &mut self,
        class: ProtocolClass,
        label: impl Into<String>,
        stage: Stage,
    ) -> NodeHandle<'_> {
        let id = NodeId(self.nodes.len() as u32 + 1);
        let node = ProtocolNode::new(id, class, label, stage);

        ProtocolRegistered {
            node_id: id.0,
            class: class.class_name(),
            label: &node.label,
            stage: stage.label(),
        }
        .log();

        self.labels.apply(stage.label(), id, stage.color());
        let index = self.nodes.len();
        self.nodes.push(node);
        NodeHandle {
            builder: self,
            id,
            index,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&ProtocolNode> {
        self.nodes.get(Self::index(id)?).filter(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    fn index(id: NodeId) -> Option<usize> {
        (id.0 as usize).checked_sub(1)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ProtocolNode, GraphError> {
        Self::index(id)
            .and_then(|i| self.nodes.get_mut(i))
            .filter(|n| n.id == id)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn set_param(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), GraphError> {
        self.node_mut(id)?.params.insert(name.to_string(), value.into());
        Ok(())
    }

    fn check_input_port(&self, id: NodeId, port: &str) -> Result<(), GraphError> {
        let node = self.node(id).ok_or(GraphError::UnknownNode(id))?;
        if node.class.has_input(port) {
            Ok(())
        } else {
            Err(GraphError::UnknownInputPort {
                node: id,
                class: node.class.class_name(),
                port: port.to_string(),
            })
        }
    }

    fn check_upstream(&self, id: NodeId, upstream: NodeId) -> Result<&ProtocolNode, GraphError> {
        let source = self.node(upstream).ok_or(GraphError::UnknownNode(upstream))?;
        if upstream >= id {
            return Err(GraphError::ForwardReference { node: id, upstream });
        }
        Ok(source)
    }

    fn check_source(&self, id: NodeId, source: &PortRef) -> Result<(), GraphError> {
        let upstream = self.check_upstream(id, source.node)?;
        if upstream.class.has_output(&source.output) {
            Ok(())
        } else {
            Err(GraphError::UnknownOutputPort {
                node: source.node,
                class: upstream.class.class_name(),
                port: source.output.clone(),
            })
        }
    }

    /// Bind `port` of `id` to a single output of an earlier node.
    pub fn bind(&mut self, id: NodeId, port: &str, source: PortRef) -> Result<(), GraphError> {
        self.check_input_port(id, port)?;
        self.check_source(id, &source)?;
        self.node_mut(id)?
            .inputs
            .insert(port.to_string(), InputBinding::Port(source));
        Ok(())
    }

    /// Bind `port` of `id` to several outputs merged together.
    pub fn bind_fan_in(
        &mut self,
        id: NodeId,
        port: &str,
        sources: Vec<PortRef>,
    ) -> Result<(), GraphError> {
        self.check_input_port(id, port)?;
        if sources.is_empty() {
            return Err(GraphError::EmptyFanIn {
                node: id,
                port: port.to_string(),
            });
        }
        for source in &sources {
            self.check_source(id, source)?;
        }
        self.node_mut(id)?
            .inputs
            .insert(port.to_string(), InputBinding::FanIn(sources));
        Ok(())
    }

    /// Bind `port` of `id` to whole protocols.
    pub fn bind_protocols(
        &mut self,
        id: NodeId,
        port: &str,
        protocols: Vec<NodeId>,
    ) -> Result<(), GraphError> {
        self.check_input_port(id, port)?;
        if protocols.is_empty() {
            return Err(GraphError::EmptyFanIn {
                node: id,
                port: port.to_string(),
            });
        }
        for upstream in &protocols {
            self.check_upstream(id, *upstream)?;
        }
        self.node_mut(id)?
            .inputs
            .insert(port.to_string(), InputBinding::Protocols(protocols));
        Ok(())
    }

    /// `id` runs after `upstream` finishes, with no data flowing between them.
    pub fn add_prerequisite(&mut self, id: NodeId, upstream: NodeId) -> Result<(), GraphError> {
        self.check_upstream(id, upstream)?;
        let node = self.node_mut(id)?;
        if !node.prerequisites.contains(&upstream) {
            node.prerequisites.push(upstream);
        }
        Ok(())
    }

    pub fn add_to_summary(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node(id).ok_or(GraphError::UnknownNode(id))?;
        if !self.summary.contains(&id) {
            self.summary.push(id);
        }
        Ok(())
    }

    pub fn summary(&self) -> &[NodeId] {
        &self.summary
    }

    /// Validate the whole graph and hand it over.
    pub fn finish(self) -> Result<WorkflowGraph, GraphError> {
        validate_graph(&self.nodes).map_err(GraphError::Invalid)?;
        Ok(WorkflowGraph {
            nodes: self.nodes,
            labels: self.labels,
            summary: self.summary,
        })
    }
}

/// Handle on a node just added, for setting it up in one chain.
pub struct NodeHandle<'a> {
    builder: &'a mut GraphBuilder,
    id: NodeId,
    /// Position in `builder.nodes`; nodes are only ever appended
    index: usize,
}

impl NodeHandle<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn node_mut(&mut self) -> &mut ProtocolNode {
        &mut self.builder.nodes[self.index]
    }

    pub fn param(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.node_mut().params.insert(name.to_string(), value.into());
        self
    }

    pub fn input(self, port: &str, source: PortRef) -> Result<Self, GraphError> {
        self.builder.bind(self.id, port, source)?;
        Ok(self)
    }

    pub fn fan_in(self, port: &str, sources: Vec<PortRef>) -> Result<Self, GraphError> {
        self.builder.bind_fan_in(self.id, port, sources)?;
        Ok(self)
    }

    pub fn protocols(self, port: &str, protocols: Vec<NodeId>) -> Result<Self, GraphError> {
        self.builder.bind_protocols(self.id, port, protocols)?;
        Ok(self)
    }

    pub fn after(self, upstream: NodeId) -> Result<Self, GraphError> {
        self.builder.add_prerequisite(self.id, upstream)?;
        Ok(self)
    }

    /// Put the node on the summary monitor's list.
    pub fn summary(self) -> Self {
        if !self.builder.summary.contains(&self.id) {
            self.builder.summary.push(self.id);
        }
        self
    }

    /// `summary()` when `cond` holds.
    pub fn summary_if(self, cond: bool) -> Self {
        if cond {
            self.summary()
        } else {
            self
        }
    }
}
