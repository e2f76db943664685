// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::protocol::ProtocolClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Newtype wrapper for protocol ids. Ids increase in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Reference to one of this node's output ports.
    pub fn port(self, output: &str) -> PortRef {
        PortRef {
            node: self,
            output: output.to_string(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named output of an earlier node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub node: NodeId,
    pub output: String,
}

/// What an input port is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum InputBinding {
    Port(PortRef),
    /// Many outputs merged into one input
    FanIn(Vec<PortRef>),
    /// Whole protocols rather than one of their outputs
    Protocols(Vec<NodeId>),
}

impl InputBinding {
    pub fn ports(&self) -> &[PortRef] {
        match self {
            InputBinding::Port(port) => std::slice::from_ref(port),
            InputBinding::FanIn(ports) => ports,
            InputBinding::Protocols(_) => &[],
        }
    }

    /// Every node this binding reads from.
    pub fn sources(&self) -> Vec<NodeId> {
        match self {
            InputBinding::Protocols(ids) => ids.clone(),
            other => other.ports().iter().map(|p| p.node).collect(),
        }
    }
}

/// Pipeline stage a protocol belongs to; also its label in the project view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Movies,
    #[serde(rename = "CTF")]
    Ctf,
    Micrographs,
    Picking,
    Particles,
    #[serde(rename = "2Dclassify")]
    Classify2d,
    #[serde(rename = "initVol")]
    InitVol,
    #[serde(rename = "3Danalysis")]
    Analysis3d,
    #[serde(rename = "useful_OUTPUTs")]
    UsefulOutputs,
    #[serde(rename = "monitor")]
    Monitor,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Movies => "Movies",
            Stage::Ctf => "CTF",
            Stage::Micrographs => "Micrographs",
            Stage::Picking => "Picking",
            Stage::Particles => "Particles",
            Stage::Classify2d => "2Dclassify",
            Stage::InitVol => "initVol",
            Stage::Analysis3d => "3Danalysis",
            Stage::UsefulOutputs => "useful_OUTPUTs",
            Stage::Monitor => "monitor",
        }
    }

    /// Fixed color for stages that must stand out; others take the palette.
    pub fn color(self) -> Option<&'static str> {
        match self {
            Stage::UsefulOutputs => Some("#00ff00"),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One protocol instance in the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolNode {
    pub id: NodeId,
    pub class: ProtocolClass,
    pub label: String,
    pub stage: Stage,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputBinding>,
    /// "Runs after" edges with no data flowing
    #[serde(default)]
    pub prerequisites: Vec<NodeId>,
}

impl ProtocolNode {
    pub fn new(id: NodeId, class: ProtocolClass, label: impl Into<String>, stage: Stage) -> Self {
        Self {
            id,
            class,
            label: label.into(),
            stage,
            params: BTreeMap::new(),
            inputs: BTreeMap::new(),
            prerequisites: Vec::new(),
        }
    }

    /// Every node this one waits for, through inputs or prerequisites,
    /// sorted and without repeats.
    pub fn upstream(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .inputs
            .values()
            .flat_map(InputBinding::sources)
            .chain(self.prerequisites.iter().copied())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }

    pub fn input(&self, port: &str) -> Option<&InputBinding> {
        self.inputs.get(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_merges_inputs_and_prerequisites() {
        let mut node = ProtocolNode::new(NodeId(9), ProtocolClass::ExtractParticles, "extract", Stage::Particles);
        node.inputs.insert(
            "inputCoordinates".to_string(),
            InputBinding::FanIn(vec![NodeId(4).port("outputCoordinates"), NodeId(3).port("outputCoordinates")]),
        );
        node.inputs.insert("ctfRelations".to_string(), InputBinding::Port(NodeId(3).port("outputCTF")));
        node.prerequisites.push(NodeId(7));
        assert_eq!(node.upstream(), vec![NodeId(3), NodeId(4), NodeId(7)]);
    }

    #[test]
    fn bindings_serialize_with_kind_tag() {
        let binding = InputBinding::Port(NodeId(2).port("outputMovies"));
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(json["kind"], "port");
        assert_eq!(json["source"]["node"], 2);

        let protocols = InputBinding::Protocols(vec![NodeId(1), NodeId(5)]);
        let json = serde_json::to_string(&protocols).unwrap();
        assert_eq!(json, r#"{"kind":"protocols","source":[1,5]}"#);
    }

    #[test]
    fn stage_labels_match_serialized_names() {
        for stage in [Stage::Ctf, Stage::Classify2d, Stage::UsefulOutputs, Stage::Monitor] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.label()));
        }
    }
}
