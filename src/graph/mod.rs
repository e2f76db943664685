// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Protocol graph: catalog, nodes, assembly, validation and ordering.

mod builder;
mod labels;
mod node;
mod order;
mod protocol;
mod validation;

pub use builder::{GraphBuilder, NodeHandle, WorkflowGraph};
pub use labels::{LabelEntry, LabelRegistry, LABEL_PALETTE};
pub use node::{InputBinding, NodeId, PortRef, ProtocolNode, Stage};
pub use order::execution_order;
pub use protocol::{ClassSpec, ProtocolClass};
pub use validation::validate_graph;
