// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the graph.

use crate::node::NodeId;
use crate::port::{Port, PortDirection, PortId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Create a new random edge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// One end of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Node owning the port
    pub node: NodeId,
    /// The port
    pub port: PortId,
}

/// A connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Output end
    pub output: PortRef,
    /// Input end
    pub input: PortRef,
}

impl Edge {
    /// Create an edge between two ports.
    ///
    /// # Panics
    ///
    /// Panics if `output` is not an output port or `input` is not an input
    /// port. Callers validate directions; a mismatch here is a bug.
    pub fn new(output: &Port, input: &Port) -> Self {
        assert_eq!(
            output.direction,
            PortDirection::Output,
            "edge source `{}` must be an output port",
            output.name
        );
        assert_eq!(
            input.direction,
            PortDirection::Input,
            "edge target `{}` must be an input port",
            input.name
        );
        Self {
            id: EdgeId::new(),
            output: PortRef {
                node: output.node,
                port: output.id,
            },
            input: PortRef {
                node: input.node,
                port: input.id,
            },
        }
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.output.node == node_id || self.input.node == node_id
    }

    /// Check if this edge involves a specific port
    pub fn involves_port(&self, port_id: PortId) -> bool {
        self.output.port == port_id || self.input.port == port_id
    }
}
