// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::node::NodeId;
use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// What flows through a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// Values
    Data,
    /// Execution flow between stacks
    Execution,
    /// Object instance a member is invoked on
    Instance,
}

impl PortKind {
    /// Whether values flow through this port
    pub fn carries_value(&self) -> bool {
        matches!(self, Self::Data | Self::Instance)
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Owning node
    pub node: NodeId,
    /// Port name, unique per direction on its node
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Port kind
    pub kind: PortKind,
    /// Declared data type
    pub data_type: TypeHandle,
}

impl Port {
    /// Create a new port
    pub fn new(
        node: NodeId,
        name: impl Into<String>,
        direction: PortDirection,
        kind: PortKind,
        data_type: TypeHandle,
    ) -> Self {
        Self {
            id: PortId::new(),
            node,
            name: name.into(),
            direction,
            kind,
            data_type,
        }
    }

    /// Whether this port may have more than one edge.
    ///
    /// Data inputs take a single value and execution outputs lead to a
    /// single branch target; everything else fans in or out freely.
    pub fn accepts_multiple(&self) -> bool {
        match (self.direction, self.kind) {
            (PortDirection::Input, PortKind::Execution) => true,
            (PortDirection::Input, _) => false,
            (PortDirection::Output, PortKind::Execution) => false,
            (PortDirection::Output, _) => true,
        }
    }

    /// Check if a connection to another port is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        if self.direction == other.direction {
            return false;
        }
        match (self.kind, other.kind) {
            (PortKind::Execution, PortKind::Execution) => true,
            (a, b) => a.carries_value() && b.carries_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity() {
        let node = NodeId::new();
        let exec_in = Port::new(node, "In", PortDirection::Input, PortKind::Execution, TypeHandle::execution());
        let exec_out = Port::new(node, "Out", PortDirection::Output, PortKind::Execution, TypeHandle::execution());
        let data_in = Port::new(node, "A", PortDirection::Input, PortKind::Data, TypeHandle::float());
        let data_out = Port::new(node, "Result", PortDirection::Output, PortKind::Data, TypeHandle::float());

        assert!(exec_in.accepts_multiple());
        assert!(!exec_out.accepts_multiple());
        assert!(!data_in.accepts_multiple());
        assert!(data_out.accepts_multiple());
    }

    #[test]
    fn test_can_connect() {
        let node = NodeId::new();
        let exec_out = Port::new(node, "Out", PortDirection::Output, PortKind::Execution, TypeHandle::execution());
        let data_in = Port::new(node, "A", PortDirection::Input, PortKind::Data, TypeHandle::float());
        let instance_in = Port::new(node, "Instance", PortDirection::Input, PortKind::Instance, TypeHandle::this_type());
        let data_out = Port::new(node, "Result", PortDirection::Output, PortKind::Data, TypeHandle::float());

        assert!(!exec_out.can_connect(&data_in));
        assert!(data_out.can_connect(&data_in));
        assert!(data_out.can_connect(&instance_in));
        assert!(!data_out.can_connect(&data_out));
    }
}
