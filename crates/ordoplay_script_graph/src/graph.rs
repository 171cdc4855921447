// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, edges and variables.

use crate::constant::ConstantValue;
use crate::definition::{define_ports, DefinitionEnv, DefinitionError};
use crate::edge::{Edge, EdgeId};
use crate::node::{FunctionDecl, Node, NodeId, NodeKind};
use crate::oracle::{MethodRef, TypeOracle};
use crate::port::{Port, PortDirection, PortId, PortKind};
use crate::stencil::Stencil;
use crate::types::TypeHandle;
use crate::variable::{VariableDeclaration, VariableId, VariableScope};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// A visual script graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name, also the name of the generated class
    pub name: String,
    /// Policy for this graph
    #[serde(default)]
    pub stencil: Stencil,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Edges between ports
    edges: IndexMap<EdgeId, Edge>,
    /// Declared variables
    #[serde(default)]
    variables: IndexMap<VariableId, VariableDeclaration>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stencil: Stencil::default(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            variables: IndexMap::new(),
        }
    }

    /// Create a graph with a custom stencil
    pub fn with_stencil(name: impl Into<String>, stencil: Stencil) -> Self {
        Self {
            stencil,
            ..Self::new(name)
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add an already built node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Create a node of `kind` at `position` and define its ports
    pub fn spawn_node(
        &mut self,
        kind: NodeKind,
        position: [f32; 2],
        env: &DefinitionEnv<'_>,
    ) -> Result<NodeId, GraphError> {
        if !self.stencil.allows(&kind) {
            return Err(GraphError::NotAllowed(kind.type_id().to_string()));
        }
        let mut node = Node::new(kind);
        node.position = position;
        let id = self.add_node(node);
        if let Err(err) = self.define_node(id, env) {
            self.nodes.shift_remove(&id);
            return Err(err.into());
        }
        tracing::debug!(node = ?id, "Spawned node");
        Ok(id)
    }

    /// Create a node inside `stack` at `index` (appended when `None`)
    pub fn add_node_to_stack(
        &mut self,
        stack: NodeId,
        index: Option<usize>,
        kind: NodeKind,
        env: &DefinitionEnv<'_>,
    ) -> Result<NodeId, GraphError> {
        let stack_node = self.nodes.get(&stack).ok_or(GraphError::NodeNotFound(stack))?;
        if !stack_node.kind.is_stack() {
            return Err(GraphError::NotAStack(stack));
        }
        let stackable = match &kind {
            NodeKind::Custom { type_id, .. } => env
                .extensions
                .and_then(|ext| ext.get(type_id))
                .is_some_and(|def| def.is_stackable()),
            other => other.is_stackable(),
        };
        if !stackable {
            return Err(GraphError::NotStackable(kind.type_id().to_string()));
        }
        if !self.stencil.allows(&kind) {
            return Err(GraphError::NotAllowed(kind.type_id().to_string()));
        }

        let mut node = Node::new(kind);
        node.parent = Some(stack);
        let id = self.add_node(node);
        if let Some(stack_node) = self.nodes.get_mut(&stack) {
            let at = index.unwrap_or(stack_node.children.len()).min(stack_node.children.len());
            stack_node.children.insert(at, id);
        }

        if let Err(err) = self.define_node(id, env) {
            self.remove_node(id);
            return Err(err.into());
        }
        tracing::debug!(node = ?id, stack = ?stack, "Added node to stack");
        Ok(id)
    }

    /// Remove a node, its edges, and (for stacks) its children
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;

        for child in &node.children {
            self.remove_node(*child);
        }
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node_id);
        }
        self.edges.retain(|_, e| !e.involves_node(node_id));
        if matches!(node.kind, NodeKind::Function(_)) {
            self.variables.retain(|_, v| {
                !matches!(v.scope, VariableScope::Local(f) | VariableScope::Parameter(f) if f == node_id)
            });
        }
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Position of a node in graph order
    pub fn node_index(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&node_id)
    }

    /// Entry points in graph order
    pub fn functions(&self) -> impl Iterator<Item = (NodeId, &FunctionDecl)> {
        self.nodes.values().filter_map(|n| match &n.kind {
            NodeKind::Function(decl) => Some((n.id, decl)),
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Port definition
    // ------------------------------------------------------------------

    /// (Re)define the ports of a node.
    ///
    /// Ports keep their id when a port with the same name and direction
    /// existed before. Edges to ports that vanished are dropped, and each
    /// data input ends up with exactly one embedded constant.
    pub fn define_node(&mut self, node_id: NodeId, env: &DefinitionEnv<'_>) -> Result<(), DefinitionError> {
        let kind = self
            .nodes
            .get(&node_id)
            .map(|n| n.kind.clone())
            .ok_or(DefinitionError::NodeNotFound(node_id))?;
        let return_type = self.owning_function(node_id).and_then(|f| match &self.nodes.get(&f)?.kind {
            NodeKind::Function(decl) => Some(decl.return_type.clone()),
            _ => None,
        });
        let specs = define_ports(&kind, env, &self.variables, return_type.as_ref())?;

        let Some(node) = self.nodes.get_mut(&node_id) else {
            return Err(DefinitionError::NodeNotFound(node_id));
        };
        let mut old: Vec<Port> = node.inputs.drain(..).chain(node.outputs.drain(..)).collect();

        for spec in specs {
            let port = match old.iter().position(|p| p.name == spec.name && p.direction == spec.direction) {
                Some(index) => {
                    let mut port = old.swap_remove(index);
                    port.kind = spec.kind;
                    port.data_type = spec.data_type;
                    port
                }
                None => Port::new(node_id, spec.name, spec.direction, spec.kind, spec.data_type),
            };
            match port.direction {
                PortDirection::Input => node.inputs.push(port),
                PortDirection::Output => node.outputs.push(port),
            }
        }

        let mut constants = IndexMap::new();
        for port in node.inputs.iter().filter(|p| p.kind == PortKind::Data) {
            let fresh = default_constant(env.oracle, &port.data_type);
            let value = match node.embedded_constants.swap_remove(&port.id) {
                Some(existing)
                    if existing == fresh
                        || port.data_type.is_unknown()
                        || existing.type_handle() == port.data_type =>
                {
                    existing
                }
                _ => fresh,
            };
            constants.insert(port.id, value);
        }
        node.embedded_constants = constants;
        node.defined = true;

        let vanished: HashSet<PortId> = old.iter().map(|p| p.id).collect();
        if !vanished.is_empty() {
            let before = self.edges.len();
            self.edges
                .retain(|_, e| !vanished.contains(&e.output.port) && !vanished.contains(&e.input.port));
            let dropped = before - self.edges.len();
            if dropped > 0 {
                tracing::debug!(node = ?node_id, dropped, "Dropped edges to removed ports");
            }
        }
        Ok(())
    }

    /// Define every node that has not been defined yet, collecting failures
    pub fn define_undefined(&mut self, env: &DefinitionEnv<'_>) -> Vec<(NodeId, DefinitionError)> {
        let pending: Vec<NodeId> = self.nodes.values().filter(|n| !n.defined).map(|n| n.id).collect();
        let mut failures = Vec::new();
        for id in pending {
            if let Err(err) = self.define_node(id, env) {
                tracing::warn!(node = ?id, error = %err, "Failed to define node");
                failures.push((id, err));
            }
        }
        failures
    }

    /// Bind a function call node to another method and redefine it
    pub fn set_function_call_method(
        &mut self,
        node_id: NodeId,
        method: MethodRef,
        env: &DefinitionEnv<'_>,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let NodeKind::FunctionCall(call) = &mut node.kind else {
            return Err(GraphError::NotAFunctionCall(node_id));
        };
        if env.oracle.method(&method).is_none() {
            return Err(DefinitionError::UnknownMethod(method).into());
        }
        call.method = method;
        call.type_arguments.clear();
        node.title = node.kind.default_title();
        self.define_node(node_id, env)?;
        Ok(())
    }

    /// Replace the embedded constant of a data input
    pub fn set_embedded_constant(&mut self, node_id: NodeId, port_name: &str, value: ConstantValue) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let port = node
            .data_inputs()
            .find(|p| p.name == port_name)
            .map(|p| p.id)
            .ok_or_else(|| GraphError::PortNotFound(port_name.to_string()))?;
        node.embedded_constants.insert(port, value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Add an edge from an output port to an input port
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<EdgeId, ConnectionError> {
        let source_node = self.nodes.get(&from_node).ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node).ok_or(ConnectionError::NodeNotFound(to_node))?;

        let source_port = source_node.port(&from_port).ok_or(ConnectionError::PortNotFound(from_port))?;
        let target_port = target_node.port(&to_port).ok_or(ConnectionError::PortNotFound(to_port))?;

        if source_port.direction != PortDirection::Output || target_port.direction != PortDirection::Input {
            return Err(ConnectionError::WrongDirection);
        }
        if !source_port.can_connect(target_port) {
            return Err(ConnectionError::IncompatiblePorts);
        }
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }
        if !target_port.accepts_multiple() && self.edges.values().any(|e| e.input.port == to_port) {
            return Err(ConnectionError::PortAlreadyConnected(to_port));
        }
        if !source_port.accepts_multiple() && self.edges.values().any(|e| e.output.port == from_port) {
            return Err(ConnectionError::PortAlreadyConnected(from_port));
        }
        if self
            .edges
            .values()
            .any(|e| e.output.port == from_port && e.input.port == to_port)
        {
            return Err(ConnectionError::PortAlreadyConnected(to_port));
        }

        let edge = Edge::new(source_port, target_port);
        let id = edge.id;
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Connect two ports addressed by name
    pub fn connect_by_name(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<EdgeId, ConnectionError> {
        let output = self
            .nodes
            .get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?
            .output(from_port)
            .ok_or_else(|| ConnectionError::PortNameNotFound(from_port.to_string()))?
            .id;
        let input = self
            .nodes
            .get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?
            .input(to_port)
            .ok_or_else(|| ConnectionError::PortNameNotFound(to_port.to_string()))?
            .id;
        self.connect(from_node, output, to_node, input)
    }

    /// Remove an edge
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Option<Edge> {
        self.edges.shift_remove(&edge_id)
    }

    /// Remove every edge touching a port
    pub fn disconnect_port(&mut self, port_id: PortId) -> Vec<Edge> {
        let ids: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.involves_port(port_id))
            .map(|e| e.id)
            .collect();
        ids.into_iter().filter_map(|id| self.edges.shift_remove(&id)).collect()
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges leaving a port
    pub fn edges_from(&self, port_id: PortId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.output.port == port_id)
    }

    /// Edges entering a port
    pub fn edges_to(&self, port_id: PortId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.input.port == port_id)
    }

    /// Edges involving a node
    pub fn edges_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.involves_node(node_id))
    }

    // ------------------------------------------------------------------
    // Structural queries
    // ------------------------------------------------------------------

    /// The output port feeding a named input, with its node
    pub fn input_source(&self, node_id: NodeId, input: &str) -> Option<(&Node, &Port)> {
        let port = self.nodes.get(&node_id)?.input(input)?;
        let edge = self.edges_to(port.id).next()?;
        let source = self.nodes.get(&edge.output.node)?;
        Some((source, source.port(&edge.output.port)?))
    }

    /// Node targeted by a named execution output
    pub fn exec_target(&self, node_id: NodeId, output: &str) -> Option<NodeId> {
        let port = self.nodes.get(&node_id)?.output(output)?;
        self.edges_from(port.id).next().map(|e| e.input.node)
    }

    /// Stack containing a node
    pub fn stack_of(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(&node_id)?.parent
    }

    /// Ordered contents of a stack
    pub fn children(&self, stack: NodeId) -> &[NodeId] {
        self.nodes.get(&stack).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// First child of a stack that ends its execution: a branch or a return
    pub fn terminal_of_stack(&self, stack: NodeId) -> Option<&Node> {
        self.children(stack)
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .find(|n| n.kind.is_branching() || matches!(n.kind, NodeKind::Return))
    }

    /// Stacks execution continues to after `stack`.
    ///
    /// A branching terminal yields one entry per branch in port order, `None`
    /// for unconnected branches. Otherwise the target of `Out`, if any.
    pub fn successors_of_stack(&self, stack: NodeId) -> Vec<Option<NodeId>> {
        if let Some(terminal) = self.terminal_of_stack(stack) {
            if matches!(terminal.kind, NodeKind::Return) {
                return Vec::new();
            }
            return terminal
                .execution_outputs()
                .map(|port| self.edges_from(port.id).next().map(|e| e.input.node))
                .collect();
        }
        self.exec_target(stack, "Out").into_iter().map(Some).collect()
    }

    /// Nodes sharing an edge with `node_id`, in edge order
    pub fn connected_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut connected = IndexSet::new();
        for edge in self.edges_for_node(node_id) {
            let other = if edge.output.node == node_id {
                edge.input.node
            } else {
                edge.output.node
            };
            connected.insert(other);
        }
        connected.into_iter().collect()
    }

    /// Every node upstream of `node_id` through edges
    pub fn ancestors(&self, node_id: NodeId) -> IndexSet<NodeId> {
        self.walk(node_id, |edge, current| (edge.input.node == current).then_some(edge.output.node))
    }

    /// Every node downstream of `node_id` through edges
    pub fn descendants(&self, node_id: NodeId) -> IndexSet<NodeId> {
        self.walk(node_id, |edge, current| (edge.output.node == current).then_some(edge.input.node))
    }

    fn walk(&self, start: NodeId, step: impl Fn(&Edge, NodeId) -> Option<NodeId>) -> IndexSet<NodeId> {
        let mut found = IndexSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for edge in self.edges.values() {
                if let Some(next) = step(edge, current) {
                    if next != start && found.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        found
    }

    /// Entry point whose execution reaches `node_id`
    pub fn owning_function(&self, node_id: NodeId) -> Option<NodeId> {
        let mut visited = HashSet::new();
        let mut current = node_id;
        loop {
            if !visited.insert(current) {
                return None;
            }
            let node = self.nodes.get(&current)?;
            current = match &node.kind {
                NodeKind::Function(_) => return Some(current),
                kind if kind.is_stack() => {
                    let port = node.input("In")?;
                    self.edges_to(port.id).next()?.output.node
                }
                _ => node.parent?,
            };
        }
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Declare a variable
    pub fn add_variable(&mut self, declaration: VariableDeclaration) -> VariableId {
        let id = declaration.id;
        self.variables.insert(id, declaration);
        id
    }

    /// Remove a variable and every node reading or writing it
    pub fn remove_variable(&mut self, variable_id: VariableId) -> Option<VariableDeclaration> {
        let declaration = self.variables.shift_remove(&variable_id)?;
        let users: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::GetVariable(v) | NodeKind::SetVariable(v) if v == variable_id))
            .map(|n| n.id)
            .collect();
        for user in users {
            self.remove_node(user);
        }
        Some(declaration)
    }

    /// Get a variable
    pub fn variable(&self, variable_id: VariableId) -> Option<&VariableDeclaration> {
        self.variables.get(&variable_id)
    }

    /// Get a mutable variable
    pub fn variable_mut(&mut self, variable_id: VariableId) -> Option<&mut VariableDeclaration> {
        self.variables.get_mut(&variable_id)
    }

    /// All variables in declaration order
    pub fn variables(&self) -> impl Iterator<Item = &VariableDeclaration> {
        self.variables.values()
    }

    /// Find a variable by name
    pub fn variable_by_name(&self, name: &str) -> Option<&VariableDeclaration> {
        self.variables.values().find(|v| v.name == name)
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Move a node; locked nodes refuse
    pub fn set_position(&mut self, node_id: NodeId, position: [f32; 2]) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if node.locked {
            return Err(GraphError::Locked(node_id));
        }
        node.position = position;
        Ok(())
    }

    /// Lock or unlock a node
    pub fn set_locked(&mut self, node_id: NodeId, locked: bool) -> Result<(), GraphError> {
        self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?.locked = locked;
        Ok(())
    }

    /// Set or clear a node's custom color
    pub fn set_color(&mut self, node_id: NodeId, color: Option<[u8; 3]>) -> Result<(), GraphError> {
        self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?.color = color;
        Ok(())
    }

    /// Collapse or expand a node
    pub fn set_collapsed(&mut self, node_id: NodeId, collapsed: bool) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if node.capabilities().collapsible {
            node.collapsed = collapsed;
        }
        Ok(())
    }

    /// Rename a node
    pub fn set_title(&mut self, node_id: NodeId, title: impl Into<String>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if node.locked {
            return Err(GraphError::Locked(node_id));
        }
        node.title = title.into();
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn default_constant(oracle: &dyn TypeOracle, handle: &TypeHandle) -> ConstantValue {
    if handle.is_unknown() {
        return ConstantValue::Int(0);
    }
    match oracle.resolve(handle) {
        Some(ty) => oracle.default_value(&ty),
        None => ConstantValue::Default(handle.clone()),
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// No port with that name
    #[error("Port not found: {0}")]
    PortNameNotFound(String),

    /// Source is not an output or target is not an input
    #[error("Connections go from an output port to an input port")]
    WrongDirection,

    /// Incompatible port types
    #[error("Incompatible port types")]
    IncompatiblePorts,

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

/// Error when editing the graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// No port with that name
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Node is not a stack
    #[error("Node is not a stack: {0:?}")]
    NotAStack(NodeId),

    /// Node is not a function call
    #[error("Node is not a function call: {0:?}")]
    NotAFunctionCall(NodeId),

    /// Kind cannot be placed in a stack
    #[error("Node type cannot be stacked: {0}")]
    NotStackable(String),

    /// Kind is not allowed by the stencil
    #[error("Node type not allowed in this graph: {0}")]
    NotAllowed(String),

    /// Node is locked
    #[error("Node is locked: {0:?}")]
    Locked(NodeId),

    /// Port definition failed
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
