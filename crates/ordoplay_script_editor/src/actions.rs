// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor state and the actions that edit it.
//!
//! Every action is a plain struct handled by one reducer. Reducers never
//! mutate the current state; they clone the graph, edit the clone and
//! record what they touched in the state's [`ChangeList`] so the view can
//! be reconciled afterwards.

use crate::reconcile::ChangeList;
use crate::store::Store;
use crate::view::ElementRef;
use ordoplay_script_graph::{
    infer_node_generics, ConnectionError, ConstantValue, DefinitionEnv, EdgeId, Graph, GraphError, InferenceError,
    MethodRef, NodeExtensions, NodeId, NodeKind, TypeOracle,
};
use std::sync::Arc;

/// State held by the editor store
#[derive(Debug, Clone)]
pub struct EditorState {
    /// Graph being edited
    pub graph: Graph,
    /// Elements touched since the view was last reconciled
    pub changes: ChangeList,
    /// Whether the graph differs from the saved asset
    pub dirty: bool,
}

impl EditorState {
    /// State editing `graph`
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            changes: ChangeList::new(),
            dirty: false,
        }
    }

    fn edit(&self) -> Self {
        let mut next = self.clone();
        next.dirty = true;
        next
    }
}

/// Action errors
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Graph edit failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Edge not found
    #[error("Edge not found: {0:?}")]
    EdgeNotFound(EdgeId),
}

/// Services reducers need besides the state
#[derive(Clone)]
pub struct EditorEnv {
    /// Type oracle
    pub oracle: Arc<dyn TypeOracle + Send + Sync>,
    /// Extension node kinds
    pub extensions: Option<Arc<NodeExtensions>>,
}

impl EditorEnv {
    /// Environment without extension kinds
    pub fn new(oracle: Arc<dyn TypeOracle + Send + Sync>) -> Self {
        Self {
            oracle,
            extensions: None,
        }
    }

    /// Add extension kinds
    pub fn with_extensions(mut self, extensions: Arc<NodeExtensions>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Port definition environment
    pub fn definition_env(&self) -> DefinitionEnv<'_> {
        let env = DefinitionEnv::new(self.oracle.as_ref());
        match &self.extensions {
            Some(extensions) => env.with_extensions(extensions),
            None => env,
        }
    }
}

impl std::fmt::Debug for EditorEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorEnv")
            .field("extensions", &self.extensions.is_some())
            .finish_non_exhaustive()
    }
}

/// Create a node, free-standing or inside a stack
#[derive(Debug, Clone)]
pub struct CreateNode {
    /// Kind of the new node
    pub kind: NodeKind,
    /// Position of a free-standing node
    pub position: [f32; 2],
    /// Stack and index to insert at (appended when the index is `None`)
    pub stack: Option<(NodeId, Option<usize>)>,
}

/// Delete nodes and edges
#[derive(Debug, Clone, Default)]
pub struct DeleteElements {
    /// Nodes to delete; locked and non-deletable ones are kept
    pub nodes: Vec<NodeId>,
    /// Edges to delete
    pub edges: Vec<EdgeId>,
}

/// Connect an output port to an input port, addressed by name
#[derive(Debug, Clone)]
pub struct ConnectPorts {
    /// Output node and port
    pub from: (NodeId, String),
    /// Input node and port
    pub to: (NodeId, String),
}

/// Remove edges
#[derive(Debug, Clone)]
pub struct DisconnectEdges(pub Vec<EdgeId>);

/// Move nodes by an offset; locked nodes stay
#[derive(Debug, Clone)]
pub struct MoveNodes {
    /// Nodes to move
    pub nodes: Vec<NodeId>,
    /// Offset
    pub delta: [f32; 2],
}

/// Lock or unlock nodes
#[derive(Debug, Clone)]
pub struct SetNodesLocked {
    /// Nodes
    pub nodes: Vec<NodeId>,
    /// New lock state
    pub locked: bool,
}

/// Set or clear the color of nodes
#[derive(Debug, Clone)]
pub struct SetNodeColor {
    /// Nodes
    pub nodes: Vec<NodeId>,
    /// Color, `None` for the default
    pub color: Option<[u8; 3]>,
}

/// Collapse or expand nodes
#[derive(Debug, Clone)]
pub struct SetNodesCollapsed {
    /// Nodes; kinds that cannot collapse are skipped
    pub nodes: Vec<NodeId>,
    /// New collapse state
    pub collapsed: bool,
}

/// Rename a node
#[derive(Debug, Clone)]
pub struct RenameNode {
    /// Node
    pub node: NodeId,
    /// New title
    pub title: String,
}

/// Bind a function call node to another method
#[derive(Debug, Clone)]
pub struct ChangeFunctionCallMethod {
    /// Function call node
    pub node: NodeId,
    /// New method
    pub method: MethodRef,
}

/// Replace the embedded constant of a data input
#[derive(Debug, Clone)]
pub struct SetEmbeddedConstant {
    /// Node
    pub node: NodeId,
    /// Data input name
    pub port: String,
    /// New value
    pub value: ConstantValue,
}

/// Clear the change list once the view is reconciled
#[derive(Debug, Clone, Copy)]
pub struct AcknowledgeChanges;

/// Mark the graph as saved
#[derive(Debug, Clone, Copy)]
pub struct MarkSaved;

/// Register every editor reducer on `store`
pub fn register_editor_reducers(store: &Store<EditorState>, env: EditorEnv) {
    let e = env.clone();
    store.register(move |state: &EditorState, action: CreateNode| create_node(&e, state, action));
    store.register(delete_elements);
    let e = env.clone();
    store.register(move |state: &EditorState, action: ConnectPorts| connect_ports(&e, state, action));
    store.register(disconnect_edges);
    store.register(move_nodes);
    store.register(set_nodes_locked);
    store.register(set_node_color);
    store.register(set_nodes_collapsed);
    store.register(rename_node);
    let e = env;
    store.register(move |state: &EditorState, action: ChangeFunctionCallMethod| {
        change_function_call_method(&e, state, action)
    });
    store.register(set_embedded_constant);
    store.register(|state: &EditorState, _: AcknowledgeChanges| {
        let mut next = state.clone();
        next.changes.clear();
        Ok::<_, ActionError>(next)
    });
    store.register(|state: &EditorState, _: MarkSaved| {
        let mut next = state.clone();
        next.dirty = false;
        Ok::<_, ActionError>(next)
    });
}

fn create_node(env: &EditorEnv, state: &EditorState, action: CreateNode) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    let definition = env.definition_env();
    let id = match action.stack {
        Some((stack, index)) => {
            let id = next.graph.add_node_to_stack(stack, index, action.kind, &definition)?;
            next.changes.mark_node(stack);
            id
        }
        None => next.graph.spawn_node(action.kind, action.position, &definition)?,
    };
    next.changes.mark_node(id);
    tracing::debug!(node = ?id, "Created node");
    Ok(next)
}

fn delete_elements(state: &EditorState, action: DeleteElements) -> Result<EditorState, ActionError> {
    let mut next = state.edit();

    for edge in action.edges {
        if next.graph.disconnect(edge).is_some() {
            next.changes.mark_deleted_edge(edge);
        }
    }

    for id in action.nodes {
        let Some(node) = next.graph.node(id) else {
            continue;
        };
        if node.locked || !node.capabilities().deletable {
            tracing::debug!(node = ?id, "Skipping node that cannot be deleted");
            continue;
        }
        let parent = node.parent;
        let edges: Vec<EdgeId> = next.graph.edges_for_node(id).map(|e| e.id).collect();
        let mut removed = vec![id];
        removed.extend_from_slice(next.graph.children(id));
        for child in &removed[1..] {
            let child_edges: Vec<EdgeId> = next.graph.edges_for_node(*child).map(|e| e.id).collect();
            for edge in child_edges {
                next.changes.mark_deleted_edge(edge);
            }
        }

        next.graph.remove_node(id);
        for edge in edges {
            next.changes.mark_deleted_edge(edge);
        }
        for node in removed {
            next.changes.mark_node(node);
        }
        if let Some(parent) = parent {
            next.changes.mark_node(parent);
        }
    }
    Ok(next)
}

fn mark_function_call(next: &mut EditorState, env: &EditorEnv, node: NodeId) {
    let is_call = next
        .graph
        .node(node)
        .is_some_and(|n| matches!(n.kind, NodeKind::FunctionCall(_)));
    if !is_call {
        return;
    }
    match infer_node_generics(&mut next.graph, node, &env.definition_env()) {
        Ok(bindings) if !bindings.is_empty() => {
            tracing::debug!(node = ?node, "Inferred type arguments");
        }
        Ok(_) => {}
        Err(err @ InferenceError::Conflict { .. }) => {
            tracing::warn!(node = ?node, "Generic inference conflict: {err}");
        }
        Err(err) => {
            tracing::warn!(node = ?node, "Generic inference failed: {err}");
        }
    }
    next.changes.mark_node(node);
}

fn connect_ports(env: &EditorEnv, state: &EditorState, action: ConnectPorts) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    let (from, from_port) = action.from;
    let (to, to_port) = action.to;

    let edge = next.graph.connect_by_name(from, &from_port, to, &to_port)?;
    next.changes.mark_changed(ElementRef::Edge(edge));
    mark_function_call(&mut next, env, from);
    mark_function_call(&mut next, env, to);
    Ok(next)
}

fn disconnect_edges(state: &EditorState, action: DisconnectEdges) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    for id in action.0 {
        if next.graph.disconnect(id).is_none() {
            return Err(ActionError::EdgeNotFound(id));
        }
        next.changes.mark_deleted_edge(id);
    }
    Ok(next)
}

fn move_nodes(state: &EditorState, action: MoveNodes) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    for id in action.nodes {
        let node = next.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        if node.locked || node.parent.is_some() {
            continue;
        }
        let position = [node.position[0] + action.delta[0], node.position[1] + action.delta[1]];
        next.graph.set_position(id, position)?;
        next.changes.mark_node(id);
    }
    Ok(next)
}

fn set_nodes_locked(state: &EditorState, action: SetNodesLocked) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    for id in action.nodes {
        next.graph.set_locked(id, action.locked)?;
        next.changes.mark_node(id);
    }
    Ok(next)
}

fn set_node_color(state: &EditorState, action: SetNodeColor) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    for id in action.nodes {
        next.graph.set_color(id, action.color)?;
        next.changes.mark_node(id);
    }
    Ok(next)
}

fn set_nodes_collapsed(state: &EditorState, action: SetNodesCollapsed) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    for id in action.nodes {
        let node = next.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        if !node.capabilities().collapsible {
            continue;
        }
        next.graph.set_collapsed(id, action.collapsed)?;
        next.changes.mark_node(id);
    }
    Ok(next)
}

fn rename_node(state: &EditorState, action: RenameNode) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    let node = next.graph.node(action.node).ok_or(GraphError::NodeNotFound(action.node))?;
    if !node.capabilities().renamable {
        return Err(GraphError::NotAllowed(format!("renaming {}", node.kind.type_id())).into());
    }
    next.graph.set_title(action.node, action.title)?;
    next.changes.mark_node(action.node);
    Ok(next)
}

fn change_function_call_method(
    env: &EditorEnv,
    state: &EditorState,
    action: ChangeFunctionCallMethod,
) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    // Redefinition can drop ports; edges on vanished ports go with them.
    let before: Vec<EdgeId> = next.graph.edges_for_node(action.node).map(|e| e.id).collect();
    next.graph
        .set_function_call_method(action.node, action.method, &env.definition_env())?;
    for edge in before {
        if next.graph.edge(edge).is_none() {
            next.changes.mark_deleted_edge(edge);
        }
    }
    mark_function_call(&mut next, env, action.node);
    Ok(next)
}

fn set_embedded_constant(state: &EditorState, action: SetEmbeddedConstant) -> Result<EditorState, ActionError> {
    let mut next = state.edit();
    next.graph
        .set_embedded_constant(action.node, &action.port, action.value)?;
    next.changes.mark_node(action.node);
    Ok(next)
}
