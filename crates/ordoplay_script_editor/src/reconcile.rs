// SPDX-License-Identifier: MIT OR Apache-2.0
//! UI reconciliation.
//!
//! Actions record which model elements they touched in a [`ChangeList`].
//! [`compute_changes`] turns that list into a [`ReconcilePlan`] against the
//! current view, and the apply phases bring the view in line with the graph:
//!
//! 1. [`delete_graph_elements`] removes visuals of dead models
//! 2. [`rebuild_nodes`] recreates changed nodes (stacks with their children)
//! 3. [`rebuild_edges`] recreates edges touching anything rebuilt
//!
//! Stacked nodes are never rebuilt on their own; their stack is.

use crate::view::{ElementRef, GraphView, UiFactory};
use indexmap::{IndexMap, IndexSet};
use ordoplay_script_graph::{EdgeId, Graph, NodeId};

/// Model elements touched since the view was last reconciled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeList {
    changed: IndexSet<ElementRef>,
    deleted_edges: IndexSet<EdgeId>,
}

impl ChangeList {
    /// Empty change list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed, created or deleted element
    pub fn mark_changed(&mut self, element: ElementRef) {
        self.changed.insert(element);
    }

    /// Record a changed node
    pub fn mark_node(&mut self, node: NodeId) {
        self.mark_changed(ElementRef::Node(node));
    }

    /// Record a deleted edge
    pub fn mark_deleted_edge(&mut self, edge: EdgeId) {
        self.deleted_edges.insert(edge);
    }

    /// Changed elements
    pub fn changed(&self) -> &IndexSet<ElementRef> {
        &self.changed
    }

    /// Deleted edges
    pub fn deleted_edges(&self) -> &IndexSet<EdgeId> {
        &self.deleted_edges
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted_edges.is_empty()
    }

    /// Forget every change
    pub fn clear(&mut self) {
        self.changed.clear();
        self.deleted_edges.clear();
    }
}

/// View edits needed to match the graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Visuals to remove
    pub to_delete: IndexSet<ElementRef>,
    /// Nodes to recreate; stacks bring their children
    pub rebuild_nodes: IndexSet<NodeId>,
    /// Edges to recreate
    pub rebuild_edges: IndexSet<EdgeId>,
}

impl ReconcilePlan {
    /// Whether the view is already up to date
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.rebuild_nodes.is_empty() && self.rebuild_edges.is_empty()
    }
}

/// Outermost stack holding a node, or the node itself
fn rebuild_root(graph: &Graph, node: NodeId) -> NodeId {
    let mut root = node;
    while let Some(stack) = graph.stack_of(root) {
        if stack == node {
            break;
        }
        root = stack;
    }
    root
}

fn has_ancestor_in(
    element: ElementRef,
    parents: &IndexMap<ElementRef, Option<ElementRef>>,
    set: &IndexSet<ElementRef>,
) -> bool {
    let mut current = parents.get(&element).copied().flatten();
    let mut steps = 0;
    while let Some(parent) = current {
        if set.contains(&parent) {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            break;
        }
        current = parents.get(&parent).copied().flatten();
    }
    false
}

/// Work out which visuals to delete and rebuild
pub fn compute_changes(graph: &Graph, changes: &ChangeList, view: &dyn GraphView) -> ReconcilePlan {
    let existing = view.elements();
    let mut plan = ReconcilePlan::default();

    for element in existing.keys() {
        if !element.exists_in(graph) {
            plan.to_delete.insert(*element);
        }
    }
    for edge in changes.deleted_edges() {
        let element = ElementRef::Edge(*edge);
        if existing.contains_key(&element) && graph.edge(*edge).is_none() {
            plan.to_delete.insert(element);
        }
    }

    for element in changes.changed() {
        match *element {
            ElementRef::Node(id) if graph.node(id).is_some() => {
                plan.rebuild_nodes.insert(rebuild_root(graph, id));
            }
            ElementRef::Edge(id) if graph.edge(id).is_some() => {
                plan.rebuild_edges.insert(id);
            }
            dead => {
                if existing.contains_key(&dead) {
                    plan.to_delete.insert(dead);
                }
            }
        }
    }

    let stacks: Vec<NodeId> = plan
        .rebuild_nodes
        .iter()
        .copied()
        .filter(|id| graph.node(*id).is_some_and(|n| n.kind.is_stack()))
        .collect();
    for stack in stacks {
        for child in graph.children(stack) {
            plan.rebuild_nodes.shift_remove(child);
            for edge in graph.edges_for_node(*child) {
                plan.rebuild_edges.insert(edge.id);
            }
        }
    }

    for node in &plan.rebuild_nodes {
        for edge in graph.edges_for_node(*node) {
            plan.rebuild_edges.insert(edge.id);
        }
    }

    let doomed = plan.to_delete.clone();
    plan.to_delete
        .retain(|element| !has_ancestor_in(*element, &existing, &doomed));

    tracing::debug!(
        delete = plan.to_delete.len(),
        nodes = plan.rebuild_nodes.len(),
        edges = plan.rebuild_edges.len(),
        "Computed UI changes"
    );
    plan
}

/// Remove the visuals of deleted models
pub fn delete_graph_elements(view: &mut dyn GraphView, plan: &ReconcilePlan) {
    for element in &plan.to_delete {
        view.remove_element(*element);
    }
}

/// Recreate node visuals; a stack is recreated with its children inside
pub fn rebuild_nodes(view: &mut dyn GraphView, graph: &Graph, factory: &UiFactory, plan: &ReconcilePlan) {
    for id in &plan.rebuild_nodes {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        view.remove_element(ElementRef::Node(*id));
        let Some(mut visual) = factory.create_node(graph, node) else {
            tracing::warn!(node = ?id, kind = node.kind.type_id(), "No UI builder for node kind");
            continue;
        };
        visual.parent = node.parent.map(ElementRef::Node);
        view.add_element(visual);

        for child_id in &node.children {
            let Some(child) = graph.node(*child_id) else {
                continue;
            };
            match factory.create_node(graph, child) {
                Some(mut visual) => {
                    visual.parent = Some(ElementRef::Node(*id));
                    view.add_element(visual);
                }
                None => {
                    tracing::warn!(node = ?child_id, kind = child.kind.type_id(), "No UI builder for node kind");
                }
            }
        }
    }
}

/// Recreate edge visuals
pub fn rebuild_edges(view: &mut dyn GraphView, graph: &Graph, factory: &UiFactory, plan: &ReconcilePlan) {
    for id in &plan.rebuild_edges {
        let Some(edge) = graph.edge(*id) else {
            continue;
        };
        view.remove_element(ElementRef::Edge(*id));
        view.add_element(factory.create_edge(graph, edge));
    }
}

/// Run every apply phase in order
pub fn apply_plan(view: &mut dyn GraphView, graph: &Graph, factory: &UiFactory, plan: &ReconcilePlan) {
    delete_graph_elements(view, plan);
    rebuild_nodes(view, graph, factory, plan);
    rebuild_edges(view, graph, factory, plan);
}

/// Compute and apply the changes in one go
pub fn reconcile(view: &mut dyn GraphView, graph: &Graph, factory: &UiFactory, changes: &ChangeList) -> ReconcilePlan {
    let plan = compute_changes(graph, changes, view);
    apply_plan(view, graph, factory, &plan);
    plan
}

/// Build the whole view from scratch
pub fn full_rebuild(view: &mut dyn GraphView, graph: &Graph, factory: &UiFactory) -> ReconcilePlan {
    let mut changes = ChangeList::new();
    for node in graph.nodes().filter(|n| n.parent.is_none()) {
        changes.mark_node(node.id);
    }
    for edge in graph.edges() {
        changes.mark_changed(ElementRef::Edge(edge.id));
    }
    reconcile(view, graph, factory, &changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::HeadlessView;
    use ordoplay_script_graph::{
        ConstantValue, DefinitionEnv, EventKind, FunctionCallDecl, FunctionDecl, MethodRef, NodeKind, TypeDatabase,
    };

    struct Fixture {
        graph: Graph,
        function: NodeId,
        call: NodeId,
        constant: NodeId,
    }

    fn fixture() -> Fixture {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let mut graph = Graph::new("Test");
        let function = graph
            .spawn_node(NodeKind::Function(FunctionDecl::event(EventKind::Start)), [0.0, 0.0], &env)
            .unwrap();
        let call = graph
            .add_node_to_stack(
                function,
                None,
                NodeKind::FunctionCall(FunctionCallDecl::new(MethodRef::new("Debug", "Log"))),
                &env,
            )
            .unwrap();
        let constant = graph
            .spawn_node(NodeKind::Constant(ConstantValue::String("hi".into())), [0.0, 0.0], &env)
            .unwrap();
        graph.connect_by_name(constant, "Value", call, "message").unwrap();
        Fixture {
            graph,
            function,
            call,
            constant,
        }
    }

    #[test]
    fn test_stacked_node_promotes_stack() {
        let f = fixture();
        let mut changes = ChangeList::new();
        changes.mark_node(f.call);

        let plan = compute_changes(&f.graph, &changes, &HeadlessView::new());
        assert!(plan.rebuild_nodes.contains(&f.function));
        assert!(!plan.rebuild_nodes.contains(&f.call));
        assert_eq!(plan.rebuild_edges.len(), 1);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_stack_children_leave_rebuild_set() {
        let f = fixture();
        let mut changes = ChangeList::new();
        changes.mark_node(f.call);
        changes.mark_node(f.function);
        changes.mark_node(f.constant);

        let plan = compute_changes(&f.graph, &changes, &HeadlessView::new());
        let nodes: Vec<NodeId> = plan.rebuild_nodes.iter().copied().collect();
        assert_eq!(nodes, vec![f.function, f.constant]);
        assert_eq!(plan.rebuild_edges.len(), 1);
    }

    #[test]
    fn test_full_rebuild_nests_children() {
        let f = fixture();
        let mut view = HeadlessView::new();
        full_rebuild(&mut view, &f.graph, &UiFactory::standard());

        assert_eq!(view.len(), 4);
        assert_eq!(view.children_of(ElementRef::Node(f.function)), vec![ElementRef::Node(f.call)]);
        assert_eq!(view.get(ElementRef::Node(f.constant)).unwrap().class, "constant");
    }

    #[test]
    fn test_dead_elements_are_deleted_once() {
        let mut f = fixture();
        let mut view = HeadlessView::new();
        full_rebuild(&mut view, &f.graph, &UiFactory::standard());
        view.take_operations();

        f.graph.remove_node(f.function);
        let mut changes = ChangeList::new();
        changes.mark_node(f.function);
        changes.mark_node(f.call);

        let plan = compute_changes(&f.graph, &changes, &view);
        // The call visual goes with its stack.
        let deleted: Vec<ElementRef> = plan.to_delete.iter().copied().collect();
        assert_eq!(deleted.len(), 2);
        assert!(deleted.contains(&ElementRef::Node(f.function)));
        assert!(!deleted.contains(&ElementRef::Node(f.call)));
        assert!(plan.rebuild_nodes.is_empty());

        apply_plan(&mut view, &f.graph, &UiFactory::standard(), &plan);
        assert_eq!(view.len(), 1);
        assert!(view.get(ElementRef::Node(f.constant)).is_some());
    }
}
