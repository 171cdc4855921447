// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visual elements and the factory that builds them.
//!
//! The editor core never draws anything. A [`GraphView`] is whatever the
//! host uses to show the graph; the core only adds and removes
//! [`VisualElement`]s through it. [`HeadlessView`] keeps them in memory.

use indexmap::IndexMap;
use ordoplay_script_graph::{Edge, EdgeId, Graph, Node, NodeId, NodeKind, PortId};
use std::collections::HashMap;
use std::sync::Arc;

/// Model element a visual stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRef {
    /// A node
    Node(NodeId),
    /// An edge
    Edge(EdgeId),
}

impl ElementRef {
    /// Whether the model behind this reference still exists
    pub fn exists_in(&self, graph: &Graph) -> bool {
        match self {
            Self::Node(id) => graph.node(*id).is_some(),
            Self::Edge(id) => graph.edge(*id).is_some(),
        }
    }
}

/// A visual as seen by the core
#[derive(Debug, Clone, PartialEq)]
pub struct VisualElement {
    /// Model element
    pub element: ElementRef,
    /// Style class chosen by the builder
    pub class: String,
    /// Displayed text
    pub label: String,
    /// Visual container, e.g. the stack holding a node
    pub parent: Option<ElementRef>,
}

/// Host view the reconciliation engine edits
pub trait GraphView {
    /// Every element with its visual parent, in display order
    fn elements(&self) -> IndexMap<ElementRef, Option<ElementRef>>;

    /// Add or replace an element
    fn add_element(&mut self, element: VisualElement);

    /// Remove an element and everything it visually contains
    fn remove_element(&mut self, element: ElementRef) -> bool;
}

/// Builds the visual of a node
pub type NodeBuilder = Arc<dyn Fn(&Graph, &Node) -> VisualElement + Send + Sync>;

/// Registry of node visual builders keyed by node type id
#[derive(Clone, Default)]
pub struct UiFactory {
    builders: HashMap<String, NodeBuilder>,
}

impl std::fmt::Debug for UiFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("UiFactory").field("kinds", &kinds).finish()
    }
}

fn styled(class: &'static str) -> NodeBuilder {
    Arc::new(move |_, node: &Node| VisualElement {
        element: ElementRef::Node(node.id),
        class: class.to_string(),
        label: node.title.clone(),
        parent: None,
    })
}

impl UiFactory {
    /// Empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with builders for every built-in node kind
    pub fn standard() -> Self {
        let mut factory = Self::new();
        for kind in ["stack", "loop_stack", "function"] {
            factory.register(kind, styled("stack"));
        }
        for kind in ["set_variable", "function_call", "while", "for_each", "return"] {
            factory.register(kind, styled("statement"));
        }
        for kind in ["if", "switch"] {
            factory.register(kind, styled("branch"));
        }
        for kind in ["get_variable", "binary_operator", "unary_operator", "this"] {
            factory.register(kind, styled("expression"));
        }
        factory.register(
            "constant",
            Arc::new(|_, node: &Node| {
                let label = match &node.kind {
                    NodeKind::Constant(value) => format!("{value:?}"),
                    _ => node.title.clone(),
                };
                VisualElement {
                    element: ElementRef::Node(node.id),
                    class: "constant".to_string(),
                    label,
                    parent: None,
                }
            }),
        );
        factory
    }

    /// Register the builder for a node type id, returning the one it replaces
    pub fn register(&mut self, type_id: impl Into<String>, builder: NodeBuilder) -> Option<NodeBuilder> {
        self.builders.insert(type_id.into(), builder)
    }

    /// Whether a builder exists for a node type id
    pub fn has_builder(&self, type_id: &str) -> bool {
        self.builders.contains_key(type_id)
    }

    /// Build a node visual; `None` when its kind has no builder
    pub fn create_node(&self, graph: &Graph, node: &Node) -> Option<VisualElement> {
        let builder = self.builders.get(node.kind.type_id())?;
        let mut element = builder(graph, node);
        element.element = ElementRef::Node(node.id);
        if node.collapsed {
            element.class.push_str(" collapsed");
        }
        Some(element)
    }

    /// Build an edge visual
    pub fn create_edge(&self, graph: &Graph, edge: &Edge) -> VisualElement {
        let end = |node: NodeId, port: PortId| {
            graph
                .node(node)
                .and_then(|n| n.port(&port).map(|p| format!("{}.{}", n.title, p.name)))
                .unwrap_or_else(|| "?".to_string())
        };
        VisualElement {
            element: ElementRef::Edge(edge.id),
            class: "edge".to_string(),
            label: format!("{} -> {}", end(edge.output.node, edge.output.port), end(edge.input.node, edge.input.port)),
            parent: None,
        }
    }
}

/// View operation, recorded by [`HeadlessView`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOperation {
    /// Element added or replaced
    Add(ElementRef),
    /// Element removed (descendants are not listed)
    Remove(ElementRef),
}

/// In-memory view for tools and tests
#[derive(Debug, Default)]
pub struct HeadlessView {
    elements: IndexMap<ElementRef, VisualElement>,
    operations: Vec<ViewOperation>,
}

impl HeadlessView {
    /// Empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a visual
    pub fn get(&self, element: ElementRef) -> Option<&VisualElement> {
        self.elements.get(&element)
    }

    /// Number of visuals
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Visuals directly contained in `parent`
    pub fn children_of(&self, parent: ElementRef) -> Vec<ElementRef> {
        self.elements
            .values()
            .filter(|e| e.parent == Some(parent))
            .map(|e| e.element)
            .collect()
    }

    /// Operations since the last [`take_operations`](Self::take_operations)
    pub fn operations(&self) -> &[ViewOperation] {
        &self.operations
    }

    /// Drain the operation log
    pub fn take_operations(&mut self) -> Vec<ViewOperation> {
        std::mem::take(&mut self.operations)
    }
}

impl GraphView for HeadlessView {
    fn elements(&self) -> IndexMap<ElementRef, Option<ElementRef>> {
        self.elements.iter().map(|(k, v)| (*k, v.parent)).collect()
    }

    fn add_element(&mut self, element: VisualElement) {
        self.operations.push(ViewOperation::Add(element.element));
        self.elements.insert(element.element, element);
    }

    fn remove_element(&mut self, element: ElementRef) -> bool {
        if self.elements.shift_remove(&element).is_none() {
            return false;
        }
        self.operations.push(ViewOperation::Remove(element));

        let mut doomed = vec![element];
        while let Some(parent) = doomed.pop() {
            let children = self.children_of(parent);
            for child in children {
                self.elements.shift_remove(&child);
                doomed.push(child);
            }
        }
        true
    }
}
