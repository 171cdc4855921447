// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library of node templates offered by the node searcher.

use crate::constant::ConstantValue;
use crate::graph::Graph;
use crate::node::{EventKind, FunctionCallDecl, FunctionDecl, NodeKind};
use crate::oracle::{BinaryOperatorKind, MethodSignature, UnaryOperatorKind};
use serde::{Deserialize, Serialize};

/// Node template category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Entry points
    Events,
    /// Stacks
    Containers,
    /// Branches and loops
    Flow,
    /// Constants, variables and `this`
    Values,
    /// Operators
    Math,
    /// Host method calls
    Functions,
    /// Extension kinds
    Custom,
}

/// A node that can be created from the searcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Unique template identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Kind given to created nodes
    pub kind: NodeKind,
}

impl NodeTemplate {
    /// Create a template
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            kind,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Registry of available node templates
#[derive(Debug, Clone, Default)]
pub struct NodeLibrary {
    /// Registered templates by ID
    templates: indexmap::IndexMap<String, NodeTemplate>,
}

impl NodeLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in kinds plus a call template for each method
    pub fn standard<'a>(methods: impl IntoIterator<Item = &'a MethodSignature>) -> Self {
        let mut library = Self::new();

        for event in [EventKind::Start, EventKind::Update, EventKind::FixedUpdate] {
            let decl = FunctionDecl::event(event);
            library.register(
                NodeTemplate::new(
                    format!("event_{}", decl.name.to_lowercase()),
                    format!("On {}", decl.name),
                    NodeCategory::Events,
                    NodeKind::Function(decl),
                )
                .with_description("Entry point triggered by the engine"),
            );
        }

        library.register(NodeTemplate::new("stack", "Stack", NodeCategory::Containers, NodeKind::Stack));
        library.register(NodeTemplate::new(
            "loop_stack",
            "Loop Body",
            NodeCategory::Containers,
            NodeKind::LoopStack,
        ));

        library.register(NodeTemplate::new("if", "If", NodeCategory::Flow, NodeKind::If).with_description("If/else branching"));
        library.register(NodeTemplate::new(
            "switch",
            "Switch",
            NodeCategory::Flow,
            NodeKind::Switch { cases: vec![0, 1] },
        ));
        library.register(NodeTemplate::new("while", "While", NodeCategory::Flow, NodeKind::While));
        library.register(NodeTemplate::new("for_each", "For Each", NodeCategory::Flow, NodeKind::ForEach));
        library.register(NodeTemplate::new("return", "Return", NodeCategory::Flow, NodeKind::Return));

        library.register(NodeTemplate::new("this", "This", NodeCategory::Values, NodeKind::This));
        let constants = [
            ("bool", ConstantValue::Bool(false)),
            ("int", ConstantValue::Int(0)),
            ("float", ConstantValue::Float(0.0)),
            ("string", ConstantValue::String(String::new())),
        ];
        for (name, value) in constants {
            library.register(NodeTemplate::new(
                format!("constant_{name}"),
                format!("{name} Constant"),
                NodeCategory::Values,
                NodeKind::Constant(value),
            ));
        }

        for op in BinaryOperatorKind::all() {
            library.register(NodeTemplate::new(
                format!("operator_{}", op.display_name().to_lowercase().replace(' ', "_")),
                op.display_name(),
                NodeCategory::Math,
                NodeKind::BinaryOperator(*op),
            ));
        }
        library.register(NodeTemplate::new(
            "operator_negate",
            "Negate",
            NodeCategory::Math,
            NodeKind::UnaryOperator(UnaryOperatorKind::Negate),
        ));
        library.register(NodeTemplate::new(
            "operator_not",
            "Not",
            NodeCategory::Math,
            NodeKind::UnaryOperator(UnaryOperatorKind::Not),
        ));

        for method in methods {
            library.register_method(method);
        }
        library
    }

    /// Register a template, replacing one with the same ID
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Register a call template for a method
    pub fn register_method(&mut self, method: &MethodSignature) {
        let method_ref = method.method_ref();
        self.register(NodeTemplate::new(
            format!("call_{method_ref}"),
            method_ref.to_string(),
            NodeCategory::Functions,
            NodeKind::FunctionCall(FunctionCallDecl::new(method_ref)),
        ));
    }

    /// Get a template by ID
    pub fn get(&self, id: &str) -> Option<&NodeTemplate> {
        self.templates.get(id)
    }

    /// Get all registered templates
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values()
    }

    /// Get templates by category
    pub fn templates_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values().filter(move |t| t.category == category)
    }

    /// Templates whose name contains `query`, ignoring case
    pub fn search<'a>(&'a self, query: &str) -> Vec<&'a NodeTemplate> {
        let query = query.to_lowercase();
        self.templates
            .values()
            .filter(|t| t.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Get and set templates for the variables of a graph
    pub fn variable_templates(graph: &Graph) -> Vec<NodeTemplate> {
        graph
            .variables()
            .flat_map(|v| {
                [
                    NodeTemplate::new(
                        format!("get_{}", v.name),
                        format!("Get {}", v.name),
                        NodeCategory::Values,
                        NodeKind::GetVariable(v.id),
                    ),
                    NodeTemplate::new(
                        format!("set_{}", v.name),
                        format!("Set {}", v.name),
                        NodeCategory::Values,
                        NodeKind::SetVariable(v.id),
                    ),
                ]
            })
            .collect()
    }
}
