// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for visual scripts.
//!
//! Built-in node kinds form a closed [`NodeKind`] enum; extension kinds go
//! through [`NodeKind::Custom`] and the [`NodeExtensions`](crate::definition::NodeExtensions)
//! registry.

use crate::constant::ConstantValue;
use crate::oracle::{BinaryOperatorKind, MethodRef, UnaryOperatorKind};
use crate::port::{Port, PortDirection, PortId, PortKind};
use crate::types::TypeHandle;
use crate::variable::VariableId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// External event that triggers an entry point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Once when the script starts
    Start,
    /// Every frame
    Update,
    /// Every physics step
    FixedUpdate,
    /// Named event delivered through the event bus
    Custom(String),
}

impl EventKind {
    /// Name of the method the entry point is emitted into
    pub fn method_name(&self) -> String {
        match self {
            Self::Start => "Start".to_string(),
            Self::Update => "Update".to_string(),
            Self::FixedUpdate => "FixedUpdate".to_string(),
            Self::Custom(name) => format!("On{name}"),
        }
    }

    /// Whether a subscription must be emitted for this event
    pub fn needs_registration(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

/// An entry point: a named function whose root stack is the node itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Function name
    pub name: String,
    /// Return type
    pub return_type: TypeHandle,
    /// Triggering event, `None` for plain methods
    pub event: Option<EventKind>,
}

impl FunctionDecl {
    /// Plain method
    pub fn method(name: impl Into<String>, return_type: TypeHandle) -> Self {
        Self {
            name: name.into(),
            return_type,
            event: None,
        }
    }

    /// Event handler
    pub fn event(event: EventKind) -> Self {
        Self {
            name: event.method_name(),
            return_type: TypeHandle::void(),
            event: Some(event),
        }
    }

    /// Name of the emitted method
    pub fn method_name(&self) -> String {
        match &self.event {
            Some(event) => event.method_name(),
            None => self.name.clone(),
        }
    }
}

/// A call to a host method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallDecl {
    /// Called method
    pub method: MethodRef,
    /// Solved type variables
    #[serde(default)]
    pub type_arguments: IndexMap<String, TypeHandle>,
}

impl FunctionCallDecl {
    /// Call to `method` with nothing inferred yet
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            type_arguments: IndexMap::new(),
        }
    }
}

/// What a node does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Sequential statement container
    Stack,
    /// Container holding a loop body
    LoopStack,
    /// Entry point; also the root stack of its function
    Function(FunctionDecl),
    /// Literal value
    Constant(ConstantValue),
    /// Read a variable
    GetVariable(VariableId),
    /// Assign a variable
    SetVariable(VariableId),
    /// Binary operator
    BinaryOperator(BinaryOperatorKind),
    /// Unary operator
    UnaryOperator(UnaryOperatorKind),
    /// Host method call
    FunctionCall(FunctionCallDecl),
    /// The object the script runs on
    This,
    /// Two-way branch
    If,
    /// Multi-way branch on an integer
    Switch {
        /// Case labels, one execution output each
        cases: Vec<i64>,
    },
    /// Conditional loop
    While,
    /// Iteration over a collection
    ForEach,
    /// Return from the enclosing function
    Return,
    /// Extension kind resolved through the registry
    Custom {
        /// Registered type id
        type_id: String,
        /// Free-form configuration
        #[serde(default)]
        config: IndexMap<String, String>,
    },
}

impl NodeKind {
    /// Tag used by factories and registries
    pub fn type_id(&self) -> &str {
        match self {
            Self::Stack => "stack",
            Self::LoopStack => "loop_stack",
            Self::Function(_) => "function",
            Self::Constant(_) => "constant",
            Self::GetVariable(_) => "get_variable",
            Self::SetVariable(_) => "set_variable",
            Self::BinaryOperator(_) => "binary_operator",
            Self::UnaryOperator(_) => "unary_operator",
            Self::FunctionCall(_) => "function_call",
            Self::This => "this",
            Self::If => "if",
            Self::Switch { .. } => "switch",
            Self::While => "while",
            Self::ForEach => "for_each",
            Self::Return => "return",
            Self::Custom { type_id, .. } => type_id,
        }
    }

    /// Whether this node holds other nodes
    pub fn is_stack(&self) -> bool {
        matches!(self, Self::Stack | Self::LoopStack | Self::Function(_))
    }

    /// Whether this node ends its stack by choosing among branch targets
    pub fn is_branching(&self) -> bool {
        matches!(self, Self::If | Self::Switch { .. })
    }

    /// Whether this node owns a loop body
    pub fn is_loop(&self) -> bool {
        matches!(self, Self::While | Self::ForEach)
    }

    /// Whether this kind may be placed inside a stack
    pub fn is_stackable(&self) -> bool {
        matches!(
            self,
            Self::SetVariable(_)
                | Self::FunctionCall(_)
                | Self::If
                | Self::Switch { .. }
                | Self::While
                | Self::ForEach
                | Self::Return
                | Self::Custom { .. }
        )
    }

    /// Title given to new nodes of this kind
    pub fn default_title(&self) -> String {
        match self {
            Self::Stack => "Stack".to_string(),
            Self::LoopStack => "Loop".to_string(),
            Self::Function(decl) => decl.name.clone(),
            Self::Constant(value) => format!("{} Constant", value.type_handle()),
            Self::GetVariable(_) => "Get Variable".to_string(),
            Self::SetVariable(_) => "Set Variable".to_string(),
            Self::BinaryOperator(op) => op.display_name().to_string(),
            Self::UnaryOperator(UnaryOperatorKind::Negate) => "Negate".to_string(),
            Self::UnaryOperator(UnaryOperatorKind::Not) => "Not".to_string(),
            Self::FunctionCall(call) => call.method.to_string(),
            Self::This => "This".to_string(),
            Self::If => "If".to_string(),
            Self::Switch { .. } => "Switch".to_string(),
            Self::While => "While".to_string(),
            Self::ForEach => "For Each".to_string(),
            Self::Return => "Return".to_string(),
            Self::Custom { type_id, .. } => type_id.clone(),
        }
    }

    /// Editing capabilities of this kind
    pub fn capabilities(&self) -> NodeCapabilities {
        match self {
            Self::Function(_) => NodeCapabilities {
                deletable: true,
                copiable: false,
                renamable: true,
                collapsible: false,
            },
            Self::Stack | Self::LoopStack => NodeCapabilities {
                deletable: true,
                copiable: true,
                renamable: false,
                collapsible: false,
            },
            _ => NodeCapabilities::default(),
        }
    }
}

/// What the editor may do with a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCapabilities {
    /// Can be deleted
    pub deletable: bool,
    /// Can be copied
    pub copiable: bool,
    /// Title can be edited
    pub renamable: bool,
    /// Can be collapsed
    pub collapsible: bool,
}

impl Default for NodeCapabilities {
    fn default() -> Self {
        Self {
            deletable: true,
            copiable: true,
            renamable: false,
            collapsible: true,
        }
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Kind and configuration
    pub kind: NodeKind,
    /// Display name
    pub title: String,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Custom color (optional)
    pub color: Option<[u8; 3]>,
    /// Locked nodes cannot be moved or edited
    pub locked: bool,
    /// Whether the node is collapsed in the UI
    pub collapsed: bool,
    /// Stack this node is placed in
    pub parent: Option<NodeId>,
    /// Ordered contents, for stacks
    pub children: Vec<NodeId>,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Values used by unconnected data inputs
    pub embedded_constants: IndexMap<PortId, ConstantValue>,
    /// Whether ports have been defined
    pub defined: bool,
}

impl Node {
    /// Create an undefined node of the given kind
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            title: kind.default_title(),
            kind,
            position: [0.0, 0.0],
            color: None,
            locked: false,
            collapsed: false,
            parent: None,
            children: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            embedded_constants: IndexMap::new(),
            defined: false,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Whether the node lives inside a stack
    pub fn is_stacked(&self) -> bool {
        self.parent.is_some()
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs
            .iter()
            .find(|p| p.id == *port_id)
            .or_else(|| self.outputs.iter().find(|p| p.id == *port_id))
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Input ports that carry plain values (and can hold embedded constants)
    pub fn data_inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().filter(|p| p.kind == PortKind::Data)
    }

    /// Execution outputs in declaration order
    pub fn execution_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs
            .iter()
            .filter(|p| p.direction == PortDirection::Output && p.kind == PortKind::Execution)
    }

    /// Editing capabilities
    pub fn capabilities(&self) -> NodeCapabilities {
        self.kind.capabilities()
    }
}
