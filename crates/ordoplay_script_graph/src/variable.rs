// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable declarations of a graph.

use crate::constant::ConstantValue;
use crate::node::NodeId;
use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a variable declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    /// Create a new random variable ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a variable lives in the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableScope {
    /// Field of the generated class
    Field,
    /// Local of the given function
    Local(NodeId),
    /// Parameter of the given function
    Parameter(NodeId),
}

/// A declared variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Unique ID
    pub id: VariableId,
    /// Identifier in generated code
    pub name: String,
    /// Declared type
    pub data_type: TypeHandle,
    /// Scope
    pub scope: VariableScope,
    /// Exposed to the inspector (public field)
    pub exposed: bool,
    /// Initial value
    pub initial_value: Option<ConstantValue>,
}

impl VariableDeclaration {
    /// Private field
    pub fn field(name: impl Into<String>, data_type: TypeHandle) -> Self {
        Self::new(name, data_type, VariableScope::Field)
    }

    /// Local variable of `function`
    pub fn local(name: impl Into<String>, data_type: TypeHandle, function: NodeId) -> Self {
        Self::new(name, data_type, VariableScope::Local(function))
    }

    /// Parameter of `function`
    pub fn parameter(name: impl Into<String>, data_type: TypeHandle, function: NodeId) -> Self {
        Self::new(name, data_type, VariableScope::Parameter(function))
    }

    fn new(name: impl Into<String>, data_type: TypeHandle, scope: VariableScope) -> Self {
        Self {
            id: VariableId::new(),
            name: name.into(),
            data_type,
            scope,
            exposed: false,
            initial_value: None,
        }
    }

    /// Mark as exposed
    pub fn exposed(mut self) -> Self {
        self.exposed = true;
        self
    }

    /// Set the initial value
    pub fn with_initial_value(mut self, value: ConstantValue) -> Self {
        self.initial_value = Some(value);
        self
    }
}
