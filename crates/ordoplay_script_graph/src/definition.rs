// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definition for node kinds.
//!
//! Built-in kinds map to their ports through [`define_ports`], a pure
//! function of the kind and its configuration. Extension kinds register a
//! [`CustomNodeDefinition`] in [`NodeExtensions`].

use crate::node::NodeKind;
use crate::oracle::{MethodRef, TypeOracle};
use crate::port::{PortDirection, PortKind};
use crate::types::{TypeHandle, TypeRef};
use crate::variable::{VariableDeclaration, VariableId};
use crate::node::NodeId;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// A port to create, before it has an identity
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Direction
    pub direction: PortDirection,
    /// Kind
    pub kind: PortKind,
    /// Declared type
    pub data_type: TypeHandle,
}

impl PortSpec {
    fn new(name: impl Into<String>, direction: PortDirection, kind: PortKind, data_type: TypeHandle) -> Self {
        Self {
            name: name.into(),
            direction,
            kind,
            data_type,
        }
    }

    /// Data input
    pub fn data_input(name: impl Into<String>, data_type: TypeHandle) -> Self {
        Self::new(name, PortDirection::Input, PortKind::Data, data_type)
    }

    /// Data output
    pub fn data_output(name: impl Into<String>, data_type: TypeHandle) -> Self {
        Self::new(name, PortDirection::Output, PortKind::Data, data_type)
    }

    /// Instance input
    pub fn instance_input(name: impl Into<String>, data_type: TypeHandle) -> Self {
        Self::new(name, PortDirection::Input, PortKind::Instance, data_type)
    }

    /// Instance output
    pub fn instance_output(name: impl Into<String>, data_type: TypeHandle) -> Self {
        Self::new(name, PortDirection::Output, PortKind::Instance, data_type)
    }

    /// Execution input
    pub fn exec_input(name: impl Into<String>) -> Self {
        Self::new(name, PortDirection::Input, PortKind::Execution, TypeHandle::execution())
    }

    /// Execution output
    pub fn exec_output(name: impl Into<String>) -> Self {
        Self::new(name, PortDirection::Output, PortKind::Execution, TypeHandle::execution())
    }
}

/// Definition of an extension node kind
pub trait CustomNodeDefinition: Send + Sync {
    /// Type id this definition answers for
    fn type_id(&self) -> &str;

    /// Whether nodes of this kind live in stacks
    fn is_stackable(&self) -> bool {
        true
    }

    /// Ports for the given configuration
    fn define_ports(
        &self,
        config: &IndexMap<String, String>,
        oracle: &dyn TypeOracle,
    ) -> Result<Vec<PortSpec>, DefinitionError>;
}

/// Registry of extension node kinds
#[derive(Clone, Default)]
pub struct NodeExtensions {
    definitions: IndexMap<String, Arc<dyn CustomNodeDefinition>>,
}

impl NodeExtensions {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning the one it replaces
    pub fn register(&mut self, definition: Arc<dyn CustomNodeDefinition>) -> Option<Arc<dyn CustomNodeDefinition>> {
        self.definitions.insert(definition.type_id().to_string(), definition)
    }

    /// Look up a definition
    pub fn get(&self, type_id: &str) -> Option<&Arc<dyn CustomNodeDefinition>> {
        self.definitions.get(type_id)
    }

    /// Registered type ids
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for NodeExtensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.definitions.keys()).finish()
    }
}

/// Collaborators needed to define ports
#[derive(Clone, Copy)]
pub struct DefinitionEnv<'a> {
    /// Type oracle
    pub oracle: &'a dyn TypeOracle,
    /// Extension kinds, if any
    pub extensions: Option<&'a NodeExtensions>,
}

impl<'a> DefinitionEnv<'a> {
    /// Environment without extension kinds
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        Self {
            oracle,
            extensions: None,
        }
    }

    /// Add extension kinds
    pub fn with_extensions(mut self, extensions: &'a NodeExtensions) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

/// Error when defining a node's ports
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Referenced variable does not exist
    #[error("Unknown variable: {0:?}")]
    UnknownVariable(VariableId),

    /// Referenced method does not exist
    #[error("Unknown method: {0}")]
    UnknownMethod(MethodRef),

    /// Extension kind is not registered
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Two ports share a name and direction
    #[error("Duplicate port: {0}")]
    DuplicatePort(String),
}

/// Compute the ports of a node kind.
///
/// `return_type` is the return type of the function the node executes in,
/// used by `Return` nodes.
pub fn define_ports(
    kind: &NodeKind,
    env: &DefinitionEnv<'_>,
    variables: &IndexMap<VariableId, VariableDeclaration>,
    return_type: Option<&TypeHandle>,
) -> Result<Vec<PortSpec>, DefinitionError> {
    let variable_type = |id: &VariableId| {
        variables
            .get(id)
            .map(|v| v.data_type.clone())
            .ok_or(DefinitionError::UnknownVariable(*id))
    };

    let ports = match kind {
        NodeKind::Stack => vec![PortSpec::exec_input("In"), PortSpec::exec_output("Out")],
        NodeKind::LoopStack => vec![PortSpec::exec_input("In")],
        NodeKind::Function(_) => vec![PortSpec::exec_output("Out")],
        NodeKind::Constant(value) => vec![PortSpec::data_output("Value", value.type_handle())],
        NodeKind::GetVariable(id) => vec![PortSpec::data_output("Value", variable_type(id)?)],
        NodeKind::SetVariable(id) => vec![PortSpec::data_input("Value", variable_type(id)?)],
        NodeKind::BinaryOperator(_) => vec![
            PortSpec::data_input("A", TypeHandle::unknown()),
            PortSpec::data_input("B", TypeHandle::unknown()),
            PortSpec::data_output("Result", TypeHandle::unknown()),
        ],
        NodeKind::UnaryOperator(_) => vec![
            PortSpec::data_input("Value", TypeHandle::unknown()),
            PortSpec::data_output("Result", TypeHandle::unknown()),
        ],
        NodeKind::FunctionCall(call) => {
            let signature = env
                .oracle
                .method(&call.method)
                .ok_or_else(|| DefinitionError::UnknownMethod(call.method.clone()))?;
            let bindings: IndexMap<String, TypeRef> = call
                .type_arguments
                .iter()
                .filter_map(|(name, handle)| handle.to_type_ref().map(|ty| (name.clone(), ty)))
                .collect();

            let mut ports = Vec::with_capacity(signature.parameters.len() + 2);
            if !signature.is_static {
                ports.push(PortSpec::instance_input(
                    "Instance",
                    TypeHandle::of(&signature.declaring_type.substitute(&bindings)),
                ));
            }
            for parameter in &signature.parameters {
                ports.push(PortSpec::data_input(
                    parameter.name.clone(),
                    TypeHandle::of(&parameter.ty.substitute(&bindings)),
                ));
            }
            if !signature.return_type.is_void() {
                ports.push(PortSpec::data_output(
                    "Result",
                    TypeHandle::of(&signature.return_type.substitute(&bindings)),
                ));
            }
            ports
        }
        NodeKind::This => vec![PortSpec::instance_output("Self", TypeHandle::this_type())],
        NodeKind::If => vec![
            PortSpec::data_input("Condition", TypeHandle::bool()),
            PortSpec::exec_output("Then"),
            PortSpec::exec_output("Else"),
        ],
        NodeKind::Switch { cases } => {
            let mut ports = vec![PortSpec::data_input("Value", TypeHandle::int())];
            ports.extend(cases.iter().map(|case| PortSpec::exec_output(format!("Case {case}"))));
            ports.push(PortSpec::exec_output("Default"));
            ports
        }
        NodeKind::While => vec![
            PortSpec::data_input("Condition", TypeHandle::bool()),
            PortSpec::exec_output("Body"),
        ],
        NodeKind::ForEach => vec![
            PortSpec::data_input("Collection", TypeHandle::unknown()),
            PortSpec::exec_output("Body"),
            PortSpec::data_output("Item", TypeHandle::unknown()),
        ],
        NodeKind::Return => match return_type {
            Some(ty) if !ty.is_void() => vec![PortSpec::data_input("Value", ty.clone())],
            _ => Vec::new(),
        },
        NodeKind::Custom { type_id, config } => {
            let definition = env
                .extensions
                .and_then(|ext| ext.get(type_id))
                .ok_or_else(|| DefinitionError::UnknownNodeType(type_id.clone()))?;
            definition.define_ports(config, env.oracle)?
        }
    };

    let mut seen = HashSet::new();
    for port in &ports {
        if !seen.insert((port.direction, port.name.as_str())) {
            return Err(DefinitionError::DuplicatePort(port.name.clone()));
        }
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FunctionCallDecl;
    use crate::oracle::TypeDatabase;

    #[test]
    fn test_function_call_ports_follow_signature() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let kind = NodeKind::FunctionCall(FunctionCallDecl::new(MethodRef::new("Mathf", "Clamp")));
        let ports = define_ports(&kind, &env, &IndexMap::new(), None).unwrap();
        let inputs: Vec<_> = ports.iter().filter(|p| p.direction == PortDirection::Input).collect();
        assert_eq!(inputs.len(), 3);
        assert_eq!(ports.last().map(|p| p.name.as_str()), Some("Result"));
    }

    #[test]
    fn test_instance_method_has_instance_port() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let kind = NodeKind::FunctionCall(FunctionCallDecl::new(MethodRef::new("Transform", "Translate")));
        let ports = define_ports(&kind, &env, &IndexMap::new(), None).unwrap();
        assert_eq!(ports[0].kind, PortKind::Instance);
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_unknown_extension_kind() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let kind = NodeKind::Custom {
            type_id: "spawn_particles".into(),
            config: IndexMap::new(),
        };
        assert_eq!(
            define_ports(&kind, &env, &IndexMap::new(), None),
            Err(DefinitionError::UnknownNodeType("spawn_particles".into()))
        );
    }

    #[test]
    fn test_return_ports_depend_on_function() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let vars = IndexMap::new();
        assert!(define_ports(&NodeKind::Return, &env, &vars, Some(&TypeHandle::void())).unwrap().is_empty());
        assert_eq!(
            define_ports(&NodeKind::Return, &env, &vars, Some(&TypeHandle::float())).unwrap().len(),
            1
        );
    }
}
