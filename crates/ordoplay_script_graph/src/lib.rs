// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visual scripting graph model for `OrdoPlay` Editor.
//!
//! This crate provides the authoring model that gameplay scripts are built
//! from before they are translated into source code:
//! - Type handles and the type oracle that answers reflection queries
//! - Nodes, ports, edges, stacks and entry-point functions
//! - Port (re)definition for built-in and extension node kinds
//! - Generic type inference across connections
//! - Control-flow analysis (join points of branching stacks)
//! - Asset persistence in RON
//!
//! ## Architecture
//!
//! The [`Graph`] owns every node in an insertion-ordered arena. Edges and
//! ports only refer to nodes by id. Stacks are nodes that hold an ordered
//! list of child ids and are linked to each other through execution ports.

pub mod asset;
pub mod constant;
pub mod control_flow;
pub mod definition;
pub mod edge;
pub mod graph;
pub mod inference;
pub mod library;
pub mod node;
pub mod oracle;
pub mod port;
pub mod stencil;
pub mod types;
pub mod variable;

pub use asset::{
    check_round_trip, AssetError, AssetStore, FileAssetStore, GraphAsset, GraphSummary, MemoryAssetStore,
    GRAPH_FILE_EXTENSION, GRAPH_FORMAT_VERSION,
};
pub use constant::ConstantValue;
pub use control_flow::{find_common_descendant, find_common_descendant_of_all};
pub use definition::{define_ports, CustomNodeDefinition, DefinitionEnv, DefinitionError, NodeExtensions, PortSpec};
pub use edge::{Edge, EdgeId, PortRef};
pub use graph::{ConnectionError, Graph, GraphError};
pub use inference::{
    infer_all_generics, infer_node_generics, initial_handles, solve_type_arguments, GenericBindings, InferenceError,
};
pub use library::{NodeCategory, NodeLibrary, NodeTemplate};
pub use node::{EventKind, FunctionCallDecl, FunctionDecl, Node, NodeCapabilities, NodeId, NodeKind};
pub use oracle::{
    BinaryOperatorKind, Member, MemberFilter, MemberKind, MethodRef, MethodSignature, OperatorSignature,
    OperatorKind, ParameterInfo, TypeDatabase, TypeInfo, TypeKind, TypeOracle, UnaryOperatorKind,
};
pub use port::{Port, PortDirection, PortId, PortKind};
pub use stencil::Stencil;
pub use types::{TypeHandle, TypeParseError, TypeRef};
pub use variable::{VariableDeclaration, VariableId, VariableScope};
