// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic type inference for function call nodes.
//!
//! A generic method's open type variables are solved from the concrete types
//! flowing into its inputs. Slots are numbered the way ports are laid out:
//! the instance first for instance methods, then the parameters in order.
//! The handle array passed to [`solve_type_arguments`] holds one handle per
//! input slot followed by the return type.
//!
//! When two inputs bind the same variable to different types, the first
//! binding is kept and the conflict is reported.

use crate::definition::{DefinitionEnv, DefinitionError};
use crate::graph::Graph;
use crate::node::{NodeId, NodeKind};
use crate::oracle::{MethodSignature, TypeOracle};
use crate::port::PortKind;
use crate::types::{TypeHandle, TypeRef};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Solved type variables of one call, in order of solving
pub type GenericBindings = IndexMap<String, TypeRef>;

/// How many implicit conversions are followed when matching shapes
const MAX_SUPERTYPE_DEPTH: usize = 8;

/// Error raised while inferring type arguments
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    /// No input slot at that index
    #[error("Parameter index {index} out of range ({count} inputs)")]
    ParameterOutOfRange {
        /// Requested index
        index: usize,
        /// Number of input slots
        count: usize,
    },

    /// A variable was already bound to another type
    #[error("Type variable `{variable}` is `{existing}`, cannot also be `{conflicting}`")]
    Conflict {
        /// Type variable
        variable: String,
        /// Kept binding
        existing: TypeRef,
        /// Rejected binding
        conflicting: TypeRef,
    },

    /// The concrete type does not have the declared shape
    #[error("`{concrete}` does not match parameter type `{declared}`")]
    Mismatch {
        /// Declared parameter type
        declared: TypeRef,
        /// Type flowing in
        concrete: TypeRef,
    },

    /// Node is not a function call
    #[error("Node is not a function call: {0:?}")]
    NotAFunctionCall(NodeId),

    /// Port definition failed
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Handles of every slot of a signature before anything is solved
pub fn initial_handles(signature: &MethodSignature) -> Vec<TypeHandle> {
    slot_types(signature).iter().map(TypeHandle::of).collect()
}

fn slot_types(signature: &MethodSignature) -> Vec<TypeRef> {
    let mut slots = signature.input_types();
    slots.push(signature.return_type.clone());
    slots
}

/// Solve type variables from a concrete type flowing into one input slot.
///
/// New bindings are merged into `generic_types` and every handle whose slot
/// mentions a bound variable is rewritten. A slot whose declared type has no
/// type variables leaves everything untouched.
pub fn solve_type_arguments(
    oracle: &dyn TypeOracle,
    signature: &MethodSignature,
    generic_types: &mut GenericBindings,
    type_handles: &mut [TypeHandle],
    concrete: &TypeRef,
    parameter_index: usize,
) -> Result<(), InferenceError> {
    let inputs = signature.input_types();
    let declared = inputs.get(parameter_index).ok_or(InferenceError::ParameterOutOfRange {
        index: parameter_index,
        count: inputs.len(),
    })?;
    if !declared.contains_params() {
        return Ok(());
    }

    let mut solved = GenericBindings::new();
    unify(oracle, declared, concrete, &mut solved)?;

    let mut conflict = None;
    for (variable, ty) in solved {
        match generic_types.get(&variable) {
            Some(existing) if *existing != ty => {
                tracing::warn!(%variable, %existing, conflicting = %ty, "Conflicting generic binding");
                conflict.get_or_insert(InferenceError::Conflict {
                    variable,
                    existing: existing.clone(),
                    conflicting: ty,
                });
            }
            Some(_) => {}
            None => {
                generic_types.insert(variable, ty);
            }
        }
    }

    for (slot, handle) in slot_types(signature).iter().zip(type_handles.iter_mut()) {
        if slot.contains_params() {
            *handle = TypeHandle::of(&slot.substitute(generic_types));
        }
    }

    conflict.map_or(Ok(()), Err)
}

/// Match a declared shape against a concrete type, binding variables
fn unify(
    oracle: &dyn TypeOracle,
    declared: &TypeRef,
    concrete: &TypeRef,
    solved: &mut GenericBindings,
) -> Result<(), InferenceError> {
    match declared {
        TypeRef::Param(variable) => match solved.get(variable) {
            Some(existing) if existing != concrete => Err(InferenceError::Conflict {
                variable: variable.clone(),
                existing: existing.clone(),
                conflicting: concrete.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                solved.insert(variable.clone(), concrete.clone());
                Ok(())
            }
        },
        TypeRef::Named { name, args } => {
            let matching = same_shape(oracle, name, args.len(), concrete).ok_or_else(|| InferenceError::Mismatch {
                declared: declared.clone(),
                concrete: concrete.clone(),
            })?;
            for (arg, concrete_arg) in args.iter().zip(matching.args()) {
                unify(oracle, arg, concrete_arg, solved)?;
            }
            Ok(())
        }
    }
}

/// `concrete` itself or the nearest supertype named `name` with `arity` arguments
fn same_shape(oracle: &dyn TypeOracle, name: &str, arity: usize, concrete: &TypeRef) -> Option<TypeRef> {
    let mut seen = IndexSet::new();
    let mut queue = VecDeque::from([(concrete.clone(), 0)]);
    while let Some((candidate, depth)) = queue.pop_front() {
        if candidate.name() == name && candidate.args().len() == arity {
            return Some(candidate);
        }
        if depth >= MAX_SUPERTYPE_DEPTH || !seen.insert(candidate.clone()) {
            continue;
        }
        for supertype in oracle.supertypes(&candidate) {
            queue.push_back((supertype, depth + 1));
        }
    }
    None
}

/// Re-solve a function call node from the types connected to its inputs.
///
/// Bindings are stored on the node and its ports are redefined, so the
/// result and parameter ports carry the solved types. On conflict the first
/// binding is still applied before the error is returned.
pub fn infer_node_generics(
    graph: &mut Graph,
    node_id: NodeId,
    env: &DefinitionEnv<'_>,
) -> Result<GenericBindings, InferenceError> {
    let node = graph
        .node(node_id)
        .ok_or(DefinitionError::NodeNotFound(node_id))?;
    let NodeKind::FunctionCall(call) = &node.kind else {
        return Err(InferenceError::NotAFunctionCall(node_id));
    };
    let signature = env
        .oracle
        .method(&call.method)
        .ok_or_else(|| DefinitionError::UnknownMethod(call.method.clone()))?;
    if !signature.is_generic() {
        return Ok(GenericBindings::new());
    }

    let mut bindings = GenericBindings::new();
    let mut handles = initial_handles(&signature);
    let mut first_error = None;

    let inputs: Vec<String> = node
        .inputs
        .iter()
        .filter(|p| p.kind != PortKind::Execution)
        .map(|p| p.name.clone())
        .collect();
    for (index, input) in inputs.iter().enumerate() {
        let Some(concrete) = graph
            .input_source(node_id, input)
            .and_then(|(_, port)| env.oracle.resolve(&port.data_type))
        else {
            continue;
        };
        if let Err(err) = solve_type_arguments(env.oracle, &signature, &mut bindings, &mut handles, &concrete, index) {
            first_error.get_or_insert(err);
        }
    }

    if let Some(NodeKind::FunctionCall(call)) = graph.node_mut(node_id).map(|n| &mut n.kind) {
        call.type_arguments = bindings.iter().map(|(k, v)| (k.clone(), TypeHandle::of(v))).collect();
    }
    graph.define_node(node_id, env)?;
    tracing::debug!(node = ?node_id, solved = bindings.len(), "Inferred generic arguments");

    first_error.map_or(Ok(bindings), Err)
}

/// Infer every generic call until nothing changes, collecting failures
pub fn infer_all_generics(graph: &mut Graph, env: &DefinitionEnv<'_>) -> Vec<(NodeId, InferenceError)> {
    let calls: Vec<NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind, NodeKind::FunctionCall(_)))
        .map(|n| n.id)
        .collect();

    let mut failures = IndexMap::new();
    // Each pass can only settle types one call further downstream
    for _ in 0..=calls.len() {
        let mut changed = false;
        for &id in &calls {
            let before = graph.node(id).map(|n| n.kind.clone());
            match infer_node_generics(graph, id, env) {
                Ok(_) => {
                    failures.shift_remove(&id);
                }
                Err(err) => {
                    failures.insert(id, err);
                }
            }
            changed |= graph.node(id).map(|n| &n.kind) != before.as_ref();
        }
        if !changed {
            break;
        }
    }
    failures.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{MethodRef, TypeDatabase};

    fn database() -> TypeDatabase {
        let mut db = TypeDatabase::standard();
        db.register_method(
            MethodSignature::new_static("Enumerable", "Sum")
                .generic("T")
                .param("values", "List<T>")
                .returns("T"),
        );
        db.register_method(
            MethodSignature::new_static("Enumerable", "Pick")
                .generic("T")
                .param("first", "T")
                .param("second", "T")
                .param("useFirst", "bool")
                .returns("T"),
        );
        db
    }

    fn float_list() -> TypeRef {
        TypeRef::generic("List", vec![TypeRef::named("float")])
    }

    #[test]
    fn test_solve_nested_variable() {
        let db = database();
        let sum = db.method(&MethodRef::new("Enumerable", "Sum")).unwrap();
        let mut bindings = GenericBindings::new();
        let mut handles = initial_handles(&sum);

        solve_type_arguments(&db, &sum, &mut bindings, &mut handles, &float_list(), 0).unwrap();
        assert_eq!(bindings.get("T"), Some(&TypeRef::named("float")));
        assert_eq!(handles, vec![TypeHandle::new("List<float>"), TypeHandle::float()]);
    }

    #[test]
    fn test_non_generic_parameter_is_noop() {
        let db = database();
        let pick = db.method(&MethodRef::new("Enumerable", "Pick")).unwrap();
        let mut bindings = GenericBindings::new();
        let mut handles = initial_handles(&pick);
        solve_type_arguments(&db, &pick, &mut bindings, &mut handles, &TypeRef::named("int"), 0).unwrap();
        let solved = (bindings.clone(), handles.clone());

        solve_type_arguments(&db, &pick, &mut bindings, &mut handles, &TypeRef::named("bool"), 2).unwrap();
        assert_eq!((bindings, handles), solved);
    }

    #[test]
    fn test_solve_through_supertype() {
        let db = database();
        let first = db.method(&MethodRef::new("Enumerable", "First")).unwrap();
        let mut bindings = GenericBindings::new();
        let mut handles = initial_handles(&first);
        solve_type_arguments(&db, &first, &mut bindings, &mut handles, &float_list(), 0).unwrap();
        assert_eq!(handles.last(), Some(&TypeHandle::float()));
    }

    #[test]
    fn test_conflict_keeps_first_binding() {
        let db = database();
        let pick = db.method(&MethodRef::new("Enumerable", "Pick")).unwrap();
        let mut bindings = GenericBindings::new();
        let mut handles = initial_handles(&pick);
        solve_type_arguments(&db, &pick, &mut bindings, &mut handles, &TypeRef::named("int"), 0).unwrap();

        let result = solve_type_arguments(&db, &pick, &mut bindings, &mut handles, &TypeRef::named("string"), 1);
        assert!(matches!(result, Err(InferenceError::Conflict { .. })));
        assert_eq!(bindings.get("T"), Some(&TypeRef::named("int")));
        assert_eq!(handles[3], TypeHandle::int());
    }

    #[test]
    fn test_mismatch_and_range() {
        let db = database();
        let sum = db.method(&MethodRef::new("Enumerable", "Sum")).unwrap();
        let mut bindings = GenericBindings::new();
        let mut handles = initial_handles(&sum);
        assert!(matches!(
            solve_type_arguments(&db, &sum, &mut bindings, &mut handles, &TypeRef::named("float"), 0),
            Err(InferenceError::Mismatch { .. })
        ));
        assert_eq!(
            solve_type_arguments(&db, &sum, &mut bindings, &mut handles, &float_list(), 3),
            Err(InferenceError::ParameterOutOfRange { index: 3, count: 1 })
        );
        assert!(bindings.is_empty());
    }
}
