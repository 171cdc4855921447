// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port (re)definition and generic inference on live graphs.

use indexmap::IndexMap;
use ordoplay_script_graph::{
    infer_all_generics, infer_node_generics, ConstantValue, CustomNodeDefinition, DefinitionEnv, DefinitionError,
    EventKind, FunctionCallDecl, FunctionDecl, Graph, InferenceError, MethodRef, MethodSignature, NodeExtensions, NodeId,
    NodeKind, PortKind, PortSpec, TypeDatabase, TypeHandle, TypeOracle, VariableDeclaration,
};
use std::sync::Arc;

fn call(declaring_type: &str, name: &str) -> NodeKind {
    NodeKind::FunctionCall(FunctionCallDecl::new(MethodRef::new(declaring_type, name)))
}

fn port_counts(graph: &Graph, node: NodeId) -> (usize, usize, usize) {
    let node = graph.node(node).unwrap();
    (node.inputs.len(), node.outputs.len(), node.embedded_constants.len())
}

#[test]
fn redefinition_is_idempotent() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Redefine");
    let clamp = graph.spawn_node(call("Mathf", "Clamp"), [0.0, 0.0], &env).unwrap();
    let ids_before: Vec<_> = graph.node(clamp).unwrap().ports().map(|p| p.id).collect();
    let counts = port_counts(&graph, clamp);

    graph.define_node(clamp, &env).unwrap();
    graph.define_node(clamp, &env).unwrap();

    assert_eq!(port_counts(&graph, clamp), counts);
    assert_eq!(counts, (3, 1, 3));
    let ids_after: Vec<_> = graph.node(clamp).unwrap().ports().map(|p| p.id).collect();
    assert_eq!(ids_before, ids_after);
}

#[test]
fn changing_method_follows_parameter_count() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Rebind");
    let node = graph.spawn_node(call("Mathf", "Abs"), [0.0, 0.0], &env).unwrap();
    assert_eq!(port_counts(&graph, node), (1, 1, 1));

    graph.set_function_call_method(node, MethodRef::new("Mathf", "Clamp"), &env).unwrap();
    assert_eq!(port_counts(&graph, node), (3, 1, 3));

    graph.set_function_call_method(node, MethodRef::new("Mathf", "Max"), &env).unwrap();
    assert_eq!(port_counts(&graph, node), (2, 1, 2));

    graph.set_function_call_method(node, MethodRef::new("Debug", "Log"), &env).unwrap();
    assert_eq!(port_counts(&graph, node), (1, 0, 1));
}

#[test]
fn edited_constants_survive_redefinition() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Constants");
    let node = graph.spawn_node(call("Mathf", "Abs"), [0.0, 0.0], &env).unwrap();
    graph.set_embedded_constant(node, "value", ConstantValue::Float(-3.5)).unwrap();

    graph.set_function_call_method(node, MethodRef::new("Mathf", "Clamp"), &env).unwrap();
    let node = graph.node(node).unwrap();
    let value = node.input("value").unwrap();
    assert_eq!(node.embedded_constants.get(&value.id), Some(&ConstantValue::Float(-3.5)));
}

#[test]
fn vanished_ports_drop_their_edges() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Vanish");
    let max = graph.spawn_node(NodeKind::Constant(ConstantValue::Float(1.0)), [0.0, 0.0], &env).unwrap();
    let target = graph.spawn_node(call("Mathf", "Clamp"), [0.0, 0.0], &env).unwrap();
    graph.connect_by_name(max, "Value", target, "max").unwrap();
    assert_eq!(graph.edge_count(), 1);

    graph.set_function_call_method(target, MethodRef::new("Mathf", "Abs"), &env).unwrap();
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn unknown_method_is_rejected() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Unknown");
    let result = graph.spawn_node(call("Mathf", "Teleport"), [0.0, 0.0], &env);
    assert!(result.is_err());
    assert_eq!(graph.node_count(), 0);
}

#[test]
fn variable_nodes_take_the_variable_type() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Variables");
    let speed = graph.add_variable(VariableDeclaration::field("speed", TypeHandle::float()).exposed());
    let get = graph.spawn_node(NodeKind::GetVariable(speed), [0.0, 0.0], &env).unwrap();
    assert_eq!(graph.node(get).unwrap().output("Value").unwrap().data_type, TypeHandle::float());

    graph.remove_variable(speed);
    assert!(graph.node(get).is_none());
}

#[test]
fn return_ports_follow_the_function() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Return");
    let function = graph
        .spawn_node(
            NodeKind::Function(FunctionDecl::method("ComputeSpeed", TypeHandle::float())),
            [0.0, 0.0],
            &env,
        )
        .unwrap();
    let ret = graph.add_node_to_stack(function, None, NodeKind::Return, &env).unwrap();
    assert_eq!(port_counts(&graph, ret), (1, 0, 1));

    let update = graph
        .spawn_node(NodeKind::Function(FunctionDecl::event(EventKind::Update)), [0.0, 0.0], &env)
        .unwrap();
    let ret = graph.add_node_to_stack(update, None, NodeKind::Return, &env).unwrap();
    assert_eq!(port_counts(&graph, ret), (0, 0, 0));
}

#[test]
fn generic_call_is_inferred_from_its_input() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Generics");
    let values = graph.add_variable(VariableDeclaration::field("values", TypeHandle::new("List<float>")));
    let get = graph.spawn_node(NodeKind::GetVariable(values), [0.0, 0.0], &env).unwrap();
    let first = graph.spawn_node(call("Enumerable", "First"), [0.0, 0.0], &env).unwrap();
    let abs = graph.spawn_node(call("Mathf", "Abs"), [0.0, 0.0], &env).unwrap();
    graph.connect_by_name(get, "Value", first, "source").unwrap();
    graph.connect_by_name(first, "Result", abs, "value").unwrap();
    assert_eq!(graph.node(first).unwrap().output("Result").unwrap().data_type, TypeHandle::new("T"));

    let bindings = infer_node_generics(&mut graph, first, &env).unwrap();
    assert_eq!(bindings.get("T").map(ToString::to_string), Some("float".to_string()));

    let node = graph.node(first).unwrap();
    assert_eq!(node.output("Result").unwrap().data_type, TypeHandle::float());
    assert_eq!(node.input("source").unwrap().data_type, TypeHandle::new("IEnumerable<float>"));
    // Port ids survive, so the edges do too
    assert_eq!(graph.edge_count(), 2);
    match &node.kind {
        NodeKind::FunctionCall(decl) => assert_eq!(decl.type_arguments.get("T"), Some(&TypeHandle::float())),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn generic_instance_method_binds_from_instance() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Instance");
    let names = graph.add_variable(VariableDeclaration::field("names", TypeHandle::new("List<string>")));
    let get = graph.spawn_node(NodeKind::GetVariable(names), [0.0, 0.0], &env).unwrap();
    let add = graph.spawn_node(call("List", "Add"), [0.0, 0.0], &env).unwrap();
    assert_eq!(graph.node(add).unwrap().inputs[0].kind, PortKind::Instance);
    graph.connect_by_name(get, "Value", add, "Instance").unwrap();

    let failures = infer_all_generics(&mut graph, &env);
    assert!(failures.is_empty());
    assert_eq!(
        graph.node(add).unwrap().input("item").unwrap().data_type,
        TypeHandle::string()
    );
}

#[test]
fn conflicting_inputs_keep_the_first_binding() {
    let mut db = TypeDatabase::standard();
    db.register_method(
        MethodSignature::new_static("Mathf", "Either")
            .generic("T")
            .param("a", "T")
            .param("b", "T")
            .returns("T"),
    );
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Conflict");
    let int = graph.spawn_node(NodeKind::Constant(ConstantValue::Int(1)), [0.0, 0.0], &env).unwrap();
    let text = graph
        .spawn_node(NodeKind::Constant(ConstantValue::String("x".into())), [0.0, 0.0], &env)
        .unwrap();
    let either = graph.spawn_node(call("Mathf", "Either"), [0.0, 0.0], &env).unwrap();
    graph.connect_by_name(int, "Value", either, "a").unwrap();
    graph.connect_by_name(text, "Value", either, "b").unwrap();

    let result = infer_node_generics(&mut graph, either, &env);
    assert!(matches!(result, Err(InferenceError::Conflict { .. })));
    assert_eq!(
        graph.node(either).unwrap().output("Result").unwrap().data_type,
        TypeHandle::int()
    );
}

struct Spawner;

impl CustomNodeDefinition for Spawner {
    fn type_id(&self) -> &str {
        "spawn_prefab"
    }

    fn define_ports(
        &self,
        config: &IndexMap<String, String>,
        _oracle: &dyn TypeOracle,
    ) -> Result<Vec<PortSpec>, DefinitionError> {
        let mut ports = vec![PortSpec::data_input("Position", TypeHandle::new("Vector3"))];
        if config.get("named").is_some_and(|v| v == "true") {
            ports.push(PortSpec::data_input("Name", TypeHandle::string()));
        }
        ports.push(PortSpec::data_output("Spawned", TypeHandle::new("GameObject")));
        Ok(ports)
    }
}

#[test]
fn extension_kinds_define_through_the_registry() {
    let db = TypeDatabase::standard();
    let mut extensions = NodeExtensions::new();
    extensions.register(Arc::new(Spawner));
    let env = DefinitionEnv::new(&db).with_extensions(&extensions);

    let mut graph = Graph::new("Extensions");
    let function = graph
        .spawn_node(NodeKind::Function(FunctionDecl::event(EventKind::Start)), [0.0, 0.0], &env)
        .unwrap();
    let kind = NodeKind::Custom {
        type_id: "spawn_prefab".into(),
        config: IndexMap::from([("named".to_string(), "true".to_string())]),
    };
    let node = graph.add_node_to_stack(function, None, kind, &env).unwrap();
    assert_eq!(port_counts(&graph, node), (2, 1, 2));

    let without_registry = DefinitionEnv::new(&db);
    assert!(graph.define_node(node, &without_registry).is_err());
}
