// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end translation of small graphs.

use ordoplay_script_graph::{
    infer_all_generics, AssetStore, BinaryOperatorKind, ConstantValue, CustomNodeDefinition, DefinitionEnv,
    DefinitionError, EventKind, FunctionCallDecl, FunctionDecl, Graph, MemoryAssetStore, MethodRef, Node,
    NodeExtensions, NodeId, NodeKind, PortSpec, TypeDatabase, TypeHandle, TypeOracle, VariableDeclaration,
};
use ordoplay_script_translator::{
    build_all, translate_and_compile, CompilationResult, CompilerBackend, CompilerError, Diagnostic, ErrorKind,
    Expr, ExtensionScope, FieldDecl, NodeTranslator, NoopBackend, ScriptCompiler, Stmt, StmtKind, TraceRecorder,
    TranslationOptions, TranslatorExtensions, Visibility,
};
use std::sync::Arc;

fn function(graph: &mut Graph, env: &DefinitionEnv<'_>, decl: FunctionDecl) -> NodeId {
    graph.spawn_node(NodeKind::Function(decl), [0.0, 0.0], env).unwrap()
}

fn event(graph: &mut Graph, env: &DefinitionEnv<'_>, event: EventKind) -> NodeId {
    function(graph, env, FunctionDecl::event(event))
}

fn stack(graph: &mut Graph, env: &DefinitionEnv<'_>) -> NodeId {
    graph.spawn_node(NodeKind::Stack, [0.0, 0.0], env).unwrap()
}

fn call_kind(declaring_type: &str, method: &str) -> NodeKind {
    NodeKind::FunctionCall(FunctionCallDecl::new(MethodRef::new(declaring_type, method)))
}

/// Append `Debug.Log("<message>")` to a stack
fn log(graph: &mut Graph, env: &DefinitionEnv<'_>, stack: NodeId, message: &str) -> NodeId {
    let node = graph
        .add_node_to_stack(stack, None, call_kind("Debug", "Log"), env)
        .unwrap();
    graph
        .set_embedded_constant(node, "message", ConstantValue::String(message.into()))
        .unwrap();
    node
}

fn compile(graph: &Graph, db: &TypeDatabase) -> CompilationResult {
    translate_and_compile(graph, db, &NoopBackend, &TranslationOptions::default())
}

fn statement_text(stmt: &Stmt) -> String {
    match &stmt.kind {
        StmtKind::Expr(expr) => format!("{expr};"),
        other => format!("{other:?}"),
    }
}

fn messages(result: &CompilationResult) -> Vec<&str> {
    result.errors.iter().map(|e| e.message.as_str()).collect()
}

#[test]
fn if_else_emits_join_once() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let branch = graph.add_node_to_stack(update, None, NodeKind::If, &env).unwrap();
    let [then, otherwise, after] = [(); 3].map(|_| stack(&mut graph, &env));
    graph.connect_by_name(branch, "Then", then, "In").unwrap();
    graph.connect_by_name(branch, "Else", otherwise, "In").unwrap();
    graph.connect_by_name(then, "Out", after, "In").unwrap();
    graph.connect_by_name(otherwise, "Out", after, "In").unwrap();
    log(&mut graph, &env, then, "then");
    log(&mut graph, &env, otherwise, "else");
    log(&mut graph, &env, after, "after");

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));

    let expected = "\
    private void Update()
    {
        if (false)
        {
            Debug.Log(\"then\");
        }
        else
        {
            Debug.Log(\"else\");
        }
        Debug.Log(\"after\");
    }
";
    assert!(result.source.text.contains(expected), "{}", result.source.text);
    assert_eq!(result.source.text.matches("Debug.Log(\"after\")").count(), 1);
}

#[test]
fn unconnected_branch_has_no_join() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let branch = graph.add_node_to_stack(update, None, NodeKind::If, &env).unwrap();
    let then = stack(&mut graph, &env);
    graph.connect_by_name(branch, "Then", then, "In").unwrap();
    log(&mut graph, &env, then, "then");

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    assert!(!result.source.text.contains("else"));
    assert_eq!(result.source.text.matches("Debug.Log").count(), 1);
}

#[test]
fn switch_emits_join_once() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let switch = graph
        .add_node_to_stack(update, None, NodeKind::Switch { cases: vec![1, 2] }, &env)
        .unwrap();
    let [one, two, fallback, after] = [(); 4].map(|_| stack(&mut graph, &env));
    graph.connect_by_name(switch, "Case 1", one, "In").unwrap();
    graph.connect_by_name(switch, "Case 2", two, "In").unwrap();
    graph.connect_by_name(switch, "Default", fallback, "In").unwrap();
    for branch in [one, two, fallback] {
        graph.connect_by_name(branch, "Out", after, "In").unwrap();
    }
    log(&mut graph, &env, one, "one");
    log(&mut graph, &env, two, "two");
    log(&mut graph, &env, fallback, "other");
    log(&mut graph, &env, after, "after");

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    let text = &result.source.text;
    assert!(text.contains("switch (0)"));
    assert!(text.contains("case 1:"));
    assert!(text.contains("default:"));
    assert_eq!(text.matches("break;").count(), 3);
    assert_eq!(text.matches("Debug.Log(\"after\")").count(), 1);
    assert!(text.find("default:").unwrap() < text.find("Debug.Log(\"after\")").unwrap());
}

#[test]
fn entry_points_with_one_name_merge() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let first = event(&mut graph, &env, EventKind::Update);
    let second = event(&mut graph, &env, EventKind::Update);
    log(&mut graph, &env, first, "first");
    log(&mut graph, &env, second, "second");

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    assert_eq!(result.unit.class.methods.len(), 1);
    let text = &result.source.text;
    assert_eq!(text.matches("void Update()").count(), 1);
    assert!(text.find("\"first\"").unwrap() < text.find("\"second\"").unwrap());
}

#[test]
fn removing_a_node_keeps_merge_order() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let scratch = stack(&mut graph, &env);
    let first = event(&mut graph, &env, EventKind::Update);
    let second = event(&mut graph, &env, EventKind::Update);
    log(&mut graph, &env, first, "first");
    log(&mut graph, &env, second, "second");

    let before = compile(&graph, &db).source.text;
    graph.remove_node(scratch).unwrap();
    let after = compile(&graph, &db).source.text;
    assert_eq!(before, after);
    assert!(after.find("\"first\"").unwrap() < after.find("\"second\"").unwrap());
}

#[test]
fn custom_events_subscribe_in_start() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let jump = event(&mut graph, &env, EventKind::Custom("Jump".into()));
    log(&mut graph, &env, jump, "jumped");

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    let start = result.unit.class.method("Start").unwrap();
    assert_eq!(start.body.len(), 1);
    assert_eq!(statement_text(&start.body[0]), "EventBus.Subscribe(\"Jump\", OnJump);");
    assert!(result.source.text.contains("private void OnJump()"));

    // An authored Start keeps its body after the subscription
    let start_node = event(&mut graph, &env, EventKind::Start);
    log(&mut graph, &env, start_node, "started");
    let result = compile(&graph, &db);
    let start = result.unit.class.method("Start").unwrap();
    assert_eq!(start.body.len(), 2);
    assert_eq!(statement_text(&start.body[0]), "EventBus.Subscribe(\"Jump\", OnJump);");
    assert_eq!(statement_text(&start.body[1]), "Debug.Log(\"started\");");
}

#[test]
fn invalid_operator_is_reported_on_its_node() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let flag = graph
        .spawn_node(NodeKind::Constant(ConstantValue::Bool(true)), [0.0, 0.0], &env)
        .unwrap();
    let add = graph
        .spawn_node(NodeKind::BinaryOperator(BinaryOperatorKind::Add), [0.0, 0.0], &env)
        .unwrap();
    graph.connect_by_name(flag, "Value", add, "A").unwrap();
    let print = log(&mut graph, &env, update, "unused");
    graph.connect_by_name(add, "Result", print, "message").unwrap();

    let result = compile(&graph, &db);
    assert_eq!(messages(&result), vec!["Operator `+` cannot be applied to `bool` and `int`"]);
    assert_eq!(result.errors[0].source_node, Some(add));
    assert_eq!(result.errors[0].kind, ErrorKind::Translation);
    assert_eq!(result.errors_for(add).count(), 1);
}

#[test]
fn generic_calls_need_inferred_arguments() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let values = graph.add_variable(VariableDeclaration::field("values", TypeHandle::new("List<float>")));
    let update = event(&mut graph, &env, EventKind::Update);
    let read = graph
        .spawn_node(NodeKind::GetVariable(values), [0.0, 0.0], &env)
        .unwrap();
    let first = graph
        .spawn_node(call_kind("Enumerable", "First"), [0.0, 0.0], &env)
        .unwrap();
    let abs = graph
        .add_node_to_stack(update, None, call_kind("Mathf", "Abs"), &env)
        .unwrap();
    graph.connect_by_name(read, "Value", first, "source").unwrap();
    graph.connect_by_name(first, "Result", abs, "value").unwrap();

    let result = compile(&graph, &db);
    assert_eq!(
        messages(&result),
        vec!["Cannot infer type argument `T` of `Enumerable.First`"]
    );
    assert_eq!(result.errors[0].source_node, Some(first));

    assert!(infer_all_generics(&mut graph, &env).is_empty());
    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    assert!(result.source.text.contains("private List<float> values;"));
    assert!(result.source.text.contains("Mathf.Abs(Enumerable.First<float>(values));"));
}

#[test]
fn consumed_results_bind_locals() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let speed = graph.add_variable(
        VariableDeclaration::field("speed", TypeHandle::float())
            .exposed()
            .with_initial_value(ConstantValue::Float(2.5)),
    );
    let update = event(&mut graph, &env, EventKind::Update);
    let abs = graph
        .add_node_to_stack(update, None, call_kind("Mathf", "Abs"), &env)
        .unwrap();
    let assign = graph
        .add_node_to_stack(update, None, NodeKind::SetVariable(speed), &env)
        .unwrap();
    graph.connect_by_name(abs, "Result", assign, "Value").unwrap();

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    let text = &result.source.text;
    assert!(text.contains("public float speed = 2.5f;"));
    assert!(text.contains("var abs0 = Mathf.Abs(0f);"));
    assert!(text.contains("speed = abs0;"));
}

#[test]
fn branch_locals_stay_in_their_branch() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let speed = graph.add_variable(VariableDeclaration::field("speed", TypeHandle::float()));
    let update = event(&mut graph, &env, EventKind::Update);
    let branch = graph.add_node_to_stack(update, None, NodeKind::If, &env).unwrap();
    let [then, otherwise, after] = [(); 3].map(|_| stack(&mut graph, &env));
    graph.connect_by_name(branch, "Then", then, "In").unwrap();
    graph.connect_by_name(branch, "Else", otherwise, "In").unwrap();
    graph.connect_by_name(then, "Out", after, "In").unwrap();
    graph.connect_by_name(otherwise, "Out", after, "In").unwrap();
    let abs = graph
        .add_node_to_stack(then, None, call_kind("Mathf", "Abs"), &env)
        .unwrap();
    let assign = graph
        .add_node_to_stack(after, None, NodeKind::SetVariable(speed), &env)
        .unwrap();
    graph.connect_by_name(abs, "Result", assign, "Value").unwrap();

    let result = compile(&graph, &db);
    assert!(!result.is_success());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source_node, Some(abs));
    assert!(result.errors[0].message.ends_with("is produced in another branch"));
    assert!(!result.source.text.contains("speed = abs0;"));

    // Consumed inside the same branch, the local is still in scope
    graph.remove_node(assign).unwrap();
    let assign = graph
        .add_node_to_stack(then, None, NodeKind::SetVariable(speed), &env)
        .unwrap();
    graph.connect_by_name(abs, "Result", assign, "Value").unwrap();
    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    assert!(result.source.text.contains("speed = abs0;"));
}

#[test]
fn plain_methods_take_parameters_and_return() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let double = function(&mut graph, &env, FunctionDecl::method("Double", TypeHandle::float()));
    let x = graph.add_variable(VariableDeclaration::parameter("x", TypeHandle::float(), double));
    let read = graph.spawn_node(NodeKind::GetVariable(x), [0.0, 0.0], &env).unwrap();
    let multiply = graph
        .spawn_node(NodeKind::BinaryOperator(BinaryOperatorKind::Multiply), [0.0, 0.0], &env)
        .unwrap();
    graph.set_embedded_constant(multiply, "B", ConstantValue::Float(2.0)).unwrap();
    graph.connect_by_name(read, "Value", multiply, "A").unwrap();
    let ret = graph.add_node_to_stack(double, None, NodeKind::Return, &env).unwrap();
    graph.connect_by_name(multiply, "Result", ret, "Value").unwrap();

    let result = compile(&graph, &db);
    assert!(result.is_success(), "{:?}", messages(&result));
    let text = &result.source.text;
    assert!(text.contains("public float Double(float x)"));
    assert!(text.contains("return x * 2f;"));
}

#[test]
fn execution_cycles_are_rejected() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let [a, b] = [(); 2].map(|_| stack(&mut graph, &env));
    graph.connect_by_name(update, "Out", a, "In").unwrap();
    graph.connect_by_name(a, "Out", b, "In").unwrap();
    graph.connect_by_name(b, "Out", a, "In").unwrap();
    log(&mut graph, &env, a, "loop");

    let result = compile(&graph, &db);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source_node, Some(a));
}

struct RejectLogs;

impl CompilerBackend for RejectLogs {
    fn compile(&self, _unit_name: &str, source: &str) -> Vec<Diagnostic> {
        source
            .lines()
            .position(|line| line.contains("Debug.Log"))
            .map(|index| Diagnostic::at_line("The name `Debug` does not exist", index + 1))
            .into_iter()
            .collect()
    }
}

#[test]
fn backend_errors_map_to_nodes() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let print = log(&mut graph, &env, update, "hello");

    let result = translate_and_compile(&graph, &db, &RejectLogs, &TranslationOptions::default());
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.kind, ErrorKind::Compilation);
    assert_eq!(error.source_node, Some(print));
    assert!(error.line.is_some());
}

#[test]
fn trace_hooks_resolve_to_nodes() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let print = log(&mut graph, &env, update, "hello");

    let mut recorder = TraceRecorder::new();
    let options = TranslationOptions {
        trace: true,
        ..TranslationOptions::default()
    };
    let result = {
        let mut compiler = ScriptCompiler::new(&db, &NoopBackend).with_trace(&mut recorder);
        compiler.compile(&graph, &options)
    };
    assert!(result.is_success(), "{:?}", messages(&result));
    let text = &result.source.text;
    assert!(text.contains("ScriptTrace.Record(\"Player\", 0);"));
    assert!(text.find("ScriptTrace.Record").unwrap() < text.find("Debug.Log").unwrap());

    assert_eq!(recorder.record_hit("Player", 0, 12), Some(print));
    assert_eq!(recorder.nodes_hit_in_frame("Player", 12), vec![print]);
}

#[test]
fn options_shape_the_class() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut graph = Graph::new("Enemy AI");
    let update = event(&mut graph, &env, EventKind::Update);
    log(&mut graph, &env, update, "tick");

    let result = compile(&graph, &db);
    assert!(result.source.text.contains("public class EnemyAI : ScriptBehaviour"));
    assert!(result.source.text.starts_with("using System;"));

    let options = TranslationOptions {
        namespace: Some("Game.Enemies".into()),
        class_name: Some("Brain".into()),
        usings: vec!["System".into(), "Game.Core".into()],
        ..TranslationOptions::default()
    };
    let result = translate_and_compile(&graph, &db, &NoopBackend, &options);
    let text = &result.source.text;
    assert!(text.contains("namespace Game.Enemies"));
    assert!(text.contains("    public class Brain : ScriptBehaviour"));
    assert_eq!(text.matches("using System;").count(), 1);
    assert!(text.contains("using Game.Core;"));
}

struct CountedLogDefinition;

impl CustomNodeDefinition for CountedLogDefinition {
    fn type_id(&self) -> &str {
        "counted_log"
    }

    fn define_ports(
        &self,
        _config: &indexmap::IndexMap<String, String>,
        _oracle: &dyn TypeOracle,
    ) -> Result<Vec<PortSpec>, DefinitionError> {
        Ok(vec![PortSpec::data_input("Message", TypeHandle::string())])
    }
}

struct CountedLogTranslator;

impl NodeTranslator for CountedLogTranslator {
    fn type_id(&self) -> &str {
        "counted_log"
    }

    fn translate_statement(&self, node: &Node, scope: &mut ExtensionScope<'_, '_>) -> Result<Vec<Stmt>, CompilerError> {
        scope.add_field(FieldDecl {
            visibility: Visibility::Private,
            ty: "int".into(),
            name: "logCount".into(),
            initializer: None,
        });
        let message = scope.input_expression("Message")?;
        let origin = Some(node.id);
        Ok(vec![
            Stmt::expr(Expr::call(Some(Expr::ident("Debug")), "Log", vec![message]), origin),
            Stmt::expr(Expr::ident("logCount++"), origin),
        ])
    }
}

#[test]
fn extension_nodes_translate_through_registry() {
    let db = TypeDatabase::standard();
    let mut node_extensions = NodeExtensions::new();
    node_extensions.register(Arc::new(CountedLogDefinition));
    let mut extensions = TranslatorExtensions::new();
    extensions.register(Arc::new(CountedLogTranslator));

    let env = DefinitionEnv::new(&db).with_extensions(&node_extensions);
    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    let kind = NodeKind::Custom {
        type_id: "counted_log".into(),
        config: Default::default(),
    };
    for message in ["a", "b"] {
        let node = graph.add_node_to_stack(update, None, kind.clone(), &env).unwrap();
        graph
            .set_embedded_constant(node, "Message", ConstantValue::String(message.into()))
            .unwrap();
    }

    let mut compiler = ScriptCompiler::new(&db, &NoopBackend)
        .with_node_extensions(&node_extensions)
        .with_extensions(&extensions);
    let result = compiler.compile(&graph, &TranslationOptions::default());
    assert!(result.is_success(), "{:?}", messages(&result));
    let text = &result.source.text;
    assert_eq!(text.matches("private int logCount;").count(), 1);
    assert!(text.contains("Debug.Log(\"a\");"));
    assert_eq!(text.matches("logCount++;").count(), 2);

    let result = compile(&graph, &db);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].message.contains("counted_log"));
}

#[test]
fn batch_build_continues_past_broken_assets() {
    let db = TypeDatabase::standard();
    let env = DefinitionEnv::new(&db);
    let mut store = MemoryAssetStore::new();

    let mut graph = Graph::new("Player");
    let update = event(&mut graph, &env, EventKind::Update);
    log(&mut graph, &env, update, "hello");
    store.save("player.ron", &graph).unwrap();
    store.insert_raw("broken.ron", "this is not a graph");

    let paths = store.list().unwrap();
    let mut compiler = ScriptCompiler::new(&db, &NoopBackend);
    let report = build_all(&store, &paths, &mut compiler, &TranslationOptions::default());

    assert!(!report.is_success());
    assert_eq!(report.compiled.len(), 1);
    assert_eq!(report.compiled[0].class_name, "Player");
    assert!(report.compiled[0].source.contains("Debug.Log(\"hello\");"));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "broken.ron");
}
