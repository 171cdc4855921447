// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph to syntax tree translation.
//!
//! Every function node becomes a method. Its root stack and the stacks it
//! flows into are walked in execution order: stacked nodes become
//! statements, values are pulled from the data inputs. At an `If` or
//! `Switch` each branch is emitted up to the branches' join point and the
//! join is emitted once after the branching statement.

use crate::compile::CompilerError;
use crate::context::{TranslationContext, TranslationOptions};
use crate::extension::{ExtensionScope, TranslatorExtensions};
use crate::syntax::{ClassDecl, CompilationUnit, Expr, FieldDecl, MethodDecl, Parameter, Stmt, StmtKind, Visibility};
use crate::trace::{TraceRecorder, TRACE_HOOK_CLASS, TRACE_HOOK_METHOD};
use ordoplay_script_graph::{
    find_common_descendant, find_common_descendant_of_all, ConstantValue, EventKind, FunctionCallDecl, FunctionDecl,
    Graph, Node, NodeId, NodeKind, PortKind, TypeHandle, TypeOracle, TypeRef, VariableScope,
};
use std::collections::{HashMap, HashSet};

/// How far type lookups follow connections
const MAX_TYPE_DEPTH: usize = 64;

/// Literal source for a constant
pub fn literal(value: &ConstantValue) -> Expr {
    let text = match value {
        ConstantValue::Bool(b) => b.to_string(),
        ConstantValue::Int(i) => i.to_string(),
        ConstantValue::Float(f) if f.is_nan() => "float.NaN".to_string(),
        ConstantValue::Float(f) if f.is_infinite() => {
            if f.is_sign_positive() {
                "float.PositiveInfinity".to_string()
            } else {
                "float.NegativeInfinity".to_string()
            }
        }
        ConstantValue::Float(f) => format!("{f}f"),
        ConstantValue::Double(d) if d.is_nan() => "double.NaN".to_string(),
        ConstantValue::Double(d) if d.is_infinite() => {
            if d.is_sign_positive() {
                "double.PositiveInfinity".to_string()
            } else {
                "double.NegativeInfinity".to_string()
            }
        }
        ConstantValue::Double(d) => {
            let text = d.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{text}.0")
            }
        }
        ConstantValue::String(s) => return Expr::string(s),
        ConstantValue::Enum { type_name, value } => format!("{type_name}.{value}"),
        ConstantValue::Null => "null".to_string(),
        ConstantValue::Default(handle) => return Expr::Default(handle.identifier().to_string()),
    };
    Expr::Literal(text)
}

/// Turn a display name into a valid identifier
pub fn sanitize_identifier(name: &str) -> String {
    let mut identifier: String = name.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
    if identifier.is_empty() || identifier.starts_with(|c: char| c.is_ascii_digit()) {
        identifier.insert(0, '_');
    }
    identifier
}

fn error(node: NodeId, message: impl Into<String>) -> CompilerError {
    CompilerError::translation(Some(node), message)
}

/// Per-function translation state
#[derive(Default)]
struct FunctionState {
    /// Locals holding the values of node outputs
    bound: HashMap<(NodeId, String), String>,
    /// Outputs bound inside a block that has since closed
    out_of_scope: HashSet<(NodeId, String)>,
    /// Names taken in the current method
    names: HashSet<String>,
    /// Stacks on the chain being emitted
    path: Vec<NodeId>,
    /// Nodes whose value is being built
    evaluating: HashSet<NodeId>,
}

/// Translates one graph into a compilation unit
pub(crate) struct Translator<'a> {
    graph: &'a Graph,
    oracle: &'a dyn TypeOracle,
    options: &'a TranslationOptions,
    extensions: Option<&'a TranslatorExtensions>,
    trace: Option<&'a mut TraceRecorder>,
    ctx: TranslationContext,
    function: FunctionState,
}

impl<'a> Translator<'a> {
    pub(crate) fn new(graph: &'a Graph, oracle: &'a dyn TypeOracle, options: &'a TranslationOptions) -> Self {
        Self {
            graph,
            oracle,
            options,
            extensions: None,
            trace: None,
            ctx: TranslationContext::new(),
            function: FunctionState::default(),
        }
    }

    pub(crate) fn with_extensions(mut self, extensions: Option<&'a TranslatorExtensions>) -> Self {
        self.extensions = extensions;
        self
    }

    pub(crate) fn with_trace(mut self, trace: Option<&'a mut TraceRecorder>) -> Self {
        self.trace = trace;
        self
    }

    pub(crate) fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub(crate) fn oracle(&self) -> &'a dyn TypeOracle {
        self.oracle
    }

    pub(crate) fn context(&mut self) -> &mut TranslationContext {
        &mut self.ctx
    }

    /// Build the unit and collect every translation error
    pub(crate) fn translate(mut self) -> (CompilationUnit, Vec<CompilerError>) {
        let graph = self.graph;
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.begin_graph(&graph.name);
        }

        self.fields();
        for (id, decl) in graph.functions() {
            self.function(id, decl);
        }
        self.ctx.flush_registrations(&self.options.registration_method);

        let mut usings = graph.stencil.usings.clone();
        for using in &self.options.usings {
            if !usings.contains(using) {
                usings.push(using.clone());
            }
        }
        let base = self
            .options
            .base_class
            .clone()
            .or_else(|| (!graph.stencil.base_class.is_empty()).then(|| graph.stencil.base_class.clone()));
        let name = self
            .options
            .class_name
            .clone()
            .unwrap_or_else(|| sanitize_identifier(&graph.name));

        let (fields, members, methods, errors) = self.ctx.into_parts();
        let unit = CompilationUnit {
            usings,
            namespace: self.options.namespace.clone(),
            class: ClassDecl {
                name,
                base,
                fields,
                members,
                methods,
            },
        };
        (unit, errors)
    }

    fn type_name(&self, handle: &TypeHandle) -> Option<String> {
        self.oracle.resolve(handle).map(|ty| ty.to_string())
    }

    fn fields(&mut self) {
        let graph = self.graph;
        for variable in graph.variables().filter(|v| v.scope == VariableScope::Field) {
            let Some(ty) = self.type_name(&variable.data_type) else {
                self.ctx.report(CompilerError::translation(
                    None,
                    format!("Unknown type `{}` of variable `{}`", variable.data_type, variable.name),
                ));
                continue;
            };
            let visibility = if variable.exposed {
                Visibility::Public
            } else {
                Visibility::Private
            };
            self.ctx.add_field(FieldDecl {
                visibility,
                ty,
                name: sanitize_identifier(&variable.name),
                initializer: variable.initial_value.as_ref().map(literal),
            });
        }
    }

    // ------------------------------------------------------------------
    // Functions and stacks
    // ------------------------------------------------------------------

    fn function(&mut self, id: NodeId, decl: &FunctionDecl) {
        let graph = self.graph;
        self.function = FunctionState::default();

        let mut parameters = Vec::new();
        let mut body = Vec::new();
        for variable in graph.variables() {
            let is_parameter = match variable.scope {
                VariableScope::Parameter(function) if function == id => true,
                VariableScope::Local(function) if function == id => false,
                _ => continue,
            };
            let Some(resolved) = self.oracle.resolve(&variable.data_type) else {
                self.ctx.report_at(
                    id,
                    format!("Unknown type `{}` of variable `{}`", variable.data_type, variable.name),
                );
                continue;
            };
            let name = sanitize_identifier(&variable.name);
            self.function.names.insert(name.clone());
            if is_parameter {
                parameters.push(Parameter {
                    ty: resolved.to_string(),
                    name,
                });
            } else {
                let value = match &variable.initial_value {
                    Some(value) => literal(value),
                    None => literal(&self.oracle.default_value(&resolved)),
                };
                body.push(Stmt::new(
                    StmtKind::LocalDecl {
                        ty: Some(resolved.to_string()),
                        name,
                        value: Some(value),
                    },
                    Some(id),
                ));
            }
        }

        body.extend(self.chain(id, None));

        let return_type = if decl.event.is_some() {
            "void".to_string()
        } else {
            self.type_name(&decl.return_type).unwrap_or_else(|| {
                self.ctx
                    .report_at(id, format!("Unknown return type `{}`", decl.return_type));
                "void".to_string()
            })
        };
        let method_name = sanitize_identifier(&decl.method_name());
        let method = MethodDecl {
            visibility: if decl.event.is_some() {
                Visibility::Private
            } else {
                Visibility::Public
            },
            return_type,
            name: method_name.clone(),
            parameters,
            body,
            origin: Some(id),
        };
        if let Err(err) = self.ctx.merge_method(method) {
            self.ctx.report(err);
            return;
        }

        if let Some(EventKind::Custom(event)) = &decl.event {
            let subscribe = Expr::call(
                Some(Expr::ident("EventBus")),
                "Subscribe",
                vec![Expr::string(event), Expr::ident(method_name.clone())],
            );
            self.ctx.add_registration(method_name, Stmt::expr(subscribe, Some(id)));
        }
    }

    /// Statements of `start` and the stacks it flows into, up to `stop`
    fn chain(&mut self, start: NodeId, stop: Option<NodeId>) -> Vec<Stmt> {
        let mut out = Vec::new();
        let depth = self.function.path.len();
        let mut current = Some(start);
        while let Some(stack) = current {
            if Some(stack) == stop {
                break;
            }
            if self.function.path.contains(&stack) {
                self.ctx
                    .report_at(stack, "Execution flows back into this stack; use a loop node instead");
                break;
            }
            self.function.path.push(stack);
            current = self.stack(stack, &mut out);
        }
        self.function.path.truncate(depth);
        out
    }

    /// Emit one stack, returning where execution continues
    fn stack(&mut self, stack: NodeId, out: &mut Vec<Stmt>) -> Option<NodeId> {
        let graph = self.graph;
        let node = graph.node(stack)?;
        if !node.kind.is_stack() {
            self.ctx.report_at(stack, format!("`{}` is not a stack", node.title));
            return None;
        }

        for (position, &child) in node.children.iter().enumerate() {
            let Some(child_node) = graph.node(child) else {
                continue;
            };
            self.trace_hook(child, out);

            let next = match &child_node.kind {
                NodeKind::If => {
                    let (stmt, join) = self.if_statement(child_node);
                    out.push(stmt);
                    join
                }
                NodeKind::Switch { cases } => {
                    let (stmt, join) = self.switch_statement(child_node, cases);
                    out.push(stmt);
                    join
                }
                NodeKind::Return => {
                    out.push(self.return_statement(child_node));
                    None
                }
                _ => {
                    out.extend(self.statement(child_node));
                    continue;
                }
            };
            if position + 1 < node.children.len() {
                tracing::warn!(stack = ?stack, skipped = node.children.len() - position - 1, "Nodes after a terminal never run");
            }
            return next;
        }
        graph.exec_target(stack, "Out")
    }

    fn trace_hook(&mut self, node: NodeId, out: &mut Vec<Stmt>) {
        let graph = self.graph;
        let Some(trace) = self.trace.as_deref_mut() else {
            return;
        };
        let index = trace.register(&graph.name, node);
        let hook = Expr::call(
            Some(Expr::ident(TRACE_HOOK_CLASS)),
            TRACE_HOOK_METHOD,
            vec![Expr::string(&graph.name), Expr::Literal(index.to_string())],
        );
        out.push(Stmt::expr(hook, Some(node)));
    }

    fn if_statement(&mut self, node: &Node) -> (Stmt, Option<NodeId>) {
        let graph = self.graph;
        let condition = self.input_or_report(node.id, "Condition", "bool");
        let then_target = graph.exec_target(node.id, "Then");
        let else_target = graph.exec_target(node.id, "Else");
        // An unconnected branch leaves the function, so nothing is shared
        let join = match (then_target, else_target) {
            (Some(a), Some(b)) => find_common_descendant(graph, a, b),
            _ => None,
        };

        let then_branch = self.branch(then_target, join);
        let else_branch = self.branch(else_target, join);
        let stmt = Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            Some(node.id),
        );
        (stmt, join)
    }

    fn switch_statement(&mut self, node: &Node, cases: &[i64]) -> (Stmt, Option<NodeId>) {
        let graph = self.graph;
        let value = self.input_or_report(node.id, "Value", "int");
        let case_targets: Vec<Option<NodeId>> = cases
            .iter()
            .map(|case| graph.exec_target(node.id, &format!("Case {case}")))
            .collect();
        let default_target = graph.exec_target(node.id, "Default");

        let mut targets: Vec<NodeId> = case_targets.iter().flatten().copied().collect();
        let join = match default_target {
            Some(default) if targets.len() == cases.len() => {
                targets.push(default);
                find_common_descendant_of_all(graph, &targets)
            }
            _ => None,
        };

        let cases = cases
            .iter()
            .zip(case_targets)
            .map(|(case, target)| (*case, self.branch(target, join)))
            .collect();
        let default = self.branch(default_target, join);
        let stmt = Stmt::new(StmtKind::Switch { value, cases, default }, Some(node.id));
        (stmt, join)
    }

    /// Statements of a nested block; locals bound inside stay inside
    fn branch(&mut self, target: Option<NodeId>, join: Option<NodeId>) -> Vec<Stmt> {
        let Some(target) = target else {
            return Vec::new();
        };
        let outer = self.function.bound.clone();
        let body = self.chain(target, join);
        let inner = std::mem::replace(&mut self.function.bound, outer);
        for key in inner.into_keys() {
            if !self.function.bound.contains_key(&key) {
                self.function.out_of_scope.insert(key);
            }
        }
        body
    }

    fn return_statement(&mut self, node: &Node) -> Stmt {
        let value = node
            .input("Value")
            .map(|port| self.input_or_report(node.id, "Value", port.data_type.identifier()));
        Stmt::new(StmtKind::Return(value), Some(node.id))
    }

    /// Statements for a non-terminal stacked node
    fn statement(&mut self, node: &Node) -> Vec<Stmt> {
        let graph = self.graph;
        let origin = Some(node.id);
        match &node.kind {
            NodeKind::SetVariable(variable) => {
                let Some(declaration) = graph.variable(*variable) else {
                    self.ctx.report_at(node.id, "Assigned variable no longer exists");
                    return Vec::new();
                };
                let fallback = self
                    .type_name(&declaration.data_type)
                    .unwrap_or_else(|| "object".to_string());
                let value = self.input_or_report(node.id, "Value", &fallback);
                vec![Stmt::new(
                    StmtKind::Assign {
                        target: Expr::ident(sanitize_identifier(&declaration.name)),
                        value,
                    },
                    origin,
                )]
            }
            NodeKind::FunctionCall(call) => match self.call_expression(node, call) {
                Ok(expr) => {
                    let consumed = node
                        .output("Result")
                        .is_some_and(|port| graph.edges_from(port.id).next().is_some());
                    if consumed {
                        let name = self.bind_output(node.id, "Result", &call.method.name);
                        vec![Stmt::new(
                            StmtKind::LocalDecl {
                                ty: None,
                                name,
                                value: Some(expr),
                            },
                            origin,
                        )]
                    } else {
                        vec![Stmt::expr(expr, origin)]
                    }
                }
                Err(err) => {
                    self.ctx.report(err);
                    Vec::new()
                }
            },
            NodeKind::While => {
                let condition = self.input_or_report(node.id, "Condition", "bool");
                let body = self.branch(graph.exec_target(node.id, "Body"), None);
                vec![Stmt::new(StmtKind::While { condition, body }, origin)]
            }
            NodeKind::ForEach => {
                let collection = self.input_or_report(node.id, "Collection", "object[]");
                let item = self.bind_output(node.id, "Item", "item");
                let body = self.branch(graph.exec_target(node.id, "Body"), None);
                // The item is only in scope inside the loop
                self.function.bound.remove(&(node.id, "Item".to_string()));
                vec![Stmt::new(StmtKind::ForEach { item, collection, body }, origin)]
            }
            NodeKind::Custom { type_id, .. } => {
                let extensions = self.extensions;
                let Some(translator) = extensions.and_then(|e| e.get(type_id)) else {
                    self.ctx
                        .report_at(node.id, format!("No translator registered for node type `{type_id}`"));
                    return Vec::new();
                };
                let mut scope = ExtensionScope {
                    translator: self,
                    node: node.id,
                };
                match translator.translate_statement(node, &mut scope) {
                    Ok(statements) => statements,
                    Err(err) => {
                        self.ctx.report(err);
                        Vec::new()
                    }
                }
            }
            other => {
                self.ctx
                    .report_at(node.id, format!("`{}` nodes cannot be placed in a stack", other.type_id()));
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Bind an output to a fresh local named after `base`
    pub(crate) fn bind_output(&mut self, node: NodeId, output: &str, base: &str) -> String {
        let name = self.fresh_local(base);
        self.function.bound.insert((node, output.to_string()), name.clone());
        name
    }

    fn fresh_local(&mut self, base: &str) -> String {
        let mut base = sanitize_identifier(base);
        if let Some(first) = base.chars().next() {
            let lowered: String = first.to_lowercase().collect();
            base.replace_range(..first.len_utf8(), &lowered);
        }
        let mut counter = 0;
        loop {
            let candidate = format!("{base}{counter}");
            let taken = self.function.names.contains(&candidate) || self.ctx.fields.iter().any(|f| f.name == candidate);
            if !taken {
                self.function.names.insert(candidate.clone());
                return candidate;
            }
            counter += 1;
        }
    }

    fn input_or_report(&mut self, node: NodeId, input: &str, fallback_type: &str) -> Expr {
        match self.input_expression(node, input) {
            Ok(expr) => expr,
            Err(err) => {
                self.ctx.report(err);
                Expr::Default(fallback_type.to_string())
            }
        }
    }

    /// Expression for the value arriving at a named input
    pub(crate) fn input_expression(&mut self, node_id: NodeId, input: &str) -> Result<Expr, CompilerError> {
        let graph = self.graph;
        let node = graph.node(node_id).ok_or_else(|| error(node_id, "Node no longer exists"))?;
        let port = node
            .input(input)
            .ok_or_else(|| error(node_id, format!("`{}` has no input `{input}`", node.title)))?;

        if let Some((source, source_port)) = graph.input_source(node_id, input) {
            return self.output_expression(source.id, &source_port.name);
        }
        if port.kind == PortKind::Instance {
            let this = self.oracle.resolve(&TypeHandle::this_type());
            if this.is_some() && self.oracle.resolve(&port.data_type) == this {
                return Ok(Expr::This);
            }
            return Err(error(node_id, format!("Input `{input}` of `{}` needs an instance", node.title)));
        }
        node.embedded_constants
            .get(&port.id)
            .map(literal)
            .ok_or_else(|| error(node_id, format!("Input `{input}` of `{}` has no value", node.title)))
    }

    fn output_expression(&mut self, node_id: NodeId, output: &str) -> Result<Expr, CompilerError> {
        let key = (node_id, output.to_string());
        if let Some(name) = self.function.bound.get(&key) {
            return Ok(Expr::ident(name.clone()));
        }
        let graph = self.graph;
        let node = graph.node(node_id).ok_or_else(|| error(node_id, "Node no longer exists"))?;
        if self.function.out_of_scope.contains(&key) {
            return Err(error(
                node_id,
                format!("Value of `{}` is produced in another branch", node.title),
            ));
        }
        if !self.function.evaluating.insert(node_id) {
            return Err(error(node_id, "Data flows back into this node"));
        }
        let result = self.value_of(node, output);
        self.function.evaluating.remove(&node_id);
        result
    }

    fn value_of(&mut self, node: &Node, output: &str) -> Result<Expr, CompilerError> {
        let graph = self.graph;
        match &node.kind {
            NodeKind::Constant(value) => Ok(literal(value)),
            NodeKind::GetVariable(variable) => graph
                .variable(*variable)
                .map(|v| Expr::ident(sanitize_identifier(&v.name)))
                .ok_or_else(|| error(node.id, "Read variable no longer exists")),
            NodeKind::This => Ok(Expr::This),
            NodeKind::BinaryOperator(op) => {
                let lhs = self.input_expression(node.id, "A")?;
                let rhs = self.input_expression(node.id, "B")?;
                if let (Some(a), Some(b)) = (self.input_type(node.id, "A", 0), self.input_type(node.id, "B", 0)) {
                    if self.oracle.binary_operators(*op, &a, &b).is_empty() {
                        return Err(error(
                            node.id,
                            format!("Operator `{}` cannot be applied to `{a}` and `{b}`", op.token()),
                        ));
                    }
                }
                Ok(Expr::Binary {
                    op: op.token(),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            NodeKind::UnaryOperator(op) => {
                let operand = self.input_expression(node.id, "Value")?;
                if let Some(ty) = self.input_type(node.id, "Value", 0) {
                    if self.oracle.unary_operators(*op, &ty).is_empty() {
                        return Err(error(
                            node.id,
                            format!("Operator `{}` cannot be applied to `{ty}`", op.token()),
                        ));
                    }
                }
                Ok(Expr::Unary {
                    op: op.token(),
                    operand: Box::new(operand),
                })
            }
            NodeKind::FunctionCall(call) => {
                if node.is_stacked() {
                    return Err(error(
                        node.id,
                        format!("Result of `{}` is used before the call runs", call.method),
                    ));
                }
                self.call_expression(node, call)
            }
            NodeKind::ForEach => Err(error(node.id, "Loop item is used outside its loop")),
            NodeKind::Custom { type_id, .. } => {
                let extensions = self.extensions;
                let translator = extensions
                    .and_then(|e| e.get(type_id))
                    .ok_or_else(|| error(node.id, format!("No translator registered for node type `{type_id}`")))?;
                let mut scope = ExtensionScope {
                    translator: self,
                    node: node.id,
                };
                translator.translate_expression(node, output, &mut scope)
            }
            _ => Err(error(node.id, format!("`{}` has no value output `{output}`", node.title))),
        }
    }

    fn call_expression(&mut self, node: &Node, call: &FunctionCallDecl) -> Result<Expr, CompilerError> {
        let signature = self
            .oracle
            .method(&call.method)
            .ok_or_else(|| error(node.id, format!("Unknown method `{}`", call.method)))?;

        let mut type_args = Vec::with_capacity(signature.generic_parameters.len());
        for variable in &signature.generic_parameters {
            let ty = call
                .type_arguments
                .get(variable)
                .and_then(|handle| self.oracle.resolve(handle))
                .ok_or_else(|| {
                    error(
                        node.id,
                        format!("Cannot infer type argument `{variable}` of `{}`", call.method),
                    )
                })?;
            type_args.push(ty.to_string());
        }

        let target = if signature.is_static {
            Expr::ident(signature.declaring_type.name())
        } else {
            self.input_expression(node.id, "Instance")?
        };
        let args = signature
            .parameters
            .iter()
            .map(|parameter| self.input_expression(node.id, &parameter.name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expr::Call {
            target: Some(Box::new(target)),
            method: signature.name.clone(),
            type_args,
            args,
        })
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Type of the value arriving at a named input
    fn input_type(&self, node_id: NodeId, input: &str, depth: usize) -> Option<TypeRef> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        let graph = self.graph;
        let node = graph.node(node_id)?;
        let port = node.input(input)?;
        match graph.input_source(node_id, input) {
            Some((source, source_port)) => self.output_type(source, &source_port.name, depth + 1),
            None => node
                .embedded_constants
                .get(&port.id)
                .and_then(|value| self.oracle.resolve(&value.type_handle())),
        }
    }

    fn output_type(&self, node: &Node, output: &str, depth: usize) -> Option<TypeRef> {
        let port = node.output(output)?;
        if !port.data_type.is_unknown() {
            return self.oracle.resolve(&port.data_type);
        }
        match &node.kind {
            NodeKind::BinaryOperator(op) => {
                let a = self.input_type(node.id, "A", depth)?;
                let b = self.input_type(node.id, "B", depth)?;
                self.oracle
                    .binary_operators(*op, &a, &b)
                    .into_iter()
                    .next()
                    .map(|signature| signature.result)
            }
            NodeKind::UnaryOperator(op) => {
                let operand = self.input_type(node.id, "Value", depth)?;
                self.oracle
                    .unary_operators(*op, &operand)
                    .into_iter()
                    .next()
                    .map(|signature| signature.result)
            }
            NodeKind::ForEach => self
                .input_type(node.id, "Collection", depth)
                .and_then(|collection| collection.args().first().cloned()),
            _ => None,
        }
    }
}
