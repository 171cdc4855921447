// SPDX-License-Identifier: MIT OR Apache-2.0
//! Source printer.
//!
//! Prints a [`CompilationUnit`] as C# text and records, for every printed
//! line, the graph node it came from.

use crate::syntax::{CompilationUnit, FieldDecl, MethodDecl, Stmt, StmtKind};
use ordoplay_script_graph::NodeId;

const INDENT: &str = "    ";

/// Printed source text with its line to node map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintedSource {
    /// Source text, newline terminated
    pub text: String,
    /// Originating node of each line, index 0 is line 1
    pub line_origins: Vec<Option<NodeId>>,
}

impl PrintedSource {
    /// Number of printed lines
    pub fn line_count(&self) -> usize {
        self.line_origins.len()
    }

    /// Node that produced a 1-based line.
    ///
    /// Lines without an origin (braces, blank lines) resolve to the nearest
    /// preceding line that has one.
    pub fn origin_of_line(&self, line: usize) -> Option<NodeId> {
        if line == 0 {
            return None;
        }
        let last = line.min(self.line_origins.len());
        self.line_origins[..last].iter().rev().find_map(|origin| *origin)
    }

    /// 1-based lines produced by a node
    pub fn lines_of(&self, node: NodeId) -> Vec<usize> {
        self.line_origins
            .iter()
            .enumerate()
            .filter(|(_, origin)| **origin == Some(node))
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// Print a compilation unit
pub fn print_unit(unit: &CompilationUnit) -> PrintedSource {
    let mut printer = Printer::default();
    printer.unit(unit);
    printer.finish()
}

#[derive(Default)]
struct Printer {
    lines: Vec<String>,
    origins: Vec<Option<NodeId>>,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: impl AsRef<str>, origin: Option<NodeId>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{text}", INDENT.repeat(self.depth)));
        }
        self.origins.push(origin);
    }

    fn open(&mut self, origin: Option<NodeId>) {
        self.line("{", origin);
        self.depth += 1;
    }

    fn close(&mut self, origin: Option<NodeId>) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}", origin);
    }

    fn finish(self) -> PrintedSource {
        let mut text = self.lines.join("\n");
        text.push('\n');
        PrintedSource {
            text,
            line_origins: self.origins,
        }
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        for using in &unit.usings {
            self.line(format!("using {using};"), None);
        }
        if !unit.usings.is_empty() {
            self.line("", None);
        }

        if let Some(namespace) = &unit.namespace {
            self.line(format!("namespace {namespace}"), None);
            self.open(None);
        }

        let class = &unit.class;
        match &class.base {
            Some(base) => self.line(format!("public class {} : {base}", class.name), None),
            None => self.line(format!("public class {}", class.name), None),
        }
        self.open(None);

        let mut first = true;
        let mut separate = |printer: &mut Printer| {
            if !first {
                printer.line("", None);
            }
            first = false;
        };

        if !class.fields.is_empty() {
            separate(self);
            for field in &class.fields {
                self.field(field);
            }
        }
        for member in &class.members {
            separate(self);
            for line in &member.lines {
                self.line(line, member.origin);
            }
        }
        for method in &class.methods {
            separate(self);
            self.method(method);
        }

        self.close(None);
        if unit.namespace.is_some() {
            self.close(None);
        }
    }

    fn field(&mut self, field: &FieldDecl) {
        let keyword = field.visibility.keyword();
        match &field.initializer {
            Some(value) => self.line(format!("{keyword} {} {} = {value};", field.ty, field.name), None),
            None => self.line(format!("{keyword} {} {};", field.ty, field.name), None),
        }
    }

    fn method(&mut self, method: &MethodDecl) {
        let parameters: Vec<String> = method.parameters.iter().map(|p| format!("{} {}", p.ty, p.name)).collect();
        self.line(
            format!(
                "{} {} {}({})",
                method.visibility.keyword(),
                method.return_type,
                method.name,
                parameters.join(", ")
            ),
            method.origin,
        );
        self.open(method.origin);
        self.block(&method.body);
        self.close(method.origin);
    }

    fn block(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.stmt(stmt);
        }
    }

    fn braced(&mut self, statements: &[Stmt], origin: Option<NodeId>) {
        self.open(origin);
        self.block(statements);
        self.close(origin);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        let origin = stmt.origin;
        match &stmt.kind {
            StmtKind::Expr(expr) => self.line(format!("{expr};"), origin),
            StmtKind::LocalDecl { ty, name, value } => {
                let ty = ty.as_deref().unwrap_or("var");
                match value {
                    Some(value) => self.line(format!("{ty} {name} = {value};"), origin),
                    None => self.line(format!("{ty} {name};"), origin),
                }
            }
            StmtKind::Assign { target, value } => self.line(format!("{target} = {value};"), origin),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line(format!("if ({condition})"), origin);
                self.braced(then_branch, origin);
                if !else_branch.is_empty() {
                    self.line("else", origin);
                    self.braced(else_branch, origin);
                }
            }
            StmtKind::Switch { value, cases, default } => {
                self.line(format!("switch ({value})"), origin);
                self.open(origin);
                for (label, body) in cases {
                    self.line(format!("case {label}:"), origin);
                    self.case_body(body, origin);
                }
                self.line("default:", origin);
                self.case_body(default, origin);
                self.close(origin);
            }
            StmtKind::While { condition, body } => {
                self.line(format!("while ({condition})"), origin);
                self.braced(body, origin);
            }
            StmtKind::ForEach { item, collection, body } => {
                self.line(format!("foreach (var {item} in {collection})"), origin);
                self.braced(body, origin);
            }
            StmtKind::Return(value) => match value {
                Some(value) => self.line(format!("return {value};"), origin),
                None => self.line("return;", origin),
            },
            StmtKind::Comment(text) => self.line(format!("// {text}"), origin),
        }
    }

    fn case_body(&mut self, body: &[Stmt], origin: Option<NodeId>) {
        self.depth += 1;
        self.block(body);
        let returns = matches!(body.last().map(|s| &s.kind), Some(StmtKind::Return(_)));
        if !returns {
            self.line("break;", origin);
        }
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{ClassDecl, Expr, FieldDecl, Visibility};

    fn unit(body: Vec<Stmt>) -> CompilationUnit {
        CompilationUnit {
            usings: vec!["System".into()],
            namespace: Some("Game".into()),
            class: ClassDecl {
                name: "Player".into(),
                base: Some("ScriptBehaviour".into()),
                fields: vec![FieldDecl {
                    visibility: Visibility::Public,
                    ty: "float".into(),
                    name: "speed".into(),
                    initializer: Some(Expr::Literal("2.5f".into())),
                }],
                members: Vec::new(),
                methods: vec![MethodDecl {
                    visibility: Visibility::Private,
                    return_type: "void".into(),
                    name: "Update".into(),
                    parameters: Vec::new(),
                    body,
                    origin: None,
                }],
            },
        }
    }

    #[test]
    fn test_layout() {
        let node = NodeId::new();
        let printed = print_unit(&unit(vec![Stmt::expr(
            Expr::call(Some(Expr::ident("Debug")), "Log", vec![Expr::string("hi")]),
            Some(node),
        )]));
        let expected = "\
using System;

namespace Game
{
    public class Player : ScriptBehaviour
    {
        public float speed = 2.5f;

        private void Update()
        {
            Debug.Log(\"hi\");
        }
    }
}
";
        assert_eq!(printed.text, expected);
        assert_eq!(printed.lines_of(node), vec![11]);
    }

    #[test]
    fn test_origin_falls_back_to_previous_line() {
        let node = NodeId::new();
        let printed = print_unit(&unit(vec![Stmt::new(
            StmtKind::If {
                condition: Expr::Literal("true".into()),
                then_branch: Vec::new(),
                else_branch: Vec::new(),
            },
            Some(node),
        )]));
        let last = printed.line_count();
        assert_eq!(printed.origin_of_line(11), Some(node));
        assert_eq!(printed.origin_of_line(10), None);
        // Closing class and namespace braces have no origin of their own
        assert_eq!(printed.origin_of_line(last), Some(node));
        assert_eq!(printed.origin_of_line(1), None);
        assert_eq!(printed.origin_of_line(0), None);
    }

    #[test]
    fn test_switch_cases_break() {
        let printed = print_unit(&unit(vec![Stmt::new(
            StmtKind::Switch {
                value: Expr::ident("mode"),
                cases: vec![(1, Vec::new()), (2, vec![Stmt::new(StmtKind::Return(None), None)])],
                default: Vec::new(),
            },
            None,
        )]));
        assert_eq!(printed.text.matches("break;").count(), 2);
        assert!(printed.text.contains("case 2:\n                    return;\n"));
    }
}
