// SPDX-License-Identifier: MIT OR Apache-2.0
//! Syntax tree of generated scripts.
//!
//! The tree mirrors the subset of C# the translator emits. Statements keep
//! the node they were generated from so printed lines map back to the graph.

use ordoplay_script_graph::NodeId;
use std::fmt;

/// One generated source file
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Imported namespaces
    pub usings: Vec<String>,
    /// Enclosing namespace
    pub namespace: Option<String>,
    /// The generated class
    pub class: ClassDecl,
}

/// The class generated for a graph
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Base class
    pub base: Option<String>,
    /// Fields from graph variables
    pub fields: Vec<FieldDecl>,
    /// Free members added by node extensions
    pub members: Vec<MemberDecl>,
    /// Methods in emission order
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// `public`
    Public,
    /// `private`
    Private,
}

impl Visibility {
    /// Source keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// A field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Visibility
    pub visibility: Visibility,
    /// Field type
    pub ty: String,
    /// Field name
    pub name: String,
    /// Initial value
    pub initializer: Option<Expr>,
}

/// Verbatim member text contributed by an extension
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDecl {
    /// Source lines, unindented
    pub lines: Vec<String>,
    /// Node that asked for the member
    pub origin: Option<NodeId>,
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter type
    pub ty: String,
    /// Parameter name
    pub name: String,
}

/// A method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    /// Visibility
    pub visibility: Visibility,
    /// Return type
    pub return_type: String,
    /// Method name
    pub name: String,
    /// Parameters in order
    pub parameters: Vec<Parameter>,
    /// Statements
    pub body: Vec<Stmt>,
    /// Function node the method was built from
    pub origin: Option<NodeId>,
}

impl MethodDecl {
    /// Whether two declarations can share one body
    pub fn same_signature(&self, other: &MethodDecl) -> bool {
        self.return_type == other.return_type && self.parameters == other.parameters
    }
}

/// A statement with the node it was generated from
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// What the statement does
    pub kind: StmtKind,
    /// Originating node
    pub origin: Option<NodeId>,
}

impl Stmt {
    /// Statement generated from `origin`
    pub fn new(kind: StmtKind, origin: Option<NodeId>) -> Self {
        Self { kind, origin }
    }

    /// Expression statement
    pub fn expr(expr: Expr, origin: Option<NodeId>) -> Self {
        Self::new(StmtKind::Expr(expr), origin)
    }
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its effect
    Expr(Expr),
    /// Local variable; `ty` of `None` prints as `var`
    LocalDecl {
        /// Declared type
        ty: Option<String>,
        /// Local name
        name: String,
        /// Initial value
        value: Option<Expr>,
    },
    /// Assignment
    Assign {
        /// Assigned place
        target: Expr,
        /// Assigned value
        value: Expr,
    },
    /// Two-way branch
    If {
        /// Condition
        condition: Expr,
        /// Statements when true
        then_branch: Vec<Stmt>,
        /// Statements when false
        else_branch: Vec<Stmt>,
    },
    /// Multi-way branch
    Switch {
        /// Switched value
        value: Expr,
        /// Case labels with their statements
        cases: Vec<(i64, Vec<Stmt>)>,
        /// Default statements
        default: Vec<Stmt>,
    },
    /// Conditional loop
    While {
        /// Condition
        condition: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// Collection loop
    ForEach {
        /// Item local name
        item: String,
        /// Iterated collection
        collection: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// Return from the method
    Return(Option<Expr>),
    /// Line comment
    Comment(String),
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal source text such as `2.5f`
    Literal(String),
    /// Name of a local, field, parameter or type
    Identifier(String),
    /// `this`
    This,
    /// Member access
    Member {
        /// Accessed object
        target: Box<Expr>,
        /// Member name
        name: String,
    },
    /// Method call
    Call {
        /// Receiver or declaring type; `None` calls a method of the class
        target: Option<Box<Expr>>,
        /// Method name
        method: String,
        /// Explicit type arguments
        type_args: Vec<String>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator token
        op: &'static str,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Unary operation
    Unary {
        /// Operator token
        op: &'static str,
        /// Operand
        operand: Box<Expr>,
    },
    /// `default(T)`
    Default(String),
}

impl Expr {
    /// Identifier expression
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Call of `method` on `target`
    pub fn call(target: Option<Expr>, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            target: target.map(Box::new),
            method: method.into(),
            type_args: Vec::new(),
            args,
        }
    }

    /// String literal with escapes
    pub fn string(value: &str) -> Self {
        let mut text = String::with_capacity(value.len() + 2);
        text.push('"');
        for c in value.chars() {
            match c {
                '"' => text.push_str("\\\""),
                '\\' => text.push_str("\\\\"),
                '\n' => text.push_str("\\n"),
                '\r' => text.push_str("\\r"),
                '\t' => text.push_str("\\t"),
                c => text.push(c),
            }
        }
        text.push('"');
        Self::Literal(text)
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary { .. } => write!(f, "({self})"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) | Self::Identifier(text) => f.write_str(text),
            Self::This => f.write_str("this"),
            Self::Member { target, name } => {
                target.fmt_operand(f)?;
                write!(f, ".{name}")
            }
            Self::Call {
                target,
                method,
                type_args,
                args,
            } => {
                if let Some(target) = target {
                    target.fmt_operand(f)?;
                    f.write_str(".")?;
                }
                f.write_str(method)?;
                if !type_args.is_empty() {
                    write!(f, "<{}>", type_args.join(", "))?;
                }
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Binary { op, lhs, rhs } => {
                lhs.fmt_operand(f)?;
                write!(f, " {op} ")?;
                rhs.fmt_operand(f)
            }
            Self::Unary { op, operand } => {
                f.write_str(op)?;
                operand.fmt_operand(f)
            }
            Self::Default(ty) => write!(f, "default({ty})"),
        }
    }
}
