// SPDX-License-Identifier: MIT OR Apache-2.0
//! Script translator for `OrdoPlay` Editor.
//!
//! Turns visual script graphs into C# source:
//! - A syntax tree mirroring the generated class ([`syntax`])
//! - The graph walk emitting statements per stack ([`translator`])
//! - A printer recording which node produced every line ([`printer`])
//! - Compiler backends with errors mapped back to nodes ([`compile`])
//! - Trace hooks for live execution highlighting ([`trace`])
//! - Batch builds over an asset store ([`batch`])

pub mod batch;
pub mod compile;
pub mod context;
pub mod extension;
pub mod printer;
pub mod syntax;
pub mod trace;
pub mod translator;

pub use batch::{build_all, BatchReport, CompiledGraph, FailedGraph};
pub use compile::{
    parse_diagnostics, translate_and_compile, CompilationResult, CompilerBackend, CompilerError, Diagnostic,
    ErrorKind, ExternalCompiler, NoopBackend, ScriptCompiler,
};
pub use context::{TranslationContext, TranslationOptions};
pub use extension::{ExtensionScope, NodeTranslator, TranslatorExtensions};
pub use printer::{print_unit, PrintedSource};
pub use syntax::{ClassDecl, CompilationUnit, Expr, FieldDecl, MemberDecl, MethodDecl, Parameter, Stmt, StmtKind, Visibility};
pub use trace::{TraceHit, TraceRecorder, TRACE_HOOK_CLASS, TRACE_HOOK_METHOD};
pub use translator::{literal, sanitize_identifier};
