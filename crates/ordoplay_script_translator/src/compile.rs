// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compilation of graphs: translation, printing and the compiler backend.
//!
//! Translation errors and backend diagnostics both end up as
//! [`CompilerError`] values pointing at the node they came from.

use crate::context::TranslationOptions;
use crate::extension::TranslatorExtensions;
use crate::printer::{print_unit, PrintedSource};
use crate::syntax::CompilationUnit;
use crate::trace::TraceRecorder;
use crate::translator::Translator;
use ordoplay_script_graph::{
    infer_all_generics, DefinitionEnv, Graph, NodeExtensions, NodeId, TypeOracle,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Where an error was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// While building the syntax tree
    Translation,
    /// Reported by the compiler backend
    Compilation,
}

/// An error attached to the node it came from
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CompilerError {
    /// Description
    pub message: String,
    /// Node the error belongs to
    pub source_node: Option<NodeId>,
    /// Stage that found the error
    pub kind: ErrorKind,
    /// 1-based source line, for backend diagnostics
    pub line: Option<usize>,
}

impl CompilerError {
    /// Error found during translation
    pub fn translation(source_node: Option<NodeId>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source_node,
            kind: ErrorKind::Translation,
            line: None,
        }
    }

    /// Error reported by the backend
    pub fn compilation(message: impl Into<String>, line: Option<usize>, source_node: Option<NodeId>) -> Self {
        Self {
            message: message.into(),
            source_node,
            kind: ErrorKind::Compilation,
            line,
        }
    }
}

/// A backend diagnostic before it is mapped to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Description
    pub message: String,
    /// 1-based line in the submitted source
    pub line: Option<usize>,
}

impl Diagnostic {
    /// Diagnostic on a line
    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Compiles printed source and reports errors by line
pub trait CompilerBackend {
    /// Compile `source`, returning its errors
    fn compile(&self, unit_name: &str, source: &str) -> Vec<Diagnostic>;
}

/// Backend that accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

impl CompilerBackend for NoopBackend {
    fn compile(&self, _unit_name: &str, _source: &str) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// Backend running an external compiler with the source on stdin.
///
/// Error lines are expected in the `File.cs(line,column): error ...` form.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCompiler {
    /// Run `program` with `args`
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn run(&self, source: &str) -> std::io::Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdin = child.stdin.take();
        // stdin is written while the output pipes are drained
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(source.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            match writer.join() {
                Ok(written) => written?,
                Err(_) => return Err(std::io::Error::other("stdin writer panicked")),
            }
            output
        })?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

impl CompilerBackend for ExternalCompiler {
    fn compile(&self, unit_name: &str, source: &str) -> Vec<Diagnostic> {
        match self.run(source) {
            Ok(output) => parse_diagnostics(&output),
            Err(err) => {
                tracing::error!(unit = unit_name, program = ?self.program, "Failed to run compiler: {err}");
                vec![Diagnostic {
                    message: format!("Failed to run compiler {}: {err}", self.program.display()),
                    line: None,
                }]
            }
        }
    }
}

/// Parse `File.cs(12,5): error CS1002: ; expected` style lines
///
/// Warnings and summary lines are ignored.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    output
        .lines()
        .filter(|line| line.contains("): error ") || line.contains("error CS"))
        .map(|line| {
            let location = line.find('(').and_then(|open| {
                let rest = &line[open + 1..];
                let close = rest.find(')')?;
                let number: String = rest[..close].chars().take_while(char::is_ascii_digit).collect();
                let line_number = number.parse::<usize>().ok()?;
                Some((line_number, &rest[close + 1..]))
            });
            match location {
                Some((line_number, rest)) => Diagnostic::at_line(rest.trim_start_matches(':').trim(), line_number),
                None => Diagnostic {
                    message: line.trim().to_string(),
                    line: None,
                },
            }
        })
        .collect()
}

/// Outcome of compiling one graph
#[derive(Debug, Clone)]
pub struct CompilationResult {
    /// Syntax tree
    pub unit: CompilationUnit,
    /// Printed source with its line map
    pub source: PrintedSource,
    /// Translation and compilation errors
    pub errors: Vec<CompilerError>,
}

impl CompilationResult {
    /// Whether no errors were found
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors attached to a node
    pub fn errors_for(&self, node: NodeId) -> impl Iterator<Item = &CompilerError> {
        self.errors.iter().filter(move |e| e.source_node == Some(node))
    }
}

/// Compiles graphs against an oracle and a backend
pub struct ScriptCompiler<'a> {
    oracle: &'a dyn TypeOracle,
    backend: &'a dyn CompilerBackend,
    node_extensions: Option<&'a NodeExtensions>,
    extensions: Option<&'a TranslatorExtensions>,
    trace: Option<&'a mut TraceRecorder>,
}

impl<'a> ScriptCompiler<'a> {
    /// Compiler with no extensions and no trace recorder
    pub fn new(oracle: &'a dyn TypeOracle, backend: &'a dyn CompilerBackend) -> Self {
        Self {
            oracle,
            backend,
            node_extensions: None,
            extensions: None,
            trace: None,
        }
    }

    /// Port definitions for extension node kinds
    pub fn with_node_extensions(mut self, extensions: &'a NodeExtensions) -> Self {
        self.node_extensions = Some(extensions);
        self
    }

    /// Translators for extension node kinds
    pub fn with_extensions(mut self, extensions: &'a TranslatorExtensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Recorder receiving trace indices when tracing is enabled
    pub fn with_trace(mut self, recorder: &'a mut TraceRecorder) -> Self {
        self.trace = Some(recorder);
        self
    }

    /// Definition environment matching this compiler
    pub fn definition_env(&self) -> DefinitionEnv<'a> {
        let env = DefinitionEnv::new(self.oracle);
        match self.node_extensions {
            Some(extensions) => env.with_extensions(extensions),
            None => env,
        }
    }

    /// Define pending nodes and infer generic calls before translation
    pub fn prepare(&self, graph: &mut Graph) -> Vec<CompilerError> {
        let env = self.definition_env();
        let mut errors: Vec<CompilerError> = graph
            .define_undefined(&env)
            .into_iter()
            .map(|(node, err)| CompilerError::translation(Some(node), err.to_string()))
            .collect();
        errors.extend(
            infer_all_generics(graph, &env)
                .into_iter()
                .map(|(node, err)| CompilerError::translation(Some(node), err.to_string())),
        );
        errors
    }

    /// Translate, print and compile a graph
    pub fn compile(&mut self, graph: &Graph, options: &TranslationOptions) -> CompilationResult {
        tracing::info!(graph = %graph.name, "Compiling graph");

        let trace = if options.trace {
            if self.trace.is_none() {
                tracing::warn!(graph = %graph.name, "Tracing requested without a trace recorder");
            }
            self.trace.as_deref_mut()
        } else {
            None
        };
        let (unit, mut errors) = Translator::new(graph, self.oracle, options)
            .with_extensions(self.extensions)
            .with_trace(trace)
            .translate();
        let source = print_unit(&unit);

        if errors.is_empty() {
            for diagnostic in self.backend.compile(&unit.class.name, &source.text) {
                let node = diagnostic.line.and_then(|line| source.origin_of_line(line));
                errors.push(CompilerError::compilation(diagnostic.message, diagnostic.line, node));
            }
        }

        if errors.is_empty() {
            tracing::info!(graph = %graph.name, lines = source.line_count(), "Compiled graph");
        } else {
            tracing::warn!(graph = %graph.name, errors = errors.len(), "Graph compiled with errors");
        }
        CompilationResult { unit, source, errors }
    }
}

/// Translate and compile a graph without extensions or tracing
pub fn translate_and_compile(
    graph: &Graph,
    oracle: &dyn TypeOracle,
    backend: &dyn CompilerBackend,
    options: &TranslationOptions,
) -> CompilationResult {
    ScriptCompiler::new(oracle, backend).compile(graph, options)
}
