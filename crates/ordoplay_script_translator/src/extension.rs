// SPDX-License-Identifier: MIT OR Apache-2.0
//! Translation of extension node kinds.
//!
//! Extension kinds define their ports through
//! [`NodeExtensions`](ordoplay_script_graph::NodeExtensions) and their code
//! through a [`NodeTranslator`] registered here under the same type id.

use crate::compile::CompilerError;
use crate::context::TranslationContext;
use crate::syntax::{Expr, FieldDecl, MemberDecl, Stmt};
use crate::translator::Translator;
use indexmap::IndexMap;
use ordoplay_script_graph::{Graph, Node, NodeId, TypeOracle};
use std::sync::Arc;

/// Emits code for one extension node kind
pub trait NodeTranslator: Send + Sync {
    /// Type id handled by this translator
    fn type_id(&self) -> &str;

    /// Statements for a node placed in a stack
    fn translate_statement(&self, node: &Node, scope: &mut ExtensionScope<'_, '_>) -> Result<Vec<Stmt>, CompilerError> {
        let _ = scope;
        Err(CompilerError::translation(
            Some(node.id),
            format!("`{}` nodes cannot be placed in a stack", self.type_id()),
        ))
    }

    /// Expression for a value output of a node outside stacks
    fn translate_expression(
        &self,
        node: &Node,
        output: &str,
        scope: &mut ExtensionScope<'_, '_>,
    ) -> Result<Expr, CompilerError> {
        let _ = scope;
        Err(CompilerError::translation(
            Some(node.id),
            format!("`{}` has no value output `{output}`", self.type_id()),
        ))
    }
}

/// Registry of extension translators keyed by type id
#[derive(Default, Clone)]
pub struct TranslatorExtensions {
    translators: IndexMap<String, Arc<dyn NodeTranslator>>,
}

impl TranslatorExtensions {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a translator, returning the one it replaces
    pub fn register(&mut self, translator: Arc<dyn NodeTranslator>) -> Option<Arc<dyn NodeTranslator>> {
        self.translators.insert(translator.type_id().to_string(), translator)
    }

    /// Translator for a type id
    pub fn get(&self, type_id: &str) -> Option<&Arc<dyn NodeTranslator>> {
        self.translators.get(type_id)
    }
}

impl std::fmt::Debug for TranslatorExtensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorExtensions")
            .field("type_ids", &self.translators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What an extension translator may see and change while emitting a node
pub struct ExtensionScope<'s, 'a> {
    pub(crate) translator: &'s mut Translator<'a>,
    pub(crate) node: NodeId,
}

impl ExtensionScope<'_, '_> {
    /// Node being translated
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Graph being translated
    pub fn graph(&self) -> &Graph {
        self.translator.graph()
    }

    /// Type oracle
    pub fn oracle(&self) -> &dyn TypeOracle {
        self.translator.oracle()
    }

    /// Expression feeding a named input of the node
    pub fn input_expression(&mut self, port: &str) -> Result<Expr, CompilerError> {
        self.translator.input_expression(self.node, port)
    }

    /// Bind a data output to a fresh local and return the local's name
    pub fn bind_output(&mut self, port: &str, prefix: &str) -> String {
        self.translator.bind_output(self.node, port, prefix)
    }

    /// Add a free member to the generated class
    pub fn add_member(&mut self, lines: Vec<String>) {
        let origin = Some(self.node);
        self.context().add_member(MemberDecl { lines, origin });
    }

    /// Add a field unless one with the same name exists
    pub fn add_field(&mut self, field: FieldDecl) -> bool {
        self.context().add_field(field)
    }

    /// Accumulators of the graph being translated
    pub fn context(&mut self) -> &mut TranslationContext {
        self.translator.context()
    }
}
