// SPDX-License-Identifier: MIT OR Apache-2.0
//! Translation options and the accumulators filled while translating.

use crate::compile::CompilerError;
use crate::syntax::{FieldDecl, MemberDecl, MethodDecl, Stmt, Visibility};
use indexmap::IndexMap;
use ordoplay_script_graph::NodeId;

/// Options for translating one graph
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    /// Namespace wrapping the generated class
    pub namespace: Option<String>,
    /// Class name; defaults to the graph name
    pub class_name: Option<String>,
    /// Base class; defaults to the graph's stencil
    pub base_class: Option<String>,
    /// Namespaces imported on top of the stencil's
    pub usings: Vec<String>,
    /// Method receiving event subscriptions
    pub registration_method: String,
    /// Emit trace hooks before every stacked node
    pub trace: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            class_name: None,
            base_class: None,
            usings: Vec::new(),
            registration_method: "Start".to_string(),
            trace: false,
        }
    }
}

/// Declarations accumulated while translating one graph.
///
/// Passed explicitly through the translator and to node extensions.
#[derive(Debug, Default)]
pub struct TranslationContext {
    /// Field declarations
    pub fields: Vec<FieldDecl>,
    /// Free members from extensions
    pub members: Vec<MemberDecl>,
    methods: IndexMap<String, MethodDecl>,
    registrations: IndexMap<String, Stmt>,
    errors: Vec<CompilerError>,
}

impl TranslationContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field unless one with the same name exists
    pub fn add_field(&mut self, field: FieldDecl) -> bool {
        if self.fields.iter().any(|f| f.name == field.name) {
            return false;
        }
        self.fields.push(field);
        true
    }

    /// Add a free member
    pub fn add_member(&mut self, member: MemberDecl) {
        self.members.push(member);
    }

    /// Add a method, merging it into an existing one with the same name.
    ///
    /// Merged bodies are concatenated in registration order. A method whose
    /// signature differs from the existing one is rejected.
    pub fn merge_method(&mut self, method: MethodDecl) -> Result<(), CompilerError> {
        match self.methods.get_mut(&method.name) {
            Some(existing) if existing.same_signature(&method) => {
                tracing::debug!(method = %method.name, "Merging entry point into existing method");
                existing.body.extend(method.body);
                Ok(())
            }
            Some(_) => Err(CompilerError::translation(
                method.origin,
                format!("Method `{}` is declared again with a different signature", method.name),
            )),
            None => {
                self.methods.insert(method.name.clone(), method);
                Ok(())
            }
        }
    }

    /// Get an accumulated method
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.get(name)
    }

    /// Accumulated methods in order
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods.values()
    }

    /// Queue an event subscription; one per key
    pub fn add_registration(&mut self, key: impl Into<String>, stmt: Stmt) {
        self.registrations.entry(key.into()).or_insert(stmt);
    }

    /// Prepend the queued subscriptions to `method_name`, creating it if missing
    pub fn flush_registrations(&mut self, method_name: &str) {
        if self.registrations.is_empty() {
            return;
        }
        let registrations: Vec<Stmt> = self.registrations.drain(..).map(|(_, stmt)| stmt).collect();
        let method = self.methods.entry(method_name.to_string()).or_insert_with(|| MethodDecl {
            visibility: Visibility::Private,
            return_type: "void".to_string(),
            name: method_name.to_string(),
            parameters: Vec::new(),
            body: Vec::new(),
            origin: None,
        });
        let body = std::mem::replace(&mut method.body, registrations);
        method.body.extend(body);
    }

    /// Record a translation error
    pub fn report(&mut self, error: CompilerError) {
        tracing::debug!(node = ?error.source_node, "{}", error.message);
        self.errors.push(error);
    }

    /// Record a translation error on a node
    pub fn report_at(&mut self, node: NodeId, message: impl Into<String>) {
        self.report(CompilerError::translation(Some(node), message));
    }

    /// Errors so far
    pub fn errors(&self) -> &[CompilerError] {
        &self.errors
    }

    /// Take the methods and errors out of the context
    pub(crate) fn into_parts(self) -> (Vec<FieldDecl>, Vec<MemberDecl>, Vec<MethodDecl>, Vec<CompilerError>) {
        (
            self.fields,
            self.members,
            self.methods.into_values().collect(),
            self.errors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Expr, Parameter};

    fn method(name: &str, return_type: &str, statement: &str) -> MethodDecl {
        MethodDecl {
            visibility: Visibility::Private,
            return_type: return_type.into(),
            name: name.into(),
            parameters: Vec::new(),
            body: vec![Stmt::expr(Expr::ident(statement), None)],
            origin: None,
        }
    }

    #[test]
    fn test_merge_concatenates_bodies() {
        let mut ctx = TranslationContext::new();
        ctx.merge_method(method("Update", "void", "a")).unwrap();
        ctx.merge_method(method("Update", "void", "b")).unwrap();
        let update = ctx.method("Update").unwrap();
        assert_eq!(update.body.len(), 2);
        assert_eq!(update.body[1], Stmt::expr(Expr::ident("b"), None));
    }

    #[test]
    fn test_merge_rejects_other_signature() {
        let mut ctx = TranslationContext::new();
        ctx.merge_method(method("Compute", "void", "a")).unwrap();
        let mut other = method("Compute", "void", "b");
        other.parameters.push(Parameter {
            ty: "int".into(),
            name: "x".into(),
        });
        assert!(ctx.merge_method(other).is_err());
        assert_eq!(ctx.method("Compute").unwrap().body.len(), 1);
    }

    #[test]
    fn test_registrations_synthesize_method() {
        let mut ctx = TranslationContext::new();
        ctx.add_registration("Jump", Stmt::expr(Expr::ident("subscribe"), None));
        ctx.add_registration("Jump", Stmt::expr(Expr::ident("again"), None));
        ctx.flush_registrations("Start");
        let start = ctx.method("Start").unwrap();
        assert_eq!(start.body, vec![Stmt::expr(Expr::ident("subscribe"), None)]);
    }

    #[test]
    fn test_registrations_go_first() {
        let mut ctx = TranslationContext::new();
        ctx.merge_method(method("Start", "void", "existing")).unwrap();
        ctx.add_registration("Jump", Stmt::expr(Expr::ident("subscribe"), None));
        ctx.flush_registrations("Start");
        let start = ctx.method("Start").unwrap();
        assert_eq!(start.body[0], Stmt::expr(Expr::ident("subscribe"), None));
        assert_eq!(start.body.len(), 2);
    }
}
