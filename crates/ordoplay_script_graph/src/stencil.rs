// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stencil: the policy a graph is authored against.

use crate::node::NodeKind;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Base class, imports and allowed node types of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
    /// Base class of the generated class
    pub base_class: String,
    /// Namespaces imported by generated code
    pub usings: Vec<String>,
    /// Allowed node type ids; `None` allows every kind
    pub allowed_node_types: Option<IndexSet<String>>,
}

impl Stencil {
    /// Stencil allowing every node kind
    pub fn new(base_class: impl Into<String>) -> Self {
        Self {
            base_class: base_class.into(),
            usings: Vec::new(),
            allowed_node_types: None,
        }
    }

    /// Add an imported namespace
    pub fn with_using(mut self, namespace: impl Into<String>) -> Self {
        self.usings.push(namespace.into());
        self
    }

    /// Restrict node kinds to the given type ids
    pub fn restrict_to<I, S>(mut self, type_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_node_types = Some(type_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a node of this kind may be added
    pub fn allows(&self, kind: &NodeKind) -> bool {
        self.allowed_node_types
            .as_ref()
            .map_or(true, |allowed| allowed.contains(kind.type_id()))
    }
}

impl Default for Stencil {
    fn default() -> Self {
        Self::new("ScriptBehaviour")
            .with_using("System")
            .with_using("System.Collections.Generic")
            .with_using("OrdoPlay.Runtime")
    }
}
