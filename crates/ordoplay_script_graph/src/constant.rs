// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant values: constant nodes and embedded port defaults.

use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};

/// A literal value stored in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// String
    String(String),
    /// Enum member
    Enum {
        /// Enum type name
        type_name: String,
        /// Member name
        value: String,
    },
    /// Null reference
    Null,
    /// `default(T)` of the given type
    Default(TypeHandle),
}

impl ConstantValue {
    /// Type of this value
    pub fn type_handle(&self) -> TypeHandle {
        match self {
            Self::Bool(_) => TypeHandle::bool(),
            Self::Int(_) => TypeHandle::int(),
            Self::Float(_) => TypeHandle::float(),
            Self::Double(_) => TypeHandle::new("double"),
            Self::String(_) => TypeHandle::string(),
            Self::Enum { type_name, .. } => TypeHandle::new(type_name.clone()),
            Self::Null => TypeHandle::object(),
            Self::Default(handle) => handle.clone(),
        }
    }
}
