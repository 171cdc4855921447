// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type oracle: reflection queries the graph and translator rely on.
//!
//! The host engine answers these questions from its own reflection data.
//! [`TypeDatabase`] is an in-memory implementation that can be seeded from
//! code or loaded from RON, used by the command line tools and tests.

use crate::constant::ConstantValue;
use crate::types::{TypeHandle, TypeRef, ARRAY_TYPE};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators available to operator nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperatorKind {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOperatorKind {
    /// Source token
    pub fn token(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Arithmetic operators
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    /// Ordering comparisons
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual
        )
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::Modulo => "Modulo",
            Self::Equals => "Equals",
            Self::NotEquals => "Not Equals",
            Self::Less => "Less",
            Self::LessOrEqual => "Less Or Equal",
            Self::Greater => "Greater",
            Self::GreaterOrEqual => "Greater Or Equal",
            Self::And => "And",
            Self::Or => "Or",
        }
    }

    /// All operators
    pub fn all() -> &'static [BinaryOperatorKind] {
        &[
            Self::Add,
            Self::Subtract,
            Self::Multiply,
            Self::Divide,
            Self::Modulo,
            Self::Equals,
            Self::NotEquals,
            Self::Less,
            Self::LessOrEqual,
            Self::Greater,
            Self::GreaterOrEqual,
            Self::And,
            Self::Or,
        ]
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperatorKind {
    /// `-x`
    Negate,
    /// `!x`
    Not,
}

impl UnaryOperatorKind {
    /// Source token
    pub fn token(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
        }
    }
}

/// Which operator a signature belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Binary operator
    Binary(BinaryOperatorKind),
    /// Unary operator
    Unary(UnaryOperatorKind),
}

/// One operator overload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSignature {
    /// Operator
    pub kind: OperatorKind,
    /// Operand types
    pub operands: Vec<TypeRef>,
    /// Result type
    pub result: TypeRef,
}

/// Member query filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberFilter {
    /// Instance members only
    Instance,
    /// Static members only
    Static,
    /// Everything
    #[default]
    All,
}

impl MemberFilter {
    fn accepts(self, is_static: bool) -> bool {
        match self {
            Self::Instance => !is_static,
            Self::Static => is_static,
            Self::All => true,
        }
    }
}

/// Member category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    /// Field
    Field,
    /// Property
    Property,
    /// Method (type is the return type)
    Method,
}

/// A member of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member name
    pub name: String,
    /// Category
    pub kind: MemberKind,
    /// Value type, or return type for methods
    pub ty: TypeRef,
    /// Static member
    #[serde(default)]
    pub is_static: bool,
}

/// Serializable reference to a method, stored by function call nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    /// Declaring type name (without generic arguments)
    pub declaring_type: String,
    /// Method name
    pub name: String,
}

impl MethodRef {
    /// Create a method reference
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Declared type, possibly open
    pub ty: TypeRef,
}

/// Reflection data for one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Declaring type, with its own type variables for generic types
    pub declaring_type: TypeRef,
    /// Method name
    pub name: String,
    /// Static method
    #[serde(default)]
    pub is_static: bool,
    /// Method-level type variables
    #[serde(default)]
    pub generic_parameters: Vec<String>,
    /// Parameters
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    /// Return type
    pub return_type: TypeRef,
}

impl MethodSignature {
    /// Start a static method signature
    pub fn new_static(declaring_type: &str, name: &str) -> Self {
        Self {
            declaring_type: type_ref(declaring_type),
            name: name.to_string(),
            is_static: true,
            generic_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type: TypeRef::named("void"),
        }
    }

    /// Start an instance method signature
    pub fn new_instance(declaring_type: &str, name: &str) -> Self {
        Self {
            is_static: false,
            ..Self::new_static(declaring_type, name)
        }
    }

    /// Add a method-level type variable
    pub fn generic(mut self, name: &str) -> Self {
        self.generic_parameters.push(name.to_string());
        self
    }

    /// Add a parameter
    pub fn param(mut self, name: &str, ty: &str) -> Self {
        self.parameters.push(ParameterInfo {
            name: name.to_string(),
            ty: type_ref(ty),
        });
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: &str) -> Self {
        self.return_type = type_ref(ty);
        self
    }

    /// Reference to this method
    pub fn method_ref(&self) -> MethodRef {
        MethodRef::new(self.declaring_type.name(), self.name.clone())
    }

    /// Input slots in port order: the instance (for instance methods) then parameters
    pub fn input_types(&self) -> Vec<TypeRef> {
        let mut inputs = Vec::with_capacity(self.parameters.len() + 1);
        if !self.is_static {
            inputs.push(self.declaring_type.clone());
        }
        inputs.extend(self.parameters.iter().map(|p| p.ty.clone()));
        inputs
    }

    /// Every open type variable, type-level first
    pub fn type_variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = self.declaring_type.params().into_iter().map(str::to_string).collect();
        for param in &self.generic_parameters {
            if !vars.contains(param) {
                vars.push(param.clone());
            }
        }
        vars
    }

    /// Whether anything about this method must be inferred
    pub fn is_generic(&self) -> bool {
        !self.type_variables().is_empty()
    }

    fn bind_params(mut self, type_level: &[String]) -> Self {
        let mut all: Vec<String> = type_level.to_vec();
        all.extend(self.generic_parameters.iter().cloned());
        self.declaring_type = self.declaring_type.bind_params(type_level);
        for param in &mut self.parameters {
            param.ty = param.ty.clone().bind_params(&all);
        }
        self.return_type = self.return_type.bind_params(&all);
        self
    }
}

fn type_ref(s: &str) -> TypeRef {
    TypeRef::parse(s).unwrap_or_else(|_| TypeRef::named(s))
}

/// Reflection queries consumed by the graph model and the translator.
///
/// All queries are pure.
pub trait TypeOracle {
    /// Resolve a handle to a known type
    fn resolve(&self, handle: &TypeHandle) -> Option<TypeRef>;

    /// Whether the type takes part in numeric promotion
    fn is_numeric(&self, ty: &TypeRef) -> bool;

    /// Overloads of a binary operator for the operand types
    fn binary_operators(&self, kind: BinaryOperatorKind, lhs: &TypeRef, rhs: &TypeRef) -> Vec<OperatorSignature>;

    /// Overloads of a unary operator for the operand type
    fn unary_operators(&self, kind: UnaryOperatorKind, operand: &TypeRef) -> Vec<OperatorSignature>;

    /// Members of a type
    fn members(&self, ty: &TypeRef, filter: MemberFilter) -> Vec<Member>;

    /// Signature of a referenced method
    fn method(&self, method: &MethodRef) -> Option<MethodSignature>;

    /// Types `ty` converts to implicitly (base classes, interfaces)
    fn supertypes(&self, ty: &TypeRef) -> Vec<TypeRef>;

    /// Default literal for a type
    fn default_value(&self, ty: &TypeRef) -> ConstantValue;
}

/// Kind of a registered type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Built-in value type
    Primitive,
    /// User value type
    Struct,
    /// Reference type
    Class,
    /// Interface
    Interface,
    /// Enumeration
    Enum {
        /// Member names in declaration order
        values: Vec<String>,
    },
}

/// A registered type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Type name
    pub name: String,
    /// Category
    pub kind: TypeKind,
    /// Type variables of a generic type definition
    #[serde(default)]
    pub generic_parameters: Vec<String>,
    /// Promotion rank for numeric types (wider is higher)
    #[serde(default)]
    pub numeric_rank: Option<u8>,
    /// Fields and properties
    #[serde(default)]
    pub members: Vec<Member>,
    /// Implicit conversions (may mention the type variables)
    #[serde(default)]
    pub supertypes: Vec<TypeRef>,
}

impl TypeInfo {
    /// Create a type entry
    pub fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            generic_parameters: Vec::new(),
            numeric_rank: None,
            members: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    /// Numeric type with a promotion rank
    pub fn numeric(name: &str, rank: u8) -> Self {
        Self {
            numeric_rank: Some(rank),
            ..Self::new(name, TypeKind::Primitive)
        }
    }

    /// Declare type variables
    pub fn with_generics(mut self, params: &[&str]) -> Self {
        self.generic_parameters = params.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Add a field
    pub fn with_field(mut self, name: &str, ty: &str) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Field,
            ty: type_ref(ty).bind_params(&self.generic_parameters),
            is_static: false,
        });
        self
    }

    /// Add a property
    pub fn with_property(mut self, name: &str, ty: &str) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            kind: MemberKind::Property,
            ty: type_ref(ty).bind_params(&self.generic_parameters),
            is_static: false,
        });
        self
    }

    /// Add an implicit conversion target
    pub fn with_supertype(mut self, ty: &str) -> Self {
        self.supertypes.push(type_ref(ty).bind_params(&self.generic_parameters));
        self
    }

    fn bindings_for(&self, ty: &TypeRef) -> IndexMap<String, TypeRef> {
        self.generic_parameters
            .iter()
            .cloned()
            .zip(ty.args().iter().cloned())
            .collect()
    }
}

/// In-memory type oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDatabase {
    #[serde(default)]
    types: IndexMap<String, TypeInfo>,
    #[serde(default)]
    methods: Vec<MethodSignature>,
    #[serde(default)]
    operators: Vec<OperatorSignature>,
    #[serde(default = "default_this_type")]
    this_type: String,
}

fn default_this_type() -> String {
    "GameObject".to_string()
}

impl Default for TypeDatabase {
    fn default() -> Self {
        Self {
            types: IndexMap::new(),
            methods: Vec::new(),
            operators: Vec::new(),
            this_type: default_this_type(),
        }
    }
}

impl TypeDatabase {
    /// Empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Database with the primitive types only
    pub fn with_primitives() -> Self {
        let mut db = Self::new();
        db.register_type(TypeInfo::new("void", TypeKind::Primitive));
        db.register_type(TypeInfo::new("bool", TypeKind::Primitive));
        db.register_type(TypeInfo::numeric("int", 2));
        db.register_type(TypeInfo::numeric("long", 3));
        db.register_type(TypeInfo::numeric("float", 4));
        db.register_type(TypeInfo::numeric("double", 5));
        db.register_type(TypeInfo::new("string", TypeKind::Class));
        db.register_type(TypeInfo::new("object", TypeKind::Class));
        db
    }

    /// Primitives plus the engine types gameplay scripts use most
    pub fn standard() -> Self {
        let mut db = Self::with_primitives();

        db.register_type(
            TypeInfo::new("Vector3", TypeKind::Struct)
                .with_field("x", "float")
                .with_field("y", "float")
                .with_field("z", "float"),
        );
        db.register_type(TypeInfo::new("Transform", TypeKind::Class).with_property("position", "Vector3"));
        db.register_type(
            TypeInfo::new("GameObject", TypeKind::Class)
                .with_property("name", "string")
                .with_property("transform", "Transform"),
        );
        db.register_type(TypeInfo::new(
            "KeyCode",
            TypeKind::Enum {
                values: vec!["Space".into(), "Return".into(), "Escape".into()],
            },
        ));
        db.register_type(TypeInfo::new("IEnumerable", TypeKind::Interface).with_generics(&["T"]));
        db.register_type(
            TypeInfo::new("List", TypeKind::Class)
                .with_generics(&["T"])
                .with_property("Count", "int")
                .with_supertype("IEnumerable<T>"),
        );
        for name in ["Debug", "Mathf", "Enumerable", "Input", "EventBus"] {
            db.register_type(TypeInfo::new(name, TypeKind::Class));
        }

        db.register_operator(OperatorSignature {
            kind: OperatorKind::Binary(BinaryOperatorKind::Add),
            operands: vec![TypeRef::named("Vector3"), TypeRef::named("Vector3")],
            result: TypeRef::named("Vector3"),
        });
        db.register_operator(OperatorSignature {
            kind: OperatorKind::Binary(BinaryOperatorKind::Subtract),
            operands: vec![TypeRef::named("Vector3"), TypeRef::named("Vector3")],
            result: TypeRef::named("Vector3"),
        });
        db.register_operator(OperatorSignature {
            kind: OperatorKind::Binary(BinaryOperatorKind::Multiply),
            operands: vec![TypeRef::named("Vector3"), TypeRef::named("float")],
            result: TypeRef::named("Vector3"),
        });
        db.register_operator(OperatorSignature {
            kind: OperatorKind::Unary(UnaryOperatorKind::Negate),
            operands: vec![TypeRef::named("Vector3")],
            result: TypeRef::named("Vector3"),
        });

        db.register_method(MethodSignature::new_static("Debug", "Log").param("message", "object"));
        db.register_method(MethodSignature::new_static("Mathf", "Abs").param("value", "float").returns("float"));
        db.register_method(
            MethodSignature::new_static("Mathf", "Max")
                .param("a", "float")
                .param("b", "float")
                .returns("float"),
        );
        db.register_method(
            MethodSignature::new_static("Mathf", "Clamp")
                .param("value", "float")
                .param("min", "float")
                .param("max", "float")
                .returns("float"),
        );
        db.register_method(MethodSignature::new_static("Input", "GetKey").param("key", "KeyCode").returns("bool"));
        db.register_method(MethodSignature::new_instance("Transform", "Translate").param("translation", "Vector3"));
        db.register_method(MethodSignature::new_instance("List<T>", "Add").param("item", "T"));
        db.register_method(
            MethodSignature::new_instance("List<T>", "Contains")
                .param("item", "T")
                .returns("bool"),
        );
        db.register_method(
            MethodSignature::new_static("Enumerable", "First")
                .generic("T")
                .param("source", "IEnumerable<T>")
                .returns("T"),
        );
        db.register_method(
            MethodSignature::new_static("Enumerable", "Repeat")
                .generic("T")
                .param("element", "T")
                .param("count", "int")
                .returns("IEnumerable<T>"),
        );
        db
    }

    /// Load a database from RON, on top of the primitives
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        let loaded: TypeDatabase = ron::from_str(source)?;
        let mut db = Self::with_primitives();
        db.merge(loaded);
        Ok(db)
    }

    /// Merge another database into this one; later entries win
    pub fn merge(&mut self, other: TypeDatabase) {
        for (_, info) in other.types {
            self.register_type(info);
        }
        for method in other.methods {
            self.register_method(method);
        }
        for operator in other.operators {
            self.register_operator(operator);
        }
        self.this_type = other.this_type;
    }

    /// Set the type `this` resolves to
    pub fn set_this_type(&mut self, name: impl Into<String>) {
        self.this_type = name.into();
    }

    /// Register or replace a type, binding its type variables
    pub fn register_type(&mut self, mut info: TypeInfo) {
        let params = info.generic_parameters.clone();
        for member in &mut info.members {
            member.ty = member.ty.clone().bind_params(&params);
        }
        info.supertypes = info.supertypes.into_iter().map(|s| s.bind_params(&params)).collect();
        self.types.insert(info.name.clone(), info);
    }

    /// Register a method, binding its type variables
    pub fn register_method(&mut self, method: MethodSignature) {
        let type_level = self
            .types
            .get(method.declaring_type.name())
            .map(|t| t.generic_parameters.clone())
            .unwrap_or_default();
        let method = method.bind_params(&type_level);
        self.methods
            .retain(|m| !(m.declaring_type.name() == method.declaring_type.name() && m.name == method.name));
        self.methods.push(method);
    }

    /// Register an operator overload
    pub fn register_operator(&mut self, operator: OperatorSignature) {
        self.operators.push(operator);
    }

    /// Look up a registered type
    pub fn type_info(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// All registered methods
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.iter()
    }

    /// Whether every component of the type is registered with the right arity
    pub fn is_known(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Param(_) => false,
            TypeRef::Named { name, args } => {
                let arity_ok = if name == ARRAY_TYPE {
                    args.len() == 1
                } else {
                    self.types
                        .get(name)
                        .is_some_and(|t| t.generic_parameters.len() == args.len())
                };
                arity_ok && args.iter().all(|a| self.is_known(a))
            }
        }
    }

    fn rank(&self, ty: &TypeRef) -> Option<u8> {
        if !ty.args().is_empty() {
            return None;
        }
        match ty {
            TypeRef::Named { name, .. } => self.types.get(name).and_then(|t| t.numeric_rank),
            TypeRef::Param(_) => None,
        }
    }

    fn registered_operators(&self, kind: OperatorKind, operands: &[&TypeRef]) -> Vec<OperatorSignature> {
        self.operators
            .iter()
            .filter(|op| {
                op.kind == kind
                    && op.operands.len() == operands.len()
                    && op.operands.iter().zip(operands).all(|(a, b)| a == *b)
            })
            .cloned()
            .collect()
    }
}

impl TypeOracle for TypeDatabase {
    fn resolve(&self, handle: &TypeHandle) -> Option<TypeRef> {
        if handle.is_this() {
            return Some(TypeRef::named(self.this_type.clone()));
        }
        let ty = handle.to_type_ref()?;
        self.is_known(&ty).then_some(ty)
    }

    fn is_numeric(&self, ty: &TypeRef) -> bool {
        self.rank(ty).is_some()
    }

    fn binary_operators(&self, kind: BinaryOperatorKind, lhs: &TypeRef, rhs: &TypeRef) -> Vec<OperatorSignature> {
        let registered = self.registered_operators(OperatorKind::Binary(kind), &[lhs, rhs]);
        if !registered.is_empty() {
            return registered;
        }

        let signature = |result: TypeRef| OperatorSignature {
            kind: OperatorKind::Binary(kind),
            operands: vec![lhs.clone(), rhs.clone()],
            result,
        };
        let bool_ty = TypeRef::named("bool");
        let string_ty = TypeRef::named("string");

        match (self.rank(lhs), self.rank(rhs)) {
            (Some(a), Some(b)) if kind.is_arithmetic() => {
                let wider = if a >= b { lhs } else { rhs };
                return vec![signature(wider.clone())];
            }
            (Some(_), Some(_)) if kind.is_ordering() || matches!(kind, BinaryOperatorKind::Equals | BinaryOperatorKind::NotEquals) => {
                return vec![signature(bool_ty)];
            }
            _ => {}
        }

        match kind {
            BinaryOperatorKind::Add if *lhs == string_ty || *rhs == string_ty => vec![signature(string_ty)],
            BinaryOperatorKind::Equals | BinaryOperatorKind::NotEquals if lhs == rhs => vec![signature(bool_ty)],
            BinaryOperatorKind::And | BinaryOperatorKind::Or if *lhs == bool_ty && *rhs == bool_ty => {
                vec![signature(bool_ty)]
            }
            _ => Vec::new(),
        }
    }

    fn unary_operators(&self, kind: UnaryOperatorKind, operand: &TypeRef) -> Vec<OperatorSignature> {
        let registered = self.registered_operators(OperatorKind::Unary(kind), &[operand]);
        if !registered.is_empty() {
            return registered;
        }
        let applies = match kind {
            UnaryOperatorKind::Negate => self.is_numeric(operand),
            UnaryOperatorKind::Not => *operand == TypeRef::named("bool"),
        };
        if applies {
            vec![OperatorSignature {
                kind: OperatorKind::Unary(kind),
                operands: vec![operand.clone()],
                result: operand.clone(),
            }]
        } else {
            Vec::new()
        }
    }

    fn members(&self, ty: &TypeRef, filter: MemberFilter) -> Vec<Member> {
        let Some(info) = self.types.get(ty.name()) else {
            return Vec::new();
        };
        let bindings = info.bindings_for(ty);

        let mut members: Vec<Member> = info
            .members
            .iter()
            .filter(|m| filter.accepts(m.is_static))
            .map(|m| Member {
                ty: m.ty.substitute(&bindings),
                ..m.clone()
            })
            .collect();

        members.extend(
            self.methods
                .iter()
                .filter(|m| m.declaring_type.name() == ty.name() && filter.accepts(m.is_static))
                .map(|m| Member {
                    name: m.name.clone(),
                    kind: MemberKind::Method,
                    ty: m.return_type.substitute(&bindings),
                    is_static: m.is_static,
                }),
        );
        members
    }

    fn method(&self, method: &MethodRef) -> Option<MethodSignature> {
        self.methods
            .iter()
            .find(|m| m.declaring_type.name() == method.declaring_type && m.name == method.name)
            .cloned()
    }

    fn supertypes(&self, ty: &TypeRef) -> Vec<TypeRef> {
        if ty.name() == ARRAY_TYPE {
            return vec![TypeRef::generic("IEnumerable", ty.args().to_vec())];
        }
        let Some(info) = self.types.get(ty.name()) else {
            return Vec::new();
        };
        let bindings = info.bindings_for(ty);
        info.supertypes.iter().map(|s| s.substitute(&bindings)).collect()
    }

    fn default_value(&self, ty: &TypeRef) -> ConstantValue {
        match ty.name() {
            "bool" => return ConstantValue::Bool(false),
            "float" => return ConstantValue::Float(0.0),
            "double" => return ConstantValue::Double(0.0),
            "string" => return ConstantValue::String(String::new()),
            _ => {}
        }
        if self.is_numeric(ty) {
            return ConstantValue::Int(0);
        }
        match self.types.get(ty.name()).map(|t| &t.kind) {
            Some(TypeKind::Enum { values }) if !values.is_empty() => ConstantValue::Enum {
                type_name: ty.name().to_string(),
                value: values[0].clone(),
            },
            Some(TypeKind::Class | TypeKind::Interface) => ConstantValue::Null,
            _ => ConstantValue::Default(TypeHandle::of(ty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_promotion() {
        let db = TypeDatabase::standard();
        let ops = db.binary_operators(BinaryOperatorKind::Add, &TypeRef::named("int"), &TypeRef::named("float"));
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].result, TypeRef::named("float"));

        let cmp = db.binary_operators(BinaryOperatorKind::Less, &TypeRef::named("float"), &TypeRef::named("int"));
        assert_eq!(cmp[0].result, TypeRef::named("bool"));
    }

    #[test]
    fn test_missing_operator() {
        let db = TypeDatabase::standard();
        let ops = db.binary_operators(
            BinaryOperatorKind::Multiply,
            &TypeRef::named("GameObject"),
            &TypeRef::named("float"),
        );
        assert!(ops.is_empty());
        assert!(db
            .binary_operators(BinaryOperatorKind::And, &TypeRef::named("bool"), &TypeRef::named("int"))
            .is_empty());
    }

    #[test]
    fn test_registered_operator() {
        let db = TypeDatabase::standard();
        let ops = db.binary_operators(
            BinaryOperatorKind::Multiply,
            &TypeRef::named("Vector3"),
            &TypeRef::named("float"),
        );
        assert_eq!(ops[0].result, TypeRef::named("Vector3"));
    }

    #[test]
    fn test_resolve_checks_arity() {
        let db = TypeDatabase::standard();
        assert!(db.resolve(&TypeHandle::new("List<float>")).is_some());
        assert!(db.resolve(&TypeHandle::new("List")).is_none());
        assert!(db.resolve(&TypeHandle::new("List<T>")).is_none());
        assert!(db.resolve(&TypeHandle::new("float[]")).is_some());
        assert_eq!(db.resolve(&TypeHandle::this_type()), Some(TypeRef::named("GameObject")));
    }

    #[test]
    fn test_generic_members_are_substituted() {
        let db = TypeDatabase::standard();
        let list = TypeRef::generic("List", vec![TypeRef::named("float")]);
        let members = db.members(&list, MemberFilter::Instance);
        assert!(members.iter().any(|m| m.name == "Count" && m.ty == TypeRef::named("int")));
        assert!(members.iter().any(|m| m.name == "Contains" && m.kind == MemberKind::Method));
        assert_eq!(
            db.supertypes(&list),
            vec![TypeRef::generic("IEnumerable", vec![TypeRef::named("float")])]
        );
    }

    #[test]
    fn test_method_type_variables_are_bound() {
        let db = TypeDatabase::standard();
        let first = db.method(&MethodRef::new("Enumerable", "First")).unwrap();
        assert_eq!(first.return_type, TypeRef::param("T"));
        assert_eq!(first.type_variables(), vec!["T".to_string()]);

        let add = db.method(&MethodRef::new("List", "Add")).unwrap();
        assert_eq!(add.declaring_type, TypeRef::generic("List", vec![TypeRef::param("T")]));
        assert_eq!(add.input_types().len(), 2);
    }

    #[test]
    fn test_default_values() {
        let db = TypeDatabase::standard();
        assert_eq!(db.default_value(&TypeRef::named("int")), ConstantValue::Int(0));
        assert_eq!(db.default_value(&TypeRef::named("GameObject")), ConstantValue::Null);
        assert_eq!(
            db.default_value(&TypeRef::named("KeyCode")),
            ConstantValue::Enum {
                type_name: "KeyCode".into(),
                value: "Space".into()
            }
        );
        assert!(matches!(db.default_value(&TypeRef::named("Vector3")), ConstantValue::Default(_)));
    }

    #[test]
    fn test_load_from_ron() {
        let source = r#"(
            types: {
                "Health": (name: "Health", kind: Class, members: [(name: "current", kind: Field, ty: "float")]),
            },
            methods: [
                (declaring_type: "Health", name: "Heal", parameters: [(name: "amount", ty: "float")], return_type: "void"),
            ],
        )"#;
        let db = TypeDatabase::from_ron(source).unwrap();
        assert!(db.resolve(&TypeHandle::new("Health")).is_some());
        assert!(db.resolve(&TypeHandle::float()).is_some());
        let heal = db.method(&MethodRef::new("Health", "Heal")).unwrap();
        assert!(!heal.is_static);
        assert_eq!(heal.parameters.len(), 1);
    }
}
