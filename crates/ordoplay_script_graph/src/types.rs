// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type handles and structural type references.
//!
//! A [`TypeHandle`] is what the graph stores: a serializable identifier that
//! is only turned into a [`TypeRef`] by a type oracle at translation time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deferred, serializable reference to a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeHandle(String);

impl TypeHandle {
    const UNKNOWN: &'static str = "__UNKNOWN";
    const EXECUTION: &'static str = "__EXECUTION";
    const THIS: &'static str = "__THIS";

    /// Create a handle from a type identifier such as `List<float>`
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    /// Handle for a port whose type is not known yet
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// Handle carried by execution ports
    pub fn execution() -> Self {
        Self(Self::EXECUTION.to_string())
    }

    /// Handle for the type of the generated class itself
    pub fn this_type() -> Self {
        Self(Self::THIS.to_string())
    }

    /// Handle for a structural type
    pub fn of(ty: &TypeRef) -> Self {
        Self(ty.to_string())
    }

    /// `bool`
    pub fn bool() -> Self {
        Self::new("bool")
    }

    /// `int`
    pub fn int() -> Self {
        Self::new("int")
    }

    /// `float`
    pub fn float() -> Self {
        Self::new("float")
    }

    /// `string`
    pub fn string() -> Self {
        Self::new("string")
    }

    /// `void`
    pub fn void() -> Self {
        Self::new("void")
    }

    /// `object`
    pub fn object() -> Self {
        Self::new("object")
    }

    /// Raw identifier
    pub fn identifier(&self) -> &str {
        &self.0
    }

    /// Whether this is the unknown handle
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// Whether this is the execution-flow handle
    pub fn is_execution(&self) -> bool {
        self.0 == Self::EXECUTION
    }

    /// Whether this refers to the generated class
    pub fn is_this(&self) -> bool {
        self.0 == Self::THIS
    }

    /// Whether this is `void`
    pub fn is_void(&self) -> bool {
        self.0 == "void"
    }

    /// Parse the identifier into a structural type.
    ///
    /// Reserved handles do not parse.
    pub fn to_type_ref(&self) -> Option<TypeRef> {
        if self.is_unknown() || self.is_execution() || self.is_this() {
            return None;
        }
        TypeRef::parse(&self.0).ok()
    }
}

impl Default for TypeHandle {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural type: a named type with arguments, or an open type variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    /// Concrete (or partially open) named type, e.g. `List<T>`
    Named {
        /// Type name
        name: String,
        /// Generic arguments
        args: Vec<TypeRef>,
    },
    /// Open type variable, e.g. `T`
    Param(String),
}

/// Name used for array types; displayed as `T[]`
pub const ARRAY_TYPE: &str = "Array";

impl TypeRef {
    /// Non-generic named type
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Generic named type
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    /// Type variable
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    /// Array of `element`
    pub fn array(element: TypeRef) -> Self {
        Self::generic(ARRAY_TYPE, vec![element])
    }

    /// Parse a type written as `Name<Arg, ...>[]`
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().peekable(),
        };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();
        match parser.chars.next() {
            None => Ok(ty),
            Some((pos, c)) => Err(TypeParseError::Unexpected {
                input: input.to_string(),
                found: c,
                position: pos,
            }),
        }
    }

    /// Parse with a set of names that denote type variables
    pub fn parse_with_params(input: &str, params: &[String]) -> Result<Self, TypeParseError> {
        Ok(Self::parse(input)?.bind_params(params))
    }

    /// Turn bare named types matching `params` into type variables
    pub fn bind_params(self, params: &[String]) -> Self {
        match self {
            Self::Named { name, args } if args.is_empty() && params.contains(&name) => Self::Param(name),
            Self::Named { name, args } => Self::Named {
                name,
                args: args.into_iter().map(|a| a.bind_params(params)).collect(),
            },
            param @ Self::Param(_) => param,
        }
    }

    /// Type name (or variable name)
    pub fn name(&self) -> &str {
        match self {
            Self::Named { name, .. } | Self::Param(name) => name,
        }
    }

    /// Generic arguments
    pub fn args(&self) -> &[TypeRef] {
        match self {
            Self::Named { args, .. } => args,
            Self::Param(_) => &[],
        }
    }

    /// Whether any type variable occurs in this type
    pub fn contains_params(&self) -> bool {
        match self {
            Self::Param(_) => true,
            Self::Named { args, .. } => args.iter().any(TypeRef::contains_params),
        }
    }

    /// Names of the type variables, in order of first occurrence
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Param(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Named { args, .. } => {
                for arg in args {
                    arg.collect_params(out);
                }
            }
        }
    }

    /// Replace bound type variables; unbound ones are left open
    pub fn substitute(&self, bindings: &IndexMap<String, TypeRef>) -> TypeRef {
        match self {
            Self::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Named { name, args } => Self::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
        }
    }

    /// Whether this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Named { name, args } if name == "void" && args.is_empty())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(name) => f.write_str(name),
            Self::Named { name, args } if name == ARRAY_TYPE && args.len() == 1 => write!(f, "{}[]", args[0]),
            Self::Named { name, args } if args.is_empty() => f.write_str(name),
            Self::Named { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&value)
    }
}

/// Error when parsing a type identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    /// Input ended early
    #[error("Unexpected end of type `{0}`")]
    UnexpectedEnd(String),

    /// Unexpected character
    #[error("Unexpected `{found}` at {position} in type `{input}`")]
    Unexpected {
        /// Whole input
        input: String,
        /// Offending character
        found: char,
        /// Byte offset
        position: usize,
    },
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeParseError> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((position, found)) => Err(TypeParseError::Unexpected {
                input: self.input.to_string(),
                found,
                position,
            }),
            None => Err(TypeParseError::UnexpectedEnd(self.input.to_string())),
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeParseError> {
        self.skip_whitespace();
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return match self.chars.next() {
                Some((position, found)) => Err(TypeParseError::Unexpected {
                    input: self.input.to_string(),
                    found,
                    position,
                }),
                None => Err(TypeParseError::UnexpectedEnd(self.input.to_string())),
            };
        }

        let mut args = Vec::new();
        self.skip_whitespace();
        if self.chars.peek().is_some_and(|(_, c)| *c == '<') {
            self.chars.next();
            loop {
                args.push(self.parse_type()?);
                self.skip_whitespace();
                match self.chars.next() {
                    Some((_, ',')) => continue,
                    Some((_, '>')) => break,
                    Some((position, found)) => {
                        return Err(TypeParseError::Unexpected {
                            input: self.input.to_string(),
                            found,
                            position,
                        })
                    }
                    None => return Err(TypeParseError::UnexpectedEnd(self.input.to_string())),
                }
            }
        }

        let mut ty = TypeRef::Named { name, args };
        loop {
            self.skip_whitespace();
            if self.chars.peek().is_some_and(|(_, c)| *c == '[') {
                self.chars.next();
                self.expect(']')?;
                ty = TypeRef::array(ty);
            } else {
                break;
            }
        }
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_generic() {
        let ty = TypeRef::parse("Dictionary<string, List<float>>").unwrap();
        assert_eq!(ty.name(), "Dictionary");
        assert_eq!(ty.args().len(), 2);
        assert_eq!(ty.args()[1], TypeRef::generic("List", vec![TypeRef::named("float")]));
        assert_eq!(ty.to_string(), "Dictionary<string, List<float>>");
    }

    #[test]
    fn test_parse_array() {
        let ty = TypeRef::parse("int[]").unwrap();
        assert_eq!(ty, TypeRef::array(TypeRef::named("int")));
        assert_eq!(ty.to_string(), "int[]");
    }

    #[test]
    fn test_parse_errors() {
        assert!(TypeRef::parse("List<float").is_err());
        assert!(TypeRef::parse("").is_err());
        assert!(TypeRef::parse("List<>").is_err());
    }

    #[test]
    fn test_bind_and_substitute() {
        let ty = TypeRef::parse_with_params("List<T>", &["T".to_string()]).unwrap();
        assert!(ty.contains_params());
        assert_eq!(ty.params(), vec!["T"]);

        let mut bindings = IndexMap::new();
        bindings.insert("T".to_string(), TypeRef::named("float"));
        assert_eq!(ty.substitute(&bindings).to_string(), "List<float>");
    }

    #[test]
    fn test_reserved_handles_do_not_parse() {
        assert!(TypeHandle::unknown().to_type_ref().is_none());
        assert!(TypeHandle::execution().to_type_ref().is_none());
        assert_eq!(TypeHandle::float().to_type_ref(), Some(TypeRef::named("float")));
    }
}
