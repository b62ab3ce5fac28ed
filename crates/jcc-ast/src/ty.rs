//! AST types.
//!
//! A reference type starts life as [`Type::Unresolved`], holding only its
//! dotted identifier parts, and is overwritten in place with
//! [`Type::Reference`] once the name resolver has found its declaration.
//! [`Type::Method`] is synthetic and never stored in an AST slot; the
//! expression type resolver materialises it while typing calls.

use std::fmt;

use crate::ids::{TypeDecl, TypeId};

/// The primitive types of the language.
///
/// `None` is the type of the `null` literal; `String` is carried as a
/// built-in by literals but otherwise behaves as `java.lang.String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltInKind {
    None,
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    String,
}

impl fmt::Display for BuiltInKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "null",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Char => "char",
            Self::Boolean => "boolean",
            Self::String => "String",
        };
        write!(f, "{name}")
    }
}

/// An AST type.
#[derive(Debug, Clone)]
pub enum Type {
    /// A primitive type
    BuiltIn(BuiltInKind),
    /// A reference type that has not been resolved to a declaration yet
    Unresolved {
        /// The dotted identifier parts, e.g. `["java", "lang", "Object"]`
        parts: Vec<String>,
        /// Cleared when the resolver has permanently failed on this type
        valid: bool,
        /// Set once references into `parts` may be held by other passes
        locked: bool,
    },
    /// A reference type resolved to a class or interface declaration
    Reference(TypeDecl),
    /// An array of some element type
    Array(TypeId),
    /// A synthetic method type; never stored in an AST slot
    Method {
        /// The return type; `None` is the void sentinel
        ret: Option<TypeId>,
        /// The ordered parameter types
        params: Vec<TypeId>,
    },
}

impl Type {
    /// Creates an unresolved type from dotted parts.
    #[must_use]
    pub fn unresolved(parts: Vec<String>) -> Self {
        Self::Unresolved { parts, valid: true, locked: false }
    }

    /// Returns true once this type refers to something concrete.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Unresolved { .. } => false,
            Self::BuiltIn(_) | Self::Reference(_) | Self::Method { .. } => true,
            // Arrays are resolved iff their element type is; the arena
            // answers that question since it owns the element slot.
            Self::Array(_) => true,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::BuiltIn(
                BuiltInKind::Byte | BuiltInKind::Short | BuiltInKind::Int | BuiltInKind::Char
            )
        )
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool { matches!(self, Self::BuiltIn(BuiltInKind::Boolean)) }

    #[must_use]
    pub fn is_null(&self) -> bool { matches!(self, Self::BuiltIn(BuiltInKind::None)) }

    #[must_use]
    pub fn is_string(&self) -> bool { matches!(self, Self::BuiltIn(BuiltInKind::String)) }

    /// Built-in types other than `String` are primitive.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::BuiltIn(kind) if *kind != BuiltInKind::String)
    }

    #[must_use]
    pub fn is_array(&self) -> bool { matches!(self, Self::Array(_)) }

    /// Returns the declaration of a resolved reference type.
    #[must_use]
    pub fn as_decl(&self) -> Option<TypeDecl> {
        match self {
            Self::Reference(decl) => Some(*decl),
            _ => None,
        }
    }
}
