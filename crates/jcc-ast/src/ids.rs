//! Typed index handles into the AST arena.

use std::fmt;

/// Declares a `u32`-backed arena handle type.
macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates a handle from a raw index.
            #[must_use]
            pub const fn new(index: u32) -> Self { Self(index) }

            /// Returns the raw index of this handle.
            #[must_use]
            pub const fn index(self) -> usize { self.0 as usize }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle to a compilation unit.
    UnitId, "unit");
define_id!(
    /// Handle to a class declaration.
    ClassId, "class");
define_id!(
    /// Handle to an interface declaration.
    InterfaceId, "interface");
define_id!(
    /// Handle to a method or constructor declaration.
    MethodId, "method");
define_id!(
    /// Handle to a field declaration.
    FieldId, "field");
define_id!(
    /// Handle to a local variable or parameter declaration.
    VarId, "var");
define_id!(
    /// Handle to a statement.
    StmtId, "stmt");
define_id!(
    /// Handle to a postfix expression list.
    ExprId, "expr");
define_id!(
    /// Handle to a single node within a postfix expression list.
    ExprNodeId, "enode");
define_id!(
    /// Handle to an AST type.
    TypeId, "type");
define_id!(
    /// Handle to a lexical scope.
    ScopeId, "scope");

/// A reference to a class or interface declaration.
///
/// This is the payload of a resolved reference type and the shape of every
/// entry in the name resolver's package tree leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDecl {
    /// A class declaration
    Class(ClassId),
    /// An interface declaration
    Interface(InterfaceId),
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(id) => write!(f, "{id}"),
            Self::Interface(id) => write!(f, "{id}"),
        }
    }
}

/// A reference to any declaration an expression name can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclRef {
    /// A class declaration
    Class(ClassId),
    /// An interface declaration
    Interface(InterfaceId),
    /// A method or constructor declaration
    Method(MethodId),
    /// A field declaration
    Field(FieldId),
    /// A local variable or parameter declaration
    Var(VarId),
}

impl From<TypeDecl> for DeclRef {
    fn from(decl: TypeDecl) -> Self {
        match decl {
            TypeDecl::Class(id) => Self::Class(id),
            TypeDecl::Interface(id) => Self::Interface(id),
        }
    }
}

impl DeclRef {
    /// Returns the class-or-interface view of this reference, if it is one.
    #[must_use]
    pub const fn as_type_decl(self) -> Option<TypeDecl> {
        match self {
            Self::Class(id) => Some(TypeDecl::Class(id)),
            Self::Interface(id) => Some(TypeDecl::Interface(id)),
            _ => None,
        }
    }
}
