//! Semantic error types and reporting.
//!
//! Each variant corresponds to one diagnostic the semantic passes can emit.
//! Errors carry the source ranges a user needs to understand the report; the
//! [`SemanticError::into_diagnostic`] lowering preserves up to three of them
//! plus the inline arguments.

use jcc_source::diagnostics::Diagnostic;
use jcc_source::types::SourceRange;
use thiserror::Error;

/// Semantic analysis errors.
#[derive(Debug, Error, Clone)]
pub enum SemanticError {
    /// An import references a package or type that does not exist.
    #[error("unresolved import '{name}'")]
    UnresolvedImport { name: String, range: SourceRange },

    /// A type name could not be resolved to any declaration.
    #[error("unresolved type '{name}'")]
    UnresolvedType { name: String, range: SourceRange },

    /// Two compilation units declare the same name in one package.
    #[error("duplicate declaration '{name}' in package")]
    DuplicateDeclInPackage { name: String, range: SourceRange },

    /// A subpackage name collides with a declaration at the same point.
    #[error("subpackage '{name}' shadows a declaration of the same name")]
    SubpackageShadowsDecl { name: String, range: SourceRange },

    /// A class lists an interface after `extends`.
    #[error("class '{name}' must not extend an interface")]
    ClassExtendsInterface { name: String, range: SourceRange },

    /// A class extends a `final` class.
    #[error("class '{name}' must not extend a final class")]
    ClassExtendsFinal { name: String, range: SourceRange },

    /// The same interface appears twice in an implements/extends list.
    #[error("'{name}' must not name the same super-interface twice")]
    DuplicateSuperInterface { name: String, range: SourceRange },

    /// A class appears in an implements list.
    #[error("class '{name}' must not implement a class")]
    ClassImplementsClass { name: String, range: SourceRange },

    /// An interface lists a class after `extends`.
    #[error("interface '{name}' must not extend a class")]
    InterfaceExtendsClass { name: String, range: SourceRange },

    /// Two methods in one declaration share a signature.
    #[error("duplicate method signature '{name}'")]
    DuplicateMethodSignature { name: String, range: SourceRange },

    /// A non-abstract class fails to implement an inherited abstract method.
    #[error("abstract method '{name}' is not implemented in non-abstract class '{class}'")]
    AbstractMethodNotImplemented {
        name: String,
        class: String,
        range: SourceRange,
        /// Where the abstract method was declared
        declared_at: SourceRange,
    },

    /// An override changes the return type.
    #[error("method '{name}' must not replace a method with a different return type")]
    BadOverrideReturn { name: String, range: SourceRange },

    /// A static/non-static mismatch between a method and the one it replaces.
    #[error("method '{name}' must not change the staticness of the method it replaces")]
    BadOverrideStatic { name: String, range: SourceRange },

    /// A protected method replaces a public one.
    #[error("protected method '{name}' must not replace a public method")]
    BadOverrideProtectedOverPublic { name: String, range: SourceRange },

    /// A method replaces a `final` method.
    #[error("method '{name}' must not replace a final method")]
    OverrideOfFinal { name: String, range: SourceRange },

    /// Two constructors share a signature.
    #[error("duplicate constructor signature in class '{name}'")]
    DuplicateConstructor { name: String, range: SourceRange },

    /// The inheritance graph contains a cycle.
    #[error("cycle detected in the inheritance graph at '{name}'")]
    CyclicInheritance { name: String, range: SourceRange },

    /// A simple name has no meaning here.
    #[error("name '{name}' not found")]
    NameNotFound { name: String, range: SourceRange },

    /// A name resolves to more than one candidate.
    #[error("name '{name}' is ambiguous")]
    NameAmbiguous { name: String, range: SourceRange },

    /// No method of the given name accepts the supplied argument types.
    #[error("no applicable method '{name}' for the given arguments")]
    MethodNotApplicable { name: String, range: SourceRange },

    /// The right side of an assignment cannot convert to the left.
    #[error("invalid assignment: '{rhs}' is not assignable to '{lhs}'")]
    InvalidAssignment {
        lhs: String,
        rhs: String,
        range: SourceRange,
        lhs_range: SourceRange,
        rhs_range: SourceRange,
    },

    /// A binary operator rejects its operand types.
    #[error("invalid operand types '{lhs}' and '{rhs}' for operator '{op}'")]
    InvalidBinaryOperandTypes {
        op: &'static str,
        lhs: String,
        rhs: String,
        range: SourceRange,
        lhs_range: SourceRange,
        rhs_range: SourceRange,
    },

    /// A unary operator rejects its operand type.
    #[error("invalid operand type '{operand}' for unary operator '{op}'")]
    InvalidUnaryOperandType {
        op: &'static str,
        operand: String,
        range: SourceRange,
        operand_range: SourceRange,
    },

    /// A cast between unrelated types.
    #[error("invalid cast from '{from}' to '{to}'")]
    InvalidCast {
        from: String,
        to: String,
        range: SourceRange,
        from_range: SourceRange,
        to_range: SourceRange,
    },

    /// An instance member is used where no instance exists.
    #[error("cannot access or invoke instance members in a static context")]
    InstanceMemberInStatic { range: SourceRange },

    /// A static field is accessed through an instance expression.
    #[error("cannot access a static field through an instance expression")]
    StaticAccessThroughInstance { range: SourceRange },

    /// `this` appears in a static context.
    #[error("cannot use 'this' in a static context")]
    UseOfThisInStatic { range: SourceRange },
}

impl SemanticError {
    /// The stable machine-readable code for this error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnresolvedImport { .. } => "unresolved-import",
            Self::UnresolvedType { .. } => "unresolved-type",
            Self::DuplicateDeclInPackage { .. } => "duplicate-decl-in-package",
            Self::SubpackageShadowsDecl { .. } => "subpackage-shadows-decl",
            Self::ClassExtendsInterface { .. } => "class-extends-interface",
            Self::ClassExtendsFinal { .. } => "class-extends-final",
            Self::DuplicateSuperInterface { .. } => "duplicate-super-interface",
            Self::ClassImplementsClass { .. } => "class-implements-class",
            Self::InterfaceExtendsClass { .. } => "interface-extends-class",
            Self::DuplicateMethodSignature { .. } => "duplicate-method-signature",
            Self::AbstractMethodNotImplemented { .. } => "abstract-method-not-implemented",
            Self::BadOverrideReturn { .. } => "bad-override-return",
            Self::BadOverrideStatic { .. } => "bad-override-static",
            Self::BadOverrideProtectedOverPublic { .. } => "bad-override-protected-over-public",
            Self::OverrideOfFinal { .. } => "override-of-final",
            Self::DuplicateConstructor { .. } => "duplicate-constructor",
            Self::CyclicInheritance { .. } => "cyclic-inheritance",
            Self::NameNotFound { .. } => "name-not-found",
            Self::NameAmbiguous { .. } => "name-ambiguous",
            Self::MethodNotApplicable { .. } => "method-not-applicable",
            Self::InvalidAssignment { .. } => "invalid-assignment",
            Self::InvalidBinaryOperandTypes { .. } => "invalid-binary-operand-types",
            Self::InvalidUnaryOperandType { .. } => "invalid-unary-operand-type",
            Self::InvalidCast { .. } => "invalid-cast",
            Self::InstanceMemberInStatic { .. } => "instance-member-in-static",
            Self::StaticAccessThroughInstance { .. } => "static-access-through-instance",
            Self::UseOfThisInStatic { .. } => "use-of-this-in-static",
        }
    }

    /// The primary source range of this error.
    #[must_use]
    pub const fn range(&self) -> SourceRange {
        match self {
            Self::UnresolvedImport { range, .. }
            | Self::UnresolvedType { range, .. }
            | Self::DuplicateDeclInPackage { range, .. }
            | Self::SubpackageShadowsDecl { range, .. }
            | Self::ClassExtendsInterface { range, .. }
            | Self::ClassExtendsFinal { range, .. }
            | Self::DuplicateSuperInterface { range, .. }
            | Self::ClassImplementsClass { range, .. }
            | Self::InterfaceExtendsClass { range, .. }
            | Self::DuplicateMethodSignature { range, .. }
            | Self::AbstractMethodNotImplemented { range, .. }
            | Self::BadOverrideReturn { range, .. }
            | Self::BadOverrideStatic { range, .. }
            | Self::BadOverrideProtectedOverPublic { range, .. }
            | Self::OverrideOfFinal { range, .. }
            | Self::DuplicateConstructor { range, .. }
            | Self::CyclicInheritance { range, .. }
            | Self::NameNotFound { range, .. }
            | Self::NameAmbiguous { range, .. }
            | Self::MethodNotApplicable { range, .. }
            | Self::InvalidAssignment { range, .. }
            | Self::InvalidBinaryOperandTypes { range, .. }
            | Self::InvalidUnaryOperandType { range, .. }
            | Self::InvalidCast { range, .. }
            | Self::InstanceMemberInStatic { range }
            | Self::StaticAccessThroughInstance { range }
            | Self::UseOfThisInStatic { range } => *range,
        }
    }

    /// Lowers this error into a collectable diagnostic.
    #[must_use]
    pub fn into_diagnostic(self) -> Diagnostic {
        let diag = Diagnostic::new(self.code(), self.to_string(), self.range());
        match self {
            Self::AbstractMethodNotImplemented { name, declared_at, .. } => {
                diag.with_range(declared_at).with_arg(name)
            }
            Self::InvalidAssignment { lhs, rhs, lhs_range, rhs_range, .. } => {
                diag.with_range(lhs_range).with_range(rhs_range).with_arg(lhs).with_arg(rhs)
            }
            Self::InvalidBinaryOperandTypes { lhs, rhs, lhs_range, rhs_range, .. } => {
                diag.with_range(lhs_range).with_range(rhs_range).with_arg(lhs).with_arg(rhs)
            }
            Self::InvalidUnaryOperandType { operand, operand_range, .. } => {
                diag.with_range(operand_range).with_arg(operand)
            }
            Self::InvalidCast { from, to, from_range, to_range, .. } => {
                diag.with_range(from_range).with_range(to_range).with_arg(from).with_arg(to)
            }
            Self::UnresolvedImport { name, .. }
            | Self::UnresolvedType { name, .. }
            | Self::DuplicateDeclInPackage { name, .. }
            | Self::SubpackageShadowsDecl { name, .. }
            | Self::ClassExtendsInterface { name, .. }
            | Self::ClassExtendsFinal { name, .. }
            | Self::DuplicateSuperInterface { name, .. }
            | Self::ClassImplementsClass { name, .. }
            | Self::InterfaceExtendsClass { name, .. }
            | Self::DuplicateMethodSignature { name, .. }
            | Self::BadOverrideReturn { name, .. }
            | Self::BadOverrideStatic { name, .. }
            | Self::BadOverrideProtectedOverPublic { name, .. }
            | Self::OverrideOfFinal { name, .. }
            | Self::DuplicateConstructor { name, .. }
            | Self::CyclicInheritance { name, .. }
            | Self::NameNotFound { name, .. }
            | Self::NameAmbiguous { name, .. }
            | Self::MethodNotApplicable { name, .. } => diag.with_arg(name),
            Self::InstanceMemberInStatic { .. }
            | Self::StaticAccessThroughInstance { .. }
            | Self::UseOfThisInStatic { .. } => diag,
        }
    }
}
