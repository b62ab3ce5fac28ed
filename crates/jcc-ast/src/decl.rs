//! Declarations and declaration contexts.

use jcc_source::types::SourceRange;

use crate::ids::{ClassId, ExprId, FieldId, MethodId, ScopeId, StmtId, TypeDecl, TypeId, UnitId, VarId};
use crate::modifiers::Modifiers;

/// A single import declaration of a compilation unit.
#[derive(Debug, Clone, Copy)]
pub struct ImportDecl {
    /// The (unresolved) reference type naming the import
    pub ty: TypeId,
    /// True for `import pkg.*;`, false for a single-type import
    pub on_demand: bool,
}

/// One source file's worth of program: package, imports and one top-level
/// class or interface.
#[derive(Debug)]
pub struct CompilationUnit {
    /// The package reference; always an unresolved type, possibly with no
    /// parts (the default package)
    pub package: TypeId,
    /// Import declarations in source order
    pub imports: Vec<ImportDecl>,
    /// The single top-level declaration, if the unit has one
    pub body: Option<TypeDecl>,
    /// Where the unit lives in the source
    pub range: SourceRange,
}

/// The ordered set of all compilation units being compiled together.
///
/// There is no separate compilation; the linking unit is the whole program.
#[derive(Debug, Default)]
pub struct LinkingUnit {
    /// All units, in the order they were handed to the compiler
    pub units: Vec<UnitId>,
}

/// A class declaration.
#[derive(Debug)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    /// The simple name
    pub name: String,
    /// Dotted package-qualified name; assigned when the class is parented
    /// into its compilation unit
    pub canonical_name: String,
    /// The user-written `extends` reference, if any
    pub super_class: Option<TypeId>,
    /// The implicit `java.lang.Object` reference. `None` only on
    /// `java.lang.Object` itself, after the resolver's self-reference guard.
    pub object_super: Option<TypeId>,
    /// `implements` references in source order
    pub interfaces: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    pub constructors: Vec<MethodId>,
    pub range: SourceRange,
}

/// An interface declaration.
#[derive(Debug)]
pub struct InterfaceDecl {
    pub modifiers: Modifiers,
    pub name: String,
    /// Dotted package-qualified name; assigned at parenting time
    pub canonical_name: String,
    /// `extends` references in source order
    pub extends: Vec<TypeId>,
    pub methods: Vec<MethodId>,
    /// The implicit `java.lang.Object` reference, used only when checking
    /// interface methods against `Object`'s methods
    pub object_super: Option<TypeId>,
    pub range: SourceRange,
}

/// A method or constructor declaration.
#[derive(Debug)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub name: String,
    /// Dotted qualified name; assigned at parenting time
    pub canonical_name: String,
    /// `None` is the void sentinel
    pub return_ty: Option<TypeId>,
    /// Parameters in declaration order
    pub params: Vec<VarId>,
    /// All local variables, in the order a visitor assigned them
    pub locals: Vec<VarId>,
    /// The body; abstract and native methods have none
    pub body: Option<StmtId>,
    pub is_constructor: bool,
    /// The declaring class or interface; set at parenting time
    pub parent: Option<TypeDecl>,
    pub range: SourceRange,
}

/// A field declaration.
#[derive(Debug)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeId,
    pub name: String,
    /// The initialiser expression, if any
    pub init: Option<ExprId>,
    /// The declaring class; set at parenting time
    pub parent: Option<ClassId>,
    pub range: SourceRange,
}

/// A local variable or parameter declaration.
#[derive(Debug)]
pub struct VarDecl {
    pub ty: TypeId,
    pub name: String,
    /// The initialiser expression, if any
    pub init: Option<ExprId>,
    /// The scope the variable is visible in
    pub scope: ScopeId,
    pub range: SourceRange,
}
