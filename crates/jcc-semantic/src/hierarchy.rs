//! Hierarchy checking.
//!
//! Validates the inheritance rules of the language and computes, per
//! declaration, the closure tables the later passes query:
//!
//! - `inheritance[decl]`: the direct super classes and super interfaces;
//! - `inherited_methods[decl]`: the fully resolved method set (declared
//!   plus non-overridden inherited);
//! - `inherited_members[decl]`: the inherited fields, in order (super-most
//!   first), followed by the declaration's own fields.
//!
//! Two methods *replace* each other iff they have the same signature: same
//! name and equal ordered parameter types.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_ast::ids::{ClassId, FieldId, InterfaceId, MethodId, TypeDecl};
use jcc_ast::ty::Type;
use jcc_source::diagnostics::DiagnosticEngine;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::SemanticError;

/// Returns true if two methods have the same signature.
fn is_same_signature(ast: &Ast, a: MethodId, b: MethodId) -> bool {
    let ma = ast.method(a);
    let mb = ast.method(b);
    if ma.name != mb.name || ma.params.len() != mb.params.len() {
        return false;
    }
    ma.params
        .iter()
        .zip(&mb.params)
        .all(|(&pa, &pb)| ast.types_equal(ast.var(pa).ty, ast.var(pb).ty))
}

/// Returns true if two methods have equal return types (void included).
fn is_same_return(ast: &Ast, a: MethodId, b: MethodId) -> bool {
    match (ast.method(a).return_ty, ast.method(b).return_ty) {
        (None, None) => true,
        (Some(x), Some(y)) => ast.types_equal(x, y),
        _ => false,
    }
}

/// The hierarchy checker and its computed closure tables.
#[derive(Debug, Default)]
pub struct HierarchyChecker {
    /// Direct supers (classes and interfaces) per declaration
    inheritance: FxHashMap<TypeDecl, Vec<TypeDecl>>,
    /// Declared + non-overridden inherited methods per declaration
    inherited_methods: FxHashMap<TypeDecl, Vec<MethodId>>,
    /// Inherited then own fields, in order, per declaration
    inherited_members: FxHashMap<TypeDecl, Vec<FieldId>>,
    /// Declarations whose method closure has been finalised
    finalized: FxHashSet<TypeDecl>,
}

impl HierarchyChecker {
    /// Creates an empty checker.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Runs every hierarchy check over the linking unit.
    pub fn check(&mut self, ast: &Ast, lu: &LinkingUnit, diag: &mut DiagnosticEngine) {
        self.check_inheritance(ast, lu, diag);
        self.check_method_inheritance(ast, lu, diag);
    }

    // ===-- Queries ----------------------------------------------------=== //

    /// Is `sub` a subtype of `super_`? Reflexive.
    #[must_use]
    pub fn is_subtype(&self, sub: TypeDecl, super_: TypeDecl) -> bool {
        match (sub, super_) {
            (TypeDecl::Class(s), TypeDecl::Class(p)) => self.is_super_class(p, s),
            (_, TypeDecl::Interface(p)) => self.is_super_interface(p, sub),
            (TypeDecl::Interface(_), TypeDecl::Class(_)) => false,
        }
    }

    /// Is `super_` the same as, or a transitive super class of, `sub`?
    #[must_use]
    pub fn is_super_class(&self, super_: ClassId, sub: ClassId) -> bool {
        if super_ == sub {
            return true;
        }
        for &parent in self.inheritance.get(&TypeDecl::Class(sub)).map_or(&[][..], Vec::as_slice) {
            if let TypeDecl::Class(parent) = parent
                && self.is_super_class(super_, parent)
            {
                return true;
            }
        }
        false
    }

    /// Is `super_` the same as, or a transitive super interface of, `sub`?
    #[must_use]
    pub fn is_super_interface(&self, super_: InterfaceId, sub: TypeDecl) -> bool {
        if TypeDecl::Interface(super_) == sub {
            return true;
        }
        for &parent in self.inheritance.get(&sub).map_or(&[][..], Vec::as_slice) {
            if self.is_super_interface(super_, parent) {
                return true;
            }
        }
        false
    }

    /// The declared-and-inherited method set of a declaration.
    #[must_use]
    pub fn inherited_methods(&self, decl: TypeDecl) -> &[MethodId] {
        self.inherited_methods.get(&decl).map_or(&[], Vec::as_slice)
    }

    /// The fields visible on a declaration, inherited first, in order.
    #[must_use]
    pub fn inherited_members_in_order(&self, decl: TypeDecl) -> &[FieldId] {
        self.inherited_members.get(&decl).map_or(&[], Vec::as_slice)
    }

    /// The direct supers recorded for a declaration.
    #[must_use]
    pub fn direct_supers(&self, decl: TypeDecl) -> &[TypeDecl] {
        self.inheritance.get(&decl).map_or(&[], Vec::as_slice)
    }

    // ===-- Inheritance validation -------------------------------------=== //

    fn check_inheritance(&mut self, ast: &Ast, lu: &LinkingUnit, diag: &mut DiagnosticEngine) {
        self.inheritance.clear();
        for &unit in &lu.units {
            match ast.unit(unit).body {
                Some(TypeDecl::Class(class)) => self.check_class_supers(ast, class, diag),
                Some(TypeDecl::Interface(interface)) => {
                    self.check_interface_supers(ast, interface, diag);
                }
                None => {}
            }
        }
    }

    fn resolved_decl(ast: &Ast, ty: jcc_ast::ids::TypeId) -> Option<TypeDecl> {
        match ast.ty(ty) {
            Type::Reference(decl) => Some(*decl),
            _ => None,
        }
    }

    fn check_class_supers(&mut self, ast: &Ast, class: ClassId, diag: &mut DiagnosticEngine) {
        let decl = ast.class(class);
        let this = TypeDecl::Class(class);
        let entry = self.inheritance.entry(this).or_default();
        if let Some(super_ty) = decl.super_class {
            match Self::resolved_decl(ast, super_ty) {
                Some(TypeDecl::Class(super_class)) => {
                    if ast.class(super_class).modifiers.is_final() {
                        diag.report(
                            SemanticError::ClassExtendsFinal {
                                name: decl.name.clone(),
                                range: decl.range,
                            }
                            .into_diagnostic(),
                        );
                    }
                    entry.push(TypeDecl::Class(super_class));
                }
                Some(TypeDecl::Interface(_)) => diag.report(
                    SemanticError::ClassExtendsInterface {
                        name: decl.name.clone(),
                        range: decl.range,
                    }
                    .into_diagnostic(),
                ),
                // Unresolved supertype was already reported by the resolver.
                None => {}
            }
        } else if let Some(object_ty) = decl.object_super
            && let Some(object) = Self::resolved_decl(ast, object_ty)
        {
            // No extends clause: the class extends java.lang.Object.
            entry.push(object);
        }
        // Validate the implements list.
        for (i, &interface_ty) in decl.interfaces.iter().enumerate() {
            for &other_ty in decl.interfaces.iter().skip(i + 1) {
                if let (Some(a), Some(b)) =
                    (Self::resolved_decl(ast, interface_ty), Self::resolved_decl(ast, other_ty))
                    && a == b
                {
                    diag.report(
                        SemanticError::DuplicateSuperInterface {
                            name: decl.name.clone(),
                            range: decl.range,
                        }
                        .into_diagnostic(),
                    );
                }
            }
            match Self::resolved_decl(ast, interface_ty) {
                Some(parent @ TypeDecl::Interface(_)) => {
                    self.inheritance.entry(this).or_default().push(parent);
                }
                Some(TypeDecl::Class(_)) => diag.report(
                    SemanticError::ClassImplementsClass {
                        name: decl.name.clone(),
                        range: decl.range,
                    }
                    .into_diagnostic(),
                ),
                None => {}
            }
        }
    }

    fn check_interface_supers(
        &mut self,
        ast: &Ast,
        interface: InterfaceId,
        diag: &mut DiagnosticEngine,
    ) {
        let decl = ast.interface(interface);
        let this = TypeDecl::Interface(interface);
        let _ = self.inheritance.entry(this).or_default();
        for (i, &extends_ty) in decl.extends.iter().enumerate() {
            for &other_ty in decl.extends.iter().skip(i + 1) {
                if let (Some(a), Some(b)) =
                    (Self::resolved_decl(ast, extends_ty), Self::resolved_decl(ast, other_ty))
                    && a == b
                {
                    diag.report(
                        SemanticError::DuplicateSuperInterface {
                            name: decl.name.clone(),
                            range: decl.range,
                        }
                        .into_diagnostic(),
                    );
                }
            }
            match Self::resolved_decl(ast, extends_ty) {
                Some(parent @ TypeDecl::Interface(_)) => {
                    self.inheritance.entry(this).or_default().push(parent);
                }
                Some(TypeDecl::Class(_)) => diag.report(
                    SemanticError::InterfaceExtendsClass {
                        name: decl.name.clone(),
                        range: decl.range,
                    }
                    .into_diagnostic(),
                ),
                None => {}
            }
        }
    }

    // ===-- Method and member closures ----------------------------------=== //

    fn check_method_inheritance(&mut self, ast: &Ast, lu: &LinkingUnit, diag: &mut DiagnosticEngine) {
        let mut visited: FxHashSet<TypeDecl> = FxHashSet::default();
        for &unit in &lu.units {
            let Some(body) = ast.unit(unit).body else { continue };
            if !visited.contains(&body) {
                self.method_inheritance_helper(ast, body, &mut visited, diag);
            }
        }
    }

    /// Walks the inheritance DAG bottom-up, accumulating inherited methods
    /// and members. A super that is already `visited` but not yet finalised
    /// is on the current recursion path, which means a cycle.
    fn method_inheritance_helper(
        &mut self,
        ast: &Ast,
        decl: TypeDecl,
        visited: &mut FxHashSet<TypeDecl>,
        diag: &mut DiagnosticEngine,
    ) {
        let _ = visited.insert(decl);
        let mut inherited: Vec<MethodId> = Vec::new();
        let mut members: Vec<FieldId> = Vec::new();
        for parent in self.direct_supers(decl).to_vec() {
            if !visited.contains(&parent) {
                self.method_inheritance_helper(ast, parent, visited, diag);
            } else if !self.finalized.contains(&parent) {
                diag.report(
                    SemanticError::CyclicInheritance {
                        name: ast.type_decl_name(parent).to_string(),
                        range: ast.type_decl_range(parent),
                    }
                    .into_diagnostic(),
                );
                continue;
            }
            inherited.extend_from_slice(self.inherited_methods(parent));
            if let (TypeDecl::Class(class), TypeDecl::Class(_)) = (decl, parent) {
                // Inherited fields hidden by a redeclaration are dropped.
                for &member in self.inherited_members_in_order(parent) {
                    let hidden = ast
                        .class(class)
                        .fields
                        .iter()
                        .any(|&own| ast.field(own).name == ast.field(member).name);
                    if !hidden {
                        members.push(member);
                    }
                }
            }
        }
        match decl {
            TypeDecl::Class(class) => {
                self.check_class_methods(ast, class, &inherited, diag);
                self.check_class_constructors(ast, class, diag);
                members.extend(ast.class(class).fields.iter().copied());
            }
            TypeDecl::Interface(interface) => {
                self.check_interface_methods(ast, interface, &inherited, diag);
            }
        }
        let _ = self.inherited_members.insert(decl, members);
        let _ = self.finalized.insert(decl);
        debug!(
            "finalised {} with {} inherited methods",
            ast.type_decl_canonical_name(decl),
            self.inherited_methods(decl).len()
        );
    }

    fn check_class_methods(
        &mut self,
        ast: &Ast,
        class: ClassId,
        inherited: &[MethodId],
        diag: &mut DiagnosticEngine,
    ) {
        let decl = ast.class(class);
        let mut all_methods: Vec<MethodId> = Vec::new();
        let mut not_overridden: Vec<MethodId> = Vec::new();
        // No two declared methods may share a signature.
        for (i, &method) in decl.methods.iter().enumerate() {
            all_methods.push(method);
            for &other in decl.methods.iter().skip(i + 1) {
                if is_same_signature(ast, method, other) {
                    diag.report(
                        SemanticError::DuplicateMethodSignature {
                            name: ast.method(method).name.clone(),
                            range: ast.method(other).range,
                        }
                        .into_diagnostic(),
                    );
                }
            }
        }
        // A class declaring an abstract method must itself be abstract.
        if !decl.modifiers.is_abstract()
            && decl.methods.iter().any(|&m| ast.method(m).modifiers.is_abstract())
        {
            diag.report(
                SemanticError::AbstractMethodNotImplemented {
                    name: decl.name.clone(),
                    class: decl.name.clone(),
                    range: decl.range,
                    declared_at: decl.range,
                }
                .into_diagnostic(),
            );
        }
        // Replacement rules against every inherited method.
        for &other in inherited {
            let mut overridden = false;
            for &method in &decl.methods {
                if !is_same_signature(ast, method, other) {
                    continue;
                }
                overridden = true;
                self.check_replacement(ast, method, other, diag);
            }
            if !overridden {
                not_overridden.push(other);
            }
        }
        // Abstract methods that were not overridden must be implemented
        // somewhere among the inherited concrete methods.
        for (i, &method) in not_overridden.iter().enumerate() {
            let mut implemented = !ast.method(method).modifiers.is_abstract();
            for (j, &other) in not_overridden.iter().enumerate() {
                if i == j || !is_same_signature(ast, method, other) {
                    continue;
                }
                if !is_same_return(ast, method, other) {
                    diag.report(
                        SemanticError::BadOverrideReturn {
                            name: ast.method(other).name.clone(),
                            range: ast.method(other).range,
                        }
                        .into_diagnostic(),
                    );
                } else if !ast.method(other).modifiers.is_abstract() {
                    if ast.method(other).modifiers.is_protected()
                        && ast.method(method).modifiers.is_public()
                    {
                        diag.report(
                            SemanticError::BadOverrideProtectedOverPublic {
                                name: ast.method(other).name.clone(),
                                range: ast.method(other).range,
                            }
                            .into_diagnostic(),
                        );
                    }
                    implemented = true;
                }
            }
            if !implemented && !decl.modifiers.is_abstract() {
                diag.report(
                    SemanticError::AbstractMethodNotImplemented {
                        name: ast.method(method).name.clone(),
                        class: decl.name.clone(),
                        range: decl.range,
                        declared_at: ast.method(method).range,
                    }
                    .into_diagnostic(),
                );
            } else if implemented == !ast.method(method).modifiers.is_abstract() {
                // Keep exactly one closure entry per surviving signature.
                let duplicate =
                    all_methods.iter().any(|&kept| is_same_signature(ast, kept, method));
                if !duplicate {
                    all_methods.push(method);
                }
            }
        }
        let _ = self.inherited_methods.insert(TypeDecl::Class(class), all_methods);
    }

    /// The replacement (override) rules between one method and the method
    /// it replaces.
    fn check_replacement(
        &self,
        ast: &Ast,
        method: MethodId,
        replaced: MethodId,
        diag: &mut DiagnosticEngine,
    ) {
        let m = ast.method(method);
        let o = ast.method(replaced);
        if !is_same_return(ast, method, replaced) {
            diag.report(
                SemanticError::BadOverrideReturn { name: o.name.clone(), range: m.range }
                    .into_diagnostic(),
            );
        }
        if m.modifiers.is_static() != o.modifiers.is_static() {
            diag.report(
                SemanticError::BadOverrideStatic { name: o.name.clone(), range: m.range }
                    .into_diagnostic(),
            );
        }
        if m.modifiers.is_protected() && o.modifiers.is_public() {
            diag.report(
                SemanticError::BadOverrideProtectedOverPublic {
                    name: o.name.clone(),
                    range: m.range,
                }
                .into_diagnostic(),
            );
        }
        if o.modifiers.is_final() {
            diag.report(
                SemanticError::OverrideOfFinal { name: o.name.clone(), range: m.range }
                    .into_diagnostic(),
            );
        }
    }

    fn check_class_constructors(&self, ast: &Ast, class: ClassId, diag: &mut DiagnosticEngine) {
        let decl = ast.class(class);
        for (i, &ctor) in decl.constructors.iter().enumerate() {
            for &other in decl.constructors.iter().skip(i + 1) {
                if is_same_signature(ast, ctor, other) {
                    diag.report(
                        SemanticError::DuplicateConstructor {
                            name: decl.name.clone(),
                            range: ast.method(other).range,
                        }
                        .into_diagnostic(),
                    );
                }
            }
        }
    }

    fn check_interface_methods(
        &mut self,
        ast: &Ast,
        interface: InterfaceId,
        inherited: &[MethodId],
        diag: &mut DiagnosticEngine,
    ) {
        let decl = ast.interface(interface);
        let mut all_methods: Vec<MethodId> = Vec::new();
        for (i, &method) in decl.methods.iter().enumerate() {
            all_methods.push(method);
            for &other in decl.methods.iter().skip(i + 1) {
                if is_same_signature(ast, method, other) {
                    diag.report(
                        SemanticError::DuplicateMethodSignature {
                            name: ast.method(method).name.clone(),
                            range: ast.method(other).range,
                        }
                        .into_diagnostic(),
                    );
                }
            }
        }
        // Interface methods colliding with java.lang.Object methods must
        // compatibly replace them.
        if let Some(object_ty) = decl.object_super
            && let Type::Reference(TypeDecl::Class(object)) = ast.ty(object_ty)
        {
            for &method in &decl.methods {
                for &other in &ast.class(*object).methods {
                    if !is_same_signature(ast, method, other) {
                        continue;
                    }
                    if !is_same_return(ast, method, other) {
                        diag.report(
                            SemanticError::BadOverrideReturn {
                                name: ast.method(other).name.clone(),
                                range: decl.range,
                            }
                            .into_diagnostic(),
                        );
                    }
                    if ast.method(other).modifiers.is_final() {
                        diag.report(
                            SemanticError::OverrideOfFinal {
                                name: ast.method(other).name.clone(),
                                range: decl.range,
                            }
                            .into_diagnostic(),
                        );
                    }
                }
            }
        }
        // Inherited methods not redeclared here survive into the closure,
        // deduplicated by signature.
        for &method in inherited {
            let mut overridden = false;
            for &own in &decl.methods {
                if is_same_signature(ast, method, own) {
                    if !is_same_return(ast, method, own) {
                        diag.report(
                            SemanticError::BadOverrideReturn {
                                name: ast.method(method).name.clone(),
                                range: ast.method(own).range,
                            }
                            .into_diagnostic(),
                        );
                    } else {
                        overridden = true;
                    }
                }
            }
            if !overridden {
                let duplicate =
                    all_methods.iter().any(|&kept| is_same_signature(ast, kept, method));
                if !duplicate {
                    all_methods.push(method);
                } else {
                    // Same signature inherited twice: the return types must
                    // still agree.
                    for &kept in &all_methods {
                        if is_same_signature(ast, kept, method)
                            && !is_same_return(ast, kept, method)
                        {
                            diag.report(
                                SemanticError::BadOverrideReturn {
                                    name: ast.method(method).name.clone(),
                                    range: ast.method(method).range,
                                }
                                .into_diagnostic(),
                            );
                        }
                    }
                }
            }
        }
        let _ = self.inherited_methods.insert(TypeDecl::Interface(interface), all_methods);
    }
}
