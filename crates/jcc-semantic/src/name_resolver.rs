//! Name resolution.
//!
//! Builds the package tree for the whole linking unit, populates each
//! compilation unit's import table in shadowing order, and then resolves
//! every reachable unresolved type reference to its declaration. Lookup
//! failures are reported and traversal continues, so one run surfaces every
//! unresolvable name.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_ast::expr::ExprNodeKind;
use jcc_ast::ids::{ClassId, ExprId, FieldId, InterfaceId, StmtId, TypeDecl, TypeId, UnitId};
use jcc_ast::modifiers::{Modifiers, ModifierFlags};
use jcc_ast::stmt::StmtKind;
use jcc_ast::ty::{BuiltInKind, Type};
use jcc_source::diagnostics::DiagnosticEngine;
use jcc_source::types::SourceRange;
use log::debug;
use rustc_hash::FxHashMap;

use crate::error::SemanticError;
use crate::package_tree::{PackageTree, PkgChild, PkgId};

/// The `java.lang` (and `java.io`) declarations the type rules refer to.
///
/// Entries are `None` when the program does not provide the corresponding
/// standard-library shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaLang {
    pub object: Option<ClassId>,
    pub string: Option<ClassId>,
    pub cloneable: Option<InterfaceId>,
    pub serializable: Option<InterfaceId>,
}

/// The name resolver.
///
/// After [`NameResolver::init`] the package tree and per-unit import tables
/// exist; [`NameResolver::resolve`] then rewrites every reachable
/// unresolved type in place.
#[derive(Debug, Default)]
pub struct NameResolver {
    tree: PackageTree,
    imports: FxHashMap<UnitId, FxHashMap<String, PkgChild>>,
    unit_of_decl: FxHashMap<TypeDecl, UnitId>,
    java_lang: JavaLang,
    array_prototype: Option<ClassId>,
    array_length_field: Option<FieldId>,
}

impl NameResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Builds the package tree, the `java.lang` cache, the synthetic array
    /// prototype, and each unit's import table.
    pub fn init(&mut self, ast: &mut Ast, lu: &LinkingUnit, diag: &mut DiagnosticEngine) {
        self.build_symbol_table(ast, lu, diag);
        self.populate_java_lang_cache();
        self.create_array_prototype(ast);
        for &unit in &lu.units {
            self.build_import_table(ast, unit, diag);
        }
    }

    /// Resolves every reachable unresolved type in the linking unit, then
    /// applies the `java.lang.Object` self-reference guard and resolves the
    /// types written inside expressions.
    pub fn resolve(&mut self, ast: &mut Ast, lu: &LinkingUnit, diag: &mut DiagnosticEngine) {
        for &unit in &lu.units {
            self.resolve_unit_types(ast, unit, diag);
        }
        self.replace_object_self_reference(ast);
        for &unit in &lu.units {
            self.resolve_expr_type_nodes(ast, unit, diag);
        }
    }

    /// Looks up an entry in a unit's import table.
    #[must_use]
    pub fn get_import(&self, unit: UnitId, name: &str) -> Option<PkgChild> {
        self.imports.get(&unit).and_then(|table| table.get(name).copied())
    }

    /// The `java.lang` declaration cache.
    #[must_use]
    pub const fn java_lang(&self) -> JavaLang { self.java_lang }

    /// The shared synthetic array prototype declaration.
    #[must_use]
    pub const fn array_prototype(&self) -> Option<ClassId> { self.array_prototype }

    /// The `length` field of the array prototype.
    #[must_use]
    pub const fn array_length_field(&self) -> Option<FieldId> { self.array_length_field }

    /// The package tree built over the linking unit.
    #[must_use]
    pub const fn package_tree(&self) -> &PackageTree { &self.tree }

    /// The compilation unit a top-level declaration was parented into.
    #[must_use]
    pub fn unit_of(&self, decl: TypeDecl) -> Option<UnitId> {
        self.unit_of_decl.get(&decl).copied()
    }

    // ===-- Symbol table construction ----------------------------------=== //

    fn build_symbol_table(&mut self, ast: &mut Ast, lu: &LinkingUnit, diag: &mut DiagnosticEngine) {
        for &unit in &lu.units {
            ast.lock_type(ast.unit(unit).package);
            let parts: Vec<String> = ast.package_parts(unit).to_vec();
            let range = ast.unit(unit).range;
            // Walk the dotted package name, creating nodes on demand.
            let mut pkg = PkgId::root();
            let mut shadowed = false;
            for part in &parts {
                match self.tree.get_or_create_package(pkg, part) {
                    Some(next) => pkg = next,
                    None => {
                        // The name is taken by a declaration, cf. JLS 6.4.1.
                        diag.report(
                            SemanticError::SubpackageShadowsDecl { name: part.clone(), range }
                                .into_diagnostic(),
                        );
                        shadowed = true;
                        break;
                    }
                }
            }
            if shadowed {
                continue;
            }
            let Some(body) = ast.unit(unit).body else { continue };
            let name = ast.type_decl_name(body).to_string();
            if self.tree.insert_decl(pkg, &name, body) {
                let _ = self.unit_of_decl.insert(body, unit);
            } else {
                diag.report(
                    SemanticError::DuplicateDeclInPackage { name, range }.into_diagnostic(),
                );
            }
        }
    }

    fn populate_java_lang_cache(&mut self) {
        let lang = self.tree.resolve_package_path(&["java", "lang"]);
        let io = self.tree.resolve_package_path(&["java", "io"]);
        let class_in = |tree: &PackageTree, pkg: Option<PkgId>, name: &str| match pkg
            .and_then(|p| tree.lookup(p, name))
        {
            Some(PkgChild::Decl(TypeDecl::Class(id))) => Some(id),
            _ => None,
        };
        let interface_in = |tree: &PackageTree, pkg: Option<PkgId>, name: &str| match pkg
            .and_then(|p| tree.lookup(p, name))
        {
            Some(PkgChild::Decl(TypeDecl::Interface(id))) => Some(id),
            _ => None,
        };
        self.java_lang = JavaLang {
            object: class_in(&self.tree, lang, "Object"),
            string: class_in(&self.tree, lang, "String"),
            cloneable: interface_in(&self.tree, lang, "Cloneable"),
            serializable: interface_in(&self.tree, lang, "Serializable")
                .or_else(|| interface_in(&self.tree, io, "Serializable")),
        };
    }

    /// Creates the single synthetic declaration shared by every array type.
    /// It carries the one member arrays expose: `public final int length`.
    fn create_array_prototype(&mut self, ast: &mut Ast) {
        let modifiers =
            Modifiers::new().with(ModifierFlags::PUBLIC).with(ModifierFlags::FINAL);
        let class = ast.new_class(
            Modifiers::new().with(ModifierFlags::PUBLIC),
            "[array]",
            None,
            Vec::new(),
            SourceRange::synthetic(),
        );
        let int_ty = ast.new_builtin(BuiltInKind::Int);
        let length =
            ast.new_field(modifiers, int_ty, "length", None, SourceRange::synthetic());
        ast.class_add_field(class, length);
        self.array_prototype = Some(class);
        self.array_length_field = Some(length);
    }

    // ===-- Import tables ----------------------------------------------=== //

    /// Populates one unit's import table in shadowing order, lowest first:
    /// top-level packages, import-on-demand declarations, declarations in
    /// the same package, single-type imports, the unit's own declaration.
    fn build_import_table(&mut self, ast: &Ast, unit: UnitId, diag: &mut DiagnosticEngine) {
        let mut table: FxHashMap<String, PkgChild> = FxHashMap::default();
        // 1. Top-level packages. These shadow nothing.
        for (name, child) in self.tree.children(PkgId::root()) {
            if let PkgChild::Package(_) = child {
                let _ = table.insert(name.to_string(), child);
            }
        }
        // 2. Import-on-demand declarations. They may shadow packages but
        //    never other declarations.
        for import in &ast.unit(unit).imports {
            if !import.on_demand {
                continue;
            }
            let Some(pkg) = self.resolve_import_package(ast, import.ty, diag) else { continue };
            for (name, child) in self.tree.children(pkg) {
                if let PkgChild::Decl(_) = child {
                    let _ = table.insert(name.to_string(), child);
                }
            }
        }
        // 3. All declarations in the same package (other units included).
        let parts: Vec<String> = ast.package_parts(unit).to_vec();
        if let Some(pkg) = self.tree.resolve_package_path(&parts) {
            for (name, child) in self.tree.children(pkg) {
                if let PkgChild::Decl(_) = child {
                    let _ = table.insert(name.to_string(), child);
                }
            }
        }
        // 4. Single-type imports shadow everything so far.
        for import in &ast.unit(unit).imports {
            if import.on_demand {
                continue;
            }
            let parts = self.unresolved_parts(ast, import.ty);
            let range = ast.unit(unit).range;
            let Some((last, prefix)) = parts.split_last() else { continue };
            let resolved = self
                .tree
                .resolve_package_path(prefix)
                .and_then(|pkg| self.tree.lookup(pkg, last));
            match resolved {
                Some(child @ PkgChild::Decl(_)) => {
                    let _ = table.insert(last.clone(), child);
                }
                _ => diag.report(
                    SemanticError::UnresolvedImport { name: parts.join("."), range }
                        .into_diagnostic(),
                ),
            }
        }
        // 5. The unit's own top-level declaration shadows everything.
        if let Some(body) = ast.unit(unit).body {
            let _ =
                table.insert(ast.type_decl_name(body).to_string(), PkgChild::Decl(body));
        }
        let _ = self.imports.insert(unit, table);
    }

    /// Resolves an on-demand import's dotted prefix to a package node.
    fn resolve_import_package(
        &self,
        ast: &Ast,
        ty: TypeId,
        diag: &mut DiagnosticEngine,
    ) -> Option<PkgId> {
        let parts = self.unresolved_parts(ast, ty);
        let pkg = self.tree.resolve_package_path(&parts);
        if pkg.is_none() {
            diag.report(
                SemanticError::UnresolvedImport {
                    name: parts.join("."),
                    range: SourceRange::synthetic(),
                }
                .into_diagnostic(),
            );
        }
        pkg
    }

    fn unresolved_parts(&self, ast: &Ast, ty: TypeId) -> Vec<String> {
        match ast.ty(ty) {
            Type::Unresolved { parts, .. } => parts.clone(),
            _ => Vec::new(),
        }
    }

    // ===-- Type resolution --------------------------------------------=== //

    /// Resolves a single unresolved type slot against a unit's import table.
    ///
    /// Reports and invalidates the slot on failure so later passes can tell
    /// "failed" apart from "not yet visited".
    pub fn resolve_type_in(
        &self,
        ast: &mut Ast,
        unit: UnitId,
        ty: TypeId,
        diag: &mut DiagnosticEngine,
    ) {
        // Arrays resolve through their element type.
        if let Type::Array(elem) = ast.ty(ty) {
            let elem = *elem;
            self.resolve_type_in(ast, unit, elem, diag);
            return;
        }
        let (parts, valid) = match ast.ty(ty) {
            Type::Unresolved { parts, valid, .. } => (parts.clone(), *valid),
            // Already resolved (or a primitive); nothing to do.
            _ => return,
        };
        if !valid {
            return;
        }
        let resolution = if parts.len() == 1 {
            // Simple name: the import table decides.
            match self.get_import(unit, &parts[0]) {
                Some(PkgChild::Decl(decl)) => Some(decl),
                _ => None,
            }
        } else {
            // Qualified name: the prefix must be packages all the way down;
            // a declaration in the middle of the path is not a type position.
            let (last, prefix) = parts.split_last().expect("qualified name has parts");
            match self
                .tree
                .resolve_package_path(prefix)
                .and_then(|pkg| self.tree.lookup(pkg, last))
            {
                Some(PkgChild::Decl(decl)) => Some(decl),
                _ => None,
            }
        };
        match resolution {
            Some(decl) => ast.resolve_type(ty, decl),
            None => {
                let range = ast.unit(unit).range;
                diag.report(
                    SemanticError::UnresolvedType { name: parts.join("."), range }
                        .into_diagnostic(),
                );
                ast.invalidate_type(ty);
            }
        }
    }

    /// Depth-first resolution of every type slot reachable from a unit.
    fn resolve_unit_types(&self, ast: &mut Ast, unit: UnitId, diag: &mut DiagnosticEngine) {
        let Some(body) = ast.unit(unit).body else { return };
        debug!("resolving types in unit of {}", ast.type_decl_canonical_name(body));
        let mut worklist: Vec<TypeId> = Vec::new();
        match body {
            TypeDecl::Class(id) => {
                let decl = ast.class(id);
                worklist.extend(decl.super_class);
                worklist.extend(decl.object_super);
                worklist.extend(decl.interfaces.iter().copied());
                for &field in &decl.fields {
                    worklist.push(ast.field(field).ty);
                }
                for &method in decl.methods.iter().chain(&decl.constructors) {
                    self.collect_method_types(ast, method, &mut worklist);
                }
            }
            TypeDecl::Interface(id) => {
                let decl = ast.interface(id);
                worklist.extend(decl.extends.iter().copied());
                worklist.extend(decl.object_super);
                for &method in &decl.methods {
                    self.collect_method_types(ast, method, &mut worklist);
                }
            }
        }
        for ty in worklist {
            self.resolve_type_in(ast, unit, ty, diag);
        }
    }

    fn collect_method_types(&self, ast: &Ast, method: jcc_ast::ids::MethodId, out: &mut Vec<TypeId>) {
        let decl = ast.method(method);
        out.extend(decl.return_ty);
        for &param in &decl.params {
            out.push(ast.var(param).ty);
        }
        for &local in &decl.locals {
            out.push(ast.var(local).ty);
        }
    }

    /// The implicit `java.lang.Object` super reference of the `Object`
    /// declaration itself is dropped after resolution, so `Object` does not
    /// extend itself.
    fn replace_object_self_reference(&self, ast: &mut Ast) {
        if let Some(object) = self.java_lang.object {
            ast.class_mut(object).object_super = None;
        }
    }

    // ===-- Expression type nodes --------------------------------------=== //

    /// Resolves the types written inside expressions (`TypeNode` wrappers):
    /// cast targets, `instanceof` operands, creation expressions.
    fn resolve_expr_type_nodes(&self, ast: &mut Ast, unit: UnitId, diag: &mut DiagnosticEngine) {
        for expr in self.collect_unit_exprs(ast, unit) {
            for node in ast.expr_node_ids(expr) {
                let ExprNodeKind::TypeNode { ty } = &ast.expr_node(node).kind else { continue };
                let ty = *ty;
                if !ast.type_is_resolved(ty) {
                    self.resolve_type_in(ast, unit, ty, diag);
                }
                // An unresolved result here is tolerated; it only remains
                // legal if this pass ends with no errors outstanding.
                if ast.type_is_resolved(ty) && ast.expr_node(node).ty().is_none() {
                    ast.resolve_expr_result(node, ty);
                }
            }
        }
    }

    /// Collects every expression reachable from a unit: field initialisers,
    /// variable initialisers and all statements of all method bodies.
    #[must_use]
    pub fn collect_unit_exprs(&self, ast: &Ast, unit: UnitId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let Some(body) = ast.unit(unit).body else { return out };
        if let TypeDecl::Class(id) = body {
            for &field in &ast.class(id).fields {
                out.extend(ast.field(field).init);
            }
        }
        let methods: Vec<_> = match body {
            TypeDecl::Class(id) => {
                let decl = ast.class(id);
                decl.methods.iter().chain(&decl.constructors).copied().collect()
            }
            TypeDecl::Interface(id) => ast.interface(id).methods.clone(),
        };
        for method in methods {
            if let Some(stmt) = ast.method(method).body {
                collect_stmt_exprs(ast, stmt, &mut out);
            }
        }
        out
    }
}

/// Collects every expression under a statement, recursively.
pub fn collect_stmt_exprs(ast: &Ast, stmt: StmtId, out: &mut Vec<ExprId>) {
    match &ast.stmt(stmt).kind {
        StmtKind::Block(stmts) => {
            for &s in stmts {
                collect_stmt_exprs(ast, s, out);
            }
        }
        StmtKind::LocalDecl(var) => out.extend(ast.var(*var).init),
        StmtKind::Expr(expr) => out.push(*expr),
        StmtKind::If { cond, then_stmt, else_stmt } => {
            out.push(*cond);
            collect_stmt_exprs(ast, *then_stmt, out);
            if let Some(else_stmt) = else_stmt {
                collect_stmt_exprs(ast, *else_stmt, out);
            }
        }
        StmtKind::While { cond, body } => {
            out.push(*cond);
            collect_stmt_exprs(ast, *body, out);
        }
        StmtKind::For { init, cond, update, body } => {
            if let Some(init) = init {
                collect_stmt_exprs(ast, *init, out);
            }
            out.extend(*cond);
            if let Some(update) = update {
                collect_stmt_exprs(ast, *update, out);
            }
            collect_stmt_exprs(ast, *body, out);
        }
        StmtKind::Return(expr) => out.extend(*expr),
        StmtKind::Null => {}
    }
}
