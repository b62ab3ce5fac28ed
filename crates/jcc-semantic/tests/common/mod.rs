//! Shared helpers for assembling test programs directly in the AST arena.
//!
//! The parser is an external collaborator, so tests build declarations and
//! postfix expressions through the arena API.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_ast::expr::ExprNodeKind;
use jcc_ast::ids::{ClassId, ExprId, ScopeId, TypeDecl, TypeId, UnitId};
use jcc_ast::modifiers::{ModifierFlags, Modifiers};
use jcc_ast::stmt::StmtKind;
use jcc_ast::ty::Type;
use jcc_source::types::SourceRange;

/// A program under construction.
pub struct Program {
    pub ast: Ast,
    pub lu: LinkingUnit,
}

#[allow(dead_code)]
impl Program {
    pub fn new() -> Self { Self { ast: Ast::new(), lu: LinkingUnit::default() } }

    /// Adds `java.lang.Object` with no members.
    pub fn add_object(&mut self) -> ClassId {
        let (_, class) = self.add_class(&["java", "lang"], "Object", Modifiers::new(), None);
        class
    }

    /// Adds an empty public class in the given package. `super_parts` is
    /// the dotted name of the `extends` clause, if any.
    pub fn add_class(
        &mut self,
        pkg: &[&str],
        name: &str,
        modifiers: Modifiers,
        super_parts: Option<&[&str]>,
    ) -> (UnitId, ClassId) {
        let pkg: Vec<String> = pkg.iter().map(|s| (*s).to_string()).collect();
        let unit = self.ast.new_unit(pkg, Vec::new(), SourceRange::synthetic());
        let super_ty = super_parts.map(|parts| self.unresolved(parts));
        let class =
            self.ast.new_class(modifiers, name, super_ty, Vec::new(), SourceRange::synthetic());
        self.ast.set_unit_body(unit, TypeDecl::Class(class));
        self.lu.units.push(unit);
        (unit, class)
    }

    /// Adds an empty public interface in the given package.
    pub fn add_interface(
        &mut self,
        pkg: &[&str],
        name: &str,
        extends: Vec<TypeId>,
    ) -> (UnitId, jcc_ast::ids::InterfaceId) {
        let pkg: Vec<String> = pkg.iter().map(|s| (*s).to_string()).collect();
        let unit = self.ast.new_unit(pkg, Vec::new(), SourceRange::synthetic());
        let interface = self.ast.new_interface(
            Modifiers::new().with(ModifierFlags::PUBLIC),
            name,
            extends,
            SourceRange::synthetic(),
        );
        self.ast.set_unit_body(unit, TypeDecl::Interface(interface));
        self.lu.units.push(unit);
        (unit, interface)
    }

    /// An unresolved reference type from dotted parts.
    pub fn unresolved(&mut self, parts: &[&str]) -> TypeId {
        let parts: Vec<String> = parts.iter().map(|s| (*s).to_string()).collect();
        self.ast.new_type(Type::unresolved(parts))
    }

    /// A fresh postfix expression over the given node kinds.
    pub fn expr(&mut self, scope: ScopeId, kinds: Vec<ExprNodeKind>) -> ExprId {
        let expr = self.ast.new_expr(scope, SourceRange::synthetic());
        for kind in kinds {
            let node = self.ast.new_expr_node(kind, SourceRange::synthetic());
            self.ast.expr_push(expr, node);
        }
        expr
    }

    /// Wraps an expression into a method body `{ expr; }` and attaches it
    /// to a new method on the class.
    pub fn add_method_with_expr(
        &mut self,
        class: ClassId,
        name: &str,
        modifiers: Modifiers,
        return_ty: Option<TypeId>,
        expr: ExprId,
    ) -> jcc_ast::ids::MethodId {
        let stmt = self.ast.new_stmt(StmtKind::Expr(expr), SourceRange::synthetic());
        let body = self.ast.new_stmt(StmtKind::Block(vec![stmt]), SourceRange::synthetic());
        let method = self.ast.new_method(
            modifiers,
            name,
            return_ty,
            Vec::new(),
            false,
            Some(body),
            SourceRange::synthetic(),
        );
        self.ast.class_add_method(class, method);
        method
    }

    /// Adds a bodyless method with the given parameter types.
    pub fn add_method(
        &mut self,
        decl: TypeDecl,
        name: &str,
        modifiers: Modifiers,
        return_ty: Option<TypeId>,
        param_tys: Vec<TypeId>,
        scope: ScopeId,
    ) -> jcc_ast::ids::MethodId {
        let params: Vec<_> = param_tys
            .into_iter()
            .enumerate()
            .map(|(i, ty)| {
                self.ast.new_var(ty, format!("p{i}"), None, scope, SourceRange::synthetic())
            })
            .collect();
        let method = self.ast.new_method(
            modifiers,
            name,
            return_ty,
            params,
            false,
            None,
            SourceRange::synthetic(),
        );
        match decl {
            TypeDecl::Class(class) => self.ast.class_add_method(class, method),
            TypeDecl::Interface(interface) => self.ast.interface_add_method(interface, method),
        }
        method
    }

    /// Runs the full semantic pipeline.
    pub fn analyze(&mut self) -> jcc_semantic::context::SemanticContext {
        jcc_semantic::context::SemanticContext::analyze(&mut self.ast, &self.lu)
    }
}

/// The error codes the engine collected, in report order.
#[allow(dead_code)]
pub fn codes(diag: &jcc_source::diagnostics::DiagnosticEngine) -> Vec<&'static str> {
    diag.errors().iter().map(|d| d.code).collect()
}
