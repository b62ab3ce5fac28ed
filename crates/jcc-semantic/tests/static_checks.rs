//! Tests for the static-context checker.

mod common;

use common::{Program, codes};
use jcc_ast::expr::ExprNodeKind;
use jcc_ast::modifiers::{ModifierFlags, Modifiers};
use jcc_ast::ty::BuiltInKind;
use jcc_source::types::SourceRange;

fn public() -> Modifiers { Modifiers::new().with(ModifierFlags::PUBLIC) }

fn public_static() -> Modifiers {
    Modifiers::new().with(ModifierFlags::PUBLIC).with(ModifierFlags::STATIC)
}

#[test]
fn test_this_in_static_context_is_rejected() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![ExprNodeKind::This]);
    let _ = p.add_method_with_expr(class, "m", public_static(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"use-of-this-in-static"));
}

#[test]
fn test_instance_field_in_static_context_is_rejected() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let field = p.ast.new_field(public(), int_ty, "f", None, SourceRange::synthetic());
    p.ast.class_add_field(class, field);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![ExprNodeKind::MemberName { name: "f".to_string() }]);
    let _ = p.add_method_with_expr(class, "m", public_static(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"instance-member-in-static"));
}

#[test]
fn test_static_field_through_instance_is_rejected() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let field = p.ast.new_field(public_static(), int_ty, "s", None, SourceRange::synthetic());
    p.ast.class_add_field(class, field);
    let scope = p.ast.scopes.new_scope(None);
    // this.s where s is static.
    let expr = p.expr(scope, vec![
        ExprNodeKind::This,
        ExprNodeKind::MemberName { name: "s".to_string() },
        ExprNodeKind::MemberAccess,
    ]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"static-access-through-instance"));
}

#[test]
fn test_instance_field_through_this_is_accepted() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let field = p.ast.new_field(public(), int_ty, "f", None, SourceRange::synthetic());
    p.ast.class_add_field(class, field);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![
        ExprNodeKind::This,
        ExprNodeKind::MemberName { name: "f".to_string() },
        ExprNodeKind::MemberAccess,
    ]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "instance access accepted: {:?}", codes(&sema.diag));
}

#[test]
fn test_static_field_in_static_context_is_accepted() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let field = p.ast.new_field(public_static(), int_ty, "s", None, SourceRange::synthetic());
    p.ast.class_add_field(class, field);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![ExprNodeKind::MemberName { name: "s".to_string() }]);
    let _ = p.add_method_with_expr(class, "m", public_static(), None, expr);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "static access accepted: {:?}", codes(&sema.diag));
}

#[test]
fn test_instance_method_call_in_static_context_is_rejected() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let _ = p.add_method(
        jcc_ast::ids::TypeDecl::Class(class),
        "g",
        public(),
        None,
        Vec::new(),
        scope,
    );
    let expr = p.expr(scope, vec![
        ExprNodeKind::MethodName { name: "g".to_string() },
        ExprNodeKind::MethodInvocation { argc: 0 },
    ]);
    let _ = p.add_method_with_expr(class, "m", public_static(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"instance-member-in-static"));
}
