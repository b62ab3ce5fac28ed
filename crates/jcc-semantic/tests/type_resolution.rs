//! Tests for the expression type resolver.

mod common;

use common::{Program, codes};
use jcc_ast::expr::{BinaryOpKind, ExprNodeKind, LiteralValue, UnaryOpKind};
use jcc_ast::ids::ExprId;
use jcc_ast::modifiers::{ModifierFlags, Modifiers};
use jcc_ast::ty::{BuiltInKind, Type};

fn public() -> Modifiers { Modifiers::new().with(ModifierFlags::PUBLIC) }

fn lit(value: u32) -> ExprNodeKind {
    ExprNodeKind::Literal { value: LiteralValue::Int(value) }
}

fn binop(op: BinaryOpKind) -> ExprNodeKind {
    ExprNodeKind::BinaryOp { op, var_assigned: None }
}

/// The recorded result type of the last node of an expression.
fn result_kind(p: &Program, expr: ExprId) -> Option<BuiltInKind> {
    let last = *p.ast.expr_node_ids(expr).last().unwrap();
    let ty = p.ast.expr_node(last).ty()?;
    match p.ast.ty(ty) {
        Type::BuiltIn(kind) => Some(*kind),
        _ => None,
    }
}

#[test]
fn test_arithmetic_promotion_yields_int() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![lit(1), lit(2), binop(BinaryOpKind::Add)]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    assert_eq!(result_kind(&p, expr), Some(BuiltInKind::Int));
}

#[test]
fn test_relational_comparison_yields_boolean() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![lit(1), lit(2), binop(BinaryOpKind::LessThan)]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    assert_eq!(result_kind(&p, expr), Some(BuiltInKind::Boolean));
}

#[test]
fn test_instanceof_against_primitive_is_rejected() {
    // Seed scenario: `x instanceof int` fails with both operand locations.
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let expr = p.expr(scope, vec![
        lit(4),
        ExprNodeKind::TypeNode { ty: int_ty },
        binop(BinaryOpKind::InstanceOf),
    ]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    let reported = codes(&sema.diag);
    assert!(
        reported.contains(&"invalid-binary-operand-types"),
        "instanceof on a primitive is rejected: {reported:?}"
    );
}

#[test]
fn test_boolean_operands_required_for_logic() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![lit(1), lit(0), binop(BinaryOpKind::And)]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"invalid-binary-operand-types"));
}

#[test]
fn test_unary_not_requires_boolean() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![lit(1), ExprNodeKind::UnaryOp { op: UnaryOpKind::Not }]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"invalid-unary-operand-type"));
}

#[test]
fn test_invalid_cast_between_unrelated_types() {
    // (C) true: a class cast applied to a boolean.
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let c_ty = p.unresolved(&["C"]);
    let expr = p.expr(scope, vec![
        ExprNodeKind::TypeNode { ty: c_ty },
        ExprNodeKind::Literal { value: LiteralValue::Bool(true) },
        ExprNodeKind::Cast,
    ]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"invalid-cast"));
}

#[test]
fn test_widening_cast_of_reference_is_accepted() {
    // (Base) derived-value via instance creation.
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "Base", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "Derived", Modifiers::new(), Some(&["Base"]));
    let ctor = p.ast.new_method(
        public(),
        "Derived",
        None,
        Vec::new(),
        true,
        None,
        jcc_source::types::SourceRange::synthetic(),
    );
    p.ast.class_add_method(derived, ctor);
    let _ = base;
    let scope = p.ast.scopes.new_scope(None);
    let base_ty = p.unresolved(&["Base"]);
    let derived_ty = p.unresolved(&["Derived"]);
    let expr = p.expr(scope, vec![
        ExprNodeKind::TypeNode { ty: base_ty },
        ExprNodeKind::TypeNode { ty: derived_ty },
        ExprNodeKind::ClassInstanceCreation { argc: 0 },
        ExprNodeKind::Cast,
    ]);
    let (_, caller) = p.add_class(&["a"], "E", Modifiers::new(), None);
    let _ = p.add_method_with_expr(caller, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "widening cast accepted: {:?}", codes(&sema.diag));
}

#[test]
fn test_operator_results_are_cached() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.expr(scope, vec![lit(1), lit(2), binop(BinaryOpKind::Multiply)]);
    let _ = p.add_method_with_expr(class, "m", public(), None, expr);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors());
    let op_node = *p.ast.expr_node_ids(expr).last().unwrap();
    let recorded = p.ast.expr_node(op_node).ty().expect("result recorded");
    // Re-running the type resolver returns the cached type instead of
    // recording a new one.
    let mut tr = jcc_semantic::eval::typeres::TypeResolver::new(
        sema.resolver.java_lang(),
        &sema.hierarchy,
    );
    let again = jcc_semantic::eval::evaluate(&mut tr, &mut p.ast, expr)
        .expect("second evaluation succeeds");
    assert_eq!(again, Some(recorded));
}
