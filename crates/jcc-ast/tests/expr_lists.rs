//! Tests for postfix expression lists and their lock bits.

use jcc_ast::arena::Ast;
use jcc_ast::expr::{BinaryOpKind, ExprNodeKind, LiteralValue};
use jcc_source::types::SourceRange;

fn int_lit(ast: &mut Ast, value: u32) -> jcc_ast::ids::ExprNodeId {
    ast.new_expr_node(
        ExprNodeKind::Literal { value: LiteralValue::Int(value) },
        SourceRange::synthetic(),
    )
}

#[test]
fn test_push_back_links_nodes() {
    let mut ast = Ast::new();
    let scope = ast.scopes.new_scope(None);
    let expr = ast.new_expr(scope, SourceRange::synthetic());
    let a = int_lit(&mut ast, 1);
    let b = int_lit(&mut ast, 2);
    let op = ast.new_expr_node(
        ExprNodeKind::BinaryOp { op: BinaryOpKind::Add, var_assigned: None },
        SourceRange::synthetic(),
    );
    ast.expr_push(expr, a);
    ast.expr_push(expr, b);
    ast.expr_push(expr, op);

    assert_eq!(ast.expr(expr).len(), 3);
    assert_eq!(ast.expr_node_ids(expr), vec![a, b, op]);
    assert_eq!(ast.expr_node(a).next(), Some(b));
    assert_eq!(ast.expr_node(op).next(), None);
}

#[test]
fn test_concat_empties_the_source_list() {
    let mut ast = Ast::new();
    let scope = ast.scopes.new_scope(None);
    let lhs = ast.new_expr(scope, SourceRange::synthetic());
    let rhs = ast.new_expr(scope, SourceRange::synthetic());
    let a = int_lit(&mut ast, 1);
    let b = int_lit(&mut ast, 2);
    ast.expr_push(lhs, a);
    ast.expr_push(rhs, b);

    ast.expr_concat(lhs, rhs);
    assert_eq!(ast.expr(lhs).len(), 2);
    assert_eq!(ast.expr_node_ids(lhs), vec![a, b]);
    assert!(ast.expr(rhs).is_empty());
    assert_eq!(ast.expr(rhs).head(), None);
}

#[test]
fn test_lock_guards_reentrancy() {
    let mut ast = Ast::new();
    let a = int_lit(&mut ast, 1);
    assert!(ast.try_lock_expr_node(a), "first lock succeeds");
    assert!(!ast.try_lock_expr_node(a), "second lock is refused");
    ast.unlock_expr_node(a);
    assert!(ast.try_lock_expr_node(a), "unlock makes the node lockable again");
}

#[test]
#[should_panic(expected = "attempt to mutate locked node")]
fn test_push_through_locked_tail_panics() {
    let mut ast = Ast::new();
    let scope = ast.scopes.new_scope(None);
    let expr = ast.new_expr(scope, SourceRange::synthetic());
    let a = int_lit(&mut ast, 1);
    ast.expr_push(expr, a);
    let _ = ast.try_lock_expr_node(a);
    let b = int_lit(&mut ast, 2);
    ast.expr_push(expr, b);
}

#[test]
fn test_rebuild_expr_list_drops_nodes() {
    let mut ast = Ast::new();
    let scope = ast.scopes.new_scope(None);
    let expr = ast.new_expr(scope, SourceRange::synthetic());
    let a = int_lit(&mut ast, 1);
    let b = int_lit(&mut ast, 2);
    let c = int_lit(&mut ast, 3);
    ast.expr_push(expr, a);
    ast.expr_push(expr, b);
    ast.expr_push(expr, c);

    // Keep only the outer two nodes, as the resolver does when reducing
    // qualified names.
    ast.rebuild_expr_list(expr, &[a, c]);
    assert_eq!(ast.expr_node_ids(expr), vec![a, c]);
    assert_eq!(ast.expr(expr).len(), 2);
    assert_eq!(ast.expr_node(c).next(), None);
}

#[test]
fn test_operator_arity() {
    let kind = ExprNodeKind::MethodInvocation { argc: 3 };
    assert_eq!(kind.arity(), 4);
    let kind = ExprNodeKind::BinaryOp { op: BinaryOpKind::Multiply, var_assigned: None };
    assert_eq!(kind.arity(), 2);
    assert!(ExprNodeKind::This.is_value());
}
