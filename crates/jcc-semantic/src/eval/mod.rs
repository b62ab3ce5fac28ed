//! The expression evaluator framework.
//!
//! An evaluator walks a postfix expression list running a stack machine:
//! value nodes push one entry, operator nodes of arity N pop N entries and
//! push one. The three concrete evaluators share this driver and differ
//! only in their value domain:
//!
//! - [`resolver::ExprResolver`] reclassifies names and attaches declarations;
//! - [`typeres::TypeResolver`] computes and records expression types;
//! - [`static_check::StaticChecker`] enforces static-context legality.
//!
//! While an evaluator holds a node, the node's lock bit is set; pushing to a
//! locked list is a programming error and nested evaluation only unlocks
//! the nodes it locked itself.

pub mod resolver;
pub mod rules;
pub mod static_check;
pub mod typeres;

use jcc_ast::arena::Ast;
use jcc_ast::expr::{BinaryOpKind, ExprNodeKind, UnaryOpKind};
use jcc_ast::ids::{ExprId, ExprNodeId};
use jcc_source::types::SourceRange;

use crate::error::SemanticError;

/// A value on the evaluator stack, paired with the source range of the
/// subexpression that produced it.
#[derive(Debug, Clone)]
pub struct Operand<V> {
    pub value: V,
    pub range: SourceRange,
}

/// One concrete evaluator: a value domain plus one callback per node kind.
///
/// Callbacks receive the operator's node handle (for attaching results) and
/// the already-evaluated operands in source order.
pub trait ExprEvaluator {
    /// The value domain of this evaluator.
    type Value;

    /// Maps an arity-0 (value) node into the domain.
    fn map_value(&mut self, ast: &mut Ast, node: ExprNodeId)
    -> Result<Self::Value, SemanticError>;

    fn eval_binary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        op: BinaryOpKind,
        lhs: Operand<Self::Value>,
        rhs: Operand<Self::Value>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_unary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        op: UnaryOpKind,
        operand: Operand<Self::Value>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_member_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        lhs: Operand<Self::Value>,
        field: Operand<Self::Value>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_method_call(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        method: Operand<Self::Value>,
        args: Vec<Operand<Self::Value>>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_new_object(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<Self::Value>,
        args: Vec<Operand<Self::Value>>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_new_array(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<Self::Value>,
        size: Operand<Self::Value>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_array_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        array: Operand<Self::Value>,
        index: Operand<Self::Value>,
    ) -> Result<Self::Value, SemanticError>;

    fn eval_cast(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<Self::Value>,
        value: Operand<Self::Value>,
    ) -> Result<Self::Value, SemanticError>;
}

/// Evaluates a whole expression list.
pub fn evaluate<E: ExprEvaluator>(
    eval: &mut E,
    ast: &mut Ast,
    expr: ExprId,
) -> Result<E::Value, SemanticError> {
    let nodes = ast.expr_node_ids(expr);
    evaluate_nodes(eval, ast, &nodes)
}

/// Evaluates a node sequence in postfix order.
///
/// This is the nesting entry point: the expression resolver re-evaluates
/// already-resolved subsequences through here to learn their types.
///
/// ## Panics
///
/// Panics if the sequence is not a well-formed postfix program (operator
/// arity underflow, or more than one value left at the end).
pub fn evaluate_nodes<E: ExprEvaluator>(
    eval: &mut E,
    ast: &mut Ast,
    nodes: &[ExprNodeId],
) -> Result<E::Value, SemanticError> {
    let mut locked_by_me: Vec<ExprNodeId> = Vec::new();
    let result = evaluate_nodes_inner(eval, ast, nodes, &mut locked_by_me);
    // Only release the locks this evaluation took; an enclosing evaluation
    // keeps its own.
    for node in locked_by_me {
        ast.unlock_expr_node(node);
    }
    result
}

fn evaluate_nodes_inner<E: ExprEvaluator>(
    eval: &mut E,
    ast: &mut Ast,
    nodes: &[ExprNodeId],
    locked_by_me: &mut Vec<ExprNodeId>,
) -> Result<E::Value, SemanticError> {
    let mut stack: Vec<Operand<E::Value>> = Vec::new();
    for &node in nodes {
        if ast.try_lock_expr_node(node) {
            locked_by_me.push(node);
        }
        let range = ast.expr_node(node).range;
        let arity = ast.expr_node(node).kind.arity();
        assert!(stack.len() >= arity, "postfix expression underflow");
        let operands = stack.split_off(stack.len() - arity);
        let operand_ranges: Vec<SourceRange> = operands.iter().map(|o| o.range).collect();
        let value = dispatch(eval, ast, node, operands)?;
        let range = stack_range(range, &operand_ranges);
        stack.push(Operand { value, range });
    }
    assert_eq!(stack.len(), 1, "postfix expression did not reduce to a single value");
    Ok(stack.pop().expect("stack holds the result").value)
}

fn stack_range(node_range: SourceRange, operands: &[SourceRange]) -> SourceRange {
    operands.iter().fold(node_range, |acc, r| acc.merge(r))
}

fn dispatch<E: ExprEvaluator>(
    eval: &mut E,
    ast: &mut Ast,
    node: ExprNodeId,
    mut operands: Vec<Operand<E::Value>>,
) -> Result<E::Value, SemanticError> {
    enum Op {
        Value,
        Binary(BinaryOpKind),
        Unary(UnaryOpKind),
        MemberAccess,
        MethodCall,
        NewObject,
        NewArray,
        ArrayAccess,
        Cast,
    }
    let op = match &ast.expr_node(node).kind {
        ExprNodeKind::MemberName { .. }
        | ExprNodeKind::MethodName { .. }
        | ExprNodeKind::This
        | ExprNodeKind::TypeNode { .. }
        | ExprNodeKind::Literal { .. } => Op::Value,
        ExprNodeKind::BinaryOp { op, .. } => Op::Binary(*op),
        ExprNodeKind::UnaryOp { op } => Op::Unary(*op),
        ExprNodeKind::MemberAccess => Op::MemberAccess,
        ExprNodeKind::MethodInvocation { .. } => Op::MethodCall,
        ExprNodeKind::ClassInstanceCreation { .. } => Op::NewObject,
        ExprNodeKind::ArrayInstanceCreation => Op::NewArray,
        ExprNodeKind::ArrayAccess => Op::ArrayAccess,
        ExprNodeKind::Cast => Op::Cast,
    };
    match op {
        Op::Value => eval.map_value(ast, node),
        Op::Binary(kind) => {
            let rhs = operands.pop().expect("binary rhs");
            let lhs = operands.pop().expect("binary lhs");
            eval.eval_binary(ast, node, kind, lhs, rhs)
        }
        Op::Unary(kind) => {
            let operand = operands.pop().expect("unary operand");
            eval.eval_unary(ast, node, kind, operand)
        }
        Op::MemberAccess => {
            let field = operands.pop().expect("member access field");
            let lhs = operands.pop().expect("member access receiver");
            eval.eval_member_access(ast, node, lhs, field)
        }
        Op::MethodCall => {
            let method = operands.remove(0);
            eval.eval_method_call(ast, node, method, operands)
        }
        Op::NewObject => {
            let ty = operands.remove(0);
            eval.eval_new_object(ast, node, ty, operands)
        }
        Op::NewArray => {
            let size = operands.pop().expect("array creation size");
            let ty = operands.pop().expect("array creation type");
            eval.eval_new_array(ast, node, ty, size)
        }
        Op::ArrayAccess => {
            let index = operands.pop().expect("array access index");
            let array = operands.pop().expect("array access base");
            eval.eval_array_access(ast, node, array, index)
        }
        Op::Cast => {
            let value = operands.pop().expect("cast value");
            let ty = operands.pop().expect("cast type");
            eval.eval_cast(ast, node, ty, value)
        }
    }
}
