//! The expression type resolver.
//!
//! Evaluates each postfix expression to a type, enforcing the conversion
//! rules in [`super::rules`]. The value domain is `Option<TypeId>`; `None`
//! is the result of calling a void method, which is only legal as a whole
//! expression statement.
//!
//! Once an operator node has a recorded result type it is never re-typed:
//! the cached type is returned. The expression resolver relies on this when
//! it types receiver subexpressions lazily.

use jcc_ast::arena::Ast;
use jcc_ast::expr::{BinaryOpKind, UnaryOpKind};
use jcc_ast::ids::{DeclRef, ExprNodeId, TypeId};
use jcc_ast::ty::Type;

use super::rules::TypeRules;
use super::{ExprEvaluator, Operand};
use crate::error::SemanticError;
use crate::hierarchy::HierarchyChecker;
use crate::name_resolver::JavaLang;

/// The type-resolving evaluator.
#[derive(Debug)]
pub struct TypeResolver<'h> {
    rules: TypeRules<'h>,
}

type V = Option<TypeId>;

impl<'h> TypeResolver<'h> {
    #[must_use]
    pub const fn new(java_lang: JavaLang, hierarchy: &'h HierarchyChecker) -> Self {
        Self { rules: TypeRules::new(java_lang, hierarchy) }
    }

    /// Returns the cached result type of an operator node, if recorded.
    fn cached(ast: &Ast, node: ExprNodeId) -> Option<TypeId> { ast.expr_node(node).ty() }

    /// Records and returns an operator's freshly computed result type.
    fn record(ast: &mut Ast, node: ExprNodeId, ty: TypeId) -> V {
        ast.resolve_expr_result(node, ty);
        Some(ty)
    }

    /// Builds the synthetic method type for a resolved method declaration.
    /// Constructors return a reference to their declaring class.
    fn method_type(ast: &mut Ast, method: jcc_ast::ids::MethodId) -> TypeId {
        let decl = ast.method(method);
        let params: Vec<TypeId> = decl.params.iter().map(|&p| ast.var(p).ty).collect();
        let ret = if decl.is_constructor {
            let parent = decl.parent.expect("constructor has a declaring class");
            Some(ast.new_type(Type::Reference(parent)))
        } else {
            decl.return_ty
        };
        ast.new_type(Type::Method { ret, params })
    }

    fn require_value(operand: &Operand<V>) -> TypeId {
        operand.value.expect("void value used as an operand")
    }
}

impl ExprEvaluator for TypeResolver<'_> {
    type Value = V;

    fn map_value(&mut self, ast: &mut Ast, node: ExprNodeId) -> Result<V, SemanticError> {
        // Methods map to a synthetic method type; everything else carries
        // its resolved type from the expression resolver.
        if let Some(DeclRef::Method(method)) = ast.expr_node(node).decl() {
            return Ok(Some(Self::method_type(ast, method)));
        }
        let ty = ast
            .expr_node(node)
            .ty()
            .expect("value node reached the type resolver without a resolved type");
        Ok(Some(ty))
    }

    fn eval_binary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        op: BinaryOpKind,
        lhs: Operand<V>,
        rhs: Operand<V>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let range = ast.expr_node(node).range;
        let lhs_ty = Self::require_value(&lhs);
        let rhs_ty = Self::require_value(&rhs);
        let ty = self.rules.binary_result(ast, op, lhs_ty, rhs_ty, range, lhs.range, rhs.range)?;
        Ok(Self::record(ast, node, ty))
    }

    fn eval_unary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        op: UnaryOpKind,
        operand: Operand<V>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let range = ast.expr_node(node).range;
        let operand_ty = Self::require_value(&operand);
        let ty = self.rules.unary_result(ast, op, operand_ty, range, operand.range)?;
        Ok(Self::record(ast, node, ty))
    }

    fn eval_member_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _lhs: Operand<V>,
        field: Operand<V>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let field_ty = Self::require_value(&field);
        Ok(Self::record(ast, node, field_ty))
    }

    fn eval_method_call(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        method: Operand<V>,
        args: Vec<Operand<V>>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let method_ty = Self::require_value(&method);
        let ret = self.check_call(ast, node, method_ty, &args)?;
        if let Some(ret) = ret
            && Self::cached(ast, node).is_none()
        {
            return Ok(Self::record(ast, node, ret));
        }
        Ok(ret)
    }

    fn eval_new_object(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<V>,
        args: Vec<Operand<V>>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let ctor_ty = Self::require_value(&ty);
        let ret = self.check_call(ast, node, ctor_ty, &args)?;
        let ret = ret.expect("constructor type has a return type");
        Ok(Self::record(ast, node, ret))
    }

    fn eval_new_array(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<V>,
        size: Operand<V>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let size_ty = Self::require_value(&size);
        if !ast.ty(size_ty).is_numeric() {
            return Err(SemanticError::InvalidUnaryOperandType {
                op: "new[]",
                operand: ast.type_to_string(size_ty),
                range: ast.expr_node(node).range,
                operand_range: size.range,
            });
        }
        let array_ty = Self::require_value(&ty);
        Ok(Self::record(ast, node, array_ty))
    }

    fn eval_array_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        array: Operand<V>,
        index: Operand<V>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let range = ast.expr_node(node).range;
        let array_ty = Self::require_value(&array);
        let index_ty = Self::require_value(&index);
        let Type::Array(elem) = ast.ty(array_ty) else {
            return Err(SemanticError::InvalidBinaryOperandTypes {
                op: "[]",
                lhs: ast.type_to_string(array_ty),
                rhs: ast.type_to_string(index_ty),
                range,
                lhs_range: array.range,
                rhs_range: index.range,
            });
        };
        let elem = *elem;
        if !ast.ty(index_ty).is_numeric() {
            return Err(SemanticError::InvalidBinaryOperandTypes {
                op: "[]",
                lhs: ast.type_to_string(array_ty),
                rhs: ast.type_to_string(index_ty),
                range,
                lhs_range: array.range,
                rhs_range: index.range,
            });
        }
        Ok(Self::record(ast, node, elem))
    }

    fn eval_cast(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<V>,
        value: Operand<V>,
    ) -> Result<V, SemanticError> {
        if let Some(ty) = Self::cached(ast, node) {
            return Ok(Some(ty));
        }
        let cast_ty = Self::require_value(&ty);
        let value_ty = Self::require_value(&value);
        if !self.rules.is_valid_cast(ast, value_ty, cast_ty) {
            return Err(SemanticError::InvalidCast {
                from: ast.type_to_string(value_ty),
                to: ast.type_to_string(cast_ty),
                range: ast.expr_node(node).range,
                from_range: value.range,
                to_range: ty.range,
            });
        }
        Ok(Self::record(ast, node, cast_ty))
    }
}

impl TypeResolver<'_> {
    /// Checks argument assignability against a method type's parameters and
    /// returns the method's return type (`None` for void).
    fn check_call(
        &self,
        ast: &Ast,
        node: ExprNodeId,
        method_ty: TypeId,
        args: &[Operand<V>],
    ) -> Result<V, SemanticError> {
        let (ret, params) = match ast.ty(method_ty) {
            Type::Method { ret, params } => (*ret, params.clone()),
            _ => panic!("callee did not evaluate to a method type"),
        };
        assert_eq!(params.len(), args.len(), "argument count mismatch survived resolution");
        for (param, arg) in params.iter().zip(args) {
            let arg_ty = Self::require_value(arg);
            if !self.rules.is_assignable_to(ast, *param, arg_ty) {
                return Err(SemanticError::MethodNotApplicable {
                    name: ast.type_to_string(*param),
                    range: ast.expr_node(node).range,
                });
            }
        }
        Ok(ret)
    }
}

/// Runs the type resolver over every expression of the linking unit,
/// recording result types on the operator nodes.
pub fn check_types(
    ast: &mut Ast,
    lu: &jcc_ast::decl::LinkingUnit,
    java_lang: JavaLang,
    hierarchy: &HierarchyChecker,
    nr: &crate::name_resolver::NameResolver,
    diag: &mut jcc_source::diagnostics::DiagnosticEngine,
) {
    for &unit in &lu.units {
        for expr in nr.collect_unit_exprs(ast, unit) {
            let mut tr = TypeResolver::new(java_lang, hierarchy);
            if let Err(err) = super::evaluate(&mut tr, ast, expr) {
                diag.report(err.into_diagnostic());
            }
        }
    }
}
