//! The static-context checker.
//!
//! Runs after type resolution. Propagates a small state per stack entry:
//! the resolved declaration (if any), the type, whether the entry is a
//! value (as opposed to a type), and whether it is an instance variable
//! access. Rejects `this` in static contexts, instance members in static
//! contexts, and static fields accessed through instance expressions.

use jcc_ast::arena::Ast;
use jcc_ast::expr::{BinaryOpKind, ExprNodeKind, UnaryOpKind};
use jcc_ast::ids::{DeclRef, ExprId, ExprNodeId, TypeDecl, TypeId};
use jcc_source::types::SourceRange;

use super::{ExprEvaluator, Operand, evaluate};
use crate::error::SemanticError;

/// The propagated state.
#[derive(Debug, Clone, Copy)]
pub struct StaticValue {
    pub decl: Option<DeclRef>,
    pub ty: Option<TypeId>,
    /// True for values, false for bare type operands
    pub is_value: bool,
    /// True when this entry reads an instance variable directly
    pub is_instance_var: bool,
}

/// The static-context checking evaluator.
#[derive(Debug)]
pub struct StaticChecker {
    is_static_context: bool,
    expr_range: SourceRange,
}

fn is_decl_static(ast: &Ast, decl: DeclRef) -> bool {
    match decl {
        DeclRef::Field(field) => ast.field(field).modifiers.is_static(),
        DeclRef::Method(method) => ast.method(method).modifiers.is_static(),
        DeclRef::Class(_) | DeclRef::Interface(_) | DeclRef::Var(_) => false,
    }
}

/// Whether a declaration is a member of a class (instance-capable).
fn has_class_parent(ast: &Ast, decl: DeclRef) -> bool {
    match decl {
        DeclRef::Field(field) => ast.field(field).parent.is_some(),
        DeclRef::Method(method) => {
            matches!(ast.method(method).parent, Some(TypeDecl::Class(_)))
        }
        DeclRef::Class(_) | DeclRef::Interface(_) | DeclRef::Var(_) => false,
    }
}

impl StaticChecker {
    #[must_use]
    pub const fn new() -> Self {
        Self { is_static_context: false, expr_range: SourceRange::synthetic() }
    }

    /// Checks one expression in the given context.
    pub fn check(
        &mut self,
        ast: &mut Ast,
        expr: ExprId,
        is_static_context: bool,
    ) -> Result<(), SemanticError> {
        self.is_static_context = is_static_context;
        self.expr_range = ast.expr(expr).range;
        let result = evaluate(self, ast, expr)?;
        // A bare instance-variable read is itself illegal in a static
        // context, even with no enclosing operator.
        if result.is_instance_var && self.is_static_context {
            return Err(self.illegal_instance_access());
        }
        Ok(())
    }

    const fn illegal_instance_access(&self) -> SemanticError {
        SemanticError::InstanceMemberInStatic { range: self.expr_range }
    }

    fn reject_instance_var(&self, value: &StaticValue) -> Result<(), SemanticError> {
        if value.is_instance_var && self.is_static_context {
            return Err(self.illegal_instance_access());
        }
        Ok(())
    }

    fn result(ast: &Ast, node: ExprNodeId) -> StaticValue {
        StaticValue {
            decl: None,
            ty: ast.expr_node(node).ty(),
            is_value: true,
            is_instance_var: false,
        }
    }
}

impl Default for StaticChecker {
    fn default() -> Self { Self::new() }
}

/// Runs the static-context checker over every expression of the linking
/// unit. Field initialisers are static contexts iff their field is static;
/// method bodies iff their method is static.
pub fn check_static_contexts(
    ast: &mut Ast,
    lu: &jcc_ast::decl::LinkingUnit,
    diag: &mut jcc_source::diagnostics::DiagnosticEngine,
) {
    use crate::name_resolver::collect_stmt_exprs;
    let mut checker = StaticChecker::new();
    for &unit in &lu.units {
        let Some(body) = ast.unit(unit).body else { continue };
        if let TypeDecl::Class(class) = body {
            for field in ast.class(class).fields.clone() {
                let is_static = ast.field(field).modifiers.is_static();
                if let Some(init) = ast.field(field).init
                    && let Err(err) = checker.check(ast, init, is_static)
                {
                    diag.report(err.into_diagnostic());
                }
            }
        }
        let methods: Vec<_> = match body {
            TypeDecl::Class(class) => {
                let decl = ast.class(class);
                decl.methods.iter().chain(&decl.constructors).copied().collect()
            }
            TypeDecl::Interface(interface) => ast.interface(interface).methods.clone(),
        };
        for method in methods {
            let is_static = ast.method(method).modifiers.is_static();
            let Some(stmt) = ast.method(method).body else { continue };
            let mut exprs = Vec::new();
            collect_stmt_exprs(ast, stmt, &mut exprs);
            for expr in exprs {
                if let Err(err) = checker.check(ast, expr, is_static) {
                    diag.report(err.into_diagnostic());
                }
            }
        }
    }
}

impl ExprEvaluator for StaticChecker {
    type Value = StaticValue;

    fn map_value(&mut self, ast: &mut Ast, node: ExprNodeId) -> Result<StaticValue, SemanticError> {
        match &ast.expr_node(node).kind {
            ExprNodeKind::This => {
                if self.is_static_context {
                    return Err(SemanticError::UseOfThisInStatic { range: self.expr_range });
                }
                Ok(StaticValue {
                    decl: ast.expr_node(node).decl(),
                    ty: ast.expr_node(node).ty(),
                    is_value: true,
                    is_instance_var: false,
                })
            }
            ExprNodeKind::Literal { .. } => Ok(StaticValue {
                decl: None,
                ty: ast.expr_node(node).ty(),
                is_value: true,
                is_instance_var: false,
            }),
            ExprNodeKind::TypeNode { .. } => Ok(StaticValue {
                decl: None,
                ty: ast.expr_node(node).ty(),
                is_value: false,
                is_instance_var: false,
            }),
            _ => {
                let decl = ast
                    .expr_node(node)
                    .decl()
                    .expect("name node reached the static checker unresolved");
                let is_instance_var = has_class_parent(ast, decl) && !is_decl_static(ast, decl);
                Ok(StaticValue {
                    decl: Some(decl),
                    ty: ast.expr_node(node).ty(),
                    is_value: true,
                    is_instance_var,
                })
            }
        }
    }

    fn eval_binary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _op: BinaryOpKind,
        lhs: Operand<StaticValue>,
        rhs: Operand<StaticValue>,
    ) -> Result<StaticValue, SemanticError> {
        self.reject_instance_var(&lhs.value)?;
        self.reject_instance_var(&rhs.value)?;
        Ok(Self::result(ast, node))
    }

    fn eval_unary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _op: UnaryOpKind,
        operand: Operand<StaticValue>,
    ) -> Result<StaticValue, SemanticError> {
        self.reject_instance_var(&operand.value)?;
        Ok(Self::result(ast, node))
    }

    fn eval_member_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        lhs: Operand<StaticValue>,
        field: Operand<StaticValue>,
    ) -> Result<StaticValue, SemanticError> {
        // The receiver is always a value here: static accesses through a
        // type name were reduced away by the expression resolver.
        debug_assert!(lhs.value.is_value, "member access receiver is a type");
        let field_decl =
            field.value.decl.expect("member access field is unresolved");
        self.reject_instance_var(&lhs.value)?;
        // `instance.f` where `f` is static is rejected.
        if is_decl_static(ast, field_decl) {
            return Err(SemanticError::StaticAccessThroughInstance { range: self.expr_range });
        }
        // The access consumed the instance; the result itself is a plain
        // value, not an instance-variable read.
        Ok(StaticValue {
            decl: Some(field_decl),
            ty: ast.expr_node(node).ty(),
            is_value: true,
            is_instance_var: false,
        })
    }

    fn eval_method_call(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        method: Operand<StaticValue>,
        args: Vec<Operand<StaticValue>>,
    ) -> Result<StaticValue, SemanticError> {
        debug_assert!(method.value.is_value && method.value.decl.is_some());
        self.reject_instance_var(&method.value)?;
        for arg in &args {
            self.reject_instance_var(&arg.value)?;
        }
        Ok(Self::result(ast, node))
    }

    fn eval_new_object(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _ty: Operand<StaticValue>,
        args: Vec<Operand<StaticValue>>,
    ) -> Result<StaticValue, SemanticError> {
        for arg in &args {
            self.reject_instance_var(&arg.value)?;
        }
        Ok(Self::result(ast, node))
    }

    fn eval_new_array(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _ty: Operand<StaticValue>,
        size: Operand<StaticValue>,
    ) -> Result<StaticValue, SemanticError> {
        self.reject_instance_var(&size.value)?;
        Ok(Self::result(ast, node))
    }

    fn eval_array_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        array: Operand<StaticValue>,
        index: Operand<StaticValue>,
    ) -> Result<StaticValue, SemanticError> {
        self.reject_instance_var(&array.value)?;
        self.reject_instance_var(&index.value)?;
        Ok(Self::result(ast, node))
    }

    fn eval_cast(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _ty: Operand<StaticValue>,
        value: Operand<StaticValue>,
    ) -> Result<StaticValue, SemanticError> {
        self.reject_instance_var(&value.value)?;
        Ok(Self::result(ast, node))
    }
}
