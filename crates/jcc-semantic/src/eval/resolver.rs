//! The expression resolver.
//!
//! Reclassifies every simple name inside a postfix expression (JLS 6.5)
//! into a package, type, expression or method name, attaches the resolved
//! declarations to the value nodes, resolves method overloads, and reduces
//! qualified names: package and type prefix nodes (and their member-access
//! operators) are dropped from the list, so the later evaluators only ever
//! see values.
//!
//! The value domain mirrors that split: a name being classified, a package,
//! a type, a pending method name, a type operand, or a completed value
//! whose type is computed lazily by running the type resolver over its
//! node sequence.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_ast::expr::{BinaryOpKind, ExprNodeKind, UnaryOpKind};
use jcc_ast::ids::{DeclRef, ExprId, ExprNodeId, FieldId, MethodId, ScopeId, TypeDecl, TypeId, UnitId, VarId};
use jcc_ast::ty::Type;
use jcc_source::diagnostics::DiagnosticEngine;
use log::debug;

use super::rules::TypeRules;
use super::typeres::TypeResolver;
use super::{ExprEvaluator, Operand, evaluate, evaluate_nodes};
use crate::error::SemanticError;
use crate::hierarchy::HierarchyChecker;
use crate::name_resolver::{NameResolver, collect_stmt_exprs};
use crate::package_tree::{PkgChild, PkgId};

/// The type of a completed value, computed on demand.
#[derive(Debug, Clone, Copy)]
pub enum LazyTy {
    /// Not computed yet; run the type resolver over the node sequence
    Unknown,
    /// A void method call result
    Void,
    Known(TypeId),
}

/// How a pending method name will find its declaring context.
#[derive(Debug, Clone)]
pub enum MethodCtx {
    /// `m(...)`: the enclosing declaration is the context
    Unqualified,
    /// `expr.m(...)`: the receiver's class is the context
    Instance {
        recv_nodes: Vec<ExprNodeId>,
        recv_ty: TypeId,
        /// The member-access node kept in the reduced list
        access_node: ExprNodeId,
    },
    /// `Type.m(...)`: the named type is the context
    Static { decl: TypeDecl },
}

/// The resolver's value domain.
#[derive(Debug, Clone)]
pub enum RValue {
    /// A simple name not yet classified
    Ambiguous { node: ExprNodeId, name: String },
    /// A package prefix
    Package(PkgId),
    /// A type name (its node is dropped when consumed as a prefix)
    TypeName { node: ExprNodeId, decl: TypeDecl },
    /// A method name waiting for its invocation
    Method { node: ExprNodeId, name: String, ctx: MethodCtx },
    /// A completed value and the node sequence that produces it
    Value { ty: LazyTy, nodes: Vec<ExprNodeId> },
    /// A type written in an expression (cast target, `instanceof` rhs, ...)
    TypeOperand { node: ExprNodeId, ty: TypeId },
}

/// The expression resolver for one declaration context.
#[derive(Debug)]
pub struct ExprResolver<'nr, 'h> {
    nr: &'nr NameResolver,
    hierarchy: &'h HierarchyChecker,
    unit: UnitId,
    this_decl: TypeDecl,
    this_ty: TypeId,
    /// Parameters and locals of the current method
    vars: Vec<VarId>,
    /// The scope of the expression being resolved
    cur_scope: ScopeId,
}

impl<'nr, 'h> ExprResolver<'nr, 'h> {
    /// Creates a resolver for expressions inside `this_decl`.
    pub fn new(
        ast: &mut Ast,
        nr: &'nr NameResolver,
        hierarchy: &'h HierarchyChecker,
        unit: UnitId,
        this_decl: TypeDecl,
    ) -> Self {
        let this_ty = ast.new_type(Type::Reference(this_decl));
        Self {
            nr,
            hierarchy,
            unit,
            this_decl,
            this_ty,
            vars: Vec::new(),
            cur_scope: ScopeId::new(0),
        }
    }

    /// Sets the variables visible to subsequent expressions.
    pub fn set_vars(&mut self, vars: Vec<VarId>) { self.vars = vars; }

    /// Sets the scope of the expression about to be resolved.
    pub fn set_scope(&mut self, scope: ScopeId) { self.cur_scope = scope; }

    fn rules(&self) -> TypeRules<'h> { TypeRules::new(self.nr.java_lang(), self.hierarchy) }

    /// Resolves one expression and writes the reduced node list back.
    pub fn resolve_expr(&mut self, ast: &mut Ast, expr: ExprId) -> Result<(), SemanticError> {
        self.cur_scope = ast.expr(expr).scope;
        let value = evaluate(self, ast, expr)?;
        let (nodes, _) = self.as_value(ast, value)?;
        ast.rebuild_expr_list(expr, &nodes);
        Ok(())
    }

    // ===-- Name classification ----------------------------------------=== //

    /// Classifies a single ambiguous name (JLS 6.5.2): innermost local
    /// variable, then a field of the enclosing declaration, then the
    /// import table.
    fn reclassify(&mut self, ast: &mut Ast, node: ExprNodeId, name: &str) -> Result<RValue, SemanticError> {
        // 1. A local variable or parameter visible from this scope.
        for &var in &self.vars {
            if ast.var(var).name == name
                && ast.scopes.is_same_or_ancestor(ast.var(var).scope, self.cur_scope)
            {
                let ty = ast.var(var).ty;
                ast.resolve_expr_value(node, Some(DeclRef::Var(var)), Some(ty));
                return Ok(RValue::Value { ty: LazyTy::Known(ty), nodes: vec![node] });
            }
        }
        // 2. A field of the enclosing declaration (inherited included).
        if let Some(field) = self.find_field(ast, self.this_decl, name) {
            let ty = ast.field(field).ty;
            ast.resolve_expr_value(node, Some(DeclRef::Field(field)), Some(ty));
            return Ok(RValue::Value { ty: LazyTy::Known(ty), nodes: vec![node] });
        }
        // 3. The unit's import table: a type or a package prefix.
        match self.nr.get_import(self.unit, name) {
            Some(PkgChild::Decl(decl)) => {
                let ty = ast.new_type(Type::Reference(decl));
                ast.resolve_expr_value(node, Some(decl.into()), Some(ty));
                Ok(RValue::TypeName { node, decl })
            }
            Some(PkgChild::Package(pkg)) => Ok(RValue::Package(pkg)),
            None => Err(SemanticError::NameNotFound {
                name: name.to_string(),
                range: ast.expr_node(node).range,
            }),
        }
    }

    /// Looks up a field by name on a declaration, own fields first.
    fn find_field(&self, ast: &Ast, decl: TypeDecl, name: &str) -> Option<FieldId> {
        self.hierarchy
            .inherited_members_in_order(decl)
            .iter()
            .rev()
            .copied()
            .find(|&field| ast.field(field).name == name)
    }

    /// Forces an operand into a completed value.
    fn as_value(
        &mut self,
        ast: &mut Ast,
        value: RValue,
    ) -> Result<(Vec<ExprNodeId>, LazyTy), SemanticError> {
        match value {
            RValue::Value { ty, nodes } => Ok((nodes, ty)),
            RValue::Ambiguous { node, name } => {
                match self.reclassify(ast, node, &name)? {
                    RValue::Value { ty, nodes } => Ok((nodes, ty)),
                    // A package or type is not a value.
                    _ => Err(SemanticError::NameNotFound {
                        name,
                        range: ast.expr_node(node).range,
                    }),
                }
            }
            RValue::TypeName { node, decl } => Err(SemanticError::NameNotFound {
                name: ast.type_decl_name(decl).to_string(),
                range: ast.expr_node(node).range,
            }),
            RValue::TypeOperand { node, ty } => Err(SemanticError::NameNotFound {
                name: ast.type_to_string(ty),
                range: ast.expr_node(node).range,
            }),
            RValue::Method { node, name, .. } => Err(SemanticError::NameNotFound {
                name,
                range: ast.expr_node(node).range,
            }),
            RValue::Package(_) => Err(SemanticError::NameNotFound {
                name: "package".to_string(),
                range: Default::default(),
            }),
        }
    }

    /// The type of a completed value, running the type resolver on demand.
    fn typed(
        &mut self,
        ast: &mut Ast,
        nodes: &[ExprNodeId],
        ty: LazyTy,
    ) -> Result<Option<TypeId>, SemanticError> {
        match ty {
            LazyTy::Known(ty) => Ok(Some(ty)),
            LazyTy::Void => Ok(None),
            LazyTy::Unknown => {
                let mut tr = TypeResolver::new(self.nr.java_lang(), self.hierarchy);
                evaluate_nodes(&mut tr, ast, nodes)
            }
        }
    }

    /// Like [`Self::typed`], but void values are rejected.
    fn typed_value(
        &mut self,
        ast: &mut Ast,
        nodes: &[ExprNodeId],
        ty: LazyTy,
    ) -> Result<TypeId, SemanticError> {
        self.typed(ast, nodes, ty)
            .map(|ty| ty.expect("void value used as an operand"))
    }

    // ===-- Overload resolution ----------------------------------------=== //

    /// Picks the single applicable method among `candidates`: matching
    /// name, matching arity, every argument assignable to its parameter.
    /// An exact signature match wins over widening matches.
    fn resolve_overload(
        &mut self,
        ast: &Ast,
        candidates: &[MethodId],
        name: &str,
        argtys: &[TypeId],
        range: jcc_source::types::SourceRange,
    ) -> Result<MethodId, SemanticError> {
        let rules = self.rules();
        let applicable: Vec<MethodId> = candidates
            .iter()
            .copied()
            .filter(|&m| {
                let decl = ast.method(m);
                decl.name == name
                    && decl.params.len() == argtys.len()
                    && decl
                        .params
                        .iter()
                        .zip(argtys)
                        .all(|(&p, &a)| rules.is_assignable_to(ast, ast.var(p).ty, a))
            })
            .collect();
        match applicable.len() {
            0 => Err(SemanticError::MethodNotApplicable { name: name.to_string(), range }),
            1 => Ok(applicable[0]),
            _ => {
                let exact: Vec<MethodId> = applicable
                    .iter()
                    .copied()
                    .filter(|&m| {
                        ast.method(m)
                            .params
                            .iter()
                            .zip(argtys)
                            .all(|(&p, &a)| ast.types_equal(ast.var(p).ty, a))
                    })
                    .collect();
                if exact.len() == 1 {
                    Ok(exact[0])
                } else {
                    Err(SemanticError::NameAmbiguous { name: name.to_string(), range })
                }
            }
        }
    }

    /// Evaluates argument operands into node sequences and types.
    fn eval_args(
        &mut self,
        ast: &mut Ast,
        args: Vec<Operand<RValue>>,
    ) -> Result<(Vec<ExprNodeId>, Vec<TypeId>), SemanticError> {
        let mut nodes = Vec::new();
        let mut tys = Vec::new();
        for arg in args {
            let (arg_nodes, lazy) = self.as_value(ast, arg.value)?;
            let ty = self.typed_value(ast, &arg_nodes, lazy)?;
            nodes.extend_from_slice(&arg_nodes);
            tys.push(ty);
        }
        Ok((nodes, tys))
    }
}

impl ExprEvaluator for ExprResolver<'_, '_> {
    type Value = RValue;

    fn map_value(&mut self, ast: &mut Ast, node: ExprNodeId) -> Result<RValue, SemanticError> {
        match &ast.expr_node(node).kind {
            ExprNodeKind::MemberName { name } => {
                Ok(RValue::Ambiguous { node, name: name.clone() })
            }
            ExprNodeKind::MethodName { name } => {
                Ok(RValue::Method { node, name: name.clone(), ctx: MethodCtx::Unqualified })
            }
            ExprNodeKind::This => {
                if ast.expr_node(node).ty().is_none() {
                    ast.resolve_expr_value(node, Some(self.this_decl.into()), Some(self.this_ty));
                }
                Ok(RValue::Value { ty: LazyTy::Known(self.this_ty), nodes: vec![node] })
            }
            ExprNodeKind::TypeNode { ty } => {
                let ty = *ty;
                if !ast.type_is_resolved(ty) {
                    return Err(SemanticError::UnresolvedType {
                        name: ast.type_to_string(ty),
                        range: ast.expr_node(node).range,
                    });
                }
                Ok(RValue::TypeOperand { node, ty })
            }
            ExprNodeKind::Literal { .. } => {
                let ty = ast.expr_node(node).ty().expect("literal carries its type");
                Ok(RValue::Value { ty: LazyTy::Known(ty), nodes: vec![node] })
            }
            _ => unreachable!("operator node mapped as a value"),
        }
    }

    fn eval_member_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        lhs: Operand<RValue>,
        field: Operand<RValue>,
    ) -> Result<RValue, SemanticError> {
        // Classify the receiver first.
        let lhs_value = match lhs.value {
            RValue::Ambiguous { node, name } => self.reclassify(ast, node, &name)?,
            other => other,
        };
        // A pending method name: remember the receiver for the invocation.
        let (fnode, fname) = match field.value {
            RValue::Method { node: mnode, name, ctx: MethodCtx::Unqualified } => {
                let ctx = match lhs_value {
                    RValue::Value { ty, nodes } => {
                        let recv_ty = self.typed_value(ast, &nodes, ty)?;
                        MethodCtx::Instance { recv_nodes: nodes, recv_ty, access_node: node }
                    }
                    RValue::TypeName { decl, .. } => MethodCtx::Static { decl },
                    _ => {
                        return Err(SemanticError::NameNotFound {
                            name,
                            range: ast.expr_node(mnode).range,
                        });
                    }
                };
                return Ok(RValue::Method { node: mnode, name, ctx });
            }
            RValue::Ambiguous { node: fnode, name: fname } => (fnode, fname),
            _ => {
                return Err(SemanticError::NameNotFound {
                    name: "<member>".to_string(),
                    range: ast.expr_node(node).range,
                });
            }
        };
        match lhs_value {
            // pkg.name: the next package segment or a type.
            RValue::Package(pkg) => match self.nr.package_tree().lookup(pkg, &fname) {
                Some(PkgChild::Package(next)) => Ok(RValue::Package(next)),
                Some(PkgChild::Decl(decl)) => {
                    let ty = ast.new_type(Type::Reference(decl));
                    ast.resolve_expr_value(fnode, Some(decl.into()), Some(ty));
                    Ok(RValue::TypeName { node: fnode, decl })
                }
                None => Err(SemanticError::NameNotFound {
                    name: fname,
                    range: ast.expr_node(fnode).range,
                }),
            },
            // Type.field: a static access. The type prefix and the access
            // operator are reduced away.
            RValue::TypeName { decl, .. } => match self.find_field(ast, decl, &fname) {
                Some(f) => {
                    let ty = ast.field(f).ty;
                    ast.resolve_expr_value(fnode, Some(DeclRef::Field(f)), Some(ty));
                    Ok(RValue::Value { ty: LazyTy::Known(ty), nodes: vec![fnode] })
                }
                None => Err(SemanticError::NameNotFound {
                    name: fname,
                    range: ast.expr_node(fnode).range,
                }),
            },
            // expr.field: an instance access; the operator stays.
            RValue::Value { ty, nodes } => {
                let recv_ty = self.typed_value(ast, &nodes, ty)?;
                let field = if ast.ty(recv_ty).is_array() {
                    // The only member of an array is its length.
                    (fname == "length").then(|| self.nr.array_length_field()).flatten()
                } else {
                    self.rules()
                        .decl_of(ast, recv_ty)
                        .and_then(|decl| self.find_field(ast, decl, &fname))
                };
                let Some(field) = field else {
                    return Err(SemanticError::NameNotFound {
                        name: fname,
                        range: ast.expr_node(fnode).range,
                    });
                };
                let fty = ast.field(field).ty;
                ast.resolve_expr_value(fnode, Some(DeclRef::Field(field)), Some(fty));
                let mut out = nodes;
                out.push(fnode);
                out.push(node);
                Ok(RValue::Value { ty: LazyTy::Known(fty), nodes: out })
            }
            _ => Err(SemanticError::NameNotFound {
                name: fname,
                range: ast.expr_node(fnode).range,
            }),
        }
    }

    fn eval_method_call(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        method: Operand<RValue>,
        args: Vec<Operand<RValue>>,
    ) -> Result<RValue, SemanticError> {
        let range = ast.expr_node(node).range.merge(&method.range);
        let RValue::Method { node: mnode, name, ctx } = method.value else {
            return Err(SemanticError::MethodNotApplicable {
                name: "<callee>".to_string(),
                range,
            });
        };
        let (arg_nodes, argtys) = self.eval_args(ast, args)?;
        // Find the declaring context and the list prefix to keep.
        let (ctx_decl, mut out) = match ctx {
            MethodCtx::Unqualified => (self.this_decl, Vec::new()),
            MethodCtx::Static { decl } => (decl, Vec::new()),
            MethodCtx::Instance { recv_nodes, recv_ty, access_node } => {
                let Some(decl) = self.rules().decl_of(ast, recv_ty) else {
                    return Err(SemanticError::MethodNotApplicable { name, range });
                };
                let mut prefix = recv_nodes;
                // The reduced list keeps recv, the method name, then the
                // access operator, as the evaluators expect.
                prefix.push(mnode);
                prefix.push(access_node);
                (decl, prefix)
            }
        };
        let candidates = self.hierarchy.inherited_methods(ctx_decl).to_vec();
        let resolved = self.resolve_overload(ast, &candidates, &name, &argtys, range)?;
        debug!("resolved call to {}", ast.method(resolved).canonical_name);
        ast.resolve_expr_value(mnode, Some(DeclRef::Method(resolved)), None);
        if out.is_empty() {
            out.push(mnode);
        }
        out.extend_from_slice(&arg_nodes);
        out.push(node);
        let ty = match ast.method(resolved).return_ty {
            Some(ret) => LazyTy::Known(ret),
            None => LazyTy::Void,
        };
        Ok(RValue::Value { ty, nodes: out })
    }

    fn eval_new_object(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<RValue>,
        args: Vec<Operand<RValue>>,
    ) -> Result<RValue, SemanticError> {
        let range = ast.expr_node(node).range.merge(&ty.range);
        let RValue::TypeOperand { node: tynode, ty: obj_ty } = ty.value else {
            return Err(SemanticError::MethodNotApplicable {
                name: "<constructor>".to_string(),
                range,
            });
        };
        let Some(TypeDecl::Class(class)) = ast.ty(obj_ty).as_decl() else {
            return Err(SemanticError::MethodNotApplicable {
                name: ast.type_to_string(obj_ty),
                range,
            });
        };
        let (arg_nodes, argtys) = self.eval_args(ast, args)?;
        let name = ast.class(class).name.clone();
        let candidates = ast.class(class).constructors.clone();
        let ctor = self.resolve_overload(ast, &candidates, &name, &argtys, range)?;
        // The constructor rides on the type node; the type resolver will
        // turn it into a method type returning the class.
        ast.override_expr_decl(tynode, DeclRef::Method(ctor));
        let mut out = vec![tynode];
        out.extend_from_slice(&arg_nodes);
        out.push(node);
        Ok(RValue::Value { ty: LazyTy::Known(obj_ty), nodes: out })
    }

    fn eval_new_array(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<RValue>,
        size: Operand<RValue>,
    ) -> Result<RValue, SemanticError> {
        let RValue::TypeOperand { node: tynode, ty: array_ty } = ty.value else {
            return Err(SemanticError::NameNotFound {
                name: "<array type>".to_string(),
                range: ast.expr_node(node).range,
            });
        };
        let (size_nodes, _) = self.as_value(ast, size.value)?;
        let mut out = vec![tynode];
        out.extend_from_slice(&size_nodes);
        out.push(node);
        Ok(RValue::Value { ty: LazyTy::Known(array_ty), nodes: out })
    }

    fn eval_array_access(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        array: Operand<RValue>,
        index: Operand<RValue>,
    ) -> Result<RValue, SemanticError> {
        let (mut nodes, _) = self.as_value(ast, array.value)?;
        let (index_nodes, _) = self.as_value(ast, index.value)?;
        nodes.extend_from_slice(&index_nodes);
        nodes.push(node);
        Ok(RValue::Value { ty: LazyTy::Unknown, nodes })
    }

    fn eval_cast(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        ty: Operand<RValue>,
        value: Operand<RValue>,
    ) -> Result<RValue, SemanticError> {
        let RValue::TypeOperand { node: tynode, ty: cast_ty } = ty.value else {
            return Err(SemanticError::NameNotFound {
                name: "<cast type>".to_string(),
                range: ast.expr_node(node).range,
            });
        };
        let (value_nodes, _) = self.as_value(ast, value.value)?;
        let mut out = vec![tynode];
        out.extend_from_slice(&value_nodes);
        out.push(node);
        Ok(RValue::Value { ty: LazyTy::Known(cast_ty), nodes: out })
    }

    fn eval_binary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        op: BinaryOpKind,
        lhs: Operand<RValue>,
        rhs: Operand<RValue>,
    ) -> Result<RValue, SemanticError> {
        let (lhs_nodes, _) = self.as_value(ast, lhs.value)?;
        // Record the assigned variable for simple variable assignments.
        if op == BinaryOpKind::Assignment
            && let [single] = lhs_nodes.as_slice()
            && let Some(DeclRef::Var(var)) = ast.expr_node(*single).decl()
        {
            ast.set_var_assigned(node, var);
        }
        // `instanceof` takes a type operand on the right; every other
        // binary operator takes a value.
        let rhs_nodes = if op == BinaryOpKind::InstanceOf {
            match rhs.value {
                RValue::TypeOperand { node, .. } => vec![node],
                other => self.as_value(ast, other)?.0,
            }
        } else {
            self.as_value(ast, rhs.value)?.0
        };
        let mut out = lhs_nodes;
        out.extend_from_slice(&rhs_nodes);
        out.push(node);
        Ok(RValue::Value { ty: LazyTy::Unknown, nodes: out })
    }

    fn eval_unary(
        &mut self,
        ast: &mut Ast,
        node: ExprNodeId,
        _op: UnaryOpKind,
        operand: Operand<RValue>,
    ) -> Result<RValue, SemanticError> {
        let (mut nodes, _) = self.as_value(ast, operand.value)?;
        nodes.push(node);
        Ok(RValue::Value { ty: LazyTy::Unknown, nodes })
    }
}

/// Runs the expression resolver over every expression of the linking unit.
pub fn resolve_expressions(
    ast: &mut Ast,
    lu: &LinkingUnit,
    nr: &NameResolver,
    hierarchy: &HierarchyChecker,
    diag: &mut DiagnosticEngine,
) {
    for &unit in &lu.units {
        let Some(body) = ast.unit(unit).body else { continue };
        let mut resolver = ExprResolver::new(ast, nr, hierarchy, unit, body);
        // Field initialisers see no locals.
        if let TypeDecl::Class(class) = body {
            for field in ast.class(class).fields.clone() {
                if let Some(init) = ast.field(field).init {
                    resolver.set_vars(Vec::new());
                    if let Err(err) = resolver.resolve_expr(ast, init) {
                        diag.report(err.into_diagnostic());
                    }
                }
            }
        }
        let methods: Vec<MethodId> = match body {
            TypeDecl::Class(class) => {
                let decl = ast.class(class);
                decl.methods.iter().chain(&decl.constructors).copied().collect()
            }
            TypeDecl::Interface(interface) => ast.interface(interface).methods.clone(),
        };
        for method in methods {
            let decl = ast.method(method);
            let vars: Vec<VarId> =
                decl.params.iter().chain(&decl.locals).copied().collect();
            let Some(stmt) = decl.body else { continue };
            resolver.set_vars(vars);
            let mut exprs = Vec::new();
            collect_stmt_exprs(ast, stmt, &mut exprs);
            for expr in exprs {
                if let Err(err) = resolver.resolve_expr(ast, expr) {
                    diag.report(err.into_diagnostic());
                }
            }
        }
    }
}
