//! Expression lowering.
//!
//! The postfix list is first folded into an operand tree (each operator
//! node adopting the entries it consumes), then lowered recursively; the
//! recursion is what lets `&&`/`||` lower as control flow rather than as
//! eagerly evaluated operands.

use jcc_ast::expr::{BinaryOpKind, ExprNodeKind, LiteralValue, UnaryOpKind};
use jcc_ast::ids::{DeclRef, ExprId, ExprNodeId, FieldId, MethodId, TypeDecl, TypeId};
use jcc_ast::ty::Type;
use jcc_tir::types::TyId;
use jcc_tir::value::{BinOp, CastOp, Predicate, ValueId};

use crate::layout::{is_unsigned, lower_type};
use crate::lower::FnLowering;

/// One lowered operand.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CgValue {
    /// An rvalue
    Val(ValueId),
    /// An lvalue address and the type stored there
    Ptr { addr: ValueId, ty: TyId },
    /// A callable, with its receiver when already known
    Callee { method: MethodId, recv: Option<ValueId> },
    /// A void call result
    Void,
}

/// A lowered operand plus the AST type it carries (for conversions).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    pub value: CgValue,
    pub ast_ty: Option<TypeId>,
}

/// An operator tree rebuilt from the postfix list.
struct TreeNode {
    node: ExprNodeId,
    children: Vec<usize>,
}

fn build_tree(ast: &jcc_ast::arena::Ast, expr: ExprId) -> (Vec<TreeNode>, usize) {
    let mut nodes: Vec<TreeNode> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    for node in ast.expr_node_ids(expr) {
        let arity = ast.expr_node(node).kind.arity();
        let children = stack.split_off(stack.len() - arity);
        stack.push(nodes.len());
        nodes.push(TreeNode { node, children });
    }
    assert_eq!(stack.len(), 1, "postfix expression did not reduce to a single tree");
    let root = stack[0];
    (nodes, root)
}

impl FnLowering<'_, '_, '_> {
    /// Lowers an expression, returning its final operand.
    pub(crate) fn lower_expr(&mut self, expr: ExprId) -> Entry {
        let (tree, root) = build_tree(self.env.ast, expr);
        self.lower_tree(&tree, root)
    }

    /// Lowers an expression to an rvalue, converting to `target` if given.
    pub(crate) fn lower_expr_rvalue(&mut self, expr: ExprId, target: Option<TypeId>) -> ValueId {
        let entry = self.lower_expr(expr);
        let value = self.rvalue(entry);
        match (entry.ast_ty, target) {
            (Some(from), Some(to)) => self.convert(value, from, to),
            _ => value,
        }
    }

    fn rvalue(&mut self, entry: Entry) -> ValueId {
        match entry.value {
            CgValue::Val(v) => v,
            CgValue::Ptr { addr, ty } => self.b.create_load(ty, addr),
            CgValue::Callee { .. } | CgValue::Void => panic!("operand is not a value"),
        }
    }

    /// Numeric conversion between AST types; everything else passes through.
    fn convert(&mut self, value: ValueId, from: TypeId, to: TypeId) -> ValueId {
        let ast = self.env.ast;
        if !ast.ty(from).is_numeric() || !ast.ty(to).is_numeric() {
            return value;
        }
        let to_bits = {
            let ty = lower_type(&mut self.b.module().ctx, ast, to);
            self.b.module().ctx.size_in_bits(ty)
        };
        self.widen_to(value, from, to_bits)
    }

    /// Width adjustment: chars zero-extend, other integers sign-extend;
    /// narrowing truncates.
    fn widen_to(&mut self, value: ValueId, from: TypeId, to_bits: u32) -> ValueId {
        let ast = self.env.ast;
        let from_bits = {
            let ty = lower_type(&mut self.b.module().ctx, ast, from);
            self.b.module().ctx.size_in_bits(ty)
        };
        let dest = self.b.module().ctx.integer_ty(to_bits);
        if to_bits > from_bits {
            let op = if is_unsigned(ast, from) { CastOp::ZExt } else { CastOp::SExt };
            self.b.create_icast(op, value, dest)
        } else if to_bits < from_bits {
            self.b.create_icast(CastOp::Trunc, value, dest)
        } else {
            value
        }
    }

    /// The address of a field, through a receiver (or `this`/a global).
    fn field_ptr(&mut self, field: FieldId, recv: Option<ValueId>) -> (ValueId, TyId) {
        let ast = self.env.ast;
        let field_ty = lower_type(&mut self.b.module().ctx, ast, ast.field(field).ty);
        if ast.field(field).modifiers.is_static() {
            let global = self.env.static_fields[&field];
            return (global, field_ty);
        }
        let class = ast.field(field).parent.expect("instance field has a declaring class");
        let hierarchy = self.env.hierarchy;
        let (fields, struct_ty) =
            self.env.layouts.layout_of(&mut self.b.module().ctx, ast, hierarchy, class);
        let index = fields.iter().position(|&f| f == field).expect("field is in its layout");
        let recv = match recv {
            Some(recv) => recv,
            None => {
                let slot = self.this_slot.expect("implicit receiver outside an instance method");
                let ptr = self.b.module().ctx.pointer_ty();
                self.b.create_load(ptr, slot)
            }
        };
        let index = self.b.module().const_i32(index as u32);
        let addr = self.b.create_gep(recv, struct_ty, &[index]);
        (addr, field_ty)
    }

    fn lower_tree(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let node = tree[idx].node;
        let ast_ty = ast.expr_node(node).ty();
        match &ast.expr_node(node).kind {
            ExprNodeKind::Literal { value } => {
                let value = match value {
                    LiteralValue::Int(v) => {
                        let i32_ty = self.b.module().ctx.i32_ty();
                        self.b.module().const_int(i32_ty, u64::from(*v))
                    }
                    LiteralValue::Bool(v) => self.b.module().const_bool(*v),
                    // Without a runtime there are no string objects.
                    LiteralValue::Null | LiteralValue::String(_) => {
                        self.b.module().null_pointer()
                    }
                };
                Entry { value: CgValue::Val(value), ast_ty }
            }
            ExprNodeKind::This => {
                let slot = self.this_slot.expect("'this' outside an instance method");
                let ptr = self.b.module().ctx.pointer_ty();
                let value = self.b.create_load(ptr, slot);
                Entry { value: CgValue::Val(value), ast_ty }
            }
            ExprNodeKind::MemberName { .. } | ExprNodeKind::MethodName { .. } => {
                match ast.expr_node(node).decl().expect("name survived resolution") {
                    DeclRef::Var(var) => {
                        let slot = self.var_slots[&var];
                        let ty = lower_type(&mut self.b.module().ctx, ast, ast.var(var).ty);
                        Entry { value: CgValue::Ptr { addr: slot, ty }, ast_ty }
                    }
                    DeclRef::Field(field) => {
                        let (addr, ty) = self.field_ptr(field, None);
                        Entry { value: CgValue::Ptr { addr, ty }, ast_ty }
                    }
                    DeclRef::Method(method) => {
                        Entry { value: CgValue::Callee { method, recv: None }, ast_ty }
                    }
                    DeclRef::Class(_) | DeclRef::Interface(_) => {
                        unreachable!("type prefixes are reduced away before lowering")
                    }
                }
            }
            ExprNodeKind::TypeNode { .. } => unreachable!("type operands are handled by parents"),
            ExprNodeKind::MemberAccess => self.lower_member_access(tree, idx),
            ExprNodeKind::MethodInvocation { .. } => self.lower_call(tree, idx),
            ExprNodeKind::ClassInstanceCreation { .. } => self.lower_new_object(tree, idx),
            ExprNodeKind::ArrayInstanceCreation => self.lower_new_array(tree, idx),
            ExprNodeKind::ArrayAccess => self.lower_array_access(tree, idx),
            ExprNodeKind::Cast => self.lower_cast(tree, idx),
            ExprNodeKind::UnaryOp { op } => self.lower_unary(tree, idx, *op),
            ExprNodeKind::BinaryOp { op, .. } => self.lower_binary(tree, idx, *op),
        }
    }

    fn lower_member_access(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let [obj_idx, field_idx] = tree[idx].children[..] else {
            unreachable!("member access has two operands")
        };
        let obj_entry = self.lower_tree(tree, obj_idx);
        let obj = self.rvalue(obj_entry);
        let field_node = tree[field_idx].node;
        let ast_ty = ast.expr_node(tree[idx].node).ty();
        match ast.expr_node(field_node).decl().expect("member survived resolution") {
            DeclRef::Field(field) => {
                // Array lengths live behind the allocation hook; everything
                // else is a struct field.
                if Some(field) == self.env.array_length_field {
                    let hook = self.env.hooks.array_length;
                    let value = self.b.create_call(hook, &[obj]);
                    return Entry { value: CgValue::Val(value), ast_ty };
                }
                let (addr, ty) = self.field_ptr(field, Some(obj));
                Entry { value: CgValue::Ptr { addr, ty }, ast_ty }
            }
            DeclRef::Method(method) => {
                Entry { value: CgValue::Callee { method, recv: Some(obj) }, ast_ty }
            }
            _ => unreachable!("member access resolves to a field or method"),
        }
    }

    fn lower_call(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let children = &tree[idx].children;
        let callee_entry = self.lower_tree(tree, children[0]);
        let CgValue::Callee { method, recv } = callee_entry.value else {
            panic!("call target did not lower to a callee")
        };
        let params = ast.method(method).params.clone();
        let mut args = Vec::new();
        let is_instance = !ast.method(method).modifiers.is_static();
        if is_instance {
            let recv = match recv {
                Some(recv) => recv,
                None => {
                    let slot =
                        self.this_slot.expect("implicit receiver outside an instance method");
                    let ptr = self.b.module().ctx.pointer_ty();
                    self.b.create_load(ptr, slot)
                }
            };
            args.push(recv);
        }
        for (&child, &param) in children[1..].iter().zip(&params) {
            let entry = self.lower_tree(tree, child);
            let value = self.rvalue(entry);
            let value = match entry.ast_ty {
                Some(from) => self.convert(value, from, ast.var(param).ty),
                None => value,
            };
            args.push(value);
        }
        let func = self.env.fn_map[&method];
        let result = self.b.create_call(func, &args);
        let ast_ty = ast.method(method).return_ty;
        match ast_ty {
            Some(_) => Entry { value: CgValue::Val(result), ast_ty },
            None => Entry { value: CgValue::Void, ast_ty: None },
        }
    }

    fn lower_new_object(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let children = &tree[idx].children;
        let ty_node = tree[children[0]].node;
        let Some(DeclRef::Method(ctor)) = ast.expr_node(ty_node).decl() else {
            panic!("object creation lost its constructor")
        };
        let Some(TypeDecl::Class(class)) = ast.method(ctor).parent else {
            panic!("constructor has a declaring class")
        };
        let hierarchy = self.env.hierarchy;
        let (_, struct_ty) =
            self.env.layouts.layout_of(&mut self.b.module().ctx, ast, hierarchy, class);
        let size_bytes = self.b.module().ctx.size_in_bits(struct_ty).div_ceil(8).max(1);
        let size = self.b.module().const_i32(size_bytes);
        let obj = {
            let hook = self.env.hooks.object_alloc;
            self.b.create_call(hook, &[size])
        };
        let params = ast.method(ctor).params.clone();
        let mut args = vec![obj];
        for (&child, &param) in children[1..].iter().zip(&params) {
            let entry = self.lower_tree(tree, child);
            let value = self.rvalue(entry);
            let value = match entry.ast_ty {
                Some(from) => self.convert(value, from, ast.var(param).ty),
                None => value,
            };
            args.push(value);
        }
        let ctor_fn = self.env.fn_map[&ctor];
        let _ = self.b.create_call(ctor_fn, &args);
        Entry { value: CgValue::Val(obj), ast_ty: ast.expr_node(tree[idx].node).ty() }
    }

    fn lower_new_array(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let children = &tree[idx].children;
        let ty_node = tree[children[0]].node;
        let array_ty = ast.expr_node(ty_node).ty().expect("array creation type is resolved");
        let Type::Array(elem) = ast.ty(array_ty) else { panic!("not an array type") };
        let elem = *elem;
        let size_entry = self.lower_tree(tree, children[1]);
        let count = self.rvalue(size_entry);
        let count = match size_entry.ast_ty {
            Some(from) => self.widen_to(count, from, 32),
            None => count,
        };
        let elem_bytes = {
            let ty = lower_type(&mut self.b.module().ctx, ast, elem);
            self.b.module().ctx.size_in_bits(ty).div_ceil(8).max(1)
        };
        let elem_bytes = self.b.module().const_i32(elem_bytes);
        let hook = self.env.hooks.array_alloc;
        let value = self.b.create_call(hook, &[count, elem_bytes]);
        Entry { value: CgValue::Val(value), ast_ty: Some(array_ty) }
    }

    fn lower_array_access(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let [base_idx, index_idx] = tree[idx].children[..] else {
            unreachable!("array access has two operands")
        };
        let base_entry = self.lower_tree(tree, base_idx);
        let base = self.rvalue(base_entry);
        let index_entry = self.lower_tree(tree, index_idx);
        let index = self.rvalue(index_entry);
        let index = match index_entry.ast_ty {
            Some(from) => self.widen_to(index, from, 32),
            None => index,
        };
        let ast_ty = ast.expr_node(tree[idx].node).ty();
        let elem_ty = {
            let elem = ast_ty.expect("array access result type is resolved");
            lower_type(&mut self.b.module().ctx, ast, elem)
        };
        let contained = self.b.module().ctx.array_ty(elem_ty, 0);
        let addr = self.b.create_gep(base, contained, &[index]);
        Entry { value: CgValue::Ptr { addr, ty: elem_ty }, ast_ty }
    }

    fn lower_cast(&mut self, tree: &[TreeNode], idx: usize) -> Entry {
        let ast = self.env.ast;
        let [ty_idx, value_idx] = tree[idx].children[..] else {
            unreachable!("cast has two operands")
        };
        let target = ast.expr_node(tree[ty_idx].node).ty().expect("cast type is resolved");
        let entry = self.lower_tree(tree, value_idx);
        let value = self.rvalue(entry);
        let value = match entry.ast_ty {
            // Reference casts carry no runtime check; only integer widths
            // change representation.
            Some(from) => self.convert(value, from, target),
            None => value,
        };
        Entry { value: CgValue::Val(value), ast_ty: ast.expr_node(tree[idx].node).ty() }
    }

    fn lower_unary(&mut self, tree: &[TreeNode], idx: usize, op: UnaryOpKind) -> Entry {
        let ast = self.env.ast;
        let child = tree[idx].children[0];
        let entry = self.lower_tree(tree, child);
        let value = self.rvalue(entry);
        let ast_ty = ast.expr_node(tree[idx].node).ty();
        let result = match op {
            UnaryOpKind::Plus => match entry.ast_ty {
                Some(from) => self.widen_to(value, from, 32),
                None => value,
            },
            UnaryOpKind::Minus => {
                let value = match entry.ast_ty {
                    Some(from) => self.widen_to(value, from, 32),
                    None => value,
                };
                let zero = self.b.module().const_i32(0);
                self.b.create_binary(BinOp::Sub, zero, value)
            }
            UnaryOpKind::BitwiseNot => {
                let value = match entry.ast_ty {
                    Some(from) => self.widen_to(value, from, 32),
                    None => value,
                };
                let ones = self.b.module().const_i32(u32::MAX);
                self.b.create_binary(BinOp::Xor, value, ones)
            }
            UnaryOpKind::Not => {
                let one = self.b.module().const_bool(true);
                self.b.create_binary(BinOp::Xor, value, one)
            }
        };
        Entry { value: CgValue::Val(result), ast_ty }
    }

    fn lower_binary(&mut self, tree: &[TreeNode], idx: usize, op: BinaryOpKind) -> Entry {
        let ast = self.env.ast;
        let [lhs_idx, rhs_idx] = tree[idx].children[..] else {
            unreachable!("binary operator has two operands")
        };
        let node = tree[idx].node;
        let ast_ty = ast.expr_node(node).ty();
        match op {
            BinaryOpKind::Assignment => {
                let lhs_entry = self.lower_tree(tree, lhs_idx);
                let CgValue::Ptr { addr, .. } = lhs_entry.value else {
                    panic!("assignment target is not an lvalue")
                };
                let rhs_entry = self.lower_tree(tree, rhs_idx);
                let value = self.rvalue(rhs_entry);
                let value = match (rhs_entry.ast_ty, lhs_entry.ast_ty) {
                    (Some(from), Some(to)) => self.convert(value, from, to),
                    _ => value,
                };
                let _ = self.b.create_store(value, addr);
                Entry { value: CgValue::Val(value), ast_ty }
            }
            BinaryOpKind::And | BinaryOpKind::Or => self.lower_short_circuit(tree, idx, op),
            BinaryOpKind::InstanceOf => {
                // No runtime type information exists; a non-null reference
                // conservatively satisfies the test.
                let entry = self.lower_tree(tree, lhs_idx);
                let value = self.rvalue(entry);
                let null = self.b.module().null_pointer();
                let result = self.b.create_cmp(Predicate::Ne, value, null);
                Entry { value: CgValue::Val(result), ast_ty }
            }
            BinaryOpKind::Equal
            | BinaryOpKind::NotEqual
            | BinaryOpKind::LessThan
            | BinaryOpKind::LessThanOrEqual
            | BinaryOpKind::GreaterThan
            | BinaryOpKind::GreaterThanOrEqual => {
                let (lhs, rhs) = self.lower_comparable(tree, lhs_idx, rhs_idx);
                let pred = match op {
                    BinaryOpKind::Equal => Predicate::Eq,
                    BinaryOpKind::NotEqual => Predicate::Ne,
                    BinaryOpKind::LessThan => Predicate::Lt,
                    BinaryOpKind::LessThanOrEqual => Predicate::Le,
                    BinaryOpKind::GreaterThan => Predicate::Gt,
                    _ => Predicate::Ge,
                };
                let result = self.b.create_cmp(pred, lhs, rhs);
                Entry { value: CgValue::Val(result), ast_ty }
            }
            BinaryOpKind::BitwiseAnd | BinaryOpKind::BitwiseOr | BinaryOpKind::BitwiseXor => {
                let lhs = {
                    let entry = self.lower_tree(tree, lhs_idx);
                    self.rvalue(entry)
                };
                let rhs = {
                    let entry = self.lower_tree(tree, rhs_idx);
                    self.rvalue(entry)
                };
                let bin = match op {
                    BinaryOpKind::BitwiseAnd => BinOp::And,
                    BinaryOpKind::BitwiseOr => BinOp::Or,
                    _ => BinOp::Xor,
                };
                let result = self.b.create_binary(bin, lhs, rhs);
                Entry { value: CgValue::Val(result), ast_ty }
            }
            BinaryOpKind::Add
            | BinaryOpKind::Subtract
            | BinaryOpKind::Multiply
            | BinaryOpKind::Divide
            | BinaryOpKind::Modulo => {
                let (lhs, rhs) = self.lower_promoted(tree, lhs_idx, rhs_idx);
                let bin = match op {
                    BinaryOpKind::Add => BinOp::Add,
                    BinaryOpKind::Subtract => BinOp::Sub,
                    BinaryOpKind::Multiply => BinOp::Mul,
                    BinaryOpKind::Divide => BinOp::Div,
                    _ => BinOp::Rem,
                };
                let result = self.b.create_binary(bin, lhs, rhs);
                Entry { value: CgValue::Val(result), ast_ty }
            }
        }
    }

    /// Lowers both operands of an arithmetic operator, promoted to `i32`.
    fn lower_promoted(
        &mut self,
        tree: &[TreeNode],
        lhs_idx: usize,
        rhs_idx: usize,
    ) -> (ValueId, ValueId) {
        let lhs_entry = self.lower_tree(tree, lhs_idx);
        let lhs = self.rvalue(lhs_entry);
        let lhs = match lhs_entry.ast_ty {
            Some(from) if self.env.ast.ty(from).is_numeric() => self.widen_to(lhs, from, 32),
            _ => lhs,
        };
        let rhs_entry = self.lower_tree(tree, rhs_idx);
        let rhs = self.rvalue(rhs_entry);
        let rhs = match rhs_entry.ast_ty {
            Some(from) if self.env.ast.ty(from).is_numeric() => self.widen_to(rhs, from, 32),
            _ => rhs,
        };
        (lhs, rhs)
    }

    /// Comparison operands: numeric operands promote to `i32`; booleans and
    /// references compare at their own width.
    fn lower_comparable(
        &mut self,
        tree: &[TreeNode],
        lhs_idx: usize,
        rhs_idx: usize,
    ) -> (ValueId, ValueId) {
        let lhs_entry = self.lower_tree(tree, lhs_idx);
        let rhs_entry = self.lower_tree(tree, rhs_idx);
        let numeric = matches!(
            (lhs_entry.ast_ty, rhs_entry.ast_ty),
            (Some(l), Some(r))
                if self.env.ast.ty(l).is_numeric() && self.env.ast.ty(r).is_numeric()
        );
        let lhs = self.rvalue(lhs_entry);
        let rhs = self.rvalue(rhs_entry);
        if numeric {
            let lhs = self.widen_to(lhs, lhs_entry.ast_ty.expect("numeric"), 32);
            let rhs = self.widen_to(rhs, rhs_entry.ast_ty.expect("numeric"), 32);
            (lhs, rhs)
        } else {
            (lhs, rhs)
        }
    }

    /// `&&` and `||` as control flow, with an `i1` slot mem2reg folds away.
    fn lower_short_circuit(&mut self, tree: &[TreeNode], idx: usize, op: BinaryOpKind) -> Entry {
        let [lhs_idx, rhs_idx] = tree[idx].children[..] else { unreachable!() };
        let i1 = self.b.module().ctx.i1_ty();
        let slot = self.b.create_alloca(i1);
        let lhs_entry = self.lower_tree(tree, lhs_idx);
        let lhs = self.rvalue(lhs_entry);
        let _ = self.b.create_store(lhs, slot);
        let rhs_bb = self.b.create_block(self.func);
        let merge = self.b.create_block(self.func);
        if op == BinaryOpKind::And {
            let _ = self.b.create_cond_branch(lhs, rhs_bb, merge);
        } else {
            let _ = self.b.create_cond_branch(lhs, merge, rhs_bb);
        }
        self.move_to(rhs_bb);
        let rhs_entry = self.lower_tree(tree, rhs_idx);
        let rhs = self.rvalue(rhs_entry);
        let _ = self.b.create_store(rhs, slot);
        let _ = self.b.create_branch(merge);
        self.move_to(merge);
        let value = self.b.create_load(i1, slot);
        Entry {
            value: CgValue::Val(value),
            ast_ty: self.env.ast.expr_node(tree[idx].node).ty(),
        }
    }
}
