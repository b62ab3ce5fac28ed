//! Program, declaration and statement lowering.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_ast::ids::{ClassId, FieldId, MethodId, TypeDecl, VarId};
use jcc_ast::stmt::StmtKind;
use jcc_semantic::hierarchy::HierarchyChecker;
use jcc_tir::builder::IrBuilder;
use jcc_tir::module::Module;
use jcc_tir::types::Context;
use jcc_tir::value::ValueId;
use log::debug;
use rustc_hash::FxHashMap;

use crate::layout::{ClassLayouts, lower_type};

/// Runtime hook functions: declared, never defined. The allocator hooks
/// stand in for a heap; nothing in this crate provides one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hooks {
    /// `ptr __object_alloc(i32 size_bytes)`
    pub object_alloc: ValueId,
    /// `ptr __array_alloc(i32 count, i32 elem_bytes)`
    pub array_alloc: ValueId,
    /// `i32 __array_length(ptr array)`
    pub array_length: ValueId,
}

/// Shared lowering environment (everything but the module).
#[derive(Debug)]
pub(crate) struct Env<'a> {
    pub ast: &'a Ast,
    pub hierarchy: &'a HierarchyChecker,
    pub layouts: ClassLayouts,
    pub fn_map: FxHashMap<MethodId, ValueId>,
    pub static_fields: FxHashMap<FieldId, ValueId>,
    pub hooks: Hooks,
    /// The `length` field of the shared array prototype
    pub array_length_field: Option<FieldId>,
}

/// Lowers a whole analyzed program into a TIR module.
///
/// Every method is declared first (so calls can reference forward), then
/// bodies are lowered in source order.
#[must_use]
pub fn lower_program(
    ast: &Ast,
    lu: &LinkingUnit,
    sema: &jcc_semantic::context::SemanticContext,
) -> Module {
    let hierarchy = &sema.hierarchy;
    let mut module = Module::new(Context::new(64));
    let hooks = declare_hooks(&mut module);
    let mut env = Env {
        ast,
        hierarchy,
        layouts: ClassLayouts::default(),
        fn_map: FxHashMap::default(),
        static_fields: FxHashMap::default(),
        hooks,
        array_length_field: sema.resolver.array_length_field(),
    };
    // Declarations first.
    for &unit in &lu.units {
        match ast.unit(unit).body {
            Some(TypeDecl::Class(class)) => declare_class(&mut module, &mut env, class),
            Some(TypeDecl::Interface(interface)) => {
                for &method in &ast.interface(interface).methods {
                    declare_method(&mut module, &mut env, method);
                }
            }
            None => {}
        }
    }
    // Then bodies.
    for &unit in &lu.units {
        let Some(TypeDecl::Class(class)) = ast.unit(unit).body else { continue };
        let decl = ast.class(class);
        let methods: Vec<MethodId> =
            decl.methods.iter().chain(&decl.constructors).copied().collect();
        for method in methods {
            if ast.method(method).body.is_some() {
                lower_method(&mut module, &mut env, method);
            }
        }
    }
    module
}

fn declare_hooks(module: &mut Module) -> Hooks {
    let ptr = module.ctx.pointer_ty();
    let i32_ty = module.ctx.i32_ty();
    let object_ty = module.ctx.function_ty(ptr, vec![i32_ty]);
    let array_ty = module.ctx.function_ty(ptr, vec![i32_ty, i32_ty]);
    let length_ty = module.ctx.function_ty(i32_ty, vec![ptr]);
    Hooks {
        object_alloc: module.create_function("__object_alloc", object_ty),
        array_alloc: module.create_function("__array_alloc", array_ty),
        array_length: module.create_function("__array_length", length_ty),
    }
}

fn declare_class(module: &mut Module, env: &mut Env<'_>, class: ClassId) {
    let ast = env.ast;
    for &field in &ast.class(class).fields {
        if ast.field(field).modifiers.is_static() {
            let ty = lower_type(&mut module.ctx, ast, ast.field(field).ty);
            let name =
                format!("{}.{}", ast.class(class).canonical_name, ast.field(field).name);
            let global = module.create_global_variable(name, ty);
            let _ = env.static_fields.insert(field, global);
        }
    }
    let decl = ast.class(class);
    let methods: Vec<MethodId> =
        decl.methods.iter().chain(&decl.constructors).copied().collect();
    for method in methods {
        declare_method(module, env, method);
    }
}

fn declare_method(module: &mut Module, env: &mut Env<'_>, method: MethodId) {
    let ast = env.ast;
    let decl = ast.method(method);
    let is_instance = !decl.modifiers.is_static();
    let mut params = Vec::new();
    if is_instance {
        params.push(module.ctx.pointer_ty());
    }
    for &param in &decl.params {
        params.push(lower_type(&mut module.ctx, ast, ast.var(param).ty));
    }
    let ret = match decl.return_ty {
        Some(ty) if !decl.is_constructor => lower_type(&mut module.ctx, ast, ty),
        _ => module.ctx.void_ty(),
    };
    let name = if decl.is_constructor {
        let parent = decl.parent.expect("constructor has a declaring class");
        format!("{}.<init>", ast.type_decl_canonical_name(parent))
    } else {
        decl.canonical_name.clone()
    };
    let fn_ty = module.ctx.function_ty(ret, params);
    let func = module.create_function(name, fn_ty);
    let _ = env.fn_map.insert(method, func);
}

/// Per-function lowering state.
pub(crate) struct FnLowering<'e, 'a, 'm> {
    pub env: &'e mut Env<'a>,
    pub b: IrBuilder<'m>,
    pub func: ValueId,
    pub method: MethodId,
    /// Slot holding the receiver, for instance methods
    pub this_slot: Option<ValueId>,
    pub var_slots: FxHashMap<VarId, ValueId>,
    /// Set once the current block has been terminated
    pub terminated: bool,
}

impl std::fmt::Debug for FnLowering<'_, '_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLowering").field("func", &self.func).finish_non_exhaustive()
    }
}

fn lower_method(module: &mut Module, env: &mut Env<'_>, method: MethodId) {
    let func = env.fn_map[&method];
    debug!("lowering {}", env.ast.method(method).canonical_name);
    let entry = module.create_block(func);
    let args = module.func_args(func);
    let mut b = IrBuilder::new(module);
    b.set_insert_point_at_end(entry);

    let ast = env.ast;
    let decl = ast.method(method);
    let is_instance = !decl.modifiers.is_static();
    let params: Vec<VarId> = decl.params.clone();
    let locals: Vec<VarId> = decl.locals.clone();
    let body = decl.body.expect("lowering a method without a body");

    // Receiver and parameters spill into entry allocas; mem2reg promotes
    // them back into values.
    let mut this_slot = None;
    let mut arg_iter = args.into_iter();
    if is_instance {
        let ptr = b.module().ctx.pointer_ty();
        let slot = b.create_alloca(ptr);
        let this_arg = arg_iter.next().expect("instance method has a receiver argument");
        let _ = b.create_store(this_arg, slot);
        this_slot = Some(slot);
    }
    let mut var_slots = FxHashMap::default();
    for param in params {
        let ty = lower_type(&mut b.module().ctx, ast, ast.var(param).ty);
        let slot = b.create_alloca(ty);
        let arg = arg_iter.next().expect("parameter count matches argument count");
        let _ = b.create_store(arg, slot);
        let _ = var_slots.insert(param, slot);
    }
    for local in locals {
        let ty = lower_type(&mut b.module().ctx, ast, ast.var(local).ty);
        let slot = b.create_alloca(ty);
        let _ = var_slots.insert(local, slot);
    }

    let mut lowering =
        FnLowering { env, b, func, method, this_slot, var_slots, terminated: false };
    lowering.lower_stmt(body);
    // Fall-through: give the block a terminator.
    if !lowering.terminated {
        let ret_ty = {
            let module = lowering.b.module();
            module.ctx.return_ty(module.value(func).ty)
        };
        if lowering.b.module().ctx.is_void(ret_ty) {
            let _ = lowering.b.create_return(None);
        } else {
            let undef = lowering.b.module().undef(ret_ty);
            let _ = lowering.b.create_return(Some(undef));
        }
    }
}

impl FnLowering<'_, '_, '_> {
    /// Starts a fresh block and points the builder at it.
    pub(crate) fn start_block(&mut self) -> ValueId {
        let block = self.b.create_block(self.func);
        self.b.set_insert_point_at_end(block);
        self.terminated = false;
        block
    }

    /// Points the builder at the end of an existing block.
    pub(crate) fn move_to(&mut self, block: ValueId) {
        self.b.set_insert_point_at_end(block);
        self.terminated = false;
    }

    fn lower_stmt(&mut self, stmt: jcc_ast::ids::StmtId) {
        if self.terminated {
            // Code after a return: lower into a fresh unreachable block so
            // the terminator-last invariant holds; SimplifyCFG sweeps it.
            let _ = self.start_block();
        }
        let ast = self.env.ast;
        match &ast.stmt(stmt).kind {
            StmtKind::Block(stmts) => {
                for &s in &stmts.clone() {
                    self.lower_stmt(s);
                }
            }
            StmtKind::LocalDecl(var) => {
                let var = *var;
                if let Some(init) = ast.var(var).init {
                    let value = self.lower_expr_rvalue(init, Some(ast.var(var).ty));
                    let slot = self.var_slots[&var];
                    let _ = self.b.create_store(value, slot);
                }
            }
            StmtKind::Expr(expr) => {
                let expr = *expr;
                let _ = self.lower_expr(expr);
            }
            StmtKind::Return(expr) => {
                let expr = *expr;
                let ret_ast_ty = ast.method(self.method).return_ty;
                let value = expr.map(|e| self.lower_expr_rvalue(e, ret_ast_ty));
                let _ = self.b.create_return(value);
                self.terminated = true;
            }
            StmtKind::If { cond, then_stmt, else_stmt } => {
                let (cond, then_stmt, else_stmt) = (*cond, *then_stmt, *else_stmt);
                let cond_val = self.lower_expr_rvalue(cond, None);
                let current = self.current_block();
                let then_bb = self.b.create_block(self.func);
                let else_bb = else_stmt.map(|_| self.b.create_block(self.func));
                let merge = self.b.create_block(self.func);
                self.move_to(current);
                let _ = self.b.create_cond_branch(cond_val, then_bb, else_bb.unwrap_or(merge));
                self.move_to(then_bb);
                self.lower_stmt(then_stmt);
                if !self.terminated {
                    let _ = self.b.create_branch(merge);
                }
                if let (Some(else_bb), Some(else_stmt)) = (else_bb, else_stmt) {
                    self.move_to(else_bb);
                    self.lower_stmt(else_stmt);
                    if !self.terminated {
                        let _ = self.b.create_branch(merge);
                    }
                }
                self.move_to(merge);
            }
            StmtKind::While { cond, body } => {
                let (cond, body) = (*cond, *body);
                let cond_bb = self.b.create_block(self.func);
                let body_bb = self.b.create_block(self.func);
                let exit_bb = self.b.create_block(self.func);
                let _ = self.b.create_branch(cond_bb);
                self.move_to(cond_bb);
                let cond_val = self.lower_expr_rvalue(cond, None);
                let _ = self.b.create_cond_branch(cond_val, body_bb, exit_bb);
                self.move_to(body_bb);
                self.lower_stmt(body);
                if !self.terminated {
                    let _ = self.b.create_branch(cond_bb);
                }
                self.move_to(exit_bb);
            }
            StmtKind::For { init, cond, update, body } => {
                let (init, cond, update, body) = (*init, *cond, *update, *body);
                if let Some(init) = init {
                    self.lower_stmt(init);
                }
                let cond_bb = self.b.create_block(self.func);
                let body_bb = self.b.create_block(self.func);
                let exit_bb = self.b.create_block(self.func);
                let _ = self.b.create_branch(cond_bb);
                self.move_to(cond_bb);
                let cond_val = match cond {
                    Some(cond) => self.lower_expr_rvalue(cond, None),
                    None => self.b.module().const_bool(true),
                };
                let _ = self.b.create_cond_branch(cond_val, body_bb, exit_bb);
                self.move_to(body_bb);
                self.lower_stmt(body);
                if !self.terminated {
                    if let Some(update) = update {
                        self.lower_stmt(update);
                    }
                    let _ = self.b.create_branch(cond_bb);
                }
                self.move_to(exit_bb);
            }
            StmtKind::Null => {}
        }
    }

    /// The block the builder currently points into.
    pub(crate) fn current_block(&self) -> ValueId {
        self.b.insert_point().expect("builder is positioned").block
    }
}
