//! End-to-end lowering tests: analyzed AST programs down to TIR.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_ast::expr::{ExprNodeKind, LiteralValue};
use jcc_ast::ids::{ClassId, TypeDecl, UnitId};
use jcc_ast::modifiers::{ModifierFlags, Modifiers};
use jcc_ast::stmt::StmtKind;
use jcc_ast::ty::BuiltInKind;
use jcc_codegen::lower_program;
use jcc_semantic::context::SemanticContext;
use jcc_source::types::SourceRange;
use jcc_tir::module::Module;
use jcc_tir::value::{InstKind, ValueId, ValueKind};

struct Program {
    ast: Ast,
    lu: LinkingUnit,
}

impl Program {
    fn new() -> Self { Self { ast: Ast::new(), lu: LinkingUnit::default() } }

    fn add_class(&mut self, pkg: &[&str], name: &str) -> (UnitId, ClassId) {
        let pkg: Vec<String> = pkg.iter().map(|s| (*s).to_string()).collect();
        let unit = self.ast.new_unit(pkg, Vec::new(), SourceRange::synthetic());
        let class = self.ast.new_class(
            Modifiers::new().with(ModifierFlags::PUBLIC),
            name,
            None,
            Vec::new(),
            SourceRange::synthetic(),
        );
        self.ast.set_unit_body(unit, TypeDecl::Class(class));
        self.lu.units.push(unit);
        (unit, class)
    }

    fn analyze(&mut self) -> SemanticContext {
        SemanticContext::analyze(&mut self.ast, &self.lu)
    }
}

fn func_insts(module: &Module, func: ValueId) -> Vec<ValueId> {
    module
        .func_blocks(func)
        .into_iter()
        .flat_map(|b| module.block_insts(b))
        .collect()
}

/// Seed scenario 1: `class C { public static int m() { return 7; } }`
/// lowers to one basic block holding `ret i32 7`.
#[test]
fn test_static_method_returning_a_constant() {
    let mut p = Program::new();
    let _ = p.add_class(&["java", "lang"], "Object");
    let (_, class) = p.add_class(&["a"], "C");
    let scope = p.ast.scopes.new_scope(None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let expr = p.ast.new_expr(scope, SourceRange::synthetic());
    let seven = p.ast.new_expr_node(
        ExprNodeKind::Literal { value: LiteralValue::Int(7) },
        SourceRange::synthetic(),
    );
    p.ast.expr_push(expr, seven);
    let ret = p.ast.new_stmt(StmtKind::Return(Some(expr)), SourceRange::synthetic());
    let body = p.ast.new_stmt(StmtKind::Block(vec![ret]), SourceRange::synthetic());
    let method = p.ast.new_method(
        Modifiers::new().with(ModifierFlags::PUBLIC).with(ModifierFlags::STATIC),
        "m",
        Some(int_ty),
        Vec::new(),
        false,
        Some(body),
        SourceRange::synthetic(),
    );
    p.ast.class_add_method(class, method);

    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", sema.diag.errors());

    let module = lower_program(&p.ast, &p.lu, &sema);
    let func = module.global("a.C.m").expect("method was declared");
    let blocks = module.func_blocks(func);
    assert_eq!(blocks.len(), 1, "a single basic block");
    let insts = module.block_insts(blocks[0]);
    assert_eq!(insts.len(), 1, "a single instruction");
    let ret = insts[0];
    assert_eq!(module.inst_kind(ret), InstKind::Return);
    let operand = module.value(ret).operands()[0];
    match module.value(operand).kind {
        ValueKind::ConstantInt { value } => assert_eq!(value, 7),
        _ => panic!("return operand should be the constant 7"),
    }
    assert!(module.ctx.is_integer(module.value(operand).ty));
    assert_eq!(module.ctx.size_in_bits(module.value(operand).ty), 32);
}

/// Seed scenario 2: an instance method returning an instance field lowers
/// to alloca + store + load + gep + load, and mem2reg folds the receiver
/// loads into direct uses of the argument.
#[test]
fn test_field_access_through_this() {
    let mut p = Program::new();
    let _ = p.add_class(&["java", "lang"], "Object");
    let (_, class) = p.add_class(&["a"], "C");
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);
    let field = p.ast.new_field(
        Modifiers::new().with(ModifierFlags::PUBLIC),
        int_ty,
        "f",
        None,
        SourceRange::synthetic(),
    );
    p.ast.class_add_field(class, field);
    let scope = p.ast.scopes.new_scope(None);
    let expr = p.ast.new_expr(scope, SourceRange::synthetic());
    for kind in [
        ExprNodeKind::This,
        ExprNodeKind::MemberName { name: "f".to_string() },
        ExprNodeKind::MemberAccess,
    ] {
        let node = p.ast.new_expr_node(kind, SourceRange::synthetic());
        p.ast.expr_push(expr, node);
    }
    let int_ret = p.ast.new_builtin(BuiltInKind::Int);
    let ret = p.ast.new_stmt(StmtKind::Return(Some(expr)), SourceRange::synthetic());
    let body = p.ast.new_stmt(StmtKind::Block(vec![ret]), SourceRange::synthetic());
    let method = p.ast.new_method(
        Modifiers::new().with(ModifierFlags::PUBLIC),
        "getF",
        Some(int_ret),
        Vec::new(),
        false,
        Some(body),
        SourceRange::synthetic(),
    );
    p.ast.class_add_method(class, method);

    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", sema.diag.errors());

    let mut module = lower_program(&p.ast, &p.lu, &sema);
    let func = module.global("a.C.getF").expect("method was declared");
    // Before mem2reg: the receiver spills through an alloca.
    let kinds: Vec<InstKind> =
        func_insts(&module, func).iter().map(|&i| module.inst_kind(i)).collect();
    assert!(matches!(kinds[0], InstKind::Alloca { .. }), "receiver alloca first: {kinds:?}");
    assert_eq!(kinds[1], InstKind::Store, "the argument is stored: {kinds:?}");
    assert!(kinds.contains(&InstKind::Load));
    assert!(kinds.iter().any(|k| matches!(k, InstKind::Gep { .. })));

    // After mem2reg: the alloca is gone and the GEP addresses the argument
    // directly.
    jcc_opt::mem2reg(&mut module, func);
    let insts = func_insts(&module, func);
    let kinds: Vec<InstKind> = insts.iter().map(|&i| module.inst_kind(i)).collect();
    assert!(
        !kinds.iter().any(|k| matches!(k, InstKind::Alloca { .. })),
        "the receiver alloca was promoted: {kinds:?}"
    );
    let this_arg = module.func_args(func)[0];
    let gep = insts
        .iter()
        .copied()
        .find(|&i| matches!(module.inst_kind(i), InstKind::Gep { .. }))
        .expect("field access keeps its GEP");
    assert_eq!(
        module.value(gep).operands()[0],
        this_arg,
        "the receiver load folded into the argument"
    );
}

/// Control flow: an if statement lowers to a conditional branch diamond,
/// and short-circuit `&&` produces extra blocks.
#[test]
fn test_if_statement_control_flow() {
    let mut p = Program::new();
    let _ = p.add_class(&["java", "lang"], "Object");
    let (_, class) = p.add_class(&["a"], "C");
    let scope = p.ast.scopes.new_scope(None);
    let int_ty = p.ast.new_builtin(BuiltInKind::Int);

    let cond = p.ast.new_expr(scope, SourceRange::synthetic());
    let t = p.ast.new_expr_node(
        ExprNodeKind::Literal { value: LiteralValue::Bool(true) },
        SourceRange::synthetic(),
    );
    p.ast.expr_push(cond, t);

    let one = p.ast.new_expr(scope, SourceRange::synthetic());
    let one_node = p.ast.new_expr_node(
        ExprNodeKind::Literal { value: LiteralValue::Int(1) },
        SourceRange::synthetic(),
    );
    p.ast.expr_push(one, one_node);
    let two = p.ast.new_expr(scope, SourceRange::synthetic());
    let two_node = p.ast.new_expr_node(
        ExprNodeKind::Literal { value: LiteralValue::Int(2) },
        SourceRange::synthetic(),
    );
    p.ast.expr_push(two, two_node);

    let ret_one = p.ast.new_stmt(StmtKind::Return(Some(one)), SourceRange::synthetic());
    let ret_two = p.ast.new_stmt(StmtKind::Return(Some(two)), SourceRange::synthetic());
    let if_stmt = p.ast.new_stmt(
        StmtKind::If { cond, then_stmt: ret_one, else_stmt: Some(ret_two) },
        SourceRange::synthetic(),
    );
    let body = p.ast.new_stmt(StmtKind::Block(vec![if_stmt]), SourceRange::synthetic());
    let method = p.ast.new_method(
        Modifiers::new().with(ModifierFlags::PUBLIC).with(ModifierFlags::STATIC),
        "pick",
        Some(int_ty),
        Vec::new(),
        false,
        Some(body),
        SourceRange::synthetic(),
    );
    p.ast.class_add_method(class, method);

    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", sema.diag.errors());

    let module = lower_program(&p.ast, &p.lu, &sema);
    let func = module.global("a.C.pick").expect("method was declared");
    let blocks = module.func_blocks(func);
    assert!(blocks.len() >= 4, "entry, then, else and merge blocks");
    let entry = module.entry_block(func).unwrap();
    assert_eq!(module.successors(entry).len(), 2, "the entry branches both ways");
    // Both arms return.
    let returns = func_insts(&module, func)
        .into_iter()
        .filter(|&i| module.inst_kind(i) == InstKind::Return)
        .count();
    assert!(returns >= 2);
}
