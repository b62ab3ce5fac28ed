//! Tests for the IR builder and the instruction list invariants.

use jcc_tir::builder::IrBuilder;
use jcc_tir::module::{InsertPoint, Module, Pos};
use jcc_tir::types::Context;
use jcc_tir::value::{BinOp, InstKind, Predicate, ValueKind};

fn test_function(module: &mut Module) -> jcc_tir::value::ValueId {
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i32_ty, i32_ty]);
    module.create_function("f", fn_ty)
}

#[test]
fn test_function_preallocates_arguments() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let args = module.func_args(func);
    assert_eq!(args.len(), 2);
    for (i, &arg) in args.iter().enumerate() {
        match module.value(arg).kind {
            ValueKind::Argument { index, func: parent } => {
                assert_eq!(index as usize, i);
                assert_eq!(parent, func);
            }
            _ => panic!("expected an argument value"),
        }
    }
}

#[test]
fn test_builder_inserts_in_order() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let args = module.func_args(func);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let add = b.create_binary(BinOp::Add, args[0], args[1]);
    let cmp = b.create_cmp(Predicate::Gt, add, args[0]);
    let ret = b.create_return(Some(add));
    drop(b);
    assert_eq!(module.block_insts(entry), vec![add, cmp, ret]);
    assert_eq!(module.terminator(entry), Some(ret));
}

#[test]
fn test_insert_before_begin_cursor() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let args = module.func_args(func);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let ret = b.create_return(Some(args[0]));
    // Now insert at the head: the cursor advances past each insertion, so
    // two inserts stay in program order.
    b.set_insert_point(InsertPoint { block: entry, pos: Pos::BeforeFirst });
    let first = b.create_binary(BinOp::Add, args[0], args[1]);
    let second = b.create_binary(BinOp::Sub, first, args[1]);
    drop(b);
    assert_eq!(module.block_insts(entry), vec![first, second, ret]);
}

#[test]
fn test_unconditional_branch_is_conditional_on_true() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    let target = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let br = b.create_branch(target);
    drop(b);
    assert_eq!(module.inst_kind(br), InstKind::Branch);
    let operands = module.value(br).operands().to_vec();
    assert_eq!(operands[1], target);
    assert_eq!(operands[2], target);
    match module.value(operands[0]).kind {
        ValueKind::ConstantInt { value } => assert_eq!(value, 1),
        _ => panic!("branch condition should be the constant true"),
    }
    assert_eq!(module.successors(entry), vec![target]);
    assert_eq!(module.predecessors(target), vec![entry]);
}

#[test]
fn test_terminator_is_last() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let args = module.func_args(func);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let _ = b.create_binary(BinOp::Mul, args[0], args[1]);
    let ret = b.create_return(None);
    drop(b);
    let insts = module.block_insts(entry);
    assert_eq!(*insts.last().unwrap(), ret);
    let non_terminators_after = insts
        .iter()
        .skip_while(|&&i| i != ret)
        .skip(1)
        .count();
    assert_eq!(non_terminators_after, 0, "nothing follows the terminator");
}

#[test]
fn test_value_print_names() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let args = module.func_args(func);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let add = b.create_binary(BinOp::Add, args[0], args[1]);
    drop(b);
    module.set_name(add, "sum");
    let vid = module.value(add).vid;
    assert_eq!(module.value(add).print_name(), format!("%sum.{vid}"));
    let dump = module.function_string(func);
    assert!(dump.contains("function i32 @f("), "dump starts with the signature: {dump}");
    assert!(dump.contains(&format!("%sum.{vid} = add")), "dump names values: {dump}");
}

#[test]
fn test_reverse_post_order_visits_entry_first() {
    let mut module = Module::new(Context::new(64));
    let func = test_function(&mut module);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    let then_bb = b.create_block(func);
    let else_bb = b.create_block(func);
    let merge = b.create_block(func);
    let cond = b.module().const_bool(true);
    b.set_insert_point_at_end(entry);
    let _ = b.create_cond_branch(cond, then_bb, else_bb);
    b.set_insert_point_at_end(then_bb);
    let _ = b.create_branch(merge);
    b.set_insert_point_at_end(else_bb);
    let _ = b.create_branch(merge);
    b.set_insert_point_at_end(merge);
    let _ = b.create_return(None);
    drop(b);

    let rpo = module.reverse_post_order(func);
    assert_eq!(rpo.len(), 4);
    assert_eq!(rpo[0], entry);
    assert_eq!(*rpo.last().unwrap(), merge);
    let pos = |b: jcc_tir::value::ValueId| rpo.iter().position(|&x| x == b).unwrap();
    assert!(pos(then_bb) < pos(merge));
    assert!(pos(else_bb) < pos(merge));
}
