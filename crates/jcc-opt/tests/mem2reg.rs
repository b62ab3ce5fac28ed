//! Tests for SSA construction.

use jcc_opt::mem2reg;
use jcc_tir::builder::IrBuilder;
use jcc_tir::module::Module;
use jcc_tir::types::Context;
use jcc_tir::value::{BinOp, InstKind, ValueId, ValueKind};

fn count_kind(module: &Module, func: ValueId, want: fn(InstKind) -> bool) -> usize {
    module
        .func_blocks(func)
        .into_iter()
        .flat_map(|b| module.block_insts(b))
        .filter(|&i| want(module.inst_kind(i)))
        .count()
}

#[test]
fn test_straight_line_promotion() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i32_ty]);
    let func = module.create_function("f", fn_ty);
    let arg = module.func_args(func)[0];
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let slot = b.create_alloca(i32_ty);
    let _ = b.create_store(arg, slot);
    let load = b.create_load(i32_ty, slot);
    let add = b.create_binary(BinOp::Add, load, load);
    let _ = b.create_return(Some(add));
    drop(b);

    mem2reg(&mut module, func);
    // The promoted alloca, its store and its load are all gone.
    assert_eq!(count_kind(&module, func, |k| matches!(k, InstKind::Alloca { .. })), 0);
    assert_eq!(count_kind(&module, func, |k| k == InstKind::Store), 0);
    assert_eq!(count_kind(&module, func, |k| k == InstKind::Load), 0);
    // The load's uses folded to the argument.
    assert_eq!(module.value(add).operands(), &[arg, arg]);
}

#[test]
fn test_phi_inserted_at_join() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let i1 = module.ctx.i1_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i1]);
    let func = module.create_function("f", fn_ty);
    let cond = module.func_args(func)[0];
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    let then_bb = b.create_block(func);
    let else_bb = b.create_block(func);
    let merge = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let slot = b.create_alloca(i32_ty);
    let _ = b.create_cond_branch(cond, then_bb, else_bb);
    b.set_insert_point_at_end(then_bb);
    let one = b.module().const_i32(1);
    let _ = b.create_store(one, slot);
    let _ = b.create_branch(merge);
    b.set_insert_point_at_end(else_bb);
    let two = b.module().const_i32(2);
    let _ = b.create_store(two, slot);
    let _ = b.create_branch(merge);
    b.set_insert_point_at_end(merge);
    let load = b.create_load(i32_ty, slot);
    let _ = b.create_return(Some(load));
    drop(b);

    mem2reg(&mut module, func);
    // One phi at the join, with exactly one incoming pair per predecessor.
    let phis = module.block_phis(merge);
    assert_eq!(phis.len(), 1);
    let incoming = module.phi_incoming(phis[0]);
    let preds = module.predecessors(merge);
    assert_eq!(incoming.len(), preds.len());
    for pred in preds {
        let matching: Vec<_> =
            incoming.iter().filter(|(p, _)| *p == pred).collect();
        assert_eq!(matching.len(), 1, "one incoming per predecessor edge");
    }
    let mut values: Vec<ValueId> = incoming.iter().map(|&(_, v)| v).collect();
    values.sort_unstable();
    let mut expected = vec![one, two];
    expected.sort_unstable();
    assert_eq!(values, expected);
    // The return reads the phi now.
    let ret = module.terminator(merge).unwrap();
    assert_eq!(module.value(ret).operands(), &[phis[0]]);
    // No promotable alloca survives.
    assert_eq!(count_kind(&module, func, |k| matches!(k, InstKind::Alloca { .. })), 0);
}

#[test]
fn test_load_before_store_reads_undef() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![]);
    let func = module.create_function("f", fn_ty);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let slot = b.create_alloca(i32_ty);
    let load = b.create_load(i32_ty, slot);
    let _ = b.create_return(Some(load));
    drop(b);

    mem2reg(&mut module, func);
    let ret = module.terminator(entry).unwrap();
    let returned = module.value(ret).operands()[0];
    assert!(matches!(module.value(returned).kind, ValueKind::Undef));
}

#[test]
fn test_non_scalar_alloca_is_not_promoted() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let struct_ty = module.ctx.struct_ty(vec![i32_ty, i32_ty]);
    let fn_ty = module.ctx.function_ty(i32_ty, vec![]);
    let func = module.create_function("f", fn_ty);
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let slot = b.create_alloca(struct_ty);
    let load = b.create_load(i32_ty, slot);
    let _ = b.create_return(Some(load));
    drop(b);

    mem2reg(&mut module, func);
    assert_eq!(count_kind(&module, func, |k| matches!(k, InstKind::Alloca { .. })), 1);
    assert_eq!(count_kind(&module, func, |k| k == InstKind::Load), 1);
}

#[test]
fn test_no_promotable_allocas_is_a_noop() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i32_ty]);
    let func = module.create_function("f", fn_ty);
    let arg = module.func_args(func)[0];
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let add = b.create_binary(BinOp::Add, arg, arg);
    let _ = b.create_return(Some(add));
    drop(b);

    let before: Vec<_> = module.block_insts(entry);
    let values_before = module.value_count();
    mem2reg(&mut module, func);
    assert_eq!(module.block_insts(entry), before);
    assert_eq!(module.value_count(), values_before, "no values were created");
}
