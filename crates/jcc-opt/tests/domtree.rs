//! Tests for the dominator tree and dominance frontiers.

use jcc_opt::domtree::DominatorTree;
use jcc_tir::builder::IrBuilder;
use jcc_tir::module::Module;
use jcc_tir::types::Context;
use jcc_tir::value::ValueId;

/// Builds the classic diamond: entry -> (then | other) -> merge.
fn diamond(module: &mut Module) -> (ValueId, [ValueId; 4]) {
    let i32_ty = module.ctx.i32_ty();
    let i1 = module.ctx.i1_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i1]);
    let func = module.create_function("f", fn_ty);
    let cond = module.func_args(func)[0];
    let mut b = IrBuilder::new(module);
    let entry = b.create_block(func);
    let then_bb = b.create_block(func);
    let else_bb = b.create_block(func);
    let merge = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let _ = b.create_cond_branch(cond, then_bb, else_bb);
    b.set_insert_point_at_end(then_bb);
    let _ = b.create_branch(merge);
    b.set_insert_point_at_end(else_bb);
    let _ = b.create_branch(merge);
    b.set_insert_point_at_end(merge);
    let zero = b.module().const_i32(0);
    let _ = b.create_return(Some(zero));
    (func, [entry, then_bb, else_bb, merge])
}

#[test]
fn test_idom_of_diamond() {
    let mut module = Module::new(Context::new(64));
    let (func, [entry, then_bb, else_bb, merge]) = diamond(&mut module);
    let dt = DominatorTree::new(&module, func);
    assert_eq!(dt.idom(entry), Some(entry), "the entry dominates itself");
    assert_eq!(dt.idom(then_bb), Some(entry));
    assert_eq!(dt.idom(else_bb), Some(entry));
    assert_eq!(dt.idom(merge), Some(entry), "the merge joins two paths");
}

#[test]
fn test_idom_dominates_its_block() {
    let mut module = Module::new(Context::new(64));
    let (func, blocks) = diamond(&mut module);
    let dt = DominatorTree::new(&module, func);
    for block in blocks {
        let idom = dt.idom(block).expect("every reachable block has an idom");
        assert!(dt.dominates(idom, block), "idom({block}) dominates {block}");
    }
}

#[test]
fn test_frontier_definition() {
    let mut module = Module::new(Context::new(64));
    let (func, blocks) = diamond(&mut module);
    let dt = DominatorTree::new(&module, func);
    // DF(b) contains exactly those blocks with a predecessor dominated by
    // b that b does not strictly dominate.
    for b in blocks {
        let frontier = dt.frontier(b);
        for c in blocks {
            let has_dominated_pred =
                module.predecessors(c).iter().any(|&p| dt.dominates(b, p));
            let strictly_dominates = b != c && dt.dominates(b, c);
            let expected = has_dominated_pred && !strictly_dominates;
            assert_eq!(
                frontier.contains(&c),
                expected,
                "frontier membership of {c} in DF({b})"
            );
        }
    }
}

#[test]
fn test_diamond_frontiers() {
    let mut module = Module::new(Context::new(64));
    let (func, [entry, then_bb, else_bb, merge]) = diamond(&mut module);
    let dt = DominatorTree::new(&module, func);
    assert_eq!(dt.frontier(then_bb), vec![merge]);
    assert_eq!(dt.frontier(else_bb), vec![merge]);
    assert!(dt.frontier(entry).is_empty());
    assert!(dt.frontier(merge).is_empty());
}

#[test]
fn test_dominator_tree_children() {
    let mut module = Module::new(Context::new(64));
    let (func, [entry, then_bb, else_bb, merge]) = diamond(&mut module);
    let dt = DominatorTree::new(&module, func);
    let mut children = dt.children(entry).to_vec();
    children.sort_unstable();
    let mut expected = vec![then_bb, else_bb, merge];
    expected.sort_unstable();
    assert_eq!(children, expected);
    assert!(dt.children(merge).is_empty());
}

#[test]
fn test_loop_header_frontier_contains_itself() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let i1 = module.ctx.i1_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i1]);
    let func = module.create_function("loopy", fn_ty);
    let cond = module.func_args(func)[0];
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    let header = b.create_block(func);
    let body = b.create_block(func);
    let exit = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let _ = b.create_branch(header);
    b.set_insert_point_at_end(header);
    let _ = b.create_cond_branch(cond, body, exit);
    b.set_insert_point_at_end(body);
    let _ = b.create_branch(header);
    b.set_insert_point_at_end(exit);
    let zero = b.module().const_i32(0);
    let _ = b.create_return(Some(zero));
    drop(b);

    let dt = DominatorTree::new(&module, func);
    // The back edge puts the header in its own frontier.
    assert!(dt.frontier(header).contains(&header));
    assert!(dt.frontier(body).contains(&header));
}
