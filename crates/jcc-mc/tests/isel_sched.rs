//! Tests for pattern matching, instruction selection and scheduling.

use jcc_mc::builder::build_dag;
use jcc_mc::isel::{PatternProvider, def_matches, select_instructions};
use jcc_mc::node::{NodeKind, Payload};
use jcc_mc::sched::schedule;
use jcc_mc::target::TargetIsel;
use jcc_mc::x86::{X86Inst, X86Target};
use jcc_tir::builder::IrBuilder;
use jcc_tir::module::Module;
use jcc_tir::types::Context;
use jcc_tir::value::{BinOp, ValueId};

fn ret_constant_function(module: &mut Module) -> ValueId {
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![]);
    let func = module.create_function("m", fn_ty);
    let mut b = IrBuilder::new(module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let seven = b.module().const_i32(7);
    let _ = b.create_return(Some(seven));
    func
}

/// Seed scenario 1 continued: selecting `RETURN (Constant 7)` picks the
/// move-immediate pattern, leaving one machine instruction carrying the
/// returned constant.
#[test]
fn test_return_constant_selects_mov_imm() {
    let mut module = Module::new(Context::new(64));
    let func = ret_constant_function(&mut module);
    let target = X86Target::new();
    let mut mcf = build_dag(&module, func, &target);
    let provider = PatternProvider::new(&target);
    select_instructions(&mut mcf, &provider);

    let entry = mcf.subgraphs[0].root;
    assert_eq!(mcf.node(entry).num_children(), 1);
    let selected = mcf.node(entry).children()[0];
    assert_eq!(mcf.node(selected).kind, NodeKind::MachineInstr);
    match mcf.node(selected).payload {
        Some(Payload::Pattern(def)) => assert_eq!(def.inst, X86Inst::MovRi as u16),
        _ => panic!("selected node carries its pattern definition"),
    }
    assert_eq!(mcf.node(selected).arity(), 1);
    let operand = mcf.node(selected).operands()[0];
    assert_eq!(mcf.node(operand).payload, Some(Payload::Imm { bits: 32, value: 7 }));
    // Exactly one machine instruction was created.
    let machine_count = (0..mcf.node_count())
        .filter(|&i| {
            let node = mcf.node(jcc_mc::node::NodeId::from_raw(i));
            node.kind == NodeKind::MachineInstr && !node.is_destroyed()
        })
        .count();
    assert_eq!(machine_count, 1);
}

/// An add of an argument and an immediate selects the RI form, and the
/// return then selects the register form over the consumed add.
#[test]
fn test_add_immediate_selects_ri_form() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i32_ty]);
    let func = module.create_function("f", fn_ty);
    let arg = module.func_args(func)[0];
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let five = b.module().const_i32(5);
    let sum = b.create_binary(BinOp::Add, arg, five);
    let _ = b.create_return(Some(sum));
    drop(b);

    let target = X86Target::new();
    let mut mcf = build_dag(&module, func, &target);
    let provider = PatternProvider::new(&target);
    select_instructions(&mut mcf, &provider);

    let entry_node = mcf.subgraphs[0].root;
    let ret = mcf.node(entry_node).children()[0];
    assert_eq!(mcf.node(ret).kind, NodeKind::MachineInstr);
    match mcf.node(ret).payload {
        Some(Payload::Pattern(def)) => assert_eq!(def.inst, X86Inst::MovRr as u16),
        _ => panic!("the return selected the register move"),
    }
    let add = mcf.node(ret).operands()[0];
    assert_eq!(mcf.node(add).kind, NodeKind::MachineInstr);
    match mcf.node(add).payload {
        Some(Payload::Pattern(def)) => assert_eq!(def.inst, X86Inst::AddRi as u16),
        _ => panic!("the add selected the immediate form"),
    }
}

/// The matcher and the tape agree: a pattern matches iff executing its
/// tape against the root completes without a mismatch.
#[test]
fn test_pattern_ordering_prefers_folds() {
    let target = X86Target::new();
    let provider = PatternProvider::new(&target);
    let add_patterns = provider.patterns_for(NodeKind::Add);
    assert!(!add_patterns.is_empty());
    // Every two-input def sorts before any one-input def, and among the
    // two-input defs the ones with fewer register operands come first.
    for pair in add_patterns.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        assert!(
            a.num_inputs > b.num_inputs
                || (a.num_inputs == b.num_inputs
                    && a.num_register_inputs() <= b.num_register_inputs()),
            "patterns are sorted for maximal munch"
        );
    }
}

#[test]
fn test_tape_matcher_equivalence() {
    let mut module = Module::new(Context::new(64));
    let func = ret_constant_function(&mut module);
    let target = X86Target::new();
    let mcf = build_dag(&module, func, &target);
    let entry = mcf.subgraphs[0].root;
    let ret = mcf.node(entry).children()[0];
    // Only Return-rooted patterns can match the return node.
    for def in target.patterns().iter() {
        for pat in &def.patterns[..def.num_patterns] {
            let matched = def_matches(&mcf, &target, def, pat, ret);
            if matched {
                assert_eq!(pat.root_kind(), NodeKind::Return);
            }
            if pat.root_kind() != NodeKind::Return {
                assert!(!matched, "a non-Return shape cannot match a Return root");
            }
        }
    }
}

#[test]
fn test_schedule_is_topological_with_live_ranges() {
    let mut module = Module::new(Context::new(64));
    let i32_ty = module.ctx.i32_ty();
    let fn_ty = module.ctx.function_ty(i32_ty, vec![i32_ty]);
    let func = module.create_function("f", fn_ty);
    let arg = module.func_args(func)[0];
    let mut b = IrBuilder::new(&mut module);
    let entry = b.create_block(func);
    b.set_insert_point_at_end(entry);
    let five = b.module().const_i32(5);
    let sum = b.create_binary(BinOp::Add, arg, five);
    let twice = b.create_binary(BinOp::Add, sum, sum);
    let _ = b.create_return(Some(twice));
    drop(b);

    let target = X86Target::new();
    let mut mcf = build_dag(&module, func, &target);
    schedule(&mut mcf);

    let order = &mcf.subgraphs[0].sched_order;
    assert!(!order.is_empty());
    // Topological indices increase strictly in scheduled order.
    for pair in order.windows(2) {
        assert!(mcf.node(pair[0]).topo_idx() < mcf.node(pair[1]).topo_idx());
    }
    // Every scheduled user precedes the nodes it consumes, and each node's
    // live range covers its consumers: to <= from, with to at the
    // furthest-up consumer.
    for &node in order {
        let (from, to) = mcf.node(node).live_range();
        assert!(from >= to, "interval runs from definition down to last use");
        for use_entry in mcf.node(node).uses() {
            if (use_entry.index as usize) < mcf.node(use_entry.user).arity() {
                let user_idx = mcf.node(use_entry.user).topo_idx();
                if user_idx >= 0 {
                    assert!(user_idx < from, "consumers schedule before producers");
                    assert!(to <= user_idx, "the live range reaches every consumer");
                }
            }
        }
    }
    // The scheduled list links match the order.
    for pair in order.windows(2) {
        assert_eq!(mcf.node(pair[0]).next, Some(pair[1]));
        assert_eq!(mcf.node(pair[1]).prev, Some(pair[0]));
    }
}
