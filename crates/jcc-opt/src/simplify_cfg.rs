//! CFG simplification.
//!
//! A fixed point of three per-block simplifications, followed by a sweep of
//! blocks never reached from the entry:
//!
//! 1. Dead instructions (no users, no side effects) and everything after
//!    the first terminator are removed. Loads are kept even when unused.
//! 2. A block ending in an unconditional branch to a successor whose only
//!    predecessor is this block absorbs that successor.
//! 3. A conditional branch whose successor consists of exactly one
//!    unconditional branch is retargeted past it.

use jcc_tir::module::Module;
use jcc_tir::value::{InstKind, ValueId};
use log::debug;
use rustc_hash::FxHashSet;

/// Runs CFG simplification on one function until it stabilises.
/// Returns true if anything changed.
pub fn simplify_cfg(module: &mut Module, func: ValueId) -> bool {
    let mut changed_any = false;
    let mut visited: FxHashSet<ValueId> = FxHashSet::default();
    loop {
        visited.clear();
        let changed = match module.entry_block(func) {
            Some(entry) => visit_block(module, entry, &mut visited),
            None => false,
        };
        changed_any |= changed;
        if !changed {
            break;
        }
    }
    // Sweep the blocks the final traversal never reached.
    let unreachable: Vec<ValueId> =
        module.func_blocks(func).into_iter().filter(|b| !visited.contains(b)).collect();
    for block in unreachable {
        debug!("removing unreachable block {}", module.value(block).print_name());
        for inst in module.block_insts(block) {
            module.unlink_inst(inst);
            module.drop_operands(inst);
        }
        module.erase_block(block);
        changed_any = true;
    }
    changed_any
}

fn visit_block(module: &mut Module, block: ValueId, visited: &mut FxHashSet<ValueId>) -> bool {
    if !visited.insert(block) {
        return false;
    }
    let mut changed = delete_dead_instructions(module, block);
    changed |= merge_single_pred_single_succ(module, block);
    changed |= thread_one_branch(module, block);
    let Some(term) = module.terminator(block) else { return changed };
    if module.inst_kind(term) != InstKind::Branch {
        return changed;
    }
    for succ in module.successors(block) {
        changed |= visit_block(module, succ, visited);
    }
    changed
}

/// Removes dead instructions and everything past the first terminator.
fn delete_dead_instructions(module: &mut Module, block: ValueId) -> bool {
    let mut changed = false;
    let insts = module.block_insts(block);
    let mut first_terminator = None;
    for (i, &inst) in insts.iter().enumerate() {
        if module.is_terminator(inst) {
            first_terminator = Some(i);
            break;
        }
        // Stores and calls are never dead; unused loads are kept because
        // removing one could hide a fault.
        if module.value(inst).has_side_effects()
            || module.inst_kind(inst) == InstKind::Load
        {
            continue;
        }
        if module.value(inst).uses().is_empty() {
            module.erase_inst(inst);
            changed = true;
        }
    }
    // Everything after the first terminator never executes.
    if let Some(term_idx) = first_terminator {
        for &inst in &insts[term_idx + 1..] {
            if !module.value(inst).uses().is_empty() {
                let undef = module.undef(module.value(inst).ty);
                module.replace_all_uses_with(inst, undef);
            }
            module.unlink_inst(inst);
            module.drop_operands(inst);
            changed = true;
        }
    }
    changed
}

/// Absorbs a single-predecessor successor into this block.
fn merge_single_pred_single_succ(module: &mut Module, block: ValueId) -> bool {
    let Some(term) = module.terminator(block) else { return false };
    if module.inst_kind(term) != InstKind::Branch {
        return false;
    }
    let succs = module.successors(block);
    let [succ] = succs.as_slice() else { return false };
    let succ = *succ;
    if succ == block {
        return false;
    }
    // Every use of the successor must come from our terminator: any other
    // user is another predecessor (or a phi), and merging would be wrong.
    if module.value(succ).uses().iter().any(|u| u.user != term) {
        return false;
    }
    module.unlink_inst(term);
    module.drop_operands(term);
    for inst in module.block_insts(succ) {
        module.unlink_inst(inst);
        module.append_inst(block, inst);
    }
    module.replace_all_uses_with(succ, block);
    module.erase_block(succ);
    debug!("merged block into {}", module.value(block).print_name());
    true
}

/// Retargets either successor of a conditional branch past a block that
/// holds exactly one unconditional branch.
fn thread_one_branch(module: &mut Module, block: ValueId) -> bool {
    let mut changed = false;
    let Some(term) = module.terminator(block) else { return false };
    if module.inst_kind(term) != InstKind::Branch {
        return false;
    }
    // Successor operands of a branch sit at indices 1 and 2.
    for operand_idx in [1usize, 2] {
        let succ = module.value(term).operands()[operand_idx];
        if succ == block {
            continue;
        }
        let insts = module.block_insts(succ);
        let [only] = insts.as_slice() else { continue };
        let only = *only;
        if module.inst_kind(only) != InstKind::Branch {
            continue;
        }
        let targets = module.successors(succ);
        let [target] = targets.as_slice() else { continue };
        let target = *target;
        if target == succ {
            continue;
        }
        // Phi nodes in the far target record predecessor edges; threading
        // would invalidate them.
        if !module.block_phis(target).is_empty() {
            continue;
        }
        module.replace_operand(term, operand_idx, target);
        changed = true;
    }
    changed
}
