//! SSA construction: promote allocas to values.
//!
//! Phi placement follows Cytron et al.: for each promotable alloca, a phi
//! is inserted at the iterated dominance frontier of its stores. Renaming
//! walks the dominator tree top-down with a value stack per alloca; loads
//! become uses of the reaching definition, stores push definitions, and
//! phi incoming values are filled in per predecessor edge. Afterwards the
//! promoted allocas and their loads and stores are erased.

use jcc_tir::module::Module;
use jcc_tir::value::{InstKind, ValueId};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use crate::domtree::DominatorTree;

/// Runs mem2reg on one function. A function without promotable allocas is
/// left untouched.
pub fn mem2reg(module: &mut Module, func: ValueId) {
    if module.entry_block(func).is_none() {
        return;
    }
    let dt = DominatorTree::new(module, func);
    let mut promotion = Promotion::default();
    for alloca in module.allocas(func) {
        if !can_promote(module, alloca) {
            continue;
        }
        debug!("promoting {}", module.value(alloca).print_name());
        promotion.place_phi_nodes(module, &dt, alloca);
        for user in module.users(alloca) {
            match module.inst_kind(user) {
                InstKind::Store => {
                    let _ = promotion.stores.insert(user);
                }
                InstKind::Load => {
                    let _ = promotion.loads.insert(user);
                }
                _ => unreachable!("promotable alloca has a non-memory user"),
            }
        }
        let _ = promotion.allocas.insert(alloca);
    }
    if promotion.allocas.is_empty() {
        return;
    }
    let entry = module.entry_block(func).expect("function has an entry block");
    promotion.rename(module, &dt, entry);
    // The rewritten loads and stores are dead now; so are the allocas.
    for store in promotion.stores.iter().copied().collect::<Vec<_>>() {
        module.erase_inst(store);
    }
    for load in promotion.loads.iter().copied().collect::<Vec<_>>() {
        debug_assert!(module.value(load).uses().is_empty());
        module.erase_inst(load);
    }
    for alloca in promotion.allocas.iter().copied().collect::<Vec<_>>() {
        debug_assert!(module.value(alloca).uses().is_empty());
        module.erase_inst(alloca);
    }
}

/// A promotable alloca holds a scalar (integer or pointer) and every user
/// is a load from it or a store to it.
fn can_promote(module: &Module, alloca: ValueId) -> bool {
    let InstKind::Alloca { allocated } = module.inst_kind(alloca) else { return false };
    if !module.ctx.is_integer(allocated) && !module.ctx.is_pointer(allocated) {
        return false;
    }
    for use_entry in module.value(alloca).uses() {
        let user = use_entry.user;
        if !module.value(user).is_instruction() {
            return false;
        }
        match module.inst_kind(user) {
            InstKind::Load => {}
            // The alloca must be the address, not the stored value.
            InstKind::Store if use_entry.index == 1 => {}
            _ => return false,
        }
    }
    true
}

#[derive(Debug, Default)]
struct Promotion {
    allocas: FxHashSet<ValueId>,
    stores: FxHashSet<ValueId>,
    loads: FxHashSet<ValueId>,
    /// Inserted phi -> its alloca
    phi_alloca: FxHashMap<ValueId, ValueId>,
    /// Per-alloca stack of reaching definitions
    var_stack: FxHashMap<ValueId, Vec<ValueId>>,
}

impl Promotion {
    /// Worklist phi placement over the dominance frontier.
    fn place_phi_nodes(&mut self, module: &mut Module, dt: &DominatorTree, alloca: ValueId) {
        let InstKind::Alloca { allocated } = module.inst_kind(alloca) else { unreachable!() };
        let mut placed: FxHashSet<ValueId> = FxHashSet::default();
        let mut enqueued: FxHashSet<ValueId> = FxHashSet::default();
        let mut worklist: VecDeque<ValueId> = VecDeque::new();
        // The defining blocks are those containing a store to the alloca.
        for use_entry in module.value(alloca).uses().to_vec() {
            if module.inst_kind(use_entry.user) == InstKind::Store
                && let Some(block) = module.inst_parent(use_entry.user)
                && enqueued.insert(block)
            {
                worklist.push_back(block);
            }
        }
        while let Some(block) = worklist.pop_front() {
            for frontier_block in dt.frontier(block) {
                if !placed.insert(frontier_block) {
                    continue;
                }
                let phi = module.new_phi(allocated, &[]);
                module.set_name(phi, "phi");
                module.insert_inst_before_begin(frontier_block, phi);
                let _ = self.phi_alloca.insert(phi, alloca);
                if enqueued.insert(frontier_block) {
                    worklist.push_back(frontier_block);
                }
            }
        }
    }

    /// Dominator-tree pre-order renaming walk.
    fn rename(&mut self, module: &mut Module, dt: &DominatorTree, block: ValueId) {
        let mut pushed: Vec<ValueId> = Vec::new();
        // Phis at the head of the block define their alloca.
        for phi in module.block_phis(block) {
            if let Some(&alloca) = self.phi_alloca.get(&phi) {
                pushed.push(alloca);
                self.var_stack.entry(alloca).or_default().push(phi);
            }
        }
        for inst in module.block_insts(block) {
            if self.allocas.contains(&inst) {
                // A promoted alloca defines undef. It dominates all of its
                // uses, so this push is never popped.
                let InstKind::Alloca { allocated } = module.inst_kind(inst) else {
                    unreachable!()
                };
                let undef = module.undef(allocated);
                self.var_stack.entry(inst).or_default().push(undef);
            } else if self.stores.contains(&inst) {
                let alloca = module.value(inst).operands()[1];
                let value = module.value(inst).operands()[0];
                pushed.push(alloca);
                self.var_stack.entry(alloca).or_default().push(value);
            } else if self.loads.contains(&inst) {
                let alloca = module.value(inst).operands()[0];
                let reaching = self.reaching_def(module, alloca);
                module.replace_all_uses_with(inst, reaching);
            }
        }
        // Fill our edge of every successor phi.
        for succ in module.successors(block) {
            for phi in module.block_phis(succ) {
                if let Some(&alloca) = self.phi_alloca.get(&phi) {
                    let reaching = self.reaching_def(module, alloca);
                    module.phi_set_incoming(phi, block, reaching);
                }
            }
        }
        for &child in dt.children(block) {
            self.rename(module, dt, child);
        }
        for alloca in pushed {
            let _ = self.var_stack.get_mut(&alloca).expect("pushed entry exists").pop();
        }
    }

    /// The current reaching definition for an alloca; undef when the walk
    /// has not seen a definition yet.
    fn reaching_def(&mut self, module: &mut Module, alloca: ValueId) -> ValueId {
        if let Some(&top) = self.var_stack.get(&alloca).and_then(|stack| stack.last()) {
            return top;
        }
        let InstKind::Alloca { allocated } = module.inst_kind(alloca) else { unreachable!() };
        module.undef(allocated)
    }
}
