//! Dominator tree and dominance frontiers.
//!
//! Computed with the Cooper–Harvey–Kennedy iterative algorithm over
//! reverse post-order indices. The frontier of a block `b` is the set of
//! blocks `c` such that `b` dominates a predecessor of `c` but does not
//! strictly dominate `c`.

use jcc_tir::module::Module;
use jcc_tir::value::ValueId;
use rustc_hash::{FxHashMap, FxHashSet};

/// The dominator tree of one function.
#[derive(Debug)]
pub struct DominatorTree {
    /// Immediate dominator per block; the entry maps to itself
    idoms: FxHashMap<ValueId, ValueId>,
    /// Dominator-tree children per block
    children: FxHashMap<ValueId, Vec<ValueId>>,
    /// Dominance frontier per block
    frontiers: FxHashMap<ValueId, FxHashSet<ValueId>>,
    entry: Option<ValueId>,
}

impl DominatorTree {
    /// Computes the tree and frontiers for a function.
    #[must_use]
    pub fn new(module: &Module, func: ValueId) -> Self {
        let mut tree = Self {
            idoms: FxHashMap::default(),
            children: FxHashMap::default(),
            frontiers: FxHashMap::default(),
            entry: module.entry_block(func),
        };
        let rpo = module.reverse_post_order(func);
        let mut rpo_index: FxHashMap<ValueId, usize> = FxHashMap::default();
        for (i, &block) in rpo.iter().enumerate() {
            let _ = rpo_index.insert(block, i);
        }
        tree.compute_dominators(module, &rpo, &rpo_index);
        tree.compute_frontiers(module, &rpo);
        for &block in &rpo {
            if let Some(&idom) = tree.idoms.get(&block)
                && idom != block
            {
                tree.children.entry(idom).or_default().push(block);
            }
        }
        tree
    }

    /// The immediate dominator of a block (the entry dominates itself).
    #[must_use]
    pub fn idom(&self, block: ValueId) -> Option<ValueId> { self.idoms.get(&block).copied() }

    /// The dominator-tree children of a block.
    #[must_use]
    pub fn children(&self, block: ValueId) -> &[ValueId] {
        self.children.get(&block).map_or(&[], Vec::as_slice)
    }

    /// The dominance frontier of a block.
    #[must_use]
    pub fn frontier(&self, block: ValueId) -> Vec<ValueId> {
        self.frontiers
            .get(&block)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Does `a` dominate `b`? Reflexive.
    #[must_use]
    pub fn dominates(&self, a: ValueId, b: ValueId) -> bool {
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.idoms.get(&cur) {
                Some(&idom) if idom != cur => cur = idom,
                _ => return false,
            }
        }
    }

    fn compute_dominators(
        &mut self,
        module: &Module,
        rpo: &[ValueId],
        rpo_index: &FxHashMap<ValueId, usize>,
    ) {
        let Some(entry) = self.entry else { return };
        let _ = self.idoms.insert(entry, entry);
        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo {
                let mut new_idom: Option<ValueId> = None;
                for pred in module.predecessors(block) {
                    if !self.idoms.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => self.intersect(pred, current, rpo_index),
                    });
                }
                let Some(new_idom) = new_idom else { continue };
                if self.idoms.get(&block) != Some(&new_idom) {
                    let _ = self.idoms.insert(block, new_idom);
                    changed = true;
                }
            }
        }
    }

    fn intersect(
        &self,
        b1: ValueId,
        b2: ValueId,
        rpo_index: &FxHashMap<ValueId, usize>,
    ) -> ValueId {
        let mut finger1 = b1;
        let mut finger2 = b2;
        while finger1 != finger2 {
            while rpo_index[&finger1] > rpo_index[&finger2] {
                finger1 = self.idoms[&finger1];
            }
            while rpo_index[&finger2] > rpo_index[&finger1] {
                finger2 = self.idoms[&finger2];
            }
        }
        finger1
    }

    fn compute_frontiers(&mut self, module: &Module, rpo: &[ValueId]) {
        for &block in rpo {
            let preds = module.predecessors(block);
            if preds.len() < 2 {
                continue;
            }
            let Some(&idom) = self.idoms.get(&block) else { continue };
            for pred in preds {
                let mut runner = pred;
                while runner != idom {
                    let _ = self.frontiers.entry(runner).or_default().insert(block);
                    match self.idoms.get(&runner) {
                        Some(&next) if next != runner => runner = next,
                        _ => break,
                    }
                }
            }
        }
    }
}
