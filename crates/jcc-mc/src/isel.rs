//! Maximal-munch instruction selection.
//!
//! Candidate patterns are grouped by the DAG node kind their first shape
//! roots at, and sorted once with the target's comparator (more inputs
//! first, then fewer register inputs, so memory and immediate folds win
//! over plain register forms). Selection walks each block DAG from its
//! root, replacing the first match at every node — greedy tiling by the
//! largest pattern.

use log::debug;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::node::{MachTy, McFunction, NodeId, NodeKind, Payload};
use crate::pattern::{MatchContext, Pattern, PatternDef, pattern_matches};
use crate::target::TargetIsel;

/// The per-kind, sorted pattern table of a target.
#[derive(Debug)]
pub struct PatternProvider<'t> {
    target: &'t dyn TargetIsel,
    by_kind: Vec<(NodeKind, Vec<&'static PatternDef>)>,
}

impl<'t> PatternProvider<'t> {
    /// Groups and sorts the target's patterns.
    #[must_use]
    pub fn new(target: &'t dyn TargetIsel) -> Self {
        let mut by_kind: Vec<(NodeKind, Vec<&'static PatternDef>)> = Vec::new();
        for def in target.patterns() {
            let kind = def.dag_kind();
            match by_kind.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, list)) => list.push(def),
                None => by_kind.push((kind, vec![def])),
            }
        }
        for (_, list) in &mut by_kind {
            list.sort_by(|a, b| target.compare_patterns(a, b));
        }
        Self { target, by_kind }
    }

    /// The candidate patterns for a node kind, in selection order.
    #[must_use]
    pub fn patterns_for(&self, kind: NodeKind) -> &[&'static PatternDef] {
        self.by_kind
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(&[], |(_, list)| list.as_slice())
    }

    /// The target this provider was built for.
    #[must_use]
    pub fn target(&self) -> &'t dyn TargetIsel { self.target }
}

/// Runs instruction selection over every block DAG of a function.
pub fn select_instructions(mcf: &mut McFunction, provider: &PatternProvider<'_>) {
    let mut worklist: VecDeque<NodeId> = VecDeque::new();
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    for subgraph in &mcf.subgraphs {
        worklist.push_back(subgraph.root);
    }
    while let Some(mut root) = worklist.pop_front() {
        if !visited.insert(root) {
            continue;
        }
        if mcf.node(root).arity() > 0 && mcf.node(root).kind != NodeKind::MachineInstr {
            root = match_and_replace(mcf, provider, root);
        }
        for &child in mcf.node(root).children() {
            worklist.push_back(child);
        }
    }
}

/// Tries every candidate pattern at a root; on the first match, replaces
/// the matched subgraph with a `MachineInstr` node. Returns the node now
/// standing at the root position.
pub fn match_and_replace(
    mcf: &mut McFunction,
    provider: &PatternProvider<'_>,
    root: NodeId,
) -> NodeId {
    let target = provider.target();
    let mut operands: Vec<Option<NodeId>> = Vec::new();
    let mut nodes_to_delete: Vec<NodeId> = Vec::new();
    let kind = mcf.node(root).kind;
    for &def in provider.patterns_for(kind) {
        for pat in &def.patterns[..def.num_patterns] {
            operands.clear();
            operands.resize(def.adjust_operand_index(def.num_inputs, target), None);
            nodes_to_delete.clear();
            let mut ctx = MatchContext {
                def,
                operands: &mut operands,
                nodes_to_delete: &mut nodes_to_delete,
            };
            if pattern_matches(mcf, target, pat, root, &mut ctx) {
                debug!("selected {} at {root}", target.pattern_name(def.inst));
                return select_pattern(mcf, def, &operands, &nodes_to_delete);
            }
        }
    }
    root
}

/// Builds the replacement `MachineInstr` node: the matched operands become
/// its children, the chains of every consumed node transfer over, the
/// root's uses are rewritten, and the consumed nodes are destroyed.
fn select_pattern(
    mcf: &mut McFunction,
    def: &'static PatternDef,
    operands: &[Option<NodeId>],
    nodes_to_delete: &[NodeId],
) -> NodeId {
    let matched: Vec<NodeId> = operands.iter().filter_map(|&op| op).collect();
    let new_node = mcf.new_node(
        NodeKind::MachineInstr,
        MachTy::none(),
        Some(Payload::Pattern(def)),
        &matched,
    );
    for &consumed in nodes_to_delete {
        for chain in mcf.node(consumed).chains().to_vec() {
            mcf.add_child(new_node, chain);
        }
    }
    mcf.replace_all_uses_with(nodes_to_delete[0], new_node);
    for &consumed in nodes_to_delete {
        mcf.destroy(consumed);
    }
    new_node
}

/// True iff some pattern of the definition matches at the given root;
/// useful for testing the tape/matcher equivalence.
#[must_use]
pub fn def_matches(
    mcf: &McFunction,
    target: &dyn TargetIsel,
    def: &'static PatternDef,
    pat: &Pattern,
    root: NodeId,
) -> bool {
    let mut operands: Vec<Option<NodeId>> =
        vec![None; def.adjust_operand_index(def.num_inputs, target)];
    let mut nodes_to_delete: Vec<NodeId> = Vec::new();
    let mut ctx =
        MatchContext { def, operands: &mut operands, nodes_to_delete: &mut nodes_to_delete };
    pattern_matches(mcf, target, pat, root, &mut ctx)
}
