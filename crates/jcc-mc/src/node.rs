//! Instruction-selection DAG nodes.
//!
//! Each [`McFunction`] owns one DAG per basic block, rooted at an `Entry`
//! leaf. A node's children split into *operands* (indices `[0, arity)`)
//! and *chains* (indices `[arity, num_children)`), which express ordering
//! rather than data dependence. Every child edge is mirrored by a reverse
//! [`NodeUse`] entry, so replace-all-uses-with works the same way it does
//! in the TIR.

use std::fmt;

use jcc_tir::value::{Predicate, ValueId};

/// The closed set of DAG node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    None,
    Entry,
    // Leaf nodes
    Argument,
    Register,
    Constant,
    GlobalAddress,
    FrameIndex,
    BasicBlock,
    Predicate,
    // Special ops
    MachineInstr,
    LoadToReg,
    Phi,
    Unreachable,
    // Operations
    Load,
    Store,
    And,
    Or,
    Xor,
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    SignExtend,
    ZeroExtend,
    Truncate,
    SetCC,
    // Control flow
    Call,
    Br,
    BrCC,
    Return,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{self:?}") }
}

/// A node's value type: a bit width, with 0 meaning "no type".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachTy {
    pub bits: u32,
}

impl MachTy {
    #[must_use]
    pub const fn new(bits: u32) -> Self { Self { bits } }

    #[must_use]
    pub const fn none() -> Self { Self { bits: 0 } }
}

/// A stack slot allocated for an alloca: a starting index and a count of
/// alignment-sized slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackSlot {
    pub index: u16,
    pub count: u16,
}

/// Leaf payloads and the selected-pattern payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// A frame index for an alloca
    Slot(StackSlot),
    /// A virtual register index
    VReg(u32),
    /// An immediate with its bit width
    Imm { bits: u32, value: u64 },
    /// A comparison predicate
    Pred(Predicate),
    /// A TIR global object (function or global variable)
    Global(ValueId),
    /// The pattern definition a `MachineInstr` node was selected from
    Pattern(&'static crate::pattern::PatternDef),
}

/// Handle to a node within one [`McFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    const fn index(self) -> usize { self.0 as usize }

    /// Rebuilds a handle from a raw arena index (for whole-arena sweeps).
    #[must_use]
    pub const fn from_raw(index: usize) -> Self { Self(index as u32) }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "n{}", self.0) }
}

/// A reverse child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeUse {
    pub user: NodeId,
    pub index: u32,
}

/// One DAG node.
#[derive(Debug)]
pub struct IselNode {
    pub kind: NodeKind,
    pub ty: MachTy,
    pub payload: Option<Payload>,
    /// Operand-child count; children beyond this are chains
    arity: usize,
    children: Vec<NodeId>,
    uses: Vec<NodeUse>,
    topo_idx: i32,
    live_range_to: i32,
    /// Scheduled-list links, filled by the scheduler
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    destroyed: bool,
}

impl IselNode {
    #[must_use]
    pub fn children(&self) -> &[NodeId] { &self.children }

    #[must_use]
    pub const fn arity(&self) -> usize { self.arity }

    #[must_use]
    pub fn num_children(&self) -> usize { self.children.len() }

    /// The operand children only.
    #[must_use]
    pub fn operands(&self) -> &[NodeId] { &self.children[..self.arity] }

    /// The chain children only.
    #[must_use]
    pub fn chains(&self) -> &[NodeId] { &self.children[self.arity..] }

    #[must_use]
    pub fn uses(&self) -> &[NodeUse] { &self.uses }

    #[must_use]
    pub fn num_users(&self) -> usize { self.uses.len() }

    #[must_use]
    pub const fn topo_idx(&self) -> i32 { self.topo_idx }

    /// The live range as `(from, to)`; `from >= to` since topological
    /// indices decrease from the bottom of the block upwards.
    #[must_use]
    pub const fn live_range(&self) -> (i32, i32) { (self.topo_idx, self.live_range_to) }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool { self.destroyed }
}

/// A per-basic-block DAG: the `Entry` root plus, after scheduling, the
/// linearised node order.
#[derive(Debug)]
pub struct Subgraph {
    /// The Entry leaf of this block's DAG
    pub root: NodeId,
    /// Scheduled nodes, first-to-last, filled by the scheduler
    pub sched_order: Vec<NodeId>,
}

/// A function's worth of selection DAGs.
#[derive(Debug)]
pub struct McFunction {
    nodes: Vec<IselNode>,
    /// One subgraph per basic block, in reverse post-order
    pub subgraphs: Vec<Subgraph>,
    /// Stack alignment in bytes, from the target
    pub stack_alignment: u32,
    /// Pointer width in bits, from the target
    pub pointer_bits: u32,
}

impl McFunction {
    #[must_use]
    pub fn new(stack_alignment: u32, pointer_bits: u32) -> Self {
        Self { nodes: Vec::new(), subgraphs: Vec::new(), stack_alignment, pointer_bits }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &IselNode { &self.nodes[id.index()] }

    pub fn node_mut(&mut self, id: NodeId) -> &mut IselNode { &mut self.nodes[id.index()] }

    #[must_use]
    pub fn node_count(&self) -> usize { self.nodes.len() }

    /// Creates a non-leaf node with the given operand children.
    pub fn new_node(
        &mut self,
        kind: NodeKind,
        ty: MachTy,
        payload: Option<Payload>,
        operands: &[NodeId],
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(IselNode {
            kind,
            ty,
            payload,
            arity: operands.len(),
            children: Vec::new(),
            uses: Vec::new(),
            topo_idx: -1,
            live_range_to: -1,
            prev: None,
            next: None,
            destroyed: false,
        });
        for &operand in operands {
            self.add_child(id, operand);
        }
        id
    }

    /// Creates a leaf (arity 0) node. Leaves can still grow children
    /// through chaining.
    pub fn new_leaf(&mut self, kind: NodeKind, ty: MachTy, payload: Option<Payload>) -> NodeId {
        self.new_node(kind, ty, payload, &[])
    }

    /// Creates an immediate constant leaf.
    pub fn new_imm(&mut self, bits: u32, value: u64) -> NodeId {
        self.new_leaf(NodeKind::Constant, MachTy::new(bits), Some(Payload::Imm { bits, value }))
    }

    /// Appends a child (a chain edge when past the node's arity).
    pub fn add_child(&mut self, user: NodeId, child: NodeId) {
        let index = self.nodes[user.index()].children.len() as u32;
        self.nodes[user.index()].children.push(child);
        self.nodes[child.index()].uses.push(NodeUse { user, index });
    }

    /// Removes the child at `index`, renumbering later edges.
    pub fn remove_child(&mut self, user: NodeId, index: usize) {
        let child = self.nodes[user.index()].children.remove(index);
        let entry = NodeUse { user, index: index as u32 };
        let uses = &mut self.nodes[child.index()].uses;
        let pos = uses
            .iter()
            .position(|u| *u == entry)
            .expect("child edge missing its reverse use");
        let _ = uses.swap_remove(pos);
        let shifted: Vec<NodeId> = self.nodes[user.index()].children[index..].to_vec();
        for (offset, child) in shifted.into_iter().enumerate() {
            let old_index = (index + offset + 1) as u32;
            let new_index = (index + offset) as u32;
            for use_entry in &mut self.nodes[child.index()].uses {
                if use_entry.user == user && use_entry.index == old_index {
                    use_entry.index = new_index;
                    break;
                }
            }
        }
    }

    /// Drops every chain edge of a node, keeping its operands.
    pub fn clear_chains(&mut self, id: NodeId) {
        while self.nodes[id.index()].children.len() > self.nodes[id.index()].arity {
            let last = self.nodes[id.index()].children.len() - 1;
            self.remove_child(id, last);
        }
    }

    /// Rewrites every use of `old` to `new`, preserving indices.
    pub fn replace_all_uses_with(&mut self, old: NodeId, new: NodeId) {
        let uses = std::mem::take(&mut self.nodes[old.index()].uses);
        for entry in uses {
            self.nodes[entry.user.index()].children[entry.index as usize] = new;
            self.nodes[new.index()].uses.push(entry);
        }
    }

    /// Drops a node's child edges and marks it dead. The arena slot stays.
    pub fn destroy(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for (index, child) in children.into_iter().enumerate() {
            let entry = NodeUse { user: id, index: index as u32 };
            let uses = &mut self.nodes[child.index()].uses;
            if let Some(pos) = uses.iter().position(|u| *u == entry) {
                let _ = uses.swap_remove(pos);
            }
        }
        self.nodes[id.index()].arity = 0;
        self.nodes[id.index()].destroyed = true;
    }

    /// Semantic equality: leaves compare by payload, everything else by
    /// identity.
    #[must_use]
    pub fn nodes_equal(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let (na, nb) = (self.node(a), self.node(b));
        if na.kind != nb.kind {
            return false;
        }
        match na.kind {
            NodeKind::FrameIndex => match (na.payload, nb.payload) {
                (Some(Payload::Slot(sa)), Some(Payload::Slot(sb))) => sa.index == sb.index,
                _ => false,
            },
            NodeKind::Register | NodeKind::Argument => match (na.payload, nb.payload) {
                (Some(Payload::VReg(va)), Some(Payload::VReg(vb))) => va == vb,
                _ => false,
            },
            NodeKind::Constant => match (na.payload, nb.payload) {
                (Some(Payload::Imm { bits: ba, value: va }), Some(Payload::Imm { bits: bb, value: vb })) => {
                    ba == bb && va == vb
                }
                _ => false,
            },
            NodeKind::GlobalAddress => match (na.payload, nb.payload) {
                (Some(Payload::Global(ga)), Some(Payload::Global(gb))) => ga == gb,
                _ => false,
            },
            NodeKind::Predicate => match (na.payload, nb.payload) {
                (Some(Payload::Pred(pa)), Some(Payload::Pred(pb))) => pa == pb,
                _ => false,
            },
            _ => false,
        }
    }

    // ===-- Scheduling support -------------------------------------------=== //

    /// Sets a node's topological index, resetting its live range.
    pub fn set_topo_idx(&mut self, id: NodeId, idx: i32) {
        let node = &mut self.nodes[id.index()];
        node.topo_idx = idx;
        node.live_range_to = idx;
    }

    /// Shrinks a node's live-range end towards its furthest consumer.
    pub fn update_live_range(&mut self, id: NodeId, to: i32) {
        let node = &mut self.nodes[id.index()];
        node.live_range_to =
            if node.live_range_to == -1 { to } else { node.live_range_to.min(to) };
    }
}
