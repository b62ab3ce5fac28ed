//! DAG construction from TIR.
//!
//! One `Entry` leaf is allocated per basic block; each TIR instruction is
//! translated into a node and remembered, so intra-block uses connect
//! directly. A use of an instruction from another block goes through a
//! virtual register: the defining block grows a `LoadToReg` node and the
//! using block reads a `Register` leaf with the same index.
//!
//! Chain edges preserve ordering beyond data dependence: a load chains to
//! the instruction before it, an instruction after a side-effecting one
//! chains to that, and chains fall back to the block's `Entry`. After
//! building, each block's `Entry` hands its accumulated children to the
//! block's terminator, keeping only terminator chains whose targets have
//! no other user.

use jcc_tir::module::Module;
use jcc_tir::value::{BinOp, CastOp, InstKind, Predicate, ValueId, ValueKind};
use log::debug;
use rustc_hash::FxHashMap;

use crate::node::{MachTy, McFunction, NodeId, NodeKind, Payload, StackSlot};
use crate::target::TargetIsel;

/// Builds the per-block DAGs for one TIR function.
#[must_use]
pub fn build_dag(module: &Module, func: ValueId, target: &dyn TargetIsel) -> McFunction {
    let mut builder = DagBuilder {
        module,
        mcf: McFunction::new(target.stack_alignment(), target.pointer_size_bits()),
        inst_map: FxHashMap::default(),
        vregs: Vec::new(),
        vreg_map: FxHashMap::default(),
        alloca_map: FxHashMap::default(),
        bb_map: FxHashMap::default(),
        cur_bb: func,
        next_vreg: 0,
        next_slot: 0,
    };
    builder.build(func);
    builder.mcf
}

struct DagBuilder<'m> {
    module: &'m Module,
    mcf: McFunction,
    /// TIR instruction -> node; kept across blocks
    inst_map: FxHashMap<ValueId, NodeId>,
    /// Cross-block values in allocation order
    vregs: Vec<(ValueId, u32)>,
    vreg_map: FxHashMap<ValueId, u32>,
    alloca_map: FxHashMap<ValueId, StackSlot>,
    bb_map: FxHashMap<ValueId, NodeId>,
    cur_bb: ValueId,
    next_vreg: u32,
    next_slot: u16,
}

impl DagBuilder<'_> {
    fn build(&mut self, func: ValueId) {
        // One Entry per block, in reverse post-order.
        for bb in self.module.reverse_post_order(func) {
            let entry = self.mcf.new_leaf(NodeKind::Entry, MachTy::none(), None);
            let _ = self.bb_map.insert(bb, entry);
            self.mcf.subgraphs.push(crate::node::Subgraph { root: entry, sched_order: Vec::new() });
        }
        // Translate each block in source order.
        for bb in self.module.func_blocks(func) {
            if !self.bb_map.contains_key(&bb) {
                // Unreachable blocks have no subgraph.
                continue;
            }
            self.cur_bb = bb;
            let mut last = None;
            for inst in self.module.block_insts(bb) {
                if let Some(node) = self.build_inst(inst) {
                    last = Some(node);
                }
            }
            let terminator = last.expect("basic block has no terminator");
            let entry = self.bb_map[&bb];
            self.mcf.add_child(entry, terminator);
        }
        // Cross-block uses load their value into a virtual register at the
        // end of the defining block.
        for &(value, vreg) in &self.vregs.clone() {
            let inst_node = self.inst_map[&value];
            let bits = self.module.ctx.size_in_bits(self.module.value(value).ty);
            let reg = self.mcf.new_leaf(
                NodeKind::Register,
                MachTy::new(bits),
                Some(Payload::VReg(vreg)),
            );
            let load = self.mcf.new_node(
                NodeKind::LoadToReg,
                MachTy::none(),
                None,
                &[reg, inst_node],
            );
            let def_bb = self.module.inst_parent(value).expect("vreg value is an instruction");
            let entry = self.bb_map[&def_bb];
            self.mcf.add_child(entry, load);
        }
        // Transfer each Entry's children onto the block terminator.
        self.rechain_entries();
        debug!("built {} DAG nodes", self.mcf.node_count());
    }

    /// Moves the accumulated Entry children under the terminator and
    /// prunes redundant terminator chains.
    fn rechain_entries(&mut self) {
        for i in 0..self.mcf.subgraphs.len() {
            let entry = self.mcf.subgraphs[i].root;
            let children: Vec<NodeId> = self.mcf.node(entry).children().to_vec();
            let terminator = children
                .iter()
                .copied()
                .find(|&c| {
                    matches!(
                        self.mcf.node(c).kind,
                        NodeKind::Br | NodeKind::BrCC | NodeKind::Return | NodeKind::Unreachable
                    )
                })
                .expect("entry chains to a terminator");
            for &child in &children {
                if child != terminator {
                    self.mcf.add_child(terminator, child);
                }
            }
            self.mcf.clear_chains(entry);
            self.mcf.add_child(entry, terminator);
            // A chained node that already has another user does not need
            // the terminator to keep it alive.
            let mut idx = self.mcf.node(terminator).num_children();
            while idx > self.mcf.node(terminator).arity() {
                idx -= 1;
                let child = self.mcf.node(terminator).children()[idx];
                if self.mcf.node(child).num_users() > 1 {
                    self.mcf.remove_child(terminator, idx);
                }
            }
        }
    }

    // ===-- Value translation -------------------------------------------=== //

    fn find_or_alloc_vreg(&mut self, value: ValueId) -> u32 {
        if let Some(&vreg) = self.vreg_map.get(&value) {
            return vreg;
        }
        self.next_vreg += 1;
        let vreg = self.next_vreg;
        let _ = self.vreg_map.insert(value, vreg);
        self.vregs.push((value, vreg));
        vreg
    }

    fn find_or_alloc_stack_slot(&mut self, alloca: ValueId) -> StackSlot {
        if let Some(&slot) = self.alloca_map.get(&alloca) {
            return slot;
        }
        let InstKind::Alloca { allocated } = self.module.inst_kind(alloca) else {
            unreachable!("stack slots come from allocas")
        };
        self.next_slot += 1;
        let bytes = self.module.ctx.size_in_bits(allocated).div_ceil(8);
        let align = self.mcf.stack_alignment;
        let count = bytes.div_ceil(align).max(1) as u16;
        let slot = StackSlot { index: self.next_slot, count };
        let _ = self.alloca_map.insert(alloca, slot);
        slot
    }

    fn build_vreg(&mut self, value: ValueId) -> NodeId {
        let vreg = self.find_or_alloc_vreg(value);
        let bits = self.module.ctx.size_in_bits(self.module.value(value).ty);
        self.mcf.new_leaf(NodeKind::Register, MachTy::new(bits), Some(Payload::VReg(vreg)))
    }

    fn build_cc(&mut self, pred: Predicate) -> NodeId {
        self.mcf.new_leaf(NodeKind::Predicate, MachTy::none(), Some(Payload::Pred(pred)))
    }

    /// Finds or creates the node for a TIR value used as an operand.
    fn find_value(&mut self, value: ValueId) -> NodeId {
        let v = self.module.value(value);
        match &v.kind {
            ValueKind::BasicBlock(_) => {
                let subgraph = self.bb_map[&value];
                let node = self.mcf.new_leaf(NodeKind::BasicBlock, MachTy::none(), None);
                self.mcf.add_child(node, subgraph);
                node
            }
            ValueKind::Inst(_) => {
                if matches!(self.module.inst_kind(value), InstKind::Alloca { .. }) {
                    let slot = self.find_or_alloc_stack_slot(value);
                    return self.mcf.new_leaf(
                        NodeKind::FrameIndex,
                        MachTy::new(self.mcf.pointer_bits),
                        Some(Payload::Slot(slot)),
                    );
                }
                if self.module.inst_parent(value) != Some(self.cur_bb) {
                    // Defined in another block: read it through a vreg.
                    self.build_vreg(value)
                } else {
                    *self
                        .inst_map
                        .get(&value)
                        .expect("instruction does not dominate all of its uses")
                }
            }
            ValueKind::Function(_) | ValueKind::GlobalVariable => self.mcf.new_leaf(
                NodeKind::GlobalAddress,
                MachTy::new(self.mcf.pointer_bits),
                Some(Payload::Global(value)),
            ),
            ValueKind::Argument { index, .. } => {
                let bits = self.module.ctx.size_in_bits(v.ty);
                self.mcf.new_leaf(
                    NodeKind::Argument,
                    MachTy::new(bits),
                    Some(Payload::VReg(*index)),
                )
            }
            ValueKind::ConstantInt { value: c } => {
                let bits = self.module.ctx.size_in_bits(v.ty);
                self.mcf.new_imm(bits, *c)
            }
            ValueKind::NullPointer => self.mcf.new_imm(self.mcf.pointer_bits, 0),
            ValueKind::Undef => {
                let bits = self.module.ctx.size_in_bits(v.ty);
                self.mcf.new_imm(bits, 0)
            }
        }
    }

    // ===-- Chains -------------------------------------------------------=== //

    /// Chains to the previous instruction unless it is already a data
    /// dependency.
    fn try_chain_to_prev(&mut self, inst: ValueId, node: NodeId) -> bool {
        let Some(prev) = self.module.inst_prev(inst) else { return false };
        for use_entry in self.module.value(prev).uses() {
            if use_entry.user == inst {
                return false;
            }
        }
        let prev_node = self.find_value(prev);
        self.mcf.add_child(node, prev_node);
        true
    }

    fn chain_to_prev_or_entry(&mut self, inst: ValueId, node: NodeId) {
        if self.try_chain_to_prev(inst, node) {
            return;
        }
        let entry = self.bb_map[&self.cur_bb];
        self.mcf.add_child(entry, node);
    }

    /// Loads wait for the previous instruction; anything following a
    /// side-effecting instruction waits for it.
    fn create_chain_if_needed(&mut self, inst: ValueId, node: NodeId) {
        if self.module.inst_kind(inst) == InstKind::Load {
            self.chain_to_prev_or_entry(inst, node);
        } else if let Some(prev) = self.module.inst_prev(inst)
            && self.module.value(prev).has_side_effects()
        {
            self.chain_to_prev_or_entry(inst, node);
        }
    }

    // ===-- Instruction translation --------------------------------------=== //

    fn build_inst(&mut self, inst: ValueId) -> Option<NodeId> {
        let ir_ty = self.module.value(inst).ty;
        let ty = if self.module.ctx.is_size_bounded(ir_ty) {
            MachTy::new(self.module.ctx.size_in_bits(ir_ty))
        } else {
            MachTy::none()
        };
        let operands = self.module.value(inst).operands().to_vec();
        let node = match self.module.inst_kind(inst) {
            // Allocas become stack slots on first use; no node here.
            InstKind::Alloca { .. } => return None,
            InstKind::Branch => {
                let (cond, bb1, bb2) = (operands[0], operands[1], operands[2]);
                if bb1 == bb2 {
                    let target = self.find_value(bb1);
                    self.mcf.new_node(NodeKind::Br, MachTy::none(), None, &[target])
                } else if let InstKind::Cmp(pred) =
                    self.module.value(cond).as_inst().map_or(InstKind::Phi, |d| d.kind)
                {
                    // Fold the compare into the branch.
                    let cmp_ops = self.module.value(cond).operands().to_vec();
                    let cc = self.build_cc(pred);
                    let lhs = self.find_value(cmp_ops[0]);
                    let rhs = self.find_value(cmp_ops[1]);
                    let t = self.find_value(bb1);
                    let f = self.find_value(bb2);
                    self.mcf.new_node(NodeKind::BrCC, MachTy::none(), None, &[cc, lhs, rhs, t, f])
                } else {
                    // Compare against zero of the condition's width.
                    let cc = self.build_cc(Predicate::Ne);
                    let bits = self.module.ctx.size_in_bits(self.module.value(cond).ty);
                    let zero = self.mcf.new_imm(bits, 0);
                    let lhs = self.find_value(cond);
                    let t = self.find_value(bb1);
                    let f = self.find_value(bb2);
                    self.mcf.new_node(NodeKind::BrCC, MachTy::none(), None, &[cc, lhs, zero, t, f])
                }
            }
            InstKind::Return => match operands.first() {
                Some(&value) => {
                    let value = self.find_value(value);
                    self.mcf.new_node(NodeKind::Return, MachTy::none(), None, &[value])
                }
                None => self.mcf.new_node(NodeKind::Return, MachTy::none(), None, &[]),
            },
            InstKind::Store => {
                let value = self.find_value(operands[0]);
                let ptr = self.find_value(operands[1]);
                self.mcf.new_node(NodeKind::Store, MachTy::none(), None, &[value, ptr])
            }
            InstKind::Load => {
                let ptr = self.find_value(operands[0]);
                self.mcf.new_node(NodeKind::Load, ty, None, &[ptr])
            }
            InstKind::Binary(op) => {
                let kind = match op {
                    BinOp::Add => NodeKind::Add,
                    BinOp::Sub => NodeKind::Sub,
                    BinOp::Mul => NodeKind::Mul,
                    BinOp::Div => NodeKind::SDiv,
                    BinOp::Rem => NodeKind::SRem,
                    BinOp::And => NodeKind::And,
                    BinOp::Or => NodeKind::Or,
                    BinOp::Xor => NodeKind::Xor,
                };
                let lhs = self.find_value(operands[0]);
                let rhs = self.find_value(operands[1]);
                self.mcf.new_node(kind, ty, None, &[lhs, rhs])
            }
            InstKind::Cmp(pred) => {
                // Compares emit SetCC even when only branches consume them.
                let cc = self.build_cc(pred);
                let lhs = self.find_value(operands[0]);
                let rhs = self.find_value(operands[1]);
                self.mcf.new_node(NodeKind::SetCC, ty, None, &[cc, lhs, rhs])
            }
            InstKind::ICast(op) => {
                let kind = match op {
                    CastOp::Trunc => NodeKind::Truncate,
                    CastOp::ZExt => NodeKind::ZeroExtend,
                    CastOp::SExt => NodeKind::SignExtend,
                };
                let value = self.find_value(operands[0]);
                self.mcf.new_node(kind, ty, None, &[value])
            }
            InstKind::Call => {
                let mut args = Vec::with_capacity(operands.len());
                for &operand in &operands {
                    args.push(self.find_value(operand));
                }
                let call = self.mcf.new_node(NodeKind::Call, ty, None, &args);
                if self.module.is_terminator(inst) {
                    // A noreturn call ends the block; pin an Unreachable
                    // terminator behind it.
                    let unreachable =
                        self.mcf.new_leaf(NodeKind::Unreachable, MachTy::none(), None);
                    let entry = self.bb_map[&self.cur_bb];
                    self.mcf.add_child(entry, unreachable);
                    self.mcf.add_child(unreachable, call);
                    unreachable
                } else {
                    call
                }
            }
            InstKind::Gep { contained } => {
                let ptr_bits = self.mcf.pointer_bits;
                let ptr_ty = MachTy::new(ptr_bits);
                let mut base = self.find_value(operands[0]);
                let mut cur_ty = contained;
                for &index in &operands[1..] {
                    if self.module.ctx.is_struct(cur_ty) {
                        let field = self
                            .module
                            .const_int_value(index)
                            .expect("struct index must be constant")
                            as usize;
                        let offset_bytes =
                            self.module.ctx.struct_offset_bits(cur_ty, field).div_ceil(8);
                        let offset = self.mcf.new_imm(ptr_bits, u64::from(offset_bytes));
                        base = self.mcf.new_node(NodeKind::Add, ptr_ty, None, &[base, offset]);
                        cur_ty = self.module.ctx.struct_elem(cur_ty, field);
                    } else if self.module.ctx.is_array(cur_ty) {
                        let elem = self.module.ctx.array_elem(cur_ty);
                        let elem_bytes = self.module.ctx.size_in_bits(elem).div_ceil(8);
                        let index_node = self.find_value(index);
                        let size_node = self.mcf.new_imm(ptr_bits, u64::from(elem_bytes));
                        let offset = self
                            .mcf
                            .new_node(NodeKind::Mul, ptr_ty, None, &[index_node, size_node]);
                        base = self.mcf.new_node(NodeKind::Add, ptr_ty, None, &[base, offset]);
                        cur_ty = elem;
                    } else {
                        panic!("unsupported getelementptr element type");
                    }
                }
                base
            }
            InstKind::Phi => {
                let phi = self.mcf.new_node(NodeKind::Phi, ty, None, &[]);
                for (pred, value) in self.module.phi_incoming(inst) {
                    let value = self.find_value(value);
                    let pred = self.find_value(pred);
                    self.mcf.add_child(phi, value);
                    self.mcf.add_child(phi, pred);
                }
                phi
            }
        };
        self.create_chain_if_needed(inst, node);
        let _ = self.inst_map.insert(inst, node);
        Some(node)
    }
}
