//! The x86-64 target description.
//!
//! 64-bit pointers, 8-byte stack alignment, the GPR8/16/32/64 register
//! classes, and an instruction set of ADD/SUB/AND/OR/XOR/MOV in RR, RM,
//! MR, RI and MI variants. One addressing-mode fragment (`MemFrag`)
//! decomposes an address computation into base, index, scale and
//! displacement sub-operands.

use std::cmp::Ordering;

use crate::node::{MachTy, McFunction, NodeId, NodeKind, Payload};
use crate::pattern::{MatchContext, OperandDesc, Pattern, PatternDef, PatternFrag};
use crate::target::TargetIsel;

/// The x86 instruction variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum X86Inst {
    AddRr,
    AddRm,
    AddMr,
    AddMi,
    AddRi,
    SubRr,
    SubRm,
    SubMr,
    SubMi,
    SubRi,
    AndRr,
    AndRm,
    AndMr,
    AndMi,
    AndRi,
    OrRr,
    OrRm,
    OrMr,
    OrMi,
    OrRi,
    XorRr,
    XorRm,
    XorMr,
    XorMi,
    XorRi,
    MovRr,
    MovRm,
    MovMr,
    MovMi,
    MovRi,
}

impl X86Inst {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddRr => "ADD_RR",
            Self::AddRm => "ADD_RM",
            Self::AddMr => "ADD_MR",
            Self::AddMi => "ADD_MI",
            Self::AddRi => "ADD_RI",
            Self::SubRr => "SUB_RR",
            Self::SubRm => "SUB_RM",
            Self::SubMr => "SUB_MR",
            Self::SubMi => "SUB_MI",
            Self::SubRi => "SUB_RI",
            Self::AndRr => "AND_RR",
            Self::AndRm => "AND_RM",
            Self::AndMr => "AND_MR",
            Self::AndMi => "AND_MI",
            Self::AndRi => "AND_RI",
            Self::OrRr => "OR_RR",
            Self::OrRm => "OR_RM",
            Self::OrMr => "OR_MR",
            Self::OrMi => "OR_MI",
            Self::OrRi => "OR_RI",
            Self::XorRr => "XOR_RR",
            Self::XorRm => "XOR_RM",
            Self::XorMr => "XOR_MR",
            Self::XorMi => "XOR_MI",
            Self::XorRi => "XOR_RI",
            Self::MovRr => "MOV_RR",
            Self::MovRm => "MOV_RM",
            Self::MovMr => "MOV_MR",
            Self::MovMi => "MOV_MI",
            Self::MovRi => "MOV_RI",
        }
    }
}

/// The x86 register classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum X86RegClass {
    Gpr8,
    Gpr16,
    Gpr32,
    Gpr64,
}

const GPR32: u8 = X86RegClass::Gpr32 as u8;
const GPR64: u8 = X86RegClass::Gpr64 as u8;

/// The single addressing-mode fragment kind.
pub const MEM_FRAG: u8 = 0;

/// `MemFrag`: base register, index register, scale immediate, displacement
/// immediate.
pub static X86_FRAGMENTS: [PatternFrag; 1] = [PatternFrag::define(MEM_FRAG as u16).inputs(&[
    OperandDesc::Reg(GPR64),
    OperandDesc::Reg(GPR64),
    OperandDesc::Imm(8),
    OperandDesc::Imm(32),
])];

// ===-- Pattern construction helpers ------------------------------------=== //

const fn reg(class: u8) -> OperandDesc { OperandDesc::Reg(class) }

const fn imm(bits: u8) -> OperandDesc { OperandDesc::Imm(bits) }

const fn frag() -> OperandDesc { OperandDesc::Frag(MEM_FRAG) }

/// reg ← reg OP reg.
const fn rr(inst: X86Inst, node: NodeKind, class: u8, commutes: bool) -> PatternDef {
    let def = PatternDef::define(inst as u16)
        .inputs(&[reg(class), reg(class)])
        .outputs(&[reg(class)])
        .pattern(Pattern::node(node, &[Pattern::op(0), Pattern::op(1)]));
    if commutes {
        def.pattern(Pattern::node(node, &[Pattern::op(1), Pattern::op(0)]))
    } else {
        def
    }
}

/// reg ← reg OP [mem].
const fn rm(inst: X86Inst, node: NodeKind, class: u8, commutes: bool) -> PatternDef {
    let load = Pattern::node(NodeKind::Load, &[Pattern::op(1)]);
    let def = PatternDef::define(inst as u16)
        .inputs(&[reg(class), frag()])
        .outputs(&[reg(class)])
        .pattern(Pattern::node(node, &[Pattern::op(0), load]));
    if commutes {
        def.pattern(Pattern::node(node, &[load, Pattern::op(0)]))
    } else {
        def
    }
}

/// reg ← reg OP imm.
const fn ri(inst: X86Inst, node: NodeKind, class: u8, bits: u8, commutes: bool) -> PatternDef {
    let def = PatternDef::define(inst as u16)
        .inputs(&[reg(class), imm(bits)])
        .outputs(&[reg(class)])
        .pattern(Pattern::node(node, &[Pattern::op(0), Pattern::op(1)]));
    if commutes {
        def.pattern(Pattern::node(node, &[Pattern::op(1), Pattern::op(0)]))
    } else {
        def
    }
}

/// [mem] ← [mem] OP reg (a store fold).
const fn mr(inst: X86Inst, node: NodeKind, class: u8, commutes: bool) -> PatternDef {
    let load = Pattern::node(NodeKind::Load, &[Pattern::op(0)]);
    let def = PatternDef::define(inst as u16)
        .inputs(&[frag(), reg(class)])
        .outputs(&[])
        .pattern(Pattern::node(
            NodeKind::Store,
            &[Pattern::node(node, &[load, Pattern::op(1)]), Pattern::op(0)],
        ));
    if commutes {
        def.pattern(Pattern::node(
            NodeKind::Store,
            &[Pattern::node(node, &[Pattern::op(1), load]), Pattern::op(0)],
        ))
    } else {
        def
    }
}

/// [mem] ← [mem] OP imm (a store fold).
const fn mi(inst: X86Inst, node: NodeKind, bits: u8, commutes: bool) -> PatternDef {
    let load = Pattern::node(NodeKind::Load, &[Pattern::op(0)]);
    let def = PatternDef::define(inst as u16)
        .inputs(&[frag(), imm(bits)])
        .outputs(&[])
        .pattern(Pattern::node(
            NodeKind::Store,
            &[Pattern::node(node, &[load, Pattern::op(1)]), Pattern::op(0)],
        ));
    if commutes {
        def.pattern(Pattern::node(
            NodeKind::Store,
            &[Pattern::node(node, &[Pattern::op(1), load]), Pattern::op(0)],
        ))
    } else {
        def
    }
}

/// All five variants of one scalar instruction at one width.
const fn scalar_defs(
    rr_i: X86Inst,
    rm_i: X86Inst,
    mr_i: X86Inst,
    mi_i: X86Inst,
    ri_i: X86Inst,
    node: NodeKind,
    class: u8,
    bits: u8,
    commutes: bool,
) -> [PatternDef; 5] {
    [
        rr(rr_i, node, class, commutes),
        rm(rm_i, node, class, commutes),
        mr(mr_i, node, class, commutes),
        mi(mi_i, node, bits, commutes),
        ri(ri_i, node, class, bits, commutes),
    ]
}

const fn concat_defs<const A: usize, const B: usize, const N: usize>(
    a: [PatternDef; A],
    b: [PatternDef; B],
) -> [PatternDef; N] {
    assert!(A + B == N, "pattern table size mismatch");
    let mut out = [PatternDef::define(0); N];
    let mut i = 0;
    while i < A {
        out[i] = a[i];
        i += 1;
    }
    let mut j = 0;
    while j < B {
        out[A + j] = b[j];
        j += 1;
    }
    out
}

const fn arith_defs() -> [PatternDef; 50] {
    use NodeKind as N;
    use X86Inst as I;
    let add32 = scalar_defs(I::AddRr, I::AddRm, I::AddMr, I::AddMi, I::AddRi, N::Add, GPR32, 32, true);
    let add64 = scalar_defs(I::AddRr, I::AddRm, I::AddMr, I::AddMi, I::AddRi, N::Add, GPR64, 64, true);
    let sub32 = scalar_defs(I::SubRr, I::SubRm, I::SubMr, I::SubMi, I::SubRi, N::Sub, GPR32, 32, false);
    let sub64 = scalar_defs(I::SubRr, I::SubRm, I::SubMr, I::SubMi, I::SubRi, N::Sub, GPR64, 64, false);
    let and32 = scalar_defs(I::AndRr, I::AndRm, I::AndMr, I::AndMi, I::AndRi, N::And, GPR32, 32, true);
    let and64 = scalar_defs(I::AndRr, I::AndRm, I::AndMr, I::AndMi, I::AndRi, N::And, GPR64, 64, true);
    let or32 = scalar_defs(I::OrRr, I::OrRm, I::OrMr, I::OrMi, I::OrRi, N::Or, GPR32, 32, true);
    let or64 = scalar_defs(I::OrRr, I::OrRm, I::OrMr, I::OrMi, I::OrRi, N::Or, GPR64, 64, true);
    let xor32 = scalar_defs(I::XorRr, I::XorRm, I::XorMr, I::XorMi, I::XorRi, N::Xor, GPR32, 32, true);
    let xor64 = scalar_defs(I::XorRr, I::XorRm, I::XorMr, I::XorMi, I::XorRi, N::Xor, GPR64, 64, true);
    let add: [PatternDef; 10] = concat_defs(add32, add64);
    let sub: [PatternDef; 10] = concat_defs(sub32, sub64);
    let and: [PatternDef; 10] = concat_defs(and32, and64);
    let or: [PatternDef; 10] = concat_defs(or32, or64);
    let xor: [PatternDef; 10] = concat_defs(xor32, xor64);
    let a: [PatternDef; 20] = concat_defs(add, sub);
    let b: [PatternDef; 30] = concat_defs(a, and);
    let c: [PatternDef; 40] = concat_defs(b, or);
    concat_defs(c, xor)
}

const fn mov_defs() -> [PatternDef; 10] {
    use NodeKind as N;
    use X86Inst as I;
    [
        // Load into a register.
        PatternDef::define(I::MovRm as u16)
            .inputs(&[frag()])
            .outputs(&[reg(GPR32)])
            .pattern(Pattern::node(N::Load, &[Pattern::op(0)])),
        PatternDef::define(I::MovRm as u16)
            .inputs(&[frag()])
            .outputs(&[reg(GPR64)])
            .pattern(Pattern::node(N::Load, &[Pattern::op(0)])),
        // Store a register.
        PatternDef::define(I::MovMr as u16)
            .inputs(&[frag(), reg(GPR32)])
            .outputs(&[])
            .pattern(Pattern::node(N::Store, &[Pattern::op(1), Pattern::op(0)])),
        PatternDef::define(I::MovMr as u16)
            .inputs(&[frag(), reg(GPR64)])
            .outputs(&[])
            .pattern(Pattern::node(N::Store, &[Pattern::op(1), Pattern::op(0)])),
        // Store an immediate.
        PatternDef::define(I::MovMi as u16)
            .inputs(&[frag(), imm(32)])
            .outputs(&[])
            .pattern(Pattern::node(N::Store, &[Pattern::op(1), Pattern::op(0)])),
        PatternDef::define(I::MovMi as u16)
            .inputs(&[frag(), imm(64)])
            .outputs(&[])
            .pattern(Pattern::node(N::Store, &[Pattern::op(1), Pattern::op(0)])),
        // Move an immediate into the return register.
        PatternDef::define(I::MovRi as u16)
            .inputs(&[imm(32)])
            .outputs(&[])
            .pattern(Pattern::node(N::Return, &[Pattern::op(0)])),
        PatternDef::define(I::MovRi as u16)
            .inputs(&[imm(64)])
            .outputs(&[])
            .pattern(Pattern::node(N::Return, &[Pattern::op(0)])),
        // Move a register into the return register.
        PatternDef::define(I::MovRr as u16)
            .inputs(&[reg(GPR32)])
            .outputs(&[])
            .pattern(Pattern::node(N::Return, &[Pattern::op(0)])),
        PatternDef::define(I::MovRr as u16)
            .inputs(&[reg(GPR64)])
            .outputs(&[])
            .pattern(Pattern::node(N::Return, &[Pattern::op(0)])),
    ]
}

/// The full x86 pattern table, flattened at compile time.
pub static X86_PATTERNS: [PatternDef; 60] = concat_defs(arith_defs(), mov_defs());

// ===-- Target description ----------------------------------------------=== //

/// The x86-64 target.
#[derive(Debug, Default, Clone, Copy)]
pub struct X86Target;

impl X86Target {
    #[must_use]
    pub const fn new() -> Self { Self }
}

impl TargetIsel for X86Target {
    fn name(&self) -> &'static str { "x86-64" }

    fn pointer_size_bits(&self) -> u32 { 64 }

    fn stack_alignment(&self) -> u32 { 8 }

    fn patterns(&self) -> &'static [PatternDef] { &X86_PATTERNS }

    fn fragment(&self, kind: u8) -> PatternFrag {
        X86_FRAGMENTS[kind as usize]
    }

    fn pattern_name(&self, inst: u16) -> &'static str {
        const INSTS: [X86Inst; 30] = [
            X86Inst::AddRr,
            X86Inst::AddRm,
            X86Inst::AddMr,
            X86Inst::AddMi,
            X86Inst::AddRi,
            X86Inst::SubRr,
            X86Inst::SubRm,
            X86Inst::SubMr,
            X86Inst::SubMi,
            X86Inst::SubRi,
            X86Inst::AndRr,
            X86Inst::AndRm,
            X86Inst::AndMr,
            X86Inst::AndMi,
            X86Inst::AndRi,
            X86Inst::OrRr,
            X86Inst::OrRm,
            X86Inst::OrMr,
            X86Inst::OrMi,
            X86Inst::OrRi,
            X86Inst::XorRr,
            X86Inst::XorRm,
            X86Inst::XorMr,
            X86Inst::XorMi,
            X86Inst::XorRi,
            X86Inst::MovRr,
            X86Inst::MovRm,
            X86Inst::MovMr,
            X86Inst::MovMi,
            X86Inst::MovRi,
        ];
        INSTS[inst as usize].name()
    }

    fn fragment_name(&self, kind: u16) -> &'static str {
        match kind {
            0 => "MemFrag",
            _ => "??",
        }
    }

    fn reg_class_name(&self, class: u8) -> &'static str {
        match class {
            0 => "GPR8",
            1 => "GPR16",
            2 => "GPR32",
            3 => "GPR64",
            _ => "??",
        }
    }

    fn is_register_class(&self, class: u8, ty: MachTy) -> bool {
        match class {
            0 => ty.bits == 8,
            1 => ty.bits == 16,
            2 => ty.bits == 32,
            3 => ty.bits == 64,
            _ => false,
        }
    }

    /// More inputs first; ties prefer fewer register inputs, so memory and
    /// immediate folds sort ahead of plain register forms.
    fn compare_patterns(&self, a: &PatternDef, b: &PatternDef) -> Ordering {
        b.num_inputs
            .cmp(&a.num_inputs)
            .then(a.num_register_inputs().cmp(&b.num_register_inputs()))
    }

    fn match_fragment(
        &self,
        frag: &PatternFrag,
        mcf: &McFunction,
        node: NodeId,
        ctx: &mut MatchContext<'_>,
        op_index: usize,
    ) -> bool {
        debug_assert_eq!(frag.kind, u16::from(MEM_FRAG));
        match_memory_fragment(mcf, node, ctx, op_index)
    }
}

/// Is this node usable as an address base?
fn is_base_leaf(mcf: &McFunction, node: NodeId) -> bool {
    matches!(
        mcf.node(node).kind,
        NodeKind::FrameIndex | NodeKind::Register | NodeKind::Argument | NodeKind::GlobalAddress
    )
}

/// Decomposes an address into `base + index * scale + displacement`.
///
/// Sub-operand slots: `[base, index, scale, displacement]` starting at
/// `op_index`. Interior nodes the decomposition consumes are recorded for
/// deletion; a node with other users is left alone and the match fails.
fn match_memory_fragment(
    mcf: &McFunction,
    node: NodeId,
    ctx: &mut MatchContext<'_>,
    op_index: usize,
) -> bool {
    let base_slot = op_index;
    let index_slot = op_index + 1;
    let scale_slot = op_index + 2;
    let disp_slot = op_index + 3;
    // A bare base register or frame slot.
    if is_base_leaf(mcf, node) {
        ctx.operands[base_slot] = Some(node);
        return true;
    }
    // base + displacement, or base + index * scale.
    if mcf.node(node).kind == NodeKind::Add {
        if mcf.node(node).num_users() > 1 {
            return false;
        }
        let [lhs, rhs] = mcf.node(node).operands()[..] else { return false };
        if !is_base_leaf(mcf, lhs) {
            return false;
        }
        if mcf.node(rhs).kind == NodeKind::Constant {
            ctx.operands[base_slot] = Some(lhs);
            ctx.operands[disp_slot] = Some(rhs);
            ctx.nodes_to_delete.push(node);
            return true;
        }
        if mcf.node(rhs).kind == NodeKind::Mul {
            if mcf.node(rhs).num_users() > 1 {
                return false;
            }
            let [index, scale] = mcf.node(rhs).operands()[..] else { return false };
            let scale_ok = matches!(
                mcf.node(scale).payload,
                Some(Payload::Imm { value: 1 | 2 | 4 | 8, .. })
            );
            if scale_ok && is_base_leaf(mcf, index) {
                ctx.operands[base_slot] = Some(lhs);
                ctx.operands[index_slot] = Some(index);
                ctx.operands[scale_slot] = Some(scale);
                ctx.nodes_to_delete.push(node);
                ctx.nodes_to_delete.push(rhs);
                return true;
            }
        }
    }
    false
}
