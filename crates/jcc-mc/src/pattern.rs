//! The instruction pattern DSL and its matcher.
//!
//! A pattern definition names a target instruction, declares its input and
//! output operands, and carries up to [`MAX_PATTERNS_PER_DEF`] DAG shapes.
//! Each shape is flattened at compile time into a byte-coded tape of
//! `{Push, Pop, CheckNodeType, CheckOperandType}` operations; matching
//! executes the tape as a stack machine over the candidate subgraph. The
//! whole table is `const`-constructed: nothing is flattened at runtime.

use crate::node::{McFunction, NodeId, NodeKind, Payload};
use crate::target::TargetIsel;

/// Maximum tape length per pattern.
pub const MAX_STATES: usize = 40;
/// Maximum declared operands per definition (after fragment expansion).
pub const MAX_OPERANDS: usize = 8;
/// Maximum alternate shapes per definition.
pub const MAX_PATTERNS_PER_DEF: usize = 2;

/// One tape instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeOp {
    None,
    /// Descend into the current child
    Push,
    /// Ascend, advancing the parent's child cursor
    Pop,
    /// The current node must have this kind
    CheckNodeType(NodeKind),
    /// The current child must satisfy the i-th declared input operand
    CheckOperandType(u8),
}

/// An operand descriptor of a pattern definition or fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandDesc {
    None,
    /// An immediate of the given bit width
    Imm(u8),
    /// A register of the given target register class
    Reg(u8),
    /// A named sub-pattern resolved by a target predicate
    Frag(u8),
}

/// One flattened DAG shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub len: usize,
    pub tape: [TapeOp; MAX_STATES],
}

impl Pattern {
    /// The empty pattern; matches nothing and is skipped by `define`.
    pub const EMPTY: Self = Self { len: 0, tape: [TapeOp::None; MAX_STATES] };

    /// A bare node-kind check.
    #[must_use]
    pub const fn leaf(kind: NodeKind) -> Self {
        let mut tape = [TapeOp::None; MAX_STATES];
        tape[0] = TapeOp::CheckNodeType(kind);
        Self { len: 1, tape }
    }

    /// A reference to the enclosing definition's i-th input operand.
    #[must_use]
    pub const fn op(index: u8) -> Self {
        let mut tape = [TapeOp::None; MAX_STATES];
        tape[0] = TapeOp::CheckOperandType(index);
        Self { len: 1, tape }
    }

    /// A node of the given kind over the given child shapes. Children with
    /// more than one tape entry are bracketed with `Push`/`Pop`.
    #[must_use]
    pub const fn node(kind: NodeKind, children: &[Self]) -> Self {
        let mut tape = [TapeOp::None; MAX_STATES];
        let mut len = 0;
        tape[len] = TapeOp::CheckNodeType(kind);
        len += 1;
        let mut c = 0;
        while c < children.len() {
            let child = &children[c];
            let bracket = child.len > 1;
            if bracket {
                assert!(len < MAX_STATES, "pattern tape out of space");
                tape[len] = TapeOp::Push;
                len += 1;
            }
            let mut i = 0;
            while i < child.len {
                assert!(len < MAX_STATES, "pattern tape out of space");
                tape[len] = child.tape[i];
                len += 1;
                i += 1;
            }
            if bracket {
                assert!(len < MAX_STATES, "pattern tape out of space");
                tape[len] = TapeOp::Pop;
                len += 1;
            }
            c += 1;
        }
        Self { len, tape }
    }

    /// The root node kind this shape matches.
    #[must_use]
    pub const fn root_kind(&self) -> NodeKind {
        match self.tape[0] {
            TapeOp::CheckNodeType(kind) => kind,
            _ => NodeKind::None,
        }
    }
}

/// A pattern definition: one target instruction variant and the shapes
/// that select it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternDef {
    /// Target instruction identifier
    pub inst: u16,
    pub inputs: [OperandDesc; MAX_OPERANDS],
    pub num_inputs: usize,
    pub outputs: [OperandDesc; MAX_OPERANDS],
    pub num_outputs: usize,
    pub patterns: [Pattern; MAX_PATTERNS_PER_DEF],
    pub num_patterns: usize,
}

impl PatternDef {
    /// Starts a definition for a target instruction.
    #[must_use]
    pub const fn define(inst: u16) -> Self {
        Self {
            inst,
            inputs: [OperandDesc::None; MAX_OPERANDS],
            num_inputs: 0,
            outputs: [OperandDesc::None; MAX_OPERANDS],
            num_outputs: 0,
            patterns: [Pattern::EMPTY; MAX_PATTERNS_PER_DEF],
            num_patterns: 0,
        }
    }

    /// Declares the input operands.
    #[must_use]
    pub const fn inputs(mut self, list: &[OperandDesc]) -> Self {
        assert!(list.len() <= MAX_OPERANDS, "too many input operands");
        let mut i = 0;
        while i < list.len() {
            self.inputs[i] = list[i];
            i += 1;
        }
        self.num_inputs = list.len();
        self
    }

    /// Declares the output operands.
    #[must_use]
    pub const fn outputs(mut self, list: &[OperandDesc]) -> Self {
        assert!(list.len() <= MAX_OPERANDS, "too many output operands");
        let mut i = 0;
        while i < list.len() {
            self.outputs[i] = list[i];
            i += 1;
        }
        self.num_outputs = list.len();
        self
    }

    /// Adds a shape. The empty pattern is ignored, so conditional
    /// alternates compose cleanly.
    #[must_use]
    pub const fn pattern(mut self, pat: Pattern) -> Self {
        if pat.len == 0 {
            return self;
        }
        assert!(self.num_patterns < MAX_PATTERNS_PER_DEF, "too many patterns per definition");
        self.patterns[self.num_patterns] = pat;
        self.num_patterns += 1;
        self
    }

    /// The DAG node kind this definition's shapes root at.
    #[must_use]
    pub const fn dag_kind(&self) -> NodeKind { self.patterns[0].root_kind() }

    /// The number of declared register inputs (for the sort comparator).
    #[must_use]
    pub const fn num_register_inputs(&self) -> usize {
        let mut count = 0;
        let mut i = 0;
        while i < self.num_inputs {
            if matches!(self.inputs[i], OperandDesc::Reg(_)) {
                count += 1;
            }
            i += 1;
        }
        count
    }

    /// Adjusts a declared input index so fragment inputs occupy their own
    /// contiguous slots. Passing `num_inputs` yields the total number of
    /// matched-operand slots.
    #[must_use]
    pub fn adjust_operand_index(&self, index: usize, target: &dyn TargetIsel) -> usize {
        assert!(index <= self.num_inputs, "operand index out of bounds");
        let mut counter = 0;
        for &input in &self.inputs[..index] {
            counter += match input {
                OperandDesc::Frag(kind) => {
                    target.fragment(kind).num_inputs.max(1)
                }
                _ => 1,
            };
        }
        counter
    }
}

/// A named sub-pattern (an addressing mode, say) with its sub-operands.
#[derive(Debug, Clone, Copy)]
pub struct PatternFrag {
    pub kind: u16,
    pub inputs: [OperandDesc; MAX_OPERANDS],
    pub num_inputs: usize,
}

impl PatternFrag {
    #[must_use]
    pub const fn define(kind: u16) -> Self {
        Self { kind, inputs: [OperandDesc::None; MAX_OPERANDS], num_inputs: 0 }
    }

    #[must_use]
    pub const fn inputs(mut self, list: &[OperandDesc]) -> Self {
        assert!(list.len() <= MAX_OPERANDS, "too many fragment operands");
        let mut i = 0;
        while i < list.len() {
            self.inputs[i] = list[i];
            i += 1;
        }
        self.num_inputs = list.len();
        self
    }
}

/// Mutable state threaded through one match attempt.
#[derive(Debug)]
pub struct MatchContext<'a> {
    pub def: &'static PatternDef,
    /// Matched operands, indexed by adjusted operand index
    pub operands: &'a mut Vec<Option<NodeId>>,
    /// Every node the pattern consumed, root first
    pub nodes_to_delete: &'a mut Vec<NodeId>,
}

/// Executes a pattern tape against a candidate root.
///
/// On success `ctx.operands` holds the matched operand array and
/// `ctx.nodes_to_delete` every consumed node.
pub fn pattern_matches(
    mcf: &McFunction,
    target: &dyn TargetIsel,
    pat: &Pattern,
    root: NodeId,
    ctx: &mut MatchContext<'_>,
) -> bool {
    let def = ctx.def;
    // The root's result type must be compatible with the declared output.
    assert!(def.num_outputs <= 1, "multiple outputs are not supported");
    if def.num_outputs == 0 {
        if mcf.node(root).ty.bits != 0 {
            return false;
        }
    } else if let OperandDesc::Reg(class) = def.outputs[0]
        && !target.is_register_class(class, mcf.node(root).ty)
    {
        return false;
    }
    // Run the tape as a stack machine over the subgraph.
    let mut stack: Vec<(usize, NodeId)> = vec![(0, root)];
    let mut node = root;
    let mut child_idx = 0usize;
    ctx.nodes_to_delete.push(root);
    for tape_op in &pat.tape[..pat.len] {
        match *tape_op {
            TapeOp::Push => {
                if child_idx >= mcf.node(node).arity() {
                    return false;
                }
                node = mcf.node(node).operands()[child_idx];
                stack.push((child_idx, node));
                child_idx = 0;
                ctx.nodes_to_delete.push(node);
            }
            TapeOp::Pop => {
                let (popped_idx, _) = stack.pop().expect("pop from an empty pattern stack");
                child_idx = popped_idx + 1;
                node = stack.last().expect("pattern stack has a parent").1;
            }
            TapeOp::CheckNodeType(expected) => {
                if mcf.node(node).kind != expected {
                    return false;
                }
            }
            TapeOp::CheckOperandType(index) => {
                let index = index as usize;
                let operand = def.inputs[index];
                if child_idx >= mcf.node(node).arity() {
                    return false;
                }
                let child = mcf.node(node).operands()[child_idx];
                child_idx += 1;
                let adjusted = def.adjust_operand_index(index, target);
                match operand {
                    OperandDesc::Imm(bits) => {
                        let imm_ok = matches!(
                            mcf.node(child).payload,
                            Some(Payload::Imm { bits: b, .. }) if b == u32::from(bits)
                        );
                        if mcf.node(child).kind != NodeKind::Constant || !imm_ok {
                            return false;
                        }
                    }
                    OperandDesc::Reg(class) => {
                        if !target.is_register_class(class, mcf.node(child).ty) {
                            return false;
                        }
                    }
                    OperandDesc::Frag(kind) => {
                        let frag = target.fragment(kind);
                        if !target.match_fragment(&frag, mcf, child, ctx, adjusted) {
                            return false;
                        }
                    }
                    OperandDesc::None => unreachable!("matched against an undeclared operand"),
                }
                // A repeated non-fragment operand must be semantically
                // equal to its first occurrence.
                if !matches!(operand, OperandDesc::Frag(_)) {
                    match ctx.operands[adjusted] {
                        None => ctx.operands[adjusted] = Some(child),
                        Some(first) => {
                            if !mcf.nodes_equal(first, child) {
                                return false;
                            }
                        }
                    }
                }
            }
            TapeOp::None => unreachable!("tape shorter than its recorded length"),
        }
    }
    true
}
