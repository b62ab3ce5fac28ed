//! TIR values.
//!
//! Every node of the IR — constants, globals, functions, arguments, basic
//! blocks and instructions — is a [`Value`] slot in the module arena. A
//! value that holds operands is a *user*; each operand edge is mirrored by
//! a [`Use`] entry on the operand, so the graph can be walked in both
//! directions and `replace_all_uses_with` is cheap.

use std::fmt;

use crate::types::TyId;

/// Handle to a value in the module arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    #[must_use]
    pub(crate) const fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "v{}", self.0) }
}

/// A reverse operand edge: `user.operands[index] == <this value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    /// The value holding the operand
    pub user: ValueId,
    /// The operand slot within the user
    pub index: u32,
}

/// Binary instruction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        };
        write!(f, "{name}")
    }
}

/// Comparison predicates. Comparisons yield `i1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Ge => "ge",
        };
        write!(f, "{name}")
    }
}

/// Integer cast operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trunc => "trunc",
            Self::ZExt => "zext",
            Self::SExt => "sext",
        };
        write!(f, "{name}")
    }
}

/// The instruction-specific payload. Operands live on the [`Value`].
///
/// - `Branch`: operands `[cond, true_bb, false_bb]`; unconditional iff both
///   successors are equal
/// - `Return`: zero or one operand
/// - `Store`: operands `[value, pointer]`
/// - `Load`: operand `[pointer]`; the result type dictates the load size
/// - `Call`: operands `[callee, args...]`
/// - `Binary`/`Cmp`: operands `[lhs, rhs]`
/// - `ICast`: operand `[value]`; the result type is the target type
/// - `Alloca`: no operands; `allocated` is the element type
/// - `Gep`: operands `[pointer, indices...]`; `contained` is the pointee
/// - `Phi`: operands alternate `[value, pred_bb, value, pred_bb, ...]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind {
    Branch,
    Return,
    Store,
    Load,
    Call,
    Binary(BinOp),
    Cmp(Predicate),
    ICast(CastOp),
    Alloca { allocated: TyId },
    Gep { contained: TyId },
    Phi,
}

/// Data specific to instruction values: the linked-list node within the
/// parent basic block.
#[derive(Debug, Clone, Copy)]
pub struct InstData {
    pub kind: InstKind,
    /// The owning basic block, if linked
    pub parent: Option<ValueId>,
    pub prev: Option<ValueId>,
    pub next: Option<ValueId>,
}

/// Data specific to basic blocks: the instruction list bounds.
#[derive(Debug, Clone, Copy)]
pub struct BlockData {
    /// The owning function
    pub parent: ValueId,
    pub first: Option<ValueId>,
    pub last: Option<ValueId>,
}

/// Data specific to functions.
#[derive(Debug, Clone)]
pub struct FunctionData {
    /// Basic blocks in insertion order; the first is the entry block
    pub blocks: Vec<ValueId>,
    /// Pre-allocated argument values, one per parameter
    pub args: Vec<ValueId>,
    /// A call to a noreturn function terminates its block
    pub noreturn: bool,
}

/// The value variants.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Function(FunctionData),
    Argument { func: ValueId, index: u32 },
    BasicBlock(BlockData),
    Inst(InstData),
    ConstantInt { value: u64 },
    NullPointer,
    GlobalVariable,
    Undef,
}

/// One value slot of the module arena.
#[derive(Debug)]
pub struct Value {
    pub ty: TyId,
    pub name: Option<String>,
    /// The monotonically increasing per-context ID used for printing
    pub vid: u32,
    /// Operand values, in order (empty for non-users)
    pub(crate) operands: Vec<ValueId>,
    /// Reverse edges: who uses this value, and at which operand slot
    pub(crate) uses: Vec<Use>,
    pub kind: ValueKind,
}

impl Value {
    /// The operand list of this value.
    #[must_use]
    pub fn operands(&self) -> &[ValueId] { &self.operands }

    /// The recorded uses of this value.
    #[must_use]
    pub fn uses(&self) -> &[Use] { &self.uses }

    /// The print name: `%name.id`, or `%id` when unnamed.
    #[must_use]
    pub fn print_name(&self) -> String {
        match &self.name {
            Some(name) => format!("%{name}.{}", self.vid),
            None => format!("%{}", self.vid),
        }
    }

    /// The instruction payload, if this value is an instruction.
    #[must_use]
    pub const fn as_inst(&self) -> Option<&InstData> {
        match &self.kind {
            ValueKind::Inst(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_instruction(&self) -> bool { matches!(self.kind, ValueKind::Inst(_)) }

    #[must_use]
    pub const fn is_basic_block(&self) -> bool { matches!(self.kind, ValueKind::BasicBlock(_)) }

    #[must_use]
    pub const fn is_function(&self) -> bool { matches!(self.kind, ValueKind::Function(_)) }

    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ConstantInt { .. }
                | ValueKind::NullPointer
                | ValueKind::GlobalVariable
                | ValueKind::Undef
                | ValueKind::Function(_)
        )
    }

    /// Whether this instruction ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Inst(InstData { kind: InstKind::Branch | InstKind::Return, .. })
        )
    }

    /// Whether removing this instruction could change program behaviour.
    /// Stores and calls are side-effecting; loads are preserved as well
    /// because a removed load could hide a fault.
    #[must_use]
    pub const fn has_side_effects(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Inst(InstData {
                kind: InstKind::Store | InstKind::Call | InstKind::Return | InstKind::Branch,
                ..
            })
        )
    }
}
