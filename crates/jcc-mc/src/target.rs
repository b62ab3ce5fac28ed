//! The target description interface.
//!
//! A concrete target supplies its instruction patterns and fragments as
//! `const` data, register-class compatibility, a pattern comparator used
//! to order candidates at selector start-up, and one predicate per
//! fragment kind.

use std::cmp::Ordering;
use std::fmt;

use crate::node::{MachTy, McFunction, NodeId};
use crate::pattern::{MatchContext, PatternDef, PatternFrag};

/// A concrete instruction-selection target.
pub trait TargetIsel: fmt::Debug {
    /// The target name, for diagnostics and dumps.
    fn name(&self) -> &'static str;

    /// Pointer width in bits.
    fn pointer_size_bits(&self) -> u32;

    /// Stack slot alignment in bytes.
    fn stack_alignment(&self) -> u32;

    /// Every pattern definition of the target.
    fn patterns(&self) -> &'static [PatternDef];

    /// The fragment table, indexed by fragment kind.
    fn fragment(&self, kind: u8) -> PatternFrag;

    /// The display name of an instruction.
    fn pattern_name(&self, inst: u16) -> &'static str;

    /// The display name of a fragment kind.
    fn fragment_name(&self, kind: u16) -> &'static str;

    /// The display name of a register class.
    fn reg_class_name(&self, class: u8) -> &'static str;

    /// Whether a register class can hold a value of the given type.
    fn is_register_class(&self, class: u8, ty: MachTy) -> bool;

    /// The ordering used to sort a node kind's candidate patterns before
    /// selection; `Less` sorts first and is therefore preferred.
    fn compare_patterns(&self, a: &PatternDef, b: &PatternDef) -> Ordering;

    /// Resolves a fragment against a candidate node, filling the operand
    /// slots starting at `op_index` on success.
    fn match_fragment(
        &self,
        frag: &PatternFrag,
        mcf: &McFunction,
        node: NodeId,
        ctx: &mut MatchContext<'_>,
        op_index: usize,
    ) -> bool;
}
