//! The IR builder.
//!
//! Wraps a module with an explicit insertion point. Every `create_*`
//! allocates the instruction, links its operands (registering the reverse
//! use edges), inserts it at the current point, and advances the point past
//! it.

use crate::module::{InsertPoint, Module, Pos};
use crate::types::TyId;
use crate::value::{BinOp, CastOp, Predicate, ValueId};

/// An instruction builder positioned inside a module.
#[derive(Debug)]
pub struct IrBuilder<'m> {
    module: &'m mut Module,
    point: Option<InsertPoint>,
}

impl<'m> IrBuilder<'m> {
    /// Creates a builder with no insertion point set.
    pub fn new(module: &'m mut Module) -> Self { Self { module, point: None } }

    /// The module being built into.
    pub fn module(&mut self) -> &mut Module { self.module }

    /// Sets the insertion point.
    pub fn set_insert_point(&mut self, point: InsertPoint) { self.point = Some(point); }

    /// Positions the builder after the last instruction of a block.
    pub fn set_insert_point_at_end(&mut self, block: ValueId) {
        self.point = Some(InsertPoint { block, pos: Pos::AfterLast });
    }

    /// The current insertion point.
    #[must_use]
    pub fn insert_point(&self) -> Option<InsertPoint> { self.point }

    fn insert(&mut self, inst: ValueId) -> ValueId {
        let point = self.point.expect("builder has no insertion point");
        match point.pos {
            Pos::AfterLast => self.module.append_inst(point.block, inst),
            Pos::BeforeFirst => self.module.insert_inst_before_begin(point.block, inst),
            Pos::After(prev) => self.module.insert_inst_after(inst, prev),
        }
        // The point advances past the inserted instruction.
        self.point = Some(InsertPoint { block: point.block, pos: Pos::After(inst) });
        inst
    }

    /// Creates a new empty basic block in the given function.
    pub fn create_block(&mut self, func: ValueId) -> ValueId { self.module.create_block(func) }

    pub fn create_binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let inst = self.module.new_binary(op, lhs, rhs);
        self.insert(inst)
    }

    pub fn create_cmp(&mut self, pred: Predicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let inst = self.module.new_cmp(pred, lhs, rhs);
        self.insert(inst)
    }

    pub fn create_call(&mut self, callee: ValueId, args: &[ValueId]) -> ValueId {
        let inst = self.module.new_call(callee, args);
        self.insert(inst)
    }

    pub fn create_load(&mut self, ty: TyId, ptr: ValueId) -> ValueId {
        let inst = self.module.new_load(ty, ptr);
        self.insert(inst)
    }

    pub fn create_store(&mut self, value: ValueId, ptr: ValueId) -> ValueId {
        let inst = self.module.new_store(value, ptr);
        self.insert(inst)
    }

    pub fn create_return(&mut self, value: Option<ValueId>) -> ValueId {
        let inst = self.module.new_return(value);
        self.insert(inst)
    }

    /// A conditional branch.
    pub fn create_cond_branch(
        &mut self,
        cond: ValueId,
        true_bb: ValueId,
        false_bb: ValueId,
    ) -> ValueId {
        let inst = self.module.new_branch(cond, true_bb, false_bb);
        self.insert(inst)
    }

    /// An unconditional branch, synthesised as a branch on constant true
    /// to the same target twice.
    pub fn create_branch(&mut self, target: ValueId) -> ValueId {
        let cond = self.module.const_bool(true);
        self.create_cond_branch(cond, target, target)
    }

    pub fn create_alloca(&mut self, allocated: TyId) -> ValueId {
        let inst = self.module.new_alloca(allocated);
        self.insert(inst)
    }

    pub fn create_gep(
        &mut self,
        ptr: ValueId,
        contained: TyId,
        indices: &[ValueId],
    ) -> ValueId {
        let inst = self.module.new_gep(ptr, contained, indices);
        self.insert(inst)
    }

    pub fn create_icast(&mut self, op: CastOp, value: ValueId, dest_ty: TyId) -> ValueId {
        let inst = self.module.new_icast(op, value, dest_ty);
        self.insert(inst)
    }
}
