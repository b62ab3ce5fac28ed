//! The TIR module (compilation unit).
//!
//! Owns the context and every value; provides the checked graph mutations
//! (operand edges, use lists, replace-all-uses-with), the instruction
//! linked-list operations, and the CFG queries the transforms build on.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::types::{Context, TyId};
use crate::value::{
    BinOp, BlockData, CastOp, FunctionData, InstData, InstKind, Predicate, Use, Value, ValueId,
    ValueKind,
};

/// A position within a basic block's instruction list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    /// Before the first instruction
    BeforeFirst,
    /// After the last instruction
    AfterLast,
    /// Immediately after the given instruction
    After(ValueId),
}

/// An insertion cursor: a block plus a position within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPoint {
    pub block: ValueId,
    pub pos: Pos,
}

/// The compilation unit: the context plus all values and global objects.
#[derive(Debug)]
pub struct Module {
    pub ctx: Context,
    values: Vec<Value>,
    /// Global objects (functions and global variables), by name
    globals: IndexMap<String, ValueId>,
    /// The singleton null-pointer constant
    null_ptr: ValueId,
}

impl Module {
    /// Creates an empty module over the given context.
    #[must_use]
    pub fn new(mut ctx: Context) -> Self {
        let ptr_ty = ctx.pointer_ty();
        let vid = ctx.next_value_id();
        let null = Value {
            ty: ptr_ty,
            name: None,
            vid,
            operands: Vec::new(),
            uses: Vec::new(),
            kind: ValueKind::NullPointer,
        };
        Self { ctx, values: vec![null], globals: IndexMap::new(), null_ptr: ValueId(0) }
    }

    // ===-- Value access ------------------------------------------------=== //

    #[must_use]
    pub fn value(&self, id: ValueId) -> &Value { &self.values[id.index()] }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value { &mut self.values[id.index()] }

    /// The number of values allocated so far.
    #[must_use]
    pub fn value_count(&self) -> usize { self.values.len() }

    /// Sets a value's name (used by the printer).
    pub fn set_name(&mut self, id: ValueId, name: impl Into<String>) {
        self.values[id.index()].name = Some(name.into());
    }

    fn alloc_value(&mut self, ty: TyId, kind: ValueKind) -> ValueId {
        let vid = self.ctx.next_value_id();
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value { ty, name: None, vid, operands: Vec::new(), uses: Vec::new(), kind });
        id
    }

    // ===-- Operand and use-list maintenance ---------------------------=== //

    /// Appends an operand to a user, recording the reverse edge.
    pub fn add_operand(&mut self, user: ValueId, operand: ValueId) {
        let index = self.values[user.index()].operands.len() as u32;
        self.values[user.index()].operands.push(operand);
        self.values[operand.index()].uses.push(Use { user, index });
    }

    /// Replaces the operand at `index`, keeping both use lists consistent.
    pub fn replace_operand(&mut self, user: ValueId, index: usize, operand: ValueId) {
        let old = self.values[user.index()].operands[index];
        let use_entry = Use { user, index: index as u32 };
        let uses = &mut self.values[old.index()].uses;
        let pos = uses
            .iter()
            .position(|u| *u == use_entry)
            .expect("operand edge missing its reverse use");
        let _ = uses.swap_remove(pos);
        self.values[user.index()].operands[index] = operand;
        self.values[operand.index()].uses.push(use_entry);
    }

    /// Removes the operand at `index`. Later operands shift down and their
    /// recorded use indices are renumbered to match.
    pub fn remove_operand(&mut self, user: ValueId, index: usize) {
        let old = self.values[user.index()].operands.remove(index);
        let use_entry = Use { user, index: index as u32 };
        let uses = &mut self.values[old.index()].uses;
        let pos = uses
            .iter()
            .position(|u| *u == use_entry)
            .expect("operand edge missing its reverse use");
        let _ = uses.swap_remove(pos);
        // Renumber the shifted operands' reverse edges.
        let shifted: Vec<ValueId> =
            self.values[user.index()].operands[index..].to_vec();
        for (offset, operand) in shifted.into_iter().enumerate() {
            let old_index = (index + offset + 1) as u32;
            let new_index = (index + offset) as u32;
            for use_entry in &mut self.values[operand.index()].uses {
                if use_entry.user == user && use_entry.index == old_index {
                    use_entry.index = new_index;
                    break;
                }
            }
        }
    }

    /// Drops every operand edge of a user (used when erasing instructions).
    pub fn drop_operands(&mut self, user: ValueId) {
        let operands = std::mem::take(&mut self.values[user.index()].operands);
        for (index, operand) in operands.into_iter().enumerate() {
            let use_entry = Use { user, index: index as u32 };
            let uses = &mut self.values[operand.index()].uses;
            if let Some(pos) = uses.iter().position(|u| *u == use_entry) {
                let _ = uses.swap_remove(pos);
            }
        }
    }

    /// Rewrites every use of `old` to refer to `new`, preserving operand
    /// indices. `old` ends with no uses.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) {
        let uses = std::mem::take(&mut self.values[old.index()].uses);
        for use_entry in uses {
            self.values[use_entry.user.index()].operands[use_entry.index as usize] = new;
            self.values[new.index()].uses.push(use_entry);
        }
    }

    /// The distinct users of a value, in use order.
    #[must_use]
    pub fn users(&self, value: ValueId) -> Vec<ValueId> {
        let mut seen = FxHashSet::default();
        self.value(value)
            .uses()
            .iter()
            .map(|u| u.user)
            .filter(|&u| seen.insert(u))
            .collect()
    }

    // ===-- Constants ---------------------------------------------------=== //

    /// The singleton null-pointer constant.
    #[must_use]
    pub const fn null_pointer(&self) -> ValueId { self.null_ptr }

    /// A fresh integer constant of the given type.
    pub fn const_int(&mut self, ty: TyId, value: u64) -> ValueId {
        debug_assert!(self.ctx.is_integer(ty), "integer constant needs an integer type");
        self.alloc_value(ty, ValueKind::ConstantInt { value })
    }

    /// A boolean (`i1`) constant.
    pub fn const_bool(&mut self, value: bool) -> ValueId {
        let i1 = self.ctx.i1_ty();
        self.const_int(i1, u64::from(value))
    }

    /// An `i32` constant.
    pub fn const_i32(&mut self, value: u32) -> ValueId {
        let i32_ty = self.ctx.i32_ty();
        self.const_int(i32_ty, u64::from(value))
    }

    /// A fresh undef value of the given type.
    pub fn undef(&mut self, ty: TyId) -> ValueId { self.alloc_value(ty, ValueKind::Undef) }

    /// The integer value of a constant-int, zero-extended.
    #[must_use]
    pub fn const_int_value(&self, id: ValueId) -> Option<u64> {
        match self.value(id).kind {
            ValueKind::ConstantInt { value } => Some(value),
            _ => None,
        }
    }

    // ===-- Globals -----------------------------------------------------=== //

    /// Creates a function with pre-allocated argument values.
    pub fn create_function(&mut self, name: impl Into<String>, fn_ty: TyId) -> ValueId {
        let name = name.into();
        let func = self.alloc_value(
            fn_ty,
            ValueKind::Function(FunctionData { blocks: Vec::new(), args: Vec::new(), noreturn: false }),
        );
        self.values[func.index()].name = Some(name.clone());
        let params = self.ctx.param_tys(fn_ty);
        for (index, param_ty) in params.into_iter().enumerate() {
            let arg =
                self.alloc_value(param_ty, ValueKind::Argument { func, index: index as u32 });
            // Arguments are the function's operands, so they share the
            // use-list machinery.
            self.add_operand(func, arg);
            if let ValueKind::Function(data) = &mut self.values[func.index()].kind {
                data.args.push(arg);
            }
        }
        let _ = self.globals.insert(name, func);
        func
    }

    /// Creates a global variable of the given type.
    pub fn create_global_variable(&mut self, name: impl Into<String>, ty: TyId) -> ValueId {
        let name = name.into();
        let global = self.alloc_value(ty, ValueKind::GlobalVariable);
        self.values[global.index()].name = Some(name.clone());
        let _ = self.globals.insert(name, global);
        global
    }

    /// Looks up a global object by name.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<ValueId> { self.globals.get(name).copied() }

    /// All functions, in creation order.
    #[must_use]
    pub fn functions(&self) -> Vec<ValueId> {
        self.globals
            .values()
            .copied()
            .filter(|&g| self.value(g).is_function())
            .collect()
    }

    /// Removes a global object from the name table.
    pub fn remove_global(&mut self, id: ValueId) {
        self.globals.retain(|_, &mut g| g != id);
    }

    /// Marks a function as noreturn; calls to it terminate their block.
    pub fn set_noreturn(&mut self, func: ValueId) {
        if let ValueKind::Function(data) = &mut self.values[func.index()].kind {
            data.noreturn = true;
        }
    }

    // ===-- Functions and blocks ----------------------------------------=== //

    /// The argument values of a function.
    #[must_use]
    pub fn func_args(&self, func: ValueId) -> Vec<ValueId> {
        match &self.value(func).kind {
            ValueKind::Function(data) => data.args.clone(),
            _ => panic!("not a function"),
        }
    }

    /// The basic blocks of a function, in insertion order.
    #[must_use]
    pub fn func_blocks(&self, func: ValueId) -> Vec<ValueId> {
        match &self.value(func).kind {
            ValueKind::Function(data) => data.blocks.clone(),
            _ => panic!("not a function"),
        }
    }

    /// The entry block: the first block added.
    #[must_use]
    pub fn entry_block(&self, func: ValueId) -> Option<ValueId> {
        match &self.value(func).kind {
            ValueKind::Function(data) => data.blocks.first().copied(),
            _ => panic!("not a function"),
        }
    }

    /// Whether a function has any blocks.
    #[must_use]
    pub fn func_has_body(&self, func: ValueId) -> bool {
        matches!(&self.value(func).kind, ValueKind::Function(data) if !data.blocks.is_empty())
    }

    /// Creates an empty basic block at the end of a function.
    pub fn create_block(&mut self, func: ValueId) -> ValueId {
        let label = self.ctx.label_ty();
        let block = self.alloc_value(
            label,
            ValueKind::BasicBlock(BlockData { parent: func, first: None, last: None }),
        );
        if let ValueKind::Function(data) = &mut self.values[func.index()].kind {
            data.blocks.push(block);
        } else {
            panic!("not a function");
        }
        block
    }

    /// Removes a block from its function's block list. The block's
    /// instructions are not touched; callers erase them first.
    pub fn erase_block(&mut self, block: ValueId) {
        let parent = match &self.value(block).kind {
            ValueKind::BasicBlock(data) => data.parent,
            _ => panic!("not a basic block"),
        };
        if let ValueKind::Function(data) = &mut self.values[parent.index()].kind {
            data.blocks.retain(|&b| b != block);
        }
    }

    fn block_data(&self, block: ValueId) -> &BlockData {
        match &self.value(block).kind {
            ValueKind::BasicBlock(data) => data,
            _ => panic!("not a basic block"),
        }
    }

    fn block_data_mut(&mut self, block: ValueId) -> &mut BlockData {
        match &mut self.values[block.index()].kind {
            ValueKind::BasicBlock(data) => data,
            _ => panic!("not a basic block"),
        }
    }

    fn inst_data(&self, inst: ValueId) -> &InstData {
        self.value(inst).as_inst().expect("not an instruction")
    }

    fn inst_data_mut(&mut self, inst: ValueId) -> &mut InstData {
        match &mut self.values[inst.index()].kind {
            ValueKind::Inst(data) => data,
            _ => panic!("not an instruction"),
        }
    }

    /// The parent block of an instruction, if linked.
    #[must_use]
    pub fn inst_parent(&self, inst: ValueId) -> Option<ValueId> { self.inst_data(inst).parent }

    /// The next instruction within the block.
    #[must_use]
    pub fn inst_next(&self, inst: ValueId) -> Option<ValueId> { self.inst_data(inst).next }

    /// The previous instruction within the block.
    #[must_use]
    pub fn inst_prev(&self, inst: ValueId) -> Option<ValueId> { self.inst_data(inst).prev }

    /// The instruction kind.
    #[must_use]
    pub fn inst_kind(&self, inst: ValueId) -> InstKind { self.inst_data(inst).kind }

    /// The instructions of a block, first to last.
    #[must_use]
    pub fn block_insts(&self, block: ValueId) -> Vec<ValueId> {
        let mut out = Vec::new();
        let mut cur = self.block_data(block).first;
        while let Some(inst) = cur {
            out.push(inst);
            cur = self.inst_data(inst).next;
        }
        out
    }

    /// The terminator: the last instruction of the block.
    #[must_use]
    pub fn terminator(&self, block: ValueId) -> Option<ValueId> { self.block_data(block).last }

    /// The leading phi instructions of a block.
    #[must_use]
    pub fn block_phis(&self, block: ValueId) -> Vec<ValueId> {
        let mut out = Vec::new();
        let mut cur = self.block_data(block).first;
        while let Some(inst) = cur {
            if self.inst_data(inst).kind != InstKind::Phi {
                break;
            }
            out.push(inst);
            cur = self.inst_data(inst).next;
        }
        out
    }

    // ===-- Instruction list manipulation -------------------------------=== //

    /// Appends an instruction at the end of a block.
    pub fn append_inst(&mut self, block: ValueId, inst: ValueId) {
        let last = self.block_data(block).last;
        match last {
            None => {
                let data = self.block_data_mut(block);
                data.first = Some(inst);
                data.last = Some(inst);
                let inst_data = self.inst_data_mut(inst);
                inst_data.parent = Some(block);
                inst_data.prev = None;
                inst_data.next = None;
            }
            Some(last) => self.insert_inst_after(inst, last),
        }
    }

    /// Inserts an instruction before the first instruction of a block.
    pub fn insert_inst_before_begin(&mut self, block: ValueId, inst: ValueId) {
        let first = self.block_data(block).first;
        let inst_data = self.inst_data_mut(inst);
        inst_data.parent = Some(block);
        inst_data.prev = None;
        inst_data.next = first;
        match first {
            None => self.block_data_mut(block).last = Some(inst),
            Some(first) => self.inst_data_mut(first).prev = Some(inst),
        }
        self.block_data_mut(block).first = Some(inst);
    }

    /// Inserts an instruction immediately after another.
    pub fn insert_inst_after(&mut self, inst: ValueId, after: ValueId) {
        let (parent, next) = {
            let after_data = self.inst_data(after);
            (after_data.parent, after_data.next)
        };
        {
            let inst_data = self.inst_data_mut(inst);
            inst_data.parent = parent;
            inst_data.prev = Some(after);
            inst_data.next = next;
        }
        self.inst_data_mut(after).next = Some(inst);
        match next {
            Some(next) => self.inst_data_mut(next).prev = Some(inst),
            None => {
                if let Some(parent) = parent {
                    self.block_data_mut(parent).last = Some(inst);
                }
            }
        }
    }

    /// Unlinks an instruction from its block, keeping its operand edges.
    pub fn unlink_inst(&mut self, inst: ValueId) {
        let InstData { parent, prev, next, .. } = *self.inst_data(inst);
        if let Some(prev) = prev {
            self.inst_data_mut(prev).next = next;
        }
        if let Some(next) = next {
            self.inst_data_mut(next).prev = prev;
        }
        if let Some(parent) = parent {
            let data = self.block_data_mut(parent);
            if data.first == Some(inst) {
                data.first = next;
            }
            if data.last == Some(inst) {
                data.last = prev;
            }
        }
        let data = self.inst_data_mut(inst);
        data.parent = None;
        data.prev = None;
        data.next = None;
    }

    /// Unlinks an instruction and drops its operand edges. The erased
    /// instruction must itself have no users left.
    pub fn erase_inst(&mut self, inst: ValueId) {
        debug_assert!(
            self.value(inst).uses().is_empty(),
            "erasing an instruction that still has users"
        );
        self.unlink_inst(inst);
        self.drop_operands(inst);
    }

    // ===-- Instruction creation ----------------------------------------=== //

    fn new_inst(&mut self, ty: TyId, kind: InstKind, operands: &[ValueId]) -> ValueId {
        let inst = self.alloc_value(
            ty,
            ValueKind::Inst(InstData { kind, parent: None, prev: None, next: None }),
        );
        for &operand in operands {
            self.add_operand(inst, operand);
        }
        inst
    }

    /// A conditional branch; unconditional iff both successors are equal.
    pub fn new_branch(&mut self, cond: ValueId, true_bb: ValueId, false_bb: ValueId) -> ValueId {
        debug_assert!(self.ctx.is_boolean(self.value(cond).ty), "branch condition must be i1");
        let void = self.ctx.void_ty();
        self.new_inst(void, InstKind::Branch, &[cond, true_bb, false_bb])
    }

    /// A return of a value, or of nothing.
    pub fn new_return(&mut self, value: Option<ValueId>) -> ValueId {
        let void = self.ctx.void_ty();
        match value {
            Some(value) => self.new_inst(void, InstKind::Return, &[value]),
            None => self.new_inst(void, InstKind::Return, &[]),
        }
    }

    pub fn new_store(&mut self, value: ValueId, ptr: ValueId) -> ValueId {
        let void = self.ctx.void_ty();
        self.new_inst(void, InstKind::Store, &[value, ptr])
    }

    pub fn new_load(&mut self, ty: TyId, ptr: ValueId) -> ValueId {
        self.new_inst(ty, InstKind::Load, &[ptr])
    }

    pub fn new_call(&mut self, callee: ValueId, args: &[ValueId]) -> ValueId {
        let ret = self.ctx.return_ty(self.value(callee).ty);
        let mut operands = vec![callee];
        operands.extend_from_slice(args);
        self.new_inst(ret, InstKind::Call, &operands)
    }

    pub fn new_binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.value(lhs).ty;
        debug_assert_eq!(ty, self.value(rhs).ty, "binary operands must share a type");
        self.new_inst(ty, InstKind::Binary(op), &[lhs, rhs])
    }

    pub fn new_cmp(&mut self, pred: Predicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let i1 = self.ctx.i1_ty();
        self.new_inst(i1, InstKind::Cmp(pred), &[lhs, rhs])
    }

    pub fn new_icast(&mut self, op: CastOp, value: ValueId, dest_ty: TyId) -> ValueId {
        self.new_inst(dest_ty, InstKind::ICast(op), &[value])
    }

    pub fn new_alloca(&mut self, allocated: TyId) -> ValueId {
        let ptr = self.ctx.pointer_ty();
        self.new_inst(ptr, InstKind::Alloca { allocated }, &[])
    }

    pub fn new_gep(&mut self, ptr_val: ValueId, contained: TyId, indices: &[ValueId]) -> ValueId {
        let ptr = self.ctx.pointer_ty();
        let mut operands = vec![ptr_val];
        operands.extend_from_slice(indices);
        self.new_inst(ptr, InstKind::Gep { contained }, &operands)
    }

    /// A phi with the given incoming `(predecessor, value)` pairs.
    pub fn new_phi(&mut self, ty: TyId, incoming: &[(ValueId, ValueId)]) -> ValueId {
        let mut operands = Vec::with_capacity(incoming.len() * 2);
        for &(pred, value) in incoming {
            operands.push(value);
            operands.push(pred);
        }
        self.new_inst(ty, InstKind::Phi, &operands)
    }

    /// The `(predecessor, value)` pairs of a phi.
    #[must_use]
    pub fn phi_incoming(&self, phi: ValueId) -> Vec<(ValueId, ValueId)> {
        debug_assert_eq!(self.inst_kind(phi), InstKind::Phi);
        self.value(phi)
            .operands()
            .chunks(2)
            .map(|pair| (pair[1], pair[0]))
            .collect()
    }

    /// Sets or overwrites the incoming value for a predecessor edge.
    pub fn phi_set_incoming(&mut self, phi: ValueId, pred: ValueId, value: ValueId) {
        debug_assert_eq!(self.inst_kind(phi), InstKind::Phi);
        let operands = self.value(phi).operands().to_vec();
        for (i, pair) in operands.chunks(2).enumerate() {
            if pair.len() == 2 && pair[1] == pred {
                self.replace_operand(phi, i * 2, value);
                return;
            }
        }
        self.add_operand(phi, value);
        self.add_operand(phi, pred);
    }

    // ===-- CFG queries --------------------------------------------------=== //

    /// Whether this instruction terminates its block. Branches and returns
    /// always do; calls do iff the callee is noreturn.
    #[must_use]
    pub fn is_terminator(&self, inst: ValueId) -> bool {
        if self.value(inst).is_terminator() {
            return true;
        }
        if let ValueKind::Inst(InstData { kind: InstKind::Call, .. }) = self.value(inst).kind {
            let callee = self.value(inst).operands()[0];
            if let ValueKind::Function(data) = &self.value(callee).kind {
                return data.noreturn;
            }
        }
        false
    }

    /// The successors of a block, from its terminator.
    #[must_use]
    pub fn successors(&self, block: ValueId) -> Vec<ValueId> {
        let Some(term) = self.terminator(block) else { return Vec::new() };
        if self.inst_data(term).kind != InstKind::Branch {
            return Vec::new();
        }
        let operands = self.value(term).operands();
        let (t, f) = (operands[1], operands[2]);
        if t == f { vec![t] } else { vec![t, f] }
    }

    /// The predecessors of a block: the parents of the branch instructions
    /// using it.
    #[must_use]
    pub fn predecessors(&self, block: ValueId) -> Vec<ValueId> {
        let mut preds = Vec::new();
        for use_entry in self.value(block).uses() {
            let user = use_entry.user;
            if !self.value(user).is_instruction() {
                continue;
            }
            if self.inst_data(user).kind != InstKind::Branch {
                continue;
            }
            if let Some(parent) = self.inst_data(user).parent
                && !preds.contains(&parent)
            {
                preds.push(parent);
            }
        }
        preds
    }

    /// The blocks of a function in reverse post-order.
    #[must_use]
    pub fn reverse_post_order(&self, func: ValueId) -> Vec<ValueId> {
        let Some(entry) = self.entry_block(func) else { return Vec::new() };
        let mut visited = FxHashSet::default();
        let mut postorder = Vec::new();
        self.postorder_visit(entry, &mut visited, &mut postorder);
        postorder.reverse();
        postorder
    }

    fn postorder_visit(
        &self,
        block: ValueId,
        visited: &mut FxHashSet<ValueId>,
        out: &mut Vec<ValueId>,
    ) {
        if !visited.insert(block) {
            return;
        }
        for succ in self.successors(block) {
            self.postorder_visit(succ, visited, out);
        }
        out.push(block);
    }

    /// All alloca instructions of a function.
    #[must_use]
    pub fn allocas(&self, func: ValueId) -> Vec<ValueId> {
        let mut out = Vec::new();
        for block in self.func_blocks(func) {
            for inst in self.block_insts(block) {
                if matches!(self.inst_data(inst).kind, InstKind::Alloca { .. }) {
                    out.push(inst);
                }
            }
        }
        out
    }
}
