//! Textual dump of TIR functions.
//!
//! The format is assembly-like and meant for humans and tests; values print
//! as `%name.id` (or `%id` when unnamed), blocks as `bb.id:`.

use std::fmt::Write;

use crate::module::Module;
use crate::value::{InstKind, ValueId, ValueKind};

impl Module {
    /// Renders one value as an operand reference.
    #[must_use]
    pub fn operand_string(&self, id: ValueId) -> String {
        let value = self.value(id);
        match &value.kind {
            ValueKind::ConstantInt { value: v } => {
                format!("{} {v}", self.ctx.ty_string(value.ty))
            }
            ValueKind::NullPointer => "ptr null".to_string(),
            ValueKind::Undef => "undef".to_string(),
            ValueKind::Function(_) | ValueKind::GlobalVariable => {
                format!("@{}", value.name.as_deref().unwrap_or("?"))
            }
            ValueKind::BasicBlock(_) => format!("^bb{}", value.vid),
            ValueKind::Argument { .. } | ValueKind::Inst(_) => value.print_name(),
        }
    }

    /// Renders one instruction line.
    #[must_use]
    pub fn inst_string(&self, inst: ValueId) -> String {
        let value = self.value(inst);
        let ops: Vec<String> =
            value.operands().iter().map(|&op| self.operand_string(op)).collect();
        let kind = self.inst_kind(inst);
        match kind {
            InstKind::Branch => {
                format!("br {}, {}, {}", ops[0], ops[1], ops[2])
            }
            InstKind::Return => match ops.first() {
                Some(op) => format!("ret {op}"),
                None => "ret void".to_string(),
            },
            InstKind::Store => format!("store {}, {}", ops[0], ops[1]),
            InstKind::Load => {
                format!("{} = load {}, {}", value.print_name(), self.ctx.ty_string(value.ty), ops[0])
            }
            InstKind::Call => {
                let callee = &ops[0];
                let args = ops[1..].join(", ");
                if self.ctx.is_void(value.ty) {
                    format!("call {callee}({args})")
                } else {
                    format!("{} = call {callee}({args})", value.print_name())
                }
            }
            InstKind::Binary(op) => {
                format!(
                    "{} = {op} {}, {}",
                    value.print_name(),
                    ops[0],
                    ops[1]
                )
            }
            InstKind::Cmp(pred) => {
                format!("{} = cmp {pred} {}, {}", value.print_name(), ops[0], ops[1])
            }
            InstKind::ICast(op) => {
                format!(
                    "{} = {op} {} to {}",
                    value.print_name(),
                    ops[0],
                    self.ctx.ty_string(value.ty)
                )
            }
            InstKind::Alloca { allocated } => {
                format!("{} = alloca {}", value.print_name(), self.ctx.ty_string(allocated))
            }
            InstKind::Gep { contained } => {
                let indices = ops[1..].join(", ");
                format!(
                    "{} = getelementptr {}, {}, {indices}",
                    value.print_name(),
                    self.ctx.ty_string(contained),
                    ops[0]
                )
            }
            InstKind::Phi => {
                let pairs: Vec<String> = self
                    .phi_incoming(inst)
                    .into_iter()
                    .map(|(pred, val)| {
                        format!("[{}, {}]", self.operand_string(val), self.operand_string(pred))
                    })
                    .collect();
                format!("{} = phi {}", value.print_name(), pairs.join(", "))
            }
        }
    }

    /// Renders a whole function.
    #[must_use]
    pub fn function_string(&self, func: ValueId) -> String {
        let value = self.value(func);
        let mut out = String::new();
        let args: Vec<String> = self
            .func_args(func)
            .iter()
            .map(|&arg| {
                format!("{} {}", self.ctx.ty_string(self.value(arg).ty), self.value(arg).print_name())
            })
            .collect();
        let ret = self.ctx.ty_string(self.ctx.return_ty(value.ty));
        let _ = writeln!(
            out,
            "function {ret} @{}({}) {{",
            value.name.as_deref().unwrap_or("?"),
            args.join(", ")
        );
        for block in self.func_blocks(func) {
            let _ = writeln!(out, "bb{}:", self.value(block).vid);
            for inst in self.block_insts(block) {
                let _ = writeln!(out, "    {}", self.inst_string(inst));
            }
        }
        let _ = writeln!(out, "}}");
        out
    }
}
