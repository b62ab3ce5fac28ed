//! The typed three-address IR (TIR) of the JCC compiler.
//!
//! A [`module::Module`] owns every IR value in one arena; values refer to
//! each other through [`value::ValueId`] handles and every operand edge is
//! mirrored by a reverse [`value::Use`] entry on the operand. Types are
//! uniqued in a [`types::Context`]: two structurally identical types always
//! share one [`types::TyId`].
//!
//! Instructions form doubly linked lists inside basic blocks, with
//! insertion cursors that can point before the first and after the last
//! instruction; the [`builder::IrBuilder`] drives construction.

pub mod builder;
pub mod module;
pub mod print;
pub mod types;
pub mod value;
