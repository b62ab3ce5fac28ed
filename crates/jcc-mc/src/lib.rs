//! Machine IR: per-basic-block selection DAGs over TIR, a compile-time
//! pattern DSL, maximal-munch instruction selection, and topological
//! scheduling.
//!
//! The pipeline is: [`builder::build_dag`] translates each TIR function
//! into one DAG per basic block (with chain edges for ordering
//! constraints), [`isel::select_instructions`] tiles the DAGs with target
//! patterns, and [`sched::schedule`] linearises each DAG and computes live
//! ranges for the register allocator downstream.

pub mod builder;
pub mod isel;
pub mod node;
pub mod pattern;
pub mod sched;
pub mod target;
pub mod x86;
