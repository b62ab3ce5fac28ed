//! Semantic analysis for the JCC compiler.
//!
//! The passes here run in dependency order over the whole program:
//!
//! 1. [`name_resolver::NameResolver`] builds the package tree and import
//!    tables, then turns every unresolved type reference into a declaration
//!    pointer.
//! 2. [`hierarchy::HierarchyChecker`] validates the inheritance graph and
//!    computes the inherited method/member closures.
//! 3. The expression evaluators in [`eval`] resolve names inside postfix
//!    expressions, compute expression types, and enforce static-context
//!    rules, all driven by the same stack machine.
//!
//! Every pass reports into a [`jcc_source::diagnostics::DiagnosticEngine`]
//! and keeps going, so one run can surface many errors.

pub mod context;
pub mod error;
pub mod eval;
pub mod hierarchy;
pub mod name_resolver;
pub mod package_tree;
