//! Abstract syntax tree for the JCC compiler.
//!
//! All AST entities live in a single arena, the [`arena::Ast`], and refer to
//! each other through typed index handles. Nothing is ever freed
//! individually; the arena is the unit of lifetime. Expressions are kept in
//! postfix form as intrusive singly linked lists of [`expr::ExprNode`]s, so
//! the semantic evaluators can run the same stack machine with different
//! value domains.

pub mod arena;
pub mod decl;
pub mod expr;
pub mod ids;
pub mod modifiers;
pub mod scope;
pub mod stmt;
pub mod ty;
