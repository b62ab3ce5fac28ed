//! Statements.

use jcc_source::types::SourceRange;

use crate::ids::{ExprId, StmtId, VarId};

/// The statement variants of the language subset.
#[derive(Debug)]
pub enum StmtKind {
    /// `{ ... }`
    Block(Vec<StmtId>),
    /// A local variable declaration
    LocalDecl(VarId),
    /// An expression evaluated for its effect
    Expr(ExprId),
    /// `if (cond) then else otherwise`
    If {
        cond: ExprId,
        then_stmt: StmtId,
        else_stmt: Option<StmtId>,
    },
    /// `while (cond) body`
    While { cond: ExprId, body: StmtId },
    /// `for (init; cond; update) body`
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    },
    /// `return;` or `return expr;`
    Return(Option<ExprId>),
    /// The empty statement `;`
    Null,
}

/// A statement with its source range.
#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: SourceRange,
}
