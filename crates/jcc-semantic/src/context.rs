//! The semantic analysis driver.
//!
//! Runs the passes in dependency order over a whole linking unit. Each pass
//! reports into the shared diagnostic engine and continues; passes that
//! would mutate over a broken program check `has_errors()` first and are
//! skipped, leaving the AST in its pre-pass state.

use jcc_ast::arena::Ast;
use jcc_ast::decl::LinkingUnit;
use jcc_source::diagnostics::DiagnosticEngine;
use log::debug;

use crate::eval::resolver::resolve_expressions;
use crate::eval::static_check::check_static_contexts;
use crate::eval::typeres::check_types;
use crate::hierarchy::HierarchyChecker;
use crate::name_resolver::NameResolver;

/// The result of a full semantic analysis run.
#[derive(Debug)]
pub struct SemanticContext {
    /// The name resolver, with its package tree and `java.lang` cache
    pub resolver: NameResolver,
    /// The hierarchy checker, with its closure tables
    pub hierarchy: HierarchyChecker,
    /// Everything every pass reported
    pub diag: DiagnosticEngine,
}

impl SemanticContext {
    /// Runs name resolution, hierarchy checking, expression resolution,
    /// type resolution and the static checker, in that order.
    pub fn analyze(ast: &mut Ast, lu: &LinkingUnit) -> Self {
        let mut diag = DiagnosticEngine::new();
        let mut resolver = NameResolver::new();
        resolver.init(ast, lu, &mut diag);
        resolver.resolve(ast, lu, &mut diag);
        let resolution_failed = diag.has_errors();

        let mut hierarchy = HierarchyChecker::new();
        hierarchy.check(ast, lu, &mut diag);

        // The expression passes mutate the AST (attached declarations,
        // reduced lists, recorded types); they require types to have
        // resolved cleanly. Hierarchy violations (say, an override of a
        // final method) do not stop them: the closure tables still exist,
        // and resolving expressions over them surfaces more errors.
        if resolution_failed {
            debug!("skipping expression passes: {} errors outstanding", diag.error_count());
            return Self { resolver, hierarchy, diag };
        }
        let before_expr_passes = diag.error_count();
        resolve_expressions(ast, lu, &resolver, &hierarchy, &mut diag);
        // The later evaluators read the declarations the resolver attached;
        // they only run over expressions that resolved completely.
        if diag.error_count() == before_expr_passes {
            check_types(ast, lu, resolver.java_lang(), &hierarchy, &resolver, &mut diag);
            check_static_contexts(ast, lu, &mut diag);
        }
        Self { resolver, hierarchy, diag }
    }
}
