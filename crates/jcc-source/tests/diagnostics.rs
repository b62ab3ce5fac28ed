//! Tests for spans, source files and the diagnostic engine.

use jcc_source::diagnostics::{DiagArg, Diagnostic, DiagnosticEngine, MAX_ARGS, MAX_RANGES};
use jcc_source::types::{FileId, SourceManager, SourceRange, Span};

#[test]
fn test_span_merge() {
    let a = Span::new(4, 10);
    let b = Span::new(8, 20);
    let merged = a.merge(&b);
    assert_eq!(merged.start, 4);
    assert_eq!(merged.end, 20);
}

#[test]
fn test_source_range_merge_prefers_real_ranges() {
    let file = FileId::new(1);
    let real = SourceRange::new(file, Span::new(2, 6));
    let synthetic = SourceRange::synthetic();
    assert_eq!(real.merge(&synthetic), real);
    assert_eq!(synthetic.merge(&real), real);
}

#[test]
fn test_line_column_lookup() {
    let mut manager = SourceManager::new();
    let id = manager.add_file("test.java".to_string(), "class A {\n  int f;\n}\n".to_string());
    let file = manager.file(id).unwrap();
    assert_eq!(file.line_column(0), (1, 1));
    assert_eq!(file.line_column(10), (2, 1));
    assert_eq!(file.line_column(12), (2, 3));
}

#[test]
fn test_text_at_span() {
    let mut manager = SourceManager::new();
    let id = manager.add_file("test.java".to_string(), "class A {}".to_string());
    let range = SourceRange::new(id, Span::new(6, 7));
    assert_eq!(manager.text_at(range), Some("A"));
}

#[test]
fn test_engine_collects_and_continues() {
    let mut engine = DiagnosticEngine::new();
    assert!(!engine.has_errors());
    engine.report(Diagnostic::new("unresolved-type", "first".to_string(), SourceRange::synthetic()));
    engine.report(Diagnostic::new("name-not-found", "second".to_string(), SourceRange::synthetic()));
    assert!(engine.has_errors());
    assert_eq!(engine.error_count(), 2);
    assert_eq!(engine.errors()[0].code, "unresolved-type");
    assert_eq!(engine.errors()[1].code, "name-not-found");
}

#[test]
fn test_diagnostic_range_and_arg_limits() {
    let mut diag =
        Diagnostic::new("invalid-cast", "message".to_string(), SourceRange::synthetic());
    for _ in 0..MAX_RANGES + 2 {
        diag = diag.with_range(SourceRange::synthetic());
    }
    for i in 0..MAX_ARGS + 3 {
        diag = diag.with_arg(i as i64);
    }
    assert_eq!(diag.ranges().len(), MAX_RANGES);
    assert_eq!(diag.args().len(), MAX_ARGS);
    assert_eq!(diag.args()[0], DiagArg::Int(0));
}
