//! Tests for AST type equality and scope shadowing rules.

use jcc_ast::arena::Ast;
use jcc_ast::ids::TypeDecl;
use jcc_ast::modifiers::Modifiers;
use jcc_ast::ty::{BuiltInKind, Type};
use jcc_source::types::SourceRange;

#[test]
fn test_builtins_compare_by_kind() {
    let mut ast = Ast::new();
    let a = ast.new_builtin(BuiltInKind::Int);
    let b = ast.new_builtin(BuiltInKind::Int);
    let c = ast.new_builtin(BuiltInKind::Boolean);
    assert!(ast.types_equal(a, b));
    assert!(!ast.types_equal(a, c));
}

#[test]
fn test_references_compare_by_declaration() {
    let mut ast = Ast::new();
    let class_a = ast.new_class(Modifiers::new(), "A", None, Vec::new(), SourceRange::synthetic());
    let class_b = ast.new_class(Modifiers::new(), "B", None, Vec::new(), SourceRange::synthetic());
    let ref_a1 = ast.new_type(Type::Reference(TypeDecl::Class(class_a)));
    let ref_a2 = ast.new_type(Type::Reference(TypeDecl::Class(class_a)));
    let ref_b = ast.new_type(Type::Reference(TypeDecl::Class(class_b)));
    assert!(ast.types_equal(ref_a1, ref_a2));
    assert!(!ast.types_equal(ref_a1, ref_b));
}

#[test]
fn test_arrays_compare_by_element() {
    let mut ast = Ast::new();
    let int1 = ast.new_builtin(BuiltInKind::Int);
    let int2 = ast.new_builtin(BuiltInKind::Int);
    let bool1 = ast.new_builtin(BuiltInKind::Boolean);
    let arr_int1 = ast.new_type(Type::Array(int1));
    let arr_int2 = ast.new_type(Type::Array(int2));
    let arr_bool = ast.new_type(Type::Array(bool1));
    assert!(ast.types_equal(arr_int1, arr_int2));
    assert!(!ast.types_equal(arr_int1, arr_bool));
}

#[test]
fn test_method_types_compare_structurally() {
    let mut ast = Ast::new();
    let int1 = ast.new_builtin(BuiltInKind::Int);
    let int2 = ast.new_builtin(BuiltInKind::Int);
    let m1 = ast.new_type(Type::Method { ret: Some(int1), params: vec![int1] });
    let m2 = ast.new_type(Type::Method { ret: Some(int2), params: vec![int2] });
    let m3 = ast.new_type(Type::Method { ret: None, params: vec![int1] });
    assert!(ast.types_equal(m1, m2));
    assert!(!ast.types_equal(m1, m3));
}

#[test]
fn test_unresolved_types_never_compare_equal() {
    let mut ast = Ast::new();
    let u1 = ast.new_type(Type::unresolved(vec!["A".to_string()]));
    let u2 = ast.new_type(Type::unresolved(vec!["A".to_string()]));
    assert!(!ast.types_equal(u1, u2));
    // Not even a slot against itself: equality is defined only for
    // resolved types.
    assert!(!ast.types_equal(u1, u1));
}

#[test]
fn test_resolution_overwrites_the_slot() {
    let mut ast = Ast::new();
    let class = ast.new_class(Modifiers::new(), "A", None, Vec::new(), SourceRange::synthetic());
    let slot = ast.new_type(Type::unresolved(vec!["A".to_string()]));
    assert!(!ast.type_is_resolved(slot));
    ast.resolve_type(slot, TypeDecl::Class(class));
    assert!(ast.type_is_resolved(slot));
    assert_eq!(ast.ty(slot).as_decl(), Some(TypeDecl::Class(class)));
}

#[test]
fn test_sibling_scopes_do_not_conflict() {
    let mut ast = Ast::new();
    let root = ast.scopes.new_scope(None);
    let left = ast.scopes.new_scope(Some(root));
    let right = ast.scopes.new_scope(Some(root));
    let nested = ast.scopes.new_scope(Some(left));

    // Shadowing across siblings is allowed.
    assert!(!ast.scopes.conflicts(left, right));
    // A declaration conflicts with one in the same scope or any ancestor.
    assert!(ast.scopes.conflicts(left, left));
    assert!(ast.scopes.conflicts(root, nested));
    assert!(ast.scopes.conflicts(nested, root));
    assert!(!ast.scopes.conflicts(nested, right));
}

#[test]
fn test_canonical_names_assigned_at_parenting() {
    let mut ast = Ast::new();
    let unit = ast.new_unit(
        vec!["com".to_string(), "example".to_string()],
        Vec::new(),
        SourceRange::synthetic(),
    );
    let class = ast.new_class(Modifiers::new(), "Point", None, Vec::new(), SourceRange::synthetic());
    let method = ast.new_method(
        Modifiers::new(),
        "norm",
        None,
        Vec::new(),
        false,
        None,
        SourceRange::synthetic(),
    );
    ast.class_add_method(class, method);
    ast.set_unit_body(unit, TypeDecl::Class(class));
    assert_eq!(ast.class(class).canonical_name, "com.example.Point");
    assert_eq!(ast.method(method).canonical_name, "com.example.Point.norm");
    assert!(!ast.unit_is_std_lib(unit));
}
