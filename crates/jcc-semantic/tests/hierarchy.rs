//! Tests for the hierarchy checker: override rules, closures, cycles.

mod common;

use common::{Program, codes};
use jcc_ast::expr::ExprNodeKind;
use jcc_ast::ids::TypeDecl;
use jcc_ast::modifiers::{ModifierFlags, Modifiers};
use jcc_ast::ty::{BuiltInKind, Type};

fn public() -> Modifiers { Modifiers::new().with(ModifierFlags::PUBLIC) }

#[test]
fn test_override_of_final_method_is_reported() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "D", Modifiers::new(), Some(&["C"]));
    let scope = p.ast.scopes.new_scope(None);
    let _ = p.add_method(
        TypeDecl::Class(base),
        "g",
        public().with(ModifierFlags::FINAL),
        None,
        Vec::new(),
        scope,
    );
    let _ = p.add_method(TypeDecl::Class(derived), "g", public(), None, Vec::new(), scope);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"override-of-final"));
}

#[test]
fn test_expression_resolution_continues_after_override_error() {
    // Seed scenario: D overrides a final method, and `new D().g()` in a
    // third class still resolves.
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "D", Modifiers::new(), Some(&["C"]));
    let scope = p.ast.scopes.new_scope(None);
    let _ = p.add_method(
        TypeDecl::Class(base),
        "g",
        public().with(ModifierFlags::FINAL),
        None,
        Vec::new(),
        scope,
    );
    let _ = p.add_method(TypeDecl::Class(derived), "g", public(), None, Vec::new(), scope);
    // D needs a zero-argument constructor for `new D()`.
    let ctor = p.ast.new_method(
        public(),
        "D",
        None,
        Vec::new(),
        true,
        None,
        jcc_source::types::SourceRange::synthetic(),
    );
    p.ast.class_add_method(derived, ctor);

    let (_, caller) = p.add_class(&["a"], "E", Modifiers::new(), None);
    let d_ty = p.unresolved(&["D"]);
    let expr = p.expr(scope, vec![
        ExprNodeKind::TypeNode { ty: d_ty },
        ExprNodeKind::ClassInstanceCreation { argc: 0 },
        ExprNodeKind::MethodName { name: "g".to_string() },
        ExprNodeKind::MemberAccess,
        ExprNodeKind::MethodInvocation { argc: 0 },
    ]);
    let _ = p.add_method_with_expr(caller, "m", public(), None, expr);

    let sema = p.analyze();
    let reported = codes(&sema.diag);
    assert!(reported.contains(&"override-of-final"));
    assert!(!reported.contains(&"name-not-found"), "call resolution succeeded: {reported:?}");
    assert!(!reported.contains(&"method-not-applicable"), "overload found: {reported:?}");
}

#[test]
fn test_diamond_inheritance_with_identical_abstract_methods() {
    // Two interfaces declare the same signature; one implementation
    // suffices and the closure holds a single entry for it.
    let mut p = Program::new();
    let _object = p.add_object();
    let scope = p.ast.scopes.new_scope(None);
    let int1 = p.ast.new_builtin(BuiltInKind::Int);
    let int2 = p.ast.new_builtin(BuiltInKind::Int);
    let int3 = p.ast.new_builtin(BuiltInKind::Int);
    let (_, i1) = p.add_interface(&["a"], "I1", Vec::new());
    let (_, i2) = p.add_interface(&["a"], "I2", Vec::new());
    let _ = p.add_method(
        TypeDecl::Interface(i1),
        "h",
        public().with(ModifierFlags::ABSTRACT),
        Some(int1),
        Vec::new(),
        scope,
    );
    let _ = p.add_method(
        TypeDecl::Interface(i2),
        "h",
        public().with(ModifierFlags::ABSTRACT),
        Some(int2),
        Vec::new(),
        scope,
    );
    let ref_i1 = p.unresolved(&["I1"]);
    let ref_i2 = p.unresolved(&["I2"]);
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    p.ast.class_mut(class).interfaces = vec![ref_i1, ref_i2];
    let _ = p.add_method(TypeDecl::Class(class), "h", public(), Some(int3), Vec::new(), scope);

    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "diamond is accepted: {:?}", codes(&sema.diag));
    let closure = sema.hierarchy.inherited_methods(TypeDecl::Class(class));
    let h_entries =
        closure.iter().filter(|&&m| p.ast.method(m).name == "h").count();
    assert_eq!(h_entries, 1, "exactly one closure entry for the signature");
}

#[test]
fn test_cyclic_inheritance_is_reported_and_terminates() {
    let mut p = Program::new();
    let _object = p.add_object();
    let _ = p.add_class(&["a"], "A", Modifiers::new(), Some(&["B"]));
    let _ = p.add_class(&["a"], "B", Modifiers::new(), Some(&["A"]));
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"cyclic-inheritance"));
}

#[test]
fn test_class_must_not_extend_final_class() {
    let mut p = Program::new();
    let _object = p.add_object();
    let _ = p.add_class(&["a"], "Sealed", public().with(ModifierFlags::FINAL), None);
    let _ = p.add_class(&["a"], "Sub", Modifiers::new(), Some(&["Sealed"]));
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"class-extends-final"));
}

#[test]
fn test_class_must_not_extend_interface() {
    let mut p = Program::new();
    let _object = p.add_object();
    let _ = p.add_interface(&["a"], "I", Vec::new());
    let _ = p.add_class(&["a"], "C", Modifiers::new(), Some(&["I"]));
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"class-extends-interface"));
}

#[test]
fn test_duplicate_method_signature_in_one_class() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let scope = p.ast.scopes.new_scope(None);
    let int1 = p.ast.new_builtin(BuiltInKind::Int);
    let int2 = p.ast.new_builtin(BuiltInKind::Int);
    let _ = p.add_method(TypeDecl::Class(class), "m", public(), None, vec![int1], scope);
    let _ = p.add_method(TypeDecl::Class(class), "m", public(), None, vec![int2], scope);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"duplicate-method-signature"));
}

#[test]
fn test_static_override_mismatch() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "D", Modifiers::new(), Some(&["C"]));
    let scope = p.ast.scopes.new_scope(None);
    let _ = p.add_method(
        TypeDecl::Class(base),
        "g",
        public().with(ModifierFlags::STATIC),
        None,
        Vec::new(),
        scope,
    );
    let _ = p.add_method(TypeDecl::Class(derived), "g", public(), None, Vec::new(), scope);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"bad-override-static"));
}

#[test]
fn test_subtype_queries() {
    let mut p = Program::new();
    let object = p.add_object();
    let (_, base) = p.add_class(&["a"], "Base", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "Derived", Modifiers::new(), Some(&["Base"]));
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    assert!(sema.hierarchy.is_super_class(base, derived));
    assert!(sema.hierarchy.is_super_class(object, derived), "Object tops the hierarchy");
    assert!(!sema.hierarchy.is_super_class(derived, base));
    assert!(sema.hierarchy.is_subtype(TypeDecl::Class(derived), TypeDecl::Class(base)));
    assert!(sema.hierarchy.is_subtype(TypeDecl::Class(base), TypeDecl::Class(base)));
}

#[test]
fn test_inherited_members_in_order() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "Base", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "Derived", Modifiers::new(), Some(&["Base"]));
    let int1 = p.ast.new_builtin(BuiltInKind::Int);
    let int2 = p.ast.new_builtin(BuiltInKind::Int);
    let inherited = p.ast.new_field(
        public(),
        int1,
        "x",
        None,
        jcc_source::types::SourceRange::synthetic(),
    );
    p.ast.class_add_field(base, inherited);
    let own = p.ast.new_field(
        public(),
        int2,
        "y",
        None,
        jcc_source::types::SourceRange::synthetic(),
    );
    p.ast.class_add_field(derived, own);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    // Inherited fields come first, own fields after.
    assert_eq!(
        sema.hierarchy.inherited_members_in_order(TypeDecl::Class(derived)),
        &[inherited, own]
    );
}

#[test]
fn test_type_reference_equality_after_resolution() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "Base", Modifiers::new(), None);
    let slot_a = p.unresolved(&["Base"]);
    let slot_b = p.unresolved(&["Base"]);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors());
    // Resolve both slots by hand through the arena, as the resolver does.
    p.ast.resolve_type(slot_a, TypeDecl::Class(base));
    p.ast.resolve_type(slot_b, TypeDecl::Class(base));
    assert!(p.ast.types_equal(slot_a, slot_b));
    assert!(matches!(p.ast.ty(slot_a), Type::Reference(_)));
}
