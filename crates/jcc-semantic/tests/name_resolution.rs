//! Tests for the package tree, import tables and type resolution.

mod common;

use common::{Program, codes};
use jcc_ast::decl::ImportDecl;
use jcc_ast::ids::TypeDecl;
use jcc_ast::modifiers::Modifiers;
use jcc_ast::ty::Type;
use jcc_semantic::package_tree::PkgChild;
use jcc_source::types::SourceRange;

#[test]
fn test_package_tree_holds_declarations() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, class) = p.add_class(&["com", "app"], "Main", Modifiers::new(), None);
    let sema = p.analyze();
    let tree = sema.resolver.package_tree();
    let pkg = tree.resolve_package_path(&["com", "app"]).expect("package exists");
    assert_eq!(tree.lookup(pkg, "Main"), Some(PkgChild::Decl(TypeDecl::Class(class))));
}

#[test]
fn test_duplicate_declaration_in_package() {
    let mut p = Program::new();
    let _object = p.add_object();
    let _ = p.add_class(&["a"], "B", Modifiers::new(), None);
    let _ = p.add_class(&["a"], "B", Modifiers::new(), None);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"duplicate-decl-in-package"));
}

#[test]
fn test_subpackage_shadowing_a_declaration() {
    let mut p = Program::new();
    let _object = p.add_object();
    let _ = p.add_class(&["a"], "B", Modifiers::new(), None);
    // The package a.B collides with the declaration a.B.
    let _ = p.add_class(&["a", "B"], "C", Modifiers::new(), None);
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"subpackage-shadows-decl"));
}

#[test]
fn test_super_reference_resolves_through_same_package() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, base) = p.add_class(&["a"], "Base", Modifiers::new(), None);
    let (_, derived) = p.add_class(&["a"], "Derived", Modifiers::new(), Some(&["Base"]));
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    let super_ty = p.ast.class(derived).super_class.expect("extends clause");
    assert_eq!(p.ast.ty(super_ty).as_decl(), Some(TypeDecl::Class(base)));
}

#[test]
fn test_single_type_import_resolves_simple_names() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, helper) = p.add_class(&["lib"], "Helper", Modifiers::new(), None);
    // class app.Main extends Helper, with `import lib.Helper;`.
    let import_ty = p.unresolved(&["lib", "Helper"]);
    let unit = p.ast.new_unit(
        vec!["app".to_string()],
        vec![ImportDecl { ty: import_ty, on_demand: false }],
        SourceRange::synthetic(),
    );
    let super_ty = p.unresolved(&["Helper"]);
    let class = p.ast.new_class(
        Modifiers::new(),
        "Main",
        Some(super_ty),
        Vec::new(),
        SourceRange::synthetic(),
    );
    p.ast.set_unit_body(unit, TypeDecl::Class(class));
    p.lu.units.push(unit);

    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    assert_eq!(p.ast.ty(super_ty).as_decl(), Some(TypeDecl::Class(helper)));
}

#[test]
fn test_on_demand_import_resolves_simple_names() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, helper) = p.add_class(&["lib"], "Helper", Modifiers::new(), None);
    let import_ty = p.unresolved(&["lib"]);
    let unit = p.ast.new_unit(
        vec!["app".to_string()],
        vec![ImportDecl { ty: import_ty, on_demand: true }],
        SourceRange::synthetic(),
    );
    let super_ty = p.unresolved(&["Helper"]);
    let class = p.ast.new_class(
        Modifiers::new(),
        "Main",
        Some(super_ty),
        Vec::new(),
        SourceRange::synthetic(),
    );
    p.ast.set_unit_body(unit, TypeDecl::Class(class));
    p.lu.units.push(unit);

    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    assert_eq!(p.ast.ty(super_ty).as_decl(), Some(TypeDecl::Class(helper)));
}

#[test]
fn test_unresolvable_type_is_reported_and_invalidated() {
    let mut p = Program::new();
    let _object = p.add_object();
    let (_, derived) = p.add_class(&["a"], "Derived", Modifiers::new(), Some(&["Missing"]));
    let sema = p.analyze();
    assert!(codes(&sema.diag).contains(&"unresolved-type"));
    let super_ty = p.ast.class(derived).super_class.unwrap();
    match p.ast.ty(super_ty) {
        Type::Unresolved { valid, .. } => assert!(!valid, "failed slot is invalidated"),
        _ => panic!("failed slot stays unresolved"),
    }
}

#[test]
fn test_object_self_reference_guard() {
    let mut p = Program::new();
    let object = p.add_object();
    let (_, other) = p.add_class(&["a"], "C", Modifiers::new(), None);
    let sema = p.analyze();
    assert!(!sema.diag.has_errors(), "clean program: {:?}", codes(&sema.diag));
    // Object itself lost its implicit super reference.
    assert!(p.ast.class(object).object_super.is_none());
    // Everyone else's resolved to Object.
    let object_super = p.ast.class(other).object_super.expect("implicit super");
    assert_eq!(p.ast.ty(object_super).as_decl(), Some(TypeDecl::Class(object)));
    assert_eq!(sema.resolver.java_lang().object, Some(object));
}

#[test]
fn test_std_lib_unit_detection() {
    let mut p = Program::new();
    let (unit, _) = p.add_class(&["java", "lang"], "Object", Modifiers::new(), None);
    let (app_unit, _) = p.add_class(&["app"], "Main", Modifiers::new(), None);
    assert!(p.ast.unit_is_std_lib(unit));
    assert!(!p.ast.unit_is_std_lib(app_unit));
}

#[test]
fn test_array_prototype_is_shared() {
    let mut p = Program::new();
    let _object = p.add_object();
    let sema = p.analyze();
    let proto = sema.resolver.array_prototype().expect("array prototype exists");
    let length = sema.resolver.array_length_field().expect("length field exists");
    assert_eq!(p.ast.field(length).parent, Some(proto));
    assert_eq!(p.ast.field(length).name, "length");
    assert!(p.ast.field(length).modifiers.is_final());
}
