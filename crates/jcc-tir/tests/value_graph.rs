//! Tests for the use/operand graph invariants.

use jcc_tir::module::Module;
use jcc_tir::types::Context;
use jcc_tir::value::{BinOp, Use, ValueId};

fn new_module() -> Module { Module::new(Context::new(64)) }

/// Checks that for every value v, the multiset `{(u, i) : u.operands[i] == v}`
/// equals `v.uses`.
fn check_use_lists(module: &Module, values: &[ValueId]) {
    for &v in values {
        let mut expected: Vec<Use> = Vec::new();
        for &u in values {
            for (i, &op) in module.value(u).operands().iter().enumerate() {
                if op == v {
                    expected.push(Use { user: u, index: i as u32 });
                }
            }
        }
        let mut actual: Vec<Use> = module.value(v).uses().to_vec();
        let key = |u: &Use| (u.user, u.index);
        expected.sort_by_key(key);
        actual.sort_by_key(key);
        assert_eq!(expected, actual, "use list out of sync for {v}");
    }
}

#[test]
fn test_operand_edges_are_mirrored() {
    let mut module = new_module();
    let a = module.const_i32(1);
    let b = module.const_i32(2);
    let add = module.new_binary(BinOp::Add, a, b);
    let add2 = module.new_binary(BinOp::Add, add, a);
    check_use_lists(&module, &[a, b, add, add2]);
    assert_eq!(module.value(a).uses().len(), 2);
    assert_eq!(module.value(add).uses().len(), 1);
}

#[test]
fn test_replace_all_uses_with_preserves_cardinality() {
    let mut module = new_module();
    let a = module.const_i32(1);
    let b = module.const_i32(2);
    let c = module.const_i32(3);
    let add1 = module.new_binary(BinOp::Add, a, b);
    let add2 = module.new_binary(BinOp::Add, a, a);
    let total_before =
        module.value(a).uses().len() + module.value(c).uses().len();

    module.replace_all_uses_with(a, c);
    assert!(module.value(a).uses().is_empty(), "old value ends with no uses");
    assert_eq!(module.value(c).uses().len(), total_before, "every use transferred");
    // Indices are preserved.
    assert_eq!(module.value(add1).operands(), &[c, b]);
    assert_eq!(module.value(add2).operands(), &[c, c]);
    check_use_lists(&module, &[a, b, c, add1, add2]);
}

#[test]
fn test_replace_operand_keeps_both_sides_consistent() {
    let mut module = new_module();
    let a = module.const_i32(1);
    let b = module.const_i32(2);
    let c = module.const_i32(3);
    let add = module.new_binary(BinOp::Add, a, b);
    module.replace_operand(add, 1, c);
    assert_eq!(module.value(add).operands(), &[a, c]);
    assert!(module.value(b).uses().is_empty());
    check_use_lists(&module, &[a, b, c, add]);
}

#[test]
fn test_remove_operand_renumbers_later_uses() {
    let mut module = new_module();
    let f_ty = {
        let void = module.ctx.void_ty();
        module.ctx.function_ty(void, vec![])
    };
    let callee = module.create_function("callee", f_ty);
    let a = module.const_i32(1);
    let b = module.const_i32(2);
    let call = module.new_call(callee, &[a, b]);
    // Remove the first argument; b shifts from index 2 to index 1.
    module.remove_operand(call, 1);
    assert_eq!(module.value(call).operands(), &[callee, b]);
    assert_eq!(module.value(b).uses(), &[Use { user: call, index: 1 }]);
    check_use_lists(&module, &[callee, a, b, call]);
}

#[test]
fn test_type_deduplication() {
    let mut ctx = Context::new(64);
    assert_eq!(ctx.i32_ty(), ctx.i32_ty());
    assert_eq!(ctx.integer_ty(8), ctx.i8_ty());
    assert_ne!(ctx.i32_ty(), ctx.i16_ty());

    let i32_ty = ctx.i32_ty();
    let f1 = ctx.function_ty(i32_ty, vec![i32_ty]);
    let f2 = ctx.function_ty(i32_ty, vec![i32_ty]);
    assert_eq!(f1, f2);
    let void = ctx.void_ty();
    let f3 = ctx.function_ty(void, vec![i32_ty]);
    assert_ne!(f1, f3);

    let a1 = ctx.array_ty(i32_ty, 4);
    let a2 = ctx.array_ty(i32_ty, 4);
    let a3 = ctx.array_ty(i32_ty, 0);
    assert_eq!(a1, a2);
    assert_ne!(a1, a3);

    let s1 = ctx.struct_ty(vec![i32_ty, i32_ty]);
    let s2 = ctx.struct_ty(vec![i32_ty, i32_ty]);
    assert_eq!(s1, s2);
    assert_eq!(ctx.size_in_bits(s1), 64);
    assert_eq!(ctx.struct_offset_bits(s1, 1), 32);
}

#[test]
fn test_null_pointer_is_a_singleton() {
    let module = new_module();
    assert_eq!(module.null_pointer(), module.null_pointer());
}
