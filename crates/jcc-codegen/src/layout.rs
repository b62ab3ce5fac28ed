//! Class layouts and type mapping.

use jcc_ast::arena::Ast;
use jcc_ast::ids::{ClassId, FieldId, TypeDecl, TypeId};
use jcc_ast::ty::{BuiltInKind, Type};
use jcc_semantic::hierarchy::HierarchyChecker;
use jcc_tir::types::{Context, TyId};
use rustc_hash::FxHashMap;

/// Maps an AST type onto its TIR representation.
///
/// Booleans are `i1`, bytes `i8`, shorts and chars `i16`, ints `i32`;
/// references, strings, arrays and null are opaque pointers.
pub fn lower_type(ctx: &mut Context, ast: &Ast, ty: TypeId) -> TyId {
    match ast.ty(ty) {
        Type::BuiltIn(kind) => match kind {
            BuiltInKind::Boolean => ctx.i1_ty(),
            BuiltInKind::Byte => ctx.i8_ty(),
            BuiltInKind::Short | BuiltInKind::Char => ctx.i16_ty(),
            BuiltInKind::Int => ctx.i32_ty(),
            BuiltInKind::String | BuiltInKind::None => ctx.pointer_ty(),
        },
        Type::Reference(_) | Type::Array(_) => ctx.pointer_ty(),
        Type::Unresolved { .. } => panic!("lowering an unresolved type"),
        Type::Method { .. } => panic!("method types are not lowered directly"),
    }
}

/// Whether a widening of this AST type zero-extends (chars are unsigned;
/// every other integer type sign-extends).
#[must_use]
pub fn is_unsigned(ast: &Ast, ty: TypeId) -> bool {
    matches!(ast.ty(ty), Type::BuiltIn(BuiltInKind::Char))
}

/// The instance-field layout of every class: field order and the struct
/// type used for `getelementptr`.
#[derive(Debug, Default)]
pub struct ClassLayouts {
    /// Instance fields in layout order, per class
    fields: FxHashMap<ClassId, Vec<FieldId>>,
    /// The struct type per class
    structs: FxHashMap<ClassId, TyId>,
}

impl ClassLayouts {
    /// Computes the layout of one class: inherited instance fields first
    /// (in inheritance order), own fields last, statics excluded.
    pub fn layout_of(
        &mut self,
        ctx: &mut Context,
        ast: &Ast,
        hierarchy: &HierarchyChecker,
        class: ClassId,
    ) -> (Vec<FieldId>, TyId) {
        if let (Some(fields), Some(&struct_ty)) =
            (self.fields.get(&class), self.structs.get(&class))
        {
            return (fields.clone(), struct_ty);
        }
        let fields: Vec<FieldId> = hierarchy
            .inherited_members_in_order(TypeDecl::Class(class))
            .iter()
            .copied()
            .filter(|&f| !ast.field(f).modifiers.is_static())
            .collect();
        let elems: Vec<TyId> =
            fields.iter().map(|&f| lower_type(ctx, ast, ast.field(f).ty)).collect();
        let struct_ty = ctx.struct_ty(elems);
        let _ = self.fields.insert(class, fields.clone());
        let _ = self.structs.insert(class, struct_ty);
        (fields, struct_ty)
    }

    /// The index of a field within its class layout.
    #[must_use]
    pub fn field_index(&self, class: ClassId, field: FieldId) -> Option<usize> {
        self.fields.get(&class)?.iter().position(|&f| f == field)
    }
}
