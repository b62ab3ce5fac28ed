//! Conversion and comparison rules of the language subset.
//!
//! These are the assignability, cast-validity and operator typing rules the
//! expression evaluators share. They are pure over the AST except that
//! operator results allocate fresh built-in type slots.

use jcc_ast::arena::Ast;
use jcc_ast::expr::{BinaryOpKind, UnaryOpKind};
use jcc_ast::ids::{TypeDecl, TypeId};
use jcc_ast::ty::{BuiltInKind, Type};
use jcc_source::types::SourceRange;

use crate::error::SemanticError;
use crate::hierarchy::HierarchyChecker;
use crate::name_resolver::JavaLang;

/// Widening primitive conversion: is `to` wider than `from`?
fn is_wider_than(to: BuiltInKind, from: BuiltInKind) -> bool {
    match from {
        BuiltInKind::Char | BuiltInKind::Short => to == BuiltInKind::Int,
        BuiltInKind::Byte => to == BuiltInKind::Short || to == BuiltInKind::Int,
        _ => false,
    }
}

/// The shared rule set, parameterised over the hierarchy tables and the
/// `java.lang` cache.
#[derive(Debug, Clone, Copy)]
pub struct TypeRules<'h> {
    pub java_lang: JavaLang,
    pub hierarchy: &'h HierarchyChecker,
}

impl<'h> TypeRules<'h> {
    #[must_use]
    pub const fn new(java_lang: JavaLang, hierarchy: &'h HierarchyChecker) -> Self {
        Self { java_lang, hierarchy }
    }

    /// True for the built-in string type and for `java.lang.String`.
    #[must_use]
    pub fn is_type_string(&self, ast: &Ast, ty: TypeId) -> bool {
        match ast.ty(ty) {
            Type::BuiltIn(BuiltInKind::String) => true,
            Type::Reference(TypeDecl::Class(class)) => Some(*class) == self.java_lang.string,
            _ => false,
        }
    }

    /// True for reference types, array types and strings.
    #[must_use]
    pub fn is_reference_or_array(&self, ast: &Ast, ty: TypeId) -> bool {
        matches!(ast.ty(ty), Type::Reference(_) | Type::Array(_))
            || ast.ty(ty).is_string()
    }

    /// The class or interface declaration a member lookup on `ty` targets.
    ///
    /// Strings map to `java.lang.String`; arrays map to the shared array
    /// prototype (handled by the caller, which owns that declaration).
    #[must_use]
    pub fn decl_of(&self, ast: &Ast, ty: TypeId) -> Option<TypeDecl> {
        match ast.ty(ty) {
            Type::Reference(decl) => Some(*decl),
            Type::BuiltIn(BuiltInKind::String) => self.java_lang.string.map(TypeDecl::Class),
            _ => None,
        }
    }

    /// Assignment conversion: can a value of type `rhs` be assigned to a
    /// slot of type `lhs`?
    ///
    /// Identity, widening primitive conversion, null-to-reference, widening
    /// reference conversion (super classes, implemented interfaces, the
    /// array-to-`Object`/`Cloneable`/`Serializable` conversions), and array
    /// covariance restricted to reference element types.
    #[must_use]
    pub fn is_assignable_to(&self, ast: &Ast, lhs: TypeId, rhs: TypeId) -> bool {
        if ast.types_equal(lhs, rhs) {
            return true;
        }
        let lhs_ty = ast.ty(lhs);
        let rhs_ty = ast.ty(rhs);

        // Identity conversion between java.lang.String and the built-in
        // string type.
        if self.is_type_string(ast, lhs) && self.is_type_string(ast, rhs) {
            return true;
        }
        if rhs_ty.is_string()
            && let Type::Reference(left) = lhs_ty
        {
            return match (left, self.java_lang.string) {
                (TypeDecl::Class(left), Some(string)) => {
                    self.hierarchy.is_super_class(*left, string)
                }
                (TypeDecl::Interface(left), Some(string)) => {
                    self.hierarchy.is_super_interface(*left, TypeDecl::Class(string))
                }
                _ => false,
            };
        }
        if lhs_ty.is_string()
            && let Type::Reference(TypeDecl::Class(right)) = rhs_ty
        {
            return match self.java_lang.string {
                Some(string) => self.hierarchy.is_super_class(string, *right),
                None => false,
            };
        }

        // Widening primitive conversion.
        if let (Type::BuiltIn(to), Type::BuiltIn(from)) = (lhs_ty, rhs_ty)
            && lhs_ty.is_primitive()
            && rhs_ty.is_primitive()
        {
            return is_wider_than(*to, *from);
        }
        // Null converts to any reference, array or string type.
        if rhs_ty.is_null() {
            return self.is_reference_or_array(ast, lhs);
        }

        // Widening reference conversion.
        if let (Type::Reference(left), Type::Reference(right)) = (lhs_ty, rhs_ty) {
            return match (left, right) {
                (TypeDecl::Class(l), TypeDecl::Class(r)) => self.hierarchy.is_super_class(*l, *r),
                (TypeDecl::Interface(l), _) => self.hierarchy.is_super_interface(*l, *right),
                // A class type absorbs an interface only at Object.
                (TypeDecl::Class(l), TypeDecl::Interface(_)) => Some(*l) == self.java_lang.object,
            };
        }

        // Array conversions.
        if let Type::Array(rhs_elem) = rhs_ty {
            match lhs_ty {
                Type::Array(lhs_elem) => {
                    // Covariance holds for reference element types only.
                    let both_refs = matches!(ast.ty(*lhs_elem), Type::Reference(_))
                        && matches!(ast.ty(*rhs_elem), Type::Reference(_));
                    return both_refs && self.is_assignable_to(ast, *lhs_elem, *rhs_elem);
                }
                Type::Reference(decl) => {
                    let is_object = matches!(decl, TypeDecl::Class(c) if Some(*c) == self.java_lang.object);
                    let is_cloneable = matches!(decl, TypeDecl::Interface(i) if Some(*i) == self.java_lang.cloneable);
                    let is_serializable = matches!(decl, TypeDecl::Interface(i) if Some(*i) == self.java_lang.serializable);
                    return is_object || is_cloneable || is_serializable;
                }
                _ => return false,
            }
        }
        false
    }

    /// Cast validity: a symmetric check allowing super ↔ sub conversions
    /// and interface ↔ non-final-class conversions; array casts require
    /// element-type cast legality.
    #[must_use]
    pub fn is_valid_cast(&self, ast: &Ast, expr_ty: TypeId, cast_ty: TypeId) -> bool {
        if ast.types_equal(expr_ty, cast_ty) {
            return true;
        }
        if self.is_type_string(ast, cast_ty)
            && (self.is_type_string(ast, expr_ty) || ast.ty(expr_ty).is_null())
        {
            return true;
        }
        if self.is_assignable_to(ast, expr_ty, cast_ty)
            || self.is_assignable_to(ast, cast_ty, expr_ty)
        {
            return true;
        }
        // Null casts to any reference type and vice versa.
        if ast.ty(expr_ty).is_null() {
            return matches!(ast.ty(cast_ty), Type::Reference(_));
        }
        if ast.ty(cast_ty).is_null() {
            return matches!(ast.ty(expr_ty), Type::Reference(_));
        }
        // Primitive casts: any numeric to any numeric.
        if ast.ty(expr_ty).is_primitive() && ast.ty(cast_ty).is_primitive() {
            return ast.ty(expr_ty).is_numeric() && ast.ty(cast_ty).is_numeric();
        }
        match (ast.ty(expr_ty), ast.ty(cast_ty)) {
            (Type::Reference(expr_decl), Type::Array(_)) => {
                matches!(expr_decl, TypeDecl::Class(c) if Some(*c) == self.java_lang.object)
            }
            (Type::Reference(expr_decl), Type::Reference(cast_decl)) => {
                match (expr_decl, cast_decl) {
                    (TypeDecl::Interface(_), TypeDecl::Interface(_)) => true,
                    (TypeDecl::Interface(_), TypeDecl::Class(c)) => {
                        !ast.class(*c).modifiers.is_final()
                    }
                    (TypeDecl::Class(c), TypeDecl::Interface(_)) => {
                        !ast.class(*c).modifiers.is_final()
                    }
                    // Class-to-class casts outside the hierarchy were
                    // already rejected by the assignability checks above.
                    (TypeDecl::Class(_), TypeDecl::Class(_)) => false,
                }
            }
            (Type::Array(expr_elem), Type::Array(cast_elem)) => {
                let both_refs = matches!(ast.ty(*expr_elem), Type::Reference(_))
                    && matches!(ast.ty(*cast_elem), Type::Reference(_));
                both_refs && self.is_valid_cast(ast, *expr_elem, *cast_elem)
            }
            (Type::Array(_), Type::Reference(cast_decl)) => {
                let is_object =
                    matches!(cast_decl, TypeDecl::Class(c) if Some(*c) == self.java_lang.object);
                let is_serializable = matches!(cast_decl, TypeDecl::Interface(i) if Some(*i) == self.java_lang.serializable);
                is_object || is_serializable
            }
            _ => false,
        }
    }

    /// Types a binary operator application, or explains why it is invalid.
    ///
    /// The returned type is freshly allocated in the arena; callers record
    /// it on the operator node.
    pub fn binary_result(
        &self,
        ast: &mut Ast,
        op: BinaryOpKind,
        lhs: TypeId,
        rhs: TypeId,
        range: SourceRange,
        lhs_range: SourceRange,
        rhs_range: SourceRange,
    ) -> Result<TypeId, SemanticError> {
        let invalid = |ast: &Ast| SemanticError::InvalidBinaryOperandTypes {
            op: op.symbol(),
            lhs: ast.type_to_string(lhs),
            rhs: ast.type_to_string(rhs),
            range,
            lhs_range,
            rhs_range,
        };
        match op {
            BinaryOpKind::Assignment => {
                if self.is_assignable_to(ast, lhs, rhs) {
                    Ok(lhs)
                } else {
                    Err(SemanticError::InvalidAssignment {
                        lhs: ast.type_to_string(lhs),
                        rhs: ast.type_to_string(rhs),
                        range,
                        lhs_range,
                        rhs_range,
                    })
                }
            }
            BinaryOpKind::GreaterThan
            | BinaryOpKind::GreaterThanOrEqual
            | BinaryOpKind::LessThan
            | BinaryOpKind::LessThanOrEqual => {
                if ast.ty(lhs).is_numeric() && ast.ty(rhs).is_numeric() {
                    Ok(ast.new_builtin(BuiltInKind::Boolean))
                } else {
                    Err(invalid(ast))
                }
            }
            BinaryOpKind::Equal | BinaryOpKind::NotEqual => {
                let both_numeric = ast.ty(lhs).is_numeric() && ast.ty(rhs).is_numeric();
                let both_boolean = ast.ty(lhs).is_boolean() && ast.ty(rhs).is_boolean();
                let string_null = (self.is_type_string(ast, lhs) && ast.ty(rhs).is_null())
                    || (self.is_type_string(ast, rhs) && ast.ty(lhs).is_null());
                let lhs_refish = ast.ty(lhs).is_null() || self.is_reference_or_array(ast, lhs);
                let rhs_refish = ast.ty(rhs).is_null() || self.is_reference_or_array(ast, rhs);
                let castable = lhs_refish
                    && rhs_refish
                    && (self.is_valid_cast(ast, lhs, rhs) || self.is_valid_cast(ast, rhs, lhs));
                if both_numeric || both_boolean || string_null || castable {
                    Ok(ast.new_builtin(BuiltInKind::Boolean))
                } else {
                    Err(invalid(ast))
                }
            }
            BinaryOpKind::Add => {
                if self.is_type_string(ast, lhs) || self.is_type_string(ast, rhs) {
                    Ok(ast.new_builtin(BuiltInKind::String))
                } else if ast.ty(lhs).is_numeric() && ast.ty(rhs).is_numeric() {
                    // Arithmetic promotion always yields int.
                    Ok(ast.new_builtin(BuiltInKind::Int))
                } else {
                    Err(invalid(ast))
                }
            }
            BinaryOpKind::And
            | BinaryOpKind::Or
            | BinaryOpKind::BitwiseAnd
            | BinaryOpKind::BitwiseOr
            | BinaryOpKind::BitwiseXor => {
                if ast.ty(lhs).is_boolean() && ast.ty(rhs).is_boolean() {
                    Ok(ast.new_builtin(BuiltInKind::Boolean))
                } else {
                    Err(invalid(ast))
                }
            }
            BinaryOpKind::Subtract
            | BinaryOpKind::Multiply
            | BinaryOpKind::Divide
            | BinaryOpKind::Modulo => {
                if ast.ty(lhs).is_numeric() && ast.ty(rhs).is_numeric() {
                    Ok(ast.new_builtin(BuiltInKind::Int))
                } else {
                    Err(invalid(ast))
                }
            }
            BinaryOpKind::InstanceOf => {
                let lhs_ok = ast.ty(lhs).is_null() || self.is_reference_or_array(ast, lhs);
                let rhs_ok = self.is_reference_or_array(ast, rhs);
                if lhs_ok && rhs_ok && self.is_valid_cast(ast, rhs, lhs) {
                    Ok(ast.new_builtin(BuiltInKind::Boolean))
                } else {
                    Err(invalid(ast))
                }
            }
        }
    }

    /// Types a unary operator application.
    pub fn unary_result(
        &self,
        ast: &mut Ast,
        op: UnaryOpKind,
        operand: TypeId,
        range: SourceRange,
        operand_range: SourceRange,
    ) -> Result<TypeId, SemanticError> {
        let invalid = |ast: &Ast, op: &'static str| SemanticError::InvalidUnaryOperandType {
            op,
            operand: ast.type_to_string(operand),
            range,
            operand_range,
        };
        match op {
            UnaryOpKind::Plus | UnaryOpKind::Minus | UnaryOpKind::BitwiseNot => {
                if ast.ty(operand).is_numeric() {
                    Ok(ast.new_builtin(BuiltInKind::Int))
                } else {
                    Err(invalid(ast, match op {
                        UnaryOpKind::Plus => "+",
                        UnaryOpKind::Minus => "-",
                        _ => "~",
                    }))
                }
            }
            UnaryOpKind::Not => {
                if ast.ty(operand).is_boolean() {
                    Ok(ast.new_builtin(BuiltInKind::Boolean))
                } else {
                    Err(invalid(ast, "!"))
                }
            }
        }
    }
}
