//! TIR types and their uniquing context.
//!
//! Types are immutable once created and deduplicated within a [`Context`]:
//! requesting the same shape twice returns the same [`TyId`], so handle
//! equality is type equality.

use std::fmt;

/// Handle to a uniqued type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TyId(u32);

impl TyId {
    #[must_use]
    const fn index(self) -> usize { self.0 as usize }
}

/// The type shapes of the TIR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TirType {
    Void,
    Label,
    /// The opaque pointer type; its size comes from the target
    Pointer,
    /// An integer of the given bit width
    Integer(u32),
    Function {
        ret: TyId,
        params: Vec<TyId>,
    },
    /// `len == 0` means unbounded
    Array {
        elem: TyId,
        len: u32,
    },
    /// Element order is significant; every element must be size-bounded
    Struct {
        elems: Vec<TyId>,
    },
}

/// The type pool plus the value-ID counter shared by a whole module.
#[derive(Debug)]
pub struct Context {
    types: Vec<TirType>,
    void: TyId,
    label: TyId,
    pointer: TyId,
    value_counter: u32,
    pointer_size_bits: u32,
}

impl Context {
    /// Creates a context for a target with the given pointer width.
    #[must_use]
    pub fn new(pointer_size_bits: u32) -> Self {
        let mut ctx = Self {
            types: Vec::new(),
            void: TyId(0),
            label: TyId(0),
            pointer: TyId(0),
            value_counter: 0,
            pointer_size_bits,
        };
        ctx.void = ctx.intern(TirType::Void);
        ctx.label = ctx.intern(TirType::Label);
        ctx.pointer = ctx.intern(TirType::Pointer);
        ctx
    }

    /// Hands out the next unique value ID.
    pub fn next_value_id(&mut self) -> u32 {
        let id = self.value_counter;
        self.value_counter += 1;
        id
    }

    /// The pointer width of the target, in bits.
    #[must_use]
    pub const fn pointer_size_bits(&self) -> u32 { self.pointer_size_bits }

    #[must_use]
    pub fn ty(&self, id: TyId) -> &TirType { &self.types[id.index()] }

    #[must_use]
    pub const fn void_ty(&self) -> TyId { self.void }

    #[must_use]
    pub const fn label_ty(&self) -> TyId { self.label }

    #[must_use]
    pub const fn pointer_ty(&self) -> TyId { self.pointer }

    /// The unique integer type of the given bit width.
    pub fn integer_ty(&mut self, bits: u32) -> TyId { self.intern(TirType::Integer(bits)) }

    #[must_use]
    pub fn i1_ty(&mut self) -> TyId { self.integer_ty(1) }

    #[must_use]
    pub fn i8_ty(&mut self) -> TyId { self.integer_ty(8) }

    #[must_use]
    pub fn i16_ty(&mut self) -> TyId { self.integer_ty(16) }

    #[must_use]
    pub fn i32_ty(&mut self) -> TyId { self.integer_ty(32) }

    /// The unique function type with the given return and parameter types.
    pub fn function_ty(&mut self, ret: TyId, params: Vec<TyId>) -> TyId {
        self.intern(TirType::Function { ret, params })
    }

    /// The unique array type; `len == 0` is the unbounded array.
    pub fn array_ty(&mut self, elem: TyId, len: u32) -> TyId {
        self.intern(TirType::Array { elem, len })
    }

    /// The unique struct type over the given elements.
    ///
    /// ## Panics
    ///
    /// Panics if any element is not size-bounded.
    pub fn struct_ty(&mut self, elems: Vec<TyId>) -> TyId {
        for &elem in &elems {
            assert!(self.is_size_bounded(elem), "struct element must have a bounded size");
        }
        self.intern(TirType::Struct { elems })
    }

    fn intern(&mut self, ty: TirType) -> TyId {
        if let Some(pos) = self.types.iter().position(|t| *t == ty) {
            return TyId(pos as u32);
        }
        let id = TyId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    // ===-- Type queries ------------------------------------------------=== //

    #[must_use]
    pub fn is_integer(&self, ty: TyId) -> bool { matches!(self.ty(ty), TirType::Integer(_)) }

    #[must_use]
    pub fn is_boolean(&self, ty: TyId) -> bool { matches!(self.ty(ty), TirType::Integer(1)) }

    #[must_use]
    pub fn is_pointer(&self, ty: TyId) -> bool { ty == self.pointer }

    #[must_use]
    pub fn is_void(&self, ty: TyId) -> bool { ty == self.void }

    #[must_use]
    pub fn is_label(&self, ty: TyId) -> bool { ty == self.label }

    #[must_use]
    pub fn is_struct(&self, ty: TyId) -> bool { matches!(self.ty(ty), TirType::Struct { .. }) }

    #[must_use]
    pub fn is_array(&self, ty: TyId) -> bool { matches!(self.ty(ty), TirType::Array { .. }) }

    /// Whether the type has a statically known size.
    #[must_use]
    pub fn is_size_bounded(&self, ty: TyId) -> bool {
        match self.ty(ty) {
            TirType::Integer(_) | TirType::Pointer | TirType::Struct { .. } => true,
            TirType::Array { len, .. } => *len != 0,
            TirType::Void | TirType::Label | TirType::Function { .. } => false,
        }
    }

    /// The size of a bounded type, in bits.
    ///
    /// ## Panics
    ///
    /// Panics if the type is unbounded.
    #[must_use]
    pub fn size_in_bits(&self, ty: TyId) -> u32 {
        match self.ty(ty) {
            TirType::Integer(bits) => *bits,
            TirType::Pointer => self.pointer_size_bits,
            TirType::Array { elem, len } => {
                assert!(*len != 0, "unbounded array has no size");
                len * self.size_in_bits(*elem)
            }
            TirType::Struct { elems } => elems.iter().map(|&e| self.size_in_bits(e)).sum(),
            TirType::Void | TirType::Label | TirType::Function { .. } => {
                panic!("type does not have a size")
            }
        }
    }

    /// The return type of a function type.
    #[must_use]
    pub fn return_ty(&self, ty: TyId) -> TyId {
        match self.ty(ty) {
            TirType::Function { ret, .. } => *ret,
            _ => panic!("not a function type"),
        }
    }

    /// The parameter types of a function type.
    #[must_use]
    pub fn param_tys(&self, ty: TyId) -> Vec<TyId> {
        match self.ty(ty) {
            TirType::Function { params, .. } => params.clone(),
            _ => panic!("not a function type"),
        }
    }

    /// The element type of an array type.
    #[must_use]
    pub fn array_elem(&self, ty: TyId) -> TyId {
        match self.ty(ty) {
            TirType::Array { elem, .. } => *elem,
            _ => panic!("not an array type"),
        }
    }

    /// The bit offset of a struct element.
    #[must_use]
    pub fn struct_offset_bits(&self, ty: TyId, index: usize) -> u32 {
        match self.ty(ty) {
            TirType::Struct { elems } => {
                elems[..index].iter().map(|&e| self.size_in_bits(e)).sum()
            }
            _ => panic!("not a struct type"),
        }
    }

    /// The type of a struct element.
    #[must_use]
    pub fn struct_elem(&self, ty: TyId, index: usize) -> TyId {
        match self.ty(ty) {
            TirType::Struct { elems } => elems[index],
            _ => panic!("not a struct type"),
        }
    }

    /// Renders a type for the printer.
    #[must_use]
    pub fn ty_string(&self, ty: TyId) -> String {
        match self.ty(ty) {
            TirType::Void => "void".to_string(),
            TirType::Label => "label".to_string(),
            TirType::Pointer => "ptr".to_string(),
            TirType::Integer(bits) => format!("i{bits}"),
            TirType::Function { ret, params } => {
                let params: Vec<String> = params.iter().map(|&p| self.ty_string(p)).collect();
                format!("{} ({})", self.ty_string(*ret), params.join(", "))
            }
            TirType::Array { elem, len } => format!("[{} x {}]", len, self.ty_string(*elem)),
            TirType::Struct { elems } => {
                let elems: Vec<String> = elems.iter().map(|&e| self.ty_string(e)).collect();
                format!("{{ {} }}", elems.join(", "))
            }
        }
    }
}

impl fmt::Display for TyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ty:{}", self.0) }
}
