//! The AST arena.
//!
//! [`Ast`] owns every AST entity in typed vectors and hands out index
//! handles. Nodes are never freed individually; passes mutate slots in
//! place (type resolution, expression annotation) through the checked
//! helpers here.

use jcc_source::types::SourceRange;

use crate::decl::{ClassDecl, CompilationUnit, FieldDecl, ImportDecl, InterfaceDecl, MethodDecl, VarDecl};
use crate::expr::{Expr, ExprNode, ExprNodeKind, LiteralValue};
use crate::ids::{ClassId, DeclRef, ExprId, ExprNodeId, FieldId, InterfaceId, MethodId, ScopeId, StmtId, TypeDecl, TypeId, UnitId, VarId};
use crate::modifiers::Modifiers;
use crate::scope::ScopeTree;
use crate::stmt::{Stmt, StmtKind};
use crate::ty::{BuiltInKind, Type};

/// The arena owning every AST entity of a program.
#[derive(Debug, Default)]
pub struct Ast {
    units: Vec<CompilationUnit>,
    classes: Vec<ClassDecl>,
    interfaces: Vec<InterfaceDecl>,
    methods: Vec<MethodDecl>,
    fields: Vec<FieldDecl>,
    vars: Vec<VarDecl>,
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    expr_nodes: Vec<ExprNode>,
    types: Vec<Type>,
    /// The lexical scope tree shared by all units
    pub scopes: ScopeTree,
}

impl Ast {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    // ===-- Accessors --------------------------------------------------=== //

    #[must_use]
    pub fn unit(&self, id: UnitId) -> &CompilationUnit { &self.units[id.index()] }

    #[must_use]
    pub fn class(&self, id: ClassId) -> &ClassDecl { &self.classes[id.index()] }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDecl { &mut self.classes[id.index()] }

    #[must_use]
    pub fn interface(&self, id: InterfaceId) -> &InterfaceDecl { &self.interfaces[id.index()] }

    pub fn interface_mut(&mut self, id: InterfaceId) -> &mut InterfaceDecl {
        &mut self.interfaces[id.index()]
    }

    #[must_use]
    pub fn method(&self, id: MethodId) -> &MethodDecl { &self.methods[id.index()] }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodDecl { &mut self.methods[id.index()] }

    #[must_use]
    pub fn field(&self, id: FieldId) -> &FieldDecl { &self.fields[id.index()] }

    #[must_use]
    pub fn var(&self, id: VarId) -> &VarDecl { &self.vars[id.index()] }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt { &self.stmts[id.index()] }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr { &self.exprs[id.index()] }

    #[must_use]
    pub fn expr_node(&self, id: ExprNodeId) -> &ExprNode { &self.expr_nodes[id.index()] }

    #[must_use]
    pub fn ty(&self, id: TypeId) -> &Type { &self.types[id.index()] }

    /// Iterates over all compilation units in creation order.
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        (0..self.units.len()).map(|i| UnitId::new(i as u32))
    }

    // ===-- Declaration construction -----------------------------------=== //

    /// Creates a compilation unit. The package is an unresolved type holding
    /// the dotted package parts (possibly none, for the default package).
    pub fn new_unit(
        &mut self,
        package_parts: Vec<String>,
        imports: Vec<ImportDecl>,
        range: SourceRange,
    ) -> UnitId {
        let package = self.new_type(Type::unresolved(package_parts));
        let id = UnitId::new(self.units.len() as u32);
        self.units.push(CompilationUnit { package, imports, body: None, range });
        id
    }

    /// Creates a class declaration. The implicit `java.lang.Object` super
    /// reference is allocated here; the user-written one is passed in.
    pub fn new_class(
        &mut self,
        modifiers: Modifiers,
        name: impl Into<String>,
        super_class: Option<TypeId>,
        interfaces: Vec<TypeId>,
        range: SourceRange,
    ) -> ClassId {
        let object_super = self.new_object_reference();
        let id = ClassId::new(self.classes.len() as u32);
        let name = name.into();
        self.classes.push(ClassDecl {
            modifiers,
            canonical_name: name.clone(),
            name,
            super_class,
            object_super: Some(object_super),
            interfaces,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            range,
        });
        id
    }

    /// Creates an interface declaration, with the implicit `Object` parent
    /// used by the override checks.
    pub fn new_interface(
        &mut self,
        modifiers: Modifiers,
        name: impl Into<String>,
        extends: Vec<TypeId>,
        range: SourceRange,
    ) -> InterfaceId {
        let object_super = self.new_object_reference();
        let id = InterfaceId::new(self.interfaces.len() as u32);
        let name = name.into();
        self.interfaces.push(InterfaceDecl {
            modifiers,
            canonical_name: name.clone(),
            name,
            extends,
            methods: Vec::new(),
            object_super: Some(object_super),
            range,
        });
        id
    }

    /// Creates a method or constructor declaration.
    pub fn new_method(
        &mut self,
        modifiers: Modifiers,
        name: impl Into<String>,
        return_ty: Option<TypeId>,
        params: Vec<VarId>,
        is_constructor: bool,
        body: Option<StmtId>,
        range: SourceRange,
    ) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        let name = name.into();
        self.methods.push(MethodDecl {
            modifiers,
            canonical_name: name.clone(),
            name,
            return_ty,
            params,
            locals: Vec::new(),
            body,
            is_constructor,
            parent: None,
            range,
        });
        id
    }

    /// Creates a field declaration.
    pub fn new_field(
        &mut self,
        modifiers: Modifiers,
        ty: TypeId,
        name: impl Into<String>,
        init: Option<ExprId>,
        range: SourceRange,
    ) -> FieldId {
        let id = FieldId::new(self.fields.len() as u32);
        self.fields.push(FieldDecl { modifiers, ty, name: name.into(), init, parent: None, range });
        id
    }

    /// Creates a local variable or parameter declaration.
    pub fn new_var(
        &mut self,
        ty: TypeId,
        name: impl Into<String>,
        init: Option<ExprId>,
        scope: ScopeId,
        range: SourceRange,
    ) -> VarId {
        let id = VarId::new(self.vars.len() as u32);
        self.vars.push(VarDecl { ty, name: name.into(), init, scope, range });
        id
    }

    /// Creates a statement.
    pub fn new_stmt(&mut self, kind: StmtKind, range: SourceRange) -> StmtId {
        let id = StmtId::new(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, range });
        id
    }

    // ===-- Parenting --------------------------------------------------=== //

    /// Adds a field to a class, parenting it.
    pub fn class_add_field(&mut self, class: ClassId, field: FieldId) {
        self.fields[field.index()].parent = Some(class);
        self.classes[class.index()].fields.push(field);
    }

    /// Adds a method (or constructor) to a class, parenting it and
    /// qualifying its canonical name.
    pub fn class_add_method(&mut self, class: ClassId, method: MethodId) {
        self.methods[method.index()].parent = Some(TypeDecl::Class(class));
        self.methods[method.index()].canonical_name = format!(
            "{}.{}",
            self.classes[class.index()].canonical_name,
            self.methods[method.index()].name
        );
        let is_constructor = self.methods[method.index()].is_constructor;
        let decl = &mut self.classes[class.index()];
        if is_constructor {
            decl.constructors.push(method);
        } else {
            decl.methods.push(method);
        }
    }

    /// Adds a method to an interface, parenting it and qualifying its
    /// canonical name.
    pub fn interface_add_method(&mut self, interface: InterfaceId, method: MethodId) {
        self.methods[method.index()].parent = Some(TypeDecl::Interface(interface));
        self.methods[method.index()].canonical_name = format!(
            "{}.{}",
            self.interfaces[interface.index()].canonical_name,
            self.methods[method.index()].name
        );
        self.interfaces[interface.index()].methods.push(method);
    }

    /// Records a local variable on its enclosing method.
    pub fn method_add_local(&mut self, method: MethodId, var: VarId) {
        self.methods[method.index()].locals.push(var);
    }

    /// Parents the top-level declaration into its compilation unit.
    ///
    /// Canonical names are assigned here: the declaration's name is
    /// qualified with the unit's package, and every member's canonical name
    /// is qualified with the declaration's.
    pub fn set_unit_body(&mut self, unit: UnitId, body: TypeDecl) {
        let prefix = {
            let parts = self.package_parts(unit);
            if parts.is_empty() { String::new() } else { format!("{}.", parts.join(".")) }
        };
        self.units[unit.index()].body = Some(body);
        let canonical = match body {
            TypeDecl::Class(id) => {
                let decl = &mut self.classes[id.index()];
                decl.canonical_name = format!("{prefix}{}", decl.name);
                decl.canonical_name.clone()
            }
            TypeDecl::Interface(id) => {
                let decl = &mut self.interfaces[id.index()];
                decl.canonical_name = format!("{prefix}{}", decl.name);
                decl.canonical_name.clone()
            }
        };
        let members: Vec<MethodId> = self.type_decl_methods(body).collect();
        for method in members {
            let decl = &mut self.methods[method.index()];
            decl.canonical_name = format!("{canonical}.{}", decl.name);
        }
    }

    /// Returns the dotted package parts of a unit.
    ///
    /// ## Panics
    ///
    /// Panics if the unit's package slot is not an unresolved type; package
    /// references are never resolved to declarations.
    #[must_use]
    pub fn package_parts(&self, unit: UnitId) -> &[String] {
        match self.ty(self.units[unit.index()].package) {
            Type::Unresolved { parts, .. } => parts,
            _ => panic!("package reference must stay unresolved"),
        }
    }

    /// True iff the unit's package starts with `java`.
    #[must_use]
    pub fn unit_is_std_lib(&self, unit: UnitId) -> bool {
        self.package_parts(unit).first().is_some_and(|part| part == "java")
    }

    // ===-- Declaration queries ---------------------------------------=== //

    /// The simple name of a class or interface.
    #[must_use]
    pub fn type_decl_name(&self, decl: TypeDecl) -> &str {
        match decl {
            TypeDecl::Class(id) => &self.class(id).name,
            TypeDecl::Interface(id) => &self.interface(id).name,
        }
    }

    /// The canonical (package-qualified) name of a class or interface.
    #[must_use]
    pub fn type_decl_canonical_name(&self, decl: TypeDecl) -> &str {
        match decl {
            TypeDecl::Class(id) => &self.class(id).canonical_name,
            TypeDecl::Interface(id) => &self.interface(id).canonical_name,
        }
    }

    /// The modifiers of a class or interface.
    #[must_use]
    pub fn type_decl_modifiers(&self, decl: TypeDecl) -> &Modifiers {
        match decl {
            TypeDecl::Class(id) => &self.class(id).modifiers,
            TypeDecl::Interface(id) => &self.interface(id).modifiers,
        }
    }

    /// The source range of a class or interface.
    #[must_use]
    pub fn type_decl_range(&self, decl: TypeDecl) -> SourceRange {
        match decl {
            TypeDecl::Class(id) => self.class(id).range,
            TypeDecl::Interface(id) => self.interface(id).range,
        }
    }

    /// The declared (non-constructor) methods of a class or interface.
    pub fn type_decl_methods(&self, decl: TypeDecl) -> impl Iterator<Item = MethodId> + '_ {
        let methods = match decl {
            TypeDecl::Class(id) => &self.class(id).methods,
            TypeDecl::Interface(id) => &self.interface(id).methods,
        };
        methods.iter().copied()
    }

    // ===-- Types ------------------------------------------------------=== //

    /// Allocates a type slot.
    pub fn new_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Allocates a built-in type slot.
    pub fn new_builtin(&mut self, kind: BuiltInKind) -> TypeId {
        self.new_type(Type::BuiltIn(kind))
    }

    /// Allocates an unresolved `java.lang.Object` reference.
    fn new_object_reference(&mut self) -> TypeId {
        self.new_type(Type::unresolved(vec![
            "java".to_string(),
            "lang".to_string(),
            "Object".to_string(),
        ]))
    }

    /// Overwrites an unresolved slot with its resolved declaration.
    ///
    /// ## Panics
    ///
    /// Panics if the slot is already resolved or was invalidated.
    pub fn resolve_type(&mut self, id: TypeId, decl: TypeDecl) {
        match &self.types[id.index()] {
            Type::Unresolved { valid, .. } => {
                assert!(*valid, "attempted to resolve an invalidated type");
            }
            _ => panic!("type already resolved"),
        }
        self.types[id.index()] = Type::Reference(decl);
    }

    /// Marks an unresolved slot as permanently unresolvable.
    pub fn invalidate_type(&mut self, id: TypeId) {
        if let Type::Unresolved { valid, .. } = &mut self.types[id.index()] {
            *valid = false;
        }
    }

    /// Marks an unresolved type immutable so its parts can be borrowed.
    pub fn lock_type(&mut self, id: TypeId) {
        if let Type::Unresolved { locked, .. } = &mut self.types[id.index()] {
            *locked = true;
        }
    }

    /// Whether a type (recursively, through arrays) is resolved.
    #[must_use]
    pub fn type_is_resolved(&self, id: TypeId) -> bool {
        match self.ty(id) {
            Type::Unresolved { .. } => false,
            Type::Array(elem) => self.type_is_resolved(*elem),
            Type::BuiltIn(_) | Type::Reference(_) | Type::Method { .. } => true,
        }
    }

    /// Structural type equality as the language defines it.
    ///
    /// Built-ins compare by kind, resolved references by declaration
    /// identity, arrays by element type, method types by return and all
    /// parameters. Unresolved types never compare equal to anything.
    #[must_use]
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            // Same slot: equal unless it is still unresolved.
            return self.type_is_resolved(a);
        }
        match (self.ty(a), self.ty(b)) {
            (Type::BuiltIn(ka), Type::BuiltIn(kb)) => ka == kb,
            (Type::Reference(da), Type::Reference(db)) => da == db,
            (Type::Array(ea), Type::Array(eb)) => self.types_equal(*ea, *eb),
            (Type::Method { ret: ra, params: pa }, Type::Method { ret: rb, params: pb }) => {
                let rets_equal = match (ra, rb) {
                    (None, None) => true,
                    (Some(x), Some(y)) => self.types_equal(*x, *y),
                    _ => false,
                };
                rets_equal
                    && pa.len() == pb.len()
                    && pa.iter().zip(pb).all(|(x, y)| self.types_equal(*x, *y))
            }
            _ => false,
        }
    }

    /// Renders a type for diagnostics.
    #[must_use]
    pub fn type_to_string(&self, id: TypeId) -> String {
        match self.ty(id) {
            Type::BuiltIn(kind) => kind.to_string(),
            Type::Unresolved { parts, .. } => parts.join("."),
            Type::Reference(decl) => self.type_decl_canonical_name(*decl).to_string(),
            Type::Array(elem) => format!("{}[]", self.type_to_string(*elem)),
            Type::Method { ret, params } => {
                let params: Vec<String> =
                    params.iter().map(|p| self.type_to_string(*p)).collect();
                let ret = ret.map_or_else(|| "void".to_string(), |r| self.type_to_string(r));
                format!("({}) -> {ret}", params.join(", "))
            }
        }
    }

    // ===-- Expressions ------------------------------------------------=== //

    /// Creates an empty postfix expression in the given scope.
    pub fn new_expr(&mut self, scope: ScopeId, range: SourceRange) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(Expr { head: None, tail: None, size: 0, scope, range });
        id
    }

    /// Allocates an expression node without linking it into any list.
    pub fn new_expr_node(&mut self, kind: ExprNodeKind, range: SourceRange) -> ExprNodeId {
        let id = ExprNodeId::new(self.expr_nodes.len() as u32);
        let ty = match &kind {
            // Literal nodes know their type at construction.
            ExprNodeKind::Literal { value } => {
                let kind = match value {
                    LiteralValue::Int(_) => BuiltInKind::Int,
                    LiteralValue::String(_) => BuiltInKind::String,
                    LiteralValue::Bool(_) => BuiltInKind::Boolean,
                    LiteralValue::Null => BuiltInKind::None,
                };
                Some(self.new_builtin(kind))
            }
            _ => None,
        };
        self.expr_nodes.push(ExprNode { kind, range, next: None, locked: false, decl: None, ty });
        id
    }

    /// Pushes a node to the back of an expression list.
    ///
    /// ## Panics
    ///
    /// Panics if the previous tail node is locked by an evaluator.
    pub fn expr_push(&mut self, expr: ExprId, node: ExprNodeId) {
        self.expr_nodes[node.index()].next = None;
        let list = &mut self.exprs[expr.index()];
        match list.tail {
            None => {
                list.head = Some(node);
                list.tail = Some(node);
            }
            Some(tail) => {
                list.tail = Some(node);
                let tail = &mut self.expr_nodes[tail.index()];
                assert!(!tail.locked, "attempt to mutate locked node");
                tail.next = Some(node);
            }
        }
        self.exprs[expr.index()].size += 1;
    }

    /// Concatenates `other` to the end of `expr`, leaving `other` empty.
    pub fn expr_concat(&mut self, expr: ExprId, other: ExprId) {
        let (other_head, other_tail, other_size) = {
            let o = &mut self.exprs[other.index()];
            let parts = (o.head, o.tail, o.size);
            o.head = None;
            o.tail = None;
            o.size = 0;
            parts
        };
        if other_size == 0 {
            return;
        }
        match self.exprs[expr.index()].tail {
            None => self.exprs[expr.index()].head = other_head,
            Some(tail) => {
                let tail = &mut self.expr_nodes[tail.index()];
                assert!(!tail.locked, "attempt to mutate locked node");
                tail.next = other_head;
            }
        }
        let list = &mut self.exprs[expr.index()];
        list.tail = other_tail;
        list.size += other_size;
    }

    /// Collects the node handles of an expression in list order.
    #[must_use]
    pub fn expr_node_ids(&self, expr: ExprId) -> Vec<ExprNodeId> {
        let list = self.expr(expr);
        let mut out = Vec::with_capacity(list.size);
        let mut cur = list.head;
        for _ in 0..list.size {
            let id = cur.expect("expression list shorter than its recorded size");
            out.push(id);
            cur = self.expr_node(id).next;
        }
        out
    }

    /// Locks an expression node against re-entrant evaluation.
    ///
    /// Returns false if the node was already locked.
    pub fn try_lock_expr_node(&mut self, id: ExprNodeId) -> bool {
        let node = &mut self.expr_nodes[id.index()];
        if node.locked {
            return false;
        }
        node.locked = true;
        true
    }

    /// Unlocks an expression node.
    pub fn unlock_expr_node(&mut self, id: ExprNodeId) {
        self.expr_nodes[id.index()].locked = false;
    }

    /// Attaches the resolved declaration and type to a value node.
    ///
    /// ## Panics
    ///
    /// Panics if either was already attached, or if the type is unresolved.
    pub fn resolve_expr_value(&mut self, id: ExprNodeId, decl: Option<DeclRef>, ty: Option<TypeId>) {
        if let Some(ty) = ty {
            assert!(self.type_is_resolved(ty), "attaching an unresolved type to a value node");
        }
        let node = &mut self.expr_nodes[id.index()];
        assert!(node.decl.is_none(), "tried to resolve expression decl twice");
        assert!(node.ty.is_none(), "tried to resolve expression type twice");
        node.decl = decl;
        node.ty = ty;
    }

    /// Replaces the declaration attached to a value node.
    pub fn override_expr_decl(&mut self, id: ExprNodeId, decl: DeclRef) {
        self.expr_nodes[id.index()].decl = Some(decl);
    }

    /// Records the result type of an operator node (or the resolved type of
    /// a `TypeNode`). Once set, it is never re-resolved.
    ///
    /// ## Panics
    ///
    /// Panics if a result type was already recorded.
    pub fn resolve_expr_result(&mut self, id: ExprNodeId, ty: TypeId) {
        assert!(self.type_is_resolved(ty), "attaching an unresolved result type");
        let node = &mut self.expr_nodes[id.index()];
        assert!(node.ty.is_none(), "tried to resolve result type twice");
        node.ty = Some(ty);
    }

    /// Records the variable assigned by an assignment operator node.
    ///
    /// ## Panics
    ///
    /// Panics if the node is not an assignment or the variable was already
    /// recorded.
    pub fn set_var_assigned(&mut self, id: ExprNodeId, var: VarId) {
        match &mut self.expr_nodes[id.index()].kind {
            ExprNodeKind::BinaryOp { op: crate::expr::BinaryOpKind::Assignment, var_assigned } => {
                assert!(var_assigned.is_none(), "tried to set assigned variable twice");
                *var_assigned = Some(var);
            }
            _ => panic!("not an assignment operator node"),
        }
    }

    /// Replaces an expression's node list with the given sequence.
    ///
    /// The expression resolver reduces qualified names (dropping package and
    /// type prefix nodes) and writes the surviving sequence back with this.
    ///
    /// ## Panics
    ///
    /// Panics if any node in the sequence is still locked by an evaluator.
    pub fn rebuild_expr_list(&mut self, expr: ExprId, nodes: &[ExprNodeId]) {
        for pair in nodes.windows(2) {
            let node = &mut self.expr_nodes[pair[0].index()];
            assert!(!node.locked, "attempt to mutate locked node");
            node.next = Some(pair[1]);
        }
        if let Some(&last) = nodes.last() {
            self.expr_nodes[last.index()].next = None;
        }
        let list = &mut self.exprs[expr.index()];
        list.head = nodes.first().copied();
        list.tail = nodes.last().copied();
        list.size = nodes.len();
    }
}
