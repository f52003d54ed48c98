//! Type contexts: one graph of type nodes per translation unit

use std::collections::HashMap;

use string_interner::DefaultStringInterner;
use thiserror::Error;
use tracing::trace;

use super::kind::{
    BuiltinKind, EnumId, FunctionExt, Name, Qualifiers, RecordId, TagKind, TypeClass, TypeId,
    TypeKind, VectorKind,
};
use super::layout::{TargetLayout, TypeInfo};
use super::scope::{Scope, SymbolKind};
use crate::value::ApInt;

/// Smallest alignment a record can have, in bits
const MIN_RECORD_ALIGN: u64 = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("redefinition of '{0}'")]
    Redefinition(String),

    #[error("field '{field}' of '{record}' has incomplete type")]
    IncompleteField { record: String, field: String },

    #[error("'{0}' is not a struct or union")]
    NotARecord(String),

    #[error("'{0}' is not an enum")]
    NotAnEnum(String),

    #[error("'{0}' cannot be the underlying type of an enum")]
    InvalidEnumBase(String),

    #[error("conflicting types for '{0}'")]
    ConflictingTypes(String),

    #[error("'{0}' is too large to lay out")]
    LayoutOverflow(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub kind: TypeKind,
    /// Sugar-free node equivalent to this one; a canonical node points at
    /// itself
    pub canonical: TypeId,
}

/// A laid-out record member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<Name>,
    pub ty: TypeId,
    /// Offset from the start of the record, in bits
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefinition {
    pub fields: Vec<Field>,
    pub layout: TypeInfo,
}

/// A struct, union or class declaration, complete once it has a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDecl {
    pub tag: TagKind,
    pub name: Option<Name>,
    pub definition: Option<RecordDefinition>,
}

impl RecordDecl {
    pub fn is_complete(&self) -> bool {
        self.definition.is_some()
    }

    pub fn fields(&self) -> Option<&[Field]> {
        self.definition.as_ref().map(|def| def.fields.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: Name,
    /// Value at the width of the enum's underlying type
    pub value: ApInt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub integer_type: TypeId,
    pub enumerators: Vec<Enumerator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: Option<Name>,
    pub definition: Option<EnumDefinition>,
}

impl EnumDecl {
    pub fn is_complete(&self) -> bool {
        self.definition.is_some()
    }
}

/// A named variable or parameter and its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDecl {
    pub name: Name,
    pub ty: TypeId,
}

/// Owns every type node of one translation unit.
///
/// Nodes are uniqued on insertion, so within one context two structurally
/// identical kinds always get the same [`TypeId`]. Records and enums are
/// nominal: each declaration gets its own node.
#[derive(Debug)]
pub struct TypeContext {
    name: String,
    layout: TargetLayout,
    nodes: Vec<TypeNode>,
    unique: HashMap<TypeKind, TypeId>,
    records: Vec<RecordDecl>,
    enums: Vec<EnumDecl>,
    values: Vec<ValueDecl>,
    names: DefaultStringInterner,
    scope: Scope,
}

fn align_to(offset: u64, align: u64) -> Option<u64> {
    offset.div_ceil(align.max(1)).checked_mul(align.max(1))
}

impl TypeContext {
    pub fn new(name: impl Into<String>, layout: TargetLayout) -> Self {
        Self {
            name: name.into(),
            layout,
            nodes: Vec::new(),
            unique: HashMap::new(),
            records: Vec::new(),
            enums: Vec::new(),
            values: Vec::new(),
            names: DefaultStringInterner::new(),
            scope: Scope::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &TargetLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Does `id` name a node of this context?
    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: TypeId) -> Option<&TypeNode> {
        self.nodes.get(id.index())
    }

    /// Kind of `id`.
    ///
    /// # Panics
    /// If `id` does not belong to this context.
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.nodes[id.index()].kind
    }

    /// Canonical node of `id`.
    ///
    /// # Panics
    /// If `id` does not belong to this context.
    pub fn canonical(&self, id: TypeId) -> TypeId {
        self.nodes[id.index()].canonical
    }

    pub fn canonical_kind(&self, id: TypeId) -> &TypeKind {
        self.kind(self.canonical(id))
    }

    pub fn class(&self, id: TypeId) -> TypeClass {
        self.kind(id).class()
    }

    // ==================== Node construction ====================

    /// Find or create the node for `kind`.
    ///
    /// Every child of `kind` must already belong to this context.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.unique.get(&kind) {
            return id;
        }

        let canonical = match &kind {
            TypeKind::Typedef { aliased, .. } => Some(self.canonical(*aliased)),
            TypeKind::Qualified { inner, .. } => Some(self.canonical(*inner)),
            _ => {
                let canonical_kind = kind.map_children(|child| self.canonical(child));
                if canonical_kind == kind {
                    None
                } else {
                    Some(self.intern(canonical_kind))
                }
            }
        };

        let id = TypeId(self.nodes.len() as u32);
        trace!(context = %self.name, id = id.0, kind = ?kind, "new type node");
        self.nodes.push(TypeNode {
            kind: kind.clone(),
            canonical: canonical.unwrap_or(id),
        });
        self.unique.insert(kind, id);
        id
    }

    pub fn builtin(&mut self, kind: BuiltinKind) -> TypeId {
        self.intern(TypeKind::Builtin(kind))
    }

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer { pointee })
    }

    pub fn block_pointer_to(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKind::BlockPointer { pointee })
    }

    pub fn lvalue_reference_to(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKind::LValueReference { pointee })
    }

    pub fn rvalue_reference_to(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKind::RValueReference { pointee })
    }

    pub fn member_pointer_to(&mut self, pointee: TypeId, class: TypeId) -> TypeId {
        self.intern(TypeKind::MemberPointer { pointee, class })
    }

    pub fn complex_of(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::Complex { element })
    }

    pub fn constant_array_of(&mut self, element: TypeId, size: u64) -> TypeId {
        self.intern(TypeKind::ConstantArray { element, size })
    }

    pub fn incomplete_array_of(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::IncompleteArray { element })
    }

    pub fn variable_array_of(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::VariableArray { element })
    }

    pub fn vector_of(&mut self, element: TypeId, count: u32, vector_kind: VectorKind) -> TypeId {
        self.intern(TypeKind::Vector {
            element,
            count,
            vector_kind,
        })
    }

    pub fn function_proto(
        &mut self,
        ret: TypeId,
        params: Vec<TypeId>,
        variadic: bool,
        ext: FunctionExt,
    ) -> TypeId {
        self.intern(TypeKind::FunctionProto {
            ret,
            params,
            variadic,
            ext,
        })
    }

    pub fn function_no_proto(&mut self, ret: TypeId, ext: FunctionExt) -> TypeId {
        self.intern(TypeKind::FunctionNoProto { ret, ext })
    }

    /// `inner` with extra qualifiers; nested qualifiers are merged
    pub fn qualified(&mut self, inner: TypeId, qualifiers: Qualifiers) -> TypeId {
        if qualifiers.is_empty() {
            return inner;
        }
        if let TypeKind::Qualified {
            inner: base,
            qualifiers: existing,
        } = *self.kind(inner)
        {
            return self.intern(TypeKind::Qualified {
                inner: base,
                qualifiers: existing.merge(qualifiers),
            });
        }
        self.intern(TypeKind::Qualified { inner, qualifiers })
    }

    /// A typedef node; does not bind the name
    pub fn typedef(&mut self, name: &str, aliased: TypeId) -> TypeId {
        let name = self.names.get_or_intern(name);
        self.intern(TypeKind::Typedef { name, aliased })
    }

    // ==================== Records and enums ====================

    /// Declare a new, incomplete record
    pub fn declare_record(&mut self, tag: TagKind, name: Option<&str>) -> TypeId {
        let name = name.map(|name| self.names.get_or_intern(name));
        let id = RecordId(self.records.len() as u32);
        self.records.push(RecordDecl {
            tag,
            name,
            definition: None,
        });
        self.intern(TypeKind::Record(id))
    }

    /// Give a declared record its members and compute its layout.
    ///
    /// Fields are `(name, type)` pairs in declaration order; an empty name
    /// is an unnamed member. A struct may end in an incomplete array.
    pub fn complete_record(&mut self, ty: TypeId, fields: &[(&str, TypeId)]) -> Result<(), TypeError> {
        let TypeKind::Record(record_id) = *self.canonical_kind(ty) else {
            return Err(TypeError::NotARecord(self.describe(ty)));
        };
        let decl = &self.records[record_id.0 as usize];
        if decl.is_complete() {
            return Err(TypeError::Redefinition(self.describe(ty)));
        }
        let is_union = decl.tag == TagKind::Union;

        let mut laid_out = Vec::with_capacity(fields.len());
        let mut end = 0u64;
        let mut align = MIN_RECORD_ALIGN;

        for (index, (name, field_ty)) in fields.iter().enumerate() {
            let is_last = index + 1 == fields.len();
            let info = match self.type_info(*field_ty) {
                Some(info) => info,
                None => match self.flexible_member_info(*field_ty) {
                    Some(info) if is_last && !is_union => info,
                    _ => {
                        return Err(TypeError::IncompleteField {
                            record: self.describe(ty),
                            field: (*name).to_string(),
                        });
                    }
                },
            };

            let offset = if is_union { Some(0) } else { align_to(end, info.align) };
            let Some((offset, field_end)) =
                offset.and_then(|offset| Some((offset, offset.checked_add(info.width)?)))
            else {
                return Err(TypeError::LayoutOverflow(self.describe(ty)));
            };
            end = end.max(field_end);
            align = align.max(info.align);

            let name = (!name.is_empty()).then(|| self.names.get_or_intern(*name));
            laid_out.push(Field {
                name,
                ty: *field_ty,
                offset,
            });
        }

        let Some(width) = align_to(end, align) else {
            return Err(TypeError::LayoutOverflow(self.describe(ty)));
        };
        let layout = TypeInfo::new(width, align);
        trace!(record = %self.describe(ty), width = layout.width, align = layout.align, "record laid out");
        self.records[record_id.0 as usize].definition = Some(RecordDefinition {
            fields: laid_out,
            layout,
        });
        Ok(())
    }

    /// Layout of a trailing `T[]` member: no width, the element's alignment
    fn flexible_member_info(&self, ty: TypeId) -> Option<TypeInfo> {
        match *self.canonical_kind(ty) {
            TypeKind::IncompleteArray { element } => {
                self.type_info(element).map(|info| TypeInfo::new(0, info.align))
            }
            _ => None,
        }
    }

    /// Declare a new, incomplete enum
    pub fn declare_enum(&mut self, name: Option<&str>) -> TypeId {
        let name = name.map(|name| self.names.get_or_intern(name));
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumDecl {
            name,
            definition: None,
        });
        self.intern(TypeKind::Enum(id))
    }

    /// Give a declared enum its underlying type and enumerators
    pub fn complete_enum(
        &mut self,
        ty: TypeId,
        integer_type: TypeId,
        enumerators: &[(&str, i128)],
    ) -> Result<(), TypeError> {
        let TypeKind::Enum(enum_id) = *self.canonical_kind(ty) else {
            return Err(TypeError::NotAnEnum(self.describe(ty)));
        };
        if self.enums[enum_id.0 as usize].is_complete() {
            return Err(TypeError::Redefinition(self.describe(ty)));
        }

        let base_is_integer = matches!(
            *self.canonical_kind(integer_type),
            TypeKind::Builtin(kind) if kind.is_integer()
        );
        let width = match self.type_info(integer_type) {
            Some(info) if base_is_integer => info.width as u32,
            _ => return Err(TypeError::InvalidEnumBase(self.describe(integer_type))),
        };

        let enumerators = enumerators
            .iter()
            .map(|(name, value)| Enumerator {
                name: self.names.get_or_intern(*name),
                value: ApInt::from_i128(width, *value),
            })
            .collect();
        self.enums[enum_id.0 as usize].definition = Some(EnumDefinition {
            integer_type,
            enumerators,
        });
        Ok(())
    }

    pub fn record(&self, id: RecordId) -> &RecordDecl {
        &self.records[id.0 as usize]
    }

    pub fn enum_decl(&self, id: EnumId) -> &EnumDecl {
        &self.enums[id.0 as usize]
    }

    // ==================== Layout ====================

    /// Width and alignment of `id` in bits.
    ///
    /// `None` for `void`, functions, incomplete types and kinds without a
    /// known layout.
    pub fn type_info(&self, id: TypeId) -> Option<TypeInfo> {
        let canonical = self.node(id)?.canonical;
        match &self.nodes[canonical.index()].kind {
            TypeKind::Builtin(kind) => self.layout.builtin(*kind),
            TypeKind::Complex { element } => self
                .type_info(*element)
                .and_then(|info| Some(TypeInfo::new(info.width.checked_mul(2)?, info.align))),
            TypeKind::Pointer { .. }
            | TypeKind::BlockPointer { .. }
            | TypeKind::LValueReference { .. }
            | TypeKind::RValueReference { .. }
            | TypeKind::MemberPointer { .. }
            | TypeKind::ObjCObjectPointer { .. }
            | TypeKind::Pipe { .. } => Some(self.layout.pointer),
            TypeKind::ConstantArray { element, size } => {
                let info = self.type_info(*element)?;
                Some(TypeInfo::new(info.width.checked_mul(*size)?, info.align))
            }
            TypeKind::Vector { element, count, .. } => {
                let info = self.type_info(*element)?;
                let width = info.width.checked_mul(u64::from(*count))?;
                Some(TypeInfo::new(width, width.next_power_of_two().max(info.align)))
            }
            TypeKind::Record(record) => self
                .record(*record)
                .definition
                .as_ref()
                .map(|def| def.layout),
            TypeKind::Enum(decl) => self
                .enum_decl(*decl)
                .definition
                .as_ref()
                .and_then(|def| self.type_info(def.integer_type)),
            TypeKind::Typedef { aliased: inner, .. }
            | TypeKind::Qualified { inner, .. }
            | TypeKind::Atomic { value: inner } => self.type_info(*inner),
            TypeKind::IncompleteArray { .. }
            | TypeKind::VariableArray { .. }
            | TypeKind::FunctionProto { .. }
            | TypeKind::FunctionNoProto { .. }
            | TypeKind::Auto
            | TypeKind::DeducedTemplateSpecialization
            | TypeKind::ObjCObject
            | TypeKind::ObjCInterface => None,
        }
    }

    // ==================== Names ====================

    pub fn intern_name(&mut self, name: &str) -> Name {
        self.names.get_or_intern(name)
    }

    /// Spelling of an interned name
    pub fn resolve(&self, name: Name) -> &str {
        self.names.resolve(name).unwrap_or("<unknown>")
    }

    /// Bind `name` as a typedef for `aliased`, returning the typedef node
    pub fn define_typedef(&mut self, name: &str, aliased: TypeId) -> Result<TypeId, TypeError> {
        let ty = self.typedef(name, aliased);
        let symbol = self.names.get_or_intern(name);
        match self.scope.define(symbol, SymbolKind::Typedef(ty)) {
            Ok(()) => Ok(ty),
            // Repeating an identical typedef is allowed in C11
            Err(SymbolKind::Typedef(existing))
                if self.canonical(existing) == self.canonical(ty) =>
            {
                Ok(existing)
            }
            Err(_) => Err(TypeError::Redefinition(name.to_string())),
        }
    }

    pub fn lookup_typedef(&self, name: &str) -> Option<TypeId> {
        match self.scope.lookup(self.names.get(name)?)? {
            SymbolKind::Typedef(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn define_tag(&mut self, name: &str, ty: TypeId) -> Result<(), TypeError> {
        let symbol = self.names.get_or_intern(name);
        self.scope
            .define_tag(symbol, ty)
            .map_err(|_| TypeError::Redefinition(name.to_string()))
    }

    pub fn lookup_tag(&self, name: &str) -> Option<TypeId> {
        self.scope.lookup_tag(self.names.get(name)?)
    }

    pub fn define_constant(&mut self, name: &str, value: i128, ty: TypeId) -> Result<(), TypeError> {
        let symbol = self.names.get_or_intern(name);
        self.scope
            .define(symbol, SymbolKind::EnumConstant { value, ty })
            .map_err(|_| TypeError::Redefinition(name.to_string()))
    }

    pub fn lookup_constant(&self, name: &str) -> Option<(i128, TypeId)> {
        match self.scope.lookup(self.names.get(name)?)? {
            SymbolKind::EnumConstant { value, ty } => Some((value, ty)),
            _ => None,
        }
    }

    // ==================== Declarations ====================

    /// Bind a variable or function name to its type.
    ///
    /// Redeclaring with the same type is a no-op; a declaration of
    /// `T x[N]` completes an earlier `T x[]`.
    pub fn declare_value(&mut self, name: &str, ty: TypeId) -> Result<(), TypeError> {
        let symbol = self.names.get_or_intern(name);
        match self.scope.lookup(symbol) {
            None => {
                let index = self.values.len();
                self.values.push(ValueDecl { name: symbol, ty });
                self.scope
                    .define(symbol, SymbolKind::Value(index))
                    .map_err(|_| TypeError::Redefinition(name.to_string()))
            }
            Some(SymbolKind::Value(index)) => {
                let existing = self.values[index].ty;
                if self.canonical(existing) == self.canonical(ty) {
                    Ok(())
                } else if self.completes_array(existing, ty) {
                    self.values[index].ty = ty;
                    Ok(())
                } else {
                    Err(TypeError::ConflictingTypes(name.to_string()))
                }
            }
            Some(_) => Err(TypeError::Redefinition(name.to_string())),
        }
    }

    fn completes_array(&self, existing: TypeId, new: TypeId) -> bool {
        match (self.canonical_kind(existing), self.canonical_kind(new)) {
            (
                TypeKind::IncompleteArray { element: old },
                TypeKind::ConstantArray { element, .. },
            ) => old == element,
            _ => false,
        }
    }

    pub fn lookup_value(&self, name: &str) -> Option<&ValueDecl> {
        match self.scope.lookup(self.names.get(name)?)? {
            SymbolKind::Value(index) => self.values.get(index),
            _ => None,
        }
    }

    /// Declarations in the order they were first declared
    pub fn values(&self) -> &[ValueDecl] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lp64() -> TypeContext {
        TypeContext::new("test", TargetLayout::lp64())
    }

    #[test]
    fn test_nodes_are_uniqued() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let p1 = ctx.pointer_to(int);
        let p2 = ctx.pointer_to(int);
        assert_eq!(p1, p2);
        assert_eq!(ctx.builtin(BuiltinKind::Int), int);
    }

    #[test]
    fn test_sugar_canonicalizes_through() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let my_int = ctx.typedef("my_int", int);
        let const_my_int = ctx.qualified(
            my_int,
            Qualifiers {
                is_const: true,
                ..Qualifiers::default()
            },
        );
        assert_eq!(ctx.canonical(my_int), int);
        assert_eq!(ctx.canonical(const_my_int), int);

        let sugared_ptr = ctx.pointer_to(const_my_int);
        let plain_ptr = ctx.pointer_to(int);
        assert_ne!(sugared_ptr, plain_ptr);
        assert_eq!(ctx.canonical(sugared_ptr), plain_ptr);
        assert_eq!(ctx.canonical(plain_ptr), plain_ptr);
    }

    #[test]
    fn test_qualifiers_merge() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let c = Qualifiers {
            is_const: true,
            ..Qualifiers::default()
        };
        let v = Qualifiers {
            is_volatile: true,
            ..Qualifiers::default()
        };
        let cv = ctx.qualified(int, c);
        let cv = ctx.qualified(cv, v);
        assert_eq!(
            *ctx.kind(cv),
            TypeKind::Qualified {
                inner: int,
                qualifiers: c.merge(v)
            }
        );
        assert_eq!(ctx.qualified(int, Qualifiers::default()), int);
    }

    #[test]
    fn test_struct_layout() {
        let mut ctx = lp64();
        let char_ = ctx.builtin(BuiltinKind::CharS);
        let int = ctx.builtin(BuiltinKind::Int);
        let double = ctx.builtin(BuiltinKind::Double);
        let s = ctx.declare_record(TagKind::Struct, Some("s"));
        ctx.complete_record(s, &[("c", char_), ("i", int), ("d", double)])
            .unwrap();

        let TypeKind::Record(id) = *ctx.kind(s) else {
            panic!("expected a record");
        };
        let offsets: Vec<u64> = ctx
            .record(id)
            .fields()
            .unwrap()
            .iter()
            .map(|field| field.offset)
            .collect();
        assert_eq!(offsets, vec![0, 32, 64]);
        assert_eq!(ctx.type_info(s), Some(TypeInfo::new(128, 64)));
    }

    #[test]
    fn test_m68k_struct_is_word_aligned() {
        let mut ctx = TypeContext::new("m68k", TargetLayout::m68k());
        let char_ = ctx.builtin(BuiltinKind::CharS);
        let int = ctx.builtin(BuiltinKind::Int);
        let s = ctx.declare_record(TagKind::Struct, None);
        ctx.complete_record(s, &[("c", char_), ("i", int)]).unwrap();
        assert_eq!(ctx.type_info(s), Some(TypeInfo::new(48, 16)));
    }

    #[test]
    fn test_union_layout() {
        let mut ctx = lp64();
        let char_ = ctx.builtin(BuiltinKind::CharS);
        let long = ctx.builtin(BuiltinKind::Long);
        let array = ctx.constant_array_of(char_, 12);
        let u = ctx.declare_record(TagKind::Union, Some("u"));
        ctx.complete_record(u, &[("l", long), ("bytes", array)]).unwrap();
        assert_eq!(ctx.type_info(u), Some(TypeInfo::new(128, 64)));
    }

    #[test]
    fn test_flexible_array_member() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let tail = ctx.incomplete_array_of(int);
        let s = ctx.declare_record(TagKind::Struct, Some("buf"));
        ctx.complete_record(s, &[("len", int), ("data", tail)]).unwrap();
        assert_eq!(ctx.type_info(s), Some(TypeInfo::new(32, 32)));

        let bad = ctx.declare_record(TagKind::Struct, Some("bad"));
        let err = ctx.complete_record(bad, &[("data", tail), ("len", int)]);
        assert!(matches!(err, Err(TypeError::IncompleteField { .. })));
    }

    #[test]
    fn test_record_layout_overflow() {
        let mut ctx = lp64();
        let char_ = ctx.builtin(BuiltinKind::CharS);
        let huge = ctx.constant_array_of(char_, 1 << 60);
        assert_eq!(ctx.type_info(huge), Some(TypeInfo::new(1 << 63, 8)));

        let s = ctx.declare_record(TagKind::Struct, Some("big"));
        let err = ctx.complete_record(s, &[("a", huge), ("b", huge)]);
        assert_eq!(err, Err(TypeError::LayoutOverflow("struct big".to_string())));
        assert_eq!(ctx.type_info(s), None);

        // Fits, but rounding the size up to the alignment does not
        let int = ctx.builtin(BuiltinKind::Int);
        let almost = ctx.constant_array_of(char_, (1 << 61) - 5);
        let t = ctx.declare_record(TagKind::Struct, Some("tail"));
        let err = ctx.complete_record(t, &[("i", int), ("rest", almost)]);
        assert!(matches!(err, Err(TypeError::LayoutOverflow(_))));

        let wide = ctx.constant_array_of(huge, 2);
        assert_eq!(ctx.type_info(wide), None);
    }

    #[test]
    fn test_incomplete_records() {
        let mut ctx = lp64();
        let node = ctx.declare_record(TagKind::Struct, Some("node"));
        assert_eq!(ctx.type_info(node), None);

        // A struct cannot contain itself, only a pointer to itself
        let err = ctx.complete_record(node, &[("self", node)]);
        assert!(matches!(err, Err(TypeError::IncompleteField { .. })));

        let next = ctx.pointer_to(node);
        ctx.complete_record(node, &[("next", next)]).unwrap();
        assert_eq!(ctx.type_info(node), Some(TypeInfo::new(64, 64)));

        let err = ctx.complete_record(node, &[("next", next)]);
        assert!(matches!(err, Err(TypeError::Redefinition(_))));
    }

    #[test]
    fn test_enum_definition() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let color = ctx.declare_enum(Some("color"));
        assert_eq!(ctx.type_info(color), None);

        ctx.complete_enum(color, int, &[("RED", 0), ("GREEN", -1)]).unwrap();
        assert_eq!(ctx.type_info(color), Some(TypeInfo::new(32, 32)));

        let TypeKind::Enum(id) = *ctx.kind(color) else {
            panic!("expected an enum");
        };
        let def = ctx.enum_decl(id).definition.as_ref().unwrap();
        assert_eq!(def.enumerators[1].value, ApInt::new(32, 0xFFFF_FFFF));
        assert_eq!(ctx.resolve(def.enumerators[0].name), "RED");
    }

    #[test]
    fn test_enum_base_must_be_integer() {
        let mut ctx = lp64();
        let double = ctx.builtin(BuiltinKind::Double);
        let e = ctx.declare_enum(None);
        let err = ctx.complete_enum(e, double, &[]);
        assert_eq!(err, Err(TypeError::InvalidEnumBase("double".to_string())));
    }

    #[test]
    fn test_type_info_of_derived_types() {
        let mut ctx = TypeContext::new("ilp32", TargetLayout::ilp32());
        let float = ctx.builtin(BuiltinKind::Float);
        let double = ctx.builtin(BuiltinKind::Double);
        let void = ctx.builtin(BuiltinKind::Void);

        let complex = ctx.complex_of(double);
        assert_eq!(ctx.type_info(complex), Some(TypeInfo::new(128, 32)));

        let vector = ctx.vector_of(float, 3, VectorKind::Generic);
        assert_eq!(ctx.type_info(vector), Some(TypeInfo::new(96, 128)));

        let func = ctx.function_no_proto(void, FunctionExt::default());
        let func_ptr = ctx.pointer_to(func);
        assert_eq!(ctx.type_info(func), None);
        assert_eq!(ctx.type_info(func_ptr), Some(TypeInfo::new(32, 32)));
        assert_eq!(ctx.type_info(void), None);
        assert_eq!(ctx.type_info(TypeId(9999)), None);
    }

    #[test]
    fn test_value_declarations() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let long = ctx.builtin(BuiltinKind::Long);
        let unsized_array = ctx.incomplete_array_of(int);
        let sized_array = ctx.constant_array_of(int, 4);

        ctx.declare_value("table", unsized_array).unwrap();
        ctx.declare_value("table", sized_array).unwrap();
        assert_eq!(ctx.lookup_value("table").unwrap().ty, sized_array);

        ctx.declare_value("count", int).unwrap();
        ctx.declare_value("count", int).unwrap();
        assert_eq!(
            ctx.declare_value("count", long),
            Err(TypeError::ConflictingTypes("count".to_string()))
        );
        assert_eq!(ctx.values().len(), 2);
        assert!(ctx.lookup_value("missing").is_none());
    }

    #[test]
    fn test_name_tables() {
        let mut ctx = lp64();
        let int = ctx.builtin(BuiltinKind::Int);
        let size_t = ctx.define_typedef("size_t", int).unwrap();
        assert_eq!(ctx.lookup_typedef("size_t"), Some(size_t));
        assert_eq!(ctx.define_typedef("size_t", int), Ok(size_t));

        let long = ctx.builtin(BuiltinKind::Long);
        assert!(ctx.define_typedef("size_t", long).is_err());

        ctx.define_constant("LIMIT", 10, int).unwrap();
        assert_eq!(ctx.lookup_constant("LIMIT"), Some((10, int)));
        assert!(ctx.declare_value("LIMIT", int).is_err());
        assert_eq!(ctx.lookup_typedef("LIMIT"), None);
    }
}
