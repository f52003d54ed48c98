//! Structural type equivalence across type contexts
//!
//! Two contexts never share nodes, so "the same type" in two translation
//! units has to be established by walking both graphs side by side. Each
//! side keeps an ordered history of the canonical nodes it has entered;
//! a pair of nodes is only comparable if both sit at the same position in
//! their history (or are both new). A pair that has been entered before
//! is assumed to match, which is what terminates recursive types.

use std::fmt;

use tracing::trace;

use crate::types::{TypeContext, TypeId, TypeKind};

/// Are `a` (in `ctx_a`) and `b` (in `ctx_b`) the same type?
///
/// Within a single context this is identity of canonical nodes; across
/// contexts it is [`match_impl`].
///
/// # Panics
/// If the walk reaches a kind the matcher has no rule for (undeduced
/// `auto`, Objective-C object types, pipes).
pub fn types_match(ctx_a: &TypeContext, a: TypeId, ctx_b: &TypeContext, b: TypeId) -> bool {
    if std::ptr::eq(ctx_a, ctx_b) {
        return ctx_a.contains(a) && ctx_a.contains(b) && ctx_a.canonical(a) == ctx_a.canonical(b);
    }
    match_impl(ctx_a, a, ctx_b, b)
}

/// Structural comparison with fresh histories, even for a single context
pub fn match_impl(ctx_a: &TypeContext, a: TypeId, ctx_b: &TypeContext, b: TypeId) -> bool {
    Matcher::new(ctx_a, ctx_b).matches(a, b)
}

/// One traversal. Histories are never popped: once a pair has been
/// entered anywhere in the walk it counts as visited.
struct Matcher<'a> {
    a: &'a TypeContext,
    b: &'a TypeContext,
    a_history: Vec<TypeId>,
    b_history: Vec<TypeId>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a TypeContext, b: &'a TypeContext) -> Self {
        Self {
            a,
            b,
            a_history: Vec::new(),
            b_history: Vec::new(),
        }
    }

    fn matches(&mut self, a: TypeId, b: TypeId) -> bool {
        let (ctx_a, ctx_b) = (self.a, self.b);

        // A handle from another context is as good as null
        if !ctx_a.contains(a) || !ctx_b.contains(b) {
            trace!(?a, ?b, "type handle outside its context");
            return false;
        }

        let a = ctx_a.canonical(a);
        let b = ctx_b.canonical(b);
        let a_kind = ctx_a.kind(a);
        let b_kind = ctx_b.kind(b);

        if a_kind.class() != b_kind.class() {
            trace!(a = %ctx_a.describe(a), b = %ctx_b.describe(b), "type classes differ");
            return false;
        }

        let a_seen = self.a_history.iter().position(|&seen| seen == a);
        let b_seen = self.b_history.iter().position(|&seen| seen == b);
        if a_seen != b_seen {
            trace!(?a_seen, ?b_seen, "recursion shapes differ");
            return false;
        }
        if a_seen.is_some() {
            return true;
        }

        self.a_history.push(a);
        self.b_history.push(b);

        self.match_kinds(a, a_kind, b, b_kind)
    }

    /// Compare two canonical nodes of the same class
    fn match_kinds(&mut self, a: TypeId, a_kind: &'a TypeKind, b: TypeId, b_kind: &'a TypeKind) -> bool {
        match a_kind {
            TypeKind::Builtin(a_builtin) => {
                let TypeKind::Builtin(b_builtin) = b_kind else {
                    return false;
                };
                self.same_layout(a, b) && a_builtin == b_builtin
            }

            TypeKind::Complex { element } => {
                let TypeKind::Complex { element: b_element } = b_kind else {
                    return false;
                };
                self.same_layout(a, b) && self.matches(*element, *b_element)
            }

            TypeKind::Pointer { pointee }
            | TypeKind::BlockPointer { pointee }
            | TypeKind::LValueReference { pointee }
            | TypeKind::RValueReference { pointee }
            | TypeKind::MemberPointer { pointee, .. } => {
                let Some(b_pointee) = pointee_of(b_kind) else {
                    return false;
                };
                self.same_layout(a, b) && self.matches(*pointee, b_pointee)
            }

            // Extents are not compared, only element types
            TypeKind::ConstantArray { element, .. }
            | TypeKind::IncompleteArray { element }
            | TypeKind::VariableArray { element } => {
                let Some(b_element) = array_element_of(b_kind) else {
                    return false;
                };
                self.matches(*element, b_element)
            }

            TypeKind::Vector {
                element,
                count,
                vector_kind,
            } => {
                let TypeKind::Vector {
                    element: b_element,
                    count: b_count,
                    vector_kind: b_vector_kind,
                } = b_kind
                else {
                    return false;
                };
                count == b_count && vector_kind == b_vector_kind && self.matches(*element, *b_element)
            }

            TypeKind::FunctionProto {
                ret,
                params,
                variadic,
                ext,
            } => {
                let TypeKind::FunctionProto {
                    ret: b_ret,
                    params: b_params,
                    variadic: b_variadic,
                    ext: b_ext,
                } = b_kind
                else {
                    return false;
                };
                if ext != b_ext || variadic != b_variadic || params.len() != b_params.len() {
                    trace!(a = %self.a.describe(a), b = %self.b.describe(b), "function signatures differ");
                    return false;
                }
                self.matches(*ret, *b_ret)
                    && params
                        .iter()
                        .zip(b_params)
                        .all(|(param, b_param)| self.matches(*param, *b_param))
            }

            TypeKind::FunctionNoProto { ret, ext } => {
                let TypeKind::FunctionNoProto {
                    ret: b_ret,
                    ext: b_ext,
                } = b_kind
                else {
                    return false;
                };
                ext == b_ext && self.matches(*ret, *b_ret)
            }

            TypeKind::Record(record) => {
                let TypeKind::Record(b_record) = b_kind else {
                    return false;
                };
                let (a_decl, b_decl) = (self.a.record(*record), self.b.record(*b_record));
                if a_decl.tag != b_decl.tag {
                    return false;
                }
                let (Some(fields), Some(b_fields)) = (a_decl.fields(), b_decl.fields()) else {
                    trace!(a = %self.a.describe(a), b = %self.b.describe(b), "incomplete record never matches");
                    return false;
                };
                if !self.same_layout(a, b) || fields.len() != b_fields.len() {
                    return false;
                }
                fields
                    .iter()
                    .zip(b_fields)
                    .all(|(field, b_field)| self.matches(field.ty, b_field.ty))
            }

            TypeKind::Enum(decl) => {
                let TypeKind::Enum(b_decl) = b_kind else {
                    return false;
                };
                let (Some(def), Some(b_def)) = (
                    self.a.enum_decl(*decl).definition.as_ref(),
                    self.b.enum_decl(*b_decl).definition.as_ref(),
                ) else {
                    trace!(a = %self.a.describe(a), b = %self.b.describe(b), "incomplete enum never matches");
                    return false;
                };
                if !self.same_layout(a, b) || !self.matches(def.integer_type, b_def.integer_type) {
                    return false;
                }
                def.enumerators.len() == b_def.enumerators.len()
                    && def
                        .enumerators
                        .iter()
                        .zip(&b_def.enumerators)
                        .all(|(e, b_e)| e.value == b_e.value)
            }

            TypeKind::Atomic { value } => {
                let TypeKind::Atomic { value: b_value } = b_kind else {
                    return false;
                };
                self.same_layout(a, b) && self.matches(*value, *b_value)
            }

            TypeKind::Typedef { .. } | TypeKind::Qualified { .. } => {
                unreachable!("{} node in canonical position", a_kind.class())
            }

            TypeKind::Auto
            | TypeKind::DeducedTemplateSpecialization
            | TypeKind::ObjCObject
            | TypeKind::ObjCInterface
            | TypeKind::ObjCObjectPointer { .. }
            | TypeKind::Pipe { .. } => {
                unreachable!("type matching does not support {} types", a_kind.class())
            }
        }
    }

    /// Widths and alignments agree in both contexts
    fn same_layout(&self, a: TypeId, b: TypeId) -> bool {
        let a_info = self.a.type_info(a);
        let b_info = self.b.type_info(b);
        if a_info != b_info {
            trace!(a = %self.a.describe(a), b = %self.b.describe(b), ?a_info, ?b_info, "layouts differ");
            return false;
        }
        true
    }
}

fn pointee_of(kind: &TypeKind) -> Option<TypeId> {
    match kind {
        TypeKind::Pointer { pointee }
        | TypeKind::BlockPointer { pointee }
        | TypeKind::LValueReference { pointee }
        | TypeKind::RValueReference { pointee }
        | TypeKind::MemberPointer { pointee, .. } => Some(*pointee),
        _ => None,
    }
}

fn array_element_of(kind: &TypeKind) -> Option<TypeId> {
    match kind {
        TypeKind::ConstantArray { element, .. }
        | TypeKind::IncompleteArray { element }
        | TypeKind::VariableArray { element } => Some(*element),
        _ => None,
    }
}

/// A type together with the context it lives in.
///
/// Equality is [`types_match`], so it is structural across contexts.
#[derive(Clone, Copy)]
pub struct TypeRef<'a> {
    pub ctx: &'a TypeContext,
    pub ty: TypeId,
}

impl<'a> TypeRef<'a> {
    pub fn new(ctx: &'a TypeContext, ty: TypeId) -> Self {
        Self { ctx, ty }
    }
}

impl PartialEq for TypeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        types_match(self.ctx, self.ty, other.ctx, other.ty)
    }
}

impl fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.ctx.name(), self.ctx.describe(self.ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{FrontendConfig, build_context};
    use crate::types::{
        BuiltinKind, CallConv, FunctionExt, TagKind, TargetLayout, TypeContext, VectorKind,
    };

    fn lp64(name: &str) -> TypeContext {
        TypeContext::new(name, TargetLayout::lp64())
    }

    /// `struct name { int a; double b; }` or with the members swapped
    fn int_double(ctx: &mut TypeContext, name: &str, swapped: bool) -> TypeId {
        let int = ctx.builtin(BuiltinKind::Int);
        let double = ctx.builtin(BuiltinKind::Double);
        let s = ctx.declare_record(TagKind::Struct, Some(name));
        if swapped {
            ctx.complete_record(s, &[("b", double), ("a", int)]).unwrap();
        } else {
            ctx.complete_record(s, &[("a", int), ("b", double)]).unwrap();
        }
        s
    }

    /// `struct node { int value; struct node *next; }`
    fn linked_node(ctx: &mut TypeContext) -> TypeId {
        let int = ctx.builtin(BuiltinKind::Int);
        let node = ctx.declare_record(TagKind::Struct, Some("node"));
        let next = ctx.pointer_to(node);
        ctx.complete_record(node, &[("value", int), ("next", next)])
            .unwrap();
        node
    }

    #[test]
    fn test_reflexive() {
        let mut ctx = lp64("a");
        let node = linked_node(&mut ctx);
        let int = ctx.builtin(BuiltinKind::Int);
        let array = ctx.constant_array_of(int, 3);

        for ty in [node, int, array] {
            assert!(types_match(&ctx, ty, &ctx, ty));
            assert!(match_impl(&ctx, ty, &ctx, ty));
        }
    }

    #[test]
    fn test_struct_member_order_matters() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let s_a = int_double(&mut a, "s", false);
        let s_b = int_double(&mut b, "s", false);
        let swapped = int_double(&mut b, "t", true);

        assert!(types_match(&a, s_a, &b, s_b));
        assert!(!types_match(&a, s_a, &b, swapped));
    }

    #[test]
    fn test_record_names_are_not_compared() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let s_a = int_double(&mut a, "point", false);
        let s_b = int_double(&mut b, "pair", false);
        assert!(types_match(&a, s_a, &b, s_b));
    }

    #[test]
    fn test_layout_differences_never_match() {
        let mut a = lp64("a");
        let mut b = TypeContext::new("b", TargetLayout::llp64());

        let long_a = a.builtin(BuiltinKind::Long);
        let long_b = b.builtin(BuiltinKind::Long);
        assert!(!types_match(&a, long_a, &b, long_b));

        let int_a = a.builtin(BuiltinKind::Int);
        let int_b = b.builtin(BuiltinKind::Int);
        assert!(types_match(&a, int_a, &b, int_b));

        let mut m68k = TypeContext::new("m68k", TargetLayout::m68k());
        let int_m = m68k.builtin(BuiltinKind::Int);
        assert!(!types_match(&a, int_a, &m68k, int_m));
    }

    #[test]
    fn test_builtin_kind_must_agree() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int = a.builtin(BuiltinKind::Int);
        let uint = b.builtin(BuiltinKind::UInt);
        assert!(!types_match(&a, int, &b, uint));

        let void_a = a.builtin(BuiltinKind::Void);
        let void_b = b.builtin(BuiltinKind::Void);
        assert!(types_match(&a, void_a, &b, void_b));
    }

    #[test]
    fn test_self_referential_records_terminate() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let node_a = linked_node(&mut a);
        let node_b = linked_node(&mut b);
        assert!(types_match(&a, node_a, &b, node_b));

        let ptr_a = a.pointer_to(node_a);
        let ptr_b = b.pointer_to(node_b);
        assert!(types_match(&a, ptr_a, &b, ptr_b));
    }

    #[test]
    fn test_mutually_recursive_records() {
        fn build(ctx: &mut TypeContext) -> TypeId {
            let first = ctx.declare_record(TagKind::Struct, Some("first"));
            let second = ctx.declare_record(TagKind::Struct, Some("second"));
            let to_first = ctx.pointer_to(first);
            let to_second = ctx.pointer_to(second);
            ctx.complete_record(first, &[("other", to_second)]).unwrap();
            ctx.complete_record(second, &[("other", to_first)]).unwrap();
            first
        }

        let mut a = lp64("a");
        let mut b = lp64("b");
        let first_a = build(&mut a);
        let first_b = build(&mut b);
        assert!(types_match(&a, first_a, &b, first_b));
    }

    #[test]
    fn test_cycle_shapes_must_line_up() {
        // struct s { struct s *p; struct s *q; }
        let mut a = lp64("a");
        let s = a.declare_record(TagKind::Struct, Some("s"));
        let to_s = a.pointer_to(s);
        a.complete_record(s, &[("p", to_s), ("q", to_s)]).unwrap();

        // struct t { struct t *p; struct u *q; }
        // struct u { struct t *p; struct u *q; }
        let mut b = lp64("b");
        let t = b.declare_record(TagKind::Struct, Some("t"));
        let u = b.declare_record(TagKind::Struct, Some("u"));
        let to_t = b.pointer_to(t);
        let to_u = b.pointer_to(u);
        b.complete_record(t, &[("p", to_t), ("q", to_u)]).unwrap();
        b.complete_record(u, &[("p", to_t), ("q", to_u)]).unwrap();

        // `q` re-enters `struct s *` on one side but reaches a new node on
        // the other
        assert!(!types_match(&a, s, &b, t));
    }

    #[test]
    fn test_typedefs_are_transparent() {
        let mut a = lp64("a");
        let mut b = lp64("b");

        let int_a = a.builtin(BuiltinKind::Int);
        let my_int = a.define_typedef("my_int", int_a).unwrap();
        let s_a = a.declare_record(TagKind::Struct, Some("s"));
        a.complete_record(s_a, &[("x", my_int)]).unwrap();
        let alias = a.define_typedef("s_t", s_a).unwrap();

        let int_b = b.builtin(BuiltinKind::Int);
        let s_b = b.declare_record(TagKind::Struct, Some("s"));
        b.complete_record(s_b, &[("x", int_b)]).unwrap();

        assert!(types_match(&a, alias, &b, s_b));
        assert!(types_match(&a, my_int, &b, int_b));
    }

    #[test]
    fn test_incomplete_records_never_match_across_contexts() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let opaque_a = a.declare_record(TagKind::Struct, Some("opaque"));
        let opaque_b = b.declare_record(TagKind::Struct, Some("opaque"));
        assert!(!types_match(&a, opaque_a, &b, opaque_b));

        // Within one context it is still the same node
        assert!(types_match(&a, opaque_a, &a, opaque_a));
    }

    #[test]
    fn test_struct_and_union_differ() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let int_b = b.builtin(BuiltinKind::Int);
        let s = a.declare_record(TagKind::Struct, None);
        let u = b.declare_record(TagKind::Union, None);
        a.complete_record(s, &[("x", int_a)]).unwrap();
        b.complete_record(u, &[("x", int_b)]).unwrap();
        assert!(!types_match(&a, s, &b, u));
    }

    #[test]
    fn test_trailing_field_mismatch() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let char_a = a.builtin(BuiltinKind::CharS);
        let int_b = b.builtin(BuiltinKind::Int);
        let char_b = b.builtin(BuiltinKind::CharS);
        let s_a = a.declare_record(TagKind::Struct, None);
        let s_b = b.declare_record(TagKind::Struct, None);
        a.complete_record(s_a, &[("x", int_a), ("c", char_a)]).unwrap();
        // Same size and alignment thanks to padding, one more field
        b.complete_record(s_b, &[("x", int_b), ("c", char_b), ("d", char_b)])
            .unwrap();
        assert_eq!(a.type_info(s_a), b.type_info(s_b));
        assert!(!types_match(&a, s_a, &b, s_b));
    }

    fn color(ctx: &mut TypeContext, base: BuiltinKind, values: &[(&str, i128)]) -> TypeId {
        let base = ctx.builtin(base);
        let e = ctx.declare_enum(Some("color"));
        ctx.complete_enum(e, base, values).unwrap();
        e
    }

    #[test]
    fn test_enums() {
        let rgb = [("RED", 0), ("GREEN", 1), ("BLUE", 2)];
        let mut a = lp64("a");
        let mut b = lp64("b");

        let e_a = color(&mut a, BuiltinKind::UInt, &rgb);
        let same = color(&mut b, BuiltinKind::UInt, &rgb);
        let renamed = color(&mut b, BuiltinKind::UInt, &[("R", 0), ("G", 1), ("B", 2)]);
        let shifted = color(&mut b, BuiltinKind::UInt, &[("RED", 0), ("GREEN", 1), ("BLUE", 3)]);
        let shorter = color(&mut b, BuiltinKind::UInt, &rgb[..2]);
        let signed = color(&mut b, BuiltinKind::Int, &rgb);

        assert!(types_match(&a, e_a, &b, same));
        assert!(types_match(&a, e_a, &b, renamed));
        assert!(!types_match(&a, e_a, &b, shifted));
        assert!(!types_match(&a, e_a, &b, shorter));
        assert!(!types_match(&a, e_a, &b, signed));

        let forward = b.declare_enum(Some("later"));
        assert!(!types_match(&a, e_a, &b, forward));
    }

    #[test]
    fn test_arrays_compare_elements_only() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let int_b = b.builtin(BuiltinKind::Int);
        let four = a.constant_array_of(int_a, 4);
        let eight = b.constant_array_of(int_b, 8);
        let unsized_array = b.incomplete_array_of(int_b);

        assert!(types_match(&a, four, &b, eight));
        assert!(!types_match(&a, four, &b, unsized_array));

        let long_b = b.builtin(BuiltinKind::Long);
        let longs = b.constant_array_of(long_b, 4);
        assert!(!types_match(&a, four, &b, longs));
    }

    #[test]
    fn test_vectors() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let float_a = a.builtin(BuiltinKind::Float);
        let float_b = b.builtin(BuiltinKind::Float);

        let v4 = a.vector_of(float_a, 4, VectorKind::Generic);
        let v4_b = b.vector_of(float_b, 4, VectorKind::Generic);
        assert!(types_match(&a, v4, &b, v4_b));
        let v2 = b.vector_of(float_b, 2, VectorKind::Generic);
        let neon = b.vector_of(float_b, 4, VectorKind::Neon);
        assert!(!types_match(&a, v4, &b, v2));
        assert!(!types_match(&a, v4, &b, neon));
    }

    #[test]
    fn test_function_without_prototype() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let int_b = b.builtin(BuiltinKind::Int);

        let f_a = a.function_no_proto(int_a, FunctionExt::default());
        let f_b = b.function_no_proto(int_b, FunctionExt::default());
        let stdcall = b.function_no_proto(
            int_b,
            FunctionExt {
                call_conv: CallConv::StdCall,
                is_const: false,
            },
        );
        let pure = b.function_no_proto(
            int_b,
            FunctionExt {
                call_conv: CallConv::C,
                is_const: true,
            },
        );

        assert!(types_match(&a, f_a, &b, f_b));
        assert!(!types_match(&a, f_a, &b, stdcall));
        assert!(!types_match(&a, f_a, &b, pure));
    }

    #[test]
    fn test_function_with_prototype() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let char_a = a.builtin(BuiltinKind::CharS);
        let char_ptr_a = a.pointer_to(char_a);
        let int_b = b.builtin(BuiltinKind::Int);
        let char_b = b.builtin(BuiltinKind::CharS);
        let char_ptr_b = b.pointer_to(char_b);
        let ext = FunctionExt::default();

        let printf_a = a.function_proto(int_a, vec![char_ptr_a], true, ext);
        let printf_b = b.function_proto(int_b, vec![char_ptr_b], true, ext);
        let not_variadic = b.function_proto(int_b, vec![char_ptr_b], false, ext);
        let extra_param = b.function_proto(int_b, vec![char_ptr_b, int_b], true, ext);
        let other_param = b.function_proto(int_b, vec![int_b], true, ext);
        let other_ret = b.function_proto(char_b, vec![char_ptr_b], true, ext);
        let no_proto = b.function_no_proto(int_b, ext);

        assert!(types_match(&a, printf_a, &b, printf_b));
        assert!(!types_match(&a, printf_a, &b, not_variadic));
        assert!(!types_match(&a, printf_a, &b, extra_param));
        assert!(!types_match(&a, printf_a, &b, other_param));
        assert!(!types_match(&a, printf_a, &b, other_ret));
        assert!(!types_match(&a, printf_a, &b, no_proto));
    }

    #[test]
    fn test_reference_kinds_are_distinct() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let int_b = b.builtin(BuiltinKind::Int);
        let lref = a.lvalue_reference_to(int_a);
        let rref = b.rvalue_reference_to(int_b);
        let lref_b = b.lvalue_reference_to(int_b);
        assert!(!types_match(&a, lref, &b, rref));
        assert!(types_match(&a, lref, &b, lref_b));

        let block_a = a.block_pointer_to(int_a);
        let block_b = b.block_pointer_to(int_b);
        assert!(types_match(&a, block_a, &b, block_b));
    }

    #[test]
    fn test_foreign_handles_never_match() {
        let mut a = lp64("a");
        let b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        // `b` is empty, so any handle is foreign to it
        assert!(!types_match(&a, int_a, &b, int_a));
        assert!(!types_match(&b, int_a, &b, int_a));
    }

    #[test]
    fn test_atomics_compare_value_types() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let int_a = a.builtin(BuiltinKind::Int);
        let int_b = b.builtin(BuiltinKind::Int);
        let uint_b = b.builtin(BuiltinKind::UInt);
        let atomic_a = a.intern(TypeKind::Atomic { value: int_a });
        let atomic_b = b.intern(TypeKind::Atomic { value: int_b });
        let atomic_uint = b.intern(TypeKind::Atomic { value: uint_b });

        assert!(types_match(&a, atomic_a, &b, atomic_b));
        assert!(!types_match(&a, atomic_a, &b, atomic_uint));
        assert!(!types_match(&a, atomic_a, &b, int_b));
    }

    #[test]
    fn test_atomic_members_from_source() {
        let source = "struct s { _Atomic(int) n; }; struct s v; _Atomic(long) l;";
        let config = FrontendConfig::default();
        let a = build_context("a", source, &config).unwrap();
        let b = build_context("b", source, &config).unwrap();
        let v_a = a.lookup_value("v").unwrap().ty;
        let v_b = b.lookup_value("v").unwrap().ty;
        assert!(types_match(&a, v_a, &b, v_b));

        let win = build_context(
            "win",
            source,
            &FrontendConfig {
                target: TargetLayout::llp64(),
                dump_tokens: false,
            },
        )
        .unwrap();
        let l_a = a.lookup_value("l").unwrap().ty;
        let l_win = win.lookup_value("l").unwrap().ty;
        assert!(!types_match(&a, l_a, &win, l_win));
    }

    #[test]
    #[should_panic(expected = "does not support Auto")]
    fn test_unsupported_kinds_panic() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let auto_a = a.intern(TypeKind::Auto);
        let auto_b = b.intern(TypeKind::Auto);
        types_match(&a, auto_a, &b, auto_b);
    }

    #[test]
    fn test_type_ref_equality() {
        let mut a = lp64("a");
        let mut b = lp64("b");
        let node_a = linked_node(&mut a);
        let node_b = linked_node(&mut b);
        let int_b = b.builtin(BuiltinKind::Int);

        assert_eq!(TypeRef::new(&a, node_a), TypeRef::new(&b, node_b));
        assert_ne!(TypeRef::new(&a, node_a), TypeRef::new(&b, int_b));
        assert_eq!(format!("{:?}", TypeRef::new(&b, int_b)), "b::int");
    }
}
