//! Type graph node kinds

use std::fmt;

use string_interner::DefaultSymbol;

/// Interned identifier, resolved through the owning context
pub type Name = DefaultSymbol;

/// Handle to a type node inside one [`TypeContext`](super::TypeContext).
///
/// Handles are plain indices; a handle from one context means nothing in
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a record declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) u32);

/// Handle to an enum declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(pub(crate) u32);

/// Builtin scalar sub-kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Void,
    Bool,
    /// Plain `char` on targets where it is unsigned
    CharU,
    UChar,
    /// `wchar_t` on targets where it is unsigned
    WCharU,
    Char16,
    Char32,
    UShort,
    UInt,
    ULong,
    ULongLong,
    UInt128,
    /// Plain `char` on targets where it is signed
    CharS,
    SChar,
    WCharS,
    Short,
    Int,
    Long,
    LongLong,
    Int128,
    Half,
    Float,
    Double,
    LongDouble,
    NullPtr,
}

impl BuiltinKind {
    pub const COUNT: usize = 25;

    /// Every builtin kind, in declaration order
    pub const ALL: [BuiltinKind; Self::COUNT] = [
        BuiltinKind::Void,
        BuiltinKind::Bool,
        BuiltinKind::CharU,
        BuiltinKind::UChar,
        BuiltinKind::WCharU,
        BuiltinKind::Char16,
        BuiltinKind::Char32,
        BuiltinKind::UShort,
        BuiltinKind::UInt,
        BuiltinKind::ULong,
        BuiltinKind::ULongLong,
        BuiltinKind::UInt128,
        BuiltinKind::CharS,
        BuiltinKind::SChar,
        BuiltinKind::WCharS,
        BuiltinKind::Short,
        BuiltinKind::Int,
        BuiltinKind::Long,
        BuiltinKind::LongLong,
        BuiltinKind::Int128,
        BuiltinKind::Half,
        BuiltinKind::Float,
        BuiltinKind::Double,
        BuiltinKind::LongDouble,
        BuiltinKind::NullPtr,
    ];

    /// Position in [`BuiltinKind::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// C spelling
    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Void => "void",
            BuiltinKind::Bool => "_Bool",
            BuiltinKind::CharU | BuiltinKind::CharS => "char",
            BuiltinKind::UChar => "unsigned char",
            BuiltinKind::WCharU | BuiltinKind::WCharS => "wchar_t",
            BuiltinKind::Char16 => "char16_t",
            BuiltinKind::Char32 => "char32_t",
            BuiltinKind::UShort => "unsigned short",
            BuiltinKind::UInt => "unsigned int",
            BuiltinKind::ULong => "unsigned long",
            BuiltinKind::ULongLong => "unsigned long long",
            BuiltinKind::UInt128 => "unsigned __int128",
            BuiltinKind::SChar => "signed char",
            BuiltinKind::Short => "short",
            BuiltinKind::Int => "int",
            BuiltinKind::Long => "long",
            BuiltinKind::LongLong => "long long",
            BuiltinKind::Int128 => "__int128",
            BuiltinKind::Half => "__fp16",
            BuiltinKind::Float => "float",
            BuiltinKind::Double => "double",
            BuiltinKind::LongDouble => "long double",
            BuiltinKind::NullPtr => "nullptr_t",
        }
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            BuiltinKind::CharS
                | BuiltinKind::SChar
                | BuiltinKind::WCharS
                | BuiltinKind::Short
                | BuiltinKind::Int
                | BuiltinKind::Long
                | BuiltinKind::LongLong
                | BuiltinKind::Int128
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            BuiltinKind::Bool
                | BuiltinKind::CharU
                | BuiltinKind::UChar
                | BuiltinKind::WCharU
                | BuiltinKind::Char16
                | BuiltinKind::Char32
                | BuiltinKind::UShort
                | BuiltinKind::UInt
                | BuiltinKind::ULong
                | BuiltinKind::ULongLong
                | BuiltinKind::UInt128
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(
            self,
            BuiltinKind::Half | BuiltinKind::Float | BuiltinKind::Double | BuiltinKind::LongDouble
        )
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record tag kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Struct,
    Union,
    Class,
    Enum,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Struct => write!(f, "struct"),
            TagKind::Union => write!(f, "union"),
            TagKind::Class => write!(f, "class"),
            TagKind::Enum => write!(f, "enum"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallConv {
    #[default]
    C,
    StdCall,
    FastCall,
    ThisCall,
    VectorCall,
    Swift,
}

impl CallConv {
    pub fn attribute_name(self) -> &'static str {
        match self {
            CallConv::C => "cdecl",
            CallConv::StdCall => "stdcall",
            CallConv::FastCall => "fastcall",
            CallConv::ThisCall => "thiscall",
            CallConv::VectorCall => "vectorcall",
            CallConv::Swift => "swiftcall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VectorKind {
    #[default]
    Generic,
    AltiVec,
    Neon,
    NeonPoly,
}

/// Calling convention and qualifier bits shared by both function kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FunctionExt {
    pub call_conv: CallConv,
    /// `__attribute__((const))`
    pub is_const: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
}

impl Qualifiers {
    pub fn is_empty(&self) -> bool {
        !(self.is_const || self.is_volatile || self.is_restrict)
    }

    pub fn merge(self, other: Qualifiers) -> Self {
        Self {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
            is_restrict: self.is_restrict || other.is_restrict,
        }
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = [
            (self.is_const, "const"),
            (self.is_volatile, "volatile"),
            (self.is_restrict, "restrict"),
        ];
        let mut first = true;
        for (_, word) in words.iter().filter(|(set, _)| *set) {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", word)?;
            first = false;
        }
        Ok(())
    }
}

/// The shape of one type node.
///
/// `Typedef` and `Qualified` are sugar: they never appear in canonical
/// position. The last group of kinds can be represented but is not
/// understood by the matcher or decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Builtin(BuiltinKind),
    Complex {
        element: TypeId,
    },
    Pointer {
        pointee: TypeId,
    },
    BlockPointer {
        pointee: TypeId,
    },
    LValueReference {
        pointee: TypeId,
    },
    RValueReference {
        pointee: TypeId,
    },
    MemberPointer {
        pointee: TypeId,
        class: TypeId,
    },
    ConstantArray {
        element: TypeId,
        size: u64,
    },
    IncompleteArray {
        element: TypeId,
    },
    VariableArray {
        element: TypeId,
    },
    Vector {
        element: TypeId,
        count: u32,
        vector_kind: VectorKind,
    },
    FunctionProto {
        ret: TypeId,
        params: Vec<TypeId>,
        variadic: bool,
        ext: FunctionExt,
    },
    FunctionNoProto {
        ret: TypeId,
        ext: FunctionExt,
    },
    Record(RecordId),
    Enum(EnumId),

    Typedef {
        name: Name,
        aliased: TypeId,
    },
    Qualified {
        inner: TypeId,
        qualifiers: Qualifiers,
    },

    /// `__auto_type` / `auto` that was never deduced
    Auto,
    DeducedTemplateSpecialization,
    ObjCObject,
    ObjCInterface,
    ObjCObjectPointer {
        pointee: TypeId,
    },
    Pipe {
        element: TypeId,
    },
    Atomic {
        value: TypeId,
    },
}

impl TypeKind {
    pub fn class(&self) -> TypeClass {
        match self {
            TypeKind::Builtin(_) => TypeClass::Builtin,
            TypeKind::Complex { .. } => TypeClass::Complex,
            TypeKind::Pointer { .. } => TypeClass::Pointer,
            TypeKind::BlockPointer { .. } => TypeClass::BlockPointer,
            TypeKind::LValueReference { .. } => TypeClass::LValueReference,
            TypeKind::RValueReference { .. } => TypeClass::RValueReference,
            TypeKind::MemberPointer { .. } => TypeClass::MemberPointer,
            TypeKind::ConstantArray { .. } => TypeClass::ConstantArray,
            TypeKind::IncompleteArray { .. } => TypeClass::IncompleteArray,
            TypeKind::VariableArray { .. } => TypeClass::VariableArray,
            TypeKind::Vector { .. } => TypeClass::Vector,
            TypeKind::FunctionProto { .. } => TypeClass::FunctionProto,
            TypeKind::FunctionNoProto { .. } => TypeClass::FunctionNoProto,
            TypeKind::Record(_) => TypeClass::Record,
            TypeKind::Enum(_) => TypeClass::Enum,
            TypeKind::Typedef { .. } => TypeClass::Typedef,
            TypeKind::Qualified { .. } => TypeClass::Qualified,
            TypeKind::Auto => TypeClass::Auto,
            TypeKind::DeducedTemplateSpecialization => TypeClass::DeducedTemplateSpecialization,
            TypeKind::ObjCObject => TypeClass::ObjCObject,
            TypeKind::ObjCInterface => TypeClass::ObjCInterface,
            TypeKind::ObjCObjectPointer { .. } => TypeClass::ObjCObjectPointer,
            TypeKind::Pipe { .. } => TypeClass::Pipe,
            TypeKind::Atomic { .. } => TypeClass::Atomic,
        }
    }

    pub fn is_sugar(&self) -> bool {
        matches!(self, TypeKind::Typedef { .. } | TypeKind::Qualified { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self,
            TypeKind::FunctionProto { .. } | TypeKind::FunctionNoProto { .. }
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            TypeKind::ConstantArray { .. }
                | TypeKind::IncompleteArray { .. }
                | TypeKind::VariableArray { .. }
        )
    }

    /// The same kind with every child type replaced through `f`
    pub fn map_children(&self, mut f: impl FnMut(TypeId) -> TypeId) -> TypeKind {
        match self {
            TypeKind::Builtin(_)
            | TypeKind::Record(_)
            | TypeKind::Enum(_)
            | TypeKind::Auto
            | TypeKind::DeducedTemplateSpecialization
            | TypeKind::ObjCObject
            | TypeKind::ObjCInterface => self.clone(),
            TypeKind::Complex { element } => TypeKind::Complex { element: f(*element) },
            TypeKind::Pointer { pointee } => TypeKind::Pointer { pointee: f(*pointee) },
            TypeKind::BlockPointer { pointee } => TypeKind::BlockPointer { pointee: f(*pointee) },
            TypeKind::LValueReference { pointee } => {
                TypeKind::LValueReference { pointee: f(*pointee) }
            }
            TypeKind::RValueReference { pointee } => {
                TypeKind::RValueReference { pointee: f(*pointee) }
            }
            TypeKind::MemberPointer { pointee, class } => TypeKind::MemberPointer {
                pointee: f(*pointee),
                class: f(*class),
            },
            TypeKind::ConstantArray { element, size } => TypeKind::ConstantArray {
                element: f(*element),
                size: *size,
            },
            TypeKind::IncompleteArray { element } => {
                TypeKind::IncompleteArray { element: f(*element) }
            }
            TypeKind::VariableArray { element } => TypeKind::VariableArray { element: f(*element) },
            TypeKind::Vector {
                element,
                count,
                vector_kind,
            } => TypeKind::Vector {
                element: f(*element),
                count: *count,
                vector_kind: *vector_kind,
            },
            TypeKind::FunctionProto {
                ret,
                params,
                variadic,
                ext,
            } => TypeKind::FunctionProto {
                ret: f(*ret),
                params: params.iter().map(|param| f(*param)).collect(),
                variadic: *variadic,
                ext: *ext,
            },
            TypeKind::FunctionNoProto { ret, ext } => TypeKind::FunctionNoProto {
                ret: f(*ret),
                ext: *ext,
            },
            TypeKind::Typedef { name, aliased } => TypeKind::Typedef {
                name: *name,
                aliased: f(*aliased),
            },
            TypeKind::Qualified { inner, qualifiers } => TypeKind::Qualified {
                inner: f(*inner),
                qualifiers: *qualifiers,
            },
            TypeKind::ObjCObjectPointer { pointee } => {
                TypeKind::ObjCObjectPointer { pointee: f(*pointee) }
            }
            TypeKind::Pipe { element } => TypeKind::Pipe { element: f(*element) },
            TypeKind::Atomic { value } => TypeKind::Atomic { value: f(*value) },
        }
    }
}

/// The tag of a [`TypeKind`], without its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Builtin,
    Complex,
    Pointer,
    BlockPointer,
    LValueReference,
    RValueReference,
    MemberPointer,
    ConstantArray,
    IncompleteArray,
    VariableArray,
    Vector,
    FunctionProto,
    FunctionNoProto,
    Record,
    Enum,
    Typedef,
    Qualified,
    Auto,
    DeducedTemplateSpecialization,
    ObjCObject,
    ObjCInterface,
    ObjCObjectPointer,
    Pipe,
    Atomic,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_index_matches_table_order() {
        for (i, kind) in BuiltinKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_builtin_categories_are_disjoint() {
        for kind in BuiltinKind::ALL {
            let categories = [
                kind.is_signed_integer(),
                kind.is_unsigned_integer(),
                kind.is_floating(),
            ];
            assert!(categories.iter().filter(|set| **set).count() <= 1, "{:?}", kind);
        }
        assert!(!BuiltinKind::Void.is_integer());
        assert!(!BuiltinKind::NullPtr.is_integer());
    }

    #[test]
    fn test_map_children_keeps_shape() {
        let kind = TypeKind::FunctionProto {
            ret: TypeId(1),
            params: vec![TypeId(2), TypeId(3)],
            variadic: true,
            ext: FunctionExt::default(),
        };
        let mapped = kind.map_children(|id| TypeId(id.0 + 10));
        assert_eq!(
            mapped,
            TypeKind::FunctionProto {
                ret: TypeId(11),
                params: vec![TypeId(12), TypeId(13)],
                variadic: true,
                ext: FunctionExt::default(),
            }
        );
        assert_eq!(mapped.class(), TypeClass::FunctionProto);
    }

    #[test]
    fn test_qualifier_display() {
        let quals = Qualifiers {
            is_const: true,
            is_volatile: true,
            is_restrict: false,
        };
        assert_eq!(quals.to_string(), "const volatile");
        assert!(Qualifiers::default().is_empty());
    }
}
