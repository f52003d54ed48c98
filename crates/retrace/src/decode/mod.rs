//! Rendering recorded bytes as typed values
//!
//! Decoding never fails. Anything that cannot be decoded faithfully comes
//! back as a [`Degraded`] marker in place of the value, so one bad element
//! does not hide its siblings.

mod builtin;
mod long_double;

use std::fmt;

use tracing::debug;

use crate::types::{BuiltinKind, TypeClass, TypeContext, TypeId, TypeKind, ValueDecl};

/// A decoded value tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Void,
    /// A builtin scalar in its text form
    Scalar(String),
    /// A raw address
    Pointer(u64),
    Array(Vec<DecodedValue>),
    Degraded(Degraded),
}

impl DecodedValue {
    /// Does this value, or any element of it, carry a degraded marker?
    pub fn is_degraded(&self) -> bool {
        match self {
            DecodedValue::Degraded(_) => true,
            DecodedValue::Array(elements) => elements.iter().any(DecodedValue::is_degraded),
            DecodedValue::Void | DecodedValue::Scalar(_) | DecodedValue::Pointer(_) => false,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Void => write!(f, "void"),
            DecodedValue::Scalar(text) => write!(f, "{}", text),
            DecodedValue::Pointer(address) => write!(f, "{:#x}", address),
            DecodedValue::Array(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "}}")
            }
            DecodedValue::Degraded(marker) => write!(f, "{}", marker),
        }
    }
}

/// Why a value could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degraded {
    /// The byte span is not the size of the host representation
    SizeMismatch { expected: usize, actual: usize },
    /// The byte span does not split evenly into the array's elements
    ArraySizeMismatch { length: usize, count: u64 },
    BuiltinNotImplemented(BuiltinKind),
    UnhandledType(TypeClass),
    LongDoubleLength,
    LongDoubleFormat,
    InvalidType,
}

impl fmt::Display for Degraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degraded::SizeMismatch { .. } => write!(f, "<size mismatch>"),
            Degraded::ArraySizeMismatch { .. } => write!(f, "<array size mismatch>"),
            Degraded::BuiltinNotImplemented(kind) => write!(f, "<builtin {} not implemented>", kind),
            Degraded::UnhandledType(class) => write!(f, "<unhandled type: {}>", class),
            Degraded::LongDoubleLength => write!(f, "<long double: length unavailable>"),
            Degraded::LongDoubleFormat => write!(f, "<long double: format failed>"),
            Degraded::InvalidType => write!(f, "<invalid type>"),
        }
    }
}

/// Decode `bytes` as a value of type `ty`.
///
/// `bytes` must be in host byte order and layout.
pub fn decode(ctx: &TypeContext, ty: TypeId, bytes: &[u8]) -> DecodedValue {
    if !ctx.contains(ty) {
        return DecodedValue::Degraded(Degraded::InvalidType);
    }

    match ctx.canonical_kind(ty) {
        TypeKind::Builtin(kind) => builtin::decode_builtin(*kind, bytes),
        TypeKind::Pointer { .. } => decode_pointer(bytes),
        TypeKind::ConstantArray { element, size } => decode_array(ctx, *element, *size, bytes),
        other => {
            debug!(ty = %ctx.describe(ty), class = %other.class(), "no decoder for type");
            DecodedValue::Degraded(Degraded::UnhandledType(other.class()))
        }
    }
}

/// Decode and render in one step
pub fn decode_to_string(ctx: &TypeContext, ty: TypeId, bytes: &[u8]) -> String {
    decode(ctx, ty, bytes).to_string()
}

/// Decode the bytes recorded for a declaration
pub fn decode_value(ctx: &TypeContext, decl: &ValueDecl, bytes: &[u8]) -> DecodedValue {
    decode(ctx, decl.ty, bytes)
}

/// Text shown for a value that has not been assigned yet
pub const UNINITIALIZED: &str = "uninitialized";

/// Render a value the way it appears next to an expression: `(type)value`.
///
/// The type is spelled as written, sugar included, while the value is
/// decoded through the canonical type. `None` means nothing has been
/// recorded for the value yet.
pub fn render_typed(ctx: &TypeContext, ty: TypeId, bytes: Option<&[u8]>) -> String {
    let Some(bytes) = bytes else {
        return UNINITIALIZED.to_string();
    };
    if !ctx.contains(ty) {
        return Degraded::InvalidType.to_string();
    }
    format!("({}){}", ctx.describe(ty), decode(ctx, ty, bytes))
}

/// [`render_typed`] for a declaration
pub fn render_declaration(ctx: &TypeContext, decl: &ValueDecl, bytes: Option<&[u8]>) -> String {
    render_typed(ctx, decl.ty, bytes)
}

/// Host byte size of a decodable type, if it has one.
///
/// Useful for splitting a larger recording into values.
pub fn host_size(ctx: &TypeContext, ty: TypeId) -> Option<usize> {
    if !ctx.contains(ty) {
        return None;
    }
    match ctx.canonical_kind(ty) {
        TypeKind::Builtin(kind) => builtin::host_size(*kind),
        TypeKind::Pointer { .. } => Some(size_of::<usize>()),
        TypeKind::ConstantArray { element, size } => {
            host_size(ctx, *element)?.checked_mul(usize::try_from(*size).ok()?)
        }
        _ => None,
    }
}

fn decode_pointer(bytes: &[u8]) -> DecodedValue {
    let Ok(raw) = <[u8; size_of::<usize>()]>::try_from(bytes) else {
        return DecodedValue::Degraded(Degraded::SizeMismatch {
            expected: size_of::<usize>(),
            actual: bytes.len(),
        });
    };
    DecodedValue::Pointer(usize::from_ne_bytes(raw) as u64)
}

fn decode_array(ctx: &TypeContext, element: TypeId, count: u64, bytes: &[u8]) -> DecodedValue {
    let mismatch = || {
        debug!(length = bytes.len(), count, "array span does not divide into elements");
        DecodedValue::Degraded(Degraded::ArraySizeMismatch {
            length: bytes.len(),
            count,
        })
    };

    if count == 0 {
        return if bytes.is_empty() {
            DecodedValue::Array(Vec::new())
        } else {
            mismatch()
        };
    }

    let Ok(count_usize) = usize::try_from(count) else {
        return mismatch();
    };
    if bytes.len() % count_usize != 0 || bytes.len() < count_usize {
        return mismatch();
    }

    let element = ctx.canonical(element);
    let element_size = bytes.len() / count_usize;
    DecodedValue::Array(
        bytes
            .chunks_exact(element_size)
            .map(|chunk| decode(ctx, element, chunk))
            .collect(),
    )
}
