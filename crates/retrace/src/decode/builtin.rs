//! Host representations of builtin scalars
//!
//! Recorded bytes are in the host's own layout, so each builtin kind is
//! decoded by reinterpreting the bytes as the matching host type.

use std::ffi::{c_char, c_int, c_long, c_longlong, c_schar, c_short, c_uchar, c_uint, c_ulong, c_ulonglong, c_ushort};
use std::fmt::Display;

use super::long_double::{self, LongDoubleError};
use super::{DecodedValue, Degraded};
use crate::types::BuiltinKind;

#[cfg(windows)]
type HostWChar = u16;
#[cfg(all(not(windows), target_arch = "aarch64", not(target_vendor = "apple")))]
type HostWChar = u32;
#[cfg(not(any(windows, all(target_arch = "aarch64", not(target_vendor = "apple")))))]
type HostWChar = i32;

/// Host scalar types that can be read back from their native bytes
trait HostScalar: Sized {
    fn from_host_bytes(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_host_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HostScalar for $ty {
                fn from_host_bytes(bytes: &[u8]) -> Option<Self> {
                    Some(<$ty>::from_ne_bytes(bytes.try_into().ok()?))
                }
            }
        )*
    };
}

impl_host_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

/// How a builtin kind is decoded on this host
#[derive(Clone, Copy)]
pub(crate) enum BuiltinDecoder {
    Void,
    /// A fixed-size host scalar and its text form
    Scalar {
        size: usize,
        render: fn(&[u8]) -> Option<String>,
    },
    LongDouble,
    NotImplemented,
}

pub(crate) struct BuiltinEntry {
    pub(crate) kind: BuiltinKind,
    pub(crate) decoder: BuiltinDecoder,
}

const fn scalar<T>(render: fn(&[u8]) -> Option<String>) -> BuiltinDecoder {
    BuiltinDecoder::Scalar {
        size: size_of::<T>(),
        render,
    }
}

const fn entry(kind: BuiltinKind, decoder: BuiltinDecoder) -> BuiltinEntry {
    BuiltinEntry { kind, decoder }
}

/// Indexed by [`BuiltinKind::index`]
pub(crate) static BUILTIN_TABLE: [BuiltinEntry; BuiltinKind::COUNT] = [
    entry(BuiltinKind::Void, BuiltinDecoder::Void),
    entry(BuiltinKind::Bool, scalar::<bool>(render_bool)),
    entry(BuiltinKind::CharU, scalar::<c_char>(render_plain_char)),
    entry(BuiltinKind::UChar, scalar::<c_uchar>(render_number::<c_uchar>)),
    entry(BuiltinKind::WCharU, scalar::<HostWChar>(render_number::<HostWChar>)),
    entry(BuiltinKind::Char16, scalar::<u16>(render_number::<u16>)),
    entry(BuiltinKind::Char32, scalar::<u32>(render_number::<u32>)),
    entry(BuiltinKind::UShort, scalar::<c_ushort>(render_number::<c_ushort>)),
    entry(BuiltinKind::UInt, scalar::<c_uint>(render_number::<c_uint>)),
    entry(BuiltinKind::ULong, scalar::<c_ulong>(render_number::<c_ulong>)),
    entry(BuiltinKind::ULongLong, scalar::<c_ulonglong>(render_number::<c_ulonglong>)),
    entry(BuiltinKind::UInt128, BuiltinDecoder::NotImplemented),
    entry(BuiltinKind::CharS, scalar::<c_char>(render_plain_char)),
    entry(BuiltinKind::SChar, scalar::<c_schar>(render_number::<c_schar>)),
    entry(BuiltinKind::WCharS, scalar::<HostWChar>(render_number::<HostWChar>)),
    entry(BuiltinKind::Short, scalar::<c_short>(render_number::<c_short>)),
    entry(BuiltinKind::Int, scalar::<c_int>(render_number::<c_int>)),
    entry(BuiltinKind::Long, scalar::<c_long>(render_number::<c_long>)),
    entry(BuiltinKind::LongLong, scalar::<c_longlong>(render_number::<c_longlong>)),
    entry(BuiltinKind::Int128, BuiltinDecoder::NotImplemented),
    entry(BuiltinKind::Half, BuiltinDecoder::NotImplemented),
    entry(BuiltinKind::Float, scalar::<f32>(render_float)),
    entry(BuiltinKind::Double, scalar::<f64>(render_double)),
    entry(BuiltinKind::LongDouble, BuiltinDecoder::LongDouble),
    entry(BuiltinKind::NullPtr, BuiltinDecoder::NotImplemented),
];

fn render_number<T: HostScalar + Display>(bytes: &[u8]) -> Option<String> {
    T::from_host_bytes(bytes).map(|value| value.to_string())
}

fn render_bool(bytes: &[u8]) -> Option<String> {
    let [byte] = bytes else {
        return None;
    };
    Some(if *byte != 0 { "true" } else { "false" }.to_string())
}

/// Printable characters as themselves, the rest as C escapes (octal when
/// there is no named one)
fn render_plain_char(bytes: &[u8]) -> Option<String> {
    let [byte] = bytes else {
        return None;
    };
    let text = match *byte {
        0x20..=0x7E => char::from(*byte).to_string(),
        b'\t' => "\\t".to_string(),
        0x0C => "\\f".to_string(),
        0x0B => "\\v".to_string(),
        b'\n' => "\\n".to_string(),
        b'\r' => "\\r".to_string(),
        0 => "\\0".to_string(),
        other => format!("\\{:03o}", other),
    };
    Some(text)
}

fn render_float(bytes: &[u8]) -> Option<String> {
    f32::from_host_bytes(bytes).map(|value| format_fixed(f64::from(value)))
}

fn render_double(bytes: &[u8]) -> Option<String> {
    f64::from_host_bytes(bytes).map(format_fixed)
}

/// `%f`
fn format_fixed(value: f64) -> String {
    if value.is_nan() {
        return if value.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-inf" } else { "inf" }.to_string();
    }
    format!("{:.6}", value)
}

/// Decode `bytes` as the host representation of `kind`
pub(crate) fn decode_builtin(kind: BuiltinKind, bytes: &[u8]) -> DecodedValue {
    let entry = &BUILTIN_TABLE[kind.index()];
    match entry.decoder {
        BuiltinDecoder::Void => DecodedValue::Void,
        BuiltinDecoder::Scalar { size, render } => {
            if bytes.len() != size {
                return DecodedValue::Degraded(Degraded::SizeMismatch {
                    expected: size,
                    actual: bytes.len(),
                });
            }
            match render(bytes) {
                Some(text) => DecodedValue::Scalar(text),
                None => DecodedValue::Degraded(Degraded::SizeMismatch {
                    expected: size,
                    actual: bytes.len(),
                }),
            }
        }
        BuiltinDecoder::LongDouble => {
            let size = long_double::HOST_FORMAT.size();
            if bytes.len() != size {
                return DecodedValue::Degraded(Degraded::SizeMismatch {
                    expected: size,
                    actual: bytes.len(),
                });
            }
            match long_double::render(bytes, long_double::HOST_FORMAT) {
                Ok(text) => DecodedValue::Scalar(text),
                Err(LongDoubleError::Length) => DecodedValue::Degraded(Degraded::LongDoubleLength),
                Err(LongDoubleError::Format) => DecodedValue::Degraded(Degraded::LongDoubleFormat),
            }
        }
        BuiltinDecoder::NotImplemented => {
            DecodedValue::Degraded(Degraded::BuiltinNotImplemented(entry.kind))
        }
    }
}

/// Host size of `kind`, if it decodes as a fixed-size scalar
pub(crate) fn host_size(kind: BuiltinKind) -> Option<usize> {
    match BUILTIN_TABLE[kind.index()].decoder {
        BuiltinDecoder::Scalar { size, .. } => Some(size),
        BuiltinDecoder::LongDouble => Some(long_double::HOST_FORMAT.size()),
        BuiltinDecoder::Void | BuiltinDecoder::NotImplemented => None,
    }
}
