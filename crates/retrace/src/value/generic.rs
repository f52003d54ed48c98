//! Raw binary codec for recorded runtime values
//!
//! Values are written in little-endian order regardless of the host so
//! traces can be replayed on a different machine. Integers always occupy
//! whole 64-bit words.

use std::fmt;
use std::io;

use retrace_endian::little;
use thiserror::Error;
use tracing::debug;

use super::ApInt;

/// The low-level type a recorded value was captured as
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawType {
    Void,
    Float,
    Double,
    Pointer,
    /// Integer of the given bit width
    Integer(u32),
    Struct(Vec<RawType>),
    Array(Box<RawType>, u64),
    Vector(Box<RawType>, u32),
}

impl RawType {
    /// Bytes a value of this type occupies in the raw encoding, if it has
    /// a raw encoding at all
    pub fn encoded_size(&self) -> Option<usize> {
        match self {
            RawType::Void => Some(0),
            RawType::Float => Some(size_of::<f32>()),
            RawType::Double => Some(size_of::<f64>()),
            RawType::Pointer => Some(size_of::<u64>()),
            RawType::Integer(bits) => Some(ApInt::words_needed((*bits).max(1)) * size_of::<u64>()),
            RawType::Struct(_) | RawType::Array(..) | RawType::Vector(..) => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            RawType::Struct(_) | RawType::Array(..) | RawType::Vector(..)
        )
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawType::Void => write!(f, "void"),
            RawType::Float => write!(f, "float"),
            RawType::Double => write!(f, "double"),
            RawType::Pointer => write!(f, "ptr"),
            RawType::Integer(bits) => write!(f, "i{}", bits),
            RawType::Struct(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, " }}")
            }
            RawType::Array(element, count) => write!(f, "[{} x {}]", count, element),
            RawType::Vector(element, count) => write!(f, "<{} x {}>", count, element),
        }
    }
}

/// A recorded runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum GenericValue {
    Void,
    Float(f32),
    Double(f64),
    Pointer(u64),
    Int(ApInt),
}

impl GenericValue {
    /// The raw type this value would be written as
    pub fn raw_type(&self) -> RawType {
        match self {
            GenericValue::Void => RawType::Void,
            GenericValue::Float(_) => RawType::Float,
            GenericValue::Double(_) => RawType::Double,
            GenericValue::Pointer(_) => RawType::Pointer,
            GenericValue::Int(value) => RawType::Integer(value.bit_width()),
        }
    }
}

/// Integers print as unsigned decimal and pointers as hex
impl fmt::Display for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericValue::Void => Ok(()),
            GenericValue::Float(value) => write!(f, "{}", value),
            GenericValue::Double(value) => write!(f, "{}", value),
            GenericValue::Pointer(address) => write!(f, "{:#x}", address),
            GenericValue::Int(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Error, Debug)]
pub enum RawValueError {
    #[error("truncated value: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("cannot allocate {words} words for a {bits}-bit integer")]
    Allocation { bits: u32, words: usize },

    #[error("no raw encoding for {0}")]
    Unsupported(RawType),

    #[error("value {value:?} cannot be written as {expected}")]
    TypeMismatch { value: GenericValue, expected: RawType },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type RawValueResult<T> = Result<T, RawValueError>;

/// Write `value` as `ty`, returning the number of bytes written.
///
/// Aggregates have no raw encoding yet; they write nothing.
pub fn write_generic_value<W: io::Write>(
    out: &mut W,
    value: &GenericValue,
    ty: &RawType,
) -> RawValueResult<usize> {
    let mismatch = || RawValueError::TypeMismatch {
        value: value.clone(),
        expected: ty.clone(),
    };

    match (ty, value) {
        (RawType::Void, _) => Ok(0),
        (RawType::Float, GenericValue::Float(v)) => write_bytes(out, &v.to_le_bytes()),
        (RawType::Double, GenericValue::Double(v)) => write_bytes(out, &v.to_le_bytes()),
        (RawType::Pointer, GenericValue::Pointer(address)) => {
            write_bytes(out, &little(*address).to_ne_bytes())
        }
        (RawType::Integer(bits), GenericValue::Int(v)) => {
            if v.bit_width() != (*bits).max(1) {
                return Err(mismatch());
            }
            let mut written = 0;
            for word in v.words() {
                written += write_bytes(out, &little(*word).to_ne_bytes())?;
            }
            Ok(written)
        }
        (RawType::Struct(_) | RawType::Array(..) | RawType::Vector(..), _) => {
            debug!(ty = %ty, "aggregate raw values are not encoded");
            Ok(0)
        }
        _ => Err(mismatch()),
    }
}

fn write_bytes<W: io::Write>(out: &mut W, bytes: &[u8]) -> RawValueResult<usize> {
    out.write_all(bytes)?;
    Ok(bytes.len())
}

/// Encode `value` as `ty` into a fresh buffer
pub fn encode_little_endian(value: &GenericValue, ty: &RawType) -> RawValueResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(ty.encoded_size().unwrap_or(0));
    write_generic_value(&mut buffer, value, ty)?;
    Ok(buffer)
}

/// Read a value of type `ty` from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Input shorter than
/// the full encoding is an error, never a partial value.
pub fn read_generic_value(bytes: &[u8], ty: &RawType) -> RawValueResult<(GenericValue, usize)> {
    let needed = ty
        .encoded_size()
        .ok_or_else(|| RawValueError::Unsupported(ty.clone()))?;
    let Some(data) = bytes.get(..needed) else {
        return Err(RawValueError::Truncated {
            needed,
            available: bytes.len(),
        });
    };

    let value = match ty {
        RawType::Void => GenericValue::Void,
        RawType::Float => GenericValue::Float(f32::from_le_bytes(fixed(data)?)),
        RawType::Double => GenericValue::Double(f64::from_le_bytes(fixed(data)?)),
        RawType::Pointer => GenericValue::Pointer(little(u64::from_ne_bytes(fixed(data)?))),
        RawType::Integer(bits) => GenericValue::Int(read_integer(data, *bits)?),
        RawType::Struct(_) | RawType::Array(..) | RawType::Vector(..) => {
            return Err(RawValueError::Unsupported(ty.clone()));
        }
    };
    Ok((value, needed))
}

fn fixed<const N: usize>(data: &[u8]) -> RawValueResult<[u8; N]> {
    data.try_into().map_err(|_| RawValueError::Truncated {
        needed: N,
        available: data.len(),
    })
}

fn read_integer(data: &[u8], bits: u32) -> RawValueResult<ApInt> {
    let word_count = ApInt::words_needed(bits.max(1));
    let mut words: Vec<u64> = Vec::new();
    words
        .try_reserve_exact(word_count)
        .map_err(|_| RawValueError::Allocation {
            bits,
            words: word_count,
        })?;

    for chunk in data.chunks_exact(size_of::<u64>()).take(word_count) {
        words.push(little(u64::from_ne_bytes(fixed(chunk)?)));
    }
    Ok(ApInt::from_words(bits, &words))
}

/// Decode a single value of type `ty`, ignoring trailing bytes
pub fn decode_little_endian(bytes: &[u8], ty: &RawType) -> RawValueResult<GenericValue> {
    read_generic_value(bytes, ty).map(|(value, _)| value)
}

/// Human-readable rendering of `value` read as `ty`.
///
/// The type decides what is printed: `void` and aggregates print nothing,
/// and a value of another kind than `ty` prints nothing either.
pub fn print_generic_value<W: fmt::Write>(
    out: &mut W,
    value: &GenericValue,
    ty: &RawType,
) -> fmt::Result {
    match (ty, value) {
        (RawType::Float, GenericValue::Float(_))
        | (RawType::Double, GenericValue::Double(_))
        | (RawType::Pointer, GenericValue::Pointer(_)) => write!(out, "{}", value),
        (RawType::Integer(bits), GenericValue::Int(int)) if int.bit_width() == *bits => {
            write!(out, "{}", int)
        }
        (RawType::Void | RawType::Struct(_) | RawType::Array(..) | RawType::Vector(..), _) => {
            Ok(())
        }
        _ => {
            debug!(ty = %ty, value = ?value, "value does not have the printed type");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_encodings_are_little_endian() {
        let bytes = encode_little_endian(&GenericValue::Pointer(0x1122_3344), &RawType::Pointer)
            .unwrap();
        assert_eq!(bytes, vec![0x44, 0x33, 0x22, 0x11, 0, 0, 0, 0]);

        let bytes = encode_little_endian(&GenericValue::Float(1.0), &RawType::Float).unwrap();
        assert_eq!(bytes, 1.0f32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_integers_use_whole_words() {
        let value = GenericValue::Int(ApInt::new(8, 0xAB));
        let bytes = encode_little_endian(&value, &RawType::Integer(8)).unwrap();
        assert_eq!(bytes, vec![0xAB, 0, 0, 0, 0, 0, 0, 0]);

        let value = GenericValue::Int(ApInt::from_words(65, &[1, 1]));
        let bytes = encode_little_endian(&value, &RawType::Integer(65)).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[8], 1);
    }

    #[test]
    fn test_read_reports_consumed_bytes() {
        let mut bytes = 2.5f64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF; 3]);
        let (value, consumed) = read_generic_value(&bytes, &RawType::Double).unwrap();
        assert_eq!(value, GenericValue::Double(2.5));
        assert_eq!(consumed, 8);

        let (value, consumed) = read_generic_value(&[], &RawType::Void).unwrap();
        assert_eq!(value, GenericValue::Void);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_short_input_fails() {
        let err = decode_little_endian(&[0; 4], &RawType::Integer(33)).unwrap_err();
        assert!(matches!(
            err,
            RawValueError::Truncated {
                needed: 8,
                available: 4
            }
        ));

        let err = decode_little_endian(&[0; 7], &RawType::Pointer).unwrap_err();
        assert!(matches!(err, RawValueError::Truncated { .. }));
    }

    #[test]
    fn test_aggregates_have_no_raw_form() {
        let ty = RawType::Array(Box::new(RawType::Integer(32)), 4);
        let bytes = encode_little_endian(&GenericValue::Void, &ty).unwrap();
        assert!(bytes.is_empty());

        let err = decode_little_endian(&[0; 16], &ty).unwrap_err();
        assert!(matches!(err, RawValueError::Unsupported(_)));
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let err = encode_little_endian(&GenericValue::Float(1.0), &RawType::Double).unwrap_err();
        assert!(matches!(err, RawValueError::TypeMismatch { .. }));

        let err = encode_little_endian(&GenericValue::Int(ApInt::new(16, 1)), &RawType::Integer(32))
            .unwrap_err();
        assert!(matches!(err, RawValueError::TypeMismatch { .. }));
    }

    #[test]
    fn test_print_generic_value() {
        let mut text = String::new();
        print_generic_value(
            &mut text,
            &GenericValue::Int(ApInt::from_i128(32, -1)),
            &RawType::Integer(32),
        )
        .unwrap();
        assert_eq!(text, "4294967295");

        text.clear();
        print_generic_value(&mut text, &GenericValue::Pointer(255), &RawType::Pointer).unwrap();
        assert_eq!(text, "0xff");

        text.clear();
        let ty = RawType::Struct(vec![RawType::Float]);
        print_generic_value(&mut text, &GenericValue::Float(1.0), &ty).unwrap();
        assert_eq!(text, "");
        assert_eq!(ty.to_string(), "{ float }");

        print_generic_value(&mut text, &GenericValue::Pointer(1), &RawType::Void).unwrap();
        print_generic_value(&mut text, &GenericValue::Pointer(1), &RawType::Integer(64)).unwrap();
        print_generic_value(&mut text, &GenericValue::Int(ApInt::new(8, 1)), &RawType::Integer(16))
            .unwrap();
        assert_eq!(text, "");

        print_generic_value(&mut text, &GenericValue::Double(0.5), &RawType::Double).unwrap();
        assert_eq!(text, "0.5");
    }

    proptest! {
        #[test]
        fn prop_integer_round_trip(bits in 1u32..=256, words in prop::collection::vec(any::<u64>(), 4)) {
            let value = ApInt::from_words(bits, &words);
            let ty = RawType::Integer(bits);
            let bytes = encode_little_endian(&GenericValue::Int(value.clone()), &ty).unwrap();
            prop_assert_eq!(bytes.len(), ty.encoded_size().unwrap());
            prop_assert_eq!(decode_little_endian(&bytes, &ty).unwrap(), GenericValue::Int(value));
        }

        #[test]
        fn prop_float_round_trip_is_bit_exact(bits in any::<u64>()) {
            let value = f64::from_bits(bits);
            let bytes = encode_little_endian(&GenericValue::Double(value), &RawType::Double).unwrap();
            let GenericValue::Double(back) = decode_little_endian(&bytes, &RawType::Double).unwrap() else {
                panic!("expected a double");
            };
            prop_assert_eq!(back.to_bits(), bits);
        }
    }
}
