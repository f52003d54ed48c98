//! `long double` rendering
//!
//! The host's extended format is unpacked into an exact binary fraction
//! and printed the way `%Lf` would print it: fixed notation, six
//! fractional digits, round half to even on the exact value.

use std::fmt;
use std::fmt::Write as _;

use crate::value::limbs;

const FRACTION_DIGITS: usize = 6;
const FRACTION_SCALE: u64 = 1_000_000;

/// In-memory representation of `long double`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LongDoubleFormat {
    /// x87 80-bit extended, padded to `storage` bytes
    X87 { storage: usize },
    /// IEEE 754 binary128
    Binary128,
    /// `long double` is just `double`
    Double,
}

impl LongDoubleFormat {
    pub(crate) const fn size(self) -> usize {
        match self {
            LongDoubleFormat::X87 { storage } => storage,
            LongDoubleFormat::Binary128 => 16,
            LongDoubleFormat::Double => 8,
        }
    }
}

pub(crate) const HOST_FORMAT: LongDoubleFormat =
    if cfg!(all(target_arch = "x86_64", not(target_env = "msvc"))) {
        LongDoubleFormat::X87 { storage: 16 }
    } else if cfg!(all(target_arch = "x86", not(target_env = "msvc"))) {
        LongDoubleFormat::X87 { storage: 12 }
    } else if cfg!(any(
        all(target_arch = "aarch64", not(target_vendor = "apple"), not(windows)),
        target_arch = "riscv64"
    )) {
        LongDoubleFormat::Binary128
    } else {
        LongDoubleFormat::Double
    };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LongDoubleError {
    /// No output length can be computed for these bytes
    Length,
    /// Rendering did not produce the computed length
    Format,
}

/// `(-1)^negative * significand * 2^exponent`, or a special value
#[derive(Debug, Clone, PartialEq, Eq)]
enum Extended {
    Finite {
        negative: bool,
        significand: Vec<u64>,
        exponent: i64,
    },
    Infinite {
        negative: bool,
    },
    NaN {
        negative: bool,
    },
}

fn unpack(bytes: &[u8], format: LongDoubleFormat) -> Option<Extended> {
    match format {
        LongDoubleFormat::X87 { .. } => unpack_x87(bytes),
        LongDoubleFormat::Binary128 => unpack_binary128(bytes),
        LongDoubleFormat::Double => unpack_double(bytes),
    }
}

fn unpack_x87(bytes: &[u8]) -> Option<Extended> {
    const BIAS: i64 = 16383;
    let mantissa = u64::from_ne_bytes(bytes.get(..8)?.try_into().ok()?);
    let sign_exponent = u16::from_ne_bytes(bytes.get(8..10)?.try_into().ok()?);

    let negative = sign_exponent >> 15 == 1;
    let exponent = i64::from(sign_exponent & 0x7FFF);
    let integer_bit = mantissa >> 63 == 1;

    match exponent {
        // Denormals and pseudo-denormals share the minimum exponent
        0 => Some(Extended::Finite {
            negative,
            significand: vec![mantissa],
            exponent: 1 - BIAS - 63,
        }),
        0x7FFF if !integer_bit => None,
        0x7FFF if mantissa << 1 == 0 => Some(Extended::Infinite { negative }),
        0x7FFF => Some(Extended::NaN { negative }),
        // Unnormals are not valid operands
        _ if !integer_bit => None,
        _ => Some(Extended::Finite {
            negative,
            significand: vec![mantissa],
            exponent: exponent - BIAS - 63,
        }),
    }
}

fn unpack_binary128(bytes: &[u8]) -> Option<Extended> {
    const BIAS: i64 = 16383;
    const FRACTION_BITS: u32 = 112;
    let bits = u128::from_ne_bytes(bytes.get(..16)?.try_into().ok()?);

    let negative = bits >> 127 == 1;
    let exponent = ((bits >> FRACTION_BITS) & 0x7FFF) as i64;
    let fraction = bits & ((1u128 << FRACTION_BITS) - 1);

    match exponent {
        0 => Some(Extended::Finite {
            negative,
            significand: limbs::from_u128(fraction),
            exponent: 1 - BIAS - i64::from(FRACTION_BITS),
        }),
        0x7FFF if fraction == 0 => Some(Extended::Infinite { negative }),
        0x7FFF => Some(Extended::NaN { negative }),
        _ => Some(Extended::Finite {
            negative,
            significand: limbs::from_u128(fraction | (1u128 << FRACTION_BITS)),
            exponent: exponent - BIAS - i64::from(FRACTION_BITS),
        }),
    }
}

fn unpack_double(bytes: &[u8]) -> Option<Extended> {
    const BIAS: i64 = 1023;
    const FRACTION_BITS: u32 = 52;
    let value = f64::from_ne_bytes(bytes.get(..8)?.try_into().ok()?);
    let bits = value.to_bits();

    let negative = value.is_sign_negative();
    let exponent = ((bits >> FRACTION_BITS) & 0x7FF) as i64;
    let fraction = bits & ((1u64 << FRACTION_BITS) - 1);

    if value.is_nan() {
        return Some(Extended::NaN { negative });
    }
    if value.is_infinite() {
        return Some(Extended::Infinite { negative });
    }
    let (significand, exponent) = if exponent == 0 {
        (fraction, 1 - BIAS - i64::from(FRACTION_BITS))
    } else {
        (
            fraction | (1u64 << FRACTION_BITS),
            exponent - BIAS - i64::from(FRACTION_BITS),
        )
    };
    Some(Extended::Finite {
        negative,
        significand: vec![significand],
        exponent,
    })
}

impl fmt::Display for Extended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extended::Infinite { negative } => f.write_str(if *negative { "-inf" } else { "inf" }),
            Extended::NaN { negative } => f.write_str(if *negative { "-nan" } else { "nan" }),
            Extended::Finite {
                negative,
                significand,
                exponent,
            } => {
                let mut scaled = significand.clone();
                limbs::mul_small(&mut scaled, FRACTION_SCALE);
                let scaled = if *exponent >= 0 {
                    limbs::shl(&mut scaled, exponent.unsigned_abs());
                    scaled
                } else {
                    limbs::shr_round_half_even(&scaled, exponent.unsigned_abs())
                };

                let digits = limbs::to_decimal(&scaled);
                let digits = format!("{:0>width$}", digits, width = FRACTION_DIGITS + 1);
                let (whole, fraction) = digits.split_at(digits.len() - FRACTION_DIGITS);
                if *negative {
                    f.write_str("-")?;
                }
                write!(f, "{}.{}", whole, fraction)
            }
        }
    }
}

/// Counts bytes instead of storing them
struct LengthCounter(usize);

impl fmt::Write for LengthCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// A string that refuses to grow past its capacity
struct BoundedBuffer {
    text: String,
    limit: usize,
}

impl fmt::Write for BoundedBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.text.len() + s.len() > self.limit {
            return Err(fmt::Error);
        }
        self.text.push_str(s);
        Ok(())
    }
}

/// Render `bytes` (a `long double` in `format`) as `%Lf` would.
///
/// The output length is computed first and the text is then written into
/// a buffer of exactly that size.
pub(crate) fn render(bytes: &[u8], format: LongDoubleFormat) -> Result<String, LongDoubleError> {
    let value = unpack(bytes, format).ok_or(LongDoubleError::Length)?;

    let mut counter = LengthCounter(0);
    write!(counter, "{}", value).map_err(|_| LongDoubleError::Length)?;
    let length = counter.0;

    let mut buffer = BoundedBuffer {
        text: String::with_capacity(length),
        limit: length,
    };
    write!(buffer, "{}", value).map_err(|_| LongDoubleError::Format)?;
    if buffer.text.len() != length {
        return Err(LongDoubleError::Format);
    }
    Ok(buffer.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const X87: LongDoubleFormat = LongDoubleFormat::X87 { storage: 16 };

    fn x87(negative: bool, exponent: u16, mantissa: u64) -> Vec<u8> {
        let mut bytes = mantissa.to_ne_bytes().to_vec();
        let sign = if negative { 0x8000 } else { 0 };
        bytes.extend_from_slice(&(sign | exponent).to_ne_bytes());
        bytes.resize(16, 0);
        bytes
    }

    fn binary128(negative: bool, exponent: u16, fraction: u128) -> Vec<u8> {
        let sign = if negative { 1u128 << 127 } else { 0 };
        let bits = sign | (u128::from(exponent) << 112) | fraction;
        bits.to_ne_bytes().to_vec()
    }

    #[test]
    fn test_x87_simple_values() {
        assert_eq!(render(&x87(false, 16383, 1 << 63), X87).unwrap(), "1.000000");
        assert_eq!(render(&x87(false, 16383, 0xC000_0000_0000_0000), X87).unwrap(), "1.500000");
        assert_eq!(render(&x87(true, 16384, 1 << 63), X87).unwrap(), "-2.000000");
        assert_eq!(render(&x87(false, 0, 0), X87).unwrap(), "0.000000");
        assert_eq!(render(&x87(true, 0, 0), X87).unwrap(), "-0.000000");
    }

    #[test]
    fn test_x87_rounds_exactly() {
        // 1/3 to 64 significant bits
        let third = x87(false, 16381, 0xAAAA_AAAA_AAAA_AAAB);
        assert_eq!(render(&third, X87).unwrap(), "0.333333");

        // 2^-20 = 0.00000095367... rounds up, 2^-21 rounds down
        assert_eq!(render(&x87(false, 16383 - 20, 1 << 63), X87).unwrap(), "0.000001");
        assert_eq!(render(&x87(false, 16383 - 21, 1 << 63), X87).unwrap(), "0.000000");
    }

    #[test]
    fn test_x87_large_values_print_every_digit() {
        let value = x87(false, 16383 + 70, 1 << 63);
        assert_eq!(
            render(&value, X87).unwrap(),
            "1180591620717411303424.000000"
        );
    }

    #[test]
    fn test_x87_special_values() {
        assert_eq!(render(&x87(false, 0x7FFF, 1 << 63), X87).unwrap(), "inf");
        assert_eq!(render(&x87(true, 0x7FFF, 1 << 63), X87).unwrap(), "-inf");
        assert_eq!(render(&x87(false, 0x7FFF, 0xC000_0000_0000_0000), X87).unwrap(), "nan");
    }

    #[test]
    fn test_x87_invalid_encodings_have_no_length() {
        // Unnormal: non-zero exponent without the integer bit
        assert_eq!(render(&x87(false, 16383, 1), X87), Err(LongDoubleError::Length));
        // Pseudo-infinity
        assert_eq!(render(&x87(false, 0x7FFF, 0), X87), Err(LongDoubleError::Length));
    }

    #[test]
    fn test_binary128() {
        let format = LongDoubleFormat::Binary128;
        assert_eq!(render(&binary128(false, 16384, 1 << 110), format).unwrap(), "2.500000");
        assert_eq!(render(&binary128(true, 16383, 0), format).unwrap(), "-1.000000");
        assert_eq!(render(&binary128(false, 0x7FFF, 0), format).unwrap(), "inf");
        assert_eq!(render(&binary128(false, 0x7FFF, 1), format).unwrap(), "nan");
    }

    #[test]
    fn test_double_format() {
        let format = LongDoubleFormat::Double;
        assert_eq!(render(&0.125f64.to_ne_bytes(), format).unwrap(), "0.125000");
        assert_eq!(render(&(-3.0f64).to_ne_bytes(), format).unwrap(), "-3.000000");
        assert_eq!(render(&f64::MIN_POSITIVE.to_ne_bytes(), format).unwrap(), "0.000000");
        assert_eq!(
            render(&0.1f64.to_ne_bytes(), format).unwrap(),
            format!("{:.6}", 0.1f64)
        );
    }

    #[test]
    fn test_short_input_has_no_length() {
        assert_eq!(render(&[0; 4], X87), Err(LongDoubleError::Length));
        assert_eq!(render(&[0; 4], LongDoubleFormat::Double), Err(LongDoubleError::Length));
    }

    #[test]
    fn test_host_format_size() {
        assert!(HOST_FORMAT.size() >= 8);
    }
}
