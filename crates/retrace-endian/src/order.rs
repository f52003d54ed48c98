//! Host/target byte order conversion
//!
//! A conversion is a no-op when the host already uses the requested order,
//! and a full byte reversal otherwise. Applying the same conversion twice
//! always yields the original value.

use core::fmt;

/// Byte order of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl Endianness {
    /// Byte order of the machine running this code
    #[cfg(target_endian = "little")]
    pub const HOST: Endianness = Endianness::Little;

    /// Byte order of the machine running this code
    #[cfg(target_endian = "big")]
    pub const HOST: Endianness = Endianness::Big;

    /// Is this the host byte order?
    #[inline]
    pub const fn is_host(self) -> bool {
        matches!(
            (self, Self::HOST),
            (Endianness::Little, Endianness::Little) | (Endianness::Big, Endianness::Big)
        )
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "little-endian"),
            Endianness::Big => write!(f, "big-endian"),
        }
    }
}

/// Returns `true` when the host stores the least significant byte first.
#[inline]
pub const fn is_little_endian_host() -> bool {
    cfg!(target_endian = "little")
}

/// Values whose byte representation can be reversed.
///
/// `swap_bytes` must reverse the bytes across the full width of the value
/// (not per machine word), so that it is an involution.
pub trait SwapBytes: Sized {
    /// Reverse the byte order of this value
    fn swap_bytes(self) -> Self;
}

macro_rules! impl_swap_bytes_for_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SwapBytes for $ty {
                #[inline]
                fn swap_bytes(self) -> Self {
                    <$ty>::swap_bytes(self)
                }
            }
        )*
    };
}

impl_swap_bytes_for_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl SwapBytes for f32 {
    #[inline]
    fn swap_bytes(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl SwapBytes for f64 {
    #[inline]
    fn swap_bytes(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

/// Convert a value between host order and `order`.
#[inline]
pub fn convert<T: SwapBytes>(order: Endianness, value: T) -> T {
    if order.is_host() {
        value
    } else {
        value.swap_bytes()
    }
}

/// Convert a value between host order and little-endian order.
#[inline]
pub fn little<T: SwapBytes>(value: T) -> T {
    convert(Endianness::Little, value)
}

/// Convert a value between host order and big-endian order.
#[inline]
pub fn big<T: SwapBytes>(value: T) -> T {
    convert(Endianness::Big, value)
}
