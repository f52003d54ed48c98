//! Values stored in a fixed byte order
//!
//! [`StoreAs`] is used for fields of trace records that have a declared
//! on-disk order. The in-memory bytes are always in that order; reads and
//! writes go through host order.

use core::fmt;
use core::marker::PhantomData;

use crate::order::{convert, Endianness, SwapBytes};

/// Marker for a declared byte order
pub trait ByteOrder {
    /// The order values are stored in
    const ORDER: Endianness;
}

/// Little-endian storage marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LittleOrder;

/// Big-endian storage marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BigOrder;

impl ByteOrder for LittleOrder {
    const ORDER: Endianness = Endianness::Little;
}

impl ByteOrder for BigOrder {
    const ORDER: Endianness = Endianness::Big;
}

/// A `T` kept in byte order `O`, converted to host order on access.
///
/// # Example
/// ```
/// use retrace_endian::{Big, StoreAs};
///
/// let mut word: Big<u16> = StoreAs::default();
/// word.set(0x1234);
/// assert_eq!(word.get(), 0x1234);
/// assert_eq!(word.raw().to_ne_bytes(), [0x12, 0x34]);
/// ```
#[repr(transparent)]
pub struct StoreAs<O, T> {
    raw: T,
    order: PhantomData<O>,
}

/// A value stored little-endian
pub type Little<T> = StoreAs<LittleOrder, T>;

/// A value stored big-endian
pub type Big<T> = StoreAs<BigOrder, T>;

impl<O: ByteOrder, T: SwapBytes + Copy> StoreAs<O, T> {
    /// Store a host-order value
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            raw: convert(O::ORDER, value),
            order: PhantomData,
        }
    }

    /// Wrap a value that is already in order `O`
    #[inline]
    pub const fn from_raw(raw: T) -> Self {
        Self {
            raw,
            order: PhantomData,
        }
    }

    /// Read the value in host order
    #[inline]
    pub fn get(&self) -> T {
        convert(O::ORDER, self.raw)
    }

    /// Overwrite the value from host order
    #[inline]
    pub fn set(&mut self, value: T) {
        self.raw = convert(O::ORDER, value);
    }

    /// The stored representation, in order `O`
    #[inline]
    pub const fn raw(&self) -> T {
        self.raw
    }
}

// The stored bytes are left at `T::default()`; callers set the real value
// later with `set`.
impl<O, T: Default> Default for StoreAs<O, T> {
    #[inline]
    fn default() -> Self {
        Self {
            raw: T::default(),
            order: PhantomData,
        }
    }
}

impl<O: ByteOrder, T: SwapBytes + Copy> From<T> for StoreAs<O, T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<O, T: Clone> Clone for StoreAs<O, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            order: PhantomData,
        }
    }
}

impl<O, T: Copy> Copy for StoreAs<O, T> {}

impl<O, T: PartialEq> PartialEq for StoreAs<O, T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<O, T: Eq> Eq for StoreAs<O, T> {}

impl<O: ByteOrder, T: SwapBytes + Copy + fmt::Debug> fmt::Debug for StoreAs<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAs")
            .field("order", &O::ORDER)
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::is_little_endian_host;

    #[test]
    fn test_round_trip_through_storage() {
        let stored: Little<u32> = Little::new(0xDEAD_BEEF);
        assert_eq!(stored.get(), 0xDEAD_BEEF);

        let stored: Big<i64> = Big::new(-42);
        assert_eq!(stored.get(), -42);
    }

    #[test]
    fn test_storage_bytes_follow_declared_order() {
        let little: Little<u32> = 0x0102_0304.into();
        let big: Big<u32> = 0x0102_0304.into();

        assert_eq!(little.raw().to_ne_bytes(), [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(big.raw().to_ne_bytes(), [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_default_then_set() {
        let mut value: Big<u16> = StoreAs::default();
        value.set(0xBEEF);
        assert_eq!(value.get(), 0xBEEF);

        let copy = value;
        assert_eq!(copy, value);
    }

    #[test]
    fn test_from_raw_is_not_converted() {
        let value: Big<u16> = StoreAs::from_raw(0x1234);
        let expected = if is_little_endian_host() { 0x3412 } else { 0x1234 };
        assert_eq!(value.get(), expected);
    }

    #[test]
    fn test_transparent_layout() {
        assert_eq!(core::mem::size_of::<Little<u64>>(), 8);
        assert_eq!(core::mem::align_of::<Big<u32>>(), core::mem::align_of::<u32>());
    }
}
