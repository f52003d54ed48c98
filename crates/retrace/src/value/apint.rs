//! Arbitrary-width integers as recorded by the tracer

use std::fmt;

use retrace_endian::SwapBytes;

use super::limbs;

const BITS_PER_WORD: u32 = u64::BITS;

/// An integer of a fixed bit width, stored as little-endian `u64` words.
///
/// Bits above the width are always zero, so two values compare equal iff
/// they have the same width and the same bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApInt {
    bits: u32,
    words: Vec<u64>,
}

impl ApInt {
    /// Number of `u64` words needed to hold `bits` bits
    pub const fn words_needed(bits: u32) -> usize {
        bits.div_ceil(BITS_PER_WORD) as usize
    }

    /// Create a `bits`-wide integer from the low bits of `value`
    pub fn new(bits: u32, value: u64) -> Self {
        Self::from_words(bits, &[value])
    }

    /// Create a `bits`-wide integer from the two's complement of `value`
    pub fn from_i128(bits: u32, value: i128) -> Self {
        let bits = bits.max(1);
        let fill = if value < 0 { u64::MAX } else { 0 };
        let mut words = vec![fill; Self::words_needed(bits)];
        words[0] = value as u64;
        if words.len() > 1 {
            words[1] = (value >> 64) as u64;
        }
        Self::from_words(bits, &words)
    }

    /// Create a `bits`-wide integer from little-endian words.
    ///
    /// Missing words are zero, extra words and bits above the width are
    /// discarded.
    pub fn from_words(bits: u32, words: &[u64]) -> Self {
        let bits = bits.max(1);
        let mut stored = vec![0u64; Self::words_needed(bits)];
        for (dst, src) in stored.iter_mut().zip(words) {
            *dst = *src;
        }
        let mut value = Self { bits, words: stored };
        value.clear_unused_bits();
        value
    }

    fn clear_unused_bits(&mut self) {
        let used = self.bits % BITS_PER_WORD;
        if used != 0 {
            if let Some(top) = self.words.last_mut() {
                *top &= (1u64 << used) - 1;
            }
        }
    }

    pub fn bit_width(&self) -> u32 {
        self.bits
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// The value's words, least significant first
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// The low 64 bits
    pub fn low_u64(&self) -> u64 {
        self.words.first().copied().unwrap_or(0)
    }

    /// Is the sign bit set, reading the value as two's complement?
    pub fn is_negative(&self) -> bool {
        let top = self.bits - 1;
        let word = (top / BITS_PER_WORD) as usize;
        (self.words[word] >> (top % BITS_PER_WORD)) & 1 == 1
    }

    /// Reverse the order of the whole bytes.
    ///
    /// For a width that is not a multiple of 8 the bits of the trailing
    /// partial byte stay on top, so swapping twice gives back the value.
    pub fn byte_swap(&self) -> Self {
        let byte_len = self.bits.div_ceil(8) as usize;
        let whole = (self.bits / 8) as usize;
        let mut bytes: Vec<u8> = self
            .words
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .take(byte_len)
            .collect();
        bytes[..whole].reverse();

        let words: Vec<u64> = bytes
            .chunks(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();
        Self::from_words(self.bits, &words)
    }
}

impl SwapBytes for ApInt {
    fn swap_bytes(self) -> Self {
        self.byte_swap()
    }
}

/// Unsigned decimal
impl fmt::Display for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&limbs::to_decimal(&self.words))
    }
}

impl fmt::LowerHex for ApInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.words.iter().rev().skip_while(|&&word| word == 0);
        match iter.next() {
            Some(first) => {
                write!(f, "{:x}", first)?;
                for word in iter {
                    write!(f, "{:016x}", word)?;
                }
                Ok(())
            }
            None => f.write_str("0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use retrace_endian::{big, little};

    #[test]
    fn test_truncates_to_width() {
        let value = ApInt::new(12, 0xFFFF);
        assert_eq!(value.words(), &[0x0FFF]);
        assert_eq!(value.bit_width(), 12);
    }

    #[test]
    fn test_negative_values_are_twos_complement() {
        let value = ApInt::from_i128(32, -1);
        assert_eq!(value.words(), &[0xFFFF_FFFF]);
        assert!(value.is_negative());

        let wide = ApInt::from_i128(128, -2);
        assert_eq!(wide.words(), &[u64::MAX - 1, u64::MAX]);
        assert_eq!(wide.num_words(), 2);
    }

    #[test]
    fn test_bit_exact_equality() {
        assert_eq!(ApInt::from_i128(8, -1), ApInt::new(8, 0xFF));
        assert_ne!(ApInt::new(8, 1), ApInt::new(16, 1));
    }

    #[test]
    fn test_display_wide_decimal() {
        let value = ApInt::from_words(128, &[0, 1]);
        assert_eq!(value.to_string(), "18446744073709551616");
        assert_eq!(format!("{:x}", value), "10000000000000000");
        assert_eq!(ApInt::new(7, 0).to_string(), "0");
    }

    #[test]
    fn test_byte_swap_full_width() {
        let value = ApInt::from_words(128, &[0x0807_0605_0403_0201, 0x100F_0E0D_0C0B_0A09]);
        let swapped = value.byte_swap();
        assert_eq!(
            swapped.words(),
            &[0x090A_0B0C_0D0E_0F10, 0x0102_0304_0506_0708]
        );
        assert_eq!(swapped.byte_swap(), value);
    }

    #[test]
    fn test_byte_swap_odd_word_count() {
        let value = ApInt::from_words(96, &[0x0807_0605_0403_0201, 0x0C0B_0A09]);
        let swapped = value.byte_swap();
        assert_eq!(swapped.words(), &[0x0506_0708_090A_0B0C, 0x0102_0304]);
    }

    #[test]
    fn test_byte_swap_partial_byte_stays_on_top() {
        let value = ApInt::new(12, 0xFFF);
        assert_eq!(value.byte_swap(), value);

        let value = ApInt::new(20, 0xA_1234);
        let swapped = value.byte_swap();
        assert_eq!(swapped.words(), &[0xA_3412]);
        assert_eq!(swapped.byte_swap(), value);

        let tiny = ApInt::new(3, 0b101);
        assert_eq!(tiny.byte_swap(), tiny);
    }

    proptest! {
        #[test]
        fn prop_byte_swap_is_involutive(bits in 1u32..=300, words in prop::collection::vec(any::<u64>(), 5)) {
            let value = ApInt::from_words(bits, &words);
            let swapped = value.byte_swap();
            prop_assert_eq!(swapped.bit_width(), bits);
            prop_assert_eq!(swapped.byte_swap(), value);
        }
    }

    #[test]
    fn test_endian_conversion_of_wide_values() {
        let value = ApInt::from_words(128, &[1, 2]);
        assert_eq!(little(little(value.clone())), value);
        assert_eq!(big(big(value.clone())), value);
        if retrace_endian::is_little_endian_host() {
            assert_eq!(little(value.clone()), value);
            assert_eq!(big(value.clone()), value.byte_swap());
        }
    }
}
