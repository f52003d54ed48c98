//! Unsigned multi-word arithmetic on little-endian `u64` limbs
//!
//! Only the handful of operations needed for decimal rendering of wide
//! integers and exact fixed-point rendering of extended floats.

/// Largest power of ten that fits in a `u64`
const DECIMAL_CHUNK: u64 = 10_000_000_000_000_000_000;
const DECIMAL_CHUNK_DIGITS: usize = 19;

pub(crate) fn from_u128(value: u128) -> Vec<u64> {
    let mut limbs = vec![value as u64, (value >> 64) as u64];
    trim(&mut limbs);
    limbs
}

/// Drop high zero limbs
pub(crate) fn trim(limbs: &mut Vec<u64>) {
    while limbs.last() == Some(&0) {
        limbs.pop();
    }
}

pub(crate) fn is_zero(limbs: &[u64]) -> bool {
    limbs.iter().all(|&limb| limb == 0)
}

/// `limbs *= factor`
pub(crate) fn mul_small(limbs: &mut Vec<u64>, factor: u64) {
    let mut carry: u128 = 0;
    for limb in limbs.iter_mut() {
        let product = u128::from(*limb) * u128::from(factor) + carry;
        *limb = product as u64;
        carry = product >> 64;
    }
    if carry != 0 {
        limbs.push(carry as u64);
    }
}

/// `limbs <<= shift`
pub(crate) fn shl(limbs: &mut Vec<u64>, shift: u64) {
    if is_zero(limbs) {
        return;
    }

    let word_shift = (shift / 64) as usize;
    let bit_shift = (shift % 64) as u32;

    if bit_shift != 0 {
        let mut carry = 0u64;
        for limb in limbs.iter_mut() {
            let next = *limb >> (64 - bit_shift);
            *limb = (*limb << bit_shift) | carry;
            carry = next;
        }
        if carry != 0 {
            limbs.push(carry);
        }
    }

    if word_shift != 0 {
        limbs.splice(0..0, std::iter::repeat_n(0, word_shift));
    }
}

fn bit(limbs: &[u64], index: u64) -> bool {
    let word = (index / 64) as usize;
    limbs
        .get(word)
        .is_some_and(|limb| (limb >> (index % 64)) & 1 == 1)
}

/// Any bit set strictly below `index`?
fn any_bits_below(limbs: &[u64], index: u64) -> bool {
    let full_words = (index / 64) as usize;
    let rest = (index % 64) as u32;

    if limbs.iter().take(full_words).any(|&limb| limb != 0) {
        return true;
    }
    if rest == 0 {
        return false;
    }
    limbs
        .get(full_words)
        .is_some_and(|limb| limb & ((1u64 << rest) - 1) != 0)
}

/// `limbs >> shift`, rounded to nearest with ties to even
pub(crate) fn shr_round_half_even(limbs: &[u64], shift: u64) -> Vec<u64> {
    if shift == 0 {
        let mut result = limbs.to_vec();
        trim(&mut result);
        return result;
    }

    let word_shift = (shift / 64) as usize;
    let bit_shift = (shift % 64) as u32;

    let mut result: Vec<u64> = limbs.iter().skip(word_shift).copied().collect();
    if bit_shift != 0 {
        for i in 0..result.len() {
            let high = result.get(i + 1).copied().unwrap_or(0);
            result[i] = (result[i] >> bit_shift) | (high << (64 - bit_shift));
        }
    }
    trim(&mut result);

    let half_bit = bit(limbs, shift - 1);
    let sticky = any_bits_below(limbs, shift - 1);
    let odd = result.first().is_some_and(|limb| limb & 1 == 1);

    if half_bit && (sticky || odd) {
        add_small(&mut result, 1);
    }
    result
}

fn add_small(limbs: &mut Vec<u64>, addend: u64) {
    let mut carry = addend;
    for limb in limbs.iter_mut() {
        let (sum, overflow) = limb.overflowing_add(carry);
        *limb = sum;
        if !overflow {
            return;
        }
        carry = 1;
    }
    if carry != 0 {
        limbs.push(carry);
    }
}

/// Divide in place by `divisor`, returning the remainder
pub(crate) fn divmod_small(limbs: &mut [u64], divisor: u64) -> u64 {
    let mut remainder: u128 = 0;
    for limb in limbs.iter_mut().rev() {
        let current = (remainder << 64) | u128::from(*limb);
        *limb = (current / u128::from(divisor)) as u64;
        remainder = current % u128::from(divisor);
    }
    remainder as u64
}

/// Render as an unsigned decimal number
pub(crate) fn to_decimal(limbs: &[u64]) -> String {
    let mut work = limbs.to_vec();
    trim(&mut work);
    if work.is_empty() {
        return "0".to_string();
    }

    let mut chunks = Vec::new();
    while !work.is_empty() {
        chunks.push(divmod_small(&mut work, DECIMAL_CHUNK));
        trim(&mut work);
    }

    let mut text = String::with_capacity(chunks.len() * DECIMAL_CHUNK_DIGITS);
    let mut iter = chunks.iter().rev();
    if let Some(first) = iter.next() {
        text.push_str(&first.to_string());
    }
    for chunk in iter {
        text.push_str(&format!("{:0width$}", chunk, width = DECIMAL_CHUNK_DIGITS));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_small_and_zero() {
        assert_eq!(to_decimal(&[]), "0");
        assert_eq!(to_decimal(&[0, 0]), "0");
        assert_eq!(to_decimal(&[42]), "42");
    }

    #[test]
    fn test_decimal_multi_word() {
        assert_eq!(to_decimal(&from_u128(u128::MAX)), u128::MAX.to_string());
        assert_eq!(to_decimal(&[0, 1]), "18446744073709551616");
    }

    #[test]
    fn test_mul_and_shift() {
        let mut limbs = vec![3];
        mul_small(&mut limbs, 1_000_000);
        shl(&mut limbs, 70);
        let expected = 3_000_000u128 << 70;
        assert_eq!(to_decimal(&limbs), expected.to_string());
    }

    #[test]
    fn test_shr_rounds_half_to_even() {
        // 5 / 2 = 2.5 -> 2, 7 / 2 = 3.5 -> 4, 11 / 4 = 2.75 -> 3
        assert_eq!(shr_round_half_even(&[5], 1), vec![2]);
        assert_eq!(shr_round_half_even(&[7], 1), vec![4]);
        assert_eq!(shr_round_half_even(&[11], 2), vec![3]);
        // 9 / 8 = 1.125 -> 1
        assert_eq!(shr_round_half_even(&[9], 3), vec![1]);
    }

    #[test]
    fn test_shr_past_every_bit() {
        assert!(shr_round_half_even(&[u64::MAX], 200).is_empty());
        // Exactly one half rounds to zero (even)
        assert!(shr_round_half_even(&[1], 1).is_empty());
    }

    #[test]
    fn test_shr_across_words() {
        // 2^36 + 0.5 + 2^-64 rounds up
        let value = (1u128 << 100) + (1u128 << 63) + 1;
        let result = shr_round_half_even(&from_u128(value), 64);
        assert_eq!(to_decimal(&result), ((1u128 << 36) + 1).to_string());
    }
}
