//! Fixed-width binary digits and the conversions to and from them.

use crate::error::{ClockError, Result};

/// The widest digit a `BinaryDigit` can hold.
pub const MAX_BITS: u8 = 6;

/// One decimal digit encoded as an MSB-first bit array.
///
/// A `BinaryDigit` is only ever built by [`convert_to_binary`], so it always
/// has a `bit_count` in `1..=6`, bits past `bit_count` are always clear, and
/// `decimal_value` always matches what the bits encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryDigit {
    bit_count: u8,
    bits: [bool; MAX_BITS as usize],
    decimal_value: u8,
}

impl BinaryDigit {
    /// Number of significant bits.
    pub fn bit_count(&self) -> u8 {
        self.bit_count
    }

    /// The significant bits, most significant first.
    pub fn bits(&self) -> &[bool] {
        &self.bits[..self.bit_count as usize]
    }

    /// The value encoded in the bits.
    pub fn decimal_value(&self) -> u8 {
        self.decimal_value
    }

    /// Whether bit `index` (0 = MSB) is set. Out-of-range indexes read as clear.
    pub fn is_set(&self, index: usize) -> bool {
        index < self.bit_count as usize && self.bits[index]
    }

    /// The significant bits as 0/1 integers, most significant first.
    pub fn bit_values(&self) -> impl Iterator<Item = u8> + '_ {
        self.bits().iter().map(|&bit| u8::from(bit))
    }
}

/// Encodes `value` into a `bit_count`-wide digit.
///
/// Values that do not fit are truncated to their low `bit_count` bits rather
/// than rejected: `convert_to_binary(10, 3)` encodes `2`.
pub fn convert_to_binary(value: u8, bit_count: u8) -> Result<BinaryDigit> {
    if !(1..=MAX_BITS).contains(&bit_count) {
        return Err(ClockError::InvalidBitCount(bit_count));
    }

    let mask = (1u8 << bit_count) - 1;
    let value = value & mask;

    let mut bits = [false; MAX_BITS as usize];
    for (i, bit) in bits.iter_mut().take(bit_count as usize).enumerate() {
        *bit = (value >> (bit_count as usize - 1 - i)) & 1 == 1;
    }

    Ok(BinaryDigit {
        bit_count,
        bits,
        decimal_value: value,
    })
}

/// Reads the value back out of a digit's bits.
pub fn convert_from_binary(digit: &BinaryDigit) -> u8 {
    digit
        .bits()
        .iter()
        .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(digit: &BinaryDigit) -> Vec<u8> {
        digit.bit_values().collect()
    }

    #[test]
    fn test_round_trip_every_width() {
        for bit_count in 1..=MAX_BITS {
            for value in 0..(1u8 << bit_count) {
                let digit = convert_to_binary(value, bit_count).unwrap();
                assert_eq!(convert_from_binary(&digit), value);
                assert_eq!(digit.decimal_value(), value);
                assert_eq!(digit.bit_count(), bit_count);
            }
        }
    }

    #[test]
    fn test_msb_first_ordering() {
        let digit = convert_to_binary(4, 4).unwrap();
        assert_eq!(bits_of(&digit), vec![0, 1, 0, 0]);

        let digit = convert_to_binary(1, 3).unwrap();
        assert_eq!(bits_of(&digit), vec![0, 0, 1]);
    }

    // Oversized values wrap silently to the low bits; this is the intended
    // policy, not an error path.
    #[test]
    fn test_oversized_value_is_truncated() {
        let digit = convert_to_binary(10, 3).unwrap();
        assert_eq!(digit.decimal_value(), 2);
        assert_eq!(bits_of(&digit), vec![0, 1, 0]);

        let digit = convert_to_binary(255, 6).unwrap();
        assert_eq!(digit.decimal_value(), 63);

        let digit = convert_to_binary(16, 4).unwrap();
        assert_eq!(digit.decimal_value(), 0);
    }

    #[test]
    fn test_invalid_bit_counts_are_rejected() {
        assert_eq!(
            convert_to_binary(1, 0),
            Err(ClockError::InvalidBitCount(0))
        );
        assert_eq!(
            convert_to_binary(1, 7),
            Err(ClockError::InvalidBitCount(7))
        );
    }

    #[test]
    fn test_unused_bits_stay_clear() {
        let digit = convert_to_binary(7, 3).unwrap();
        assert!(digit.is_set(0) && digit.is_set(1) && digit.is_set(2));
        assert!(!digit.is_set(3));
        assert!(!digit.is_set(5));
        assert_eq!(digit.bits().len(), 3);
    }
}
