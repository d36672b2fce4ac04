//! Fixed-width finger-state bit vector.
//!
//! A `FingerStateVector` holds one bit per finger, packed MSB-first in finger
//! order (thumb, index, middle, ring, little), so the canonical string reads
//! the same way the bits are stored.
//!
//! # Encodings
//! - Digits: `[0, 1, 1, 0, 0]`, as produced by the landmark rule
//! - Canonical string: `"01100"`, digit per finger in the same order
//! - Wire: the complement of the canonical string (see `command`)
//!
//! # Example
//! ```
//! use gesture_link_core::finger::FingerStateVector;
//!
//! let victory = FingerStateVector::from_digits(&[0, 1, 1, 0, 0]).unwrap();
//! assert_eq!(victory.to_canonical_string(), "01100");
//! assert_eq!(victory.complement().to_canonical_string(), "10011");
//! ```

use crate::error::InvalidVectorError;
use std::fmt;
use std::str::FromStr;

/// Number of fingers tracked per hand.
pub const FINGER_COUNT: usize = 5;

const MASK: u8 = (1 << FINGER_COUNT) - 1;

/// A single finger, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    /// All fingers in canonical order.
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    /// Position of this finger in the canonical order.
    pub fn position(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << (FINGER_COUNT - 1 - self.position())
    }
}

/// Which fingers are extended (1) or curled (0).
///
/// # Invariants
/// - Only the low `FINGER_COUNT` bits of `bits` are ever set
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerStateVector {
    bits: u8,
}

impl FingerStateVector {
    /// Every finger extended.
    pub const OPEN: Self = Self { bits: MASK };

    /// Every finger curled.
    pub const CLOSED: Self = Self { bits: 0 };

    /// Build a vector from one 0/1 digit per finger.
    ///
    /// # Errors
    /// - `InvalidVectorError::WrongLength` if `digits.len() != 5`
    /// - `InvalidVectorError::InvalidDigit` for any digit outside {0, 1}
    pub fn from_digits(digits: &[u8]) -> Result<Self, InvalidVectorError> {
        if digits.len() != FINGER_COUNT {
            return Err(InvalidVectorError::WrongLength {
                expected: FINGER_COUNT,
                actual: digits.len(),
            });
        }

        let mut bits = 0u8;
        for (position, &value) in digits.iter().enumerate() {
            match value {
                0 => {}
                1 => bits |= Finger::ALL[position].bit(),
                _ => return Err(InvalidVectorError::InvalidDigit { position, value }),
            }
        }

        Ok(Self { bits })
    }

    /// Build a vector from per-finger extension flags.
    pub fn from_fingers(extended: [bool; FINGER_COUNT]) -> Self {
        let bits = Finger::ALL
            .iter()
            .zip(extended)
            .filter(|(_, up)| *up)
            .fold(0, |acc, (finger, _)| acc | finger.bit());
        Self { bits }
    }

    /// Digits in canonical order.
    pub fn digits(&self) -> [u8; FINGER_COUNT] {
        Finger::ALL.map(|finger| u8::from(self.is_extended(finger)))
    }

    /// Whether `finger` is extended.
    pub fn is_extended(&self, finger: Finger) -> bool {
        self.bits & finger.bit() != 0
    }

    /// Number of extended fingers.
    pub fn extended_count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Canonical 5-character form, e.g. `"01100"`.
    pub fn to_canonical_string(&self) -> String {
        Finger::ALL
            .iter()
            .map(|&finger| if self.is_extended(finger) { '1' } else { '0' })
            .collect()
    }

    /// Flip every digit.
    ///
    /// The remote actuator drives a servo open on `0`, so commands carry the
    /// complement of the observed pose.
    pub fn complement(&self) -> Self {
        Self {
            bits: !self.bits & MASK,
        }
    }
}

impl FromStr for FingerStateVector {
    type Err = InvalidVectorError;

    /// Parse the canonical string form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let count = s.chars().count();
        if count != FINGER_COUNT {
            return Err(InvalidVectorError::WrongLength {
                expected: FINGER_COUNT,
                actual: count,
            });
        }

        let mut digits = [0u8; FINGER_COUNT];
        for (position, ch) in s.chars().enumerate() {
            digits[position] = match ch {
                '0' => 0,
                '1' => 1,
                value => return Err(InvalidVectorError::InvalidChar { position, value }),
            };
        }

        Self::from_digits(&digits)
    }
}

impl fmt::Display for FingerStateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl fmt::Debug for FingerStateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FingerStateVector({})", self.to_canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_digits_canonical_order() {
        let v = FingerStateVector::from_digits(&[1, 0, 0, 0, 1]).unwrap();
        assert!(v.is_extended(Finger::Thumb));
        assert!(!v.is_extended(Finger::Index));
        assert!(v.is_extended(Finger::Little));
        assert_eq!(v.to_canonical_string(), "10001");
        assert_eq!(v.digits(), [1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_from_digits_wrong_length() {
        assert_eq!(
            FingerStateVector::from_digits(&[1, 0, 1]),
            Err(InvalidVectorError::WrongLength {
                expected: 5,
                actual: 3
            })
        );
        assert!(FingerStateVector::from_digits(&[]).is_err());
        assert!(FingerStateVector::from_digits(&[0; 6]).is_err());
    }

    #[test]
    fn test_from_digits_invalid_digit() {
        assert_eq!(
            FingerStateVector::from_digits(&[0, 1, 2, 0, 0]),
            Err(InvalidVectorError::InvalidDigit {
                position: 2,
                value: 2
            })
        );
    }

    #[test]
    fn test_complement() {
        assert_eq!(FingerStateVector::OPEN.complement(), FingerStateVector::CLOSED);
        let v: FingerStateVector = "11000".parse().unwrap();
        assert_eq!(v.complement().to_string(), "00111");
    }

    #[test]
    fn test_parse_rejects_bad_text() {
        assert!(matches!(
            "01a00".parse::<FingerStateVector>(),
            Err(InvalidVectorError::InvalidChar { position: 2, value: 'a' })
        ));
        assert!(matches!(
            "0110".parse::<FingerStateVector>(),
            Err(InvalidVectorError::WrongLength { actual: 4, .. })
        ));
    }

    #[test]
    fn test_from_fingers() {
        let v = FingerStateVector::from_fingers([false, true, true, false, false]);
        assert_eq!(v.to_string(), "01100");
        assert_eq!(v.extended_count(), 2);
    }

    proptest! {
        #[test]
        fn prop_complement_is_involution(bits in 0u8..32) {
            let digits: Vec<u8> = (0..FINGER_COUNT).map(|i| (bits >> (4 - i)) & 1).collect();
            let v = FingerStateVector::from_digits(&digits).unwrap();
            prop_assert_eq!(v.complement().complement(), v);
            prop_assert_ne!(v.complement(), v);
        }

        #[test]
        fn prop_canonical_string_parses_back(bits in 0u8..32) {
            let digits: Vec<u8> = (0..FINGER_COUNT).map(|i| (bits >> (4 - i)) & 1).collect();
            let v = FingerStateVector::from_digits(&digits).unwrap();
            let text = v.to_canonical_string();
            prop_assert_eq!(text.len(), FINGER_COUNT);
            prop_assert_eq!(text.parse::<FingerStateVector>().unwrap(), v);
        }
    }
}
