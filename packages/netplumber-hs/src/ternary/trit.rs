//! Single ternary header bit

use serde::{Deserialize, Serialize};
use std::fmt;

/// One header bit in ternary form.
///
/// The two-bit encoding is `low = may be 0`, `high = may be 1`, so a
/// wildcard has both bits set and a conflict (empty) has neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Trit {
    /// No value possible (`z`)
    Conflict = 0b00,
    /// `0`
    Zero = 0b01,
    /// `1`
    One = 0b10,
    /// Either value (`x`)
    Wild = 0b11,
}

impl Trit {
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0b00 => Trit::Conflict,
            0b01 => Trit::Zero,
            0b10 => Trit::One,
            _ => Trit::Wild,
        }
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self as u64
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Trit::Zero),
            '1' => Some(Trit::One),
            'x' | 'X' => Some(Trit::Wild),
            'z' | 'Z' => Some(Trit::Conflict),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Trit::Conflict => 'z',
            Trit::Zero => '0',
            Trit::One => '1',
            Trit::Wild => 'x',
        }
    }

    /// `0` and `1` are concrete; `x` and `z` are not
    #[inline]
    pub fn is_concrete(self) -> bool {
        matches!(self, Trit::Zero | Trit::One)
    }

    /// Logical negation; wildcard and conflict map to themselves
    pub fn flip(self) -> Self {
        match self {
            Trit::Zero => Trit::One,
            Trit::One => Trit::Zero,
            other => other,
        }
    }
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
