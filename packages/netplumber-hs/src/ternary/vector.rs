//! Packed ternary vector storage, text form and predicates

use super::trit::Trit;
use crate::error::{HsError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Trits per byte of header
pub const TRITS_PER_BYTE: usize = 8;
/// Trits packed into one `u64`
pub const TRITS_PER_WORD: usize = 32;

/// The "may be 0" bit of every trit pair
pub(crate) const ODD: u64 = 0x5555_5555_5555_5555;
/// The "may be 1" bit of every trit pair
pub(crate) const EVEN: u64 = 0xaaaa_aaaa_aaaa_aaaa;

/// A fixed-width wildcard header pattern.
///
/// `len` counts header bytes; every byte is eight trits. Trit `i` lives in
/// word `i / 32` at bit offset `2 * (i % 32)`. Trits past the end of the
/// header are kept at `x` so whole-word operations never see a spurious
/// conflict.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TernaryVector {
    pub(crate) len: usize,
    pub(crate) words: Vec<u64>,
}

#[inline]
pub(crate) fn words_for(len: usize) -> usize {
    (len * TRITS_PER_BYTE).div_ceil(TRITS_PER_WORD)
}

impl TernaryVector {
    /// Vector of `len` bytes with every trit set to `fill`
    pub fn new(len: usize, fill: Trit) -> Self {
        let pattern = match fill {
            Trit::Conflict => 0,
            Trit::Zero => ODD,
            Trit::One => EVEN,
            Trit::Wild => u64::MAX,
        };
        let mut v = Self {
            len,
            words: vec![pattern; words_for(len)],
        };
        v.fix_tail();
        v
    }

    /// The universal pattern: every trit is `x`
    pub fn all_x(len: usize) -> Self {
        Self::new(len, Trit::Wild)
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of trits
    #[inline]
    pub fn trits(&self) -> usize {
        self.len * TRITS_PER_BYTE
    }

    pub fn get(&self, index: usize) -> Trit {
        debug_assert!(index < self.trits(), "trit index out of range");
        let word = self.words[index / TRITS_PER_WORD];
        Trit::from_bits(word >> (2 * (index % TRITS_PER_WORD)))
    }

    pub fn set(&mut self, index: usize, trit: Trit) {
        debug_assert!(index < self.trits(), "trit index out of range");
        let shift = 2 * (index % TRITS_PER_WORD);
        let word = &mut self.words[index / TRITS_PER_WORD];
        *word = (*word & !(0b11 << shift)) | (trit.bits() << shift);
    }

    pub fn iter(&self) -> impl Iterator<Item = Trit> + '_ {
        (0..self.trits()).map(move |i| self.get(i))
    }

    /// Bits of word `i` that belong to real trits
    #[inline]
    pub(crate) fn used_mask(&self, i: usize) -> u64 {
        let used = self.trits() - i * TRITS_PER_WORD;
        if used >= TRITS_PER_WORD {
            u64::MAX
        } else {
            (1u64 << (2 * used)) - 1
        }
    }

    /// Re-establish `x` padding after the last trit
    #[inline]
    pub(crate) fn fix_tail(&mut self) {
        if let Some(last) = self.words.len().checked_sub(1) {
            let mask = self.used_mask(last);
            self.words[last] |= !mask;
        }
    }

    /// Any trit is `x`
    pub fn has_x(&self) -> bool {
        self.words
            .iter()
            .enumerate()
            .any(|(i, &w)| w & (w >> 1) & ODD & self.used_mask(i) != 0)
    }

    /// Any trit is `z`; such a vector denotes the empty set
    pub fn has_z(&self) -> bool {
        self.words.iter().any(|&w| {
            let n = !w;
            n & (n >> 1) & ODD != 0
        })
    }

    /// Number of `x` trits
    pub fn count_x(&self) -> usize {
        self.words
            .iter()
            .enumerate()
            .map(|(i, &w)| (w & (w >> 1) & ODD & self.used_mask(i)).count_ones() as usize)
            .sum()
    }

    /// Every trit is `x`
    pub fn is_all_x(&self) -> bool {
        self.words.iter().all(|&w| w == u64::MAX)
    }

    /// Grow to `len` bytes, padding new trits with `x`
    pub fn enlarge(&mut self, len: usize) {
        self.enlarge_with(len, Trit::Wild);
    }

    /// Grow to `len` bytes, padding new trits with `fill`. Never shrinks.
    pub fn enlarge_with(&mut self, len: usize, fill: Trit) {
        if len <= self.len {
            return;
        }
        let old_trits = self.trits();
        self.len = len;
        self.words.resize(words_for(len), u64::MAX);
        self.fix_tail();
        if fill != Trit::Wild {
            for i in old_trits..self.trits() {
                self.set(i, fill);
            }
        }
    }

    /// Parse the text form, e.g. `"1xxxxxxx,0000x001"`
    pub fn parse(text: &str) -> Result<Self> {
        let mut trits = Vec::with_capacity(text.len());
        for (pos, c) in text.chars().enumerate() {
            if c == ',' || c == ' ' {
                continue;
            }
            match Trit::from_char(c) {
                Some(t) => trits.push(t),
                None => return Err(HsError::bad_char(c, pos)),
            }
        }
        if trits.len() % TRITS_PER_BYTE != 0 {
            return Err(HsError::parse(format!(
                "vector '{}' has {} trits, not a whole number of bytes",
                text,
                trits.len()
            )));
        }
        let mut v = Self::all_x(trits.len() / TRITS_PER_BYTE);
        for (i, t) in trits.into_iter().enumerate() {
            v.set(i, t);
        }
        Ok(v)
    }
}

impl fmt::Display for TernaryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.trits() {
            if i > 0 && i % TRITS_PER_BYTE == 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for TernaryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TernaryVector({})", self)
    }
}

impl FromStr for TernaryVector {
    type Err = HsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TernaryVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TernaryVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
