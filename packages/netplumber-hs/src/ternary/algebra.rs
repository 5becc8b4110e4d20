//! Set algebra over single ternary vectors
//!
//! All operations work word-at-a-time on the packed two-bit encoding.
//! Operands must have the same length; mismatches are programming errors.

use super::vector::{TernaryVector, EVEN, ODD};

/// Outcome of [`TernaryVector::combine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combined {
    /// Keep the first operand in the list
    pub keep_a: bool,
    /// Keep the second operand in the list
    pub keep_b: bool,
    /// A merged vector to append
    pub extra: Option<TernaryVector>,
}

impl Combined {
    fn keep_both() -> Self {
        Self {
            keep_a: true,
            keep_b: true,
            extra: None,
        }
    }
}

/// Pairs that are exactly `01`
#[inline]
fn has_zero_pair(w: u64) -> bool {
    (w & ODD) & !((w >> 1) & ODD) != 0
}

/// Pairs that are exactly `10`
#[inline]
fn has_one_pair(w: u64) -> bool {
    has_zero_pair(!w)
}

#[inline]
fn wildcard_bits(b: u64) -> u64 {
    (b & (b << 1) & EVEN) | (b & (b >> 1) & ODD)
}

impl TernaryVector {
    #[inline]
    fn check_len(&self, other: &TernaryVector) {
        debug_assert_eq!(self.len, other.len, "ternary vector length mismatch");
    }

    /// `a ∩ b`, or `None` when the result is empty
    pub fn intersect(&self, other: &TernaryVector) -> Option<TernaryVector> {
        self.check_len(other);
        let words: Vec<u64> = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| a & b)
            .collect();
        let res = TernaryVector {
            len: self.len,
            words,
        };
        if res.has_z() {
            None
        } else {
            Some(res)
        }
    }

    /// Disjoint vectors whose union is the complement of `self`.
    ///
    /// Term `k` keeps the concrete trits before position `k`, flips trit
    /// `k` and leaves the rest wild. An empty input complements to the
    /// universe and the universe complements to nothing.
    pub fn complement(&self) -> Vec<TernaryVector> {
        if self.has_z() {
            return vec![TernaryVector::all_x(self.len)];
        }
        let mut out = Vec::new();
        let mut prefix = TernaryVector::all_x(self.len);
        for i in 0..self.trits() {
            let t = self.get(i);
            if !t.is_concrete() {
                continue;
            }
            let mut term = prefix.clone();
            term.set(i, t.flip());
            out.push(term);
            prefix.set(i, t);
        }
        out
    }

    /// `cover(self) ⊆ cover(other)`. An empty vector is a subset of anything.
    pub fn is_subset_or_equal(&self, other: &TernaryVector) -> bool {
        self.check_len(other);
        if self.has_z() {
            return true;
        }
        self.words.iter().zip(&other.words).all(|(&a, &b)| {
            let diff = a ^ b;
            diff & !wildcard_bits(b) == 0
        })
    }

    /// Strict subset
    pub fn is_subset(&self, other: &TernaryVector) -> bool {
        match (self.has_z(), other.has_z()) {
            (true, true) => false,
            (false, true) => false,
            (true, false) => true,
            (false, false) => self != other && self.is_subset_or_equal(other),
        }
    }

    /// Vector covering exactly `self ∪ other`, if one exists.
    ///
    /// Succeeds only when the operands agree everywhere except for at most
    /// one trit that is `0` in one and `1` in the other.
    pub fn merge(&self, other: &TernaryVector) -> Option<TernaryVector> {
        self.check_len(other);
        if self.has_z() || other.has_z() {
            return None;
        }
        let mut cnt = 0u32;
        let mut words = Vec::with_capacity(self.words.len());
        for (&a, &b) in self.words.iter().zip(&other.words) {
            let diff = a ^ b;
            if has_zero_pair(diff) || has_one_pair(diff) {
                return None;
            }
            words.push((a & b) | diff);
            cnt += (diff & (diff << 1) & EVEN).count_ones();
        }
        let res = TernaryVector {
            len: self.len,
            words,
        };
        if res.has_z() || cnt > 1 {
            return None;
        }
        Some(res)
    }

    /// Decide how two list members can be simplified.
    ///
    /// Empty operands are dropped, subsumed operands are dropped and
    /// adjacent operands are merged. With a `mask`, merges on trits the
    /// mask rewrites (mask trit `1`) are refused.
    pub fn combine(&self, other: &TernaryVector, mask: Option<&TernaryVector>) -> Combined {
        self.check_len(other);
        let (a_empty, b_empty) = (self.has_z(), other.has_z());
        if a_empty || b_empty {
            return Combined {
                keep_a: !a_empty,
                keep_b: !b_empty,
                extra: None,
            };
        }
        if self == other || other.is_subset_or_equal(self) {
            return Combined {
                keep_a: true,
                keep_b: false,
                extra: None,
            };
        }
        if self.is_subset_or_equal(other) {
            return Combined {
                keep_a: false,
                keep_b: true,
                extra: None,
            };
        }
        if let Some(mask) = mask {
            let rewritten = self
                .words
                .iter()
                .zip(&other.words)
                .zip(&mask.words)
                .any(|((&a, &b), &m)| {
                    let diff = a ^ b;
                    diff & (diff << 1) & EVEN & m != 0
                });
            if rewritten {
                return Combined::keep_both();
            }
        }
        let Some(merged) = self.merge(other) else {
            return Combined::keep_both();
        };
        let a_inside = self.is_subset(&merged);
        let b_inside = other.is_subset(&merged);
        Combined {
            keep_a: !a_inside,
            keep_b: !b_inside,
            extra: Some(merged),
        }
    }

    /// Apply a rewrite in place: mask trit `1` takes the trit from `rw`,
    /// mask trit `0` keeps the current one.
    ///
    /// Returns the number of `x` trits that the rewrite overwrote.
    pub fn rewrite(&mut self, mask: &TernaryVector, rw: &TernaryVector) -> usize {
        self.check_len(mask);
        self.check_len(rw);
        let mut count = 0usize;
        for i in 0..self.words.len() {
            let (a, m, r) = (self.words[i], mask.words[i], rw.words[i]);
            count += (a & (a << 1) & m & EVEN & self.used_mask(i)).count_ones() as usize;
            let masked_a = (a & m & ODD) | (a & (m << 1) & EVEN);
            let masked_rw = (r & (m >> 1) & ODD) | (r & m & EVEN);
            self.words[i] = masked_a | masked_rw;
        }
        self.fix_tail();
        count
    }

    /// Remove one bit from `self` if exactly one bit of it falls outside `diff`.
    ///
    /// Returns how many bits of `self` are not in `diff`: `0` means
    /// `self ⊆ diff`, `1` means `self` was narrowed to `self \ diff`.
    pub fn one_bit_subtract(&mut self, diff: &TernaryVector) -> usize {
        self.check_len(diff);
        let mut total = 0usize;
        let mut hit = None;
        for (i, (&p, &d)) in self.words.iter().zip(&diff.words).enumerate() {
            let c = p & !d;
            let n = c.count_ones() as usize;
            if n > 0 {
                hit = Some((i, c));
            }
            total += n;
        }
        if total == 1 {
            if let Some((i, c)) = hit {
                if c & EVEN != 0 {
                    self.words[i] &= !(c >> 1);
                } else {
                    self.words[i] &= !(c << 1);
                }
            }
        }
        total
    }

    /// Trit-wise logical AND
    pub fn and(&self, other: &TernaryVector) -> TernaryVector {
        self.check_len(other);
        let words = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(&a, &b)| ((a | b) & ODD) | (a & b & EVEN))
            .collect();
        TernaryVector {
            len: self.len,
            words,
        }
    }

    /// Trit-wise logical NOT
    pub fn not(&self) -> TernaryVector {
        let words = self
            .words
            .iter()
            .map(|&w| ((w >> 1) & ODD) | ((w << 1) & EVEN))
            .collect();
        TernaryVector {
            len: self.len,
            words,
        }
    }
}
