//! One positive pattern with nested exclusions

use crate::ternary::TernaryVector;
use std::collections::VecDeque;

/// `cover(vector) \ ⋃ cover(diff[i])`, where each exclusion is itself a
/// term with its own exclusions.
///
/// Every exclusion is kept inside the positive vector it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub vector: TernaryVector,
    pub diff: Vec<Term>,
}

impl Term {
    pub fn new(vector: TernaryVector) -> Self {
        Self {
            vector,
            diff: Vec::new(),
        }
    }

    /// No exclusions
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.diff.is_empty()
    }

    /// Restrict the term and all of its exclusions to `v`
    pub fn intersect_vector(&self, v: &TernaryVector) -> Option<Term> {
        let vector = self.vector.intersect(v)?;
        let diff = self
            .diff
            .iter()
            .filter_map(|d| d.intersect_vector(&vector))
            .collect();
        Some(Term { vector, diff })
    }

    /// `(A \ Da) ∩ (B \ Db) = (A ∩ B) \ (Da ∪ Db)`, with both exclusion
    /// lists clipped to the new positive vector.
    pub fn intersect(&self, other: &Term) -> Option<Term> {
        let vector = self.vector.intersect(&other.vector)?;
        let diff = self
            .diff
            .iter()
            .chain(&other.diff)
            .filter_map(|d| d.intersect_vector(&vector))
            .collect();
        Some(Term { vector, diff })
    }

    /// Terms whose union is the complement of this term:
    /// `¬(V \ D) = ¬V ∪ D`.
    pub fn complement(&self) -> Vec<Term> {
        let mut out: Vec<Term> = self.vector.complement().into_iter().map(Term::new).collect();
        out.extend(self.diff.iter().cloned());
        out
    }

    /// Normalize the exclusions until nothing changes. Returns `false` when
    /// the term is empty.
    pub fn compact(&mut self, mask: Option<&TernaryVector>) -> bool {
        loop {
            let before = self.clone();
            if !self.compact_once(mask) {
                return false;
            }
            if *self == before {
                return true;
            }
        }
    }

    fn compact_once(&mut self, mask: Option<&TernaryVector>) -> bool {
        compact_leaves(&mut self.diff, mask);
        self.diff.retain_mut(|d| d.compact(mask));

        let mut j = 0;
        while j < self.diff.len() {
            if !self.diff[j].is_leaf() {
                j += 1;
                continue;
            }
            match self.vector.one_bit_subtract(&self.diff[j].vector) {
                0 => return false,
                1 => {
                    self.diff.swap_remove(j);
                    let pos = &self.vector;
                    self.diff = std::mem::take(&mut self.diff)
                        .into_iter()
                        .filter_map(|d| d.intersect_vector(pos))
                        .collect();
                    j = 0;
                }
                _ => j += 1,
            }
        }
        true
    }

    /// Rewrite the term. An exclusion survives only if the rewrite
    /// overwrote as many wildcards in it as in its parent.
    pub fn rewrite(&mut self, mask: &TernaryVector, rw: &TernaryVector) -> usize {
        let n = self.vector.rewrite(mask, rw);
        self.diff.retain_mut(|d| d.rewrite(mask, rw) == n);
        n
    }

    pub fn enlarge(&mut self, len: usize) {
        self.vector.enlarge(len);
        for d in &mut self.diff {
            d.enlarge(len);
        }
    }

    /// Exclusions at every depth
    pub fn count_diff(&self) -> usize {
        self.diff.iter().map(|d| 1 + d.count_diff()).sum()
    }
}

/// Pairwise-combine the leaf members of `list`, dropping empty and
/// subsumed ones and merging adjacent ones. Terms with exclusions are
/// left alone.
pub(crate) fn compact_leaves(list: &mut Vec<Term>, mask: Option<&TernaryVector>) {
    if list.len() < 2 {
        list.retain(|t| !t.vector.has_z());
        return;
    }
    let (leaves, nested): (Vec<Term>, Vec<Term>) =
        std::mem::take(list).into_iter().partition(Term::is_leaf);
    let vectors = compact_vectors(leaves.into_iter().map(|t| t.vector).collect(), mask);
    list.extend(vectors.into_iter().map(Term::new));
    list.extend(nested);
}

pub(crate) fn compact_vectors(
    input: Vec<TernaryVector>,
    mask: Option<&TernaryVector>,
) -> Vec<TernaryVector> {
    let mut pending: VecDeque<TernaryVector> =
        input.into_iter().filter(|v| !v.has_z()).collect();
    let mut out: Vec<TernaryVector> = Vec::with_capacity(pending.len());

    'next: while let Some(v) = pending.pop_front() {
        let mut k = 0;
        while k < out.len() {
            let c = out[k].combine(&v, mask);
            if let Some(extra) = c.extra {
                pending.push_back(extra);
            }
            if !c.keep_a {
                out.remove(k);
            } else {
                k += 1;
            }
            if !c.keep_b {
                continue 'next;
            }
        }
        out.push(v);
    }
    out
}
