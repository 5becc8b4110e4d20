//! Header-space set algebra

use super::term::{compact_vectors, Term};
use crate::ternary::TernaryVector;
use serde_json::{json, Value};

/// A set of headers: the union of its terms.
///
/// Structural equality (`==`) compares representations; use
/// [`HeaderSpace::is_equal`] for set equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpace {
    pub(crate) len: usize,
    pub(crate) terms: Vec<Term>,
}

impl HeaderSpace {
    /// The empty set over `len`-byte headers
    pub fn new(len: usize) -> Self {
        Self {
            len,
            terms: Vec::new(),
        }
    }

    /// Every header of `len` bytes
    pub fn universe(len: usize) -> Self {
        Self::from_vector(TernaryVector::all_x(len))
    }

    pub fn from_vector(v: TernaryVector) -> Self {
        let mut hs = Self::new(v.len());
        hs.add_vector(v);
        hs
    }

    pub fn from_terms(len: usize, terms: Vec<Term>) -> Self {
        let mut hs = Self::new(len);
        hs.terms = terms
            .into_iter()
            .filter(|t| !t.vector.has_z())
            .collect();
        hs
    }

    /// Header length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// No terms. Exact emptiness additionally needs [`HeaderSpace::unroll`]
    /// or [`HeaderSpace::compact`].
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Union with one vector; empty vectors are ignored
    pub fn add_vector(&mut self, v: TernaryVector) {
        debug_assert_eq!(v.len(), self.len);
        if !v.has_z() {
            self.terms.push(Term::new(v));
        }
    }

    pub fn union(&mut self, other: &HeaderSpace) {
        debug_assert_eq!(other.len, self.len);
        self.terms.extend(other.terms.iter().cloned());
    }

    pub fn intersect(&self, other: &HeaderSpace) -> HeaderSpace {
        debug_assert_eq!(other.len, self.len);
        let mut out = HeaderSpace::new(self.len);
        for a in &self.terms {
            for b in &other.terms {
                if let Some(t) = a.intersect(b) {
                    out.terms.push(t);
                }
            }
        }
        out
    }

    /// Restrict every term and exclusion to `v`
    pub fn intersect_vector(&mut self, v: &TernaryVector) {
        self.terms = std::mem::take(&mut self.terms)
            .into_iter()
            .filter_map(|t| t.intersect_vector(v))
            .collect();
    }

    /// Subtract `v` lazily by recording it as an exclusion of each term it
    /// overlaps
    pub fn diff_vector(&mut self, v: &TernaryVector) {
        for t in &mut self.terms {
            if let Some(d) = t.vector.intersect(v) {
                t.diff.push(Term::new(d));
            }
        }
    }

    pub fn complement(&self) -> HeaderSpace {
        if self.terms.is_empty() {
            return HeaderSpace::universe(self.len);
        }
        let mut acc: Option<HeaderSpace> = None;
        for term in &self.terms {
            let c = HeaderSpace::from_terms(self.len, term.complement());
            if c.is_empty() {
                return HeaderSpace::new(self.len);
            }
            let mut next = match acc {
                None => c,
                Some(a) => a.intersect(&c),
            };
            if !next.compact(None) {
                return next;
            }
            acc = Some(next);
        }
        acc.unwrap_or_else(|| HeaderSpace::new(self.len))
    }

    /// `self \ other`
    pub fn minus(&self, other: &HeaderSpace) -> HeaderSpace {
        let mut out = self.intersect(&other.complement());
        out.compact(None);
        out
    }

    /// Normalize every term. Returns `false` when nothing survives.
    pub fn compact(&mut self, mask: Option<&TernaryVector>) -> bool {
        self.terms.retain_mut(|t| t.compact(mask));
        !self.terms.is_empty()
    }

    pub fn rewrite(&mut self, mask: &TernaryVector, rw: &TernaryVector) {
        for t in &mut self.terms {
            t.rewrite(mask, rw);
        }
    }

    /// Expand every exclusion into plain terms. The result has no
    /// exclusions and is empty exactly when the set is empty.
    pub fn unroll(&mut self) {
        while self.terms.iter().any(|t| !t.is_leaf()) {
            let mut out = Vec::with_capacity(self.terms.len());
            for term in std::mem::take(&mut self.terms) {
                if term.is_leaf() {
                    out.push(term);
                    continue;
                }
                let Term { vector, diff } = term;
                let mut acc = HeaderSpace::from_vector(vector);
                for d in diff {
                    let excluded = HeaderSpace::from_terms(self.len, vec![d]);
                    acc = acc.intersect(&excluded.complement());
                    if acc.is_empty() {
                        break;
                    }
                }
                out.extend(acc.terms);
            }
            self.terms = out;
        }
    }

    pub fn is_subset_or_equal(&self, other: &HeaderSpace) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let mut rest = self.minus(other);
        rest.unroll();
        rest.is_empty()
    }

    /// Strict subset
    pub fn is_subset(&self, other: &HeaderSpace) -> bool {
        if other.terms.is_empty() {
            return false;
        }
        self.is_subset_or_equal(other) && !other.is_subset_or_equal(self)
    }

    /// Set equality
    pub fn is_equal(&self, other: &HeaderSpace) -> bool {
        if self.terms.is_empty() && other.terms.is_empty() {
            return true;
        }
        self.is_subset_or_equal(other) && other.is_subset_or_equal(self)
    }

    /// Merge and drop positive terms subsumed by plain terms
    pub fn simple_merge(&mut self) {
        let (leaves, nested): (Vec<Term>, Vec<Term>) =
            std::mem::take(&mut self.terms).into_iter().partition(Term::is_leaf);
        let leaves = compact_vectors(leaves.into_iter().map(|t| t.vector).collect(), None);
        let nested: Vec<Term> = nested
            .into_iter()
            .filter(|t| !leaves.iter().any(|l| t.vector.is_subset_or_equal(l)))
            .collect();
        self.terms = leaves.into_iter().map(Term::new).chain(nested).collect();
    }

    pub fn enlarge(&mut self, len: usize) {
        if len <= self.len {
            return;
        }
        self.len = len;
        for t in &mut self.terms {
            t.enlarge(len);
        }
    }

    /// Number of positive terms
    pub fn count(&self) -> usize {
        self.terms.len()
    }

    /// Number of exclusions at every depth
    pub fn count_diff(&self) -> usize {
        self.terms.iter().map(Term::count_diff).sum()
    }

    pub fn to_json(&self) -> Value {
        fn term_json(t: &Term) -> Value {
            if t.is_leaf() {
                json!(t.vector.to_string())
            } else {
                json!({
                    "vector": t.vector.to_string(),
                    "diff": t.diff.iter().map(term_json).collect::<Vec<_>>(),
                })
            }
        }
        json!({
            "len": self.len,
            "list": self.terms.iter().map(term_json).collect::<Vec<_>>(),
        })
    }
}
