//! Capability interface for flow header sets
//!
//! The propagation engine is generic over this trait so that a different
//! set representation can stand in for [`HeaderSpace`]. Match, mask and
//! rewrite values stay concrete [`TernaryVector`]s.

use crate::error::Result;
use crate::header_space::HeaderSpace;
use crate::ternary::TernaryVector;
use std::fmt;

pub trait PacketSet: Clone + fmt::Debug + fmt::Display + Send + 'static {
    /// The empty set over `len`-byte headers
    fn empty(len: usize) -> Self;
    fn universe(len: usize) -> Self;
    fn from_vector(v: TernaryVector) -> Self;
    /// Parse the text form at a fixed width
    fn parse(text: &str, len: usize) -> Result<Self>;

    /// Header length in bytes
    fn length(&self) -> usize;
    fn is_empty(&self) -> bool;

    fn add_vector(&mut self, v: TernaryVector);
    fn union(&mut self, other: &Self);
    fn intersect(&self, other: &Self) -> Self;
    fn intersect_vector(&mut self, v: &TernaryVector);
    fn minus(&self, other: &Self) -> Self;
    fn diff_vector(&mut self, v: &TernaryVector);
    fn complement(&self) -> Self;

    fn rewrite(&mut self, mask: &TernaryVector, rw: &TernaryVector);
    /// Normalize; `false` means the set is empty
    fn compact(&mut self, mask: Option<&TernaryVector>) -> bool;
    fn unroll(&mut self);
    /// Cheap normalization of an aggregate built from plain vectors
    fn simple_merge(&mut self);
    fn enlarge(&mut self, len: usize);

    fn is_subset_or_equal(&self, other: &Self) -> bool;
    fn is_subset(&self, other: &Self) -> bool;
    fn is_equal(&self, other: &Self) -> bool;

    /// Positive terms
    fn count(&self) -> usize;
    /// Exclusions
    fn count_diff(&self) -> usize;
    fn to_json(&self) -> serde_json::Value;
}

impl PacketSet for HeaderSpace {
    fn empty(len: usize) -> Self {
        HeaderSpace::new(len)
    }

    fn universe(len: usize) -> Self {
        HeaderSpace::universe(len)
    }

    fn from_vector(v: TernaryVector) -> Self {
        HeaderSpace::from_vector(v)
    }

    fn parse(text: &str, len: usize) -> Result<Self> {
        HeaderSpace::parse(text, len)
    }

    fn length(&self) -> usize {
        self.len()
    }

    fn is_empty(&self) -> bool {
        HeaderSpace::is_empty(self)
    }

    fn add_vector(&mut self, v: TernaryVector) {
        HeaderSpace::add_vector(self, v)
    }

    fn union(&mut self, other: &Self) {
        HeaderSpace::union(self, other)
    }

    fn intersect(&self, other: &Self) -> Self {
        HeaderSpace::intersect(self, other)
    }

    fn intersect_vector(&mut self, v: &TernaryVector) {
        HeaderSpace::intersect_vector(self, v)
    }

    fn minus(&self, other: &Self) -> Self {
        HeaderSpace::minus(self, other)
    }

    fn diff_vector(&mut self, v: &TernaryVector) {
        HeaderSpace::diff_vector(self, v)
    }

    fn complement(&self) -> Self {
        HeaderSpace::complement(self)
    }

    fn rewrite(&mut self, mask: &TernaryVector, rw: &TernaryVector) {
        HeaderSpace::rewrite(self, mask, rw)
    }

    fn compact(&mut self, mask: Option<&TernaryVector>) -> bool {
        HeaderSpace::compact(self, mask)
    }

    fn unroll(&mut self) {
        HeaderSpace::unroll(self)
    }

    fn simple_merge(&mut self) {
        HeaderSpace::simple_merge(self)
    }

    fn enlarge(&mut self, len: usize) {
        HeaderSpace::enlarge(self, len)
    }

    fn is_subset_or_equal(&self, other: &Self) -> bool {
        HeaderSpace::is_subset_or_equal(self, other)
    }

    fn is_subset(&self, other: &Self) -> bool {
        HeaderSpace::is_subset(self, other)
    }

    fn is_equal(&self, other: &Self) -> bool {
        HeaderSpace::is_equal(self, other)
    }

    fn count(&self) -> usize {
        HeaderSpace::count(self)
    }

    fn count_diff(&self) -> usize {
        HeaderSpace::count_diff(self)
    }

    fn to_json(&self) -> serde_json::Value {
        HeaderSpace::to_json(self)
    }
}
