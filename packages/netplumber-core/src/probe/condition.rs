//! Probe conditions
//!
//! A condition is evaluated against a [`FlowChain`]: an owned snapshot of a
//! probe flow and its ancestors, taken before the condition runs so that
//! checks never borrow the live graph.

use crate::graph::NodeType;
use netplumber_hs::PacketSet;
use serde_json::{json, Value};
use std::fmt;

/// One flow on the way from a source to a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub node_id: u64,
    pub node_type: NodeType,
    /// Table of a rule hop
    pub table: Option<u32>,
    pub in_port: u32,
    /// The node sits at its table's input layer
    pub at_input_stage: bool,
}

/// Ancestor chain of a probe flow
///
/// `hops[0]` is the flow at the probe; the last hop is the source's root flow.
#[derive(Debug, Clone)]
pub struct FlowChain<P: PacketSet> {
    processed: Option<P>,
    hops: Vec<Hop>,
}

impl<P: PacketSet> FlowChain<P> {
    pub fn new(processed: Option<P>, hops: Vec<Hop>) -> Self {
        Self { processed, hops }
    }

    /// Headers arriving at the probe
    pub fn processed(&self) -> Option<&P> {
        self.processed.as_ref()
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn hop(&self, cursor: usize) -> Option<&Hop> {
        self.hops.get(cursor)
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// The cursor points at the source's root flow (or past the chain)
    pub fn is_root(&self, cursor: usize) -> bool {
        cursor + 1 >= self.hops.len()
    }
}

pub trait Condition<P: PacketSet>: fmt::Display + fmt::Debug + Send {
    fn check(&self, chain: &FlowChain<P>) -> bool;

    /// Widen header operands to `len` bytes
    fn enlarge(&mut self, _len: usize) {}

    fn to_json(&self) -> Value;

    fn boxed(self) -> BoxedCondition<P>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

pub type BoxedCondition<P> = Box<dyn Condition<P>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrueCondition;

impl<P: PacketSet> Condition<P> for TrueCondition {
    fn check(&self, _chain: &FlowChain<P>) -> bool {
        true
    }

    fn to_json(&self) -> Value {
        json!({ "type": "true" })
    }
}

impl fmt::Display for TrueCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Always True")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FalseCondition;

impl<P: PacketSet> Condition<P> for FalseCondition {
    fn check(&self, _chain: &FlowChain<P>) -> bool {
        false
    }

    fn to_json(&self) -> Value {
        json!({ "type": "false" })
    }
}

impl fmt::Display for FalseCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Always False")
    }
}

#[derive(Debug)]
pub struct AndCondition<P: PacketSet> {
    c1: BoxedCondition<P>,
    c2: BoxedCondition<P>,
}

impl<P: PacketSet> AndCondition<P> {
    pub fn new(c1: BoxedCondition<P>, c2: BoxedCondition<P>) -> Self {
        Self { c1, c2 }
    }
}

impl<P: PacketSet> Condition<P> for AndCondition<P> {
    fn check(&self, chain: &FlowChain<P>) -> bool {
        self.c1.check(chain) && self.c2.check(chain)
    }

    fn enlarge(&mut self, len: usize) {
        self.c1.enlarge(len);
        self.c2.enlarge(len);
    }

    fn to_json(&self) -> Value {
        json!({ "type": "and", "arg1": self.c1.to_json(), "arg2": self.c2.to_json() })
    }
}

impl<P: PacketSet> fmt::Display for AndCondition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) & ({})", self.c1, self.c2)
    }
}

#[derive(Debug)]
pub struct OrCondition<P: PacketSet> {
    c1: BoxedCondition<P>,
    c2: BoxedCondition<P>,
}

impl<P: PacketSet> OrCondition<P> {
    pub fn new(c1: BoxedCondition<P>, c2: BoxedCondition<P>) -> Self {
        Self { c1, c2 }
    }
}

impl<P: PacketSet> Condition<P> for OrCondition<P> {
    fn check(&self, chain: &FlowChain<P>) -> bool {
        self.c1.check(chain) || self.c2.check(chain)
    }

    fn enlarge(&mut self, len: usize) {
        self.c1.enlarge(len);
        self.c2.enlarge(len);
    }

    fn to_json(&self) -> Value {
        json!({ "type": "or", "arg1": self.c1.to_json(), "arg2": self.c2.to_json() })
    }
}

impl<P: PacketSet> fmt::Display for OrCondition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) | ({})", self.c1, self.c2)
    }
}

#[derive(Debug)]
pub struct NotCondition<P: PacketSet> {
    c: BoxedCondition<P>,
}

impl<P: PacketSet> NotCondition<P> {
    pub fn new(c: BoxedCondition<P>) -> Self {
        Self { c }
    }
}

impl<P: PacketSet> Condition<P> for NotCondition<P> {
    fn check(&self, chain: &FlowChain<P>) -> bool {
        !self.c.check(chain)
    }

    fn enlarge(&mut self, len: usize) {
        self.c.enlarge(len);
    }

    fn to_json(&self) -> Value {
        json!({ "type": "not", "arg": self.c.to_json() })
    }
}

impl<P: PacketSet> fmt::Display for NotCondition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!({})", self.c)
    }
}

/// Holds when some header reaching the probe lies in `h`
#[derive(Debug)]
pub struct HeaderCondition<P: PacketSet> {
    h: P,
}

impl<P: PacketSet> HeaderCondition<P> {
    pub fn new(h: P) -> Self {
        Self { h }
    }

    pub fn header(&self) -> &P {
        &self.h
    }
}

impl<P: PacketSet> Condition<P> for HeaderCondition<P> {
    fn check(&self, chain: &FlowChain<P>) -> bool {
        let Some(processed) = chain.processed() else {
            return false;
        };
        let mut isect = processed.intersect(&self.h);
        if isect.is_empty() {
            return false;
        }
        isect.unroll();
        !isect.is_empty()
    }

    fn enlarge(&mut self, len: usize) {
        self.h.enlarge(len);
    }

    fn to_json(&self) -> Value {
        json!({ "type": "header", "header": self.h.to_json() })
    }
}

impl<P: PacketSet> fmt::Display for HeaderCondition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "header ~ {}", self.h)
    }
}
