//! Probes and the conditions they evaluate

pub mod condition;
pub mod path;
pub mod source_probe;

pub use condition::{
    AndCondition, BoxedCondition, Condition, FalseCondition, FlowChain, HeaderCondition, Hop,
    NotCondition, OrCondition, TrueCondition,
};
pub use path::{PathCondition, PathSpecifier};
pub(crate) use source_probe::ProbeAction;
pub use source_probe::{
    ProbeCallback, ProbeData, ProbeMode, ProbeReport, ProbeSpec, ProbeState, ProbeTransition,
};
