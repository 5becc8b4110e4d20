//! Network graph storage
//!
//! Nodes, pipes, influences and flows live in separate arenas and refer to
//! each other by typed handles. Removing a value never leaves a dangling
//! reference behind: stale handles simply stop resolving.

pub mod arena;
pub mod flow;
pub mod node;
pub mod relations;

pub use arena::{Arena, Handle};
pub use flow::Flow;
pub use node::{Node, NodeKind, NodeType, RuleData};
pub use relations::{Influence, Pipeline};

/// Handle markers
#[derive(Debug)]
pub enum NodeTag {}
#[derive(Debug)]
pub enum FlowTag {}
#[derive(Debug)]
pub enum PipeTag {}
#[derive(Debug)]
pub enum InfluenceTag {}

pub type NodeKey = Handle<NodeTag>;
pub type FlowId = Handle<FlowTag>;
pub type PipeKey = Handle<PipeTag>;
pub type InfluenceKey = Handle<InfluenceTag>;
