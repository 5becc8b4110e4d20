//! The NetPlumber instance
//!
//! Holds the network (tables, rules, links, sources, probes) and keeps the
//! flows of every source up to date as the network changes. All mutations
//! take `&mut self` and finish propagating before they return.

mod export;
mod links;
mod sources;
mod stats;
mod tables;

pub use stats::{FlowStats, PipeStats};
pub use tables::rule_id;

use crate::callbacks::{
    AnomalyReport, BlackholeReport, Callbacks, LoopReport, ShadowReport, UnreachableReport,
};
use crate::config::{PlumberConfig, Validatable};
use crate::engine::PropagationBudget;
use crate::errors::{PlumberError, Result};
use crate::events::{Event, EventKind};
use crate::graph::{
    Arena, Flow, FlowTag, Influence, InfluenceTag, Node, NodeKey, NodeTag, PipeKey, PipeTag,
    Pipeline,
};
use crate::shared::PortList;
use netplumber_hs::{HeaderSpace, PacketSet, TernaryVector};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// A rule table: its boundary ports and its rules by index
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub(crate) ports: PortList,
    pub(crate) rules: BTreeMap<u32, NodeKey>,
}

#[derive(Debug)]
pub struct NetPlumber<P: PacketSet = HeaderSpace> {
    /// Header length in bytes
    pub(crate) length: usize,
    pub(crate) config: PlumberConfig,

    pub(crate) nodes: Arena<NodeTag, Node<P>>,
    pub(crate) flows: Arena<FlowTag, Flow<P>>,
    pub(crate) pipes: Arena<PipeTag, Pipeline>,
    pub(crate) influences: Arena<InfluenceTag, Influence>,
    pub(crate) id_to_node: FxHashMap<u64, NodeKey>,

    /// Output port -> linked input ports
    pub(crate) topology: FxHashMap<u32, Vec<u32>>,
    /// Input port -> linked output ports
    pub(crate) inv_topology: FxHashMap<u32, Vec<u32>>,
    pub(crate) inport_to_nodes: FxHashMap<u32, Vec<NodeKey>>,
    pub(crate) outport_to_nodes: FxHashMap<u32, Vec<NodeKey>>,

    pub(crate) tables: BTreeMap<u32, Table>,
    pub(crate) sources: Vec<NodeKey>,
    pub(crate) probes: Vec<NodeKey>,

    pub(crate) last_event: Option<Event>,
    pub(crate) callbacks: Callbacks,
    /// Next source/probe id
    pub(crate) next_id: u64,
    pub(crate) budget: PropagationBudget,
    pub(crate) consistent: bool,
}

impl NetPlumber {
    /// Instance over `length`-byte headers with the default configuration
    pub fn new(length: usize) -> Self {
        Self::from_parts(length, PlumberConfig::default())
    }

    pub fn with_config(length: usize, config: PlumberConfig) -> Result<Self> {
        Self::with_packet_set(length, config)
    }
}

impl<P: PacketSet> NetPlumber<P> {
    /// Instance over a caller-chosen header-set representation
    pub fn with_packet_set(length: usize, config: PlumberConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(length, config))
    }

    fn from_parts(length: usize, config: PlumberConfig) -> Self {
        Self {
            length,
            budget: PropagationBudget::new(&config),
            config,
            nodes: Arena::new(),
            flows: Arena::new(),
            pipes: Arena::new(),
            influences: Arena::new(),
            id_to_node: FxHashMap::default(),
            topology: FxHashMap::default(),
            inv_topology: FxHashMap::default(),
            inport_to_nodes: FxHashMap::default(),
            outport_to_nodes: FxHashMap::default(),
            tables: BTreeMap::new(),
            sources: Vec::new(),
            probes: Vec::new(),
            last_event: None,
            callbacks: Callbacks::default(),
            next_id: 1,
            consistent: true,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn config(&self) -> &PlumberConfig {
        &self.config
    }

    pub fn last_event(&self) -> Option<Event> {
        self.last_event
    }

    /// `false` once a mutation ran out of budget; flows may then be stale
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn on_loop(&mut self, callback: impl FnMut(&LoopReport) + Send + 'static) {
        self.callbacks.on_loop = Box::new(callback);
    }

    pub fn on_blackhole(&mut self, callback: impl FnMut(&BlackholeReport) + Send + 'static) {
        self.callbacks.on_blackhole = Box::new(callback);
    }

    pub fn on_shadow(&mut self, callback: impl FnMut(&ShadowReport) + Send + 'static) {
        self.callbacks.on_shadow = Box::new(callback);
    }

    pub fn on_unreachable(&mut self, callback: impl FnMut(&UnreachableReport) + Send + 'static) {
        self.callbacks.on_unreachable = Box::new(callback);
    }

    pub fn on_anomaly(&mut self, callback: impl FnMut(&AnomalyReport) + Send + 'static) {
        self.callbacks.on_anomaly = Box::new(callback);
    }

    pub(crate) fn set_last_event(&mut self, event: Event) {
        self.last_event = Some(event);
    }

    /// Run one mutation under a fresh budget
    ///
    /// A budget overrun leaves partially updated flows behind, so the
    /// instance is flagged inconsistent.
    pub(crate) fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.budget.reset();
        let result = op(self);
        if let Err(err @ PlumberError::TooComplex { .. }) = &result {
            self.consistent = false;
            error!("Propagation aborted, network marked inconsistent: {}", err);
        }
        result
    }

    pub(crate) fn check_vector(&self, v: &TernaryVector) -> Result<()> {
        if v.len() != self.length {
            return Err(PlumberError::length_mismatch(self.length, v.len()));
        }
        Ok(())
    }

    pub(crate) fn node_key(&self, id: u64) -> Result<NodeKey> {
        self.id_to_node
            .get(&id)
            .copied()
            .ok_or(PlumberError::NodeNotFound(id))
    }

    pub fn node(&self, id: u64) -> Option<&Node<P>> {
        self.id_to_node.get(&id).map(|key| &self.nodes[*key])
    }

    /// Create a forward/backward pipe pair, returning the forward side
    pub(crate) fn add_pipe_pair(
        &mut self,
        upstream: NodeKey,
        out_port: u32,
        downstream: NodeKey,
        in_port: u32,
        vector: TernaryVector,
    ) -> PipeKey {
        let fp = self.pipes.insert(Pipeline::new(upstream, out_port, vector.clone()));
        let bp = self.pipes.insert(Pipeline::new(downstream, in_port, vector));
        self.pipes[fp].reverse = bp;
        self.pipes[bp].reverse = fp;
        self.nodes[upstream].next.push(fp);
        self.nodes[downstream].prev.push(bp);
        fp
    }

    /// Drop both sides of a pipe pair from the arena and from their nodes
    pub(crate) fn remove_pipe_pair(&mut self, pipe: PipeKey) {
        let Some(side) = self.pipes.remove(pipe) else {
            return;
        };
        self.detach_pipe(side.node, pipe);
        if let Some(other) = self.pipes.remove(side.reverse) {
            self.detach_pipe(other.node, side.reverse);
        }
    }

    fn detach_pipe(&mut self, node: NodeKey, pipe: PipeKey) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.next.retain(|k| *k != pipe);
            node.prev.retain(|k| *k != pipe);
        }
    }

    pub(crate) fn register_ports(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        for &port in node.input_ports.iter() {
            self.inport_to_nodes.entry(port).or_default().push(key);
        }
        for &port in node.output_ports.iter() {
            self.outport_to_nodes.entry(port).or_default().push(key);
        }
    }

    pub(crate) fn unregister_ports(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        for (map, ports) in [
            (&mut self.inport_to_nodes, &node.input_ports),
            (&mut self.outport_to_nodes, &node.output_ports),
        ] {
            for port in ports.iter() {
                if let Some(nodes) = map.get_mut(port) {
                    nodes.retain(|k| *k != key);
                    if nodes.is_empty() {
                        map.remove(port);
                    }
                }
            }
        }
    }

    /// Connect a new node to every linked neighbour whose headers overlap
    pub(crate) fn set_node_pipelines(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        // (upstream, out port, downstream, in port, vector)
        let mut pairs = Vec::new();

        for &out_port in node.output_ports.iter() {
            for &in_port in self.dst_ports(out_port) {
                for &other_key in self.inport_to_nodes.get(&in_port).into_iter().flatten() {
                    let other = &self.nodes[other_key];
                    if let Some(v) = other
                        .match_vector
                        .as_ref()
                        .and_then(|m| m.intersect(&node.inv_match))
                    {
                        pairs.push((key, out_port, other_key, in_port, v));
                    }
                }
            }
        }

        if let Some(r_match) = node.match_vector.as_ref() {
            for &in_port in node.input_ports.iter() {
                for &out_port in self.src_ports(in_port) {
                    for &other_key in self.outport_to_nodes.get(&out_port).into_iter().flatten() {
                        if other_key == key {
                            continue;
                        }
                        if let Some(v) = self.nodes[other_key].inv_match.intersect(r_match) {
                            pairs.push((other_key, out_port, key, in_port, v));
                        }
                    }
                }
            }
        }

        for (up, out_port, down, in_port, v) in pairs {
            self.add_pipe_pair(up, out_port, down, in_port, v);
        }
    }

    /// Drop every pipe pair touching `key`
    pub(crate) fn remove_node_pipes(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        let pipes: Vec<PipeKey> = node.next.iter().chain(&node.prev).copied().collect();
        for pipe in pipes {
            self.remove_pipe_pair(pipe);
        }
    }

    /// Widen the network to `length` bytes; returns the resulting length
    ///
    /// New bytes are wildcards everywhere (masks keep them). Shrinking is
    /// not supported, so a smaller `length` does nothing.
    pub fn expand(&mut self, length: usize) -> Result<usize> {
        if length <= self.length {
            return Ok(self.length);
        }
        for (_, node) in self.nodes.iter_mut() {
            node.enlarge(length);
        }
        for (_, pipe) in self.pipes.iter_mut() {
            pipe.vector.enlarge(length);
        }
        for (_, inf) in self.influences.iter_mut() {
            inf.comm.enlarge(length);
        }
        for (_, flow) in self.flows.iter_mut() {
            flow.hs_object.enlarge(length);
            if let Some(p) = flow.processed.as_mut() {
                p.enlarge(length);
            }
        }
        self.length = length;
        self.set_last_event(Event::new(EventKind::Expand, length as u64, 0));
        debug!("Expanded network to {} bytes", length);
        Ok(length)
    }
}
