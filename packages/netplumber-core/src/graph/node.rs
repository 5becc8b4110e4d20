//! Graph nodes
//!
//! A node is a rule, a source or a source probe. The variant-specific data
//! lives in [`NodeKind`]; ports, match vectors, pipes and flows are common.

use super::{FlowId, InfluenceKey, PipeKey};
use crate::probe::ProbeData;
use crate::shared::PortList;
use netplumber_hs::{PacketSet, TernaryVector, Trit};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Rule,
    Source,
    Sink,
    SourceProbe,
    SinkProbe,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Rule => "rule",
            NodeType::Source => "source",
            NodeType::Sink => "sink",
            NodeType::SourceProbe => "source_probe",
            NodeType::SinkProbe => "sink_probe",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule-only data
#[derive(Debug, Clone)]
pub struct RuleData {
    pub table: u32,
    /// Lower index = higher priority
    pub index: u32,
    pub mask: Option<TernaryVector>,
    pub rewrite: Option<TernaryVector>,
    /// Relations to higher-priority rules
    pub(crate) influenced_by: Vec<InfluenceKey>,
    /// Relations to lower-priority rules
    pub(crate) effect_on: Vec<InfluenceKey>,
}

impl RuleData {
    pub fn influenced_by(&self) -> &[InfluenceKey] {
        &self.influenced_by
    }

    pub fn effect_on(&self) -> &[InfluenceKey] {
        &self.effect_on
    }

    /// Mask and rewrite, when the rule rewrites
    pub fn rewrite_pair(&self) -> Option<(&TernaryVector, &TernaryVector)> {
        self.mask.as_ref().zip(self.rewrite.as_ref())
    }
}

#[derive(Debug)]
pub enum NodeKind<P: PacketSet> {
    Rule(RuleData),
    Source,
    SourceProbe(Box<ProbeData<P>>),
}

#[derive(Debug)]
pub struct Node<P: PacketSet> {
    pub(crate) id: u64,
    pub(crate) kind: NodeKind<P>,
    /// Accepted headers; sources have none
    pub(crate) match_vector: Option<TernaryVector>,
    /// Headers after rewrite
    pub(crate) inv_match: TernaryVector,
    pub(crate) input_ports: PortList,
    pub(crate) output_ports: PortList,
    pub(crate) is_input_layer: bool,
    pub(crate) is_output_layer: bool,
    /// Forward pipes (owned by this node, output side)
    pub(crate) next: Vec<PipeKey>,
    /// Backward pipes (owned by this node, input side)
    pub(crate) prev: Vec<PipeKey>,
    pub(crate) flows: Vec<FlowId>,
}

impl<P: PacketSet> Node<P> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn rule(
        id: u64,
        data: RuleData,
        match_vector: TernaryVector,
        input_ports: PortList,
        output_ports: PortList,
        table_ports: &PortList,
    ) -> Self {
        let mut inv_match = match_vector.clone();
        if let Some((mask, rewrite)) = data.rewrite_pair() {
            inv_match.rewrite(mask, rewrite);
        }
        let is_input_layer = table_ports.intersects(&input_ports);
        let is_output_layer = table_ports.intersects(&output_ports);
        Self {
            id,
            kind: NodeKind::Rule(data),
            match_vector: Some(match_vector),
            inv_match,
            input_ports,
            output_ports,
            is_input_layer,
            is_output_layer,
            next: Vec::new(),
            prev: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub(crate) fn source(id: u64, len: usize, output_ports: PortList) -> Self {
        Self {
            id,
            kind: NodeKind::Source,
            match_vector: None,
            inv_match: TernaryVector::all_x(len),
            input_ports: PortList::default(),
            output_ports,
            is_input_layer: false,
            is_output_layer: false,
            next: Vec::new(),
            prev: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub(crate) fn source_probe(
        id: u64,
        data: ProbeData<P>,
        match_vector: TernaryVector,
        input_ports: PortList,
    ) -> Self {
        Self {
            id,
            kind: NodeKind::SourceProbe(Box::new(data)),
            inv_match: match_vector.clone(),
            match_vector: Some(match_vector),
            input_ports,
            output_ports: PortList::default(),
            is_input_layer: false,
            is_output_layer: false,
            next: Vec::new(),
            prev: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Rule(_) => NodeType::Rule,
            NodeKind::Source => NodeType::Source,
            NodeKind::SourceProbe(_) => NodeType::SourceProbe,
        }
    }

    pub fn kind(&self) -> &NodeKind<P> {
        &self.kind
    }

    pub fn match_vector(&self) -> Option<&TernaryVector> {
        self.match_vector.as_ref()
    }

    pub fn inv_match(&self) -> &TernaryVector {
        &self.inv_match
    }

    pub fn input_ports(&self) -> &PortList {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &PortList {
        &self.output_ports
    }

    pub fn is_input_layer(&self) -> bool {
        self.is_input_layer
    }

    pub fn is_output_layer(&self) -> bool {
        self.is_output_layer
    }

    pub fn flows(&self) -> &[FlowId] {
        &self.flows
    }

    pub fn next_pipes(&self) -> &[PipeKey] {
        &self.next
    }

    pub fn prev_pipes(&self) -> &[PipeKey] {
        &self.prev
    }

    pub fn as_rule(&self) -> Option<&RuleData> {
        match &self.kind {
            NodeKind::Rule(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_rule_mut(&mut self) -> Option<&mut RuleData> {
        match &mut self.kind {
            NodeKind::Rule(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_probe(&self) -> Option<&ProbeData<P>> {
        match &self.kind {
            NodeKind::SourceProbe(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_probe_mut(&mut self) -> Option<&mut ProbeData<P>> {
        match &mut self.kind {
            NodeKind::SourceProbe(data) => Some(data),
            _ => None,
        }
    }

    /// Table of a rule node
    pub fn table(&self) -> Option<u32> {
        self.as_rule().map(|r| r.table)
    }

    /// Widen every vector to `len` bytes; masks pad with `0` (keep)
    pub(crate) fn enlarge(&mut self, len: usize) {
        if let Some(m) = self.match_vector.as_mut() {
            m.enlarge(len);
        }
        self.inv_match.enlarge(len);
        match &mut self.kind {
            NodeKind::Rule(data) => {
                if let Some(mask) = data.mask.as_mut() {
                    mask.enlarge_with(len, Trit::Zero);
                }
                if let Some(rw) = data.rewrite.as_mut() {
                    rw.enlarge(len);
                }
            }
            NodeKind::SourceProbe(probe) => probe.enlarge(len),
            NodeKind::Source => {}
        }
    }
}
