//! Read-only queries over nodes and flows

use super::NetPlumber;
use crate::errors::{PlumberError, Result};
use crate::graph::{Flow, FlowId};
use crate::probe::ProbeState;
use netplumber_hs::PacketSet;
use serde::Serialize;

/// Pipe and influence counts of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipeStats {
    pub fwd: usize,
    pub bck: usize,
    /// Lower-priority rules this rule influences (0 for non-rules)
    pub effects: usize,
    /// Higher-priority rules influencing this rule (0 for non-rules)
    pub influences: usize,
}

/// Header counts over a node's processed flows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowStats {
    /// Included terms
    pub inc: usize,
    /// Excluded (diff) terms
    pub exc: usize,
}

impl<P: PacketSet> NetPlumber<P> {
    pub fn pipe_stats(&self, id: u64) -> Result<PipeStats> {
        let node = &self.nodes[self.node_key(id)?];
        let (effects, influences) = node
            .as_rule()
            .map(|r| (r.effect_on.len(), r.influenced_by.len()))
            .unwrap_or_default();
        Ok(PipeStats {
            fwd: node.next.len(),
            bck: node.prev.len(),
            effects,
            influences,
        })
    }

    pub fn source_flow_stats(&self, id: u64) -> Result<FlowStats> {
        let node = &self.nodes[self.node_key(id)?];
        let mut stats = FlowStats::default();
        for processed in node
            .flows
            .iter()
            .filter_map(|f| self.flows.get(*f))
            .filter_map(|f| f.processed.as_ref())
        {
            stats.inc += processed.count();
            stats.exc += processed.count_diff();
        }
        Ok(stats)
    }

    /// Flows currently registered at a node
    pub fn flows_at(&self, id: u64) -> Result<Vec<FlowId>> {
        let key = self.node_key(id)?;
        Ok(self.nodes[key].flows.clone())
    }

    pub fn flow(&self, id: FlowId) -> Option<&Flow<P>> {
        self.flows.get(id)
    }

    /// Id of the node a flow sits at
    pub fn flow_node_id(&self, id: FlowId) -> Option<u64> {
        let flow = self.flows.get(id)?;
        self.nodes.get(flow.node).map(|n| n.id)
    }

    /// Every node id, sorted
    pub fn node_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.id_to_node.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn probe_state(&self, id: u64) -> Result<ProbeState> {
        self.probe_data(id).map(|p| p.state())
    }

    /// Whether the probe's condition currently holds
    pub fn probe_holds(&self, id: u64) -> Result<bool> {
        self.probe_data(id).map(|p| p.holds())
    }

    fn probe_data(&self, id: u64) -> Result<&crate::probe::ProbeData<P>> {
        self.nodes[self.node_key(id)?]
            .as_probe()
            .ok_or(PlumberError::wrong_type(id, "source probe"))
    }
}
