//! Per-node flow processing

use crate::callbacks::LoopReport;
use crate::errors::Result;
use crate::graph::{FlowId, NodeKey, NodeType};
use crate::plumber::NetPlumber;
use crate::probe::{FlowChain, Hop, ProbeAction};
use netplumber_hs::{PacketSet, TernaryVector};
use tracing::{error, trace};

impl<P: PacketSet> NetPlumber<P> {
    /// Process a flow that just arrived at `node`, or (with `None`) pull
    /// every upstream flow through the node's backward pipes
    pub(crate) fn process_src_flow(&mut self, node: NodeKey, flow: Option<FlowId>) -> Result<()> {
        match flow {
            Some(f) => {
                self.budget.enter()?;
                let result = self.process_new_flow(node, f);
                self.budget.leave();
                result
            }
            None => {
                let prev = self.nodes[node].prev.clone();
                for bp in prev {
                    let Some(fp) = self.pipes.get(bp).map(|p| p.reverse) else {
                        continue;
                    };
                    let upstream = self.pipes[fp].node;
                    self.propagate_src_flows_on_pipe(upstream, fp)?;
                }
                Ok(())
            }
        }
    }

    fn process_new_flow(&mut self, node: NodeKey, f: FlowId) -> Result<()> {
        match self.nodes[node].node_type() {
            NodeType::Rule => {
                self.register_flow(node, f);
                if let Some(first_visit) = self.find_loop(f) {
                    self.flows[f].looped = true;
                    let report = LoopReport {
                        flow: f,
                        node_id: self.nodes[node].id,
                        first_visit,
                        event: self.last_event,
                    };
                    (self.callbacks.on_loop)(&report);
                    return Ok(());
                }
                if self.recompute_rule_flow(node, f) {
                    self.propagate_src_flow_on_pipes(node, f)?;
                }
                Ok(())
            }
            NodeType::SourceProbe => {
                self.register_flow(node, f);
                let input = self.flows[f].hs_object.clone();
                self.flows[f].processed = Some(input);
                self.notify_probe(node, f, ProbeAction::Add);
                Ok(())
            }
            NodeType::Source => self.propagate_src_flow_on_pipes(node, f),
            NodeType::Sink | NodeType::SinkProbe => Ok(()),
        }
    }

    /// Re-evaluate an existing flow after its input or the rule's
    /// influences changed
    ///
    /// `change` is a set of headers just removed from the flow; without it
    /// the flow is recomputed from its input.
    pub(crate) fn process_src_flow_at_location(
        &mut self,
        f: FlowId,
        change: Option<&TernaryVector>,
    ) -> Result<()> {
        self.budget.enter()?;
        let result = self.reprocess_flow(f, change);
        self.budget.leave();
        result
    }

    fn reprocess_flow(&mut self, f: FlowId, change: Option<&TernaryVector>) -> Result<()> {
        let Some(flow) = self.flows.get(f) else {
            return Ok(());
        };
        let node = flow.node;

        match self.nodes[node].node_type() {
            NodeType::Rule => {
                if self.flows[f].looped {
                    return Ok(());
                }
                let rewrites = self.nodes[node]
                    .as_rule()
                    .is_some_and(|r| r.rewrite_pair().is_some());

                let alive = match change {
                    Some(change) if !rewrites => {
                        let mask = self.nodes[node].as_rule().and_then(|r| r.mask.as_ref());
                        let Some(processed) = self.flows[f].processed.as_mut() else {
                            return Ok(());
                        };
                        processed.diff_vector(change);
                        processed.compact(mask)
                    }
                    _ => self.recompute_rule_flow(node, f),
                };

                if !alive {
                    trace!("Flow {:?} at 0x{:x} died", f, self.nodes[node].id);
                    self.absorb_src_flow(f, true);
                    self.flows[f].processed = None;
                    return Ok(());
                }
                let change = if rewrites { None } else { change };
                self.repropagate_src_flow_on_pipes(f, change)
            }
            NodeType::SourceProbe => {
                let flow = &mut self.flows[f];
                match change {
                    Some(change) => {
                        if let Some(processed) = flow.processed.as_mut() {
                            processed.diff_vector(change);
                            processed.compact(None);
                        }
                    }
                    None => flow.processed = Some(flow.hs_object.clone()),
                }
                self.notify_probe(node, f, ProbeAction::Modify);
                Ok(())
            }
            NodeType::Source => {
                error!(
                    "Source 0x{:x} cannot reprocess its own flow",
                    self.nodes[node].id
                );
                Ok(())
            }
            NodeType::Sink | NodeType::SinkProbe => Ok(()),
        }
    }

    /// `processed = input - influences`, compacted under the rule mask and
    /// rewritten; returns whether anything survived
    fn recompute_rule_flow(&mut self, node: NodeKey, f: FlowId) -> bool {
        let Some(rule) = self.nodes[node].as_rule() else {
            return false;
        };
        let flow = &mut self.flows[f];
        let mut processed = flow.hs_object.clone();
        for key in &rule.influenced_by {
            let inf = &self.influences[*key];
            if inf.ports.contains(flow.in_port) {
                processed.diff_vector(&inf.comm);
            }
        }

        if !processed.compact(rule.mask.as_ref()) {
            flow.processed = None;
            return false;
        }
        if let Some((mask, rewrite)) = rule.rewrite_pair() {
            processed.rewrite(mask, rewrite);
        }
        trace!("Flow {:?} at 0x{:x}: {}", f, self.nodes[node].id, processed);
        flow.processed = Some(processed);
        flow.children.get_or_insert_with(Vec::new);
        true
    }

    fn register_flow(&mut self, node: NodeKey, f: FlowId) {
        self.nodes[node].flows.push(f);
        if let Some(parent) = self.flows[f].parent {
            if let Some(parent) = self.flows.get_mut(parent) {
                parent.children.get_or_insert_with(Vec::new).push(f);
            }
        }
    }

    /// Id of the ancestor rule that `f` loops back to, if any
    fn find_loop(&self, f: FlowId) -> Option<u64> {
        let mask = self.config.loop_detection.key_mask();
        let flow = &self.flows[f];
        let key = self.nodes[flow.node].id & mask;

        let mut cursor = flow.parent;
        while let Some(id) = cursor {
            let ancestor = self.flows.get(id)?;
            let node = &self.nodes[ancestor.node];
            if node.node_type() != NodeType::Rule {
                return None;
            }
            if node.id & mask == key {
                return Some(node.id);
            }
            cursor = ancestor.parent;
        }
        None
    }

    /// Remove the subtree below `f`; with `first == false`, `f` itself too
    pub(crate) fn absorb_src_flow(&mut self, f: FlowId, first: bool) {
        let Some(flow) = self.flows.get_mut(f) else {
            return;
        };
        let node = flow.node;
        let children = flow.children.take().unwrap_or_default();

        if self.nodes.get(node).is_some_and(|n| n.node_type() == NodeType::SourceProbe) {
            self.notify_probe(node, f, ProbeAction::Delete);
        }
        for child in children {
            self.absorb_src_flow(child, false);
        }
        if !first {
            self.flows.remove(f);
            if let Some(n) = self.nodes.get_mut(node) {
                n.flows.retain(|x| *x != f);
            }
        }
    }

    /// Delete `f` and its subtree and unlink it from its parent
    pub(crate) fn remove_src_flow(&mut self, f: FlowId) {
        let Some(parent) = self.flows.get(f).map(|flow| flow.parent) else {
            return;
        };
        self.absorb_src_flow(f, false);
        if let Some(parent) = parent.and_then(|p| self.flows.get_mut(p)) {
            if let Some(children) = parent.children.as_mut() {
                children.retain(|c| *c != f);
            }
        }
    }

    /// Re-process the lower-priority flows a rule now overlaps
    pub(crate) fn subtract_influences_from_flows(&mut self, rule: NodeKey) -> Result<()> {
        let effects = self.nodes[rule]
            .as_rule()
            .map(|r| r.effect_on.clone())
            .unwrap_or_default();
        for key in effects {
            let Some(inf) = self.influences.get(key) else {
                continue;
            };
            let comm = inf.comm.clone();
            let ports = inf.ports.clone();
            let lower = inf.influenced;
            for f in self.nodes[lower].flows.clone() {
                if self.flows.get(f).is_some_and(|fl| ports.contains(fl.in_port)) {
                    self.process_src_flow_at_location(f, Some(&comm))?;
                }
            }
        }
        Ok(())
    }

    /// Owned snapshot of a flow and its ancestors, probe side first
    pub(crate) fn flow_chain(&self, f: FlowId) -> FlowChain<P> {
        let processed = self.flows.get(f).and_then(|flow| flow.processed.clone());
        let mut hops = Vec::new();
        let mut cursor = Some(f);
        while let Some(id) = cursor {
            let Some(flow) = self.flows.get(id) else {
                break;
            };
            let node = &self.nodes[flow.node];
            hops.push(Hop {
                node_id: node.id,
                node_type: node.node_type(),
                table: node.table(),
                in_port: flow.in_port,
                at_input_stage: node.is_input_layer,
            });
            cursor = flow.parent;
        }
        FlowChain::new(processed, hops)
    }

    /// Tell a running probe about a flow change
    pub(crate) fn notify_probe(&mut self, node: NodeKey, f: FlowId, action: ProbeAction) {
        let running = self.nodes[node].as_probe().is_some_and(|p| p.is_running());
        if !running {
            return;
        }
        let chain = (action != ProbeAction::Delete).then(|| self.flow_chain(f));
        let probe_id = self.nodes[node].id;
        let event = self.last_event;
        if let Some(probe) = self.nodes[node].as_probe_mut() {
            probe.update_check(probe_id, f, chain.as_ref(), action, event);
        }
    }
}
