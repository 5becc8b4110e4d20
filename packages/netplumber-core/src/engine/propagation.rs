//! Moving flows across pipes

use crate::callbacks::BlackholeReport;
use crate::errors::Result;
use crate::graph::{Flow, FlowId, NodeKey, PipeKey};
use crate::plumber::NetPlumber;
use netplumber_hs::{PacketSet, TernaryVector};
#[cfg(feature = "trace")]
use tracing::trace;

/// What a blackhole is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropCheck {
    /// The flow lost headers entering the pipe
    Flow,
    /// The pipe carries headers the flow does not fill
    Pipe,
}

impl<P: PacketSet> NetPlumber<P> {
    /// Send a freshly processed flow down every forward pipe of its node
    pub(crate) fn propagate_src_flow_on_pipes(&mut self, node: NodeKey, f: FlowId) -> Result<()> {
        for fp in self.nodes[node].next.clone() {
            self.propagate_on_pipe(node, f, fp, DropCheck::Flow)?;
        }
        Ok(())
    }

    /// Send every live flow of `node` down one (new) forward pipe
    pub(crate) fn propagate_src_flows_on_pipe(&mut self, node: NodeKey, fp: PipeKey) -> Result<()> {
        for f in self.nodes[node].flows.clone() {
            let live = self
                .flows
                .get(f)
                .is_some_and(|flow| !flow.looped && flow.is_alive());
            if live {
                self.propagate_on_pipe(node, f, fp, DropCheck::Pipe)?;
            }
        }
        Ok(())
    }

    fn propagate_on_pipe(
        &mut self,
        node: NodeKey,
        f: FlowId,
        fp: PipeKey,
        check: DropCheck,
    ) -> Result<()> {
        let Some(pipe) = self.pipes.get(fp) else {
            return Ok(());
        };
        if self.nodes[node].is_output_layer && self.should_block_flow(f, pipe.local_port) {
            return Ok(());
        }
        let Some(processed) = self.flows[f].processed.as_ref() else {
            return Ok(());
        };

        let mut h = processed.clone();
        h.intersect_vector(&pipe.vector);
        if !h.compact(None) {
            return Ok(());
        }

        let bp = &self.pipes[pipe.reverse];
        let (downstream, in_port) = (bp.node, bp.local_port);

        if self.config.check_blackholes {
            let partial = match check {
                DropCheck::Flow => h.is_subset(processed),
                DropCheck::Pipe => h.is_subset(&P::from_vector(pipe.vector.clone())),
            };
            if partial {
                let report = BlackholeReport {
                    flow: f,
                    node_id: self.nodes[node].id,
                    next_node_id: self.nodes[downstream].id,
                    port: pipe.local_port,
                    event: self.last_event,
                };
                (self.callbacks.on_blackhole)(&report);
            }
        }

        #[cfg(feature = "trace")]
        trace!(
            "Flow {:?} 0x{:x} -> 0x{:x} on port {}: {}",
            f,
            self.nodes[node].id,
            self.nodes[downstream].id,
            in_port,
            h
        );
        let source = self.flows[f].source;
        let child = self
            .flows
            .insert(Flow::child(downstream, source, f, fp, in_port, h));
        self.process_src_flow(downstream, Some(child))
    }

    /// A flow may not leave a table through the port it entered by
    ///
    /// Walks up to the flow's input-layer ancestor and compares its
    /// in-port with `out_port`.
    pub(crate) fn should_block_flow(&self, f: FlowId, out_port: u32) -> bool {
        let mut cursor = Some(f);
        while let Some(id) = cursor {
            let Some(flow) = self.flows.get(id) else {
                return false;
            };
            if self.nodes[flow.node].is_input_layer {
                return flow.in_port == out_port;
            }
            cursor = flow.parent;
        }
        false
    }

    /// Push an update of `f`'s processed space to its children
    ///
    /// With `change`, the children lose `change ∩ pipe`. Without it every
    /// child is recomputed from `f`, dead children are removed and new
    /// children are created on pipes that had none.
    pub(crate) fn repropagate_src_flow_on_pipes(
        &mut self,
        f: FlowId,
        change: Option<&TernaryVector>,
    ) -> Result<()> {
        let children = self.flows[f].children.clone().unwrap_or_default();

        if let Some(change) = change {
            for child in children {
                let Some(pipe) = self.flows.get(child).and_then(|c| c.pipe) else {
                    continue;
                };
                let Some(piped) = self.pipes.get(pipe).and_then(|p| p.vector.intersect(change))
                else {
                    continue;
                };
                self.flows[child].hs_object.diff_vector(&piped);
                self.process_src_flow_at_location(child, Some(&piped))?;
            }
            return Ok(());
        }

        let node = self.flows[f].node;
        let Some(processed) = self.flows[f].processed.clone() else {
            return Ok(());
        };
        let mut used: Vec<PipeKey> = Vec::with_capacity(children.len());

        for child in children {
            let Some(pipe) = self.flows.get(child).and_then(|c| c.pipe) else {
                continue;
            };
            let Some(vector) = self.pipes.get(pipe).map(|p| p.vector.clone()) else {
                self.remove_src_flow(child);
                continue;
            };
            let mut h = processed.clone();
            h.intersect_vector(&vector);
            if h.compact(None) {
                used.push(pipe);
                self.flows[child].hs_object = h;
                self.process_src_flow_at_location(child, None)?;
            } else {
                self.remove_src_flow(child);
            }
        }

        for fp in self.nodes[node].next.clone() {
            if !used.contains(&fp) {
                self.propagate_on_pipe(node, f, fp, DropCheck::Flow)?;
            }
        }
        Ok(())
    }
}
