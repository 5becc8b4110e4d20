//! Physical links between ports

use super::NetPlumber;
use crate::errors::{PlumberError, Result};
use crate::events::{Event, EventKind};
use netplumber_hs::PacketSet;
use tracing::debug;

impl<P: PacketSet> NetPlumber<P> {
    /// Connect output port `from` to input port `to`
    ///
    /// Builds the pipes between the nodes on both ends and pushes the
    /// upstream flows through them. Adding an existing link does nothing.
    pub fn add_link(&mut self, from: u32, to: u32) -> Result<()> {
        if self.topology.get(&from).is_some_and(|dsts| dsts.contains(&to)) {
            return Ok(());
        }
        self.run(|np| {
            np.set_last_event(Event::new(EventKind::AddLink, from as u64, to as u64));
            np.topology.entry(from).or_default().push(to);
            np.inv_topology.entry(to).or_default().push(from);

            let sources = np.outport_to_nodes.get(&from).cloned().unwrap_or_default();
            let dests = np.inport_to_nodes.get(&to).cloned().unwrap_or_default();
            for &src in &sources {
                for &dst in &dests {
                    let Some(vector) = np.nodes[dst]
                        .match_vector
                        .as_ref()
                        .and_then(|m| m.intersect(&np.nodes[src].inv_match))
                    else {
                        continue;
                    };
                    let fp = np.add_pipe_pair(src, from, dst, to, vector);
                    np.propagate_src_flows_on_pipe(src, fp)?;
                }
            }
            debug!("Added link {} -> {}", from, to);
            Ok(())
        })
    }

    /// Disconnect `from -> to`, absorbing every flow that crossed it
    pub fn remove_link(&mut self, from: u32, to: u32) -> Result<()> {
        if !self.topology.get(&from).is_some_and(|dsts| dsts.contains(&to)) {
            return Err(PlumberError::LinkNotFound { from, to });
        }
        self.run(|np| {
            np.set_last_event(Event::new(EventKind::RemoveLink, from as u64, to as u64));

            let sources = np.outport_to_nodes.get(&from).cloned().unwrap_or_default();
            for src in sources {
                for fp in np.nodes[src].next.clone() {
                    let pipe = &np.pipes[fp];
                    if pipe.local_port != from || np.pipes[pipe.reverse].local_port != to {
                        continue;
                    }
                    let downstream = np.pipes[pipe.reverse].node;
                    for f in np.nodes[downstream].flows.clone() {
                        if np.flows.get(f).is_some_and(|fl| fl.pipe == Some(fp)) {
                            np.remove_src_flow(f);
                        }
                    }
                    np.remove_pipe_pair(fp);
                }
            }

            remove_port(&mut np.topology, from, to);
            remove_port(&mut np.inv_topology, to, from);
            debug!("Removed link {} -> {}", from, to);
            Ok(())
        })
    }

    /// Input ports linked to output port `port`
    pub fn dst_ports(&self, port: u32) -> &[u32] {
        self.topology.get(&port).map(Vec::as_slice).unwrap_or_default()
    }

    /// Output ports linked to input port `port`
    pub fn src_ports(&self, port: u32) -> &[u32] {
        self.inv_topology.get(&port).map(Vec::as_slice).unwrap_or_default()
    }

    /// All links as `(from, to)`, sorted
    pub fn links(&self) -> Vec<(u32, u32)> {
        let mut links: Vec<(u32, u32)> = self
            .topology
            .iter()
            .flat_map(|(&from, dsts)| dsts.iter().map(move |&to| (from, to)))
            .collect();
        links.sort_unstable();
        links
    }
}

fn remove_port(map: &mut rustc_hash::FxHashMap<u32, Vec<u32>>, key: u32, port: u32) {
    if let Some(ports) = map.get_mut(&key) {
        ports.retain(|p| *p != port);
        if ports.is_empty() {
            map.remove(&key);
        }
    }
}
