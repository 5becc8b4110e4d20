//! Sources and source probes

use super::NetPlumber;
use crate::errors::{PlumberError, Result};
use crate::events::{Event, EventKind};
use crate::graph::{Flow, Node, NodeKey, NodeType};
use crate::probe::{ProbeData, ProbeSpec};
use crate::shared::PortList;
use netplumber_hs::{PacketSet, TernaryVector};
use tracing::debug;

impl<P: PacketSet> NetPlumber<P> {
    /// Inject `space` on output ports `ports`; returns the source id
    pub fn add_source(&mut self, space: P, ports: &[u32]) -> Result<u64> {
        if space.length() != self.length {
            return Err(PlumberError::length_mismatch(self.length, space.length()));
        }
        let id = self.allocate_id();

        self.run(move |np| {
            np.set_last_event(Event::new(EventKind::AddSource, id, 0));
            let node = Node::source(id, np.length, PortList::from(ports));
            let key = np.nodes.insert(node);
            np.id_to_node.insert(id, key);
            np.sources.push(key);
            np.register_ports(key);
            np.set_node_pipelines(key);

            let root = np.flows.insert(Flow::root(key, space));
            np.flows[root].source = root;
            np.nodes[key].flows.push(root);
            np.process_src_flow(key, Some(root))?;
            debug!("Added source 0x{:x} on ports {:?}", id, ports);
            Ok(id)
        })
    }

    /// Convenience for a single-vector source
    pub fn add_source_vector(&mut self, v: TernaryVector, ports: &[u32]) -> Result<u64> {
        self.check_vector(&v)?;
        self.add_source(P::from_vector(v), ports)
    }

    pub fn remove_source(&mut self, id: u64) -> Result<()> {
        let key = self.node_key(id)?;
        if self.nodes[key].node_type() != NodeType::Source {
            return Err(PlumberError::wrong_type(id, "source"));
        }
        self.run(|np| {
            np.set_last_event(Event::new(EventKind::RemoveSource, id, 0));
            np.remove_plain_node(key);
            np.sources.retain(|k| *k != key);
            debug!("Removed source 0x{:x}", id);
            Ok(())
        })
    }

    /// Attach a probe to input ports, evaluate the flows already there and
    /// start tracking; returns the probe id
    pub fn add_source_probe(&mut self, spec: ProbeSpec<P>) -> Result<u64> {
        if let Some(m) = spec.match_vector.as_ref() {
            self.check_vector(m)?;
        }
        let id = self.allocate_id();

        self.run(move |np| {
            let ProbeSpec {
                ports,
                mode,
                filter,
                test,
                match_vector,
                callback,
            } = spec;
            let mut data = ProbeData::new(mode, filter, test, callback);
            data.enlarge(np.length);
            let match_vector = match_vector.unwrap_or_else(|| TernaryVector::all_x(np.length));
            let key = np.nodes.insert(Node::source_probe(id, data, match_vector, ports));
            np.id_to_node.insert(id, key);
            np.probes.push(key);
            np.register_ports(key);
            np.set_node_pipelines(key);
            np.process_src_flow(key, None)?;
            np.start_probe(key);
            debug!("Added source probe 0x{:x}", id);
            Ok(id)
        })
    }

    pub fn remove_source_probe(&mut self, id: u64) -> Result<()> {
        let key = self.node_key(id)?;
        if self.nodes[key].node_type() != NodeType::SourceProbe {
            return Err(PlumberError::wrong_type(id, "source probe"));
        }
        self.run(|np| {
            np.stop_probe(key);
            np.remove_plain_node(key);
            np.probes.retain(|k| *k != key);
            debug!("Removed source probe 0x{:x}", id);
            Ok(())
        })
    }

    /// Re-evaluate the probe's flows from scratch and resume tracking
    pub fn restart_probe(&mut self, id: u64) -> Result<()> {
        let key = self.node_key(id)?;
        if self.nodes[key].node_type() != NodeType::SourceProbe {
            return Err(PlumberError::wrong_type(id, "source probe"));
        }
        self.stop_probe(key);
        self.start_probe(key);
        Ok(())
    }

    pub(crate) fn start_probe(&mut self, key: NodeKey) {
        let id = self.nodes[key].id;
        let event = Event::new(EventKind::StartSourceProbe, id, 0);
        self.set_last_event(event);

        let flows: Vec<_> = self.nodes[key]
            .flows
            .iter()
            .filter(|f| self.flows.get(**f).is_some_and(|fl| fl.is_alive()))
            .map(|f| (*f, self.flow_chain(*f)))
            .collect();
        if let Some(probe) = self.nodes[key].as_probe_mut() {
            probe.start(id, flows, Some(event));
        }
    }

    pub(crate) fn stop_probe(&mut self, key: NodeKey) {
        let id = self.nodes[key].id;
        self.set_last_event(Event::new(EventKind::StopSourceProbe, id, 0));
        if let Some(probe) = self.nodes[key].as_probe_mut() {
            probe.stop();
        }
    }

    /// Remove a source or probe node with its flows and pipes
    fn remove_plain_node(&mut self, key: NodeKey) {
        for f in self.nodes[key].flows.clone() {
            self.remove_src_flow(f);
        }
        self.remove_node_pipes(key);
        self.unregister_ports(key);
        let id = self.nodes[key].id;
        self.id_to_node.remove(&id);
        self.nodes.remove(key);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Ids of all sources, in insertion order
    pub fn source_ids(&self) -> Vec<u64> {
        self.sources.iter().map(|k| self.nodes[*k].id).collect()
    }

    /// Ids of all probes, in insertion order
    pub fn probe_ids(&self) -> Vec<u64> {
        self.probes.iter().map(|k| self.nodes[*k].id).collect()
    }
}
