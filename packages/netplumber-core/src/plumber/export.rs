//! JSON snapshot of the network
//!
//! Diagnostic only; there is no matching import.

use super::NetPlumber;
use crate::graph::{FlowId, Node};
use netplumber_hs::PacketSet;
use serde_json::{json, Value};

impl<P: PacketSet> NetPlumber<P> {
    pub fn to_json(&self) -> Value {
        let tables: Vec<Value> = self
            .tables
            .iter()
            .map(|(&id, table)| {
                let rules: Vec<Value> = table
                    .rules
                    .values()
                    .map(|key| rule_json(&self.nodes[*key]))
                    .collect();
                json!({ "id": id, "ports": table.ports, "rules": rules })
            })
            .collect();

        let links: Vec<Value> = self
            .links()
            .into_iter()
            .map(|(from, to)| json!([from, to]))
            .collect();

        let sources: Vec<Value> = self
            .sources
            .iter()
            .map(|key| {
                let node = &self.nodes[*key];
                let flows: Vec<Value> = node
                    .flows
                    .iter()
                    .map(|f| self.flow_tree_json(*f))
                    .collect();
                json!({
                    "id": node.id,
                    "ports": node.output_ports,
                    "flows": flows,
                })
            })
            .collect();

        let probes: Vec<Value> = self
            .probes
            .iter()
            .filter_map(|key| {
                let node = &self.nodes[*key];
                let probe = node.as_probe()?;
                Some(json!({
                    "id": node.id,
                    "ports": node.input_ports,
                    "match": node.match_vector.as_ref().map(|m| m.to_string()),
                    "mode": probe.mode(),
                    "state": probe.state(),
                    "holds": probe.holds(),
                    "filter": probe.filter().to_json(),
                    "test": probe.test().to_json(),
                }))
            })
            .collect();

        json!({
            "length": self.length,
            "consistent": self.consistent,
            "tables": tables,
            "links": links,
            "sources": sources,
            "probes": probes,
        })
    }

    /// A flow and everything it spawned
    fn flow_tree_json(&self, f: FlowId) -> Value {
        let Some(flow) = self.flows.get(f) else {
            return Value::Null;
        };
        let node_id = self.nodes.get(flow.node).map(|n| n.id);
        let children: Vec<Value> = flow
            .children()
            .iter()
            .map(|c| self.flow_tree_json(*c))
            .collect();
        json!({
            "node": node_id.map(|id| format!("0x{:x}", id)),
            "in_port": flow.in_port,
            "processed": flow.processed.as_ref().map(|p| p.to_json()),
            "looped": flow.looped,
            "children": children,
        })
    }
}

fn rule_json<P: PacketSet>(node: &Node<P>) -> Value {
    let rule = node.as_rule();
    json!({
        "id": format!("0x{:x}", node.id),
        "index": rule.map(|r| r.index),
        "in_ports": node.input_ports,
        "out_ports": node.output_ports,
        "match": node.match_vector.as_ref().map(|m| m.to_string()),
        "mask": rule.and_then(|r| r.mask.as_ref()).map(|m| m.to_string()),
        "rewrite": rule.and_then(|r| r.rewrite.as_ref()).map(|m| m.to_string()),
    })
}
