//! Path conditions
//!
//! A path condition is a sequence of pathlets matched against the hops of a
//! [`FlowChain`], probe first. `.*` opens a decision point; a failing
//! pathlet backtracks to the latest one and retries one hop further along.

use super::condition::{Condition, FlowChain, Hop};
use crate::graph::NodeType;
use crate::shared::PortList;
use netplumber_hs::PacketSet;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpecifier {
    /// Some later input-stage hop entered through port `p`
    Port(u32),
    /// Some later input-stage hop is a rule of table `t`
    Table(u32),
    /// The next input-stage hop entered through one of these ports
    NextPorts(PortList),
    /// The next input-stage hop is a rule of one of these tables
    NextTables(PortList),
    /// The hop just before the source entered through one of these ports
    LastPorts(PortList),
    /// The hop just before the source is a rule of one of these tables
    LastTables(PortList),
    /// Exactly one hop
    Skip,
    /// Any number of hops
    SkipNext,
    /// The source has been reached
    End,
}

impl PathSpecifier {
    /// Test the pathlet at `cursor`, advancing the cursor past what it consumed
    fn check_and_move<P: PacketSet>(&self, chain: &FlowChain<P>, cursor: &mut usize) -> bool {
        match self {
            PathSpecifier::Port(port) => {
                seek(chain, cursor, |hop| hop.at_input_stage && hop.in_port == *port)
            }
            PathSpecifier::Table(table) => seek(chain, cursor, |hop| {
                hop.at_input_stage && is_rule_of(hop, |t| t == *table)
            }),
            PathSpecifier::NextPorts(ports) => {
                next_input_stage(chain, cursor, |hop| ports.contains(hop.in_port))
            }
            PathSpecifier::NextTables(tables) => {
                next_input_stage(chain, cursor, |hop| is_rule_of(hop, |t| tables.contains(t)))
            }
            PathSpecifier::LastPorts(ports) => last_hop(chain, cursor)
                .is_some_and(|hop| hop.at_input_stage && ports.contains(hop.in_port)),
            PathSpecifier::LastTables(tables) => last_hop(chain, cursor).is_some_and(|hop| {
                hop.at_input_stage && is_rule_of(hop, |t| tables.contains(t))
            }),
            PathSpecifier::Skip => next_input_stage(chain, cursor, |_| true),
            PathSpecifier::SkipNext => true,
            PathSpecifier::End => chain.is_root(*cursor),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PathSpecifier::Port(port) => json!({ "type": "port", "port": port }),
            PathSpecifier::Table(table) => json!({ "type": "table", "table": table }),
            PathSpecifier::NextPorts(ports) => json!({ "type": "next_ports", "ports": ports }),
            PathSpecifier::NextTables(tables) => {
                json!({ "type": "next_tables", "tables": tables })
            }
            PathSpecifier::LastPorts(ports) => json!({ "type": "last_ports", "ports": ports }),
            PathSpecifier::LastTables(tables) => {
                json!({ "type": "last_tables", "tables": tables })
            }
            PathSpecifier::Skip => json!({ "type": "skip" }),
            PathSpecifier::SkipNext => json!({ "type": "skip_next" }),
            PathSpecifier::End => json!({ "type": "end" }),
        }
    }
}

impl fmt::Display for PathSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpecifier::Port(port) => write!(f, ".*(p = {})", port),
            PathSpecifier::Table(table) => write!(f, ".*(t = {})", table),
            PathSpecifier::NextPorts(ports) => write!(f, "(p in {})", ports),
            PathSpecifier::NextTables(tables) => write!(f, "(t in {})", tables),
            PathSpecifier::LastPorts(ports) => write!(f, ".*(p in {})$", ports),
            PathSpecifier::LastTables(tables) => write!(f, ".*(t in {})$", tables),
            PathSpecifier::Skip => f.write_str("."),
            PathSpecifier::SkipNext => f.write_str(".*"),
            PathSpecifier::End => f.write_str("$"),
        }
    }
}

fn is_rule_of(hop: &Hop, accept: impl Fn(u32) -> bool) -> bool {
    hop.node_type == NodeType::Rule && hop.table.is_some_and(accept)
}

/// Advance until a hop satisfies `accept`; consume it on success
fn seek<P: PacketSet>(
    chain: &FlowChain<P>,
    cursor: &mut usize,
    accept: impl Fn(&Hop) -> bool,
) -> bool {
    while !chain.is_root(*cursor) {
        let hit = chain.hop(*cursor).is_some_and(&accept);
        *cursor += 1;
        if hit {
            return true;
        }
    }
    false
}

/// Skip to the next input-stage hop and consume it if it satisfies `accept`
fn next_input_stage<P: PacketSet>(
    chain: &FlowChain<P>,
    cursor: &mut usize,
    accept: impl Fn(&Hop) -> bool,
) -> bool {
    while !chain.is_root(*cursor) && chain.hop(*cursor).is_some_and(|h| !h.at_input_stage) {
        *cursor += 1;
    }
    if chain.is_root(*cursor) {
        return false;
    }
    let hit = chain.hop(*cursor).is_some_and(accept);
    if hit {
        *cursor += 1;
    }
    hit
}

/// Move to the root, returning the hop right before it
fn last_hop<'a, P: PacketSet>(chain: &'a FlowChain<P>, cursor: &mut usize) -> Option<&'a Hop> {
    let mut prev = None;
    while !chain.is_root(*cursor) {
        prev = chain.hop(*cursor);
        *cursor += 1;
    }
    prev
}

/// Sequence of pathlets read from the probe back to the source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCondition {
    pathlets: Vec<PathSpecifier>,
}

impl PathCondition {
    pub fn new(pathlets: Vec<PathSpecifier>) -> Self {
        Self { pathlets }
    }

    pub fn add_pathlet(&mut self, pathlet: PathSpecifier) {
        self.pathlets.push(pathlet);
    }

    pub fn pathlets(&self) -> &[PathSpecifier] {
        &self.pathlets
    }
}

impl<P: PacketSet> Condition<P> for PathCondition {
    fn check(&self, chain: &FlowChain<P>) -> bool {
        // (pathlet index of a `.*`, hop to resume from)
        let mut decisions: Vec<(usize, usize)> = Vec::new();
        let mut it = 0;
        let mut cursor = 0;

        while it < self.pathlets.len() {
            let matched = match &self.pathlets[it] {
                PathSpecifier::SkipNext => {
                    if chain.is_root(cursor) {
                        return false;
                    }
                    decisions.push((it, cursor + 1));
                    true
                }
                pathlet => pathlet.check_and_move(chain, &mut cursor),
            };

            if !matched {
                let Some((resume_it, resume_cursor)) = decisions.pop() else {
                    return false;
                };
                it = resume_it;
                cursor = resume_cursor;
                if chain.is_root(cursor) {
                    return false;
                }
                decisions.push((it, cursor + 1));
            }
            it += 1;
        }
        true
    }

    fn to_json(&self) -> Value {
        let pathlets: Vec<Value> = self.pathlets.iter().map(PathSpecifier::to_json).collect();
        json!({ "type": "path", "pathlets": pathlets })
    }
}

impl fmt::Display for PathCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("path ~ \"")?;
        for pathlet in &self.pathlets {
            write!(f, "{}", pathlet)?;
        }
        f.write_str("\"")
    }
}
