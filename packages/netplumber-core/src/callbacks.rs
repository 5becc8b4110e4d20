//! Policy reports
//!
//! Loops, blackholes, shadowed rules and table anomalies are not errors:
//! the engine hands a report to a user callback and carries on. Without a
//! user callback the report is logged at `warn` level.

use crate::events::Event;
use crate::graph::FlowId;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// A flow re-entered a rule (or table) it already passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub flow: FlowId,
    /// Node where the loop closed
    pub node_id: u64,
    /// Ancestor node it matched
    pub first_visit: u64,
    pub event: Option<Event>,
}

/// Part of a flow was dropped on its way into a pipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackholeReport {
    pub flow: FlowId,
    pub node_id: u64,
    pub next_node_id: u64,
    /// Output port of the pipe
    pub port: u32,
    pub event: Option<Event>,
}

/// A newly inserted rule is covered by higher-priority rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowReport {
    pub rule_id: u64,
    /// Higher-priority overlapping rules, in priority order
    pub shadowed_by: Vec<u64>,
    pub event: Option<Event>,
}

/// A newly inserted rule sits below a universal higher-priority aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreachableReport {
    pub rule_id: u64,
    pub event: Option<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    Shadowed,
    Unreachable,
    Generalization,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnomalyKind::Shadowed => "shadowed",
            AnomalyKind::Unreachable => "unreachable",
            AnomalyKind::Generalization => "generalization",
        })
    }
}

/// Result of an on-demand table audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyReport {
    pub kind: AnomalyKind,
    pub table: u32,
    pub rule_id: u64,
    /// Rules whose matches cover this one
    pub related: Vec<u64>,
}

pub type Callback<R> = Box<dyn FnMut(&R) + Send>;

pub(crate) struct Callbacks {
    pub(crate) on_loop: Callback<LoopReport>,
    pub(crate) on_blackhole: Callback<BlackholeReport>,
    pub(crate) on_shadow: Callback<ShadowReport>,
    pub(crate) on_unreachable: Callback<UnreachableReport>,
    pub(crate) on_anomaly: Callback<AnomalyReport>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            on_loop: Box::new(|r: &LoopReport| {
                warn!(
                    "Loop detected: flow {:?} at node 0x{:x} revisits 0x{:x}",
                    r.flow, r.node_id, r.first_visit
                );
            }),
            on_blackhole: Box::new(|r: &BlackholeReport| {
                warn!(
                    "Blackhole: flow {:?} partially dropped from 0x{:x} to 0x{:x} on port {}",
                    r.flow, r.node_id, r.next_node_id, r.port
                );
            }),
            on_shadow: Box::new(|r: &ShadowReport| {
                warn!(
                    "Rule 0x{:x} is shadowed by {} rule(s), first 0x{:x}",
                    r.rule_id,
                    r.shadowed_by.len(),
                    r.shadowed_by.first().copied().unwrap_or_default()
                );
            }),
            on_unreachable: Box::new(|r: &UnreachableReport| {
                warn!("Rule 0x{:x} is unreachable", r.rule_id);
            }),
            on_anomaly: Box::new(|r: &AnomalyReport| {
                warn!(
                    "Table {}: rule 0x{:x} is {} ({} related)",
                    r.table,
                    r.rule_id,
                    r.kind,
                    r.related.len()
                );
            }),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}
