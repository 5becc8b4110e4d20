//! Mutation events
//!
//! Every public mutation records the event that triggered the current
//! propagation, so callbacks can tell what caused a report.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AddRule,
    RemoveRule,
    AddLink,
    RemoveLink,
    AddSource,
    RemoveSource,
    StartSourceProbe,
    StopSourceProbe,
    AddTable,
    RemoveTable,
    Expand,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AddRule => "add_rule",
            EventKind::RemoveRule => "remove_rule",
            EventKind::AddLink => "add_link",
            EventKind::RemoveLink => "remove_link",
            EventKind::AddSource => "add_source",
            EventKind::RemoveSource => "remove_source",
            EventKind::StartSourceProbe => "start_source_probe",
            EventKind::StopSourceProbe => "stop_source_probe",
            EventKind::AddTable => "add_table",
            EventKind::RemoveTable => "remove_table",
            EventKind::Expand => "expand",
        }
    }
}

/// `id1`/`id2` carry the mutation's arguments: node or table id for most
/// kinds, the two ports for links, the new length for `Expand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub id1: u64,
    pub id2: u64,
}

impl Event {
    pub fn new(kind: EventKind, id1: u64, id2: u64) -> Self {
        Self { kind, id1, id2 }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:x}, 0x{:x})", self.kind.as_str(), self.id1, self.id2)
    }
}
