//! NetPlumber - incremental header-space verification
//!
//! Models a network as rule tables joined by links, injects header sets at
//! sources and keeps the resulting flows up to date as rules, links and
//! sources change. Probes watch the flows reaching a port and report when
//! their condition starts or stops holding.
//!
//! ## Model
//!
//! - **Rule**: match + optional rewrite, forwarding from input to output ports
//! - **Pipeline**: overlap between an upstream node's output and a linked
//!   downstream node's match
//! - **Influence**: overlap between two rules of the same table; the
//!   higher-priority one takes its share first
//! - **Flow**: one header set at one node, with a parent chain back to a source
//!
//! ## Usage
//!
//! ```rust,ignore
//! use netplumber_core::{NetPlumber, HeaderSpace};
//!
//! let mut np = NetPlumber::new(1);
//! np.add_table(1, &[1, 2])?;
//! np.add_rule(1, 0, &[1], &[2], "xxxxxxx1".parse()?, None, None)?;
//! np.add_link(10, 1)?;
//! let src = np.add_source("1xxxxxxx".parse::<HeaderSpace>()?, &[10])?;
//! ```
//!
//! ## Reports
//!
//! Loops, blackholes, shadowed and unreachable rules are reported through
//! callbacks (`on_loop`, `on_blackhole`, ...). The defaults log through
//! `tracing`; the library never installs a subscriber.

pub mod callbacks;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod graph;
pub mod plumber;
pub mod probe;
pub mod shared;

pub use callbacks::{
    AnomalyKind, AnomalyReport, BlackholeReport, Callback, LoopReport, ShadowReport,
    UnreachableReport,
};
pub use config::{AnomalyConfig, ConfigError, LoopDetection, PlumberConfig, Preset};
pub use errors::{PlumberError, Result};
pub use events::{Event, EventKind};
pub use graph::{Flow, FlowId, Node, NodeType};
pub use plumber::{rule_id, FlowStats, NetPlumber, PipeStats};
pub use probe::{
    AndCondition, Condition, FalseCondition, HeaderCondition, NotCondition, OrCondition,
    PathCondition, PathSpecifier, ProbeMode, ProbeReport, ProbeSpec, ProbeState,
    ProbeTransition, TrueCondition,
};
pub use shared::PortList;

pub use netplumber_hs::{HeaderSpace, HsError, PacketSet, TernaryVector, Trit};
