//! Source probes
//!
//! A probe watches the flows arriving at it and keeps a running verdict:
//!
//! - **Existential**: true while some flow passing `filter` also passes `test`
//! - **Universal**: true while every flow passing `filter` also passes `test`
//!
//! `cond_count` counts the flows that decide the verdict (passing flows in
//! existential mode, failing flows in universal mode). Every change of the
//! count is reported as a [`ProbeTransition`].

use super::condition::{BoxedCondition, FlowChain};
use crate::events::Event;
use crate::graph::FlowId;
use crate::shared::PortList;
use netplumber_hs::{PacketSet, TernaryVector};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Existential,
    Universal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    #[default]
    Stopped,
    Started,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeTransition {
    StartedTrue,
    StartedFalse,
    TrueToFalse,
    FalseToTrue,
    MoreTrue,
    MoreFalse,
    LessTrue,
    LessFalse,
}

impl ProbeTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeTransition::StartedTrue => "STARTED_TRUE",
            ProbeTransition::StartedFalse => "STARTED_FALSE",
            ProbeTransition::TrueToFalse => "TRUE_TO_FALSE",
            ProbeTransition::FalseToTrue => "FALSE_TO_TRUE",
            ProbeTransition::MoreTrue => "MORE_TRUE",
            ProbeTransition::MoreFalse => "MORE_FALSE",
            ProbeTransition::LessTrue => "LESS_TRUE",
            ProbeTransition::LessFalse => "LESS_FALSE",
        }
    }
}

impl fmt::Display for ProbeTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a flow at the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeAction {
    Add,
    Modify,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub probe_id: u64,
    /// Flow that caused the transition; `None` for the final start report
    pub flow: Option<FlowId>,
    pub transition: ProbeTransition,
    pub event: Option<Event>,
}

pub type ProbeCallback = Box<dyn FnMut(&ProbeReport) + Send>;

fn log_probe_report(report: &ProbeReport) {
    info!(
        "Probe 0x{:x}: {} (flow {:?}, event {:?})",
        report.probe_id, report.transition, report.flow, report.event
    );
}

/// Arguments of `NetPlumber::add_source_probe`
pub struct ProbeSpec<P: PacketSet> {
    pub(crate) ports: PortList,
    pub(crate) mode: ProbeMode,
    pub(crate) filter: BoxedCondition<P>,
    pub(crate) test: BoxedCondition<P>,
    pub(crate) match_vector: Option<TernaryVector>,
    pub(crate) callback: Option<ProbeCallback>,
}

impl<P: PacketSet> ProbeSpec<P> {
    pub fn new(
        ports: impl Into<PortList>,
        mode: ProbeMode,
        filter: BoxedCondition<P>,
        test: BoxedCondition<P>,
    ) -> Self {
        Self {
            ports: ports.into(),
            mode,
            filter,
            test,
            match_vector: None,
            callback: None,
        }
    }

    /// Only headers in `m` reach the probe (default: all)
    pub fn with_match(mut self, m: TernaryVector) -> Self {
        self.match_vector = Some(m);
        self
    }

    /// Receive transitions (default: logged)
    pub fn with_callback(mut self, callback: impl FnMut(&ProbeReport) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

pub struct ProbeData<P: PacketSet> {
    mode: ProbeMode,
    state: ProbeState,
    filter: BoxedCondition<P>,
    test: BoxedCondition<P>,
    check_results: FxHashMap<FlowId, bool>,
    cond_count: usize,
    callback: ProbeCallback,
}

impl<P: PacketSet> fmt::Debug for ProbeData<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeData")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("filter", &self.filter.to_string())
            .field("test", &self.test.to_string())
            .field("cond_count", &self.cond_count)
            .finish_non_exhaustive()
    }
}

impl<P: PacketSet> ProbeData<P> {
    pub fn new(
        mode: ProbeMode,
        filter: BoxedCondition<P>,
        test: BoxedCondition<P>,
        callback: Option<ProbeCallback>,
    ) -> Self {
        Self {
            mode,
            state: ProbeState::Stopped,
            filter,
            test,
            check_results: FxHashMap::default(),
            cond_count: 0,
            callback: callback.unwrap_or_else(|| Box::new(log_probe_report)),
        }
    }

    pub fn mode(&self) -> ProbeMode {
        self.mode
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ProbeState::Running
    }

    pub fn cond_count(&self) -> usize {
        self.cond_count
    }

    /// Verdict of the probe
    pub fn holds(&self) -> bool {
        match self.mode {
            ProbeMode::Existential => self.cond_count > 0,
            ProbeMode::Universal => self.cond_count == 0,
        }
    }

    /// Last test result recorded for a flow
    pub fn result_for(&self, flow: FlowId) -> Option<bool> {
        self.check_results.get(&flow).copied()
    }

    pub fn filter(&self) -> &dyn super::Condition<P> {
        self.filter.as_ref()
    }

    pub fn test(&self) -> &dyn super::Condition<P> {
        self.test.as_ref()
    }

    pub(crate) fn enlarge(&mut self, len: usize) {
        self.filter.enlarge(len);
        self.test.enlarge(len);
    }

    /// A test result that moves `cond_count`
    fn decides(&self, result: bool) -> bool {
        match self.mode {
            ProbeMode::Existential => result,
            ProbeMode::Universal => !result,
        }
    }

    fn emit(
        &mut self,
        probe_id: u64,
        flow: Option<FlowId>,
        transition: ProbeTransition,
        event: Option<Event>,
    ) {
        let report = ProbeReport {
            probe_id,
            flow,
            transition,
            event,
        };
        (self.callback)(&report);
    }

    fn count_up(&mut self, probe_id: u64, flow: FlowId, event: Option<Event>) {
        self.cond_count += 1;
        let transition = match (self.mode, self.cond_count == 1) {
            (ProbeMode::Existential, true) => ProbeTransition::FalseToTrue,
            (ProbeMode::Existential, false) => ProbeTransition::MoreTrue,
            (ProbeMode::Universal, true) => ProbeTransition::TrueToFalse,
            (ProbeMode::Universal, false) => ProbeTransition::MoreFalse,
        };
        self.emit(probe_id, Some(flow), transition, event);
    }

    fn count_down(&mut self, probe_id: u64, flow: FlowId, event: Option<Event>) {
        debug_assert!(self.cond_count > 0);
        self.cond_count = self.cond_count.saturating_sub(1);
        let transition = match (self.mode, self.cond_count == 0) {
            (ProbeMode::Existential, true) => ProbeTransition::TrueToFalse,
            (ProbeMode::Existential, false) => ProbeTransition::LessTrue,
            (ProbeMode::Universal, true) => ProbeTransition::FalseToTrue,
            (ProbeMode::Universal, false) => ProbeTransition::LessFalse,
        };
        self.emit(probe_id, Some(flow), transition, event);
    }

    fn forget(&mut self, probe_id: u64, flow: FlowId, event: Option<Event>) {
        if let Some(previous) = self.check_results.remove(&flow) {
            if self.decides(previous) {
                self.count_down(probe_id, flow, event);
            }
        }
    }

    /// Fold one flow change into the verdict
    ///
    /// `chain` is required for `Add` and `Modify`. A flow whose headers
    /// became empty is treated as deleted.
    pub(crate) fn update_check(
        &mut self,
        probe_id: u64,
        flow: FlowId,
        chain: Option<&FlowChain<P>>,
        action: ProbeAction,
        event: Option<Event>,
    ) {
        if action == ProbeAction::Delete {
            self.forget(probe_id, flow, event);
            return;
        }

        let Some(chain) = chain.filter(|c| c.processed().is_some_and(|p| !p.is_empty())) else {
            if action == ProbeAction::Modify {
                self.forget(probe_id, flow, event);
            }
            return;
        };

        if !self.filter.check(chain) {
            return;
        }
        let result = self.test.check(chain);
        match self.check_results.insert(flow, result) {
            None => {
                if self.decides(result) {
                    self.count_up(probe_id, flow, event);
                }
            }
            Some(previous) if previous == result => {}
            Some(_) => {
                if self.decides(result) {
                    self.count_up(probe_id, flow, event);
                } else {
                    self.count_down(probe_id, flow, event);
                }
            }
        }
    }

    /// Evaluate the flows already at the probe and start tracking changes
    pub(crate) fn start(
        &mut self,
        probe_id: u64,
        flows: Vec<(FlowId, FlowChain<P>)>,
        event: Option<Event>,
    ) {
        self.state = ProbeState::Started;
        for (flow, chain) in flows {
            if !self.filter.check(&chain) {
                continue;
            }
            let result = self.test.check(&chain);
            self.check_results.insert(flow, result);
            if self.decides(result) {
                self.cond_count += 1;
                let transition = match self.mode {
                    ProbeMode::Existential => ProbeTransition::StartedTrue,
                    ProbeMode::Universal => ProbeTransition::StartedFalse,
                };
                self.emit(probe_id, Some(flow), transition, event);
            }
        }
        if self.cond_count == 0 {
            let transition = match self.mode {
                ProbeMode::Existential => ProbeTransition::StartedFalse,
                ProbeMode::Universal => ProbeTransition::StartedTrue,
            };
            self.emit(probe_id, None, transition, event);
        }
        self.state = ProbeState::Running;
    }

    pub(crate) fn stop(&mut self) {
        self.state = ProbeState::Stopped;
        self.check_results.clear();
        self.cond_count = 0;
    }
}
