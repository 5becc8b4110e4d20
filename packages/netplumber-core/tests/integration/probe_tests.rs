//! Source probes watching flows end to end

#[path = "../common/mod.rs"]
mod common;
use common::*;

use netplumber_core::probe::BoxedCondition;
use netplumber_core::{
    Condition, EventKind, HeaderCondition, HeaderSpace, NetPlumber, NotCondition, PathCondition,
    PathSpecifier, PlumberError, PortList, ProbeMode, ProbeSpec, ProbeState, ProbeTransition,
    TrueCondition,
};
use pretty_assertions::assert_eq;
use ProbeTransition::*;

/// 10 -> [t1: 1 -> 2] -> [t2: 3 -> 4] -> 20 (probe)
///
/// A second entry 11 -> 3 reaches table 2 without passing table 1.
fn chain_net() -> NetPlumber {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2]).unwrap();
    np.add_table(2, &[3, 4]).unwrap();
    np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_rule(2, 1, &[3], &[4], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(11, 3).unwrap();
    np.add_link(4, 20).unwrap();
    np
}

fn header(s: &str) -> BoxedCondition<HeaderSpace> {
    HeaderCondition::new(hs(s)).boxed()
}

fn add_probe(
    np: &mut NetPlumber,
    mode: ProbeMode,
    filter: BoxedCondition<HeaderSpace>,
    test: BoxedCondition<HeaderSpace>,
) -> (u64, Recorder<ProbeTransition>) {
    let log = recorder();
    let sink = log.clone();
    let spec = ProbeSpec::new(vec![20], mode, filter, test)
        .with_callback(move |r| sink.lock().unwrap().push(r.transition));
    let id = np.add_source_probe(spec).unwrap();
    (id, log)
}

#[test]
fn test_existential_probe_tracks_header() {
    let mut np = chain_net();
    let (probe, log) = add_probe(
        &mut np,
        ProbeMode::Existential,
        TrueCondition.boxed(),
        header("1xxxxxxx"),
    );
    assert_eq!(taken(&log), vec![StartedFalse]);
    assert_eq!(np.probe_state(probe).unwrap(), ProbeState::Running);
    assert!(!np.probe_holds(probe).unwrap());

    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert_eq!(taken(&log), vec![StartedFalse, FalseToTrue]);
    assert!(np.probe_holds(probe).unwrap());

    // dropping 1xxxxxxx in table 2 leaves only 0xxxxxxx at the probe
    np.add_rule(2, 0, &[3], &[], tv("1xxxxxxx"), None, None).unwrap();
    assert_eq!(taken(&log), vec![StartedFalse, FalseToTrue, TrueToFalse]);
    assert!(!np.probe_holds(probe).unwrap());
    assert_same_set(&live_flows(&np, probe)[0], "0xxxxxxx");
}

#[test]
fn test_flow_removal_reaches_probe() {
    let mut np = chain_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();
    let (probe, log) = add_probe(
        &mut np,
        ProbeMode::Existential,
        TrueCondition.boxed(),
        header("1xxxxxxx"),
    );
    assert_eq!(taken(&log), vec![StartedTrue]);
    assert_eq!(np.flows_at(probe).unwrap().len(), 1);

    np.remove_source(src).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue, TrueToFalse]);
    assert!(np.flows_at(probe).unwrap().is_empty());
}

#[test]
fn test_existential_counts_each_flow() {
    let mut np = chain_net();
    let (probe, log) = add_probe(
        &mut np,
        ProbeMode::Existential,
        TrueCondition.boxed(),
        TrueCondition.boxed(),
    );
    let s1 = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();
    np.add_source(hs("0xxxxxxx"), &[11]).unwrap();
    assert_eq!(taken(&log), vec![StartedFalse, FalseToTrue, MoreTrue]);

    np.remove_source(s1).unwrap();
    assert_eq!(taken(&log).last(), Some(&LessTrue));
    assert!(np.probe_holds(probe).unwrap());
}

#[test]
fn test_universal_probe_with_path() {
    let mut np = chain_net();
    let via_t1 = PathCondition::new(vec![PathSpecifier::Table(1)]).boxed();
    let (probe, log) = add_probe(&mut np, ProbeMode::Universal, TrueCondition.boxed(), via_t1);
    assert_eq!(taken(&log), vec![StartedTrue]);

    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue]);
    assert!(np.probe_holds(probe).unwrap());

    let bypass = np.add_source(hs("xxxxxxxx"), &[11]).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue, TrueToFalse]);
    assert!(!np.probe_holds(probe).unwrap());

    np.remove_source(bypass).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue, TrueToFalse, FalseToTrue]);
}

#[test]
fn test_path_pins_the_whole_route() {
    let mut np = chain_net();
    let route = PathCondition::new(vec![
        PathSpecifier::NextTables(PortList::new([2])),
        PathSpecifier::NextPorts(PortList::new([1])),
        PathSpecifier::End,
    ])
    .boxed();
    let (probe, log) = add_probe(&mut np, ProbeMode::Existential, TrueCondition.boxed(), route);

    np.add_source(hs("xxxxxxxx"), &[11]).unwrap();
    assert!(!np.probe_holds(probe).unwrap());
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert!(np.probe_holds(probe).unwrap());
    assert_eq!(taken(&log), vec![StartedFalse, FalseToTrue]);
}

#[test]
fn test_filter_ignores_flows() {
    let mut np = chain_net();
    let (probe, log) = add_probe(
        &mut np,
        ProbeMode::Universal,
        header("0xxxxxxx"),
        NotCondition::new(header("00xxxxxx")).boxed(),
    );
    np.add_source(hs("1xxxxxxx"), &[10]).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue]);

    np.add_source(hs("000xxxxx"), &[11]).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue, TrueToFalse]);
    assert!(!np.probe_holds(probe).unwrap());
}

#[test]
fn test_probe_match_limits_headers() {
    let mut np = chain_net();
    let log = recorder();
    let sink = log.clone();
    let spec = ProbeSpec::new(
        vec![20],
        ProbeMode::Existential,
        TrueCondition.boxed(),
        TrueCondition.boxed(),
    )
    .with_match(tv("xxxxxxx1"))
    .with_callback(move |r| sink.lock().unwrap().push(r.transition));
    let probe = np.add_source_probe(spec).unwrap();

    np.add_source(hs("xxxxxxx0"), &[10]).unwrap();
    assert!(np.flows_at(probe).unwrap().is_empty());
    np.add_source(hs("xxxxxxxx"), &[11]).unwrap();
    assert_same_set(&live_flows(&np, probe)[0], "xxxxxxx1");
    assert_eq!(taken(&log), vec![StartedFalse, FalseToTrue]);
}

#[test]
fn test_restart_and_remove_probe() {
    let mut np = chain_net();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    let (probe, log) = add_probe(
        &mut np,
        ProbeMode::Existential,
        TrueCondition.boxed(),
        TrueCondition.boxed(),
    );
    assert_eq!(np.last_event().unwrap().kind, EventKind::StartSourceProbe);

    np.restart_probe(probe).unwrap();
    assert_eq!(taken(&log), vec![StartedTrue, StartedTrue]);

    np.remove_source_probe(probe).unwrap();
    assert_eq!(np.last_event().unwrap().kind, EventKind::StopSourceProbe);
    assert!(np.probe_ids().is_empty());
    assert!(matches!(
        np.probe_state(probe),
        Err(PlumberError::NodeNotFound(_))
    ));
}

#[test]
fn test_probe_type_checks() {
    let mut np = chain_net();
    let src = np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert!(matches!(
        np.remove_source_probe(src),
        Err(PlumberError::WrongNodeType { .. })
    ));
    assert!(matches!(
        np.probe_holds(src),
        Err(PlumberError::WrongNodeType { .. })
    ));

    let spec = ProbeSpec::new(
        vec![20],
        ProbeMode::Existential,
        TrueCondition.boxed(),
        TrueCondition.boxed(),
    )
    .with_match(tv("xxxxxxxx,xxxxxxxx"));
    assert!(matches!(
        np.add_source_probe(spec),
        Err(PlumberError::LengthMismatch { .. })
    ));
}

#[test]
fn test_probe_in_json() {
    let mut np = chain_net();
    add_probe(
        &mut np,
        ProbeMode::Universal,
        TrueCondition.boxed(),
        header("1xxxxxxx"),
    );
    let json = np.to_json();
    let probe = &json["probes"][0];
    assert_eq!(probe["mode"], "universal");
    assert_eq!(probe["state"], "running");
    assert_eq!(probe["filter"]["type"], "true");
    assert_eq!(probe["test"]["type"], "header");
}
