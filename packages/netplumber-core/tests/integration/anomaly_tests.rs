//! Loops, blackholes, shadowed rules and propagation budgets

#[path = "../common/mod.rs"]
mod common;
use common::*;

use netplumber_core::{
    AnomalyKind, BlackholeReport, EventKind, LoopDetection, LoopReport, NetPlumber,
    PlumberConfig, PlumberError, ShadowReport, UnreachableReport,
};
use pretty_assertions::assert_eq;

// ═══════════════════════════════════════════════════════════════════════════
// Loops
// ═══════════════════════════════════════════════════════════════════════════

/// 10 -> [t1: 1 -> 2] -> [t2: 3 -> 4] -> back to 1
fn two_table_loop(config: PlumberConfig) -> (NetPlumber, u64, Recorder<LoopReport>) {
    let mut np = NetPlumber::with_config(1, config).unwrap();
    let loops = recorder();
    let sink = loops.clone();
    np.on_loop(move |r| sink.lock().unwrap().push(r.clone()));

    np.add_table(1, &[1, 2]).unwrap();
    np.add_table(2, &[3, 4]).unwrap();
    let r1 = np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_rule(2, 1, &[3], &[4], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(4, 1).unwrap();
    np.add_link(10, 1).unwrap();
    (np, r1, loops)
}

#[test]
fn test_loop_reported_once() {
    let (mut np, r1, loops) = two_table_loop(PlumberConfig::default());
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();

    let reports = taken(&loops);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].node_id, r1);
    assert_eq!(reports[0].first_visit, r1);
    assert_eq!(reports[0].event.unwrap().kind, EventKind::AddSource);

    // the re-entering flow is frozen and not alive
    let looped = np.flow(reports[0].flow).unwrap();
    assert!(looped.is_looped());
    assert_eq!(live_flows(&np, r1).len(), 1);
    assert!(np.is_consistent());
}

#[test]
fn test_loop_not_reported_again_on_shrink() {
    let (mut np, r1, loops) = two_table_loop(PlumberConfig::default());
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    // half the headers stop at table 2 now; the rest still loops
    let drop = np.add_rule(2, 0, &[3], &[], tv("1xxxxxxx"), None, None).unwrap();
    assert!(np.is_consistent());
    assert_eq!(taken(&loops).len(), 1);

    let looped = np.flow(taken(&loops)[0].flow).unwrap();
    assert_same_set(looped.input(), "0xxxxxxx");
    assert_same_set(&live_flows(&np, drop)[0], "1xxxxxxx");
    assert_eq!(live_flows(&np, r1).len(), 1);
}

#[test]
fn test_self_link_loops_per_table() {
    let mut np = NetPlumber::new(1);
    let loops = recorder();
    let sink = loops.clone();
    np.on_loop(move |r: &LoopReport| sink.lock().unwrap().push(r.node_id));

    np.add_table(1, &[1, 2, 3]).unwrap();
    let a = np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    let b = np.add_rule(1, 1, &[3], &[2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();

    // table mode: entering table 1 again through B closes the loop
    assert_eq!(taken(&loops), vec![b]);
    assert!(live_flows(&np, b).is_empty());
    assert_eq!(live_flows(&np, a).len(), 1);
}

#[test]
fn test_rule_mode_allows_same_table_revisit() {
    let config = PlumberConfig::default().loop_detection(LoopDetection::Rule);
    let mut np = NetPlumber::with_config(1, config).unwrap();
    let loops = recorder();
    let sink = loops.clone();
    np.on_loop(move |r: &LoopReport| sink.lock().unwrap().push(r.node_id));

    np.add_table(1, &[1, 2, 3, 4]).unwrap();
    np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    let b = np.add_rule(1, 1, &[3], &[4], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();

    assert!(taken(&loops).is_empty());
    assert_eq!(live_flows(&np, b).len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Blackholes
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_blackhole_on_partial_pipe() {
    let config = PlumberConfig::default().check_blackholes(true);
    let mut np = NetPlumber::with_config(1, config).unwrap();
    let holes = recorder();
    let sink = holes.clone();
    np.on_blackhole(move |r: &BlackholeReport| sink.lock().unwrap().push(r.clone()));

    np.add_table(1, &[1, 2]).unwrap();
    np.add_table(2, &[3, 4]).unwrap();
    let r1 = np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    let r2 = np.add_rule(2, 0, &[3], &[4], tv("1xxxxxxx"), None, None).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();

    let reports = taken(&holes);
    assert_eq!(reports.len(), 1);
    assert_eq!((reports[0].node_id, reports[0].next_node_id), (r1, r2));
    assert_eq!(reports[0].port, 2);
}

#[test]
fn test_blackholes_off_by_default() {
    let mut np = NetPlumber::new(1);
    let holes = recorder();
    let sink = holes.clone();
    np.on_blackhole(move |r: &BlackholeReport| sink.lock().unwrap().push(r.clone()));

    np.add_table(1, &[1, 2]).unwrap();
    np.add_rule(1, 0, &[1], &[2], tv("1xxxxxxx"), None, None).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert!(taken(&holes).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Shadowing
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_shadow_reported_on_insert() {
    let mut np = NetPlumber::new(1);
    let shadows = recorder();
    let sink = shadows.clone();
    np.on_shadow(move |r: &ShadowReport| sink.lock().unwrap().push(r.clone()));

    np.add_table(1, &[1, 2]).unwrap();
    let a = np.add_rule(1, 0, &[1], &[2], tv("xxxxxxx1"), None, None).unwrap();
    np.add_rule(1, 1, &[1], &[2], tv("0xxxxxx0"), None, None).unwrap();
    assert!(taken(&shadows).is_empty());

    let hidden = np.add_rule(1, 5, &[1], &[2], tv("1xxxxxx1"), None, None).unwrap();
    let reports = taken(&shadows);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].rule_id, hidden);
    assert_eq!(reports[0].shadowed_by, vec![a]);
}

#[test]
fn test_shadow_by_adjacent_halves() {
    let mut np = NetPlumber::new(1);
    let shadows = recorder();
    let sink = shadows.clone();
    np.on_shadow(move |r: &ShadowReport| sink.lock().unwrap().push(r.clone()));

    np.add_table(1, &[1, 2]).unwrap();
    let lo = np.add_rule(1, 0, &[1], &[2], tv("10xxxxxx"), None, None).unwrap();
    let hi = np.add_rule(1, 1, &[1], &[2], tv("11xxxxxx"), None, None).unwrap();
    np.add_rule(1, 2, &[1], &[2], tv("0xxxxxx1"), None, None).unwrap();
    assert!(taken(&shadows).is_empty());

    let hidden = np.add_rule(1, 5, &[1], &[2], tv("1xxxxxx0"), None, None).unwrap();
    let reports = taken(&shadows);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].rule_id, hidden);
    let mut by = reports[0].shadowed_by.clone();
    by.sort_unstable();
    assert_eq!(by, vec![lo, hi]);
}

#[test]
fn test_partial_overlap_is_not_shadow() {
    let mut np = NetPlumber::new(1);
    let shadows = recorder();
    let sink = shadows.clone();
    np.on_shadow(move |r: &ShadowReport| sink.lock().unwrap().push(r.rule_id));

    np.add_table(1, &[1, 2]).unwrap();
    np.add_rule(1, 0, &[1], &[2], tv("1xxxxxxx"), None, None).unwrap();
    np.add_rule(1, 1, &[1], &[2], tv("xxxxxxx1"), None, None).unwrap();
    // different in-port: no shadow either
    np.add_rule(1, 2, &[2], &[1], tv("1xxxxxx1"), None, None).unwrap();
    assert!(taken(&shadows).is_empty());
}

#[test]
fn test_unreachable_after_universal_cover() {
    let TwoRuleNet { mut np, .. } = two_rule_net();
    let unreachable = recorder();
    let shadows = recorder();
    let (u_sink, s_sink) = (unreachable.clone(), shadows.clone());
    np.on_unreachable(move |r: &UnreachableReport| u_sink.lock().unwrap().push(r.rule_id));
    np.on_shadow(move |r: &ShadowReport| s_sink.lock().unwrap().push(r.rule_id));

    let dead = np.add_rule(1, 9, &[1], &[2], tv("0xxxxxxx"), None, None).unwrap();
    assert_eq!(taken(&unreachable), vec![dead]);
    assert!(taken(&shadows).is_empty());
}

#[test]
fn test_shadow_check_can_be_disabled() {
    let config = PlumberConfig::default().check_shadow(false);
    let mut np = NetPlumber::with_config(1, config).unwrap();
    let shadows = recorder();
    let sink = shadows.clone();
    np.on_shadow(move |r: &ShadowReport| sink.lock().unwrap().push(r.rule_id));

    np.add_table(1, &[1, 2]).unwrap();
    np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_rule(1, 1, &[1], &[2], tv("1xxxxxxx"), None, None).unwrap();
    assert!(taken(&shadows).is_empty());
}

#[test]
fn test_check_anomalies_audit() {
    let config = PlumberConfig::default().check_shadow(false);
    let mut np = NetPlumber::with_config(1, config).unwrap();
    np.add_table(1, &[1, 2]).unwrap();
    let a = np.add_rule(1, 0, &[1], &[2], tv("1xxxxxxx"), None, None).unwrap();
    let shadowed = np.add_rule(1, 1, &[1], &[2], tv("1xxxxxx1"), None, None).unwrap();
    let b = np.add_rule(1, 2, &[1], &[2], tv("0xxxxxxx"), None, None).unwrap();
    let unreachable = np.add_rule(1, 3, &[1], &[2], tv("xxxxxxx0"), None, None).unwrap();

    let seen = recorder();
    let sink = seen.clone();
    np.on_anomaly(move |r| sink.lock().unwrap().push(r.rule_id));

    let reports = np.check_anomalies(None).unwrap();
    let summary: Vec<(AnomalyKind, u64)> = reports.iter().map(|r| (r.kind, r.rule_id)).collect();
    assert_eq!(
        summary,
        vec![
            (AnomalyKind::Shadowed, shadowed),
            (AnomalyKind::Unreachable, unreachable),
        ]
    );
    assert_eq!(reports[0].related, vec![a]);
    assert_eq!(reports[1].related, vec![a, b]);
    assert_eq!(taken(&seen), vec![shadowed, unreachable]);

    assert!(matches!(
        np.check_anomalies(Some(7)),
        Err(PlumberError::TableNotFound(7))
    ));
}

#[test]
fn test_generalization_audit() {
    let mut config = PlumberConfig::default();
    config.anomalies.generalization = true;
    let mut np = NetPlumber::with_config(1, config).unwrap();
    np.add_table(1, &[1, 2]).unwrap();
    let general = np.add_rule(1, 0, &[1], &[2], tv("1xxxxxx1"), None, None).unwrap();
    let wide = np.add_rule(1, 1, &[1], &[2], tv("1xxxxxxx"), None, None).unwrap();

    let reports = np.check_anomalies(Some(1)).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, AnomalyKind::Generalization);
    assert_eq!(reports[0].rule_id, general);
    assert_eq!(reports[0].related, vec![wide]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Budget
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_depth_budget_marks_inconsistent() {
    let config = PlumberConfig::default().max_depth(2);
    let mut np = NetPlumber::with_config(1, config).unwrap();
    np.add_table(1, &[1, 2]).unwrap();
    np.add_table(2, &[3, 4]).unwrap();
    np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_rule(2, 0, &[3], &[4], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(10, 1).unwrap();
    assert!(np.is_consistent());

    let err = np.add_source(hs("xxxxxxxx"), &[10]).unwrap_err();
    assert!(matches!(err, PlumberError::TooComplex { reason: "depth", .. }));
    assert!(!np.is_consistent());
    assert_eq!(np.to_json()["consistent"], false);
}

#[test]
fn test_visit_budget() {
    let config = PlumberConfig::default().max_visits(3);
    let mut np = NetPlumber::with_config(1, config).unwrap();
    np.add_table(1, &[1, 2]).unwrap();
    for i in 0..4 {
        np.add_rule(1, i, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    }
    np.add_link(10, 1).unwrap();
    let err = np.add_source(hs("xxxxxxxx"), &[10]).unwrap_err();
    assert!(matches!(err, PlumberError::TooComplex { reason: "visits", .. }));
}

#[test]
fn test_invalid_config_rejected() {
    let config = PlumberConfig::default().max_depth(0);
    assert!(matches!(
        NetPlumber::with_config(1, config),
        Err(PlumberError::Config(_))
    ));
}
