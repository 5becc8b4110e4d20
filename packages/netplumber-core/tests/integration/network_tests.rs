//! Tables, rules, links and sources through the public API

#[path = "../common/mod.rs"]
mod common;
use common::*;

use netplumber_core::{
    rule_id, EventKind, FlowStats, NetPlumber, NodeType, PacketSet, PipeStats, PlumberError,
};
use pretty_assertions::assert_eq;

// ═══════════════════════════════════════════════════════════════════════════
// Two rules, one source
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_source_splits_across_rules() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();

    let at_a = live_flows(&np, a);
    let at_b = live_flows(&np, b);
    assert_eq!(at_a.len(), 1);
    assert_eq!(at_b.len(), 1);
    assert_same_set(&at_a[0], "1xxxxxx1");
    assert_same_set(&at_b[0], "1xxxxxx0");

    // the two matches are disjoint
    assert_eq!(np.pipe_stats(a).unwrap().effects, 0);
    assert_eq!(np.pipe_stats(b).unwrap().influences, 0);

    assert_eq!(
        np.pipe_stats(src).unwrap(),
        PipeStats {
            fwd: 2,
            bck: 0,
            effects: 0,
            influences: 0
        }
    );
    assert_eq!(np.node(src).unwrap().node_type(), NodeType::Source);
}

#[test]
fn test_rule_ids_encode_table_and_index() {
    let TwoRuleNet { np, a, b } = two_rule_net();
    assert_eq!(a, rule_id(1, 0));
    assert_eq!(b, 0x1_0000_0001);
    assert_eq!(np.table_rules(1), Some(vec![a, b]));
    assert_eq!(np.node(a).unwrap().table(), Some(1));
}

#[test]
fn test_remove_rule_absorbs_only_its_flows() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();

    np.remove_rule(a).unwrap();

    assert!(np.node(a).is_none());
    assert!(np.flows_at(a).is_err());
    assert_same_set(&live_flows(&np, b)[0], "1xxxxxx0");
    assert_eq!(np.pipe_stats(src).unwrap().fwd, 1);
    assert_eq!(np.last_event().unwrap().kind, EventKind::RemoveRule);
}

#[test]
fn test_source_added_before_link() {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2]).unwrap();
    let a = np.add_rule(1, 0, &[1], &[2], tv("xxxxxxx1"), None, None).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert!(live_flows(&np, a).is_empty());

    np.add_link(10, 1).unwrap();
    assert_same_set(&live_flows(&np, a)[0], "xxxxxxx1");

    let event = np.last_event().unwrap();
    assert_eq!((event.kind, event.id1, event.id2), (EventKind::AddLink, 10, 1));
}

#[test]
fn test_remove_link_absorbs_downstream() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();

    np.remove_link(10, 1).unwrap();
    assert!(np.flows_at(a).unwrap().is_empty());
    assert!(np.flows_at(b).unwrap().is_empty());
    assert_eq!(np.pipe_stats(src).unwrap().fwd, 0);
    assert!(np.links().is_empty());
    assert!(np.dst_ports(10).is_empty());

    np.add_link(10, 1).unwrap();
    assert_eq!(live_flows(&np, a).len(), 1);
}

#[test]
fn test_duplicate_link_is_noop() {
    let TwoRuleNet { mut np, a, .. } = two_rule_net();
    np.add_source(hs("1xxxxxxx"), &[10]).unwrap();
    np.add_link(10, 1).unwrap();
    assert_eq!(np.links(), vec![(10, 1)]);
    assert_eq!(np.flows_at(a).unwrap().len(), 1);
    assert_eq!(np.src_ports(1), &[10]);
}

#[test]
fn test_remove_source() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();
    np.remove_source(src).unwrap();

    assert!(np.flows_at(a).unwrap().is_empty());
    assert!(np.flows_at(b).unwrap().is_empty());
    assert!(np.source_ids().is_empty());
    assert_eq!(np.pipe_stats(a).unwrap().bck, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Priorities
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_higher_priority_rule_takes_its_share() {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2]).unwrap();
    let low = np.add_rule(1, 5, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();
    assert_same_set(&live_flows(&np, low)[0], "xxxxxxxx");

    let high = np.add_rule(1, 0, &[1], &[2], tv("1xxxxxxx"), None, None).unwrap();
    assert_same_set(&live_flows(&np, high)[0], "1xxxxxxx");
    assert_same_set(&live_flows(&np, low)[0], "0xxxxxxx");
    assert_eq!(np.pipe_stats(high).unwrap().effects, 1);
    assert_eq!(np.pipe_stats(low).unwrap().influences, 1);

    np.remove_rule(high).unwrap();
    assert_same_set(&live_flows(&np, low)[0], "xxxxxxxx");
    assert_eq!(np.pipe_stats(low).unwrap().influences, 0);
}

#[test]
fn test_full_overlap_kills_lower_flow() {
    let TwoRuleNet { mut np, b, .. } = two_rule_net();
    np.add_source(hs("1xxxxxxx"), &[10]).unwrap();

    // replaces A at index 0 with a catch-all
    let all = np.add_rule(1, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap();
    assert_same_set(&live_flows(&np, all)[0], "1xxxxxxx");
    assert!(live_flows(&np, b).is_empty());
    assert_eq!(np.table_rules(1).unwrap().len(), 2);
}

#[test]
fn test_influence_limited_to_shared_ports() {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2, 3]).unwrap();
    let high = np.add_rule(1, 0, &[1], &[3], tv("xxxxxxxx"), None, None).unwrap();
    let low = np.add_rule(1, 1, &[2], &[3], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(10, 2).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();

    assert_eq!(np.pipe_stats(high).unwrap().effects, 0);
    assert_same_set(&live_flows(&np, low)[0], "xxxxxxxx");
}

#[test]
fn test_empty_in_ports_means_table_ports() {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2]).unwrap();
    let r = np.add_rule(1, 0, &[], &[2], tv("xxxxxxxx"), None, None).unwrap();
    assert_eq!(&**np.node(r).unwrap().input_ports(), &[1, 2]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Multi-table chains and rewrites
// ═══════════════════════════════════════════════════════════════════════════

/// 10 -> [t1: 1 -> 2 rewrite] -> 3 -> [t2: 3 -> 4]
fn rewrite_chain() -> (NetPlumber, u64, u64) {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2]).unwrap();
    np.add_table(2, &[3, 4]).unwrap();
    let r1 = np
        .add_rule(
            1,
            0,
            &[1],
            &[2],
            tv("xxxxxxxx"),
            Some(tv("11110000")),
            Some(tv("1010xxxx")),
        )
        .unwrap();
    let r2 = np.add_rule(2, 5, &[3], &[4], tv("1010xxxx"), None, None).unwrap();
    np.add_link(2, 3).unwrap();
    np.add_link(10, 1).unwrap();
    (np, r1, r2)
}

#[test]
fn test_rewrite_carries_through_chain() {
    let (mut np, r1, r2) = rewrite_chain();
    np.add_source(hs("0xxxxxxx"), &[10]).unwrap();

    assert_same_set(&live_flows(&np, r1)[0], "1010xxxx");
    assert_same_set(&live_flows(&np, r2)[0], "1010xxxx");
    assert_eq!(np.node(r1).unwrap().inv_match().to_string(), "1010xxxx");
}

#[test]
fn test_drop_rule_downstream_leaves_exclusion() {
    let (mut np, _, r2) = rewrite_chain();
    np.add_source(hs("0xxxxxxx"), &[10]).unwrap();

    let drop = np.add_rule(2, 0, &[3], &[], tv("1010111x"), None, None).unwrap();
    assert_same_set(&live_flows(&np, drop)[0], "1010111x");
    assert_same_set(&live_flows(&np, r2)[0], "((1010xxxx - (1010111x)))");
    assert_eq!(
        np.source_flow_stats(r2).unwrap(),
        FlowStats { inc: 1, exc: 1 }
    );

    np.remove_rule(drop).unwrap();
    assert_same_set(&live_flows(&np, r2)[0], "1010xxxx");
    assert_eq!(np.source_flow_stats(r2).unwrap(), FlowStats { inc: 1, exc: 0 });
}

#[test]
fn test_remove_table_drops_its_rules() {
    let (mut np, r1, r2) = rewrite_chain();
    np.add_source(hs("0xxxxxxx"), &[10]).unwrap();

    np.remove_table(1).unwrap();
    assert!(np.node(r1).is_none());
    assert!(np.flows_at(r2).unwrap().is_empty());
    assert_eq!(np.table_ids(), vec![2]);
    assert_eq!(np.last_event().unwrap().kind, EventKind::RemoveTable);
}

#[test]
fn test_flow_does_not_leave_through_its_entry_port() {
    let mut np = NetPlumber::new(1);
    np.add_table(1, &[1, 2]).unwrap();
    let back = np.add_rule(1, 0, &[1], &[1, 2], tv("xxxxxxxx"), None, None).unwrap();
    np.add_table(2, &[5, 6]).unwrap();
    let via_1 = np.add_rule(2, 0, &[5], &[6], tv("xxxxxxxx"), None, None).unwrap();
    let via_2 = np.add_rule(2, 1, &[6], &[5], tv("xxxxxxxx"), None, None).unwrap();
    np.add_link(1, 5).unwrap();
    np.add_link(2, 6).unwrap();
    np.add_link(10, 1).unwrap();
    np.add_source(hs("xxxxxxxx"), &[10]).unwrap();

    assert_eq!(live_flows(&np, back).len(), 1);
    assert!(live_flows(&np, via_1).is_empty());
    assert_eq!(live_flows(&np, via_2).len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_invalid_arguments_change_nothing() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();

    let err = np.add_rule(1, 7, &[9], &[2], tv("xxxxxxxx"), None, None).unwrap_err();
    assert!(matches!(err, PlumberError::PortNotInTable { table: 1, port: 9 }));

    let err = np.add_rule(1, 7, &[1], &[9], tv("xxxxxxxx"), None, None).unwrap_err();
    assert!(matches!(err, PlumberError::PortNotInTable { port: 9, .. }));

    let err = np
        .add_rule(1, 7, &[1], &[2], tv("xxxxxxxx,xxxxxxxx"), None, None)
        .unwrap_err();
    assert!(matches!(err, PlumberError::LengthMismatch { expected: 1, found: 2 }));

    let err = np
        .add_rule(1, 7, &[1], &[2], tv("xxxxxxxx"), Some(tv("11111111")), None)
        .unwrap_err();
    assert!(matches!(err, PlumberError::InvalidRule(_)));

    let err = np.add_rule(3, 0, &[1], &[2], tv("xxxxxxxx"), None, None).unwrap_err();
    assert!(matches!(err, PlumberError::TableNotFound(3)));

    assert_eq!(np.table_rules(1), Some(vec![a, b]));
    assert_eq!(np.last_event().unwrap().kind, EventKind::AddLink);
}

#[test]
fn test_table_and_node_errors() {
    let TwoRuleNet { mut np, a, .. } = two_rule_net();
    assert!(matches!(np.add_table(0, &[1]), Err(PlumberError::InvalidTable(0))));
    assert!(matches!(np.add_table(1, &[1]), Err(PlumberError::TableExists(1))));
    assert!(matches!(np.remove_table(9), Err(PlumberError::TableNotFound(9))));
    assert!(matches!(
        np.remove_link(3, 4),
        Err(PlumberError::LinkNotFound { from: 3, to: 4 })
    ));
    assert!(matches!(
        np.remove_source(a),
        Err(PlumberError::WrongNodeType { expected: "source", .. })
    ));
    assert!(matches!(np.remove_rule(0x99), Err(PlumberError::NodeNotFound(0x99))));
    assert!(matches!(
        np.add_source(hs("xxxxxxxx,xxxxxxxx"), &[10]),
        Err(PlumberError::LengthMismatch { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// Expand and export
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_expand_widens_everything() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();
    np.add_source(hs("1xxxxxxx"), &[10]).unwrap();

    assert_eq!(np.expand(2).unwrap(), 2);
    assert_eq!(np.expand(1).unwrap(), 2);
    assert_eq!(np.length(), 2);

    let at_a = &live_flows(&np, a)[0];
    assert_eq!(at_a.length(), 2);
    assert_same_set(at_a, "1xxxxxx1,xxxxxxxx");

    // rules of the new width are accepted and propagate
    let c = np
        .add_rule(1, 2, &[1], &[2], tv("xxxxxxxx,xxxxxxx1"), None, None)
        .unwrap();
    assert!(live_flows(&np, c).is_empty(), "covered by A and B");
    assert_eq!(live_flows(&np, b).len(), 1);
    let event = np.last_event().unwrap();
    assert_eq!(event.kind, EventKind::AddRule);
}

#[test]
fn test_expand_event() {
    let mut np = NetPlumber::new(1);
    np.expand(4).unwrap();
    let event = np.last_event().unwrap();
    assert_eq!((event.kind, event.id1), (EventKind::Expand, 4));
}

#[test]
fn test_json_export() {
    let TwoRuleNet { mut np, .. } = two_rule_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();

    let json = np.to_json();
    assert_eq!(json["length"], 1);
    assert_eq!(json["tables"][0]["id"], 1);
    assert_eq!(json["tables"][0]["ports"], serde_json::json!([1, 2]));
    assert_eq!(json["tables"][0]["rules"][0]["match"], "xxxxxxx1");
    assert_eq!(json["tables"][0]["rules"][1]["id"], "0x100000001");
    assert_eq!(json["links"], serde_json::json!([[10, 1]]));
    assert_eq!(json["sources"][0]["id"], src);
    let root = &json["sources"][0]["flows"][0];
    assert_eq!(root["children"].as_array().unwrap().len(), 2);
}

#[test]
fn test_node_ids_sorted() {
    let TwoRuleNet { mut np, a, b } = two_rule_net();
    let src = np.add_source(hs("1xxxxxxx"), &[10]).unwrap();
    assert_eq!(np.node_ids(), vec![src, a, b]);
    assert_eq!(np.source_ids(), vec![src]);
}
