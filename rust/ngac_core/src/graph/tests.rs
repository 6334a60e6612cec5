//! Tests for the in-memory graph store.

use std::collections::BTreeSet;

use crate::error::{EdgeRelation, NgacError};
use crate::graph::*;
use crate::types::*;

// ============================================================================
// Helper builders
// ============================================================================

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// pc1 <- ua1 <- u1, pc1 <- oa1 <- o1, ua1 -> oa1 {r, w}
fn basic_graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    g.create_policy_class("pc1").unwrap();
    g.create_node("ua1", Kind::UserAttribute, Properties::new(), &["pc1"])
        .unwrap();
    g.create_node("oa1", Kind::ObjectAttribute, Properties::new(), &["pc1"])
        .unwrap();
    g.create_node("u1", Kind::User, Properties::new(), &["ua1"])
        .unwrap();
    g.create_node("o1", Kind::Object, Properties::new(), &["oa1"])
        .unwrap();
    g.associate("ua1", "oa1", Operations::from(["r", "w"]))
        .unwrap();
    g
}

/// Create a node of `kind` with a legal parent chain under a fresh policy class.
fn node_of_kind(g: &mut MemoryGraph, name: &str, kind: Kind) {
    let pc = format!("{name}_pc");
    g.create_policy_class(&pc).unwrap();
    match kind {
        Kind::PolicyClass => {
            g.create_policy_class(name).unwrap();
        }
        Kind::ObjectAttribute | Kind::UserAttribute => {
            g.create_node(name, kind, Properties::new(), &[pc.as_str()]).unwrap();
        }
        Kind::Object => {
            let oa = format!("{name}_oa");
            g.create_node(&oa, Kind::ObjectAttribute, Properties::new(), &[pc.as_str()])
                .unwrap();
            g.create_node(name, kind, Properties::new(), &[oa.as_str()]).unwrap();
        }
        Kind::User => {
            let ua = format!("{name}_ua");
            g.create_node(&ua, Kind::UserAttribute, Properties::new(), &[pc.as_str()])
                .unwrap();
            g.create_node(name, kind, Properties::new(), &[ua.as_str()]).unwrap();
        }
    }
}

// ============================================================================
// Node lifecycle
// ============================================================================

#[test]
fn create_policy_class_twice_fails() {
    let mut g = MemoryGraph::new();
    g.create_policy_class("pc1").unwrap();
    assert_eq!(
        g.create_policy_class("pc1"),
        Err(NgacError::AlreadyExists("pc1".into()))
    );
    assert!(g.exists("pc1"));
    assert_eq!(g.get_node("pc1").unwrap().kind, Kind::PolicyClass);
    assert!(g.get_parents("pc1").unwrap().is_empty());
}

#[test]
fn create_node_requires_parents() {
    let mut g = MemoryGraph::new();
    g.create_policy_class("pc1").unwrap();
    assert_eq!(
        g.create_node("oa1", Kind::ObjectAttribute, Properties::new(), &[]),
        Err(NgacError::NoParents("oa1".into()))
    );
    assert!(!g.exists("oa1"));
}

#[test]
fn create_node_missing_parent_fails() {
    let mut g = MemoryGraph::new();
    g.create_policy_class("pc1").unwrap();
    let err = g
        .create_node("oa1", Kind::ObjectAttribute, Properties::new(), &["pc1", "nope"])
        .unwrap_err();
    assert!(matches!(err, NgacError::NotFound { entity: "node", .. }));
    assert!(!g.exists("oa1"));
    assert!(g.get_children("pc1").unwrap().is_empty());
}

#[test]
fn rejected_multi_parent_create_leaves_no_edges() {
    let mut g = basic_graph();
    // second parent is a user attribute: illegal for an object attribute
    let err = g
        .create_node("oa2", Kind::ObjectAttribute, Properties::new(), &["oa1", "ua1"])
        .unwrap_err();
    assert_eq!(
        err,
        NgacError::InvalidEdge {
            relation: EdgeRelation::Assignment,
            from: Kind::ObjectAttribute,
            to: Kind::UserAttribute,
        }
    );
    assert!(!g.exists("oa2"));
    assert_eq!(g.get_children("oa1").unwrap(), names(&["o1"]));
    assert!(!g.get_assignments().unwrap().contains_key("oa2"));
}

#[test]
fn create_node_duplicate_name_fails() {
    let mut g = basic_graph();
    assert_eq!(
        g.create_node("o1", Kind::Object, Properties::new(), &["oa1"]),
        Err(NgacError::AlreadyExists("o1".into()))
    );
}

#[test]
fn update_node_replaces_properties() {
    let mut g = basic_graph();
    g.update_node("o1", props(&[("a", "1"), ("b", "2")])).unwrap();
    g.update_node("o1", props(&[("c", "3")])).unwrap();
    assert_eq!(g.get_node("o1").unwrap().properties, props(&[("c", "3")]));

    assert!(matches!(
        g.update_node("ghost", Properties::new()),
        Err(NgacError::NotFound { .. })
    ));
}

#[test]
fn returned_nodes_are_copies() {
    let g = basic_graph();
    let mut node = g.get_node("o1").unwrap();
    node.properties.insert("k".into(), "v".into());
    assert!(g.get_node("o1").unwrap().properties.is_empty());

    let mut assocs = g.get_associations_for_subject("ua1").unwrap();
    assocs.get_mut("oa1").unwrap().add("x");
    assert_eq!(
        g.get_associations_for_subject("ua1").unwrap()["oa1"],
        Operations::from(["r", "w"])
    );
}

#[test]
fn find_by_kind_and_properties() {
    let mut g = basic_graph();
    g.create_node(
        "o2",
        Kind::Object,
        props(&[("owner", "alice"), ("tier", "gold")]),
        &["oa1"],
    )
    .unwrap();
    g.create_node("o3", Kind::Object, props(&[("owner", "bob")]), &["oa1"])
        .unwrap();

    let all: Vec<String> = g
        .find(Kind::Object, &Properties::new())
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(all, vec!["o1", "o2", "o3"]);

    let alice: Vec<String> = g
        .find(Kind::Object, &props(&[("owner", "alice")]))
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(alice, vec!["o2"]);

    assert!(g
        .find(Kind::User, &props(&[("owner", "alice")]))
        .unwrap()
        .is_empty());
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn delete_blocked_by_children() {
    let mut g = basic_graph();
    assert_eq!(
        g.delete_node("oa1"),
        Err(NgacError::HasChildren("oa1".into()))
    );
    assert!(g.exists("oa1"));

    g.delete_node("o1").unwrap();
    g.delete_node("oa1").unwrap();
    assert!(!g.exists("oa1"));
    assert!(g.get_associations_for_subject("ua1").unwrap().is_empty());
    assert!(g.get_children("pc1").unwrap().contains("ua1"));
    assert!(!g.get_children("pc1").unwrap().contains("oa1"));
}

#[test]
fn delete_removes_subject_associations() {
    let mut g = basic_graph();
    g.delete_node("u1").unwrap();
    g.delete_node("ua1").unwrap();
    assert!(g.get_associations().unwrap().is_empty());
}

#[test]
fn delete_missing_node_fails() {
    let mut g = MemoryGraph::new();
    assert!(matches!(
        g.delete_node("ghost"),
        Err(NgacError::NotFound { .. })
    ));
}

// ============================================================================
// Edges
// ============================================================================

#[test]
fn assign_and_deassign() {
    let mut g = basic_graph();
    g.create_node("oa2", Kind::ObjectAttribute, Properties::new(), &["pc1"])
        .unwrap();
    g.assign("o1", "oa2").unwrap();
    assert_eq!(g.get_parents("o1").unwrap(), names(&["oa1", "oa2"]));
    assert_eq!(g.get_children("oa2").unwrap(), names(&["o1"]));

    g.deassign("o1", "oa2").unwrap();
    assert_eq!(g.get_parents("o1").unwrap(), names(&["oa1"]));
    assert!(g.get_children("oa2").unwrap().is_empty());

    // absent edge is a no-op
    g.deassign("o1", "oa2").unwrap();
}

#[test]
fn assign_missing_node_fails() {
    let mut g = basic_graph();
    assert!(matches!(
        g.assign("o1", "ghost"),
        Err(NgacError::NotFound { .. })
    ));
    assert!(matches!(
        g.assign("ghost", "oa1"),
        Err(NgacError::NotFound { .. })
    ));
}

#[test]
fn assign_illegal_kind_pair() {
    let mut g = basic_graph();
    assert!(matches!(
        g.assign("u1", "oa1"),
        Err(NgacError::InvalidEdge {
            relation: EdgeRelation::Assignment,
            ..
        })
    ));
}

#[test]
fn reassociation_replaces_operations() {
    let mut g = basic_graph();
    g.associate("ua1", "oa1", Operations::from(["r"])).unwrap();
    g.associate("ua1", "oa1", Operations::from(["w"])).unwrap();
    assert_eq!(
        g.get_associations_for_subject("ua1").unwrap()["oa1"],
        Operations::from(["w"])
    );
}

#[test]
fn association_kind_rules() {
    let mut g = basic_graph();
    assert!(matches!(
        g.associate("u1", "oa1", Operations::all()),
        Err(NgacError::InvalidEdge {
            relation: EdgeRelation::Association,
            ..
        })
    ));
    assert!(g.associate("ua1", "o1", Operations::all()).is_err());
    g.associate("ua1", "ua1", Operations::from(["assign"]))
        .unwrap();

    g.dissociate("ua1", "oa1").unwrap();
    assert_eq!(
        g.get_associations_for_subject("ua1").unwrap().keys().collect::<Vec<_>>(),
        vec!["ua1"]
    );
}

#[test]
fn every_kind_pair_follows_table() {
    for child in Kind::ALL {
        for parent in Kind::ALL {
            let mut g = MemoryGraph::new();
            node_of_kind(&mut g, "c", child);
            node_of_kind(&mut g, "p", parent);

            let legal = check_assignment(child, parent).is_ok();
            let result = g.assign("c", "p");
            assert_eq!(result.is_ok(), legal, "{child} -> {parent}");
            if !legal {
                assert!(matches!(result, Err(NgacError::InvalidEdge { .. })));
            }

            if child != Kind::PolicyClass {
                let created = g.create_node("n", child, Properties::new(), &["p"]);
                assert_eq!(created.is_ok(), legal, "create {child} under {parent}");
            }
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn snapshot_roundtrip_through_json() {
    let mut g = basic_graph();
    g.update_node("o1", props(&[("owner", "alice")])).unwrap();
    g.associate("ua1", "oa1", Operations::from(["*", "r"]))
        .unwrap();

    let json = serde_json::to_string(&g.snapshot()).unwrap();
    let decoded: GraphSnapshot = serde_json::from_str(&json).unwrap();
    let restored = MemoryGraph::from_snapshot(decoded).unwrap();

    assert_eq!(restored.snapshot(), g.snapshot());
    assert_eq!(restored.get_node("pc1").unwrap().kind, Kind::PolicyClass);
    assert!(restored.get_associations_for_subject("ua1").unwrap()["oa1"].has_wildcard());
    assert_eq!(restored.get_children("oa1").unwrap(), names(&["o1"]));
}

#[test]
fn snapshot_with_illegal_edge_is_rejected() {
    let g = basic_graph();
    let mut snap = g.snapshot();
    snap.assignments
        .entry("u1".into())
        .or_default()
        .insert("oa1".into());

    let mut target = MemoryGraph::new();
    target.create_policy_class("keep").unwrap();
    assert!(target.restore(snap).is_err());
    assert!(target.exists("keep"));
}

#[test]
fn snapshot_with_parentless_node_is_rejected() {
    let g = basic_graph();
    let mut snap = g.snapshot();
    snap.assignments.remove("o1");

    let mut target = MemoryGraph::new();
    target.create_policy_class("keep").unwrap();
    assert_eq!(
        target.restore(snap),
        Err(NgacError::NoParents("o1".into()))
    );
    assert!(target.exists("keep"));

    // policy classes need no parents
    let mut pcs_only = MemoryGraph::new();
    pcs_only.create_policy_class("pc1").unwrap();
    assert!(MemoryGraph::from_snapshot(pcs_only.snapshot()).is_ok());
}

#[test]
fn capture_matches_snapshot() {
    let g = basic_graph();
    assert_eq!(GraphSnapshot::capture(&g).unwrap(), g.snapshot());
}
