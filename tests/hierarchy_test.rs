//! Tests for subcommunity resolution over flat community listings

use catex::domain::{ancestor_chain, descendants_of, Node};
use catex::util::testing::community;

fn ids(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

#[test]
fn given_root_without_children_when_resolving_then_empty() {
    let nodes = vec![community("c1", "Org", None), community("c2", "Other", None)];

    assert!(descendants_of("c1", &nodes).is_empty());
}

#[test]
fn given_unknown_root_when_resolving_then_empty() {
    let nodes = vec![community("c1", "Org", None)];

    assert!(descendants_of("missing", &nodes).is_empty());
}

#[test]
fn given_three_levels_when_resolving_then_preorder_with_sibling_order() {
    let nodes = vec![
        community("root", "Root", None),
        community("b", "B", Some("root")),
        community("a", "A", Some("root")),
        community("b1", "B1", Some("b")),
        community("b1x", "B1X", Some("b1")),
        community("a1", "A1", Some("a")),
        community("other", "Other", None),
    ];

    let result = descendants_of("root", &nodes);

    assert_eq!(ids(&result), vec!["b", "b1", "b1x", "a", "a1"]);
}

#[test]
fn given_parent_cycle_when_resolving_then_terminates_without_root() {
    let nodes = vec![
        community("root", "Root", Some("x")),
        community("x", "X", Some("root")),
    ];

    let result = descendants_of("root", &nodes);

    assert_eq!(ids(&result), vec!["x"]);
}

#[test]
fn given_duplicate_listing_when_resolving_then_each_id_once() {
    let nodes = vec![
        community("root", "Root", None),
        community("a", "A", Some("root")),
        community("a", "A", Some("root")),
        community("a1", "A1", Some("a")),
    ];

    let result = descendants_of("root", &nodes);

    assert_eq!(ids(&result), vec!["a", "a1"]);
}

#[test]
fn given_descendant_when_walking_ancestors_then_reaches_root() {
    let nodes = vec![
        community("root", "Root", None),
        community("a", "A", Some("root")),
        community("a1", "A1", Some("a")),
    ];

    assert_eq!(ancestor_chain("a1", &nodes), vec!["a1", "a", "root"]);
    assert_eq!(ancestor_chain("unknown", &nodes), vec!["unknown"]);
}
