//! Descendant resolution over a flat node collection.
//!
//! Parent links are lookup keys, so the hierarchy is rebuilt here from an index
//! of `parent id -> children` instead of being stored as pointers.

use std::collections::{HashMap, HashSet};

use tracing::{instrument, warn};

use crate::domain::entities::Node;

/// Index of children by parent id, in source order.
pub struct ChildIndex<'a> {
    children: HashMap<&'a str, Vec<&'a Node>>,
}

impl<'a> ChildIndex<'a> {
    pub fn build(nodes: &'a [Node]) -> Self {
        let mut children: HashMap<&str, Vec<&Node>> = HashMap::new();
        for node in nodes {
            if let Some(parent_id) = node.parent_id() {
                children.entry(parent_id).or_default().push(node);
            }
        }
        Self { children }
    }

    pub fn children_of(&self, id: &str) -> &[&'a Node] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// All descendants of `root_id`, depth-first pre-order.
///
/// Each node precedes its children and siblings keep source order. `root_id`
/// itself is never returned, a duplicated id is returned once (first occurrence
/// in traversal order), and parent cycles terminate.
#[instrument(level = "debug", skip(nodes), fields(nodes = nodes.len()))]
pub fn descendants_of(root_id: &str, nodes: &[Node]) -> Vec<Node> {
    let index = ChildIndex::build(nodes);
    let mut visited: HashSet<&str> = HashSet::from([root_id]);
    let mut result = Vec::new();

    let mut stack: Vec<&Node> = index.children_of(root_id).iter().rev().copied().collect();

    while let Some(node) = stack.pop() {
        if !visited.insert(node.id.as_str()) {
            if node.id == root_id {
                warn!(id = %node.id, "cycle back to root in parent references");
            }
            continue;
        }
        result.push(node.clone());

        for child in index.children_of(&node.id).iter().rev() {
            if !visited.contains(child.id.as_str()) {
                stack.push(*child);
            }
        }
    }

    result
}

/// Ids from `node_id` up to the topmost reachable ancestor, starting with `node_id`.
///
/// Stops at a missing parent or at the first repeated id.
pub fn ancestor_chain(node_id: &str, nodes: &[Node]) -> Vec<String> {
    let by_id: HashMap<&str, &Node> = nodes.iter().rev().map(|n| (n.id.as_str(), n)).collect();
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut current = Some(node_id);

    while let Some(id) = current {
        if !seen.insert(id) {
            break;
        }
        chain.push(id.to_string());
        current = by_id.get(id).and_then(|n| n.parent_id());
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeKind;

    fn community(id: &str, parent: Option<&str>) -> Node {
        let node = Node::new(NodeKind::Community, id, id.to_uppercase());
        match parent {
            Some(p) => node.with_parent(p, None),
            None => node,
        }
    }

    #[test]
    fn given_no_children_when_resolving_then_returns_empty() {
        let nodes = vec![community("a", None), community("b", None)];
        assert!(descendants_of("a", &nodes).is_empty());
    }

    #[test]
    fn given_nested_children_when_resolving_then_returns_preorder() {
        let nodes = vec![
            community("root", None),
            community("a", Some("root")),
            community("b", Some("root")),
            community("a1", Some("a")),
            community("a2", Some("a")),
            community("b1", Some("b")),
        ];

        let ids: Vec<String> = descendants_of("root", &nodes)
            .into_iter()
            .map(|n| n.id)
            .collect();

        assert_eq!(ids, vec!["a", "a1", "a2", "b", "b1"]);
    }

    #[test]
    fn given_child_listed_before_parent_when_resolving_then_still_found() {
        let nodes = vec![
            community("a1", Some("a")),
            community("a", Some("root")),
            community("root", None),
        ];
        let ids: Vec<String> = descendants_of("root", &nodes)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["a", "a1"]);
    }

    #[test]
    fn given_chain_when_walking_ancestors_then_ends_at_root() {
        let nodes = vec![
            community("root", None),
            community("a", Some("root")),
            community("a1", Some("a")),
        ];
        assert_eq!(ancestor_chain("a1", &nodes), vec!["a1", "a", "root"]);
    }

    #[test]
    fn given_cycle_when_walking_ancestors_then_terminates() {
        let nodes = vec![community("x", Some("y")), community("y", Some("x"))];
        assert_eq!(ancestor_chain("x", &nodes), vec!["x", "y"]);
    }
}
