use std::cmp::Ordering;

use crate::config::LadderizeMethod;
use crate::tree::{NodeId, Tree};

/// Relative tolerance for comparing max-edge-length keys. Subtree edge sums
/// that differ by less than this fall through to the date and name
/// tie-breaks.
const EDGE_LENGTH_EPSILON: f64 = 1e-7;

fn edge_length_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= EDGE_LENGTH_EPSILON * a.abs().max(b.abs()).max(1.0)
}

#[derive(Debug, Clone, Default)]
struct LadderizeKeys {
    max_edge_length: f64,
    max_date: String,
    max_name: String,
    leaf_count: usize,
}

fn by_max_edge_length(a: &LadderizeKeys, b: &LadderizeKeys) -> Ordering {
    if edge_length_equal(a.max_edge_length, b.max_edge_length) {
        match a.max_date.cmp(&b.max_date) {
            Ordering::Equal => a.max_name.cmp(&b.max_name),
            ordering => ordering,
        }
    } else {
        a.max_edge_length
            .partial_cmp(&b.max_edge_length)
            .unwrap_or(Ordering::Equal)
    }
}

fn by_number_of_leaves(a: &LadderizeKeys, b: &LadderizeKeys) -> Ordering {
    match a.leaf_count.cmp(&b.leaf_count) {
        Ordering::Equal => by_max_edge_length(a, b),
        ordering => ordering,
    }
}

/// Reorders every node's children in place, ascending by the chosen total
/// order. Deterministic and idempotent: the sort keys are fixed per subtree
/// and unique leaf names make the composite comparator a total order.
pub fn ladderize(tree: &mut Tree, method: LadderizeMethod) {
    log::debug!("ladderizing ({method:?})");

    let keys = compute_keys(tree);
    let order: Vec<NodeId> = tree.post_order().collect();
    for id in order {
        let mut children = std::mem::take(&mut tree.node_mut(id).children);
        children.sort_by(|&a, &b| match method {
            LadderizeMethod::MaxEdgeLength => by_max_edge_length(&keys[a], &keys[b]),
            LadderizeMethod::NumberOfLeaves => by_number_of_leaves(&keys[a], &keys[b]),
        });
        tree.node_mut(id).children = children;
    }
}

fn compute_keys(tree: &Tree) -> Vec<LadderizeKeys> {
    let mut keys: Vec<LadderizeKeys> = vec![LadderizeKeys::default(); tree.len()];
    for id in tree.post_order() {
        let node = &tree[id];
        if node.is_leaf() {
            keys[id] = LadderizeKeys {
                max_edge_length: node.edge_length,
                max_date: node.date.clone().unwrap_or_default(),
                max_name: node.name.clone(),
                leaf_count: 1,
            };
        } else {
            let mut max_child_edge = f64::NEG_INFINITY;
            let mut max_date = String::new();
            let mut max_name = String::new();
            let mut leaf_count = 0;
            for &child in &node.children {
                let child_keys = &keys[child];
                max_child_edge = max_child_edge.max(child_keys.max_edge_length);
                if child_keys.max_date > max_date {
                    max_date = child_keys.max_date.clone();
                }
                if child_keys.max_name > max_name {
                    max_name = child_keys.max_name.clone();
                }
                leaf_count += child_keys.leaf_count;
            }
            keys[id] = LadderizeKeys {
                max_edge_length: node.edge_length + max_child_edge,
                max_date,
                max_name,
                leaf_count,
            };
        }
    }
    keys
}
