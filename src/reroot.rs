use crate::tree::{NodeId, Tree};

#[derive(Debug, thiserror::Error)]
pub enum RerootError {
    #[error("re-root path does not start at the current root")]
    NotFromRoot,
    #[error("re-root path is not a parent-child chain")]
    BrokenPath,
    #[error("{0} not found in the tree")]
    NameNotFound(String),
}

/// Builds a re-rooted copy of the tree around the last node of the given
/// root-to-node path, preserving the unrooted topology: every path node
/// contributes a reversed node carrying its other children and the next path
/// node's edge length, chained beneath the new root after its own children.
///
/// The input tree is never mutated. The result is a fresh arena; node ids
/// and any side tables or `for_left` references computed for the old tree do
/// not apply to it.
pub fn re_root(tree: &Tree, path: &[NodeId]) -> Result<Tree, RerootError> {
    match path.first() {
        Some(&first) if tree.is_rooted() && first == tree.root() => {}
        _ => return Err(RerootError::NotFromRoot),
    }
    for pair in path.windows(2) {
        if !tree[pair[0]].children.contains(&pair[1]) {
            return Err(RerootError::BrokenPath);
        }
    }

    let mut out = Tree::new();

    // innermost reversed node first: the root's other children end up
    // deepest in the chain
    let mut lineage: Option<NodeId> = None;
    for pair in path.windows(2) {
        let (node, next) = (pair[0], pair[1]);
        let mut children: Vec<NodeId> = tree[node]
            .children
            .iter()
            .filter(|&&child| child != next)
            .map(|&child| copy_subtree(tree, child, &mut out))
            .collect();
        if let Some(inner) = lineage {
            children.push(inner);
        }
        lineage = Some(out.add_internal(children, tree[next].edge_length));
    }

    let target = path[path.len() - 1];
    let mut children: Vec<NodeId> = tree[target]
        .children
        .iter()
        .map(|&child| copy_subtree(tree, child, &mut out))
        .collect();
    if let Some(inner) = lineage {
        children.push(inner);
    }
    let root = out.add_internal(children, 0.0);
    out.node_mut(root).name = tree[tree.root()].name.clone();
    out.set_root(root);
    Ok(out)
}

/// Re-roots at the parent of the named leaf.
pub fn re_root_at(tree: &Tree, name: &str) -> Result<Tree, RerootError> {
    let mut path = tree
        .path_to_name(name)
        .ok_or_else(|| RerootError::NameNotFound(name.to_string()))?;
    path.pop();
    re_root(tree, &path)
}

fn copy_subtree(src: &Tree, id: NodeId, dst: &mut Tree) -> NodeId {
    let node = &src[id];
    let copy = if node.is_leaf() {
        dst.add_leaf(node.name.clone(), node.edge_length)
    } else {
        let children: Vec<NodeId> = node
            .children
            .iter()
            .map(|&child| copy_subtree(src, child, dst))
            .collect();
        let copy = dst.add_internal(children, node.edge_length);
        dst.node_mut(copy).name = node.name.clone();
        copy
    };
    let copied = dst.node_mut(copy);
    copied.sequence = node.sequence.clone();
    copied.date = node.date.clone();
    copied.continent = node.continent.clone();
    copy
}
