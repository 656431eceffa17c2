//! Tree walkers (§4.1): `prewalk`/`postwalk` for read-only traversal,
//! `modprewalk`/`modpostwalk`/`modprepostwalk` for passes that rewrite
//! the tree as they go (a callback may substitute a different node id
//! for the one it was given).

use super::{NodeId, Tree};

fn children_of(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    tree.node(id).subnodes.iter().flatten().copied().collect()
}

/// Visit `root` before its children.
pub fn prewalk(tree: &Tree, root: NodeId, f: &mut impl FnMut(&Tree, NodeId)) {
    f(tree, root);
    for child in children_of(tree, root) {
        prewalk(tree, child, f);
    }
}

/// Visit `root` after its children (the order `constprop`/`typecheck` need).
pub fn postwalk(tree: &Tree, root: NodeId, f: &mut impl FnMut(&Tree, NodeId)) {
    for child in children_of(tree, root) {
        postwalk(tree, child, f);
    }
    f(tree, root);
}

/// Pre-order walk that may replace a node before descending into its
/// (possibly new) children. Returns the id the root was rewritten to.
pub fn modprewalk(
    tree: &mut Tree,
    root: NodeId,
    f: &mut impl FnMut(&mut Tree, NodeId) -> Option<NodeId>,
) -> NodeId {
    let root = f(tree, root).unwrap_or(root);
    let children = children_of(tree, root);
    for (index, child) in children.into_iter().enumerate() {
        let new_child = modprewalk(tree, child, f);
        tree.node_mut(root).subnodes[index] = Some(new_child);
    }
    root
}

/// Post-order walk that may replace a node after its children have
/// already been rewritten.
pub fn modpostwalk(
    tree: &mut Tree,
    root: NodeId,
    f: &mut impl FnMut(&mut Tree, NodeId) -> Option<NodeId>,
) -> NodeId {
    let children = children_of(tree, root);
    for (index, child) in children.into_iter().enumerate() {
        let new_child = modpostwalk(tree, child, f);
        tree.node_mut(root).subnodes[index] = Some(new_child);
    }
    f(tree, root).unwrap_or(root)
}

/// Both a pre- and a post-order rewrite callback in one traversal —
/// used by passes (like `betrans`) that need to set up context on the
/// way down and finalize it on the way back up.
pub fn modprepostwalk(
    tree: &mut Tree,
    root: NodeId,
    pre: &mut impl FnMut(&mut Tree, NodeId) -> Option<NodeId>,
    post: &mut impl FnMut(&mut Tree, NodeId) -> Option<NodeId>,
) -> NodeId {
    let root = pre(tree, root).unwrap_or(root);
    let children = children_of(tree, root);
    for (index, child) in children.into_iter().enumerate() {
        let new_child = modprepostwalk(tree, child, pre, post);
        tree.node_mut(root).subnodes[index] = Some(new_child);
    }
    post(tree, root).unwrap_or(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Origin;
    use crate::symtab::Interner;

    fn sample_tree() -> (Tree, NodeId, NodeId, NodeId) {
        let mut interner = Interner::new();
        let leaf = interner.intern("INTEGER");
        let add = interner.intern("ADD");
        let mut tree = Tree::new();
        let org = Origin { file_id: 0, line: 1 };
        let lhs = tree.alloc(leaf, org);
        let rhs = tree.alloc(leaf, org);
        let root = tree.alloc_with(add, org, vec![Some(lhs), Some(rhs)], None);
        (tree, root, lhs, rhs)
    }

    #[test]
    fn prewalk_visits_parent_first() {
        let (tree, root, lhs, rhs) = sample_tree();
        let mut order = Vec::new();
        prewalk(&tree, root, &mut |_, id| order.push(id));
        assert_eq!(order, vec![root, lhs, rhs]);
    }

    #[test]
    fn postwalk_visits_children_first() {
        let (tree, root, lhs, rhs) = sample_tree();
        let mut order = Vec::new();
        postwalk(&tree, root, &mut |_, id| order.push(id));
        assert_eq!(order, vec![lhs, rhs, root]);
    }

    #[test]
    fn modpostwalk_can_fold_children_into_parent() {
        let (mut tree, root, _lhs, _rhs) = sample_tree();
        let folded = modpostwalk(&mut tree, root, &mut |t, id| {
            if t.node(id).tag == t.node(root).tag && id != root {
                None
            } else if id == root {
                // both children are leaves with no literal in this
                // fixture, so just verify we can replace the root.
                Some(id)
            } else {
                None
            }
        });
        assert_eq!(folded, root);
    }

    #[test]
    fn modprewalk_replacement_propagates_to_children_lookup() {
        let mut interner = Interner::new();
        let leaf = interner.intern("INTEGER");
        let mut tree = Tree::new();
        let org = Origin { file_id: 0, line: 1 };
        let a = tree.alloc(leaf, org);
        let b = tree.alloc(leaf, org);
        let replaced = modprewalk(&mut tree, a, &mut |_, id| if id == a { Some(b) } else { None });
        assert_eq!(replaced, b);
    }
}
