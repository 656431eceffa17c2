//! The generic typed-tree core (§3-§4.1): `tnode`s live in a flat arena
//! and refer to each other by index rather than by pointer, so label/
//! fixup-style reference cycles (§9's redesign concern) can't arise in
//! the tree itself either.

pub mod compops;
pub mod flags;
pub mod hook;
pub mod registry;
pub mod walk;

use crate::span::Origin;
use crate::symtab::{Name, Sym};
use flags::NodeFlags;
use hook::HookSet;

/// An index into a [`Tree`]'s node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }

    pub fn from_index(index: u32) -> Self {
        NodeId(index)
    }
}

/// A literal value attached at parse time, before any constant folding.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Sym(Sym),
}

/// One node in the tree: a tag, its subnodes, any bound names, a
/// literal (leaf nodes only), compiler hooks, and its source origin.
#[derive(Clone, Debug)]
pub struct TNode {
    pub tag: Sym,
    pub subnodes: Vec<Option<NodeId>>,
    pub names: Vec<Name>,
    pub literal: Option<Literal>,
    /// Set by the `constprop` pass once this node's value is known.
    pub const_value: Option<i64>,
    pub hooks: HookSet,
    pub flags: NodeFlags,
    pub org: Origin,
}

impl TNode {
    pub fn is_const(&self) -> bool {
        self.const_value.is_some()
    }
}

/// The arena owning every node produced while compiling one source file
/// (and, for the AVR back-end, the handful of synthetic nodes codegen
/// allocates for resolved label addresses).
#[derive(Default)]
pub struct Tree {
    nodes: Vec<TNode>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a leaf node with no subnodes.
    pub fn alloc(&mut self, tag: Sym, org: Origin) -> NodeId {
        self.alloc_with(tag, org, Vec::new(), None)
    }

    pub fn alloc_with(
        &mut self,
        tag: Sym,
        org: Origin,
        subnodes: Vec<Option<NodeId>>,
        literal: Option<Literal>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TNode {
            tag,
            subnodes,
            names: Vec::new(),
            literal,
            const_value: None,
            hooks: HookSet::new(),
            flags: NodeFlags::empty(),
            org,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &TNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn subnode(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0 as usize].subnodes.get(index).copied().flatten()
    }

    /// A depth-first, left-to-right list of this subtree's node ids
    /// (root last) — the bottom-up order `constprop`/`typecheck` need.
    pub fn postorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        walk::postwalk(self, root, &mut |_tree, id| out.push(id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::Interner;

    #[test]
    fn alloc_and_subnode_access() {
        let mut interner = Interner::new();
        let tag = interner.intern("ADD");
        let leaf_tag = interner.intern("INTEGER");
        let mut tree = Tree::new();
        let org = Origin { file_id: 0, line: 1 };
        let lhs = tree.alloc_with(leaf_tag, org, Vec::new(), Some(Literal::Int(1)));
        let rhs = tree.alloc_with(leaf_tag, org, Vec::new(), Some(Literal::Int(2)));
        let add = tree.alloc_with(tag, org, vec![Some(lhs), Some(rhs)], None);

        assert_eq!(tree.subnode(add, 0), Some(lhs));
        assert_eq!(tree.subnode(add, 1), Some(rhs));
        assert_eq!(tree.node(lhs).literal, Some(Literal::Int(1)));
        assert!(!tree.node(add).is_const());
    }

    #[test]
    fn postorder_visits_children_before_parent() {
        let mut interner = Interner::new();
        let tag = interner.intern("ADD");
        let leaf = interner.intern("INTEGER");
        let mut tree = Tree::new();
        let org = Origin { file_id: 0, line: 1 };
        let lhs = tree.alloc(leaf, org);
        let rhs = tree.alloc(leaf, org);
        let add = tree.alloc_with(tag, org, vec![Some(lhs), Some(rhs)], None);

        let order = tree.postorder(add);
        assert_eq!(order, vec![lhs, rhs, add]);
    }
}
