//! Generic bottom-up constant folding (§4.6). The engine itself knows
//! nothing about any particular grammar: it walks a subtree postorder,
//! asks [`crate::langops`] whether each node is constant, and folds
//! nodes tagged with a registered combiner function over their already-
//! constant children.
//!
//! State is threaded explicitly as a `&mut ConstPropState` parameter
//! rather than kept in a thread-local/global, per the redesign this
//! crate takes on the original's `constprop_newconst`/fixup-replay
//! mechanism (no hidden global compiler state, §9). The AVR back-end
//! only calls this engine for genuinely constant `low()`/`high()`
//! expressions (no label operand involved); label addresses go through
//! `avr::label::LabelTable`'s fixup/patch mechanism instead, since a
//! label resolving needs to re-encode and patch bytes already written
//! to the image, not just fold a tree node — see DESIGN.md.

use std::collections::HashMap;

use crate::langops::LangOpsRegistry;
use crate::symtab::Sym;
use crate::tree::compops::CompOpsRegistry;
use crate::tree::{Literal, NodeId, Tree};
use crate::pass::Pass;

/// A fold function over an already-constant node's children.
pub type Combiner = fn(&[i64]) -> i64;

/// Explicit constant-folding state: which tags fold which way, and
/// whether this pass changed anything (drives the pipeline's usual
/// "run to fixpoint" passes, though AVR's grammar only needs one pass
/// since there's no recursive `equ` expansion loop).
#[derive(Default)]
pub struct ConstPropState {
    combiners: HashMap<Sym, Combiner>,
    pub changed: bool,
}

impl ConstPropState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fold rule for nodes tagged `tag`: once every subnode
    /// is constant, `f` computes the new constant value from their
    /// integer values in subnode order.
    pub fn register(&mut self, tag: Sym, f: Combiner) {
        self.combiners.insert(tag, f);
    }
}

/// Run one bottom-up folding pass over `root`. `compops` is consulted
/// first for every node (so e.g. a label reference folds to its
/// resolved address instead of through the generic path below);
/// nodes no layer handles fall through to `default_fold`.
pub fn run(
    tree: &mut Tree,
    root: NodeId,
    compops: &CompOpsRegistry,
    langops: &LangOpsRegistry,
    state: &mut ConstPropState,
) {
    for id in tree.postorder(root) {
        let tag = tree.node(id).tag;
        let combiners = &state.combiners;
        let changed = std::cell::Cell::new(false);
        compops.run(tag, Pass::ConstProp, tree, id, |tree, id| {
            if default_fold(tree, id, tag, langops, combiners) {
                changed.set(true);
            }
        });
        if changed.get() {
            state.changed = true;
        }
    }
}

fn default_fold(
    tree: &mut Tree,
    id: NodeId,
    tag: Sym,
    langops: &LangOpsRegistry,
    combiners: &HashMap<Sym, Combiner>,
) -> bool {
    if tree.node(id).is_const() {
        return false;
    }
    if let Some(Literal::Int(v)) = tree.node(id).literal {
        tree.node_mut(id).const_value = Some(v);
        return true;
    }
    let Some(combiner) = combiners.get(&tag) else {
        return false;
    };
    let children: Vec<NodeId> = tree.node(id).subnodes.iter().flatten().copied().collect();
    let mut values = Vec::with_capacity(children.len());
    for child in &children {
        let child_tag = tree.node(*child).tag;
        match langops.intvalof(child_tag, tree, *child) {
            Some(v) if langops.isconst(child_tag, tree, *child) => values.push(v),
            _ => return false,
        }
    }
    let folded = combiner(&values);
    tree.node_mut(id).const_value = Some(folded);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Origin;
    use crate::symtab::Interner;

    #[test]
    fn low_operator_folds_once_child_is_constant() {
        let mut interner = Interner::new();
        let low = interner.intern("LOW");
        let int_tag = interner.intern("INTEGER");
        let mut tree = Tree::new();
        let org = Origin { file_id: 0, line: 1 };
        let child = tree.alloc_with(int_tag, org, Vec::new(), Some(Literal::Int(0x1234)));
        let root = tree.alloc_with(low, org, vec![Some(child)], None);

        let compops = CompOpsRegistry::new();
        let langops = LangOpsRegistry::new();
        let mut state = ConstPropState::new();
        state.register(low, |vals| vals[0] & 0xff);

        run(&mut tree, root, &compops, &langops, &mut state);
        assert_eq!(tree.node(root).const_value, Some(0x34));
        assert!(state.changed);
    }

    #[test]
    fn node_with_no_combiner_and_no_literal_stays_unfolded() {
        let mut interner = Interner::new();
        let tag = interner.intern("GLABEL");
        let mut tree = Tree::new();
        let node = tree.alloc(tag, Origin { file_id: 0, line: 1 });

        let compops = CompOpsRegistry::new();
        let langops = LangOpsRegistry::new();
        let mut state = ConstPropState::new();
        run(&mut tree, node, &compops, &langops, &mut state);
        assert!(!tree.node(node).is_const());
        assert!(!state.changed);
    }
}
