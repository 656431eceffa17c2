//! `langops`: language-semantic operation vtables (§4.6-4.7), the
//! sibling of `compops` (same intrusive override-chain shape, reused
//! from there) for the handful of questions a pass asks about a node's
//! *meaning* rather than its *processing*: is it constant, what integer
//! value does it carry, what type does it have.
//!
//! `typecheck` and `constprop` both dispatch through a single
//! [`LangOpsRegistry`] rather than hard-coding per-tag match arms, so a
//! front-end can override the default behaviour for its own node types
//! without the generic engine knowing about it — mirrors how
//! `lang/typecheck.c`/`lang/constprop.c` call out to `langops` function
//! pointers on each `tndef`.

use std::collections::HashMap;

use crate::symtab::Sym;
use crate::tree::compops::Handled;
use crate::tree::{NodeId, Tree};
use crate::typecheck::Type;

/// One override layer, same shape as [`crate::tree::compops::CompOps`]
/// but for the three language questions a node type can answer.
pub trait LangOps {
    fn isconst(&self, _tree: &Tree, _node: NodeId) -> Handled<bool> {
        Handled::No
    }
    fn intvalof(&self, _tree: &Tree, _node: NodeId) -> Handled<i64> {
        Handled::No
    }
    fn gettype(&self, _tree: &Tree, _node: NodeId) -> Handled<Type> {
        Handled::No
    }
}

/// Per-tag chains of override layers, most-recently-installed first.
#[derive(Default)]
pub struct LangOpsRegistry {
    chains: HashMap<Sym, Vec<Box<dyn LangOps>>>,
}

impl LangOpsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: Sym, layer: Box<dyn LangOps>) {
        self.chains.entry(tag).or_default().insert(0, layer);
    }

    /// Is `node` (tagged `tag`) a constant, once any literal/fold state
    /// already recorded on it is taken into account? Falls through to
    /// "does it already carry a `const_value`" if no layer answers.
    pub fn isconst(&self, tag: Sym, tree: &Tree, node: NodeId) -> bool {
        if let Some(chain) = self.chains.get(&tag) {
            for layer in chain {
                if let Handled::Yes(v) = layer.isconst(tree, node) {
                    return v;
                }
            }
        }
        tree.node(node).is_const()
    }

    /// The integer value of a node already known to be constant.
    /// Falls through to the recorded `const_value`, then to an `Int`
    /// literal if the node was never folded.
    pub fn intvalof(&self, tag: Sym, tree: &Tree, node: NodeId) -> Option<i64> {
        if let Some(chain) = self.chains.get(&tag) {
            for layer in chain {
                if let Handled::Yes(v) = layer.intvalof(tree, node) {
                    return Some(v);
                }
            }
        }
        tree.node(node).const_value.or_else(|| match &tree.node(node).literal {
            Some(crate::tree::Literal::Int(v)) => Some(*v),
            _ => None,
        })
    }

    pub fn gettype(&self, tag: Sym, tree: &Tree, node: NodeId, default: Type) -> Type {
        if let Some(chain) = self.chains.get(&tag) {
            for layer in chain {
                if let Handled::Yes(t) = layer.gettype(tree, node) {
                    return t;
                }
            }
        }
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Origin;
    use crate::symtab::Interner;
    use crate::tree::Literal;

    struct AlwaysFortyTwo;
    impl LangOps for AlwaysFortyTwo {
        fn isconst(&self, _tree: &Tree, _node: NodeId) -> Handled<bool> {
            Handled::Yes(true)
        }
        fn intvalof(&self, _tree: &Tree, _node: NodeId) -> Handled<i64> {
            Handled::Yes(42)
        }
    }

    #[test]
    fn override_layer_short_circuits_default() {
        let mut interner = Interner::new();
        let tag = interner.intern("GLABEL");
        let mut tree = Tree::new();
        let node = tree.alloc(tag, Origin { file_id: 0, line: 1 });

        let mut registry = LangOpsRegistry::new();
        assert!(!registry.isconst(tag, &tree, node));

        registry.insert(tag, Box::new(AlwaysFortyTwo));
        assert!(registry.isconst(tag, &tree, node));
        assert_eq!(registry.intvalof(tag, &tree, node), Some(42));
    }

    #[test]
    fn default_falls_through_to_literal() {
        let mut interner = Interner::new();
        let tag = interner.intern("INTEGER");
        let mut tree = Tree::new();
        let node = tree.alloc_with(tag, Origin { file_id: 0, line: 1 }, Vec::new(), Some(Literal::Int(7)));
        let registry = LangOpsRegistry::new();
        assert_eq!(registry.intvalof(tag, &tree, node), Some(7));
    }
}
