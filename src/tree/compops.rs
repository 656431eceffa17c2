//! `compops`/`langops`: per-node-type operation vtables, overridable by
//! stacking an intrusive chain of override layers ahead of whatever a
//! front-end already installed (§4.1-4.2, §9).
//!
//! The AVR back-end only reaches for this registry to run the generic
//! engine unmodified (no tag gets an override layer installed): label
//! addresses are resolved through `avr::label::LabelTable`'s own
//! fixup/patch bookkeeping instead of a `compops` layer over
//! `constprop`, since a label becoming resolvable needs to re-encode
//! and byte-patch an already-written instruction, not just fold a tree
//! node — see DESIGN.md.

use std::collections::HashMap;

use crate::pass::Pass;
use crate::symtab::Sym;
use crate::tree::{NodeId, Tree};

/// Whether an override layer handled the request itself, or wants the
/// next layer in the chain (or the node-type's own default) to run.
pub enum Handled<T> {
    No,
    Yes(T),
}

impl<T> Handled<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, Handled::Yes(_))
    }
}

/// One override layer in a compops chain. Default methods all defer
/// (`Handled::No`); a layer overrides exactly the passes it cares about.
pub trait CompOps {
    fn run(&self, _pass: Pass, _tree: &mut Tree, _node: NodeId) -> Handled<()> {
        Handled::No
    }
}

/// Per-tag chains of override layers, most-recently-installed first —
/// an intrusive singly-linked list flattened into a `Vec` for storage
/// simplicity; the traversal order is what matters, and iterating a
/// `Vec` front-to-back gives the same "newest layer tried first, falls
/// through to older layers" semantics as a real linked list.
#[derive(Default)]
pub struct CompOpsRegistry {
    chains: HashMap<Sym, Vec<Box<dyn CompOps>>>,
}

impl CompOpsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `layer` ahead of any existing chain for `tag`.
    pub fn insert(&mut self, tag: Sym, layer: Box<dyn CompOps>) {
        self.chains.entry(tag).or_default().insert(0, layer);
    }

    /// Run `pass` for `node` (tagged `tag`) through the chain, falling
    /// through to `default` if no layer handles it.
    pub fn run(
        &self,
        tag: Sym,
        pass: Pass,
        tree: &mut Tree,
        node: NodeId,
        default: impl FnOnce(&mut Tree, NodeId),
    ) {
        if let Some(chain) = self.chains.get(&tag) {
            for layer in chain {
                if layer.run(pass, tree, node).is_handled() {
                    return;
                }
            }
        }
        default(tree, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Origin;
    use crate::symtab::Interner;

    struct CountingLayer {
        hits: std::cell::Cell<u32>,
    }

    impl CompOps for CountingLayer {
        fn run(&self, pass: Pass, _tree: &mut Tree, _node: NodeId) -> Handled<()> {
            if pass == Pass::ConstProp {
                self.hits.set(self.hits.get() + 1);
                Handled::Yes(())
            } else {
                Handled::No
            }
        }
    }

    #[test]
    fn chain_runs_before_default_and_can_short_circuit() {
        let mut interner = Interner::new();
        let tag = interner.intern("GLABEL");
        let mut registry = CompOpsRegistry::new();
        registry.insert(tag, Box::new(CountingLayer { hits: 0.into() }));

        let mut tree = Tree::new();
        let node = tree.alloc(tag, Origin { file_id: 0, line: 1 });

        let default_ran = std::cell::Cell::new(false);
        registry.run(tag, Pass::ConstProp, &mut tree, node, |_, _| {
            default_ran.set(true);
        });
        assert!(!default_ran.get());

        registry.run(tag, Pass::TypeCheck, &mut tree, node, |_, _| {
            default_ran.set(true);
        });
        assert!(default_ran.get());
    }

    #[test]
    fn untagged_node_falls_through_to_default() {
        let mut interner = Interner::new();
        let tag = interner.intern("NOP");
        let registry = CompOpsRegistry::new();
        let mut tree = Tree::new();
        let node = tree.alloc(tag, Origin { file_id: 0, line: 1 });
        let default_ran = std::cell::Cell::new(false);
        registry.run(tag, Pass::Codegen, &mut tree, node, |_, _| {
            default_ran.set(true);
        });
        assert!(default_ran.get());
    }
}
