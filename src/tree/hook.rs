//! Compiler hooks (`chook`, §4.1): named slots for back-end-private data
//! attached to a node, alongside the copy/free/dump callbacks NOCC
//! associates with every hook kind (`tnode_newchook` in the original).
//!
//! The AVR back-end's only hook is the label/fixup bookkeeping attached
//! to `GLABEL`/`LLABEL` declaration nodes (see `avr::label`).

use std::collections::HashMap;
use std::fmt;

use crate::symtab::Sym;

/// A piece of back-end-private data attached to a tree node.
///
/// `dump` backs the tree-dumper's hook rendering; `clone_box` lets a
/// node (and its hooks) be duplicated when a subtree is copied.
pub trait Chook: fmt::Debug {
    fn dump(&self) -> String;
    fn clone_box(&self) -> Box<dyn Chook>;
}

impl Clone for Box<dyn Chook> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Registers the chook *kinds* known to the compiler by name, so a pass
/// can look up "the label-info hook" without a hard dependency on the
/// back-end that defines it, matching `tnode_lookupornewchook`.
#[derive(Default)]
pub struct ChookRegistry {
    names: Vec<Sym>,
}

/// A handle identifying one registered hook kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChookId(u32);

impl ChookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: Sym) -> ChookId {
        if let Some(pos) = self.names.iter().position(|&n| n == name) {
            return ChookId(pos as u32);
        }
        let id = ChookId(self.names.len() as u32);
        self.names.push(name);
        id
    }

    pub fn name_of(&self, id: ChookId) -> Sym {
        self.names[id.0 as usize]
    }
}

/// The set of hooks attached to a single node, sparse by `ChookId`.
#[derive(Default, Clone, Debug)]
pub struct HookSet {
    slots: HashMap<u32, Box<dyn Chook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: ChookId, hook: Box<dyn Chook>) {
        self.slots.insert(id.0, hook);
    }

    pub fn get(&self, id: ChookId) -> Option<&dyn Chook> {
        self.slots.get(&id.0).map(|b| b.as_ref())
    }

    pub fn get_mut(&mut self, id: ChookId) -> Option<&mut Box<dyn Chook>> {
        self.slots.get_mut(&id.0)
    }

    pub fn remove(&mut self, id: ChookId) -> Option<Box<dyn Chook>> {
        self.slots.remove(&id.0)
    }

    pub fn dump(&self) -> Vec<String> {
        self.slots.values().map(|h| h.dump()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestHook(i64);

    impl Chook for TestHook {
        fn dump(&self) -> String {
            format!("test({})", self.0)
        }
        fn clone_box(&self) -> Box<dyn Chook> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn registry_reuses_id_for_same_name() {
        let mut reg = ChookRegistry::new();
        let name = test_sym();
        let a = reg.register(name);
        let b = reg.register(name);
        assert_eq!(a, b);
    }

    #[test]
    fn hookset_stores_and_clones() {
        let mut reg = ChookRegistry::new();
        let id = reg.register(test_sym());
        let mut set = HookSet::new();
        set.set(id, Box::new(TestHook(42)));
        assert_eq!(set.get(id).unwrap().dump(), "test(42)");
        let cloned = set.clone();
        assert_eq!(cloned.get(id).unwrap().dump(), "test(42)");
    }

    // helper avoiding a full Interner just to get a Sym in tests
    fn test_sym() -> Sym {
        let mut interner = crate::symtab::Interner::new();
        interner.intern("labelinfo")
    }
}
