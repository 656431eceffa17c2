//! `tndef`/`ntdef`: node-type definitions, grouped into the language/
//! back-end-specific sets NOCC calls `tndef`s (§3, §4.1).

use std::collections::HashMap;

use crate::symtab::Sym;
use crate::tree::flags::NodeFlags;

/// The shape and default flags of one node tag (`ntdef`).
#[derive(Clone, Debug)]
pub struct NtDef {
    pub tag: Sym,
    pub subnode_count: usize,
    pub name_count: usize,
    pub flags: NodeFlags,
}

/// A named group of node-type definitions (`tndef`) — one per
/// front-end/back-end, matching how the original groups e.g. all of
/// the AVR assembler's node types under a single `avrasm` tndef.
#[derive(Default)]
pub struct NtDefRegistry {
    defs: HashMap<Sym, NtDef>,
}

impl NtDefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: NtDef) {
        self.defs.insert(def.tag, def);
    }

    pub fn get(&self, tag: Sym) -> Option<&NtDef> {
        self.defs.get(&tag)
    }

    pub fn flags_of(&self, tag: Sym) -> NodeFlags {
        self.defs.get(&tag).map(|d| d.flags).unwrap_or_default()
    }
}
