//! Source-form DFA tables (`dfattbl`/`dfattblent`, §4.3) and the
//! principle-vs-additive merge that shares common prefixes between a
//! grammar's main table and any tables that extend it.

use bitflags::bitflags;

use crate::symtab::Sym;
use crate::token::TokenKind;

bitflags! {
    /// Flags on one DFA transition (§4.3).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TransFlags: u8 {
        /// Don't consume the token that matched; re-examine it at the
        /// destination state. Used for lookahead-driven reduces.
        const KEEP = 0b001;
        /// Push the current DFA context and continue inside another
        /// named DFA's start state, returning here on that DFA's
        /// `Pop`/`Reduce`.
        const PUSH = 0b010;
        /// This entry's destination couldn't be resolved when the
        /// entry was created (a forward reference to a DFA not yet
        /// registered); resolved in a later pass over the registry.
        const DEFERRED = 0b100;
        /// Don't consume the matched token at all; leave it for the
        /// next `step` call (as opposed to `KEEP`, which consumes it
        /// but remembers it on the token-stack). Used where a single
        /// lookahead token decides between two destinations neither of
        /// which wants to eat it themselves.
        const NOCONSUME = 0b1000;
    }
}

/// What a token must look like for a transition to fire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchSpec {
    Any,
    Kind(TokenKind),
    /// A specific keyword/symbol spelling (kind + exact text).
    Exact(TokenKind, Sym),
}

/// Where a transition leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dest {
    /// Another state within the same table.
    State(usize),
    /// Run the named reduction rule, then pop back to the caller
    /// (a DFA `Push` site) with the produced node.
    Reduce(Sym),
    /// Jump into another table by name, returning to `State(return_to)`
    /// in this table once that table reduces.
    Push(Sym, usize),
}

/// One outgoing transition from a state.
#[derive(Clone, Debug)]
pub struct DfaTblEnt {
    pub matches: MatchSpec,
    pub flags: TransFlags,
    pub dest: Dest,
}

/// The source form of a compiled DFA: a named table of states, each a
/// list of outgoing transitions. State `0` is always the start state.
#[derive(Clone, Debug)]
pub struct DfaTbl {
    pub name: Sym,
    pub states: Vec<Vec<DfaTblEnt>>,
}

impl DfaTbl {
    pub fn new(name: Sym) -> Self {
        Self {
            name,
            states: vec![Vec::new()],
        }
    }

    pub fn new_state(&mut self) -> usize {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    pub fn add(&mut self, state: usize, entry: DfaTblEnt) {
        self.states[state].push(entry);
    }

    /// Merge `additive`'s transitions into `self`, sharing prefixes:
    /// wherever both tables have an identical [`MatchSpec`] at
    /// corresponding states, the traversal continues into the already-
    /// shared destination rather than cloning a parallel subtree;
    /// divergent suffixes are appended as genuinely new states.
    ///
    /// This is the "principle vs. additive" table combination §4.3
    /// describes: `self` is the principal table, `additive` extends it
    /// (e.g. a vendor-specific directive set layered onto a common
    /// instruction grammar).
    pub fn merge_additive(&mut self, additive: &DfaTbl) {
        self.merge_state(0, additive, 0);
    }

    fn merge_state(&mut self, dst_state: usize, additive: &DfaTbl, src_state: usize) {
        for entry in &additive.states[src_state] {
            let existing = self.states[dst_state]
                .iter()
                .position(|e| e.matches == entry.matches);
            match existing {
                Some(pos) => {
                    let dst_dest = self.states[dst_state][pos].dest.clone();
                    if let (Dest::State(dst_next), Dest::State(src_next)) =
                        (dst_dest, &entry.dest)
                    {
                        self.merge_state(dst_next, additive, *src_next);
                    }
                    // Reduce/Push destinations that already match are
                    // left as-is: the principal table wins ties.
                }
                None => {
                    let cloned_dest = self.clone_subtree(additive, &entry.dest);
                    self.states[dst_state].push(DfaTblEnt {
                        matches: entry.matches.clone(),
                        flags: entry.flags,
                        dest: cloned_dest,
                    });
                }
            }
        }
    }

    /// Copy a state (and everything it reaches within the same table)
    /// from `additive` into `self`, returning the rewritten `Dest`.
    fn clone_subtree(&mut self, additive: &DfaTbl, dest: &Dest) -> Dest {
        match dest {
            Dest::State(src_state) => {
                let new_state = self.new_state();
                for entry in &additive.states[*src_state] {
                    let cloned_dest = self.clone_subtree(additive, &entry.dest);
                    self.states[new_state].push(DfaTblEnt {
                        matches: entry.matches.clone(),
                        flags: entry.flags,
                        dest: cloned_dest,
                    });
                }
                Dest::State(new_state)
            }
            Dest::Reduce(name) => Dest::Reduce(*name),
            Dest::Push(name, ret) => Dest::Push(*name, *ret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::Interner;

    #[test]
    fn merge_shares_common_prefix_state() {
        let mut interner = Interner::new();
        let principal_name = interner.intern("avr_stmt");
        let additive_name = interner.intern("avr_stmt_ext");
        let reduce_common = interner.intern("reduce_common");
        let reduce_extra = interner.intern("reduce_extra");

        let mut principal = DfaTbl::new(principal_name);
        principal.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Name),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_common),
            },
        );

        let mut additive = DfaTbl::new(additive_name);
        additive.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Name),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_common),
            },
        );
        additive.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Integer),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_extra),
            },
        );

        principal.merge_additive(&additive);

        // shared NAME entry wasn't duplicated
        let name_entries: Vec<_> = principal.states[0]
            .iter()
            .filter(|e| e.matches == MatchSpec::Kind(TokenKind::Name))
            .collect();
        assert_eq!(name_entries.len(), 1);

        // the genuinely new INTEGER entry was added
        assert!(principal.states[0]
            .iter()
            .any(|e| e.matches == MatchSpec::Kind(TokenKind::Integer)));
        assert_eq!(principal.states.len(), 1);
    }

    #[test]
    fn merge_extends_divergent_suffix_with_new_states() {
        let mut interner = Interner::new();
        let p_name = interner.intern("p");
        let a_name = interner.intern("a");
        let reduce_a = interner.intern("reduce_a");
        let reduce_b = interner.intern("reduce_b");

        let mut principal = DfaTbl::new(p_name);
        let s1 = principal.new_state();
        principal.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Name),
                flags: TransFlags::empty(),
                dest: Dest::State(s1),
            },
        );
        principal.add(
            s1,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Integer),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_a),
            },
        );

        let mut additive = DfaTbl::new(a_name);
        let as1 = additive.new_state();
        additive.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Name),
                flags: TransFlags::empty(),
                dest: Dest::State(as1),
            },
        );
        additive.add(
            as1,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::String),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_b),
            },
        );

        principal.merge_additive(&additive);

        assert_eq!(principal.states.len(), 2);
        assert_eq!(principal.states[s1].len(), 2);
    }
}
