use bitflags::bitflags;

bitflags! {
    /// Per-node-type flags (§3, redesigned in §3.1 as a `bitflags!` set
    /// rather than four loose booleans).
    ///
    /// * `LONG_DECLARATION` — the node introduces a scope that survives
    ///   past its own subtree (e.g. a top-level `equ`); `scopein`/
    ///   `scopeout` mark/descope around it automatically.
    /// * `LONG_PROCESS` — the node represents a unit of execution wider
    ///   than a single instruction (a macro body, a segment block).
    /// * `SHORT_DECLARATION` — the node declares a name whose scope is
    ///   exactly its own subtree (a local label reference binding).
    /// * `TRANSPARENT` — tree walkers skip this node for exclusive-
    ///   ownership checks (§5); used for list/grouping nodes that don't
    ///   themselves own anything.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        const LONG_DECLARATION  = 0b0001;
        const LONG_PROCESS      = 0b0010;
        const SHORT_DECLARATION = 0b0100;
        const TRANSPARENT       = 0b1000;
    }
}
