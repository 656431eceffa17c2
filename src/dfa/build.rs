//! Compiling registered [`DfaTbl`]s into one shared graph (§4.3): states
//! across every table become nodes of a single `petgraph::Graph`, and
//! cross-table `Push` transitions become direct edges once every
//! table's start node is known — the "deferred cross-DFA reference
//! resolution" the original performs as a fix-up pass after all DFAs
//! have registered themselves.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

use crate::dfa::table::{Dest, DfaTbl, DfaTblEnt, MatchSpec, TransFlags};
use crate::symtab::Sym;

/// Where a compiled transition leads.
#[derive(Clone, Debug)]
pub enum EdgeDest {
    Goto(NodeIndex),
    Reduce(Sym),
    /// Enter another table's start node; return to `return_to` in the
    /// current table once that table reduces back out.
    Push {
        enter: NodeIndex,
        return_to: NodeIndex,
    },
}

#[derive(Clone, Debug)]
pub struct CompiledEdge {
    pub matches: MatchSpec,
    pub flags: TransFlags,
    pub dest: EdgeDest,
}

/// Registers every grammar's source-form tables, then compiles them
/// all into one graph with cross-table references resolved.
#[derive(Default)]
pub struct DfaRegistry {
    tables: Vec<DfaTbl>,
}

pub struct CompiledDfa {
    pub graph: DiGraph<(), CompiledEdge>,
    pub start_of: HashMap<Sym, NodeIndex>,
    /// Per-state outgoing edges in the *source table's declaration
    /// order* (petgraph's own `edges()` iterates newest-first, which
    /// would silently violate the "specific matches before match-any"
    /// invariant §4.3/§8 invariant 4 requires); `Engine::step` scans
    /// this order instead of asking the graph directly.
    pub order: HashMap<NodeIndex, Vec<EdgeIndex>>,
}

impl DfaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: DfaTbl) {
        self.tables.push(table);
    }

    pub fn compile(&self) -> CompiledDfa {
        let mut graph: DiGraph<(), CompiledEdge> = DiGraph::new();
        let mut nodes_by_table: HashMap<Sym, Vec<NodeIndex>> = HashMap::new();

        for table in &self.tables {
            let nodes: Vec<NodeIndex> = table.states.iter().map(|_| graph.add_node(())).collect();
            nodes_by_table.insert(table.name, nodes);
        }

        let mut start_of = HashMap::new();
        let mut order: HashMap<NodeIndex, Vec<EdgeIndex>> = HashMap::new();
        for table in &self.tables {
            let nodes = &nodes_by_table[&table.name];
            start_of.insert(table.name, nodes[0]);
            for (state_idx, entries) in table.states.iter().enumerate() {
                for entry in entries {
                    let dest = resolve_dest(entry, nodes, &nodes_by_table);
                    let edge = graph.add_edge(
                        nodes[state_idx],
                        edge_source_anchor(&dest, nodes[state_idx]),
                        CompiledEdge {
                            matches: entry.matches.clone(),
                            flags: entry.flags,
                            dest,
                        },
                    );
                    order.entry(nodes[state_idx]).or_default().push(edge);
                }
            }
        }

        CompiledDfa { graph, start_of, order }
    }
}

fn resolve_dest(
    entry: &DfaTblEnt,
    own_nodes: &[NodeIndex],
    nodes_by_table: &HashMap<Sym, Vec<NodeIndex>>,
) -> EdgeDest {
    match &entry.dest {
        Dest::State(idx) => EdgeDest::Goto(own_nodes[*idx]),
        Dest::Reduce(name) => EdgeDest::Reduce(*name),
        Dest::Push(table_name, return_state) => {
            let enter = nodes_by_table
                .get(table_name)
                .unwrap_or_else(|| panic!("push to unregistered dfa table"))[0];
            EdgeDest::Push {
                enter,
                return_to: own_nodes[*return_state],
            }
        }
    }
}

/// petgraph edges need a real target node even when the logical
/// destination is a `Reduce`/`Push`; self-loop the edge target back to
/// its own source in that case; [`EdgeDest`] on the edge weight is the
/// source of truth for traversal, not the graph topology.
fn edge_source_anchor(dest: &EdgeDest, own: NodeIndex) -> NodeIndex {
    match dest {
        EdgeDest::Goto(n) => *n,
        EdgeDest::Push { enter, .. } => *enter,
        EdgeDest::Reduce(_) => own,
    }
}
