//! The DFA engine (§4.3): source-form tables are merged
//! (principle/additive) and compiled into one shared graph; [`Engine`]
//! then walks that graph one token at a time, shifting, reducing, or
//! pushing into another named table as each transition's flags direct.

pub mod build;
pub mod table;

pub use build::{CompiledDfa, DfaRegistry, EdgeDest};
pub use table::{Dest, DfaTbl, DfaTblEnt, MatchSpec, TransFlags};

use petgraph::graph::NodeIndex;

use crate::symtab::Sym;
use crate::token::{Token, TokenKind};

fn matches(spec: &MatchSpec, token: &Token) -> bool {
    match spec {
        MatchSpec::Any => true,
        MatchSpec::Kind(kind) => *kind == token.kind || *kind == TokenKind::NoToken,
        MatchSpec::Exact(kind, text) => *kind == token.kind && *text == token.text,
    }
}

/// What happened when [`Engine::step`] consumed (or peeked at) a token.
#[derive(Debug, PartialEq, Eq)]
pub enum StepResult {
    /// No reduction happened yet.
    /// * `keep` — the driver should push this token onto the parser's
    ///   token-stack for a later reduction to consume.
    /// * `consumed` is false when the matching transition carried
    ///   [`TransFlags::NOCONSUME`] — the same token must be re-fed to
    ///   `step` rather than advancing the input cursor.
    Shift { keep: bool, consumed: bool },
    /// A reduction rule fired; the caller should run its bytecode
    /// (§4.4) against the token/node stacks and push the result node.
    /// `keep`/`consumed` have the same meaning as on `Shift` and refer
    /// to the token that triggered this reduction.
    Reduce { rule: Sym, keep: bool, consumed: bool },
    /// No outgoing transition matches this token at the current state.
    NoMatch,
    /// The engine has returned out of every pushed table and is done.
    Done,
}

struct Frame {
    return_to: NodeIndex,
}

/// A live walk over a [`CompiledDfa`], starting inside one named table.
pub struct Engine {
    current: NodeIndex,
    stack: Vec<Frame>,
    done: bool,
}

impl Engine {
    pub fn new(compiled: &CompiledDfa, table: Sym) -> Self {
        let start = compiled.start_of[&table];
        Self {
            current: start,
            stack: Vec::new(),
            done: false,
        }
    }

    pub fn step(&mut self, compiled: &CompiledDfa, token: &Token) -> StepResult {
        if self.done {
            return StepResult::Done;
        }

        let found = compiled
            .order
            .get(&self.current)
            .into_iter()
            .flatten()
            .map(|&edge_idx| &compiled.graph[edge_idx])
            .find(|w| matches(&w.matches, token));

        let Some(edge) = found else {
            return StepResult::NoMatch;
        };

        let keep = edge.flags.contains(TransFlags::KEEP);
        let noconsume = edge.flags.contains(TransFlags::NOCONSUME);

        match &edge.dest {
            EdgeDest::Goto(next) => {
                self.current = *next;
                StepResult::Shift { keep, consumed: !noconsume }
            }
            EdgeDest::Push { enter, return_to } => {
                self.stack.push(Frame {
                    return_to: *return_to,
                });
                self.current = *enter;
                StepResult::Shift { keep, consumed: !noconsume }
            }
            EdgeDest::Reduce(rule) => {
                let rule = *rule;
                if let Some(frame) = self.stack.pop() {
                    self.current = frame.return_to;
                } else {
                    self.done = true;
                }
                StepResult::Reduce {
                    rule,
                    keep,
                    consumed: !noconsume,
                }
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Origin;
    use crate::symtab::Interner;
    use crate::token::TokenKind;

    fn tok(interner: &mut Interner, kind: TokenKind, text: &str) -> Token {
        let sym = interner.intern(text);
        Token::new(
            kind,
            sym,
            crate::span::Span::new(0, 1, 0, text.len() as u32),
        )
    }

    #[test]
    fn simple_shift_reduce() {
        let mut interner = Interner::new();
        let table_name = interner.intern("label_decl");
        let reduce_name = interner.intern("reduce_label");

        let mut table = DfaTbl::new(table_name);
        let s1 = table.new_state();
        table.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Name),
                flags: TransFlags::empty(),
                dest: Dest::State(s1),
            },
        );
        table.add(
            s1,
            DfaTblEnt {
                matches: MatchSpec::Exact(TokenKind::Symbol, interner.intern(":")),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_name),
            },
        );

        let mut registry = DfaRegistry::new();
        registry.register(table);
        let compiled = registry.compile();

        let mut engine = Engine::new(&compiled, table_name);
        let name_tok = tok(&mut interner, TokenKind::Name, "foo");
        let colon_tok = tok(&mut interner, TokenKind::Symbol, ":");

        assert_eq!(engine.step(&compiled, &name_tok), StepResult::Shift { keep: false, consumed: true });
        assert_eq!(
            engine.step(&compiled, &colon_tok),
            StepResult::Reduce {
                rule: reduce_name,
                keep: false,
                consumed: true
            }
        );
        assert!(engine.is_done());
    }

    #[test]
    fn no_match_reports_cleanly() {
        let mut interner = Interner::new();
        let table_name = interner.intern("t");
        let mut table = DfaTbl::new(table_name);
        table.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Name),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(interner.intern("r")),
            },
        );
        let mut registry = DfaRegistry::new();
        registry.register(table);
        let compiled = registry.compile();

        let mut engine = Engine::new(&compiled, table_name);
        let bad = tok(&mut interner, TokenKind::Integer, "5");
        assert_eq!(engine.step(&compiled, &bad), StepResult::NoMatch);
    }

    #[test]
    fn push_returns_to_caller_after_nested_reduce() {
        let mut interner = Interner::new();
        let outer = interner.intern("outer");
        let operand = interner.intern("operand");
        let reduce_operand = interner.intern("reduce_operand");
        let reduce_outer = interner.intern("reduce_outer");

        let mut outer_tbl = DfaTbl::new(outer);
        let after_push = outer_tbl.new_state();
        outer_tbl.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::Integer),
                flags: TransFlags::PUSH,
                dest: Dest::Push(operand, after_push),
            },
        );
        outer_tbl.add(
            after_push,
            DfaTblEnt {
                matches: MatchSpec::Kind(TokenKind::End),
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_outer),
            },
        );

        let mut operand_tbl = DfaTbl::new(operand);
        operand_tbl.add(
            0,
            DfaTblEnt {
                matches: MatchSpec::Any,
                flags: TransFlags::empty(),
                dest: Dest::Reduce(reduce_operand),
            },
        );

        let mut registry = DfaRegistry::new();
        registry.register(outer_tbl);
        registry.register(operand_tbl);
        let compiled = registry.compile();

        let mut engine = Engine::new(&compiled, outer);
        let int_tok = tok(&mut interner, TokenKind::Integer, "42");
        let end_tok = Token::new(TokenKind::End, interner.intern(""), origin_span());

        assert_eq!(engine.step(&compiled, &int_tok), StepResult::Shift { keep: false, consumed: true });
        assert_eq!(
            engine.step(&compiled, &int_tok),
            StepResult::Reduce {
                rule: reduce_operand,
                keep: false,
                consumed: true
            }
        );
        assert_eq!(
            engine.step(&compiled, &end_tok),
            StepResult::Reduce {
                rule: reduce_outer,
                keep: false,
                consumed: true
            }
        );
    }

    fn origin_span() -> crate::span::Span {
        crate::span::Span::new(0, 1, 0, 0)
    }
}
