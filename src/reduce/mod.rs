//! The reduction VM (§4.4): a small byte-coded stack machine that runs
//! over a token-stack, a node-stack, and a local operand stack to turn
//! a DFA's matched prefix into a tree node. Rules are authored as a
//! compact mini-DSL string and compiled once at registry time.

pub mod dsl;
pub mod vm;

pub use dsl::compile;
pub use vm::{Reducer, ReducerRegistry, Vm};

/// One instruction of the reduction bytecode.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// Pop a node off the node-stack onto the local stack.
    NsPop,
    /// Push the local-stack top onto the node-stack.
    NsPush,
    /// Pop a token off the token-stack onto the local stack as a literal.
    TsPop,
    /// Rewind the token-stack cursor by `n` without consuming.
    TsRewind(u32),
    /// Rewind by exactly one token.
    Ts1Rewind,
    /// Push an empty placeholder onto the local stack.
    Null,
    /// Reverse the top `n` items of the local stack.
    Rev(u32),
    /// Reverse the entire local stack.
    AllRev,
    /// Rotate the top `n` items of the local stack left by one.
    RotLeft(u32),
    /// Rotate the top `n` items of the local stack right by one.
    RotRight(u32),
    /// Negate the local-stack top in place (built-in unary transform).
    Mod,
    /// As `Mod`, but applied to the node reference rather than its value.
    ModPtr,
    /// Invoke a named function-library entry on the local-stack top.
    UserMod(String),
    /// Copy reduction register `n` onto the local stack.
    RGet(u32),
    /// Pop the local-stack top into reduction register `n`.
    RSet(u32),
    /// Pop `arity` items off the local stack, build a node tagged
    /// `tag`, push its id onto the local stack.
    Combine(String, u32),
    /// As `Combine`, but the tag is itself the local-stack top
    /// (dynamic tag, set up by a preceding [`Op::SetTagMark`]).
    CombineTag(u32),
    /// Mark the local-stack top as the dynamic tag for `CombineTag`.
    SetTagMark,
    /// Set the node under construction's origin to the token-stack's
    /// low-water mark.
    SetOriginStart,
    /// Set the node under construction's origin to the token-stack's
    /// high-water mark.
    SetOriginEnd,
    /// Discard `n` tokens from the token-stack.
    ConsumeN(u32),
    /// Discard one token, asserting its textual spelling matches.
    ConsumeText(String),
    /// Pop `n` items into a single transparent list node.
    MakeList(u32),
    /// Pull subnode `index` out of the local-stack top (must be a node)
    /// back onto the local stack.
    Extract(u32),
    /// Pop a source node, then a target node; splice the source's
    /// subnodes onto the target's and push the target back. Used to
    /// flatten a nested list produced by an inner reduction into its
    /// enclosing list.
    FoldInto,
    /// Terminate the rule; the local-stack top is the result.
    End,
}

/// A compiled reduction rule: its name and bytecode.
#[derive(Clone, Debug)]
pub struct Rule {
    pub name: String,
    pub ops: Vec<Op>,
}

/// The net number of items an instruction leaves on the local stack
/// (positive: pushes more than it pops). Used by [`validate`] to check
/// a rule's stack balance at registration time rather than at runtime.
fn stack_effect(op: &Op) -> i32 {
    match op {
        Op::NsPop | Op::TsPop | Op::Null | Op::RGet(_) => 1,
        Op::NsPush | Op::RSet(_) | Op::ConsumeText(_) | Op::FoldInto => -1,
        Op::TsRewind(_) | Op::Ts1Rewind | Op::ConsumeN(_) | Op::SetOriginStart
        | Op::SetOriginEnd => 0,
        Op::Rev(_) | Op::AllRev | Op::RotLeft(_) | Op::RotRight(_) => 0,
        Op::Mod | Op::ModPtr | Op::UserMod(_) | Op::SetTagMark | Op::Extract(_) => 0,
        Op::Combine(_, arity) => 1 - *arity as i32,
        Op::CombineTag(arity) => 1 - (*arity as i32 + 1),
        Op::MakeList(n) => 1 - *n as i32,
        Op::End => 0,
    }
}

/// Validate that a rule's local stack ends with exactly one item
/// (the reduction's result) and never underflows. Mirrors the static
/// arity check the original performs when a reduction rule is
/// registered, so a malformed rule is rejected before any parse runs.
pub fn validate(rule: &Rule) -> Result<(), String> {
    let mut depth: i32 = 0;
    for op in &rule.ops {
        if matches!(op, Op::End) {
            continue;
        }
        depth += stack_effect(op);
        if depth < 0 {
            return Err(format!(
                "rule {:?} underflows the local stack at {:?}",
                rule.name, op
            ));
        }
    }
    if depth != 1 {
        return Err(format!(
            "rule {:?} leaves {depth} items on the local stack, expected 1",
            rule.name
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_combine_rule_validates() {
        let rule = Rule {
            name: "reduce_binop".into(),
            ops: vec![
                Op::NsPop,
                Op::NsPop,
                Op::Rev(2),
                Op::Combine("BINOP".into(), 2),
                Op::End,
            ],
        };
        assert!(validate(&rule).is_ok());
    }

    #[test]
    fn underflowing_rule_is_rejected() {
        let rule = Rule {
            name: "broken".into(),
            ops: vec![Op::Combine("X".into(), 2), Op::End],
        };
        assert!(validate(&rule).is_err());
    }

    #[test]
    fn rule_leaving_extra_items_is_rejected() {
        let rule = Rule {
            name: "leaky".into(),
            ops: vec![Op::NsPop, Op::NsPop, Op::End],
        };
        assert!(validate(&rule).is_err());
    }
}
