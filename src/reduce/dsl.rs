//! Compiles the reduction mini-DSL (a compact colon-delimited string
//! form, e.g. `"nspop nspop rev:2 combine:INSTR:2 end"`) into bytecode.
//! Grammar authors write rules this way instead of building [`Op`]
//! vectors by hand, mirroring how the original's reduction rules are
//! authored as short mnemonic strings and compiled once at startup.

use super::{validate, Op, Rule};

pub fn compile(name: &str, src: &str) -> Result<Rule, String> {
    let mut ops = Vec::new();
    for word in src.split_whitespace() {
        ops.push(compile_word(word)?);
    }
    let rule = Rule {
        name: name.to_string(),
        ops,
    };
    validate(&rule)?;
    Ok(rule)
}

fn compile_word(word: &str) -> Result<Op, String> {
    let mut parts = word.split(':');
    let mnemonic = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let arg_u32 = |rest: &[&str], idx: usize| -> Result<u32, String> {
        rest.get(idx)
            .ok_or_else(|| format!("{word}: missing argument {idx}"))?
            .parse::<u32>()
            .map_err(|e| format!("{word}: {e}"))
    };

    match mnemonic {
        "nspop" => Ok(Op::NsPop),
        "nspush" => Ok(Op::NsPush),
        "tspop" => Ok(Op::TsPop),
        "tsrewind" => Ok(Op::TsRewind(arg_u32(&rest, 0)?)),
        "ts1rewind" => Ok(Op::Ts1Rewind),
        "null" => Ok(Op::Null),
        "rev" => Ok(Op::Rev(arg_u32(&rest, 0)?)),
        "allrev" => Ok(Op::AllRev),
        "rotl" => Ok(Op::RotLeft(arg_u32(&rest, 0)?)),
        "rotr" => Ok(Op::RotRight(arg_u32(&rest, 0)?)),
        "mod" => Ok(Op::Mod),
        "modptr" => Ok(Op::ModPtr),
        "usermod" => Ok(Op::UserMod(
            rest.first().ok_or("usermod: missing name")?.to_string(),
        )),
        "rget" => Ok(Op::RGet(arg_u32(&rest, 0)?)),
        "rset" => Ok(Op::RSet(arg_u32(&rest, 0)?)),
        "combine" => {
            let tag = rest.first().ok_or("combine: missing tag")?.to_string();
            let arity = arg_u32(&rest, 1)?;
            Ok(Op::Combine(tag, arity))
        }
        "combinetag" => Ok(Op::CombineTag(arg_u32(&rest, 0)?)),
        "settagmark" => Ok(Op::SetTagMark),
        "setorigin_start" => Ok(Op::SetOriginStart),
        "setorigin_end" => Ok(Op::SetOriginEnd),
        "consume" => Ok(Op::ConsumeN(arg_u32(&rest, 0)?)),
        "consumetext" => Ok(Op::ConsumeText(
            rest.first().ok_or("consumetext: missing text")?.to_string(),
        )),
        "makelist" => Ok(Op::MakeList(arg_u32(&rest, 0)?)),
        "extract" => Ok(Op::Extract(arg_u32(&rest, 0)?)),
        "foldinto" => Ok(Op::FoldInto),
        "end" => Ok(Op::End),
        other => Err(format!("unknown reduction opcode {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_binary_combine_rule() {
        let rule = compile("reduce_binop", "nspop nspop rev:2 combine:BINOP:2 end").unwrap();
        assert_eq!(rule.name, "reduce_binop");
        assert_eq!(
            rule.ops,
            vec![
                Op::NsPop,
                Op::NsPop,
                Op::Rev(2),
                Op::Combine("BINOP".into(), 2),
                Op::End,
            ]
        );
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(compile("bad", "frobnicate").is_err());
    }

    #[test]
    fn malformed_rule_fails_validation_at_compile_time() {
        // combine:TAG:2 needs two stack items but none were pushed first
        assert!(compile("broken", "combine:X:2 end").is_err());
    }

    #[test]
    fn single_leaf_rule_compiles() {
        let rule = compile("reduce_leaf", "tspop settagmark combinetag:0 end").unwrap();
        assert_eq!(rule.ops.len(), 4);
    }
}
