//! Generic bottom-up type checking (§4.7). Thin for the AVR grammar —
//! operands are registers, 3/8/16-bit integers, or label references,
//! so there's no user type system to check — but the engine itself
//! (postorder walk, `gettype` via [`crate::langops`], a subsumption
//! predicate) is shared library code any front-end could plug richer
//! per-tag rules into, matching `lang/typecheck.c`'s role upstream.

use crate::diagnostic::Diagnostic;
use crate::langops::LangOpsRegistry;
use crate::span::Span;
use crate::tree::{NodeId, Tree};

/// The handful of "types" operands can have in an assembly-level
/// grammar. `Unknown` is the universal default for nodes no langops
/// layer has an opinion about (most instruction mnemonics themselves).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    Unknown,
    Register,
    Const3,
    Const8,
    Const16,
    CodeAddr,
    MemAddr,
    IoAddr,
    Label,
}

impl Type {
    /// Does a value of type `actual` satisfy a slot requiring `required`?
    /// `Unknown` is permissive in both directions (an unresolved operand
    /// can't yet be rejected); a narrower constant width subsumes a wider
    /// one, since any 3-bit or 8-bit value is also a valid 16-bit one.
    pub fn subsumes(required: Type, actual: Type) -> bool {
        use Type::*;
        if required == Unknown || actual == Unknown {
            return true;
        }
        if required == actual {
            return true;
        }
        matches!(
            (required, actual),
            (Const16, Const8) | (Const16, Const3) | (Const8, Const3)
        )
    }
}

/// Walk `root` bottom-up, resolving each node's type via `langops`.
/// Returns one diagnostic per node whose resolved type doesn't subsume
/// the type its parent's slot required, as recorded by `required_of`.
pub fn typecheck(
    tree: &Tree,
    root: NodeId,
    langops: &LangOpsRegistry,
    required_of: impl Fn(&Tree, NodeId, usize) -> Type,
) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for id in tree.postorder(root) {
        let tag = tree.node(id).tag;
        let actual = langops.gettype(tag, tree, id, Type::Unknown);
        for (index, child) in tree.node(id).subnodes.iter().enumerate() {
            let Some(child) = child else { continue };
            let child_tag = tree.node(*child).tag;
            let child_type = langops.gettype(child_tag, tree, *child, Type::Unknown);
            let required = required_of(tree, id, index);
            if !Type::subsumes(required, child_type) {
                diags.push(type_mismatch(tree, *child, required, child_type));
            }
        }
        let _ = actual;
    }
    diags
}

fn type_mismatch(tree: &Tree, node: NodeId, required: Type, actual: Type) -> Diagnostic {
    let org = tree.node(node).org;
    let span = Span::new(org.file_id, org.line, 0, 0);
    Diagnostic::error(
        format!("expected {required:?}, found {actual:?}"),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrower_const_subsumes_wider_slot() {
        assert!(Type::subsumes(Type::Const16, Type::Const8));
        assert!(Type::subsumes(Type::Const8, Type::Const3));
        assert!(!Type::subsumes(Type::Const3, Type::Const8));
    }

    #[test]
    fn unknown_is_permissive_either_side() {
        assert!(Type::subsumes(Type::Unknown, Type::Register));
        assert!(Type::subsumes(Type::Register, Type::Unknown));
    }

    #[test]
    fn mismatched_concrete_types_do_not_subsume() {
        assert!(!Type::subsumes(Type::Register, Type::Const8));
    }
}
