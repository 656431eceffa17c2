//! The tree-rewriting pass pipeline (§4, "pipeline of tree-rewriting
//! passes") in its fixed execution order. A front-end's job is to build
//! a tree that can survive every pass in this list; a back-end's job is
//! to consume the last few.

/// One stage of the compilation pipeline. Order is significant: [`Pass::ALL`]
/// is the full sequence the core defines; a given front-end/back-end drives
/// whatever subset of it applies (the AVR assembler's `avr::assemble_source`
/// only needs `Prescope` through code generation, since there's no type
/// system or scoped overload resolution in assembly).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Macro expansion, syntax-sugar desugaring, declaration hoisting.
    Prescope,
    /// Walk declarations, push scopes, bind names.
    ScopeIn,
    /// Pop scopes in reverse, catch unused-declaration warnings.
    ScopeOut,
    /// Resolve node types bottom-up; subsumption checks.
    TypeCheck,
    /// Fold constant expressions bottom-up.
    ConstProp,
    /// Resolve remaining ambiguous types once constants are known.
    TypeResolve,
    /// Front-end-specific checks that must run before transforms.
    PreCheck,
    /// Front-end-specific tree transforms (e.g. macro-call inlining).
    FeTrans,
    /// Multi-way synchronisation transform (non-goal front-ends only;
    /// a no-op walk for the AVR grammar).
    MwSyncTrans,
    /// Back-end-oriented tree transforms.
    BeTrans,
    /// Pre-mapping: attach back-end-specific annotations ahead of
    /// name-mapping.
    PreMap,
    /// Map symbolic names to back-end storage locations.
    NameMap,
    /// Back-end-specific mapping pass.
    BeMap,
    /// Front-end-specific checks that must run after transforms.
    PostCheck,
    /// Allocate back-end resources (label addresses, segment offsets).
    Preallocate,
    /// Emit a pre-codegen representation (address assignment).
    Precode,
    /// Final code generation.
    Codegen,
}

impl Pass {
    pub const ALL: [Pass; 17] = [
        Pass::Prescope,
        Pass::ScopeIn,
        Pass::ScopeOut,
        Pass::TypeCheck,
        Pass::ConstProp,
        Pass::TypeResolve,
        Pass::PreCheck,
        Pass::FeTrans,
        Pass::MwSyncTrans,
        Pass::BeTrans,
        Pass::PreMap,
        Pass::NameMap,
        Pass::BeMap,
        Pass::PostCheck,
        Pass::Preallocate,
        Pass::Precode,
        Pass::Codegen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pass::Prescope => "prescope",
            Pass::ScopeIn => "scopein",
            Pass::ScopeOut => "scopeout",
            Pass::TypeCheck => "typecheck",
            Pass::ConstProp => "constprop",
            Pass::TypeResolve => "typeresolve",
            Pass::PreCheck => "precheck",
            Pass::FeTrans => "fetrans",
            Pass::MwSyncTrans => "mwsynctrans",
            Pass::BeTrans => "betrans",
            Pass::PreMap => "premap",
            Pass::NameMap => "namemap",
            Pass::BeMap => "bemap",
            Pass::PostCheck => "postcheck",
            Pass::Preallocate => "preallocate",
            Pass::Precode => "precode",
            Pass::Codegen => "codegen",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_order_matches_pipeline_spec() {
        assert_eq!(Pass::ALL[0], Pass::Prescope);
        assert_eq!(Pass::ALL[4], Pass::ConstProp);
        assert_eq!(*Pass::ALL.last().unwrap(), Pass::Codegen);
    }

    #[test]
    fn pass_names_are_lowercase() {
        for pass in Pass::ALL {
            assert_eq!(pass.name(), pass.name().to_lowercase());
        }
    }
}
