//! A multi-language compiler framework core (§1-§4), instantiated here
//! for a single front-end/back-end pair: an AVR assembler. The core —
//! symbol interning, typed trees, the DFA engine, the reduction VM, the
//! `compops`/`langops` registries, the fixed pass pipeline — knows
//! nothing about AVR or assembly syntax; everything under [`avr`] is
//! the one instantiation this crate ships.

pub mod avr;
pub mod config;
pub mod constprop;
pub mod dfa;
pub mod diagnostic;
pub mod langops;
pub mod pass;
pub mod reduce;
pub mod span;
pub mod symtab;
pub mod token;
pub mod tree;
pub mod typecheck;
