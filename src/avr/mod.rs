//! The AVR assembler front-end and code-generating back-end (§4.8-4.11):
//! wires lexing, macro expansion, parsing, code generation, HEX
//! emission, and listing output into one pipeline, the way a front-end
//! built on the generic core (`crate::pass`, `crate::tree`) drives it
//! end to end.

pub mod codegen;
pub mod hex;
pub mod image;
pub mod instr;
pub mod label;
pub mod lexer;
pub mod listing;
pub mod mcu;
pub mod operand;
pub mod parser;
pub mod prescope;
pub mod tags;

use crate::diagnostic::{Diagnostic, Severity};
use crate::symtab::Interner;

use codegen::AssembleOutput;
use image::Zone;
use lexer::Lexer;
use listing::Header;
use tags::Tags;

/// Everything a `noccavr build`/`check` invocation needs to report or
/// write out: the assembled image plus every diagnostic raised at any
/// stage (lex, macro expansion, parse, codegen), already combined and
/// in source order.
pub struct Assembled {
    pub output: AssembleOutput,
    pub diagnostics: Vec<Diagnostic>,
    pub interner: Interner,
}

impl Assembled {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Render the `.hex` outputs, one per non-empty segment.
    pub fn hex_outputs(&self) -> Vec<(Zone, String)> {
        self.output.hex_outputs()
    }

    /// Render the `.lst` listing text for this assembly.
    pub fn listing_text(&self, source_file: &str, out_file: &str) -> String {
        let header = Header {
            out_file,
            source_file,
            source_language: "avrasm",
            target_name: self.output.mcu.name,
        };
        listing::render(&header, &self.output.listing, &self.diagnostics, &self.interner)
    }
}

/// Run the whole pipeline over `source`: lex, expand macros, parse,
/// then assemble against `target` (or whatever `.mcu` directive/default
/// the source picks), matching `atmelavr_be_do_codegen`'s top-level
/// driver shape without any of its global state.
pub fn assemble_source(source: &str, target: Option<&str>) -> Assembled {
    let mut interner = Interner::new();
    let mut diagnostics = Vec::new();

    let (tokens, lex_diags) = Lexer::new(source, 0).lex(&mut interner);
    diagnostics.extend(lex_diags);

    let (tokens, macro_diags) = prescope::expand_macros(tokens, &mut interner);
    diagnostics.extend(macro_diags);

    let mut parse_result = parser::parse(tokens, &mut interner);
    diagnostics.extend(parse_result.diagnostics);

    let tags = Tags::new(&mut interner);
    let output = codegen::assemble(&mut parse_result.tree, parse_result.program, &tags, &interner, target);
    diagnostics.extend(output.diagnostics.iter().cloned());

    Assembled { output, diagnostics, interner }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_pipeline_produces_hex_and_listing() {
        let assembled = assemble_source(".mcu \"atmega328\"\nstart:\n\tnop\n\trjmp start\n", None);
        assert!(!assembled.has_errors(), "{:?}", assembled.diagnostics);
        let hex = assembled.hex_outputs();
        assert_eq!(hex.len(), 1);
        assert_eq!(hex[0].0, Zone::Text);
        let listing = assembled.listing_text("start.asm", "start.lst");
        assert!(listing.contains("assembled from start.asm"));
        assert!(listing.contains("start:"));
    }

    #[test]
    fn macro_expansion_runs_before_parsing() {
        let assembled = assemble_source(".mcu \"atmega328\"\nmacro setup\n\tnop\nendm\nsetup\n", None);
        assert!(!assembled.has_errors(), "{:?}", assembled.diagnostics);
    }
}
