//! `.lst` listing output (§4.11, new): a text file emitted alongside the
//! `.hex` outputs, grounded in `atmelavr_be_codegen_init`'s header block
//! (`codegen_write_fmt`'s `"#\t..."` lines) plus one line per assembled
//! item, with warnings printed inline at the point they were raised.

use crate::avr::image::Zone;
use crate::diagnostic::{Diagnostic, Severity};
use crate::symtab::{Interner, Sym};

/// One event recorded during [`crate::avr::codegen::assemble`], in the
/// order it happened, for [`render`] to turn into listing lines.
pub enum ListingEntry {
    SegmentChange(Zone),
    Label { name: Sym, address: u32 },
    Bytes { address: u32, bytes: Vec<u8>, line: u32 },
}

/// Header fields `atmelavr_be_codegen_init` writes before any listing
/// content: output/source filenames, host, timestamp, source language
/// and target name.
pub struct Header<'a> {
    pub out_file: &'a str,
    pub source_file: &'a str,
    pub source_language: &'a str,
    pub target_name: &'a str,
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "(unknown)".to_string())
}

fn timestamp() -> String {
    chrono::Local::now().format("%a %b %e %T %Y").to_string()
}

fn zone_name(zone: Zone) -> &'static str {
    match zone {
        Zone::Text => ".text",
        Zone::Data => ".data",
        Zone::Eeprom => ".eeprom",
    }
}

/// Render the full listing: header block, then one line per entry, with
/// any warning raised at that entry's source line printed right after it.
pub fn render(header: &Header, entries: &[ListingEntry], diagnostics: &[Diagnostic], interner: &Interner) -> String {
    let mut out = String::new();
    out.push_str("#\n");
    out.push_str(&format!("#\t{}\n", header.out_file));
    out.push_str(&format!("#\tassembled from {}\n", header.source_file));
    out.push_str(&format!("#\ton host {} at {}\n", hostname(), timestamp()));
    out.push_str(&format!(
        "#\tsource language: {}, target: {}\n",
        header.source_language, header.target_name
    ));
    out.push_str("#\n\n");

    for entry in entries {
        match entry {
            ListingEntry::SegmentChange(zone) => {
                out.push_str(&format!("{}\n", zone_name(*zone)));
            }
            ListingEntry::Label { name, address } => {
                out.push_str(&format!("{:06x}          {}:\n", address, interner.resolve(*name)));
            }
            ListingEntry::Bytes { address, bytes, line } => {
                let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
                out.push_str(&format!("{:06x}  {:<24}  ; line {}\n", address, hex.join(" "), line));
                for d in diagnostics.iter().filter(|d| d.severity == Severity::Warning && d.span.line == *line) {
                    out.push_str(&format!("        ; warning: {}\n", d.message));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn header_carries_every_required_field() {
        let interner = Interner::new();
        let header = Header {
            out_file: "blink.lst",
            source_file: "blink.asm",
            source_language: "avrasm",
            target_name: "ATMEGA328",
        };
        let text = render(&header, &[], &[], &interner);
        assert!(text.contains("blink.lst"));
        assert!(text.contains("assembled from blink.asm"));
        assert!(text.contains("source language: avrasm, target: ATMEGA328"));
    }

    #[test]
    fn label_and_bytes_entries_render_with_addresses() {
        let mut interner = Interner::new();
        let name = interner.intern("loop");
        let header = Header { out_file: "a.lst", source_file: "a.asm", source_language: "avrasm", target_name: "ATMEGA328" };
        let entries = vec![
            ListingEntry::SegmentChange(Zone::Text),
            ListingEntry::Label { name, address: 0 },
            ListingEntry::Bytes { address: 0, bytes: vec![0x00, 0x00], line: 2 },
        ];
        let text = render(&header, &entries, &[], &interner);
        assert!(text.contains(".text"));
        assert!(text.contains("loop:"));
        assert!(text.contains("000000  00 00"));
    }

    #[test]
    fn warning_prints_inline_after_its_line() {
        let interner = Interner::new();
        let header = Header { out_file: "a.lst", source_file: "a.asm", source_language: "avrasm", target_name: "ATMEGA328" };
        let entries = vec![ListingEntry::Bytes { address: 0, bytes: vec![0x68, 0x69], line: 3 }];
        let diags = vec![Diagnostic::warning("odd-length constant".to_string(), Span::new(0, 3, 0, 0))];
        let text = render(&header, &entries, &diags, &interner);
        let bytes_pos = text.find("; line 3").unwrap();
        let warn_pos = text.find("; warning: odd-length constant").unwrap();
        assert!(warn_pos > bytes_pos);
    }
}
