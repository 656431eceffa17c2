//! The AVR back-end driver (§4.8-§4.10): walks the parsed program once,
//! selecting the target MCU, assembling each directive/instruction into
//! an [`Image`], and replaying [`Fixup`]s as labels resolve. Grounded in
//! `atmelavr_be_do_codegen`'s single-pass-with-deferred-fixups shape,
//! redesigned per §9 to index into [`LabelTable`] instead of walking
//! pointer-linked fixup lists.

use crate::avr::hex;
use crate::avr::image::{Image, Zone};
use crate::avr::instr::{self, EncodeError, Mnemonic};
use crate::avr::label::{Fixup, FixupKind, LabelId, LabelTable};
use crate::avr::listing::ListingEntry;
use crate::avr::mcu::{self, McuInfo};
use crate::avr::operand::{Index, Operand};
use crate::avr::tags::Tags;
use crate::constprop::{self, ConstPropState};
use crate::diagnostic::{Diagnostic, Severity};
use crate::langops::LangOpsRegistry;
use crate::span::Span;
use crate::symtab::Interner;
use crate::tree::compops::CompOpsRegistry;
use crate::tree::{Literal, NodeId, Tree};

pub struct AssembleOutput {
    pub image: Image,
    pub mcu: McuInfo,
    pub diagnostics: Vec<Diagnostic>,
    pub listing: Vec<ListingEntry>,
}

impl AssembleOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Render a `.hex` file per segment that received any bytes.
    pub fn hex_outputs(&self) -> Vec<(Zone, String)> {
        [Zone::Text, Zone::Data, Zone::Eeprom]
            .into_iter()
            .filter(|&z| !self.image.segment(z).ranges.is_empty())
            .map(|z| (z, hex::render(self.image.segment(z))))
            .collect()
    }
}

/// Assemble `program` against `tree`. `requested_mcu` is the `--target`
/// CLI override, if any; otherwise the first `.mcu` directive is used,
/// falling back to [`mcu::DEFAULT`] with a warning (scenario 6, §8).
pub fn assemble(
    tree: &mut Tree,
    program: NodeId,
    tags: &Tags,
    interner: &Interner,
    requested_mcu: Option<&str>,
) -> AssembleOutput {
    let mut diags = Vec::new();
    let target = select_mcu(tree, program, tags, interner, requested_mcu, &mut diags);

    let mut image = Image::new();
    let mut labels = LabelTable::new();
    let mut zone = Zone::Text;
    let compops = CompOpsRegistry::new();
    let langops = LangOpsRegistry::new();
    let mut listing = Vec::new();

    let items: Vec<NodeId> = tree.node(program).subnodes.iter().flatten().copied().collect();
    for item in items {
        let tag = tree.node(item).tag;

        if tag == tags.seg_text {
            zone = Zone::Text;
            listing.push(ListingEntry::SegmentChange(zone));
        } else if tag == tags.seg_data {
            zone = Zone::Data;
            listing.push(ListingEntry::SegmentChange(zone));
        } else if tag == tags.seg_eeprom {
            zone = Zone::Eeprom;
            listing.push(ListingEntry::SegmentChange(zone));
        } else if tag == tags.mcu || tag == tags.equ || tag == tags.def {
            // handled in select_mcu / at parse time
        } else if tag == tags.org {
            let expr = tree.subnode(item, 0).expect(".org has one operand");
            match eval_const(tree, expr, tags, &compops, &langops) {
                Some(addr) => image.segment_mut(zone).org(addr as u32),
                None => diags.push(Diagnostic::error(
                    "'.org' requires a constant address".to_string(),
                    span_of(tree, item),
                )),
            }
        } else if tag == tags.space {
            let expr = tree.subnode(item, 0).expect(".space has one operand");
            match eval_const(tree, expr, tags, &compops, &langops) {
                Some(n) => image.segment_mut(zone).space(n as u32),
                None => diags.push(Diagnostic::error(
                    "'.space' requires a constant count".to_string(),
                    span_of(tree, item),
                )),
            }
        } else if tag == tags.space16 {
            let expr = tree.subnode(item, 0).expect(".space16 has one operand");
            match eval_const(tree, expr, tags, &compops, &langops) {
                Some(n) => image.segment_mut(zone).space(n as u32 * 2),
                None => diags.push(Diagnostic::error(
                    "'.space16' requires a constant count".to_string(),
                    span_of(tree, item),
                )),
            }
        } else if tag == tags.konst {
            emit_const(tree, item, tags, zone, &target, &mut image, &compops, &langops, 1, &mut diags, &mut listing);
        } else if tag == tags.konst16 {
            emit_const(tree, item, tags, zone, &target, &mut image, &compops, &langops, 2, &mut diags, &mut listing);
        } else if tag == tags.glabel || tag == tags.llabel {
            let name = match tree.node(item).literal {
                Some(Literal::Sym(s)) => s,
                _ => unreachable!("label node always carries its name"),
            };
            let id = labels.declare(name);
            let address = image.segment(zone).cursor;
            listing.push(ListingEntry::Label { name, address });
            for fixup_id in labels.define(id, address) {
                let fixup = labels.fixup(fixup_id).clone();
                replay_fixup(&fixup, address, &target, &mut image, &mut diags);
            }
        } else if tag == tags.instr {
            assemble_instruction(
                tree, item, tags, interner, zone, &target, &mut image, &mut labels, &compops, &langops, &mut diags,
                &mut listing,
            );
        }
    }

    for undefined in labels.undefined() {
        diags.push(Diagnostic::error(
            format!("undefined label '{}'", interner.resolve(undefined.name)),
            Span::dummy(),
        ));
    }

    if let Err(e) = image.check_all_ranges() {
        diags.push(e);
    }

    AssembleOutput { image, mcu: target, diagnostics: diags, listing }
}

/// A best-effort source location for a tree node, using its recorded
/// origin with a zero byte range (no exact column tracked past parsing).
fn span_of(tree: &Tree, node: NodeId) -> Span {
    let org = tree.node(node).org;
    Span::new(org.file_id, org.line, 0, 0)
}

fn select_mcu(
    tree: &Tree,
    program: NodeId,
    tags: &Tags,
    interner: &Interner,
    requested: Option<&str>,
    diags: &mut Vec<Diagnostic>,
) -> McuInfo {
    if let Some(name) = requested {
        return match mcu::by_name(name) {
            Some(info) => info,
            None => {
                diags.push(Diagnostic::error(format!("unknown MCU target '{name}'"), Span::dummy()));
                mcu::DEFAULT
            }
        };
    }

    let directive = tree.node(program).subnodes.iter().flatten().find(|&&id| tree.node(id).tag == tags.mcu);
    if let Some(&id) = directive {
        let name = match &tree.node(id).literal {
            Some(Literal::Str(s)) => s.clone(),
            _ => unreachable!(),
        };
        return match mcu::by_name(&name) {
            Some(info) => info,
            None => {
                diags.push(Diagnostic::error(format!("unknown MCU target '{name}'"), span_of(tree, id)));
                mcu::DEFAULT
            }
        };
    }

    let _ = interner;
    diags.push(Diagnostic::warning(
        format!("no '.mcu' directive and no --target given; defaulting to {}", mcu::DEFAULT.name),
        Span::dummy(),
    ));
    mcu::DEFAULT
}

/// Fold a genuinely constant expression (integer literal, or
/// `low`/`high` over one) through the generic constant-folding engine.
/// Anything involving a label reference isn't constant at this point —
/// callers that might see one should reject it rather than call this.
fn eval_const(tree: &mut Tree, node: NodeId, tags: &Tags, compops: &CompOpsRegistry, langops: &LangOpsRegistry) -> Option<i64> {
    if tree.node(node).tag == tags.labelref {
        return None;
    }
    let mut state = ConstPropState::new();
    state.register(tags.low, |vals| vals[0] & 0xFF);
    state.register(tags.high, |vals| (vals[0] >> 8) & 0xFF);
    constprop::run(tree, node, compops, langops, &mut state);
    tree.node(node).const_value
}

fn encode_words(words: &[u16], bswap: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 2);
    for &w in words {
        let [lo, hi] = w.to_le_bytes();
        if bswap {
            out.push(hi);
            out.push(lo);
        } else {
            out.push(lo);
            out.push(hi);
        }
    }
    out
}

fn replay_fixup(fixup: &Fixup, label_address: u32, target: &McuInfo, image: &mut Image, diags: &mut Vec<Diagnostic>) {
    match fixup.reencode(label_address) {
        Ok(encoded) => {
            let bytes = encode_words(&encoded.words, target.bswap_code && encoded.wide);
            image.segment_mut(fixup.zone).patch(fixup.site_address, &bytes);
        }
        Err(e) => diags.push(encode_error_diagnostic(e, Span::dummy())),
    }
}

fn encode_error_diagnostic(err: EncodeError, span: Span) -> Diagnostic {
    let message = match err {
        EncodeError::OutOfRange { mnemonic, min, max, got } => {
            format!("'{}' operand {got} out of range [{min}, {max}]", instr::mnemonic_name(mnemonic))
        }
        EncodeError::InvalidRegister { mnemonic, got } => {
            format!("invalid register r{got} for '{}'", instr::mnemonic_name(mnemonic))
        }
        EncodeError::WrongOperandCount { mnemonic, expected, got } => {
            format!("'{}' expects {expected} operand(s), found {got}", instr::mnemonic_name(mnemonic))
        }
        EncodeError::WrongOperandKind { mnemonic, index } => {
            format!("'{}' operand {index} has the wrong kind", instr::mnemonic_name(mnemonic))
        }
    };
    Diagnostic::error(message, span)
}

/// Which fixup kind (and operand index) a bare label reference implies
/// for a given mnemonic — everything else either doesn't take a label
/// operand at all, or only does so wrapped in `low()`/`high()` (handled
/// directly in [`resolve_operand`] regardless of mnemonic).
fn fixup_kind_for(mnemonic: Mnemonic, index: usize) -> Option<FixupKind> {
    use Mnemonic::*;
    match (mnemonic, index) {
        (RJMP, 0) | (RCALL, 0) => Some(FixupKind::Relative { bits: 12 }),
        (JMP, 0) | (CALL, 0) => Some(FixupKind::AbsoluteWide),
        (BRBS, 1) | (BRBC, 1) => Some(FixupKind::Relative { bits: 7 }),
        (LDS, 1) => Some(FixupKind::AbsoluteData),
        (STS, 0) => Some(FixupKind::AbsoluteData),
        (
            BREQ | BRNE | BRCS | BRCC | BRSH | BRLO | BRMI | BRPL | BRGE | BRLT | BRHS | BRHC
            | BRTS | BRTC | BRVS | BRVC | BRIE | BRID,
            0,
        ) => Some(FixupKind::Relative { bits: 7 }),
        _ => None,
    }
}

enum ResolvedOperand {
    Value(Operand),
    Label(LabelId, FixupKind),
}

fn resolve_operand(
    tree: &mut Tree,
    node: NodeId,
    tags: &Tags,
    labels: &mut LabelTable,
    compops: &CompOpsRegistry,
    langops: &LangOpsRegistry,
    default_kind: Option<FixupKind>,
) -> Result<ResolvedOperand, Diagnostic> {
    let n = tree.node(node);
    let tag = n.tag;

    if tag == tags.reg {
        let Some(Literal::Int(v)) = n.literal else { unreachable!() };
        return Ok(ResolvedOperand::Value(Operand::Reg(v as u8)));
    }
    if tag == tags.integer {
        let Some(Literal::Int(v)) = n.literal else { unreachable!() };
        return Ok(ResolvedOperand::Value(Operand::Const(v)));
    }
    if tag == tags.idx_x {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::X)));
    }
    if tag == tags.idx_x_postinc {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::XPostInc)));
    }
    if tag == tags.idx_x_predec {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::XPreDec)));
    }
    if tag == tags.idx_y {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::Y)));
    }
    if tag == tags.idx_y_postinc {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::YPostInc)));
    }
    if tag == tags.idx_y_predec {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::YPreDec)));
    }
    if tag == tags.idx_z {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::Z)));
    }
    if tag == tags.idx_z_postinc {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::ZPostInc)));
    }
    if tag == tags.idx_z_predec {
        return Ok(ResolvedOperand::Value(Operand::Index(Index::ZPreDec)));
    }
    if tag == tags.idx_y_disp {
        let Some(Literal::Int(q)) = n.literal else { unreachable!() };
        return Ok(ResolvedOperand::Value(Operand::Index(Index::YDisp(q as u8))));
    }
    if tag == tags.idx_z_disp {
        let Some(Literal::Int(q)) = n.literal else { unreachable!() };
        return Ok(ResolvedOperand::Value(Operand::Index(Index::ZDisp(q as u8))));
    }
    if tag == tags.labelref {
        let Some(Literal::Sym(name)) = n.literal else { unreachable!() };
        let kind = default_kind.ok_or_else(|| {
            Diagnostic::error("a label reference isn't valid in this operand position".to_string(), span_of(tree, node))
        })?;
        return Ok(ResolvedOperand::Label(labels.declare(name), kind));
    }
    if tag == tags.low || tag == tags.high {
        let shift = if tag == tags.low { 0 } else { 8 };
        let inner = tree.subnode(node, 0).expect("low/high has one operand");
        if tree.node(inner).tag == tags.labelref {
            let Some(Literal::Sym(name)) = tree.node(inner).literal else { unreachable!() };
            return Ok(ResolvedOperand::Label(labels.declare(name), FixupKind::Byte { shift }));
        }
        let value = eval_const(tree, node, tags, compops, langops)
            .ok_or_else(|| Diagnostic::error("expected a constant expression".to_string(), span_of(tree, node)))?;
        return Ok(ResolvedOperand::Value(Operand::Const(value)));
    }
    Err(Diagnostic::error("unsupported operand".to_string(), span_of(tree, node)))
}

#[allow(clippy::too_many_arguments)]
fn assemble_instruction(
    tree: &mut Tree,
    item: NodeId,
    tags: &Tags,
    interner: &Interner,
    zone: Zone,
    target: &McuInfo,
    image: &mut Image,
    labels: &mut LabelTable,
    compops: &CompOpsRegistry,
    langops: &LangOpsRegistry,
    diags: &mut Vec<Diagnostic>,
    listing: &mut Vec<ListingEntry>,
) {
    let name_sym = match tree.node(item).literal {
        Some(Literal::Sym(s)) => s,
        _ => unreachable!("instr node always carries its mnemonic"),
    };
    let name = interner.resolve(name_sym).to_string();
    let Some(mnemonic) = instr::by_name(&name) else {
        diags.push(Diagnostic::error(format!("unknown mnemonic '{name}'"), span_of(tree, item)));
        return;
    };

    let operand_nodes: Vec<NodeId> = tree.node(item).subnodes.iter().flatten().copied().collect();
    let mut operands = Vec::with_capacity(operand_nodes.len());
    let mut label_slots = Vec::new();
    for (index, node) in operand_nodes.into_iter().enumerate() {
        let default_kind = fixup_kind_for(mnemonic, index);
        match resolve_operand(tree, node, tags, labels, compops, langops, default_kind) {
            Ok(ResolvedOperand::Value(op)) => operands.push(op),
            Ok(ResolvedOperand::Label(id, kind)) => {
                operands.push(Operand::Const(0));
                label_slots.push((index, id, kind));
            }
            Err(d) => {
                diags.push(d);
                return;
            }
        }
    }

    let site_address = image.segment(zone).cursor;
    let encoded = match instr::encode(mnemonic, &operands) {
        Ok(e) => e,
        Err(e) => {
            diags.push(encode_error_diagnostic(e, span_of(tree, item)));
            return;
        }
    };
    let bytes = encode_words(&encoded.words, target.bswap_code && encoded.wide);
    image.segment_mut(zone).write(&bytes);
    listing.push(ListingEntry::Bytes { address: site_address, bytes: bytes.clone(), line: tree.node(item).org.line });

    for (operand_index, label_id, kind) in label_slots {
        if let Some(addr) = labels.address_of(label_id) {
            let fixup = Fixup {
                label: label_id,
                kind,
                instr: item,
                zone,
                byte_offset: site_address as usize,
                site_address,
                mnemonic,
                operands: operands.clone(),
                operand_index,
            };
            replay_fixup(&fixup, addr, target, image, diags);
        } else {
            labels.add_fixup(Fixup {
                label: label_id,
                kind,
                instr: item,
                zone,
                byte_offset: site_address as usize,
                site_address,
                mnemonic,
                operands: operands.clone(),
                operand_index,
            });
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_const(
    tree: &mut Tree,
    item: NodeId,
    tags: &Tags,
    zone: Zone,
    target: &McuInfo,
    image: &mut Image,
    compops: &CompOpsRegistry,
    langops: &LangOpsRegistry,
    width: u8,
    diags: &mut Vec<Diagnostic>,
    listing: &mut Vec<ListingEntry>,
) {
    let _ = target;
    let payload = tree.subnode(item, 0).expect(".const/.const16 has one operand");
    let mut bytes = Vec::new();

    if tree.node(payload).tag == tags.string {
        let text = match &tree.node(payload).literal {
            Some(Literal::Str(s)) => s.clone(),
            _ => unreachable!(),
        };
        bytes.extend(text.into_bytes());
    } else {
        let items: Vec<NodeId> = tree.node(payload).subnodes.iter().flatten().copied().collect();
        for expr in items {
            match eval_const(tree, expr, tags, compops, langops) {
                Some(v) => {
                    if width == 1 {
                        if v < -128 || v > 255 {
                            diags.push(Diagnostic::error(
                                format!("constant {v} out of range for '.const' (expected -128..=255)"),
                                span_of(tree, expr),
                            ));
                            continue;
                        }
                        bytes.push((v & 0xFF) as u8);
                    } else {
                        if v < -32768 || v > 65535 {
                            diags.push(Diagnostic::error(
                                format!("constant {v} out of range for '.const16' (expected -32768..=65535)"),
                                span_of(tree, expr),
                            ));
                            continue;
                        }
                        bytes.extend((v as u16).to_le_bytes());
                    }
                }
                None => diags.push(Diagnostic::error(
                    "'.const'/'.const16' entries must be constant".to_string(),
                    span_of(tree, expr),
                )),
            }
        }
    }

    let const_address = image.segment(zone).cursor;
    image.segment_mut(zone).write(&bytes);
    listing.push(ListingEntry::Bytes { address: const_address, bytes, line: tree.node(item).org.line });

    if zone == Zone::Text && image.segment(zone).cursor % 2 != 0 {
        image.segment_mut(zone).write(&[0]);
        diags.push(Diagnostic::warning(
            "odd-length constant in the text segment padded to a 16-bit boundary".to_string(),
            span_of(tree, item),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avr::lexer::Lexer;
    use crate::avr::parser;

    fn assemble_src(src: &str, target: Option<&str>) -> (AssembleOutput, Interner) {
        let mut interner = Interner::new();
        let (tokens, lex_diags) = Lexer::new(src, 0).lex(&mut interner);
        assert!(lex_diags.is_empty(), "{lex_diags:?}");
        let (tokens, _) = crate::avr::prescope::expand_macros(tokens, &mut interner);
        let mut result = parser::parse(tokens, &mut interner);
        let tags = Tags::new(&mut interner);
        let output = assemble(&mut result.tree, result.program, &tags, &interner, target);
        (output, interner)
    }

    #[test]
    fn empty_program_produces_no_output_ranges() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\n", None);
        assert!(!out.has_errors());
        assert!(out.hex_outputs().is_empty());
    }

    #[test]
    fn missing_mcu_defaults_with_a_warning() {
        let (out, _) = assemble_src("nop\n", None);
        assert_eq!(out.mcu.name, "ATMEGA328");
        assert!(out.diagnostics.iter().any(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn forward_label_reference_resolves_on_second_pass() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\nrjmp skip\nnop\nskip: nop\n", None);
        assert!(!out.has_errors(), "{:?}", out.diagnostics);
        let bytes = &out.image.segment(Zone::Text).ranges[0].bytes;
        // rjmp skip: target word index 2, site word index 0 -> k=2
        assert_eq!(&bytes[0..2], &[0x02, 0xC0]);
    }

    #[test]
    fn backward_local_label_resolves_to_negative_one() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\n1: nop\nrjmp 1b\n", None);
        assert!(!out.has_errors(), "{:?}", out.diagnostics);
        let bytes = &out.image.segment(Zone::Text).ranges[0].bytes;
        assert_eq!(&bytes[2..4], &[0xFF, 0xCF]);
    }

    #[test]
    fn overlapping_org_ranges_reject_with_no_hex_output() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\n.org 0\nnop\nnop\n.org 1\nnop\n", None);
        assert!(out.has_errors());
    }

    #[test]
    fn invalid_register_reports_an_error() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\nadiw r22, 1\n", None);
        assert!(out.has_errors());
        assert!(out.diagnostics.iter().any(|d| d.message.contains("invalid register")));
    }

    #[test]
    fn undefined_label_is_reported() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\nrjmp nowhere\n", None);
        assert!(out.has_errors());
        assert!(out.diagnostics.iter().any(|d| d.message.contains("undefined label")));
    }

    #[test]
    fn const_string_is_written_as_bytes() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\n.const \"hi\"\n", None);
        assert!(!out.has_errors(), "{:?}", out.diagnostics);
        let bytes = &out.image.segment(Zone::Text).ranges[0].bytes;
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn low_high_resolve_a_forward_label_byte_by_byte() {
        let (out, _) = assemble_src(".mcu \"atmega328\"\nldi r16, low(target)\nldi r17, high(target)\ntarget: nop\n", None);
        assert!(!out.has_errors(), "{:?}", out.diagnostics);
    }
}
