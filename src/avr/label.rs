//! Label resolution (§4.8, redesigned per §9): a label owns the list of
//! fixups referencing it before its address is known; a fixup owns the
//! label it's waiting on. The original links these with raw pointers
//! in both directions, which is exactly the kind of reference cycle
//! this crate avoids by indexing into arenas instead.

use crate::avr::image::Zone;
use crate::avr::instr::{self, Mnemonic};
use crate::avr::operand::Operand;
use crate::symtab::Sym;
use crate::tree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LabelId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixupId(u32);

/// How a fixup's resolved address turns into the operand value that
/// gets spliced back into its instruction, matching the
/// `insarg_to_const{addr,addrdiff}` family of helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixupKind {
    /// A relative branch/call: word displacement from the address right
    /// after this instruction to the label.
    Relative { bits: u8 },
    /// An absolute code (word) address, full width (jmp/call).
    AbsoluteWide,
    /// An absolute data (byte) address, full width (lds/sts).
    AbsoluteData,
    /// One byte of the label's byte address (`low(label)`/`high(label)`).
    Byte { shift: u8 },
}

impl FixupKind {
    /// Turn a resolved label address into the operand value this kind
    /// describes, given the fixup's own site address (`.org`-relative,
    /// in bytes for data fixups, in words for code fixups).
    fn resolve(self, label_address: u32, site_address: u32) -> i64 {
        match self {
            FixupKind::Relative { .. } => {
                let word_pc = site_address / 2;
                let word_target = label_address / 2;
                word_target as i64 - word_pc as i64
            }
            FixupKind::AbsoluteWide => (label_address / 2) as i64,
            FixupKind::AbsoluteData => label_address as i64,
            FixupKind::Byte { shift } => ((label_address >> shift) & 0xFF) as i64,
        }
    }
}

/// A deferred re-encoding request: the instruction that referenced an
/// as-yet-undefined label, frozen with everything `instr::encode` needs
/// to redo its work once the label's address is known. Matches §3's
/// `{image, instruction node, byte offset within image}` shape, plus
/// the mnemonic/operand template this crate's arena-based encoder
/// needs in place of walking back through the tree.
#[derive(Clone, Debug)]
pub struct Fixup {
    pub label: LabelId,
    pub kind: FixupKind,
    /// The instruction node this fixup's encoding came from; kept for
    /// diagnostics (source span) rather than re-walked at resolve time.
    pub instr: NodeId,
    pub zone: Zone,
    /// Byte offset into the zone's output buffer where the re-encoded
    /// word(s) must be patched.
    pub byte_offset: usize,
    /// The `.org`-relative address of the instruction, needed to
    /// compute relative-branch displacements.
    pub site_address: u32,
    pub mnemonic: Mnemonic,
    /// The instruction's operands at first-pass time, with a
    /// placeholder `Operand::Const(0)` at `operand_index`.
    pub operands: Vec<Operand>,
    pub operand_index: usize,
}

impl Fixup {
    /// Re-encode this fixup's instruction now that its label has a
    /// known address, substituting the resolved value at
    /// `operand_index`.
    pub fn reencode(&self, label_address: u32) -> Result<instr::Encoded, instr::EncodeError> {
        let value = self.kind.resolve(label_address, self.site_address);
        let mut operands = self.operands.clone();
        operands[self.operand_index] = Operand::Const(value);
        instr::encode(self.mnemonic, &operands)
    }
}

#[derive(Clone, Debug)]
pub struct LabelInfo {
    pub name: Sym,
    pub address: Option<u32>,
    pub fixups: Vec<FixupId>,
}

/// Owns every label and fixup for one assembly pass. Arena-indexed so
/// a label's fixup list and a fixup's label reference are plain
/// `Copy` indices rather than pointers.
#[derive(Default)]
pub struct LabelTable {
    labels: Vec<LabelInfo>,
    fixups: Vec<Fixup>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: Sym) -> LabelId {
        if let Some(pos) = self.labels.iter().position(|l| l.name == name) {
            return LabelId(pos as u32);
        }
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(LabelInfo { name, address: None, fixups: Vec::new() });
        id
    }

    pub fn label(&self, id: LabelId) -> &LabelInfo {
        &self.labels[id.0 as usize]
    }

    pub fn address_of(&self, id: LabelId) -> Option<u32> {
        self.labels[id.0 as usize].address
    }

    /// Record the resolved address of a label declaration. Returns the
    /// fixups now ready to be replayed through the encoder. Duplicate
    /// definitions silently overwrite the address, matching
    /// `atmelavr_be_do_codegen`'s handling of redefinitions.
    pub fn define(&mut self, id: LabelId, address: u32) -> Vec<FixupId> {
        let label = &mut self.labels[id.0 as usize];
        label.address = Some(address);
        std::mem::take(&mut label.fixups)
    }

    pub fn add_fixup(&mut self, fixup: Fixup) -> FixupId {
        let label = fixup.label;
        let id = FixupId(self.fixups.len() as u32);
        self.fixups.push(fixup);
        self.labels[label.0 as usize].fixups.push(id);
        id
    }

    pub fn fixup(&self, id: FixupId) -> &Fixup {
        &self.fixups[id.0 as usize]
    }

    /// Labels referenced but never defined by the end of codegen.
    pub fn undefined(&self) -> impl Iterator<Item = &LabelInfo> {
        self.labels.iter().filter(|l| l.address.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::Interner;

    fn dummy_fixup(label: LabelId) -> Fixup {
        Fixup {
            label,
            kind: FixupKind::Relative { bits: 12 },
            instr: NodeId::from_index(0),
            zone: Zone::Text,
            byte_offset: 0,
            site_address: 0,
            mnemonic: Mnemonic::RJMP,
            operands: vec![Operand::Const(0)],
            operand_index: 0,
        }
    }

    #[test]
    fn declare_is_idempotent_by_name() {
        let mut interner = Interner::new();
        let name = interner.intern("loop");
        let mut table = LabelTable::new();
        let a = table.declare(name);
        let b = table.declare(name);
        assert_eq!(a, b);
    }

    #[test]
    fn define_returns_pending_fixups() {
        let mut interner = Interner::new();
        let name = interner.intern("loop");
        let mut table = LabelTable::new();
        let id = table.declare(name);
        let fixup_id = table.add_fixup(dummy_fixup(id));
        let ready = table.define(id, 42);
        assert_eq!(ready, vec![fixup_id]);
        assert_eq!(table.label(id).address, Some(42));
        assert!(table.label(id).fixups.is_empty());
    }

    #[test]
    fn undefined_labels_are_reported() {
        let mut interner = Interner::new();
        let defined = interner.intern("ok");
        let missing = interner.intern("oops");
        let mut table = LabelTable::new();
        let d = table.declare(defined);
        table.declare(missing);
        table.define(d, 0);
        let names: Vec<Sym> = table.undefined().map(|l| l.name).collect();
        assert_eq!(names, vec![missing]);
    }

    #[test]
    fn backward_branch_resolves_to_negative_one() {
        // scenario 5: `1: nop` at address 0, `rjmp 1b` at address 2.
        let mut interner = Interner::new();
        let name = interner.intern("1$0");
        let mut table = LabelTable::new();
        let id = table.declare(name);
        table.define(id, 0);
        let fixup = Fixup {
            site_address: 2,
            ..dummy_fixup(id)
        };
        let encoded = fixup.reencode(table.address_of(id).unwrap()).unwrap();
        assert_eq!(encoded.words, vec![0xCFFF]);
    }
}
