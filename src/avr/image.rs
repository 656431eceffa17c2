//! The assembled output image (§4.8): one byte buffer per segment
//! kind, addressed ranges tracked for overlap checking, matching
//! `img_check_ranges`/`img_combine_ranges` in the original back-end.

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// A back-end segment kind. `Data` is reservation-only — labels and
/// `.space` advance its cursor but nothing is ever written there,
/// matching `atmelavr_be_do_codegen`'s refusal to emit bytes into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    Text,
    Data,
    Eeprom,
}

/// One contiguous written region: `[start, start + bytes.len())`.
#[derive(Clone, Debug)]
pub struct Range {
    pub start: u32,
    pub bytes: Vec<u8>,
}

impl Range {
    pub fn end(&self) -> u32 {
        self.start + self.bytes.len() as u32
    }
}

/// One segment's collected output: a cursor (for `.org`/`.space`) and
/// the list of byte ranges written so far.
#[derive(Default)]
pub struct Segment {
    pub cursor: u32,
    pub ranges: Vec<Range>,
}

impl Segment {
    pub fn org(&mut self, address: u32) {
        self.cursor = address;
    }

    pub fn space(&mut self, count: u32) {
        self.cursor += count;
    }

    /// Write `bytes` at the current cursor, opening a new range or
    /// extending the current one if contiguous.
    pub fn write(&mut self, bytes: &[u8]) {
        if let Some(last) = self.ranges.last_mut() {
            if last.end() == self.cursor {
                last.bytes.extend_from_slice(bytes);
                self.cursor += bytes.len() as u32;
                return;
            }
        }
        self.ranges.push(Range { start: self.cursor, bytes: bytes.to_vec() });
        self.cursor += bytes.len() as u32;
    }

    /// Overwrite bytes already written at `address`, used to patch in
    /// a fixup's final encoding once its label resolves. The range
    /// covering `address` must already exist and be long enough.
    pub fn patch(&mut self, address: u32, bytes: &[u8]) {
        let range = self
            .ranges
            .iter_mut()
            .find(|r| r.start <= address && address + bytes.len() as u32 <= r.end())
            .expect("patch address not covered by any written range");
        let offset = (address - range.start) as usize;
        range.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Sort ranges by start address and check none overlap, matching
    /// `img_check_ranges`.
    pub fn check_ranges(&mut self) -> Result<(), Diagnostic> {
        self.ranges.sort_by_key(|r| r.start);
        for pair in self.ranges.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.end() > b.start {
                return Err(Diagnostic::error(
                    format!(
                        "overlapping output ranges: [{:#x}, {:#x}) and [{:#x}, {:#x})",
                        a.start, a.end(), b.start, b.end()
                    ),
                    Span::dummy(),
                ));
            }
        }
        Ok(())
    }
}

/// The full assembled image: one segment per zone.
#[derive(Default)]
pub struct Image {
    pub text: Segment,
    pub data: Segment,
    pub eeprom: Segment,
}

impl Image {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment_mut(&mut self, zone: Zone) -> &mut Segment {
        match zone {
            Zone::Text => &mut self.text,
            Zone::Data => &mut self.data,
            Zone::Eeprom => &mut self.eeprom,
        }
    }

    pub fn segment(&self, zone: Zone) -> &Segment {
        match zone {
            Zone::Text => &self.text,
            Zone::Data => &self.data,
            Zone::Eeprom => &self.eeprom,
        }
    }

    pub fn check_all_ranges(&mut self) -> Result<(), Diagnostic> {
        self.text.check_ranges()?;
        self.data.check_ranges()?;
        self.eeprom.check_ranges()?;
        Ok(())
    }
}
