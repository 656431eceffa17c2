//! The AVR MCU descriptor table (§4.8-4.10), transcribed from
//! `avrasm_program.c`'s `avrasm_ttable`: the four targets the original
//! ships, including the `bswap_code` column the retrieved `avrinstr.h`
//! in the pack omits (a pack-truncation artifact — the back-end reads
//! it, so this crate declares it explicitly, see DESIGN.md).

use serde::Deserialize;

/// One of the four MCUs this assembler knows how to target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum Mcu {
    At90s1200,
    Atmega328,
    Atmega1280,
    Atmega2560,
}

/// A target's memory map and code-generation quirks.
#[derive(Clone, Copy, Debug)]
pub struct McuInfo {
    pub mcu: Mcu,
    pub name: &'static str,
    /// Number of interrupt vectors expected at the start of `.text`.
    pub intr_count: u32,
    /// Size in bytes of a single interrupt vector slot (2 or 4).
    pub intr_size: u32,
    /// Flash (code) size in bytes.
    pub code_size: u32,
    /// Start address of SRAM in data space.
    pub ram_start: u32,
    /// SRAM size in bytes.
    pub ram_size: u32,
    /// Size of the I/O address space (in addresses, not bytes).
    pub io_size: u32,
    /// EEPROM size in bytes.
    pub eeprom_size: u32,
    /// Whether multi-byte code-segment constants/instructions with a
    /// >16-bit encoding get their two 16-bit halves independently
    /// byte-swapped on emission (the AT90S1200 never needs this — it
    /// has no JMP/CALL/LDS/STS wide forms to begin with).
    pub bswap_code: bool,
}

pub const AT90S1200: McuInfo = McuInfo {
    mcu: Mcu::At90s1200,
    name: "AT90S1200",
    intr_count: 3,
    intr_size: 1,
    code_size: 1024,
    ram_start: 0,
    ram_size: 0,
    io_size: 64,
    eeprom_size: 64,
    bswap_code: false,
};

pub const ATMEGA328: McuInfo = McuInfo {
    mcu: Mcu::Atmega328,
    name: "ATMEGA328",
    intr_count: 26,
    intr_size: 2,
    code_size: 32768,
    ram_start: 0x100,
    ram_size: 2048,
    io_size: 224,
    eeprom_size: 1024,
    bswap_code: true,
};

pub const ATMEGA1280: McuInfo = McuInfo {
    mcu: Mcu::Atmega1280,
    name: "ATMEGA1280",
    intr_count: 57,
    intr_size: 2,
    code_size: 131072,
    ram_start: 0x200,
    ram_size: 8192,
    io_size: 224,
    eeprom_size: 4096,
    bswap_code: true,
};

pub const ATMEGA2560: McuInfo = McuInfo {
    mcu: Mcu::Atmega2560,
    name: "ATMEGA2560",
    intr_count: 57,
    intr_size: 2,
    code_size: 262144,
    ram_start: 0x200,
    ram_size: 8192,
    io_size: 224,
    eeprom_size: 4096,
    bswap_code: true,
};

pub const ALL: [McuInfo; 4] = [AT90S1200, ATMEGA328, ATMEGA1280, ATMEGA2560];

/// The MCU used if a project names none and `--target` isn't given
/// (scenario 6, §8): ATMEGA328, with a warning the caller is expected
/// to raise.
pub const DEFAULT: McuInfo = ATMEGA328;

/// Case-insensitive lookup by name, as it appears in `.mcu "NAME"`.
pub fn by_name(name: &str) -> Option<McuInfo> {
    ALL.into_iter().find(|m| m.name.eq_ignore_ascii_case(name))
}
