//! Operand shapes accepted by the AVR instruction encoder (§4.9),
//! grounded in `avrinstr.h`'s `avrinstr_mode_e` bitmask and the operand
//! parsing `atmelavr_assemble_instr` does against it.

/// The `X`/`Y`/`Z` index-register forms, with their pre-decrement/
/// post-increment and displacement addressing variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Index {
    X,
    XPostInc,
    XPreDec,
    Y,
    YPostInc,
    YPreDec,
    YDisp(u8),
    Z,
    ZPostInc,
    ZPreDec,
    ZDisp(u8),
}

/// One resolved operand, already typed per the mnemonic's expected
/// `IMODE_*` mask — register number, constant, or indexed-memory form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(u8),
    /// A constant not yet known to be in range; range/shape checking
    /// happens at encode time against the mnemonic's expected width.
    Const(i64),
    Index(Index),
}

impl Operand {
    pub fn reg(self) -> Option<u8> {
        match self {
            Operand::Reg(r) => Some(r),
            _ => None,
        }
    }

    pub fn const_val(self) -> Option<i64> {
        match self {
            Operand::Const(v) => Some(v),
            _ => None,
        }
    }

    pub fn index(self) -> Option<Index> {
        match self {
            Operand::Index(i) => Some(i),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Mirrors `avrinstr_mode_e`: which operand shapes a mnemonic's
    /// argument slot accepts.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Mode: u16 {
        const REG        = 0x0001;
        const CONST8     = 0x0002;
        const CONST3     = 0x0004;
        const CONSTCODE  = 0x0008;
        const CONSTMEM   = 0x0010;
        const CONSTIO    = 0x0020;
        const INCDEC     = 0x0040;
        const XYZ        = 0x0080;
    }
}
