//! The AVR instruction encoder (§4.9), transcribed instruction-by-
//! instruction from `atmelavr_assemble_instr`'s bit-level encodings.
//! `Mnemonic::ESPM` is omitted — the original guards it with `#if 0`
//! too (see DESIGN.md).

use super::operand::{Index, Mode, Operand};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Mnemonic {
    ADD, ADC, ADIW, SUB, SUBI, SBC, SBCI, SBIW, AND, ANDI, OR, ORI, EOR, COM, NEG,
    SBR, CBR, INC, DEC, TST, CLR, SER, MUL, MULS, MULSU, FMUL, FMULS, FMULSU,
    RJMP, IJMP, EIJMP, JMP, RCALL, ICALL, EICALL, CALL, RET, RETI, CPSE, CP, CPC,
    CPI, SBRC, SBRS, SBIC, SBIS, BRBS, BRBC, BREQ, BRNE, BRCS, BRCC, BRSH, BRLO,
    BRMI, BRPL, BRGE, BRLT, BRHS, BRHC, BRTS, BRTC, BRVS, BRVC, BRIE, BRID,
    MOV, MOVW, LDI, LDS, LD, LDD, STS, ST, STD, LPM, ELPM, SPM, IN, OUT, PUSH, POP,
    LSL, LSR, ROL, ROR, ASR, SWAP, BSET, BCLR, SBI, CBI, BST, BLD,
    SEC, CLC, SEN, CLN, SEZ, CLZ, SEI, CLI, SES, CLS, SEV, CLV, SET, CLT, SEH, CLH,
    BREAK, NOP, SLEEP, WDR,
}

/// A fully-resolved, range-checked encode failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    OutOfRange { mnemonic: Mnemonic, min: i64, max: i64, got: i64 },
    InvalidRegister { mnemonic: Mnemonic, got: u8 },
    WrongOperandCount { mnemonic: Mnemonic, expected: usize, got: usize },
    WrongOperandKind { mnemonic: Mnemonic, index: usize },
}

fn reg(mnemonic: Mnemonic, op: Operand) -> Result<u8, EncodeError> {
    match op.reg() {
        Some(r) if r < 32 => Ok(r),
        Some(r) => Err(EncodeError::InvalidRegister { mnemonic, got: r }),
        None => Err(EncodeError::WrongOperandKind { mnemonic, index: 0 }),
    }
}

fn reg_in(mnemonic: Mnemonic, op: Operand, lo: u8, hi: u8) -> Result<u8, EncodeError> {
    let r = reg(mnemonic, op)?;
    if r < lo || r > hi {
        return Err(EncodeError::InvalidRegister { mnemonic, got: r });
    }
    Ok(r)
}

fn range(mnemonic: Mnemonic, v: i64, min: i64, max: i64) -> Result<i64, EncodeError> {
    if v < min || v > max {
        return Err(EncodeError::OutOfRange { mnemonic, min, max, got: v });
    }
    Ok(v)
}

fn rd_rr(base: u16, d: u8, r: u8) -> u16 {
    base | (((r >> 4) & 1) as u16) << 9
        | (((d >> 4) & 1) as u16) << 8
        | ((d & 0xF) as u16) << 4
        | (r & 0xF) as u16
}

fn d16_k(base: u16, d: u8, k: u8) -> u16 {
    base | (((k >> 4) & 0xF) as u16) << 8 | (((d - 16) & 0xF) as u16) << 4 | (k & 0xF) as u16
}

fn d_only(base_full: u16, d: u8) -> u16 {
    base_full | (((d >> 4) & 1) as u16) << 8 | ((d & 0xF) as u16) << 4
}

fn d16_only(base: u16, d: u8) -> u16 {
    base | (((d - 16) & 0xF) as u16) << 4
}

fn dd_k(base: u16, d: u8, k: u8) -> u16 {
    let dd = ((d - 24) / 2) & 0x3;
    base | (((k >> 4) & 0x3) as u16) << 6 | (dd as u16) << 4 | (k & 0xF) as u16
}

fn r_bit(base: u16, r: u8, b: u8) -> u16 {
    base | (((r >> 4) & 1) as u16) << 8 | ((r & 0xF) as u16) << 4 | (b & 7) as u16
}

fn io_bit(base: u16, a: u8, b: u8) -> u16 {
    base | ((a & 0x1F) as u16) << 3 | (b & 7) as u16
}

fn branch(base: u16, s: u8, k: i8) -> u16 {
    base | (((k as u16) & 0x7F) << 3) | (s & 7) as u16
}

fn ldd_std(is_store: bool, is_y: bool, reg: u8, q: u8) -> u16 {
    let mut w: u16 = 0x8000;
    w |= ((q as u16 >> 5) & 1) << 13;
    w |= (((q as u16) >> 3) & 3) << 10;
    if is_store {
        w |= 1 << 9;
    }
    w |= (((reg >> 4) & 1) as u16) << 8;
    w |= ((reg & 0xF) as u16) << 4;
    if is_y {
        w |= 1 << 3;
    }
    w |= (q as u16) & 7;
    w
}

fn io_addr(mnemonic: Mnemonic, op: Operand) -> Result<u8, EncodeError> {
    match op.const_val() {
        Some(v) => range(mnemonic, v, 0, 63).map(|v| v as u8),
        None => Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }),
    }
}

fn bit_index(mnemonic: Mnemonic, op: Operand) -> Result<u8, EncodeError> {
    match op.const_val() {
        Some(v) => range(mnemonic, v, 0, 7).map(|v| v as u8),
        None => Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }),
    }
}

fn const8(mnemonic: Mnemonic, op: Operand) -> Result<u8, EncodeError> {
    match op.const_val() {
        Some(v) => range(mnemonic, v, -128, 255).map(|v| (v & 0xFF) as u8),
        None => Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }),
    }
}

/// `cbr`'s immediate complement is masked to 4+4 bits explicitly rather
/// than relying on implicit 8-bit wraparound (resolved Open Question).
fn cbr_complement(v: i64) -> u8 {
    let lo = (!(v as u8)) & 0x0F;
    let hi = ((!(v as u8)) >> 4) & 0x0F;
    (hi << 4) | lo
}

/// The result of encoding one instruction: one or two 16-bit words,
/// plus whether this is a "wide" (4-byte) encoding eligible for the
/// per-half byte swap on `bswap_code` targets (§4.10).
pub struct Encoded {
    pub words: Vec<u16>,
    pub wide: bool,
}

impl Encoded {
    fn narrow(w: u16) -> Self {
        Encoded { words: vec![w], wide: false }
    }
    fn wide(w0: u16, w1: u16) -> Self {
        Encoded { words: vec![w0, w1], wide: true }
    }
}

/// Encode `mnemonic` against its already-resolved operands. Branch and
/// jump targets are passed as already-computed relative/absolute
/// values (pc-relative word offsets for relative forms, word addresses
/// for `JMP`/`CALL`) — resolving a label to one of these is
/// `avr::label`'s job, called before this function.
pub fn encode(mnemonic: Mnemonic, operands: &[Operand]) -> Result<Encoded, EncodeError> {
    use Mnemonic::*;
    let arity = |n: usize| -> Result<(), EncodeError> {
        if operands.len() != n {
            return Err(EncodeError::WrongOperandCount { mnemonic, expected: n, got: operands.len() });
        }
        Ok(())
    };

    match mnemonic {
        ADD => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x0C00, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        ADC => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x1C00, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        SUB => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x1800, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        SBC => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x0800, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        AND => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x2000, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        OR => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x2800, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        EOR => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x2400, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        CPSE => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x1000, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        CP => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x1400, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        CPC => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x0400, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        MOV => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x2C00, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }
        MUL => { arity(2)?; Ok(Encoded::narrow(rd_rr(0x9C00, reg(mnemonic, operands[0])?, reg(mnemonic, operands[1])?))) }

        TST => { arity(1)?; let d = reg(mnemonic, operands[0])?; Ok(Encoded::narrow(rd_rr(0x2000, d, d))) }
        CLR => { arity(1)?; let d = reg(mnemonic, operands[0])?; Ok(Encoded::narrow(rd_rr(0x2400, d, d))) }
        LSL => { arity(1)?; let d = reg(mnemonic, operands[0])?; Ok(Encoded::narrow(rd_rr(0x0C00, d, d))) }
        ROL => { arity(1)?; let d = reg(mnemonic, operands[0])?; Ok(Encoded::narrow(rd_rr(0x1C00, d, d))) }

        SUBI => { arity(2)?; Ok(Encoded::narrow(d16_k(0x5000, reg_in(mnemonic, operands[0], 16, 31)?, const8(mnemonic, operands[1])?))) }
        SBCI => { arity(2)?; Ok(Encoded::narrow(d16_k(0x4000, reg_in(mnemonic, operands[0], 16, 31)?, const8(mnemonic, operands[1])?))) }
        ANDI => { arity(2)?; Ok(Encoded::narrow(d16_k(0x7000, reg_in(mnemonic, operands[0], 16, 31)?, const8(mnemonic, operands[1])?))) }
        ORI | SBR => { arity(2)?; Ok(Encoded::narrow(d16_k(0x6000, reg_in(mnemonic, operands[0], 16, 31)?, const8(mnemonic, operands[1])?))) }
        CPI => { arity(2)?; Ok(Encoded::narrow(d16_k(0x3000, reg_in(mnemonic, operands[0], 16, 31)?, const8(mnemonic, operands[1])?))) }
        LDI => { arity(2)?; Ok(Encoded::narrow(d16_k(0xE000, reg_in(mnemonic, operands[0], 16, 31)?, const8(mnemonic, operands[1])?))) }
        CBR => {
            arity(2)?;
            let d = reg_in(mnemonic, operands[0], 16, 31)?;
            let k = operands[1].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 1 })?;
            range(mnemonic, k, 0, 255)?;
            Ok(Encoded::narrow(d16_k(0x7000, d, cbr_complement(k))))
        }

        COM => { arity(1)?; Ok(Encoded::narrow(d_only(0x9400, reg(mnemonic, operands[0])?))) }
        NEG => { arity(1)?; Ok(Encoded::narrow(d_only(0x9401, reg(mnemonic, operands[0])?))) }
        SWAP => { arity(1)?; Ok(Encoded::narrow(d_only(0x9402, reg(mnemonic, operands[0])?))) }
        INC => { arity(1)?; Ok(Encoded::narrow(d_only(0x9403, reg(mnemonic, operands[0])?))) }
        ASR => { arity(1)?; Ok(Encoded::narrow(d_only(0x9405, reg(mnemonic, operands[0])?))) }
        LSR => { arity(1)?; Ok(Encoded::narrow(d_only(0x9406, reg(mnemonic, operands[0])?))) }
        ROR => { arity(1)?; Ok(Encoded::narrow(d_only(0x9407, reg(mnemonic, operands[0])?))) }
        DEC => { arity(1)?; Ok(Encoded::narrow(d_only(0x940A, reg(mnemonic, operands[0])?))) }
        POP => { arity(1)?; Ok(Encoded::narrow(d_only(0x900F, reg(mnemonic, operands[0])?))) }
        PUSH => { arity(1)?; Ok(Encoded::narrow(d_only(0x920F, reg(mnemonic, operands[0])?))) }

        SER => { arity(1)?; Ok(Encoded::narrow(d16_only(0xEF0F, reg_in(mnemonic, operands[0], 16, 31)?))) }

        ADIW => { arity(2)?; let d = reg(mnemonic, operands[0])?; let k = operands[1].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 1 })?; range(mnemonic, k, 0, 63)?; Ok(Encoded::narrow(dd_k(0x9600, d, k as u8))) }
        SBIW => { arity(2)?; let d = reg(mnemonic, operands[0])?; let k = operands[1].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 1 })?; range(mnemonic, k, 0, 63)?; Ok(Encoded::narrow(dd_k(0x9700, d, k as u8))) }

        MOVW => { arity(2)?; let d = reg(mnemonic, operands[0])?; let r = reg(mnemonic, operands[1])?; Ok(Encoded::narrow(0x0100 | ((d / 2) as u16) << 4 | (r / 2) as u16)) }
        MULS => { arity(2)?; let d = reg_in(mnemonic, operands[0], 16, 31)?; let r = reg_in(mnemonic, operands[1], 16, 31)?; Ok(Encoded::narrow(0x0200 | ((d - 16) as u16) << 4 | (r - 16) as u16)) }
        MULSU => { arity(2)?; let d = reg_in(mnemonic, operands[0], 16, 23)?; let r = reg_in(mnemonic, operands[1], 16, 23)?; Ok(Encoded::narrow(0x0300 | (((d - 16) & 7) as u16) << 4 | ((r - 16) & 7) as u16)) }
        FMUL => { arity(2)?; let d = reg_in(mnemonic, operands[0], 16, 23)?; let r = reg_in(mnemonic, operands[1], 16, 23)?; Ok(Encoded::narrow(0x0308 | (((d - 16) & 7) as u16) << 4 | ((r - 16) & 7) as u16)) }
        FMULS => { arity(2)?; let d = reg_in(mnemonic, operands[0], 16, 23)?; let r = reg_in(mnemonic, operands[1], 16, 23)?; Ok(Encoded::narrow(0x0380 | (((d - 16) & 7) as u16) << 4 | ((r - 16) & 7) as u16)) }
        FMULSU => { arity(2)?; let d = reg_in(mnemonic, operands[0], 16, 23)?; let r = reg_in(mnemonic, operands[1], 16, 23)?; Ok(Encoded::narrow(0x0388 | (((d - 16) & 7) as u16) << 4 | ((r - 16) & 7) as u16)) }

        RJMP | RCALL => {
            arity(1)?;
            let k = operands[0].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 0 })?;
            range(mnemonic, k, -2048, 2047)?;
            let base = if mnemonic == RJMP { 0xC000 } else { 0xD000 };
            Ok(Encoded::narrow(base | (k as u16 & 0x0FFF)))
        }
        IJMP => { arity(0)?; Ok(Encoded::narrow(0x9409)) }
        EIJMP => { arity(0)?; Ok(Encoded::narrow(0x9419)) }
        ICALL => { arity(0)?; Ok(Encoded::narrow(0x9509)) }
        EICALL => { arity(0)?; Ok(Encoded::narrow(0x9519)) }
        RET => { arity(0)?; Ok(Encoded::narrow(0x9508)) }
        RETI => { arity(0)?; Ok(Encoded::narrow(0x9518)) }
        JMP | CALL => {
            arity(1)?;
            let k = operands[0].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 0 })?;
            range(mnemonic, k, 0, 0x3F_FFFF)?;
            let k = k as u32;
            let top6 = ((k >> 16) & 0x3F) as u16;
            let w0base = if mnemonic == JMP { 0x940C } else { 0x940E };
            let w0 = w0base | ((top6 >> 1) & 0x1F) << 4 | (top6 & 1);
            Ok(Encoded::wide(w0, (k & 0xFFFF) as u16))
        }

        SBRC => { arity(2)?; Ok(Encoded::narrow(r_bit(0xFC00, reg(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }
        SBRS => { arity(2)?; Ok(Encoded::narrow(r_bit(0xFE00, reg(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }
        BST => { arity(2)?; Ok(Encoded::narrow(r_bit(0xFA00, reg(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }
        BLD => { arity(2)?; Ok(Encoded::narrow(r_bit(0xF800, reg(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }

        SBIC => { arity(2)?; Ok(Encoded::narrow(io_bit(0x9900, io_addr(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }
        SBIS => { arity(2)?; Ok(Encoded::narrow(io_bit(0x9B00, io_addr(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }
        SBI => { arity(2)?; Ok(Encoded::narrow(io_bit(0x9A00, io_addr(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }
        CBI => { arity(2)?; Ok(Encoded::narrow(io_bit(0x9800, io_addr(mnemonic, operands[0])?, bit_index(mnemonic, operands[1])?))) }

        BRBS | BRBC => {
            arity(2)?;
            let s = bit_index(mnemonic, operands[0])?;
            let k = operands[1].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 1 })?;
            range(mnemonic, k, -64, 63)?;
            let base = if mnemonic == BRBS { 0xF000 } else { 0xF400 };
            Ok(Encoded::narrow(branch(base, s, k as i8)))
        }
        BREQ | BRNE | BRCS | BRCC | BRSH | BRLO | BRMI | BRPL | BRGE | BRLT | BRHS | BRHC
        | BRTS | BRTC | BRVS | BRVC | BRIE | BRID => {
            arity(1)?;
            let k = operands[0].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 0 })?;
            range(mnemonic, k, -64, 63)?;
            let (set, s) = branch_flag(mnemonic);
            let base = if set { 0xF000 } else { 0xF400 };
            Ok(Encoded::narrow(branch(base, s, k as i8)))
        }

        LDS => {
            arity(2)?;
            let d = reg(mnemonic, operands[0])?;
            let k = operands[1].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 1 })?;
            range(mnemonic, k, 0, 0xFFFF)?;
            Ok(Encoded::wide(d_only(0x9000, d), k as u16))
        }
        STS => {
            arity(2)?;
            let k = operands[0].const_val().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 0 })?;
            range(mnemonic, k, 0, 0xFFFF)?;
            let r = reg(mnemonic, operands[1])?;
            Ok(Encoded::wide(d_only(0x9200, r), k as u16))
        }

        LD => {
            arity(2)?;
            let d = reg(mnemonic, operands[0])?;
            let idx = operands[1].index().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 1 })?;
            let w = match idx {
                Index::X => 0x900C, Index::XPostInc => 0x900D, Index::XPreDec => 0x900E,
                Index::Y => 0x8008, Index::YPostInc => 0x9009, Index::YPreDec => 0x900A,
                Index::Z => 0x8000, Index::ZPostInc => 0x9001, Index::ZPreDec => 0x9002,
                Index::YDisp(_) | Index::ZDisp(_) => 0,
            };
            if let Index::YDisp(q) | Index::ZDisp(q) = idx {
                return Ok(Encoded::narrow(ldd_std(false, matches!(idx, Index::YDisp(_)), d, q)));
            }
            Ok(Encoded::narrow(d_only(w, d)))
        }
        LDD => {
            arity(2)?;
            let d = reg(mnemonic, operands[0])?;
            match operands[1].index() {
                Some(Index::YDisp(q)) => Ok(Encoded::narrow(ldd_std(false, true, d, q))),
                Some(Index::ZDisp(q)) => Ok(Encoded::narrow(ldd_std(false, false, d, q))),
                _ => Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }),
            }
        }
        ST => {
            arity(2)?;
            let idx = operands[0].index().ok_or(EncodeError::WrongOperandKind { mnemonic, index: 0 })?;
            let r = reg(mnemonic, operands[1])?;
            if let Index::YDisp(q) = idx {
                return Ok(Encoded::narrow(ldd_std(true, true, r, q)));
            }
            if let Index::ZDisp(q) = idx {
                return Ok(Encoded::narrow(ldd_std(true, false, r, q)));
            }
            let w = match idx {
                Index::X => 0x920C, Index::XPostInc => 0x920D, Index::XPreDec => 0x920E,
                Index::Y => 0x8208, Index::YPostInc => 0x9209, Index::YPreDec => 0x920A,
                Index::Z => 0x8200, Index::ZPostInc => 0x9201, Index::ZPreDec => 0x9202,
                Index::YDisp(_) | Index::ZDisp(_) => unreachable!(),
            };
            Ok(Encoded::narrow(d_only(w, r)))
        }
        STD => {
            arity(2)?;
            let r = reg(mnemonic, operands[1])?;
            match operands[0].index() {
                Some(Index::YDisp(q)) => Ok(Encoded::narrow(ldd_std(true, true, r, q))),
                Some(Index::ZDisp(q)) => Ok(Encoded::narrow(ldd_std(true, false, r, q))),
                _ => Err(EncodeError::WrongOperandKind { mnemonic, index: 0 }),
            }
        }

        LPM => {
            if operands.is_empty() {
                return Ok(Encoded::narrow(0x95C8));
            }
            arity(2)?;
            let d = reg(mnemonic, operands[0])?;
            match operands[1].index() {
                Some(Index::Z) => Ok(Encoded::narrow(d_only(0x9004, d))),
                Some(Index::ZPostInc) => Ok(Encoded::narrow(d_only(0x9005, d))),
                _ => Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }),
            }
        }
        ELPM => {
            if operands.is_empty() {
                return Ok(Encoded::narrow(0x95D8));
            }
            arity(2)?;
            let d = reg(mnemonic, operands[0])?;
            match operands[1].index() {
                Some(Index::Z) => Ok(Encoded::narrow(d_only(0x9006, d))),
                Some(Index::ZPostInc) => Ok(Encoded::narrow(d_only(0x9007, d))),
                _ => Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }),
            }
        }
        SPM => { arity(0)?; Ok(Encoded::narrow(0x95E8)) }

        IN => {
            arity(2)?;
            let d = reg(mnemonic, operands[0])?;
            let a = match operands[1].const_val() { Some(v) => range(mnemonic, v, 0, 63)? as u8, None => return Err(EncodeError::WrongOperandKind { mnemonic, index: 1 }) };
            Ok(Encoded::narrow(0xB000 | (((a >> 4) & 3) as u16) << 9 | (((d >> 4) & 1) as u16) << 8 | ((d & 0xF) as u16) << 4 | (a & 0xF) as u16))
        }
        OUT => {
            arity(2)?;
            let a = match operands[0].const_val() { Some(v) => range(mnemonic, v, 0, 63)? as u8, None => return Err(EncodeError::WrongOperandKind { mnemonic, index: 0 }) };
            let r = reg(mnemonic, operands[1])?;
            Ok(Encoded::narrow(0xB800 | (((a >> 4) & 3) as u16) << 9 | (((r >> 4) & 1) as u16) << 8 | ((r & 0xF) as u16) << 4 | (a & 0xF) as u16))
        }

        BSET => { arity(1)?; Ok(Encoded::narrow(0x9408 | (bit_index(mnemonic, operands[0])? as u16) << 4)) }
        BCLR => { arity(1)?; Ok(Encoded::narrow(0x9488 | (bit_index(mnemonic, operands[0])? as u16) << 4)) }
        SEC => { arity(0)?; Ok(Encoded::narrow(0x9408)) }
        CLC => { arity(0)?; Ok(Encoded::narrow(0x9488)) }
        SEZ => { arity(0)?; Ok(Encoded::narrow(0x9418)) }
        CLZ => { arity(0)?; Ok(Encoded::narrow(0x9498)) }
        SEN => { arity(0)?; Ok(Encoded::narrow(0x9428)) }
        CLN => { arity(0)?; Ok(Encoded::narrow(0x94A8)) }
        SEV => { arity(0)?; Ok(Encoded::narrow(0x9438)) }
        CLV => { arity(0)?; Ok(Encoded::narrow(0x94B8)) }
        SES => { arity(0)?; Ok(Encoded::narrow(0x9448)) }
        CLS => { arity(0)?; Ok(Encoded::narrow(0x94C8)) }
        SEH => { arity(0)?; Ok(Encoded::narrow(0x9458)) }
        CLH => { arity(0)?; Ok(Encoded::narrow(0x94D8)) }
        SET => { arity(0)?; Ok(Encoded::narrow(0x9468)) }
        CLT => { arity(0)?; Ok(Encoded::narrow(0x94E8)) }
        SEI => { arity(0)?; Ok(Encoded::narrow(0x9478)) }
        CLI => { arity(0)?; Ok(Encoded::narrow(0x94F8)) }

        BREAK => { arity(0)?; Ok(Encoded::narrow(0x9598)) }
        NOP => { arity(0)?; Ok(Encoded::narrow(0x0000)) }
        SLEEP => { arity(0)?; Ok(Encoded::narrow(0x9588)) }
        WDR => { arity(0)?; Ok(Encoded::narrow(0x95A8)) }
    }
}

/// `BRxx` conditional branches are `BRBS`/`BRBC` with a fixed flag bit
/// (`set` selects `BRBS` vs `BRBC`). Flag bit order: C=0 Z=1 N=2 V=3
/// S=4 H=5 T=6 I=7.
fn branch_flag(mnemonic: Mnemonic) -> (bool, u8) {
    use Mnemonic::*;
    match mnemonic {
        BREQ => (true, 1), BRNE => (false, 1),
        BRCS | BRLO => (true, 0), BRCC | BRSH => (false, 0),
        BRMI => (true, 2), BRPL => (false, 2),
        BRVS => (true, 3), BRVC => (false, 3),
        BRLT => (true, 4), BRGE => (false, 4),
        BRHS => (true, 5), BRHC => (false, 5),
        BRTS => (true, 6), BRTC => (false, 6),
        BRIE => (true, 7), BRID => (false, 7),
        _ => unreachable!("branch_flag called on non-conditional-branch mnemonic"),
    }
}

/// Every mnemonic this assembler recognizes, in declaration order —
/// the lexer and grammar use this to build their keyword/dispatch
/// tables rather than hard-coding the list a second time.
pub const ALL: [Mnemonic; 114] = [
    Mnemonic::ADD, Mnemonic::ADC, Mnemonic::ADIW, Mnemonic::SUB, Mnemonic::SUBI,
    Mnemonic::SBC, Mnemonic::SBCI, Mnemonic::SBIW, Mnemonic::AND, Mnemonic::ANDI,
    Mnemonic::OR, Mnemonic::ORI, Mnemonic::EOR, Mnemonic::COM, Mnemonic::NEG,
    Mnemonic::SBR, Mnemonic::CBR, Mnemonic::INC, Mnemonic::DEC, Mnemonic::TST,
    Mnemonic::CLR, Mnemonic::SER, Mnemonic::MUL, Mnemonic::MULS, Mnemonic::MULSU,
    Mnemonic::FMUL, Mnemonic::FMULS, Mnemonic::FMULSU,
    Mnemonic::RJMP, Mnemonic::IJMP, Mnemonic::EIJMP, Mnemonic::JMP, Mnemonic::RCALL,
    Mnemonic::ICALL, Mnemonic::EICALL, Mnemonic::CALL, Mnemonic::RET, Mnemonic::RETI,
    Mnemonic::CPSE, Mnemonic::CP, Mnemonic::CPC, Mnemonic::CPI,
    Mnemonic::SBRC, Mnemonic::SBRS, Mnemonic::SBIC, Mnemonic::SBIS,
    Mnemonic::BRBS, Mnemonic::BRBC, Mnemonic::BREQ, Mnemonic::BRNE, Mnemonic::BRCS,
    Mnemonic::BRCC, Mnemonic::BRSH, Mnemonic::BRLO, Mnemonic::BRMI, Mnemonic::BRPL,
    Mnemonic::BRGE, Mnemonic::BRLT, Mnemonic::BRHS, Mnemonic::BRHC, Mnemonic::BRTS,
    Mnemonic::BRTC, Mnemonic::BRVS, Mnemonic::BRVC, Mnemonic::BRIE, Mnemonic::BRID,
    Mnemonic::MOV, Mnemonic::MOVW, Mnemonic::LDI, Mnemonic::LDS, Mnemonic::LD,
    Mnemonic::LDD, Mnemonic::STS, Mnemonic::ST, Mnemonic::STD, Mnemonic::LPM,
    Mnemonic::ELPM, Mnemonic::SPM, Mnemonic::IN, Mnemonic::OUT, Mnemonic::PUSH,
    Mnemonic::POP, Mnemonic::LSL, Mnemonic::LSR, Mnemonic::ROL, Mnemonic::ROR,
    Mnemonic::ASR, Mnemonic::SWAP, Mnemonic::BSET, Mnemonic::BCLR, Mnemonic::SBI,
    Mnemonic::CBI, Mnemonic::BST, Mnemonic::BLD,
    Mnemonic::SEC, Mnemonic::CLC, Mnemonic::SEN, Mnemonic::CLN, Mnemonic::SEZ,
    Mnemonic::CLZ, Mnemonic::SEI, Mnemonic::CLI, Mnemonic::SES, Mnemonic::CLS,
    Mnemonic::SEV, Mnemonic::CLV, Mnemonic::SET, Mnemonic::CLT, Mnemonic::SEH,
    Mnemonic::CLH, Mnemonic::BREAK, Mnemonic::NOP, Mnemonic::SLEEP, Mnemonic::WDR,
];

/// Case-insensitive lookup of a mnemonic by its source spelling.
pub fn by_name(name: &str) -> Option<Mnemonic> {
    ALL.into_iter().find(|&m| mnemonic_name(m).eq_ignore_ascii_case(name))
}

/// Every mnemonic's name, as it appears in source text (lowercase).
pub fn mnemonic_name(m: Mnemonic) -> &'static str {
    use Mnemonic::*;
    match m {
        ADD => "add", ADC => "adc", ADIW => "adiw", SUB => "sub", SUBI => "subi",
        SBC => "sbc", SBCI => "sbci", SBIW => "sbiw", AND => "and", ANDI => "andi",
        OR => "or", ORI => "ori", EOR => "eor", COM => "com", NEG => "neg",
        SBR => "sbr", CBR => "cbr", INC => "inc", DEC => "dec", TST => "tst",
        CLR => "clr", SER => "ser", MUL => "mul", MULS => "muls", MULSU => "mulsu",
        FMUL => "fmul", FMULS => "fmuls", FMULSU => "fmulsu",
        RJMP => "rjmp", IJMP => "ijmp", EIJMP => "eijmp", JMP => "jmp",
        RCALL => "rcall", ICALL => "icall", EICALL => "eicall", CALL => "call",
        RET => "ret", RETI => "reti", CPSE => "cpse", CP => "cp", CPC => "cpc",
        CPI => "cpi", SBRC => "sbrc", SBRS => "sbrs", SBIC => "sbic", SBIS => "sbis",
        BRBS => "brbs", BRBC => "brbc", BREQ => "breq", BRNE => "brne", BRCS => "brcs",
        BRCC => "brcc", BRSH => "brsh", BRLO => "brlo", BRMI => "brmi", BRPL => "brpl",
        BRGE => "brge", BRLT => "brlt", BRHS => "brhs", BRHC => "brhc", BRTS => "brts",
        BRTC => "brtc", BRVS => "brvs", BRVC => "brvc", BRIE => "brie", BRID => "brid",
        MOV => "mov", MOVW => "movw", LDI => "ldi", LDS => "lds", LD => "ld",
        LDD => "ldd", STS => "sts", ST => "st", STD => "std", LPM => "lpm",
        ELPM => "elpm", SPM => "spm", IN => "in", OUT => "out", PUSH => "push",
        POP => "pop", LSL => "lsl", LSR => "lsr", ROL => "rol", ROR => "ror",
        ASR => "asr", SWAP => "swap", BSET => "bset", BCLR => "bclr", SBI => "sbi",
        CBI => "cbi", BST => "bst", BLD => "bld", SEC => "sec", CLC => "clc",
        SEN => "sen", CLN => "cln", SEZ => "sez", CLZ => "clz", SEI => "sei",
        CLI => "cli", SES => "ses", CLS => "cls", SEV => "sev", CLV => "clv",
        SET => "set", CLT => "clt", SEH => "seh", CLH => "clh", BREAK => "break",
        NOP => "nop", SLEEP => "sleep", WDR => "wdr",
    }
}

pub fn mode_mask(m: Mnemonic) -> (Mode, Mode) {
    use Mnemonic::*;
    let r = Mode::REG;
    let c8 = Mode::CONST8;
    let c3 = Mode::CONST3;
    let none = Mode::empty();
    match m {
        ADD | ADC | SUB | SBC | AND | OR | EOR | CPSE | CP | CPC | MOV | MUL | MOVW | MULS
        | MULSU | FMUL | FMULS | FMULSU => (r, r),
        SUBI | SBCI | ANDI | ORI | SBR | CPI | LDI | CBR => (r, c8),
        ADIW | SBIW => (r, c8),
        COM | NEG | SWAP | INC | ASR | LSR | ROR | DEC | POP | PUSH | SER | TST | CLR | LSL | ROL => (r, none),
        SBRC | SBRS | BST | BLD => (r, c3),
        SBIC | SBIS | SBI | CBI => (Mode::CONSTIO, c3),
        _ => (none, none),
    }
}
