// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! Instruction word encoding: the 64-bit field layout, the opcode enumeration,
//! and the `encode`/`decode` pair that is the only place that layout is known.

use remain::sorted;
use thiserror::Error;

/// Bit 0 of the flag byte: operand `A2` is a 32-bit immediate rather than a register index.
pub const FLAG_IMM: u8 = 1 << 0;
/// Bit 1 of the flag byte: the operation is on the float bank rather than the integer bank.
pub const FLAG_FLOAT: u8 = 1 << 1;

const OPCODE_SHIFT: u32 = 56;
const FLAGS_SHIFT: u32 = 48;
const DEST_SHIFT: u32 = 40;
const SRC1_SHIFT: u32 = 32;

/// Every opcode GraphX's decoder recognizes. Kept as a single exhaustive enum so adding an
/// opcode is a compile error everywhere it isn't yet handled.
#[sorted]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Add = 12,
    Barrier = 35,
    Bge = 5,
    Blt = 4,
    Bnz = 3,
    Bz = 2,
    Cmp = 16,
    Deg = 11,
    Div = 15,
    Eiter = 8,
    Empty = 22,
    Enext = 9,
    Ffill = 23,
    Fpop = 21,
    Fpush = 20,
    Fswap = 24,
    Halt = 0,
    Hase = 10,
    Jmp = 1,
    Ld = 18,
    Lock = 36,
    Mov = 17,
    Movc = 28,
    Mul = 14,
    Niter = 6,
    Nnext = 7,
    Parallel = 34,
    St = 19,
    Sub = 13,
    Unlock = 37,
    Vadd = 25,
    Vdiv = 27,
    Vld = 29,
    Vmul = 26,
    Vset = 32,
    Vst = 30,
    Vsub = 33,
    Vsum = 31,
}

impl Opcode {
    pub const COUNT: usize = 38;

    /// Canonical mnemonic for disassembly and the assembler's opcode table.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Halt => "HALT",
            Jmp => "JMP",
            Bz => "BZ",
            Bnz => "BNZ",
            Blt => "BLT",
            Bge => "BGE",
            Niter => "NITER",
            Nnext => "NNEXT",
            Eiter => "EITER",
            Enext => "ENEXT",
            Hase => "HASE",
            Deg => "DEG",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Cmp => "CMP",
            Mov => "MOV",
            Ld => "LD",
            St => "ST",
            Fpush => "FPUSH",
            Fpop => "FPOP",
            Empty => "FEMPTY",
            Ffill => "FFILL",
            Fswap => "FSWAP",
            Vadd => "VADD",
            Vmul => "VMUL",
            Vdiv => "VDIV",
            Movc => "MOVC",
            Vld => "VLD",
            Vst => "VST",
            Vsum => "VSUM",
            Vset => "VSET",
            Parallel => "PARALLEL",
            Barrier => "BARRIER",
            Lock => "LOCK",
            Unlock => "UNLOCK",
            Vsub => "VSUB",
        }
    }

    /// Reverse of [`Opcode::mnemonic`], used by the assembler.
    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        use Opcode::*;
        Some(match s {
            "HALT" => Halt,
            "JMP" => Jmp,
            "BZ" => Bz,
            "BNZ" => Bnz,
            "BLT" => Blt,
            "BGE" => Bge,
            "NITER" => Niter,
            "NNEXT" => Nnext,
            "EITER" => Eiter,
            "ENEXT" => Enext,
            "HASE" => Hase,
            "DEG" => Deg,
            "ADD" => Add,
            "SUB" => Sub,
            "MUL" => Mul,
            "DIV" => Div,
            "CMP" => Cmp,
            "MOV" => Mov,
            "LD" => Ld,
            "ST" => St,
            "FPUSH" => Fpush,
            "FPOP" => Fpop,
            "FEMPTY" => Empty,
            "FFILL" => Ffill,
            "FSWAP" => Fswap,
            "VADD" => Vadd,
            "VMUL" => Vmul,
            "VDIV" => Vdiv,
            "MOVC" => Movc,
            "VLD" => Vld,
            "VST" => Vst,
            "VSUM" => Vsum,
            "VSET" => Vset,
            "PARALLEL" => Parallel,
            "BARRIER" => Barrier,
            "LOCK" => Lock,
            "UNLOCK" => Unlock,
            "VSUB" => Vsub,
            _ => return None,
        })
    }

    fn try_from_u8(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0 => Halt,
            1 => Jmp,
            2 => Bz,
            3 => Bnz,
            4 => Blt,
            5 => Bge,
            6 => Niter,
            7 => Nnext,
            8 => Eiter,
            9 => Enext,
            10 => Hase,
            11 => Deg,
            12 => Add,
            13 => Sub,
            14 => Mul,
            15 => Div,
            16 => Cmp,
            17 => Mov,
            18 => Ld,
            19 => St,
            20 => Fpush,
            21 => Fpop,
            22 => Empty,
            23 => Ffill,
            24 => Fswap,
            25 => Vadd,
            26 => Vmul,
            27 => Vdiv,
            28 => Movc,
            29 => Vld,
            30 => Vst,
            31 => Vsum,
            32 => Vset,
            33 => Vsub,
            34 => Parallel,
            35 => Barrier,
            36 => Lock,
            37 => Unlock,
            _ => return None,
        })
    }
}

/// A fully decoded instruction word, passed by value from decoder to executor.
///
/// This is the value type the design notes call for in place of the reference
/// implementation's `ARG1`/`ARG2`/`ARG3` macro aliases over shared scratch registers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub flags: u8,
    pub dest: u8,
    pub src1: u8,
    /// Either a register index (low 8 bits significant) or a 32-bit immediate,
    /// depending on [`FLAG_IMM`] in `flags`.
    pub src2_or_imm: u32,
    /// Populated only when `FLAG_IMM | FLAG_FLOAT` are both set: `src2_or_imm`
    /// reinterpreted as an IEEE-754 single.
    pub float_imm: f32,
}

impl Instruction {
    pub fn is_immediate(&self) -> bool {
        self.flags & FLAG_IMM != 0
    }

    pub fn is_float(&self) -> bool {
        self.flags & FLAG_FLOAT != 0
    }
}

#[sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
}

/// Splits a 64-bit instruction word into its fields, per the layout documented in the data
/// model: opcode (63..56), flags (55..48), dest (47..40), src1 (39..32), src2-or-imm (31..0).
pub fn decode(word: u64) -> Result<Instruction, DecodeError> {
    let opcode_byte = (word >> OPCODE_SHIFT) as u8;
    let opcode = Opcode::try_from_u8(opcode_byte)
        .ok_or(DecodeError::UnknownOpcode { opcode: opcode_byte })?;
    let flags = (word >> FLAGS_SHIFT) as u8;
    let dest = (word >> DEST_SHIFT) as u8;
    let src1 = (word >> SRC1_SHIFT) as u8;
    let src2_or_imm = word as u32;
    let float_imm = if flags & FLAG_IMM != 0 && flags & FLAG_FLOAT != 0 {
        f32::from_bits(src2_or_imm)
    } else {
        0.0
    };

    Ok(Instruction {
        opcode,
        flags,
        dest,
        src1,
        src2_or_imm,
        float_imm,
    })
}

/// Inverse of [`decode`]: packs fields back into a 64-bit word. Used by the assembler and by
/// the decoder's own round-trip tests, so the two can never drift apart.
pub fn encode(opcode: Opcode, flags: u8, dest: u8, src1: u8, src2_or_imm: u32) -> u64 {
    ((opcode as u64) << OPCODE_SHIFT)
        | ((flags as u64) << FLAGS_SHIFT)
        | ((dest as u64) << DEST_SHIFT)
        | ((src1 as u64) << SRC1_SHIFT)
        | (src2_or_imm as u64)
}
