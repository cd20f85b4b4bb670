// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! A deliberately small line-oriented assembler: one instruction per line,
//! mnemonic first, then comma-separated operands (register names,
//! `#immediate`, or a label). Labels are declared with a trailing colon on
//! their own line and resolved to word offsets in a pre-pass before encoding.
//!
//! This exists to write the test fixtures and example programs by hand
//! without counting instruction offsets manually — not a general-purpose
//! macro assembler. There is no disassembler; [`Opcode::mnemonic`] already
//! covers that direction.

use std::collections::HashMap;

use graphx_core::isa::{encode, Opcode, FLAG_FLOAT, FLAG_IMM};
use graphx_core::register::{freg, ireg};
use remain::sorted;
use thiserror::Error;

#[sorted]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: `{mnemonic}` does not accept operand `{operand}`")]
    BadOperand { line: usize, mnemonic: String, operand: String },
    #[error("label `{label}` is never declared")]
    UndefinedLabel { label: String },
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },
    #[error("line {line}: unknown register `{token}`")]
    UnknownRegister { line: usize, token: String },
}

pub type Result<T> = std::result::Result<T, AsmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bank {
    Int,
    Float,
    VecInt,
    VecFloat,
}

#[derive(Debug, Clone, Copy)]
struct RegRef {
    bank: Bank,
    index: u8,
}

/// Assembles complete source text into a sequence of encoded instruction
/// words, one per non-label, non-blank, non-comment line.
pub fn assemble(source: &str) -> Result<Vec<u64>> {
    let lines: Vec<(usize, &str)> = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, strip_comment(line).trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let mut labels = HashMap::new();
    let mut word_index: u32 = 0;
    for &(_, line) in &lines {
        if let Some(label) = line.strip_suffix(':') {
            labels.insert(label.trim().to_string(), word_index);
        } else {
            word_index += 1;
        }
    }

    let mut program = Vec::with_capacity(word_index as usize);
    for (line_no, line) in lines {
        if line.ends_with(':') {
            continue;
        }
        let (mnemonic, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let operands: Vec<&str> = if rest.trim().is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        program.push(assemble_instruction(line_no, mnemonic, &operands, &labels)?);
    }
    Ok(program)
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_register(token: &str) -> Option<RegRef> {
    let upper = token.to_ascii_uppercase();
    let named = match upper.as_str() {
        "RZERO" => Some((Bank::Int, ireg::RZERO)),
        "RACC" => Some((Bank::Int, ireg::RACC)),
        "RNODE" => Some((Bank::Int, ireg::RNODE)),
        "RNBR" => Some((Bank::Int, ireg::RNBR)),
        "RVAL" => Some((Bank::Int, ireg::RVAL)),
        "RCORE" => Some((Bank::Int, ireg::RCORE)),
        "FZERO" => Some((Bank::Float, freg::FZERO)),
        "FACC" => Some((Bank::Float, freg::FACC)),
        _ => None,
    };
    if let Some((bank, index)) = named {
        return Some(RegRef { bank, index });
    }
    if let Some(n) = upper.strip_prefix("RTMP") {
        let n: u8 = n.parse().ok()?;
        return (1..=16).contains(&n).then(|| RegRef { bank: Bank::Int, index: ireg::rtmp(n) });
    }
    if let Some(n) = upper.strip_prefix("FTMP") {
        let n: u8 = n.parse().ok()?;
        return (1..=16).contains(&n).then(|| RegRef { bank: Bank::Float, index: freg::ftmp(n) });
    }
    if let Some(n) = upper.strip_prefix("VF") {
        let index: u8 = n.parse().ok()?;
        return Some(RegRef { bank: Bank::VecFloat, index });
    }
    if let Some(n) = upper.strip_prefix('V') {
        let index: u8 = n.parse().ok()?;
        return Some(RegRef { bank: Bank::VecInt, index });
    }
    if let Some(n) = upper.strip_prefix('R') {
        let index: u8 = n.parse().ok()?;
        return Some(RegRef { bank: Bank::Int, index });
    }
    if let Some(n) = upper.strip_prefix('F') {
        let index: u8 = n.parse().ok()?;
        return Some(RegRef { bank: Bank::Float, index });
    }
    None
}

/// Parses `#123` or `#-4` as a 32-bit integer, `#3.5` as an IEEE-754 single,
/// returning the bit pattern `src2_or_imm` should carry either way.
fn parse_immediate(text: &str, want_float: bool) -> Option<u32> {
    if want_float {
        text.parse::<f32>().ok().map(f32::to_bits)
    } else {
        text.parse::<i32>().ok().map(|v| v as u32)
    }
}

fn assemble_instruction(
    line_no: usize,
    mnemonic: &str,
    operands: &[&str],
    labels: &HashMap<String, u32>,
) -> Result<u64> {
    let opcode = Opcode::from_mnemonic(&mnemonic.to_ascii_uppercase()).ok_or_else(|| {
        AsmError::UnknownMnemonic { line: line_no, mnemonic: mnemonic.to_string() }
    })?;

    let bad = |operand: &str| AsmError::BadOperand {
        line: line_no,
        mnemonic: mnemonic.to_string(),
        operand: operand.to_string(),
    };
    let arity = |joined: &str| bad(joined);
    let reg = |op: &str| -> Result<RegRef> {
        parse_register(op)
            .ok_or_else(|| AsmError::UnknownRegister { line: line_no, token: op.to_string() })
    };
    let label_offset = |name: &str| -> Result<u32> {
        labels.get(name).copied().ok_or_else(|| AsmError::UndefinedLabel { label: name.to_string() })
    };
    // Register-or-immediate operand, parsed against `want_float`.
    let reg_or_imm = |op: &str, want_float: bool| -> Result<(bool, u32)> {
        if let Some(imm) = op.strip_prefix('#') {
            let value = parse_immediate(imm, want_float).ok_or_else(|| bad(op))?;
            Ok((true, value))
        } else {
            let r = reg(op)?;
            Ok((false, r.index as u32))
        }
    };

    use Opcode::*;
    let word = match opcode {
        Halt | Eiter | Enext | Hase | Empty | Ffill | Fswap | Parallel | Barrier | Lock | Unlock => {
            match operands {
                [] => encode(opcode, 0, 0, 0, 0),
                _ => return Err(arity(&operands.join(","))),
            }
        }

        Jmp | Bz | Bnz | Blt | Bge => match operands {
            [target] => encode(opcode, FLAG_IMM, 0, 0, label_offset(target)?),
            _ => return Err(arity(&operands.join(","))),
        },

        Niter | Nnext => match operands {
            [idx] => {
                let idx: u8 = idx.parse().map_err(|_| bad(idx))?;
                encode(opcode, 0, idx, 0, 0)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Deg => match operands {
            [node] => encode(opcode, 0, reg(node)?.index, 0, 0),
            _ => return Err(arity(&operands.join(","))),
        },

        Add | Sub | Mul | Div => match operands {
            [dest, src1, src2] => {
                let dest = reg(dest)?;
                let src1 = reg(src1)?;
                let want_float = matches!(dest.bank, Bank::Float);
                let (is_imm, value) = reg_or_imm(src2, want_float)?;
                let mut flags = if want_float { FLAG_FLOAT } else { 0 };
                if is_imm {
                    flags |= FLAG_IMM;
                }
                encode(opcode, flags, dest.index, src1.index, value)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Cmp => match operands {
            [a, b] => {
                let a = reg(a)?;
                let want_float = matches!(a.bank, Bank::Float);
                let (is_imm, value) = reg_or_imm(b, want_float)?;
                let mut flags = if want_float { FLAG_FLOAT } else { 0 };
                if is_imm {
                    flags |= FLAG_IMM;
                }
                encode(opcode, flags, 0, a.index, value)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Mov => match operands {
            [dest, src] => {
                let dest = reg(dest)?;
                let want_float = matches!(dest.bank, Bank::Float);
                let (is_imm, value) = reg_or_imm(src, want_float)?;
                let mut flags = if want_float { FLAG_FLOAT } else { 0 };
                if is_imm {
                    flags |= FLAG_IMM;
                }
                encode(opcode, flags, dest.index, 0, value)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Movc => match operands {
            [dest, src] => {
                let dest = reg(dest)?;
                let src = reg(src)?;
                let flags = if matches!(dest.bank, Bank::Float) { FLAG_FLOAT } else { 0 };
                encode(opcode, flags, dest.index, src.index, 0)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Ld => match operands {
            [dest, addr] => {
                let dest = reg(dest)?;
                let want_float = matches!(dest.bank, Bank::Float);
                let mut flags = if want_float { FLAG_FLOAT } else { 0 };
                let (src1, src2_or_imm) = if let Some(imm) = addr.strip_prefix('#') {
                    flags |= FLAG_IMM;
                    (0, parse_immediate(imm, false).ok_or_else(|| bad(addr))?)
                } else {
                    (reg(addr)?.index, 0)
                };
                encode(opcode, flags, dest.index, src1, src2_or_imm)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        St => match operands {
            [value, addr] => {
                let value = reg(value)?;
                let want_float = matches!(value.bank, Bank::Float);
                let mut flags = if want_float { FLAG_FLOAT } else { 0 };
                let (src1, src2_or_imm) = if let Some(imm) = addr.strip_prefix('#') {
                    flags |= FLAG_IMM;
                    (0, parse_immediate(imm, false).ok_or_else(|| bad(addr))?)
                } else {
                    (reg(addr)?.index, 0)
                };
                encode(opcode, flags, value.index, src1, src2_or_imm)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Fpush | Fpop => match operands {
            [r] => encode(opcode, 0, reg(r)?.index, 0, 0),
            _ => return Err(arity(&operands.join(","))),
        },

        Vadd | Vsub | Vmul | Vdiv => match operands {
            [dest, src1, src2] => {
                let dest = reg(dest)?;
                let src1 = reg(src1)?;
                let src2 = reg(src2)?;
                let flags = if matches!(dest.bank, Bank::VecFloat) { FLAG_FLOAT } else { 0 };
                encode(opcode, flags, dest.index, src1.index, src2.index as u32)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Vld => match operands {
            [dest, addr] => {
                let dest = reg(dest)?;
                let mut flags = if matches!(dest.bank, Bank::VecFloat) { FLAG_FLOAT } else { 0 };
                let (src1, src2_or_imm) = if let Some(imm) = addr.strip_prefix('#') {
                    flags |= FLAG_IMM;
                    (0, parse_immediate(imm, false).ok_or_else(|| bad(addr))?)
                } else {
                    (reg(addr)?.index, 0)
                };
                encode(opcode, flags, dest.index, src1, src2_or_imm)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Vst => match operands {
            [value, addr] => {
                let value = reg(value)?;
                let mut flags = if matches!(value.bank, Bank::VecFloat) { FLAG_FLOAT } else { 0 };
                let (src1, src2_or_imm) = if let Some(imm) = addr.strip_prefix('#') {
                    flags |= FLAG_IMM;
                    (0, parse_immediate(imm, false).ok_or_else(|| bad(addr))?)
                } else {
                    (reg(addr)?.index, 0)
                };
                encode(opcode, flags, value.index, src1, src2_or_imm)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Vset => match operands {
            [dest, src] => {
                let dest = reg(dest)?;
                let want_float = matches!(dest.bank, Bank::VecFloat);
                let (is_imm, value) = reg_or_imm(src, want_float)?;
                let mut flags = if want_float { FLAG_FLOAT } else { 0 };
                if is_imm {
                    flags |= FLAG_IMM;
                }
                encode(opcode, flags, dest.index, 0, value)
            }
            _ => return Err(arity(&operands.join(","))),
        },

        Vsum => match operands {
            [dest, src] => {
                let dest = reg(dest)?;
                let src = reg(src)?;
                let flags = if matches!(src.bank, Bank::VecFloat) { FLAG_FLOAT } else { 0 };
                encode(opcode, flags, dest.index, src.index, 0)
            }
            _ => return Err(arity(&operands.join(","))),
        },
    };
    Ok(word)
}
