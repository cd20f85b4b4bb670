// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! Opcode execution. One method per opcode family, dispatched from
//! [`Vm::execute`]; this is the module that turns a decoded [`Instruction`]
//! into register, memory, frontier and control-flow effects.

use remain::sorted;
use thiserror::Error;

use crate::isa::{Instruction, Opcode};
use crate::register::{flags, ireg};
use crate::vm::Vm;

#[sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    #[error("integer division by zero")]
    DivideByZero,
    #[error("branch target {target} is out of program bounds")]
    OutOfRangeBranch { target: u32 },
    #[error("memory address {addr} is out of bounds")]
    OutOfRangeAddress { addr: u32 },
    #[error("iterator index {index} is out of range (expected 0..4)")]
    OutOfRangeIterator { index: u8 },
}

/// What an opcode's execution did to pipeline control flow; distinct from
/// [`crate::vm::VmStatus`], which also carries the decode-or-execute error
/// that caused a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Continue,
    Halt,
}

impl Vm {
    pub(crate) fn execute(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        use Opcode::*;
        match instr.opcode {
            Halt => Ok(ExecStatus::Halt),

            Jmp => self.branch_if(true, instr.src2_or_imm),
            Bz => self.branch_if(self.registers.flag(flags::ZERO), instr.src2_or_imm),
            Bnz => self.branch_if(!self.registers.flag(flags::ZERO), instr.src2_or_imm),
            Blt => self.branch_if(self.registers.flag(flags::NEGATIVE), instr.src2_or_imm),
            Bge => self.branch_if(
                self.registers.flag(flags::POSITIVE) || self.registers.flag(flags::ZERO),
                instr.src2_or_imm,
            ),

            Niter => self.op_niter(instr),
            Nnext => self.op_nnext(instr),
            Eiter => self.op_eiter(),
            Enext => self.op_enext(),
            Hase => self.op_hase(),
            Deg => self.op_deg(instr),

            Add | Sub | Mul | Div => self.op_arith(instr),
            Cmp => self.op_cmp(instr),
            Mov => self.op_mov(instr),
            Movc => self.op_movc(instr),

            Ld => self.op_ld(instr),
            St => self.op_st(instr),

            Fpush => self.op_fpush(instr),
            Fpop => self.op_fpop(instr),
            Empty => self.op_fempty(),
            Ffill => self.op_ffill(),
            Fswap => self.op_fswap(),

            Vadd | Vsub | Vmul | Vdiv => self.op_varith(instr),
            Vld => self.op_vld(instr),
            Vst => self.op_vst(instr),
            Vset => self.op_vset(instr),
            Vsum => self.op_vsum(instr),

            // No-op on a single-threaded interpreter; reserved for a
            // multicore backend to give these opcodes real semantics.
            Parallel | Barrier | Lock | Unlock => Ok(ExecStatus::Continue),
        }
    }

    fn resolve_address(&self, instr: Instruction) -> u32 {
        if instr.is_immediate() {
            instr.src2_or_imm
        } else {
            self.registers.read_int(instr.src1) as u32
        }
    }

    fn branch_to(&mut self, target: u32) -> Result<(), ExecError> {
        if target >= self.program_len {
            return Err(ExecError::OutOfRangeBranch { target });
        }
        self.registers.pc = target;
        Ok(())
    }

    fn branch_if(&mut self, condition: bool, target: u32) -> Result<ExecStatus, ExecError> {
        if condition {
            self.branch_to(target)?;
        }
        Ok(ExecStatus::Continue)
    }

    fn iterator_index(instr: Instruction) -> Result<usize, ExecError> {
        if instr.dest < 4 {
            Ok(instr.dest as usize)
        } else {
            Err(ExecError::OutOfRangeIterator { index: instr.dest })
        }
    }

    fn op_niter(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let idx = Self::iterator_index(instr)?;
        self.registers.niter[idx] = 0;
        Ok(ExecStatus::Continue)
    }

    /// Advances `niter[idx]` over `Rnode`'s neighbor row, writing the next
    /// neighbor/weight pair into `Rnbr`/`Rval` and clearing FLAGS.zero, or
    /// setting FLAGS.zero once the row is exhausted.
    fn op_nnext(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let idx = Self::iterator_index(instr)?;
        let node = self.registers.read_int(ireg::RNODE);
        let cursor = self.registers.niter[idx] as usize;
        let edge = if node >= 0 && (node as usize) < self.graph.n() {
            self.graph.edge_at(node as usize, cursor)
        } else {
            None
        };
        match edge {
            Some((neighbor, weight)) => {
                self.registers.write_int(ireg::RNBR, neighbor);
                self.registers.write_int(ireg::RVAL, weight);
                self.registers.niter[idx] += 1;
                self.registers.set_zero_flag(false);
            }
            None => self.registers.set_zero_flag(true),
        }
        Ok(ExecStatus::Continue)
    }

    fn op_eiter(&mut self) -> Result<ExecStatus, ExecError> {
        self.registers.eiter = 0;
        self.registers.write_int(ireg::RNODE, 0);
        Ok(ExecStatus::Continue)
    }

    /// Walks every edge of the graph in node-major, then storage order.
    /// Exhausting one node's row advances `Rnode` and resets `eiter`, looping
    /// until either a populated row is found or `Rnode` runs past the last
    /// node, at which point FLAGS.zero is set and `Rnode` is left one past
    /// the last valid node id.
    fn op_enext(&mut self) -> Result<ExecStatus, ExecError> {
        let n = self.graph.n();
        loop {
            let node = self.registers.read_int(ireg::RNODE);
            if node < 0 || node as usize >= n {
                self.registers.set_zero_flag(true);
                return Ok(ExecStatus::Continue);
            }
            let u = node as usize;
            let cursor = self.registers.eiter as usize;
            match self.graph.edge_at(u, cursor) {
                Some((neighbor, weight)) => {
                    self.registers.write_int(ireg::RNBR, neighbor);
                    self.registers.write_int(ireg::RVAL, weight);
                    self.registers.eiter += 1;
                    self.registers.set_zero_flag(false);
                    return Ok(ExecStatus::Continue);
                }
                None => {
                    self.registers.write_int(ireg::RNODE, node + 1);
                    self.registers.eiter = 0;
                }
            }
        }
    }

    fn op_hase(&mut self) -> Result<ExecStatus, ExecError> {
        let u = self.registers.read_int(ireg::RNODE);
        let v = self.registers.read_int(ireg::RNBR);
        let exists = u >= 0 && (u as usize) < self.graph.n() && self.graph.has_edge(u as usize, v);
        self.registers.set_zero_flag(!exists);
        Ok(ExecStatus::Continue)
    }

    /// Writes the degree of node `R[dest]` into `Rval`. A node id outside
    /// `0..n` has no degree to report; this yields 0 rather than an error,
    /// since out-of-range node ids are not among the contract's ERROR cases.
    fn op_deg(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let node = self.registers.read_int(instr.dest);
        let degree = if node >= 0 && (node as usize) < self.graph.n() {
            self.graph.degree(node as usize) as i32
        } else {
            0
        };
        self.registers.write_int(ireg::RVAL, degree);
        Ok(ExecStatus::Continue)
    }

    fn op_arith(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let a = self.registers.read_float(instr.src1);
            let b = if instr.is_immediate() {
                instr.float_imm
            } else {
                self.registers.read_float(instr.src2_or_imm as u8)
            };
            let result = match instr.opcode {
                Opcode::Add => a + b,
                Opcode::Sub => a - b,
                Opcode::Mul => a * b,
                Opcode::Div => a / b,
                _ => unreachable!("op_arith dispatched on a non-arithmetic opcode"),
            };
            self.registers.write_float(instr.dest, result);
        } else {
            let a = self.registers.read_int(instr.src1);
            let b = if instr.is_immediate() {
                instr.src2_or_imm as i32
            } else {
                self.registers.read_int(instr.src2_or_imm as u8)
            };
            let result = match instr.opcode {
                Opcode::Add => a.wrapping_add(b),
                Opcode::Sub => a.wrapping_sub(b),
                Opcode::Mul => a.wrapping_mul(b),
                Opcode::Div => {
                    if b == 0 {
                        return Err(ExecError::DivideByZero);
                    }
                    a.wrapping_div(b)
                }
                _ => unreachable!("op_arith dispatched on a non-arithmetic opcode"),
            };
            self.registers.write_int(instr.dest, result);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_cmp(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let a = self.registers.read_float(instr.src1);
            let b = if instr.is_immediate() {
                instr.float_imm
            } else {
                self.registers.read_float(instr.src2_or_imm as u8)
            };
            self.registers.set_flags_from_cmp_f32(a - b);
        } else {
            let a = self.registers.read_int(instr.src1) as i64;
            let b = if instr.is_immediate() {
                instr.src2_or_imm as i32 as i64
            } else {
                self.registers.read_int(instr.src2_or_imm as u8) as i64
            };
            self.registers.set_flags_from_cmp(a - b);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_mov(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let value = if instr.is_immediate() {
                instr.float_imm
            } else {
                self.registers.read_float(instr.src1)
            };
            self.registers.write_float(instr.dest, value);
        } else {
            let value = if instr.is_immediate() {
                instr.src2_or_imm as i32
            } else {
                self.registers.read_int(instr.src1)
            };
            self.registers.write_int(instr.dest, value);
        }
        Ok(ExecStatus::Continue)
    }

    /// `F` set: `src1` read as int, written to `dest` as float. `F` clear:
    /// `src1` read as float, truncated to int and written to `dest`.
    fn op_movc(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let value = self.registers.read_int(instr.src1) as f32;
            self.registers.write_float(instr.dest, value);
        } else {
            let value = self.registers.read_float(instr.src1) as i32;
            self.registers.write_int(instr.dest, value);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_ld(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let addr = self.resolve_address(instr);
        if instr.is_float() {
            let value = self
                .memory
                .read_float(addr)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
            self.registers.write_float(instr.dest, value);
        } else {
            let value = self
                .memory
                .read_int(addr)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
            self.registers.write_int(instr.dest, value);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_st(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let addr = self.resolve_address(instr);
        if instr.is_float() {
            let value = self.registers.read_float(instr.dest);
            self.memory
                .write_float(addr, value)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
        } else {
            let value = self.registers.read_int(instr.dest);
            self.memory
                .write_int(addr, value)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
        }
        Ok(ExecStatus::Continue)
    }

    fn op_fpush(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let value = self.registers.read_int(instr.dest);
        // A full frontier (or a reserved, not-yet-implemented kind) is not
        // among the contract's ERROR cases; the push is simply dropped.
        let _ = self.frontier.push_next(value);
        Ok(ExecStatus::Continue)
    }

    fn op_fpop(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if let Ok(value) = self.frontier.pop_current() {
            self.registers.write_int(instr.dest, value);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_fempty(&mut self) -> Result<ExecStatus, ExecError> {
        self.registers.set_zero_flag(self.frontier.current_is_empty());
        Ok(ExecStatus::Continue)
    }

    /// Seeds `current` with every node id `0..n`, bypassing the `next`
    /// staging buffer `FPUSH` otherwise fills.
    fn op_ffill(&mut self) -> Result<ExecStatus, ExecError> {
        for node in 0..self.graph.n() as i32 {
            let _ = self.frontier.push_current(node);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_fswap(&mut self) -> Result<ExecStatus, ExecError> {
        self.frontier.swap();
        Ok(ExecStatus::Continue)
    }

    fn op_varith(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let a = self.registers.read_vfloat(instr.src1);
            let b = self.registers.read_vfloat(instr.src2_or_imm as u8);
            let mut result = [0.0f32; 4];
            for lane in 0..4 {
                result[lane] = match instr.opcode {
                    Opcode::Vadd => a[lane] + b[lane],
                    Opcode::Vsub => a[lane] - b[lane],
                    Opcode::Vmul => a[lane] * b[lane],
                    Opcode::Vdiv => a[lane] / b[lane],
                    _ => unreachable!("op_varith dispatched on a non-vector-arithmetic opcode"),
                };
            }
            self.registers.write_vfloat(instr.dest, result);
        } else {
            let a = self.registers.read_vint(instr.src1);
            let b = self.registers.read_vint(instr.src2_or_imm as u8);
            let mut result = [0i32; 4];
            for lane in 0..4 {
                result[lane] = match instr.opcode {
                    Opcode::Vadd => a[lane].wrapping_add(b[lane]),
                    Opcode::Vsub => a[lane].wrapping_sub(b[lane]),
                    Opcode::Vmul => a[lane].wrapping_mul(b[lane]),
                    Opcode::Vdiv => {
                        if b[lane] == 0 {
                            return Err(ExecError::DivideByZero);
                        }
                        a[lane].wrapping_div(b[lane])
                    }
                    _ => unreachable!("op_varith dispatched on a non-vector-arithmetic opcode"),
                };
            }
            self.registers.write_vint(instr.dest, result);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_vld(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let addr = self.resolve_address(instr);
        if instr.is_float() {
            let lanes = self
                .memory
                .read_vector_float(addr)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
            self.registers.write_vfloat(instr.dest, lanes);
        } else {
            let lanes = self
                .memory
                .read_vector_int(addr)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
            self.registers.write_vint(instr.dest, lanes);
        }
        Ok(ExecStatus::Continue)
    }

    fn op_vst(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        let addr = self.resolve_address(instr);
        if instr.is_float() {
            let lanes = self.registers.read_vfloat(instr.dest);
            self.memory
                .write_vector_float(addr, lanes)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
        } else {
            let lanes = self.registers.read_vint(instr.dest);
            self.memory
                .write_vector_int(addr, lanes)
                .ok_or(ExecError::OutOfRangeAddress { addr })?;
        }
        Ok(ExecStatus::Continue)
    }

    fn op_vset(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let value = if instr.is_immediate() {
                instr.float_imm
            } else {
                self.registers.read_float(instr.src1)
            };
            self.registers.write_vfloat(instr.dest, [value; 4]);
        } else {
            let value = if instr.is_immediate() {
                instr.src2_or_imm as i32
            } else {
                self.registers.read_int(instr.src1)
            };
            self.registers.write_vint(instr.dest, [value; 4]);
        }
        Ok(ExecStatus::Continue)
    }

    /// Horizontal sum of `src1`'s four lanes, accumulated into `dest` (added
    /// to whatever `dest` already held, not overwritten).
    fn op_vsum(&mut self, instr: Instruction) -> Result<ExecStatus, ExecError> {
        if instr.is_float() {
            let lanes = self.registers.read_vfloat(instr.src1);
            let sum: f32 = lanes.iter().sum();
            let acc = self.registers.read_float(instr.dest);
            self.registers.write_float(instr.dest, acc + sum);
        } else {
            let lanes = self.registers.read_vint(instr.src1);
            let sum = lanes.iter().fold(0i32, |acc, v| acc.wrapping_add(*v));
            let acc = self.registers.read_int(instr.dest);
            self.registers.write_int(instr.dest, acc.wrapping_add(sum));
        }
        Ok(ExecStatus::Continue)
    }
}
