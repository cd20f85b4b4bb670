// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! The virtual machine: owns the graph, register file, data memory, frontier
//! pair and program image, and drives the fetch-decode-execute pipeline.

use remain::sorted;
use thiserror::Error;

use crate::exec::ExecError;
use crate::frontier::{FrontierKind, FrontierPair};
use crate::graph::CsrGraph;
use crate::isa::{decode, DecodeError};
use crate::memory::{DataMemory, DATA_MEMORY_WORDS};
use crate::observer::{DebugHook, ExitHook, NoopDebugHook, NoopExitHook};
use crate::register::RegisterFile;

/// Fixed program memory capacity, in 64-bit words.
pub const PROGRAM_WORDS: usize = 8192;

#[sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmBuildError {
    #[error("initial memory has {words} words, exceeds the {DATA_MEMORY_WORDS}-word data memory")]
    MemoryTooLarge { words: usize },
    #[error("program has {words} words, exceeds the {PROGRAM_WORDS}-word program memory")]
    ProgramTooLarge { words: usize },
}

/// Either half of a fetch-decode failure, unified so the pipeline loop and its
/// callers have one error type to report.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum VmError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// The outcome of a single `Vm::step`, and the terminal state a full run ends
/// in. `Continue` never escapes `run_to_completion`; it only appears as a
/// per-step result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VmStatus {
    Continue,
    Halt,
    Error(VmError),
}

impl VmStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VmStatus::Continue)
    }
}

pub struct Vm {
    pub registers: RegisterFile,
    pub memory: DataMemory,
    pub graph: CsrGraph,
    pub frontier: FrontierPair,
    pub(crate) program: Box<[u64; PROGRAM_WORDS]>,
    pub(crate) program_len: u32,
    debug_hook: Box<dyn DebugHook>,
    exit_hook: Box<dyn ExitHook>,
}

impl Vm {
    /// Builds a fresh VM around `graph`, with `program` loaded at the front of
    /// program memory (the remainder padded with `HALT`-decoding zero words)
    /// and `initial_memory` copied into the front of data memory.
    pub fn new(
        graph: CsrGraph,
        program: &[u64],
        initial_memory: &[i32],
    ) -> Result<Self, VmBuildError> {
        if program.len() > PROGRAM_WORDS {
            return Err(VmBuildError::ProgramTooLarge {
                words: program.len(),
            });
        }
        if initial_memory.len() > DATA_MEMORY_WORDS {
            return Err(VmBuildError::MemoryTooLarge {
                words: initial_memory.len(),
            });
        }
        let mut words = Box::new([0u64; PROGRAM_WORDS]);
        words[..program.len()].copy_from_slice(program);

        let mut memory = DataMemory::new();
        memory.load_initial(initial_memory);

        Ok(Vm {
            registers: RegisterFile::new(),
            memory,
            graph,
            frontier: FrontierPair::new(FrontierKind::Queue),
            program: words,
            program_len: program.len() as u32,
            debug_hook: Box::new(NoopDebugHook),
            exit_hook: Box::new(NoopExitHook),
        })
    }

    pub fn set_debug_hook(&mut self, hook: Box<dyn DebugHook>) {
        self.debug_hook = hook;
    }

    pub fn set_exit_hook(&mut self, hook: Box<dyn ExitHook>) {
        self.exit_hook = hook;
    }

    /// Clears all VM state back to zero/empty, except the program image and
    /// graph, which a reset is not meant to discard.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.memory.reset();
        self.frontier.reset(FrontierKind::Queue);
    }

    fn fetch(&self) -> Option<u64> {
        if self.registers.pc >= self.program_len {
            None
        } else {
            Some(self.program[self.registers.pc as usize])
        }
    }

    /// Runs exactly one fetch-decode-execute cycle. Falling off the end of
    /// loaded program memory (`pc >= program_len`) halts exactly as `HALT`
    /// would; it is not an error.
    pub fn step(&mut self) -> VmStatus {
        let pc_before = self.registers.pc;
        let Some(word) = self.fetch() else {
            let status = VmStatus::Halt;
            self.exit_hook.on_exit(&status, &self.registers, &self.memory);
            return status;
        };
        self.registers.pc += 1;

        let instruction = match decode(word) {
            Ok(instruction) => instruction,
            Err(err) => {
                let status = VmStatus::Error(VmError::Decode(err));
                self.exit_hook.on_exit(&status, &self.registers, &self.memory);
                return status;
            }
        };

        self.registers.isa = instruction.opcode as u8;
        self.registers.a0 = instruction.dest;
        self.registers.a1 = instruction.src1;
        self.registers.a2 = instruction.src2_or_imm;
        self.registers.fa = instruction.float_imm;

        match self.execute(instruction) {
            Ok(crate::exec::ExecStatus::Continue) => {
                self.registers.clock += 1;
                self.debug_hook
                    .on_retire(pc_before, instruction, self.registers.clock);
                VmStatus::Continue
            }
            Ok(crate::exec::ExecStatus::Halt) => {
                self.registers.clock += 1;
                self.debug_hook
                    .on_retire(pc_before, instruction, self.registers.clock);
                let status = VmStatus::Halt;
                self.exit_hook.on_exit(&status, &self.registers, &self.memory);
                status
            }
            Err(err) => {
                let status = VmStatus::Error(VmError::Exec(err));
                self.exit_hook.on_exit(&status, &self.registers, &self.memory);
                status
            }
        }
    }

    /// Steps until a terminal status, or `max_steps` cycles have elapsed
    /// (whichever comes first). A program that never halts and has no step
    /// budget applied is the caller's bug, not the VM's to guard against.
    pub fn run_to_completion(&mut self, max_steps: u64) -> VmStatus {
        for _ in 0..max_steps {
            let status = self.step();
            if status.is_terminal() {
                return status;
            }
        }
        VmStatus::Continue
    }
}
