// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! Debug and exit hooks, abstracted behind small observer traits rather than
//! the reference implementation's raw callbacks. Default implementations are
//! no-ops; tests supply recording observers instead of raw function pointers.

use crate::isa::Instruction;
use crate::memory::DataMemory;
use crate::register::RegisterFile;
use crate::vm::VmStatus;

/// Invoked once per retired instruction, after `clock` has been incremented.
pub trait DebugHook {
    fn on_retire(&mut self, pc_before: u32, instruction: Instruction, clock: u64);
}

/// Invoked exactly once, when the pipeline transitions out of `Running`.
pub trait ExitHook {
    fn on_exit(&mut self, status: &VmStatus, registers: &RegisterFile, memory: &DataMemory);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDebugHook;

impl DebugHook for NoopDebugHook {
    fn on_retire(&mut self, _pc_before: u32, _instruction: Instruction, _clock: u64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExitHook;

impl ExitHook for NoopExitHook {
    fn on_exit(&mut self, _status: &VmStatus, _registers: &RegisterFile, _memory: &DataMemory) {}
}

/// Logs each retired instruction at `trace` level, and the final status at
/// `info`/`error` level. This is what the CLI's `--debug` flag installs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHook;

impl DebugHook for LoggingHook {
    fn on_retire(&mut self, pc_before: u32, instruction: Instruction, clock: u64) {
        log::trace!(
            "clock={clock} pc={pc_before} opcode={} dest={} src1={} src2_or_imm={}",
            instruction.opcode.mnemonic(),
            instruction.dest,
            instruction.src1,
            instruction.src2_or_imm,
        );
    }
}

impl ExitHook for LoggingHook {
    fn on_exit(&mut self, status: &VmStatus, registers: &RegisterFile, _memory: &DataMemory) {
        match status {
            VmStatus::Halt => log::info!(
                "graphx halted cleanly after {} instructions",
                registers.clock
            ),
            VmStatus::Error(err) => log::error!(
                "graphx stopped with error after {} instructions at pc={}: {err}",
                registers.clock,
                registers.pc.saturating_sub(1),
            ),
            VmStatus::Continue => unreachable!("exit hook only fires on a terminal status"),
        }
    }
}
