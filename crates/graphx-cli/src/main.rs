// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! `graphx <program.bin> [--debug] [-v]`: loads a program image, runs it to
//! completion, and reports the outcome. Exit code 0 on clean HALT, 1 on
//! load error or VM ERROR.

use std::process::ExitCode;

use anyhow::Context;
use argh::FromArgs;
use graphx_core::observer::LoggingHook;
use graphx_core::vm::{Vm, VmStatus};

#[derive(FromArgs)]
/// Run a GraphX program image.
struct Args {
    /// path to the program image
    #[argh(positional)]
    program: String,

    /// attach a debug hook that logs every retired instruction at trace level
    #[argh(switch)]
    debug: bool,

    /// raise log verbosity; repeat for more (-v, -vv)
    #[argh(switch, short = 'v')]
    verbose: u8,

    /// maximum instructions to execute before giving up and reporting CONTINUE
    #[argh(option, default = "1_000_000")]
    max_steps: u64,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

/// Returns `Ok(true)` on a clean HALT, `Ok(false)` on any other terminal
/// status (ERROR, or CONTINUE after exhausting `max_steps`).
fn run(args: &Args) -> anyhow::Result<bool> {
    let image = graphx_loader::load_image_from_path(&args.program)
        .with_context(|| format!("failed to load program image {}", args.program))?;

    let mut vm = Vm::new(image.graph, &image.program, &image.initial_memory)
        .context("program image does not fit the virtual machine's fixed capacities")?;

    if args.debug {
        vm.set_debug_hook(Box::new(LoggingHook));
        vm.set_exit_hook(Box::new(LoggingHook));
    }

    let status = vm.run_to_completion(args.max_steps);
    report(&vm, status);

    Ok(matches!(status, VmStatus::Halt))
}

fn report(vm: &Vm, status: VmStatus) {
    match status {
        VmStatus::Halt => {
            log::info!(
                "HALT after {} instructions; final PC = {}",
                vm.registers.clock,
                vm.registers.pc
            );
            println!("halted after {} instructions", vm.registers.clock);
            dump_memory(vm);
        }
        VmStatus::Error(err) => {
            let failing_pc = vm.registers.pc.saturating_sub(1);
            log::error!(
                "ERROR at PC={failing_pc} after {} instructions: {err}",
                vm.registers.clock
            );
            eprintln!("error at PC={failing_pc}: {err}");
        }
        VmStatus::Continue => {
            log::warn!("exceeded max-steps budget without reaching a terminal state");
            eprintln!("did not halt within the step budget");
        }
    }
}

/// Prints data memory as a 256x256 grid of `%f`-formatted floats, matching
/// the reference implementation's PageRank-oriented dump format.
fn dump_memory(vm: &Vm) {
    const SIDE: usize = 256;
    let words = vm.memory.as_slice();
    for row in 0..SIDE {
        let mut line = String::new();
        for col in 0..SIDE {
            let idx = row * SIDE + col;
            let value = f32::from_bits(words[idx] as u32);
            line.push_str(&format!("{value} "));
        }
        println!("{}", line.trim_end());
    }
}
