//! Cross-module invariants from the testable-properties list: fetch
//! determinism, reset idempotence, and the CMP/branch correspondence table.
//! Per-module laws (decoder round-trip, frontier FIFO, CSR queries, bounds
//! checking) live as unit tests alongside the code they constrain.

use graphx_core::graph::CsrGraph;
use graphx_core::isa::{encode, Opcode, FLAG_IMM};
use graphx_core::register::{flags, ireg};
use graphx_core::vm::{Vm, VmStatus};

fn empty_graph() -> CsrGraph {
    CsrGraph::new(vec![0], vec![], vec![]).unwrap()
}

#[test]
fn fetch_increments_pc_and_halts_without_mutating_pc_past_the_end() {
    let program = [
        encode(Opcode::Add, FLAG_IMM, ireg::RACC, 0, 1),
        encode(Opcode::Add, FLAG_IMM, ireg::RACC, ireg::RACC, 1),
    ];
    let mut vm = Vm::new(empty_graph(), &program, &[]).unwrap();

    assert_eq!(vm.registers.pc, 0);
    vm.step();
    assert_eq!(vm.registers.pc, 1);
    vm.step();
    assert_eq!(vm.registers.pc, 2);

    assert_eq!(vm.step(), VmStatus::Halt);
    assert_eq!(vm.registers.pc, 2, "falling off the end must not mutate PC further");
    assert_eq!(vm.step(), VmStatus::Halt);
    assert_eq!(vm.registers.pc, 2);
}

#[test]
fn reset_restores_every_piece_of_state_except_program_and_graph() {
    let program = [
        encode(Opcode::Add, FLAG_IMM, ireg::RACC, 0, 5),
        encode(Opcode::Niter, 0, 0, 0, 0),
        encode(Opcode::Fpush, 0, ireg::RACC, 0, 0),
        encode(Opcode::Halt, 0, 0, 0, 0),
    ];
    let mut vm = Vm::new(empty_graph(), &program, &[]).unwrap();
    vm.run_to_completion(10);
    vm.memory.write_int(0, 42).unwrap();

    assert_ne!(vm.registers.clock, 0);

    vm.reset();

    assert_eq!(vm.registers.flags, 0);
    assert_eq!(vm.registers.pc, 0);
    assert_eq!(vm.registers.clock, 0);
    assert_eq!(vm.registers.niter, [0; 4]);
    assert_eq!(vm.registers.eiter, 0);
    assert_eq!(vm.registers.read_int(ireg::RACC), 0);
    assert_eq!(vm.memory.read_int(0), Some(0));
    assert!(vm.frontier.current_is_empty());

    // Program and graph survive the reset.
    assert_eq!(vm.run_to_completion(10), VmStatus::Halt);
    assert_eq!(vm.registers.read_int(ireg::RACC), 5);
}

#[test]
fn cmp_branch_correspondence_table() {
    let cases: [(i64, bool, bool, bool, bool); 3] = [
        // (diff, blt_taken, bge_taken, bz_taken, bnz_taken)
        (-3, true, false, false, true),
        (0, false, true, true, false),
        (3, false, true, false, true),
    ];

    for (diff, blt_taken, bge_taken, bz_taken, bnz_taken) in cases {
        for (opcode, expect_taken) in [
            (Opcode::Blt, blt_taken),
            (Opcode::Bge, bge_taken),
            (Opcode::Bz, bz_taken),
            (Opcode::Bnz, bnz_taken),
        ] {
            // Load `diff` into a register and CMP it against zero, so the
            // resulting sign is exactly `diff`'s sign.
            let program = [
                encode(Opcode::Mov, FLAG_IMM, ireg::rtmp(2), 0, diff as u32), // 0
                encode(Opcode::Cmp, FLAG_IMM, 0, ireg::rtmp(2), 0),           // 1
                encode(opcode, FLAG_IMM, 0, 0, 4), // 2: branch to the taken path
                encode(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, 0), // 3: not-taken path
                encode(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, 1), // 4: taken path
            ];
            let mut vm = Vm::new(empty_graph(), &program, &[]).unwrap();
            vm.run_to_completion(10);

            let landed_on_taken_path = vm.registers.read_int(ireg::rtmp(1)) == 1;
            assert_eq!(
                landed_on_taken_path, expect_taken,
                "diff={diff} opcode={opcode:?}"
            );
        }
    }
}

#[test]
fn cmp_sets_exactly_one_of_the_three_flag_bits() {
    let program = [encode(Opcode::Cmp, FLAG_IMM, 0, ireg::RACC, (-1i32) as u32)];
    let mut vm = Vm::new(empty_graph(), &program, &[]).unwrap();
    vm.step();
    let set_bits = [flags::ZERO, flags::NEGATIVE, flags::POSITIVE]
        .iter()
        .filter(|&&bit| vm.registers.flag(bit))
        .count();
    assert_eq!(set_bits, 1);
}
