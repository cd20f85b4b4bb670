//! End-to-end scenarios: each test assembles a short GraphX program by hand
//! and runs it to completion, checking the same outward behavior a user
//! program would observe. These exercise the pipeline across modules, unlike
//! the per-opcode unit tests inside `src/exec.rs`.

use std::collections::HashMap;

use graphx_core::graph::CsrGraph;
use graphx_core::isa::{encode, Opcode, FLAG_IMM};
use graphx_core::register::ireg;
use graphx_core::vm::{Vm, VmStatus};

/// Either a literal 32-bit operand or a forward/backward reference to a label
/// defined elsewhere in the same program. Keeps hand-assembled test programs
/// free of manually counted instruction offsets.
enum Operand {
    Imm(u32),
    Label(&'static str),
}

struct ProgramBuilder {
    opcodes: Vec<(Opcode, u8, u8, u8, Operand)>,
    labels: HashMap<&'static str, usize>,
}

impl ProgramBuilder {
    fn new() -> Self {
        ProgramBuilder {
            opcodes: Vec::new(),
            labels: HashMap::new(),
        }
    }

    fn label(&mut self, name: &'static str) -> &mut Self {
        self.labels.insert(name, self.opcodes.len());
        self
    }

    fn insn(&mut self, opcode: Opcode, flags: u8, dest: u8, src1: u8, imm: u32) -> &mut Self {
        self.opcodes.push((opcode, flags, dest, src1, Operand::Imm(imm)));
        self
    }

    fn branch(&mut self, opcode: Opcode, target: &'static str) -> &mut Self {
        self.opcodes
            .push((opcode, FLAG_IMM, 0, 0, Operand::Label(target)));
        self
    }

    fn assemble(&self) -> Vec<u64> {
        self.opcodes
            .iter()
            .map(|(opcode, flags, dest, src1, operand)| {
                let imm = match operand {
                    Operand::Imm(v) => *v,
                    Operand::Label(name) => *self
                        .labels
                        .get(name)
                        .unwrap_or_else(|| panic!("undefined label {name}"))
                        as u32,
                };
                encode(*opcode, *flags, *dest, *src1, imm)
            })
            .collect()
    }
}

/// The six-node graph shared by S2/S3: `{0-1, 0-2, 0-5, 1-2, 1-3, 2-3, 2-5, 3-4, 4-5}`,
/// undirected. `weights` gives each edge's weight for the SSSP scenario; BFS
/// ignores edge weight entirely.
fn hexnode_graph(weights: bool) -> CsrGraph {
    let w = |value: i32| if weights { value } else { 0 };
    let rows: [&[(i32, i32)]; 6] = [
        &[(1, w(7)), (2, w(9)), (5, w(11))],
        &[(0, w(7)), (2, w(5)), (3, w(13))],
        &[(0, w(9)), (1, w(5)), (3, w(50)), (5, w(20))],
        &[(1, w(13)), (2, w(50)), (4, w(0))],
        &[(3, w(0)), (5, w(9))],
        &[(0, w(11)), (2, w(20)), (4, w(9))],
    ];
    let mut row_index = vec![0i32];
    let mut col_index = Vec::new();
    let mut values = Vec::new();
    for row in rows {
        for &(neighbor, weight) in row {
            col_index.push(neighbor);
            values.push(weight);
        }
        row_index.push(col_index.len() as i32);
    }
    CsrGraph::new(row_index, col_index, values).unwrap()
}

#[test]
fn s1_sum_one_to_five_via_loop() {
    let mut b = ProgramBuilder::new();
    b.insn(Opcode::Mov, FLAG_IMM, ireg::RACC, 0, 0)
        .insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, 1)
        .label("loop")
        .insn(Opcode::Add, 0, ireg::RACC, ireg::RACC, ireg::rtmp(1) as u32)
        .insn(Opcode::Add, FLAG_IMM, ireg::rtmp(1), ireg::rtmp(1), 1)
        .insn(Opcode::Cmp, FLAG_IMM, 0, ireg::rtmp(1), 6)
        .branch(Opcode::Blt, "loop")
        .insn(Opcode::St, FLAG_IMM, ireg::RACC, 0, 0)
        .insn(Opcode::Halt, 0, 0, 0, 0);

    let program = b.assemble();
    let graph = CsrGraph::new(vec![0], vec![], vec![]).unwrap();
    let mut vm = Vm::new(graph, &program, &[]).unwrap();
    assert_eq!(vm.run_to_completion(1_000), VmStatus::Halt);
    assert_eq!(vm.memory.read_int(0), Some(15));
}

#[test]
fn s2_bfs_hop_counts_on_six_node_graph() {
    let mut b = ProgramBuilder::new();
    b.insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, (-1i32) as u32);
    for addr in 1..6u32 {
        b.insn(Opcode::St, FLAG_IMM, ireg::rtmp(1), 0, addr);
    }
    b.insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, 0)
        .insn(Opcode::St, FLAG_IMM, ireg::rtmp(1), 0, 0)
        .insn(Opcode::Mov, FLAG_IMM, ireg::RACC, 0, 0)
        .insn(Opcode::Fpush, 0, ireg::RACC, 0, 0)
        .insn(Opcode::Fswap, 0, 0, 0, 0)
        .insn(Opcode::Mov, FLAG_IMM, ireg::RCORE, 0, 0)
        .label("level")
        .insn(Opcode::Empty, 0, 0, 0, 0)
        .branch(Opcode::Bz, "all_done")
        .label("inner")
        .insn(Opcode::Empty, 0, 0, 0, 0)
        .branch(Opcode::Bz, "swap_level")
        .insn(Opcode::Fpop, 0, ireg::rtmp(1), 0, 0)
        .insn(Opcode::Mov, 0, ireg::RNODE, ireg::rtmp(1), 0)
        .insn(Opcode::Niter, 0, 0, 0, 0)
        .label("neighbor")
        .insn(Opcode::Nnext, 0, 0, 0, 0)
        .branch(Opcode::Bz, "inner")
        .insn(Opcode::Ld, 0, ireg::rtmp(2), ireg::RNBR, 0)
        .insn(Opcode::Cmp, FLAG_IMM, 0, ireg::rtmp(2), (-1i32) as u32)
        .branch(Opcode::Bnz, "neighbor")
        .insn(Opcode::Add, FLAG_IMM, ireg::rtmp(3), ireg::RCORE, 1)
        .insn(Opcode::St, 0, ireg::rtmp(3), ireg::RNBR, 0)
        .insn(Opcode::Fpush, 0, ireg::RNBR, 0, 0)
        .branch(Opcode::Jmp, "neighbor")
        .label("swap_level")
        .insn(Opcode::Fswap, 0, 0, 0, 0)
        .insn(Opcode::Add, FLAG_IMM, ireg::RCORE, ireg::RCORE, 1)
        .branch(Opcode::Jmp, "level")
        .label("all_done")
        .insn(Opcode::Halt, 0, 0, 0, 0);

    let program = b.assemble();
    let mut vm = Vm::new(hexnode_graph(false), &program, &[]).unwrap();
    assert_eq!(vm.run_to_completion(10_000), VmStatus::Halt);

    let hops: Vec<i32> = (0..6).map(|i| vm.memory.read_int(i).unwrap()).collect();
    assert_eq!(hops, vec![0, 1, 1, 2, 2, 1]);
}

#[test]
fn s3_sssp_on_weighted_six_node_graph() {
    let sentinel = 9_999i32;
    let mut b = ProgramBuilder::new();
    b.insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, sentinel as u32);
    for addr in 1..6u32 {
        b.insn(Opcode::St, FLAG_IMM, ireg::rtmp(1), 0, addr);
    }
    b.insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, 0)
        .insn(Opcode::St, FLAG_IMM, ireg::rtmp(1), 0, 0);

    // Bellman-Ford relaxation: six passes (n - 1 would suffice; six is a
    // comfortable round number) over every directed edge via EITER/ENEXT.
    for pass in 0..6 {
        let relax_loop = format!("relax_loop_{pass}");
        let relax_done = format!("relax_done_{pass}");
        let relax_loop: &'static str = Box::leak(relax_loop.into_boxed_str());
        let relax_done: &'static str = Box::leak(relax_done.into_boxed_str());

        b.insn(Opcode::Eiter, 0, 0, 0, 0)
            .label(relax_loop)
            .insn(Opcode::Enext, 0, 0, 0, 0)
            .branch(Opcode::Bz, relax_done)
            .insn(Opcode::Ld, 0, ireg::rtmp(1), ireg::RNODE, 0)
            .insn(Opcode::Ld, 0, ireg::rtmp(2), ireg::RNBR, 0)
            .insn(Opcode::Add, 0, ireg::rtmp(3), ireg::rtmp(1), ireg::RVAL as u32)
            .insn(Opcode::Cmp, 0, 0, ireg::rtmp(3), ireg::rtmp(2) as u32)
            .branch(Opcode::Bge, relax_loop)
            .insn(Opcode::St, 0, ireg::rtmp(3), ireg::RNBR, 0)
            .branch(Opcode::Jmp, relax_loop)
            .label(relax_done);
    }
    b.insn(Opcode::Halt, 0, 0, 0, 0);

    let program = b.assemble();
    let mut vm = Vm::new(hexnode_graph(true), &program, &[]).unwrap();
    assert_eq!(vm.run_to_completion(100_000), VmStatus::Halt);

    let distances: Vec<i32> = (0..6).map(|i| vm.memory.read_int(i).unwrap()).collect();
    assert_eq!(distances, vec![0, 7, 9, 20, 20, 11]);
}

#[test]
fn s4_ffill_then_drain_sums_every_node_id() {
    let mut b = ProgramBuilder::new();
    b.insn(Opcode::Ffill, 0, 0, 0, 0)
        .label("loop")
        .insn(Opcode::Empty, 0, 0, 0, 0)
        .branch(Opcode::Bz, "done")
        .insn(Opcode::Fpop, 0, ireg::rtmp(1), 0, 0)
        .insn(Opcode::Add, 0, ireg::RACC, ireg::RACC, ireg::rtmp(1) as u32)
        .branch(Opcode::Jmp, "loop")
        .label("done")
        .insn(Opcode::St, FLAG_IMM, ireg::RACC, 0, 0)
        .insn(Opcode::Halt, 0, 0, 0, 0);

    let program = b.assemble();
    let mut vm = Vm::new(hexnode_graph(false), &program, &[]).unwrap();
    assert_eq!(vm.run_to_completion(1_000), VmStatus::Halt);
    assert_eq!(vm.memory.read_int(0), Some(15));
}

#[test]
fn s5_vector_dot_product_over_four_lanes() {
    let mut b = ProgramBuilder::new();
    b.insn(Opcode::Vset, FLAG_IMM, 1, 0, 3)
        .insn(Opcode::Vset, FLAG_IMM, 2, 0, 4)
        .insn(Opcode::Vmul, 0, 3, 1, 2)
        .insn(Opcode::Vsum, 0, ireg::RACC, 3, 0)
        .insn(Opcode::St, FLAG_IMM, ireg::RACC, 0, 0)
        .insn(Opcode::Halt, 0, 0, 0, 0);

    let program = b.assemble();
    let graph = CsrGraph::new(vec![0], vec![], vec![]).unwrap();
    let mut vm = Vm::new(graph, &program, &[]).unwrap();
    assert_eq!(vm.run_to_completion(1_000), VmStatus::Halt);
    assert_eq!(vm.memory.read_int(0), Some(48));
}

#[test]
fn s6_divide_by_zero_is_an_error_with_a_clock_of_completed_instructions() {
    let mut b = ProgramBuilder::new();
    b.insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(1), 0, 10)
        .insn(Opcode::Mov, FLAG_IMM, ireg::rtmp(2), 0, 0)
        .insn(Opcode::Div, 0, ireg::rtmp(3), ireg::rtmp(1), ireg::rtmp(2) as u32)
        .insn(Opcode::Halt, 0, 0, 0, 0);

    let program = b.assemble();
    let graph = CsrGraph::new(vec![0], vec![], vec![]).unwrap();
    let mut vm = Vm::new(graph, &program, &[]).unwrap();
    let status = vm.run_to_completion(10);
    assert!(matches!(
        status,
        VmStatus::Error(graphx_core::vm::VmError::Exec(
            graphx_core::exec::ExecError::DivideByZero
        ))
    ));
    assert_eq!(vm.registers.clock, 2);
}
