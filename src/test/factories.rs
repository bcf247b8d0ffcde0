//! Factory methods for scheduler test blocks.
//!
//! The synthetic generators draw from a fixed linear congruential sequence,
//! so a given seed always produces the same block.

use crate::ir::{Instruction, Opcode, Operand};

/// Small deterministic pseudo-random source.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    pub fn next(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, bound: u32) -> u32 {
        self.next() % bound.max(1)
    }
}

/// `mov dst, imm`
pub fn mov_imm(dst: Operand, imm: u32) -> Instruction {
    Instruction::build(Opcode::Mov)
        .dst(dst)
        .src0(Operand::Immediate(imm))
        .build()
}

/// Two-source ALU instruction.
pub fn alu(opcode: Opcode, dst: Operand, src0: Operand, src1: Operand) -> Instruction {
    Instruction::build(opcode)
        .dst(dst)
        .src0(src0)
        .src1(src1)
        .build()
}

/// `[v0 = 1; v1 = v0 + 2; v2 = v1 * v1]`
pub fn chain_block() -> Vec<Instruction> {
    vec![
        mov_imm(Operand::vgrf(0, 0), 1),
        alu(
            Opcode::Add,
            Operand::vgrf(1, 0),
            Operand::vgrf(0, 0),
            Operand::Immediate(2),
        ),
        alu(
            Opcode::Mul,
            Operand::vgrf(2, 0),
            Operand::vgrf(1, 0),
            Operand::vgrf(1, 0),
        ),
    ]
}

/// Size table of `count` single-register virtual registers.
pub fn unit_sizes(count: usize) -> Vec<u32> {
    vec![1; count]
}

/// Random block over `vregs` single-register virtual registers.
pub fn virtual_block(seed: u64, len: usize, vregs: u32) -> Vec<Instruction> {
    synthetic_block(seed, len, vregs, |nr| Operand::vgrf(nr, 0))
}

/// Random block over general registers `0..regs`.
pub fn allocated_block(seed: u64, len: usize, regs: u32) -> Vec<Instruction> {
    synthetic_block(seed, len, regs, Operand::grf)
}

fn synthetic_block(
    seed: u64,
    len: usize,
    regs: u32,
    reg: impl Fn(u32) -> Operand,
) -> Vec<Instruction> {
    let mut rng = Lcg::new(seed);
    let mut block = Vec::with_capacity(len);

    for _ in 0..len {
        let dst = reg(rng.below(regs));
        let a = reg(rng.below(regs));
        let b = reg(rng.below(regs));

        let inst = match rng.below(16) {
            0..=5 => alu(Opcode::Add, dst, a, b),
            6..=7 => alu(Opcode::Mul, dst, a, Operand::Uniform(rng.below(4))),
            8 => mov_imm(dst, rng.next()),
            9 => Instruction::build(Opcode::Sqrt).dst(dst).src0(a).build(),
            10 => Instruction::build(Opcode::Cmp)
                .src0(a)
                .src1(b)
                .writes_flag(0)
                .build(),
            11 => Instruction::build(Opcode::Sel)
                .dst(dst)
                .src0(a)
                .src1(b)
                .reads_flag(0)
                .build(),
            12 => Instruction::build(Opcode::Mov)
                .dst(Operand::mrf(2 + rng.below(2)))
                .src0(a)
                .build(),
            13 => Instruction::build(Opcode::Tex)
                .dst(dst)
                .message(2, 2)
                .implied_mrf_writes(1)
                .build(),
            14 => Instruction::build(Opcode::Mad)
                .dst(dst)
                .src0(a)
                .src1(b)
                .src2(reg(rng.below(regs)))
                .build(),
            _ if rng.below(4) == 0 => Instruction::build(Opcode::ScratchWrite)
                .src0(a)
                .message(4, 1)
                .build(),
            _ => alu(Opcode::Xor, dst, a, b),
        };
        block.push(inst);
    }
    block
}
