use std::fmt;

use bitflags::bitflags;

use crate::ir::{Opcode, Operand};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Scheduling-relevant properties of an instruction
    pub struct InstructionFlags: u16 {
        /// Has effects outside its destination (memory writes, atomics);
        /// serialized against every other instruction of the block
        const SIDE_EFFECTS = 0x0001;
        /// Reads a flag subregister (predication, conditional select)
        const READS_FLAG = 0x0002;
        /// Writes a flag subregister (conditional modifier)
        const WRITES_FLAG = 0x0004;
        /// Reads the accumulator without naming it as a source
        const READS_ACCUMULATOR = 0x0008;
        /// Writes the accumulator as a side product
        const WRITES_ACCUMULATOR = 0x0010;
        /// Structured control flow
        const CONTROL_FLOW = 0x0020;
        /// Executes on the extended math unit
        const MATH = 0x0040;
    }
}

/// One machine instruction of a basic block.
///
/// Produced by the lowering pass and treated as immutable by the scheduler,
/// which only reorders instructions and never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Operation
    pub opcode: Opcode,
    /// Destination operand
    pub dst: Operand,
    /// Source operands; unused slots hold [`Operand::None`]
    pub src: [Operand; 3],
    /// Scheduling properties
    pub flags: InstructionFlags,
    /// Flag subregister read or written, 0 or 1
    pub flag_subreg: u8,
    /// First message register of the payload, for send-style instructions
    /// that build their payload in the message file
    pub base_mrf: Option<u32>,
    /// Payload length in registers
    pub mlen: u32,
    /// Message registers clobbered by the send beyond its payload
    pub implied_mrf_writes: u32,
    /// Execution width in channels (8 or 16)
    pub exec_size: u8,
}

impl Instruction {
    /// Starts building an instruction with the properties implied by
    /// `opcode`.
    #[must_use]
    pub fn build(opcode: Opcode) -> InstructionBuilder {
        InstructionBuilder::new(opcode)
    }

    /// Returns `true` if the instruction has effects beyond its destination.
    #[must_use]
    pub fn has_side_effects(&self) -> bool {
        self.flags.contains(InstructionFlags::SIDE_EFFECTS)
    }

    /// Returns `true` if the instruction must be serialized against every
    /// other instruction of the block.
    #[must_use]
    pub fn is_barrier(&self) -> bool {
        self.has_side_effects() || self.opcode == Opcode::PlaceholderHalt
    }

    /// Returns `true` if the instruction reads its flag subregister.
    #[must_use]
    pub fn reads_flag(&self) -> bool {
        self.flags.contains(InstructionFlags::READS_FLAG)
    }

    /// Returns `true` if the instruction writes its flag subregister.
    #[must_use]
    pub fn writes_flag(&self) -> bool {
        self.flags.contains(InstructionFlags::WRITES_FLAG)
    }

    /// Returns `true` if the instruction reads the accumulator implicitly.
    #[must_use]
    pub fn reads_accumulator_implicitly(&self) -> bool {
        self.flags.contains(InstructionFlags::READS_ACCUMULATOR)
    }

    /// Returns `true` if the instruction writes the accumulator.
    #[must_use]
    pub fn writes_accumulator(&self) -> bool {
        self.flags.contains(InstructionFlags::WRITES_ACCUMULATOR)
    }

    /// Returns `true` for control-flow instructions.
    #[must_use]
    pub fn is_control_flow(&self) -> bool {
        self.flags.contains(InstructionFlags::CONTROL_FLOW)
    }

    /// Returns `true` for instructions executed by the extended math unit.
    #[must_use]
    pub fn is_math(&self) -> bool {
        self.flags.contains(InstructionFlags::MATH)
    }

    /// Returns `true` for SIMD16 instructions, which issue as two halves.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.exec_size > 8
    }

    /// Returns the message registers read as payload, if any.
    ///
    /// The range is widened so that `base_mrf + mlen` cannot wrap.
    #[must_use]
    pub fn payload_mrfs(&self) -> std::ops::Range<u64> {
        match self.base_mrf {
            Some(base) if self.mlen > 0 => u64::from(base)..u64::from(base) + u64::from(self.mlen),
            _ => 0..0,
        }
    }

    /// Returns the message registers written as a side effect of issuing
    /// the send, if any.
    #[must_use]
    pub fn implied_mrfs(&self) -> std::ops::Range<u64> {
        match self.base_mrf {
            Some(base) => u64::from(base)..u64::from(base) + u64::from(self.implied_mrf_writes),
            None => 0..0,
        }
    }

    /// Returns an iterator over the occupied source slots.
    pub fn sources(&self) -> impl Iterator<Item = &Operand> {
        self.src.iter().filter(|op| !op.is_none())
    }

    /// Returns `true` if any operand has no dependency model.
    #[must_use]
    pub fn touches_unmodeled(&self) -> bool {
        self.dst.is_unmodeled() || self.src.iter().any(Operand::is_unmodeled)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if self.exec_size != 8 {
            write!(f, "({})", self.exec_size)?;
        }
        if !self.dst.is_none() {
            write!(f, " {}", self.dst)?;
        }
        for src in self.sources() {
            write!(f, " {src}")?;
        }
        if let Some(base) = self.base_mrf {
            if self.mlen > 0 {
                write!(f, " m{base} mlen {}", self.mlen)?;
            }
        }
        Ok(())
    }
}

/// Fluent constructor for [`Instruction`].
///
/// # Examples
///
/// ```rust
/// use gensched::ir::{Instruction, Opcode, Operand};
///
/// let add = Instruction::build(Opcode::Add)
///     .dst(Operand::vgrf(2, 0))
///     .src0(Operand::vgrf(0, 0))
///     .src1(Operand::vgrf(1, 0))
///     .build();
///
/// assert_eq!(add.to_string(), "add vgrf2.0 vgrf0.0 vgrf1.0");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct InstructionBuilder {
    inst: Instruction,
}

impl InstructionBuilder {
    fn new(opcode: Opcode) -> Self {
        InstructionBuilder {
            inst: Instruction {
                opcode,
                dst: Operand::None,
                src: [Operand::None; 3],
                flags: opcode.implied_flags(),
                flag_subreg: 0,
                base_mrf: None,
                mlen: 0,
                implied_mrf_writes: 0,
                exec_size: 8,
            },
        }
    }

    /// Sets the destination.
    pub fn dst(mut self, dst: Operand) -> Self {
        self.inst.dst = dst;
        self
    }

    /// Sets the first source.
    pub fn src0(mut self, src: Operand) -> Self {
        self.inst.src[0] = src;
        self
    }

    /// Sets the second source.
    pub fn src1(mut self, src: Operand) -> Self {
        self.inst.src[1] = src;
        self
    }

    /// Sets the third source.
    pub fn src2(mut self, src: Operand) -> Self {
        self.inst.src[2] = src;
        self
    }

    /// Marks the instruction as having side effects.
    pub fn side_effects(mut self) -> Self {
        self.inst.flags |= InstructionFlags::SIDE_EFFECTS;
        self
    }

    /// Adds a flag read of `subreg`.
    pub fn reads_flag(mut self, subreg: u8) -> Self {
        self.inst.flags |= InstructionFlags::READS_FLAG;
        self.inst.flag_subreg = subreg;
        self
    }

    /// Adds a flag write of `subreg`.
    pub fn writes_flag(mut self, subreg: u8) -> Self {
        self.inst.flags |= InstructionFlags::WRITES_FLAG;
        self.inst.flag_subreg = subreg;
        self
    }

    /// Adds an implicit accumulator read.
    pub fn reads_accumulator(mut self) -> Self {
        self.inst.flags |= InstructionFlags::READS_ACCUMULATOR;
        self
    }

    /// Adds an accumulator write.
    pub fn writes_accumulator(mut self) -> Self {
        self.inst.flags |= InstructionFlags::WRITES_ACCUMULATOR;
        self
    }

    /// Adds arbitrary flags.
    pub fn flags(mut self, flags: InstructionFlags) -> Self {
        self.inst.flags |= flags;
        self
    }

    /// Sets the message payload: `mlen` registers starting at `base_mrf`.
    pub fn message(mut self, base_mrf: u32, mlen: u32) -> Self {
        self.inst.base_mrf = Some(base_mrf);
        self.inst.mlen = mlen;
        self
    }

    /// Sets the number of message registers the send clobbers.
    pub fn implied_mrf_writes(mut self, count: u32) -> Self {
        self.inst.implied_mrf_writes = count;
        self
    }

    /// Sets the execution width.
    pub fn exec_size(mut self, size: u8) -> Self {
        self.inst.exec_size = size;
        self
    }

    /// Finishes the instruction.
    #[must_use]
    pub fn build(self) -> Instruction {
        self.inst
    }
}
