use strum::{EnumCount, EnumIter, IntoStaticStr};

use crate::ir::InstructionFlags;

/// Machine opcodes understood by the scheduler.
///
/// The scheduler never interprets what an opcode computes. It only needs to
/// know which latency bucket an opcode falls into and which properties the
/// lowering pass implies for it (control flow, math unit, memory side
/// effects). Anything not listed specifically falls into the default ALU
/// bucket of the latency model.
///
/// ## Opcode Families
///
/// ### Arithmetic and Logic
/// - **`Mov`**, **`Sel`**, **`Not`**, **`And`**, **`Or`**, **`Xor`**, **`Shl`**, **`Shr`**, **`Asr`**
/// - **`Cmp`**, **`Add`**, **`Mul`**, **`Mac`**, **`Mach`**, **`Mad`**, **`Lrp`**, **`Dp4`**
/// - **`Frc`**, **`Rndd`**, **`Rnde`**, **`Rndz`**, **`Bfrev`**, **`Lzd`**
///
/// ### Extended Math
/// - **`Rcp`**, **`Rsq`**, **`Sqrt`**, **`Exp2`**, **`Log2`**, **`Sin`**, **`Cos`**, **`Pow`**
/// - **`IntQuotient`**, **`IntRemainder`**
///
/// ### Sampler Messages
/// - **`Tex`**, **`Txb`**, **`Txd`**, **`Txf`**, **`Txl`**, **`Txs`**, **`Lod`**, **`Tg4`**
/// - **`VaryingPullConstantLoad`**, **`UniformPullConstantLoad`**
///
/// ### Memory Messages
/// - **`ScratchRead`**, **`ScratchWrite`**, **`UntypedAtomic`**, **`UntypedSurfaceRead`**
/// - **`FbWrite`**
///
/// ### Control Flow
/// - **`If`**, **`Else`**, **`EndIf`**, **`Do`**, **`While`**, **`Break`**, **`Continue`**
/// - **`PlaceholderHalt`**: shader-exit placeholder patched after code emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum Opcode {
    Mov,
    Sel,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Asr,
    Cmp,
    Add,
    Mul,
    Mac,
    Mach,
    Mad,
    Lrp,
    Dp4,
    Frc,
    Rndd,
    Rnde,
    Rndz,
    Bfrev,
    Lzd,

    Rcp,
    Rsq,
    Sqrt,
    Exp2,
    Log2,
    Sin,
    Cos,
    Pow,
    IntQuotient,
    IntRemainder,

    Tex,
    Txb,
    Txd,
    Txf,
    Txl,
    Txs,
    Lod,
    Tg4,
    VaryingPullConstantLoad,
    UniformPullConstantLoad,

    ScratchRead,
    ScratchWrite,
    UntypedAtomic,
    UntypedSurfaceRead,
    FbWrite,

    If,
    Else,
    EndIf,
    Do,
    While,
    Break,
    Continue,
    PlaceholderHalt,

    Nop,
}

impl Opcode {
    /// Returns the assembly mnemonic, e.g. `"int_quotient"`.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Returns the multiplier applied to the base math latency, or `None` if
    /// this opcode does not run on the extended math unit.
    #[must_use]
    pub const fn math_multiplier(self) -> Option<u32> {
        match self {
            Opcode::Rcp => Some(1),
            Opcode::Rsq => Some(2),
            Opcode::Sqrt | Opcode::Log2 | Opcode::IntQuotient => Some(3),
            Opcode::Exp2 | Opcode::IntRemainder => Some(4),
            Opcode::Sin | Opcode::Cos => Some(5),
            Opcode::Pow => Some(8),
            _ => None,
        }
    }

    /// Returns `true` for opcodes executed by the extended math unit.
    #[must_use]
    pub const fn is_math(self) -> bool {
        self.math_multiplier().is_some()
    }

    /// Returns `true` for messages handled by the sampler.
    #[must_use]
    pub const fn is_sampler(self) -> bool {
        matches!(
            self,
            Opcode::Tex
                | Opcode::Txb
                | Opcode::Txd
                | Opcode::Txf
                | Opcode::Txl
                | Opcode::Txs
                | Opcode::Lod
                | Opcode::Tg4
                | Opcode::VaryingPullConstantLoad
                | Opcode::UniformPullConstantLoad
        )
    }

    /// Returns `true` for send-style opcodes that hand a message payload to a
    /// shared function.
    #[must_use]
    pub const fn is_send(self) -> bool {
        self.is_sampler()
            || matches!(
                self,
                Opcode::ScratchRead
                    | Opcode::ScratchWrite
                    | Opcode::UntypedAtomic
                    | Opcode::UntypedSurfaceRead
                    | Opcode::FbWrite
            )
    }

    /// Returns `true` for structured control-flow opcodes.
    #[must_use]
    pub const fn is_control_flow(self) -> bool {
        matches!(
            self,
            Opcode::If
                | Opcode::Else
                | Opcode::EndIf
                | Opcode::Do
                | Opcode::While
                | Opcode::Break
                | Opcode::Continue
                | Opcode::PlaceholderHalt
        )
    }

    /// Returns the properties lowering attaches to every instance of this
    /// opcode. The instruction builder starts from these.
    #[must_use]
    pub fn implied_flags(self) -> InstructionFlags {
        let mut flags = InstructionFlags::empty();
        if self.is_math() {
            flags |= InstructionFlags::MATH;
        }
        if self.is_control_flow() {
            flags |= InstructionFlags::CONTROL_FLOW;
        }
        if matches!(
            self,
            Opcode::ScratchWrite | Opcode::UntypedAtomic | Opcode::FbWrite
        ) {
            flags |= InstructionFlags::SIDE_EFFECTS;
        }
        if matches!(self, Opcode::Mac | Opcode::Mach) {
            flags |= InstructionFlags::READS_ACCUMULATOR;
        }
        flags
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_mnemonics_are_snake_case() {
        assert_eq!(Opcode::Mad.mnemonic(), "mad");
        assert_eq!(Opcode::IntQuotient.mnemonic(), "int_quotient");
        assert_eq!(Opcode::PlaceholderHalt.to_string(), "placeholder_halt");
    }

    #[test]
    fn test_math_multipliers() {
        assert_eq!(Opcode::Rcp.math_multiplier(), Some(1));
        assert_eq!(Opcode::Rsq.math_multiplier(), Some(2));
        assert_eq!(Opcode::Sqrt.math_multiplier(), Some(3));
        assert_eq!(Opcode::Exp2.math_multiplier(), Some(4));
        assert_eq!(Opcode::Cos.math_multiplier(), Some(5));
        assert_eq!(Opcode::Pow.math_multiplier(), Some(8));
        assert_eq!(Opcode::Add.math_multiplier(), None);
    }

    #[test]
    fn test_families_are_disjoint() {
        for op in Opcode::iter() {
            let families = [op.is_math(), op.is_send(), op.is_control_flow()]
                .iter()
                .filter(|&&b| b)
                .count();
            assert!(families <= 1, "{op} belongs to more than one family");
        }
    }

    #[test]
    fn test_implied_flags() {
        assert!(Opcode::Sin.implied_flags().contains(InstructionFlags::MATH));
        assert!(Opcode::While
            .implied_flags()
            .contains(InstructionFlags::CONTROL_FLOW));
        assert!(Opcode::UntypedAtomic
            .implied_flags()
            .contains(InstructionFlags::SIDE_EFFECTS));
        assert!(Opcode::Tex.implied_flags().is_empty());
        assert!(Opcode::Add.implied_flags().is_empty());
    }
}
