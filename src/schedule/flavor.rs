//! Instruction-set flavors.
//!
//! The scalar (SIMD8/SIMD16 per-channel) and vec4 (SIMD4x2) backends share
//! one scheduler. The few places where they differ are gathered in
//! [`Flavor`], which is selected once per block:
//!
//! - issue cycles
//! - granularity of virtual register dependency tracking
//! - which heuristic chooses the next node for a direction

use crate::{
    ir::Instruction,
    schedule::{Direction, Heuristic},
};

/// Instruction-set flavor of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    /// Per-channel scalar code (fragment and compute shaders).
    #[default]
    Scalar,
    /// Vec4 code, two vertices per hardware thread.
    Vec4,
}

/// How virtual registers are split into dependency-tracking resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualGranularity {
    /// One resource per register of each virtual register.
    PerRegister,
    /// One resource per whole virtual register.
    PerVirtualRegister,
}

impl Flavor {
    /// Cycles needed to dispatch `inst`.
    ///
    /// Scalar instructions issue in two cycles per SIMD8 half, so compressed
    /// SIMD16 instructions take four. Vec4 instructions always execute as
    /// two vec4 halves in parallel.
    #[must_use]
    pub fn issue_cycles(self, inst: &Instruction) -> u32 {
        match self {
            Flavor::Scalar if inst.is_compressed() => 4,
            Flavor::Scalar => 2,
            Flavor::Vec4 => 2,
        }
    }

    /// Granularity of virtual-register tracking before allocation.
    ///
    /// Vec4 code writes virtual registers through swizzled, partial writes
    /// that the builder cannot split, so it tracks them whole.
    #[must_use]
    pub fn virtual_granularity(self) -> VirtualGranularity {
        match self {
            Flavor::Scalar => VirtualGranularity::PerRegister,
            Flavor::Vec4 => VirtualGranularity::PerVirtualRegister,
        }
    }

    /// Heuristic choosing the next ready node when scheduling in
    /// `direction`.
    #[must_use]
    pub fn heuristic(self, direction: Direction) -> Heuristic {
        match (self, direction) {
            (_, Direction::TopDown) => Heuristic::EarliestReady,
            (Flavor::Scalar, Direction::BottomUp) => Heuristic::WeightedBottomUp,
            (Flavor::Vec4, Direction::BottomUp) => Heuristic::SimplifiedBottomUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Opcode;

    #[test]
    fn test_issue_cycles() {
        let simd8 = Instruction::build(Opcode::Add).build();
        let simd16 = Instruction::build(Opcode::Add).exec_size(16).build();

        assert_eq!(Flavor::Scalar.issue_cycles(&simd8), 2);
        assert_eq!(Flavor::Scalar.issue_cycles(&simd16), 4);
        assert_eq!(Flavor::Vec4.issue_cycles(&simd8), 2);
    }

    #[test]
    fn test_heuristic_selection() {
        assert_eq!(
            Flavor::Scalar.heuristic(Direction::BottomUp),
            Heuristic::WeightedBottomUp
        );
        assert_eq!(
            Flavor::Vec4.heuristic(Direction::BottomUp),
            Heuristic::SimplifiedBottomUp
        );
        assert_eq!(
            Flavor::Vec4.heuristic(Direction::TopDown),
            Heuristic::EarliestReady
        );
    }

    #[test]
    fn test_virtual_granularity() {
        assert_eq!(
            Flavor::Vec4.virtual_granularity(),
            VirtualGranularity::PerVirtualRegister
        );
        assert_eq!(
            Flavor::Scalar.virtual_granularity(),
            VirtualGranularity::PerRegister
        );
    }
}
