//! # gensched Prelude
//!
//! Convenient re-exports of the types needed to describe blocks and
//! schedule them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all gensched operations
pub use crate::Error;

/// The result type used throughout gensched
pub use crate::Result;

// ================================================================================================
// Instruction Representation
// ================================================================================================

/// Instructions and their builder
pub use crate::ir::{Instruction, InstructionBuilder, InstructionFlags};

/// Opcodes and operands
pub use crate::ir::{Opcode, Operand, RegRef, RegisterFile};

// ================================================================================================
// Scheduling
// ================================================================================================

/// Per-block driver and its inputs and outputs
pub use crate::schedule::{InstructionScheduler, ScheduleSummary, ScheduledBlock, ShaderBlock};

/// Configuration
pub use crate::schedule::{
    AllocationMode, Direction, Flavor, Generation, SchedulerConfig, ScoreWeights, SimdWidth,
};

/// Lower-level building blocks
pub use crate::schedule::{
    DependencyGraph, DependencyGraphBuilder, LatencyCache, LatencyModel, RegisterPressureTracker,
    Schedule, Scheduler,
};

/// Diagnostics
pub use crate::schedule::{EventKind, EventLog};

// ================================================================================================
// Utilities
// ================================================================================================

/// Live sets and node identifiers
pub use crate::utils::{graph::NodeId, BitSet};
