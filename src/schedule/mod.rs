//! Basic-block instruction scheduling.
//!
//! Scheduling a block runs four stages:
//!
//! 1. [`DependencyGraphBuilder`] walks the instructions and records every
//!    read-after-write, write-after-write and write-after-read hazard as an
//!    edge of a [`DependencyGraph`], together with each node's critical-path
//!    delay.
//! 2. Before register allocation, a [`RegisterPressureTracker`] is seeded
//!    with the block's reference counts and live sets.
//! 3. The [`Scheduler`] drains the graph through a ready list, asking the
//!    [`Heuristic`] selected by the block's [`Flavor`] for the next node.
//! 4. [`InstructionScheduler`] reorders the block and reports a
//!    [`ScheduleSummary`].
//!
//! Before register allocation the scheduler runs bottom-up and trades
//! latency for register pressure; after allocation it runs top-down against
//! physical latencies from the [`LatencyModel`].
//!
//! # Examples
//!
//! ```rust
//! use gensched::ir::{Instruction, Opcode, Operand};
//! use gensched::schedule::{Generation, InstructionScheduler, SchedulerConfig, ShaderBlock};
//!
//! let config = SchedulerConfig::post_allocation(Generation::new(7));
//! let scheduler = InstructionScheduler::new(config)?;
//!
//! let block = ShaderBlock::new(0, vec![
//!     Instruction::build(Opcode::Tex).dst(Operand::grf(10).spanning(4)).message(2, 1).build(),
//!     Instruction::build(Opcode::Add).dst(Operand::grf(20)).src0(Operand::grf(10)).build(),
//!     Instruction::build(Opcode::Mov).dst(Operand::grf(30)).src0(Operand::Immediate(0)).build(),
//! ]);
//!
//! // The independent move fills the sampler latency.
//! let scheduled = scheduler.schedule_block(&block)?;
//! assert_eq!(scheduled.order, vec![0, 2, 1]);
//! # Ok::<(), gensched::Error>(())
//! ```

mod config;
mod dag;
mod deps;
mod driver;
pub mod events;
mod flavor;
mod heuristic;
mod latency;
mod pressure;
mod scheduler;

pub use config::{
    AllocationMode, Direction, FactorScales, Generation, RegisterBudget, SchedulerConfig,
    ScoreWeights, SimdWidth,
};
pub use dag::{DependencyEdge, DependencyGraph, ScheduleNode};
pub use deps::{BarrierReason, BuildReport, DependencyGraphBuilder, FLAG_SUBREGS, MRF_COUNT};
pub use driver::{InstructionScheduler, ScheduleSummary, ScheduledBlock, ShaderBlock};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use flavor::{Flavor, VirtualGranularity};
pub use heuristic::{Heuristic, ScoreFactors, SelectionContext};
pub use latency::{Latency, LatencyCache, LatencyKey, LatencyModel, LatencyTable};
pub use pressure::RegisterPressureTracker;
pub use scheduler::{Schedule, Scheduler, SchedulerState};
