//! Per-block scheduling driver.
//!
//! [`InstructionScheduler`] owns the configuration and the shared latency
//! table of one shader and runs the full pipeline for each basic block:
//! dependency graph, pressure tracker seeding, list scheduling and
//! reordering. Blocks are independent, so
//! [`schedule_blocks`](InstructionScheduler::schedule_blocks) runs them in
//! parallel.

use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    ir::Instruction,
    schedule::{
        events::{EventKind, EventLog},
        BarrierReason, DependencyGraphBuilder, LatencyCache, LatencyKey, LatencyModel,
        RegisterPressureTracker, Scheduler, SchedulerConfig,
    },
    utils::BitSet,
    Result,
};

/// One basic block handed to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ShaderBlock {
    /// Block number, used to tag events.
    pub index: usize,
    /// Instructions in program order.
    pub instructions: Vec<Instruction>,
    /// Virtual registers live on entry.
    pub live_in: BitSet,
    /// Virtual registers live on exit.
    pub live_out: BitSet,
}

impl ShaderBlock {
    /// Creates a block with empty live sets.
    #[must_use]
    pub fn new(index: usize, instructions: Vec<Instruction>) -> Self {
        ShaderBlock {
            index,
            instructions,
            live_in: BitSet::default(),
            live_out: BitSet::default(),
        }
    }

    /// Sets the live sets at the block boundaries.
    #[must_use]
    pub fn with_liveness(mut self, live_in: BitSet, live_out: BitSet) -> Self {
        self.live_in = live_in;
        self.live_out = live_out;
        self
    }
}

/// Statistics of one scheduled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleSummary {
    /// Logical clock at the end of the block.
    pub logical_cycles: u32,
    /// Physical clock at the end of the block.
    pub physical_cycles: u32,
    /// Clock of the configured mode at the end of the block.
    pub estimated_cycles: u32,
    /// Nodes chosen with the panic weights.
    pub panic_picks: usize,
    /// Math instructions that pushed back other math instructions.
    pub math_stalls: usize,
    /// Dependency edges in the block's graph.
    pub edge_count: usize,
    /// Serialized nodes.
    pub barrier_count: usize,
}

/// A block after scheduling.
#[derive(Debug, Clone)]
pub struct ScheduledBlock {
    /// Block number.
    pub index: usize,
    /// Reordered instructions.
    pub instructions: Vec<Instruction>,
    /// Original position of each reordered instruction.
    pub order: Vec<usize>,
    /// Scheduling statistics.
    pub summary: ScheduleSummary,
}

impl ScheduledBlock {
    /// Returns `true` if scheduling kept program order.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.order.iter().enumerate().all(|(pos, &index)| pos == index)
    }
}

/// Schedules the basic blocks of one shader.
///
/// # Examples
///
/// ```rust
/// use gensched::ir::{Instruction, Opcode, Operand};
/// use gensched::schedule::{InstructionScheduler, SchedulerConfig, ShaderBlock};
///
/// let scheduler = InstructionScheduler::new(SchedulerConfig::default())?
///     .with_vreg_sizes(vec![1, 1]);
///
/// let block = ShaderBlock::new(0, vec![
///     Instruction::build(Opcode::Mov).dst(Operand::vgrf(0, 0)).src0(Operand::Immediate(7)).build(),
///     Instruction::build(Opcode::Add).dst(Operand::vgrf(1, 0)).src0(Operand::vgrf(0, 0)).build(),
/// ]);
///
/// let scheduled = scheduler.schedule_block(&block)?;
/// assert_eq!(scheduled.order, vec![0, 1]);
/// # Ok::<(), gensched::Error>(())
/// ```
#[derive(Debug)]
pub struct InstructionScheduler {
    config: SchedulerConfig,
    latencies: Arc<LatencyCache>,
    model: LatencyModel,
    vreg_sizes: Vec<u32>,
    events: EventLog,
}

impl InstructionScheduler {
    /// Creates a scheduler with a private latency cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if `config` does not
    /// validate.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_latency_cache(config, Arc::new(LatencyCache::new()))
    }

    /// Creates a scheduler sharing `latencies` with other schedulers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if `config` does not
    /// validate.
    pub fn with_latency_cache(config: SchedulerConfig, latencies: Arc<LatencyCache>) -> Result<Self> {
        config.validate()?;
        let model = LatencyModel::new(latencies.table(LatencyKey::from_config(&config)))
            .with_flavor(config.flavor);
        Ok(InstructionScheduler {
            config,
            latencies,
            model,
            vreg_sizes: Vec::new(),
            events: EventLog::new(),
        })
    }

    /// Sets the size table of the shader's virtual registers.
    #[must_use]
    pub fn with_vreg_sizes(mut self, sizes: Vec<u32>) -> Self {
        self.vreg_sizes = sizes;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns the events recorded so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Returns the latency model in use.
    #[must_use]
    pub fn latency_model(&self) -> &LatencyModel {
        &self.model
    }

    /// Returns the shared latency cache.
    #[must_use]
    pub fn latency_cache(&self) -> &Arc<LatencyCache> {
        &self.latencies
    }

    /// Returns the virtual register size table.
    #[must_use]
    pub fn vreg_sizes(&self) -> &[u32] {
        &self.vreg_sizes
    }

    /// Schedules one block.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for operands the dependency
    /// builder cannot place, and [`crate::Error::GraphError`] or
    /// [`crate::Error::SchedulingStalled`] if the block's graph violates
    /// its invariants. The failure is also recorded as an error event.
    pub fn schedule_block(&self, block: &ShaderBlock) -> Result<ScheduledBlock> {
        let result = self.schedule_block_inner(block);
        if let Err(err) = &result {
            self.events
                .record(EventKind::Error)
                .block(block.index)
                .message(err.to_string());
        }
        result
    }

    /// Schedules every block in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first error of any block; see
    /// [`schedule_block`](Self::schedule_block).
    pub fn schedule_blocks(&self, blocks: &[ShaderBlock]) -> Result<Vec<ScheduledBlock>> {
        blocks
            .par_iter()
            .map(|block| self.schedule_block(block))
            .collect()
    }

    fn schedule_block_inner(&self, block: &ShaderBlock) -> Result<ScheduledBlock> {
        let builder = DependencyGraphBuilder::new(&self.config, &self.model, &self.vreg_sizes);
        let (graph, report) = builder.build_with_report(&block.instructions)?;

        for &(id, reason) in &report.barriers {
            let kind = match reason {
                BarrierReason::UnmodeledOperand => EventKind::UnmodeledOperand,
                _ => EventKind::BarrierInserted,
            };
            self.events
                .record(kind)
                .at(block.index, id)
                .message(format!("{} ({reason})", graph.node(id).instruction()));
        }

        let direction = self.config.direction();
        let tracker = if self.config.tracks_pressure() {
            let mut tracker = RegisterPressureTracker::new(&self.vreg_sizes);
            tracker.seed(&block.instructions, &block.live_in, &block.live_out, direction);
            tracker
        } else {
            RegisterPressureTracker::disabled()
        };

        let schedule = Scheduler::new(&graph, &self.config, tracker)
            .with_events(&self.events, block.index)
            .run()?;
        debug_assert!(graph.is_order_valid(&schedule.order));

        let order: Vec<usize> = schedule.order.iter().map(|id| id.index()).collect();
        let instructions = order
            .iter()
            .map(|&index| block.instructions[index].clone())
            .collect();

        let summary = ScheduleSummary {
            logical_cycles: schedule.logical_cycles,
            physical_cycles: schedule.physical_cycles,
            estimated_cycles: schedule.cycles(self.config.uses_physical_latency()),
            panic_picks: schedule.panic_picks,
            math_stalls: schedule.math_stalls,
            edge_count: graph.edge_count(),
            barrier_count: report.barriers.len(),
        };

        self.events
            .record(EventKind::BlockScheduled)
            .block(block.index)
            .message(format!(
                "{} instructions, {} edges, {} cycles ({direction:?})",
                order.len(),
                summary.edge_count,
                summary.estimated_cycles
            ));

        Ok(ScheduledBlock {
            index: block.index,
            instructions,
            order,
            summary,
        })
    }
}
