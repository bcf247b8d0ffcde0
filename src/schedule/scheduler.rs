//! List scheduler.
//!
//! [`Scheduler`] drains a [`DependencyGraph`] through a ready list. Each
//! step asks the block's [`Heuristic`] for a ready node, emits it, advances
//! both clocks and releases the nodes that depended on it. Bottom-up
//! scheduling emits the block back to front and reverses the order at the
//! end.

use crate::{
    schedule::{
        events::{EventKind, EventLog},
        DependencyGraph, Direction, Heuristic, RegisterPressureTracker, SchedulerConfig,
        SelectionContext,
    },
    utils::{graph::NodeId, BitSet},
    Error, Result,
};

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed; the ready list has not been seeded.
    Building,
    /// Seeded; nodes are being emitted.
    Draining,
    /// The ready list ran empty.
    Done,
}

/// Result of scheduling one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Nodes in final program order.
    pub order: Vec<NodeId>,
    /// Logical clock after the last node issued.
    pub logical_cycles: u32,
    /// Physical clock after the last node issued.
    pub physical_cycles: u32,
    /// Nodes chosen with the panic weights.
    pub panic_picks: usize,
    /// Math instructions that pushed back other math instructions.
    pub math_stalls: usize,
}

impl Schedule {
    /// Returns the clock the block was scheduled against.
    #[must_use]
    pub fn cycles(&self, physical: bool) -> u32 {
        if physical {
            self.physical_cycles
        } else {
            self.logical_cycles
        }
    }
}

/// Schedules the nodes of one dependency graph.
///
/// # Examples
///
/// ```rust
/// use gensched::ir::{Instruction, Opcode, Operand};
/// use gensched::schedule::{
///     DependencyGraphBuilder, LatencyModel, RegisterPressureTracker, Scheduler, SchedulerConfig,
/// };
///
/// let config = SchedulerConfig::default();
/// let model = LatencyModel::for_config(&config);
/// let sizes = [1, 1];
/// let block = vec![
///     Instruction::build(Opcode::Mov).dst(Operand::vgrf(0, 0)).src0(Operand::Immediate(1)).build(),
///     Instruction::build(Opcode::Add).dst(Operand::vgrf(1, 0)).src0(Operand::vgrf(0, 0)).build(),
/// ];
///
/// let graph = DependencyGraphBuilder::new(&config, &model, &sizes).build(&block)?;
/// let schedule = Scheduler::new(&graph, &config, RegisterPressureTracker::disabled()).run()?;
/// assert_eq!(schedule.order.len(), 2);
/// # Ok::<(), gensched::Error>(())
/// ```
#[derive(Debug)]
pub struct Scheduler<'g, 'a> {
    graph: &'g DependencyGraph<'a>,
    config: &'g SchedulerConfig,
    tracker: RegisterPressureTracker,
    events: Option<(&'g EventLog, usize)>,

    direction: Direction,
    heuristic: Heuristic,
    physical: bool,
    shared_math_unit: bool,
    panic_limit: f32,
    state: SchedulerState,

    blocking: Vec<usize>,
    unblocked_logical: Vec<u32>,
    unblocked_physical: Vec<u32>,
    generation: Vec<u32>,
    scheduled: BitSet,
    ready: Vec<NodeId>,
    order: Vec<NodeId>,

    logical_time: u32,
    physical_time: u32,
    current_generation: u32,
    panicking: bool,
    panic_picks: usize,
    math_stalls: usize,
}

impl<'g, 'a> Scheduler<'g, 'a> {
    /// Creates a scheduler for `graph`. `tracker` must already be seeded
    /// for the block (or disabled).
    #[must_use]
    pub fn new(
        graph: &'g DependencyGraph<'a>,
        config: &'g SchedulerConfig,
        tracker: RegisterPressureTracker,
    ) -> Self {
        let direction = config.direction();
        let count = graph.len();

        Scheduler {
            graph,
            config,
            tracker,
            events: None,
            direction,
            heuristic: config.flavor.heuristic(direction),
            physical: config.uses_physical_latency(),
            shared_math_unit: direction == Direction::TopDown && config.models_shared_math_unit(),
            panic_limit: config.panic_limit(),
            state: SchedulerState::Building,
            blocking: graph
                .nodes()
                .iter()
                .map(|node| node.blocking_count(direction))
                .collect(),
            unblocked_logical: vec![0; count],
            unblocked_physical: vec![0; count],
            generation: vec![0; count],
            scheduled: BitSet::new(count),
            ready: Vec::with_capacity(count),
            order: Vec::with_capacity(count),
            logical_time: 0,
            physical_time: 0,
            current_generation: 0,
            panicking: false,
            panic_picks: 0,
            math_stalls: 0,
        }
    }

    /// Records panic-mode transitions and math-unit stalls in `log`,
    /// tagged with `block`.
    #[must_use]
    pub fn with_events(mut self, log: &'g EventLog, block: usize) -> Self {
        self.events = Some((log, block));
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Returns the nodes currently ready, in the order they became ready.
    #[must_use]
    pub fn ready(&self) -> &[NodeId] {
        &self.ready
    }

    /// Returns the pressure tracker.
    #[must_use]
    pub fn tracker(&self) -> &RegisterPressureTracker {
        &self.tracker
    }

    /// Returns `true` while the panic weights are in force.
    #[must_use]
    pub fn is_panicking(&self) -> bool {
        self.panicking
    }

    /// Puts every node without blockers on the ready list: in program order
    /// top-down, in reverse program order bottom-up. Does nothing once
    /// seeded.
    pub fn seed(&mut self) {
        if self.state != SchedulerState::Building {
            return;
        }

        let count = self.graph.len();
        let ids: Box<dyn Iterator<Item = usize>> = match self.direction {
            Direction::TopDown => Box::new(0..count),
            Direction::BottomUp => Box::new((0..count).rev()),
        };
        for index in ids {
            if self.blocking[index] == 0 {
                self.ready.push(NodeId::new(index));
            }
        }
        self.state = SchedulerState::Draining;
    }

    /// Emits one node, seeding first if needed.
    ///
    /// Returns `Ok(None)` once the ready list is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchedulingStalled`] if the ready list empties with
    /// nodes left over, and [`Error::GraphError`] if the graph's edge lists
    /// are inconsistent.
    pub fn step(&mut self) -> Result<Option<NodeId>> {
        match self.state {
            SchedulerState::Building => self.seed(),
            SchedulerState::Draining => {}
            SchedulerState::Done => return Ok(None),
        }

        self.update_panic_mode();

        let weights = if self.panicking {
            &self.config.panic_weights
        } else {
            &self.config.weights
        };
        let unblocked = if self.physical {
            &self.unblocked_physical
        } else {
            &self.unblocked_logical
        };
        let ctx = SelectionContext {
            graph: self.graph,
            ready: &self.ready,
            unblocked,
            generation: &self.generation,
            tracker: &self.tracker,
            time: self.time(),
            direction: self.direction,
            weights,
            scales: &self.config.scales,
        };

        let Some(pos) = self.heuristic.choose(&ctx) else {
            self.state = SchedulerState::Done;
            let total = self.graph.len();
            if self.order.len() != total {
                return Err(Error::SchedulingStalled {
                    scheduled: self.order.len(),
                    total,
                });
            }
            return Ok(None);
        };

        let id = self.ready.remove(pos);
        if self.panicking {
            self.panic_picks += 1;
        }
        self.emit(id)?;
        Ok(Some(id))
    }

    /// Drains the graph and returns the schedule in program order.
    ///
    /// # Errors
    ///
    /// See [`step`](Self::step).
    pub fn run(mut self) -> Result<Schedule> {
        while self.step()?.is_some() {}

        let mut order = self.order;
        if self.direction == Direction::BottomUp {
            order.reverse();
        }
        Ok(Schedule {
            order,
            logical_cycles: self.logical_time,
            physical_cycles: self.physical_time,
            panic_picks: self.panic_picks,
            math_stalls: self.math_stalls,
        })
    }

    fn time(&self) -> u32 {
        if self.physical {
            self.physical_time
        } else {
            self.logical_time
        }
    }

    fn emit(&mut self, id: NodeId) -> Result<()> {
        let index = id.index();
        if !self.scheduled.insert(index) {
            return Err(Error::GraphError(format!("{id} scheduled twice")));
        }

        let graph = self.graph;
        let node = graph.node(id);
        let issue = node.issue_cycles();
        self.logical_time = self.logical_time.max(self.unblocked_logical[index]) + issue;
        self.physical_time = self.physical_time.max(self.unblocked_physical[index]) + issue;

        self.tracker.apply(node.instruction(), self.direction);
        self.order.push(id);
        self.current_generation += 1;

        for edge in node.outgoing(self.direction) {
            let next = match self.direction {
                Direction::TopDown => edge.to,
                Direction::BottomUp => edge.from,
            };
            let n = next.index();

            self.unblocked_logical[n] = self.unblocked_logical[n].max(self.logical_time + edge.latency);
            self.unblocked_physical[n] =
                self.unblocked_physical[n].max(self.physical_time + edge.physical_latency);

            self.blocking[n] = self.blocking[n].checked_sub(1).ok_or_else(|| {
                Error::GraphError(format!("blocking count of {next} underflowed after {id}"))
            })?;
            if self.blocking[n] == 0 {
                self.generation[n] = self.current_generation;
                self.ready.push(next);
            }
        }

        if self.shared_math_unit && node.instruction().is_math() {
            self.occupy_math_unit(id);
        }
        Ok(())
    }

    /// Pushes every unscheduled math node past the latency of `id`.
    fn occupy_math_unit(&mut self, id: NodeId) {
        let graph = self.graph;
        let latency = graph.node(id).latency();
        let logical_free = self.logical_time + latency.logical;
        let physical_free = self.physical_time + latency.physical;

        let mut delayed = 0usize;
        for (index, node) in graph.nodes().iter().enumerate() {
            if self.scheduled.contains(index) || !node.instruction().is_math() {
                continue;
            }
            let before = self.unblocked_physical[index];
            self.unblocked_logical[index] = self.unblocked_logical[index].max(logical_free);
            self.unblocked_physical[index] = before.max(physical_free);
            if self.unblocked_physical[index] > before {
                delayed += 1;
            }
        }

        if delayed > 0 {
            self.math_stalls += 1;
            if let Some((log, block)) = self.events {
                log.record(EventKind::MathUnitStall)
                    .at(block, id)
                    .message(format!("{id} holds the math unit from {delayed} instructions"));
            }
        }
    }

    fn update_panic_mode(&mut self) {
        if !self.tracker.is_enabled() {
            return;
        }

        let pressure = self.tracker.current_pressure();
        let panicking = pressure > self.panic_limit;
        if panicking == self.panicking {
            return;
        }
        self.panicking = panicking;

        if let Some((log, block)) = self.events {
            let kind = if panicking {
                EventKind::PanicModeEntered
            } else {
                EventKind::PanicModeLeft
            };
            log.record(kind).block(block).message(format!(
                "pressure {pressure} against limit {} after {} instructions",
                self.panic_limit,
                self.order.len()
            ));
        }
    }
}
