//! Ready-list selection heuristics.
//!
//! All heuristics pick an index into the ready list and never mutate
//! scheduler state, so the same context always yields the same choice.

use crate::{
    schedule::{DependencyGraph, Direction, FactorScales, RegisterPressureTracker, ScoreWeights},
    utils::graph::NodeId,
};

/// Strategy used to choose the next node from the ready list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Smallest unblocked time first.
    EarliestReady,
    /// Weighted score over delay, pressure, lifetime, readiness and partial
    /// writes (scalar bottom-up).
    WeightedBottomUp,
    /// Bottom-up for vec4 code. Delegates to [`Heuristic::EarliestReady`];
    /// vec4 blocks have no pressure-aware heuristic.
    SimplifiedBottomUp,
}

/// Read-only view of scheduler state handed to a heuristic.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'s, 'a> {
    /// The block's dependency graph.
    pub graph: &'s DependencyGraph<'a>,
    /// Ready nodes, in the order they became ready.
    pub ready: &'s [NodeId],
    /// Per-node earliest start time on the active clock.
    pub unblocked: &'s [u32],
    /// Per-node generation in which the node became ready.
    pub generation: &'s [u32],
    /// Pressure tracker of the block.
    pub tracker: &'s RegisterPressureTracker,
    /// Current time on the active clock.
    pub time: u32,
    /// Scheduling direction.
    pub direction: Direction,
    /// Weights currently in force.
    pub weights: &'s ScoreWeights,
    /// Factor normalisation scales.
    pub scales: &'s FactorScales,
}

impl Heuristic {
    /// Returns the index in `ctx.ready` of the node to schedule next, or
    /// `None` if nothing is ready.
    #[must_use]
    pub fn choose(self, ctx: &SelectionContext<'_, '_>) -> Option<usize> {
        match self {
            Heuristic::EarliestReady | Heuristic::SimplifiedBottomUp => earliest_ready(ctx),
            Heuristic::WeightedBottomUp => weighted(ctx),
        }
    }
}

/// Smallest unblocked time wins; among equals the most recently readied
/// generation wins, then the earliest entry in the ready list.
fn earliest_ready(ctx: &SelectionContext<'_, '_>) -> Option<usize> {
    let mut best: Option<(usize, u32, u32)> = None;
    for (pos, id) in ctx.ready.iter().enumerate() {
        let unblocked = ctx.unblocked[id.index()];
        let generation = ctx.generation[id.index()];
        let better = match best {
            None => true,
            Some((_, best_unblocked, best_generation)) => {
                unblocked < best_unblocked
                    || (unblocked == best_unblocked && generation > best_generation)
            }
        };
        if better {
            best = Some((pos, unblocked, generation));
        }
    }
    best.map(|(pos, _, _)| pos)
}

fn weighted(ctx: &SelectionContext<'_, '_>) -> Option<usize> {
    let best_delay = ctx
        .ready
        .iter()
        .map(|id| ctx.graph.node(*id).delay())
        .max()?;

    let mut best: Option<(usize, f32)> = None;
    for (pos, id) in ctx.ready.iter().enumerate() {
        let score = ScoreFactors::compute(ctx, *id, best_delay).score(ctx.weights);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((pos, score));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Clamped, normalised inputs of the weighted score of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFactors {
    /// `-1..=0`: how far the node's critical path falls short of the best
    /// ready node.
    pub delay: f32,
    /// `-1..=1`: pressure benefit of scheduling the node.
    pub pressure: f32,
    /// `0..=1`: live-range length of the register the node defines.
    pub lifetime: f32,
    /// `-1..=0`: how long the node would stall the clock.
    pub unblocked: f32,
    /// `0..=1`: completion of a partially written register.
    pub partial: f32,
}

impl ScoreFactors {
    /// Computes the factors of node `id`.
    #[must_use]
    pub fn compute(ctx: &SelectionContext<'_, '_>, id: NodeId, best_delay: u32) -> Self {
        let node = ctx.graph.node(id);
        let inst = node.instruction();
        let scales = ctx.scales;

        let delay_gap = best_delay.saturating_sub(node.delay()) as f32;
        let stall = ctx.unblocked[id.index()].saturating_sub(ctx.time) as f32;

        ScoreFactors {
            delay: -(delay_gap / scales.delay).clamp(0.0, 1.0),
            pressure: (ctx.tracker.pressure_benefit(inst, ctx.direction) / scales.pressure)
                .clamp(-1.0, 1.0),
            lifetime: (ctx.tracker.lifetime(inst) as f32 / scales.lifetime).clamp(0.0, 1.0),
            unblocked: -(stall / scales.unblocked).clamp(0.0, 1.0),
            partial: ctx.tracker.partial_write_progress(inst).clamp(0.0, 1.0),
        }
    }

    /// Weighted sum of the factors.
    #[must_use]
    pub fn score(&self, weights: &ScoreWeights) -> f32 {
        weights.delay * self.delay
            + weights.pressure * self.pressure
            + weights.lifetime * self.lifetime
            + weights.unblocked * self.unblocked
            + weights.partial * self.partial
    }
}
