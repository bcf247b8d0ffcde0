//! Instruction latency model.
//!
//! Each instruction carries two latencies. The *logical* latency is the
//! conservative minimum (one cycle) used before register allocation, where
//! modelling long latencies would make the pressure heuristic spread
//! dependent instructions apart and raise pressure. The *physical* latency
//! estimates real wall-clock cost and drives the post-allocation schedule.
//!
//! Physical latencies only depend on the opcode and a handful of target
//! parameters, so they are precomputed into a [`LatencyTable`] per
//! [`LatencyKey`] and shared through the thread-safe [`LatencyCache`].

use std::sync::Arc;

use dashmap::DashMap;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    ir::{Instruction, Opcode},
    schedule::{Flavor, Generation, SchedulerConfig},
};

/// Base extended-math latency before per-op multipliers, per generation.
const MATH_LATENCY_GEN4: u32 = 22;
const MATH_LATENCY_GEN6: u32 = 18;
const MATH_LATENCY_GEN7: u32 = 16;
const MATH_LATENCY_GEN7_FAST: u32 = 14;

/// Channels the pre-gen6 shared math unit processes one after another.
const MATH_SERIAL_CHANNELS: u32 = 8;

/// Sampler round trip, blended over cache hits and misses.
const SAMPLER_LATENCY: u32 = 200;
const SAMPLER_LATENCY_CACHE_HOT: u32 = 130;

const SCRATCH_READ_LATENCY: u32 = 200;
const SCRATCH_READ_LATENCY_GEN7: u32 = 100;

const UNTYPED_ATOMIC_LATENCY: u32 = 14000;
const UNTYPED_ATOMIC_LATENCY_FAST: u32 = 7000;

const SURFACE_READ_LATENCY: u32 = 600;
const SURFACE_READ_LATENCY_FAST: u32 = 300;

const DEFAULT_LATENCY: u32 = 2;
const DEFAULT_LATENCY_GEN7: u32 = 14;

/// Logical and physical latency of one instruction, in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Latency {
    /// Conservative latency used for pre-allocation edges.
    pub logical: u32,
    /// Estimated wall-clock latency used after allocation.
    pub physical: u32,
}

impl Latency {
    /// The same latency for both clocks.
    #[must_use]
    pub const fn uniform(cycles: u32) -> Self {
        Latency {
            logical: cycles,
            physical: cycles,
        }
    }

    /// Returns the physical latency if `physical` is set, else the logical.
    #[must_use]
    pub const fn select(self, physical: bool) -> u32 {
        if physical {
            self.physical
        } else {
            self.logical
        }
    }
}

/// Target parameters a physical latency table depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatencyKey {
    /// Hardware generation
    pub generation: Generation,
    /// Fast sub-generation
    pub fast_variant: bool,
    /// Assumed thread occupancy, at least 1
    pub occupancy: u32,
    /// Sampler cache assumed hot
    pub sampler_cache_hot: bool,
}

impl LatencyKey {
    /// Extracts the latency-relevant parameters of `config`.
    #[must_use]
    pub fn from_config(config: &SchedulerConfig) -> Self {
        LatencyKey {
            generation: config.generation,
            fast_variant: config.fast_variant,
            occupancy: config.assumed_occupancy.max(1),
            sampler_cache_hot: config.sampler_cache_hot,
        }
    }

    /// Base latency of one extended-math operation.
    fn math_base(&self) -> u32 {
        match self.generation.number() {
            0..=5 => MATH_LATENCY_GEN4 * MATH_SERIAL_CHANNELS,
            6 => MATH_LATENCY_GEN6,
            _ if self.fast_variant => MATH_LATENCY_GEN7_FAST,
            _ => MATH_LATENCY_GEN7,
        }
    }

    /// Physical latency of `opcode` before the occupancy division.
    fn raw_latency(&self, opcode: Opcode) -> u32 {
        let gen7 = self.generation.number() >= 7;

        if let Some(multiplier) = opcode.math_multiplier() {
            return multiplier * self.math_base();
        }
        if opcode.is_sampler() {
            return if self.sampler_cache_hot {
                SAMPLER_LATENCY_CACHE_HOT
            } else {
                SAMPLER_LATENCY
            };
        }

        match opcode {
            Opcode::ScratchRead if gen7 => SCRATCH_READ_LATENCY_GEN7,
            Opcode::ScratchRead => SCRATCH_READ_LATENCY,
            Opcode::UntypedAtomic if self.fast_variant => UNTYPED_ATOMIC_LATENCY_FAST,
            Opcode::UntypedAtomic => UNTYPED_ATOMIC_LATENCY,
            Opcode::UntypedSurfaceRead if self.fast_variant => SURFACE_READ_LATENCY_FAST,
            Opcode::UntypedSurfaceRead => SURFACE_READ_LATENCY,
            _ if gen7 => DEFAULT_LATENCY_GEN7,
            _ => DEFAULT_LATENCY,
        }
    }
}

/// Precomputed physical latency for every opcode of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyTable {
    key: LatencyKey,
    physical: [u32; Opcode::COUNT],
}

impl LatencyTable {
    /// Computes the table for `key`.
    #[must_use]
    pub fn compute(key: LatencyKey) -> Self {
        let mut physical = [0; Opcode::COUNT];
        for opcode in Opcode::iter() {
            physical[opcode as usize] = (key.raw_latency(opcode) / key.occupancy).max(1);
        }
        LatencyTable { key, physical }
    }

    /// Returns the parameters this table was computed for.
    #[must_use]
    pub fn key(&self) -> LatencyKey {
        self.key
    }

    /// Returns the physical latency of `opcode`.
    #[must_use]
    pub fn physical(&self, opcode: Opcode) -> u32 {
        self.physical[opcode as usize]
    }
}

/// Thread-safe cache of latency tables shared across scheduling
/// invocations.
///
/// # Examples
///
/// ```rust
/// use gensched::schedule::{LatencyCache, LatencyKey, SchedulerConfig};
///
/// let cache = LatencyCache::new();
/// let key = LatencyKey::from_config(&SchedulerConfig::default());
/// let a = cache.table(key);
/// let b = cache.table(key);
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LatencyCache {
    tables: DashMap<LatencyKey, Arc<LatencyTable>>,
}

impl LatencyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        LatencyCache {
            tables: DashMap::new(),
        }
    }

    /// Returns the table for `key`, computing it on first use.
    #[must_use]
    pub fn table(&self, key: LatencyKey) -> Arc<LatencyTable> {
        if let Some(table) = self.tables.get(&key) {
            return Arc::clone(table.value());
        }
        Arc::clone(
            self.tables
                .entry(key)
                .or_insert_with(|| Arc::new(LatencyTable::compute(key)))
                .value(),
        )
    }

    /// Returns the number of cached tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no table has been computed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Latency lookups for the instructions of one block.
#[derive(Debug, Clone)]
pub struct LatencyModel {
    table: Arc<LatencyTable>,
    flavor: Flavor,
}

impl LatencyModel {
    /// Wraps a (possibly shared) table for scalar code.
    #[must_use]
    pub fn new(table: Arc<LatencyTable>) -> Self {
        LatencyModel {
            table,
            flavor: Flavor::Scalar,
        }
    }

    /// Builds a private table for `config`.
    #[must_use]
    pub fn for_config(config: &SchedulerConfig) -> Self {
        Self::new(Arc::new(LatencyTable::compute(LatencyKey::from_config(
            config,
        ))))
        .with_flavor(config.flavor)
    }

    /// Sets the instruction-set flavor issue costs are computed for.
    #[must_use]
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Cycles needed to dispatch `inst`.
    #[must_use]
    pub fn issue_cycles(&self, inst: &Instruction) -> u32 {
        self.flavor.issue_cycles(inst)
    }

    /// Returns the logical and physical latency of `inst`.
    ///
    /// Opcodes without a specific entry get the default short latency.
    #[must_use]
    pub fn latency(&self, inst: &Instruction) -> Latency {
        Latency {
            logical: 1,
            physical: self.table.physical(inst.opcode),
        }
    }

    /// Returns the underlying table.
    #[must_use]
    pub fn table(&self) -> &LatencyTable {
        &self.table
    }
}
