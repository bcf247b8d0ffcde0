//! Configuration for the instruction scheduler.
//!
//! Everything that used to be a global tuning knob lives in
//! [`SchedulerConfig`], which is passed by reference into every stage. Two
//! presets cover the two invocation points of the pass:
//! [`SchedulerConfig::pre_allocation`] (virtual registers, pressure-aware
//! bottom-up scheduling) and [`SchedulerConfig::post_allocation`] (physical
//! registers, latency-driven top-down scheduling).

use std::fmt;

use crate::{schedule::Flavor, Error, Result};

/// Hardware generation of the target GPU, e.g. `Generation::new(7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u8);

impl Generation {
    /// Oldest generation with a latency model.
    pub const MIN: Generation = Generation(4);
    /// Newest generation with a latency model.
    pub const MAX: Generation = Generation(12);

    /// Creates a generation identifier. Range is checked by
    /// [`SchedulerConfig::validate`].
    #[must_use]
    pub const fn new(number: u8) -> Self {
        Generation(number)
    }

    /// Returns the generation number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Returns `true` if all execution units share one extended math unit.
    #[must_use]
    pub const fn has_shared_math_unit(self) -> bool {
        self.0 < 6
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Whether the pass runs before or after register allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationMode {
    /// Operands name virtual registers; pressure tracking is enabled and
    /// edges use logical latencies.
    PreAllocation,
    /// Operands name physical registers; pressure tracking is disabled and
    /// edges use physical latencies.
    PostAllocation,
}

/// Scheduling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Start from the block entry and emit instructions in forward order.
    TopDown,
    /// Start from the block exit and emit instructions in reverse order.
    BottomUp,
}

/// SIMD width the block is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdWidth {
    /// 8 channels, one register per 32-bit value.
    Simd8,
    /// 16 channels, two registers per 32-bit value.
    Simd16,
}

/// Register file size and allocatable budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBudget {
    /// Size of the general register file.
    pub total_registers: u32,
    /// Registers available to the allocator after fixed reservations.
    pub allocatable: u32,
}

impl RegisterBudget {
    /// Returns the allocatable budget in units of SIMD-width values.
    ///
    /// A SIMD16 value occupies twice the registers of a SIMD8 value, so the
    /// effective budget halves.
    #[must_use]
    pub const fn allocatable_for(&self, simd: SimdWidth) -> u32 {
        match simd {
            SimdWidth::Simd8 => self.allocatable,
            SimdWidth::Simd16 => self.allocatable / 2,
        }
    }
}

impl Default for RegisterBudget {
    fn default() -> Self {
        Self {
            total_registers: 128,
            allocatable: 120,
        }
    }
}

/// Weights of the bottom-up heuristic factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Weight of the critical-path delay factor.
    pub delay: f32,
    /// Weight of the register-pressure benefit factor.
    pub pressure: f32,
    /// Weight of the live-range length factor.
    pub lifetime: f32,
    /// Weight of the not-yet-ready penalty.
    pub unblocked: f32,
    /// Weight of the partial-write completion bonus.
    pub partial: f32,
}

impl ScoreWeights {
    /// Weights used while pressure is below the panic threshold: hide
    /// latency first.
    #[must_use]
    pub const fn normal() -> Self {
        Self {
            delay: 1.0,
            pressure: 0.5,
            lifetime: 0.25,
            unblocked: 0.75,
            partial: 0.25,
        }
    }

    /// Weights used above the panic threshold: relieve pressure first.
    #[must_use]
    pub const fn panic() -> Self {
        Self {
            delay: 0.25,
            pressure: 2.0,
            lifetime: 0.5,
            unblocked: 0.1,
            partial: 0.5,
        }
    }

    fn all_finite(&self) -> bool {
        [
            self.delay,
            self.pressure,
            self.lifetime,
            self.unblocked,
            self.partial,
        ]
        .iter()
        .all(|w| w.is_finite())
    }
}

/// Normalisation scales; each raw quantity is divided by its scale and
/// clamped before weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScales {
    /// Cycles of delay below the best ready node that count as fully worse.
    pub delay: f32,
    /// Registers of pressure benefit that count as a full factor.
    pub pressure: f32,
    /// Instructions of live range that count as a full factor.
    pub lifetime: f32,
    /// Cycles of wait that count as fully blocked.
    pub unblocked: f32,
}

impl Default for FactorScales {
    fn default() -> Self {
        Self {
            delay: 16.0,
            pressure: 2.0,
            lifetime: 32.0,
            unblocked: 8.0,
        }
    }
}

/// Configuration for one scheduling invocation.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Target hardware generation (default: gen7).
    pub generation: Generation,

    /// Target is the fast sub-generation with cheaper memory round trips.
    pub fast_variant: bool,

    /// Before or after register allocation.
    pub mode: AllocationMode,

    /// Scheduling direction; `None` picks bottom-up before allocation and
    /// top-down after.
    pub direction: Option<Direction>,

    /// Instruction-set flavor of the block.
    pub flavor: Flavor,

    /// SIMD width of the block.
    pub simd_width: SimdWidth,

    /// Register file size and allocatable budget.
    pub budget: RegisterBudget,

    /// Fraction of the allocatable budget above which the heuristic panics
    /// (default: 0.9).
    pub panic_threshold: f32,

    /// Heuristic weights below the panic threshold.
    pub weights: ScoreWeights,

    /// Heuristic weights above the panic threshold.
    pub panic_weights: ScoreWeights,

    /// Factor normalisation scales.
    pub scales: FactorScales,

    /// Hardware threads assumed to share an execution unit; physical
    /// latencies are divided by it (default: 4).
    pub assumed_occupancy: u32,

    /// Assume sampler messages hit the sampler cache.
    pub sampler_cache_hot: bool,

    /// Model a single math unit shared by all math instructions; `None`
    /// derives it from the generation.
    pub shared_math_unit: Option<bool>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            generation: Generation::new(7),
            fast_variant: false,
            mode: AllocationMode::PreAllocation,
            direction: None,
            flavor: Flavor::Scalar,
            simd_width: SimdWidth::Simd8,
            budget: RegisterBudget::default(),
            panic_threshold: 0.9,
            weights: ScoreWeights::normal(),
            panic_weights: ScoreWeights::panic(),
            scales: FactorScales::default(),
            assumed_occupancy: 4,
            sampler_cache_hot: false,
            shared_math_unit: None,
        }
    }
}

impl SchedulerConfig {
    /// Creates the default (pre-allocation) configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for scheduling virtual-register code before
    /// allocation.
    #[must_use]
    pub fn pre_allocation(generation: Generation) -> Self {
        Self {
            generation,
            mode: AllocationMode::PreAllocation,
            ..Self::default()
        }
    }

    /// Configuration for scheduling allocated code.
    #[must_use]
    pub fn post_allocation(generation: Generation) -> Self {
        Self {
            generation,
            mode: AllocationMode::PostAllocation,
            ..Self::default()
        }
    }

    /// Sets the fast sub-generation flag.
    #[must_use]
    pub fn with_fast_variant(mut self, fast: bool) -> Self {
        self.fast_variant = fast;
        self
    }

    /// Forces a scheduling direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Sets the instruction-set flavor.
    #[must_use]
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Sets the SIMD width.
    #[must_use]
    pub fn with_simd_width(mut self, simd: SimdWidth) -> Self {
        self.simd_width = simd;
        self
    }

    /// Sets the register budget.
    #[must_use]
    pub fn with_budget(mut self, total_registers: u32, allocatable: u32) -> Self {
        self.budget = RegisterBudget {
            total_registers,
            allocatable,
        };
        self
    }

    /// Sets the panic threshold.
    #[must_use]
    pub fn with_panic_threshold(mut self, threshold: f32) -> Self {
        self.panic_threshold = threshold;
        self
    }

    /// Sets the normal weight set.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the panic weight set.
    #[must_use]
    pub fn with_panic_weights(mut self, weights: ScoreWeights) -> Self {
        self.panic_weights = weights;
        self
    }

    /// Sets the assumed thread occupancy.
    #[must_use]
    pub fn with_occupancy(mut self, occupancy: u32) -> Self {
        self.assumed_occupancy = occupancy;
        self
    }

    /// Sets the sampler-cache assumption.
    #[must_use]
    pub fn with_sampler_cache_hot(mut self, hot: bool) -> Self {
        self.sampler_cache_hot = hot;
        self
    }

    /// Overrides the shared math unit model.
    #[must_use]
    pub fn with_shared_math_unit(mut self, shared: bool) -> Self {
        self.shared_math_unit = Some(shared);
        self
    }

    /// Returns the effective scheduling direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction.unwrap_or(match self.mode {
            AllocationMode::PreAllocation => Direction::BottomUp,
            AllocationMode::PostAllocation => Direction::TopDown,
        })
    }

    /// Returns `true` if register pressure is tracked.
    #[must_use]
    pub fn tracks_pressure(&self) -> bool {
        self.mode == AllocationMode::PreAllocation
    }

    /// Returns `true` if delays and clocks use physical latencies.
    #[must_use]
    pub fn uses_physical_latency(&self) -> bool {
        self.mode == AllocationMode::PostAllocation
    }

    /// Returns `true` if the shared math unit is modeled.
    #[must_use]
    pub fn models_shared_math_unit(&self) -> bool {
        self.shared_math_unit
            .unwrap_or_else(|| self.generation.has_shared_math_unit())
    }

    /// Pressure above which the heuristic switches to the panic weights.
    #[must_use]
    pub fn panic_limit(&self) -> f32 {
        self.budget.allocatable_for(self.simd_width) as f32 * self.panic_threshold
    }

    /// Checks the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.generation < Generation::MIN || self.generation > Generation::MAX {
            return Err(Error::InvalidConfig(format!(
                "{} has no latency model (supported: {}..={})",
                self.generation,
                Generation::MIN,
                Generation::MAX
            )));
        }
        if self.assumed_occupancy == 0 {
            return Err(Error::InvalidConfig(
                "assumed_occupancy must be at least 1".to_string(),
            ));
        }
        if self.budget.allocatable == 0 || self.budget.allocatable > self.budget.total_registers
        {
            return Err(Error::InvalidConfig(format!(
                "allocatable registers ({}) must be in 1..={}",
                self.budget.allocatable, self.budget.total_registers
            )));
        }
        if !(self.panic_threshold.is_finite() && self.panic_threshold > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "panic_threshold must be positive, got {}",
                self.panic_threshold
            )));
        }
        if !(self.weights.all_finite() && self.panic_weights.all_finite()) {
            return Err(Error::InvalidConfig(
                "heuristic weights must be finite".to_string(),
            ));
        }
        let scales = [
            self.scales.delay,
            self.scales.pressure,
            self.scales.lifetime,
            self.scales.unblocked,
        ];
        if scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(Error::InvalidConfig(
                "factor scales must be positive".to_string(),
            ));
        }
        if self.flavor == Flavor::Vec4 && self.simd_width == SimdWidth::Simd16 {
            return Err(Error::InvalidConfig(
                "vec4 blocks execute as SIMD4x2 and cannot be SIMD16".to_string(),
            ));
        }
        Ok(())
    }
}
