//! Register pressure tracking for pre-allocation scheduling.
//!
//! Pressure is measured in registers: a live virtual register contributes
//! its size from the size table. Every reference (use or definition) of a
//! virtual register inside the block is counted up front; scheduling an
//! instruction consumes its references, and the register retires when its
//! last reference is scheduled. Registers live across the far block
//! boundary are pinned and never retire.
//!
//! After register allocation the tracker is constructed
//! [`disabled`](RegisterPressureTracker::disabled) and every query returns a
//! neutral value.

use crate::{
    ir::{Instruction, Operand},
    schedule::Direction,
    utils::BitSet,
};

/// One virtual register touched by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VregAccess {
    nr: usize,
    refs: u32,
    defs: u32,
}

/// Live-register bookkeeping for one block.
#[derive(Debug, Clone)]
pub struct RegisterPressureTracker {
    enabled: bool,
    sizes: Vec<u32>,
    remaining: Vec<u32>,
    total_defs: Vec<u32>,
    remaining_defs: Vec<u32>,
    live_range: Vec<u32>,
    active: BitSet,
    pinned: BitSet,
    pressure: u32,
}

impl RegisterPressureTracker {
    /// Creates an enabled tracker for a shader with the given virtual
    /// register sizes.
    #[must_use]
    pub fn new(vreg_sizes: &[u32]) -> Self {
        let count = vreg_sizes.len();
        RegisterPressureTracker {
            enabled: true,
            sizes: vreg_sizes.to_vec(),
            remaining: vec![0; count],
            total_defs: vec![0; count],
            remaining_defs: vec![0; count],
            live_range: vec![0; count],
            active: BitSet::new(count),
            pinned: BitSet::new(count),
            pressure: 0,
        }
    }

    /// Creates a tracker whose queries are all neutral.
    #[must_use]
    pub fn disabled() -> Self {
        RegisterPressureTracker {
            enabled: false,
            ..Self::new(&[])
        }
    }

    /// Returns `true` unless the tracker was created disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Initializes reference counts and live state for a block.
    ///
    /// The live set at the starting boundary of the schedule (live-out for
    /// bottom-up, live-in for top-down) is active from the start; the set at
    /// the far boundary is pinned.
    pub fn seed(
        &mut self,
        instructions: &[Instruction],
        live_in: &BitSet,
        live_out: &BitSet,
        direction: Direction,
    ) {
        if !self.enabled {
            return;
        }

        let count = self.sizes.len();
        self.remaining = vec![0; count];
        self.total_defs = vec![0; count];
        let mut first_ref = vec![usize::MAX; count];
        let mut last_ref = vec![0usize; count];

        for (index, inst) in instructions.iter().enumerate() {
            for access in self.accesses(inst, direction) {
                self.remaining[access.nr] += access.refs;
                self.total_defs[access.nr] += access.defs;
                first_ref[access.nr] = first_ref[access.nr].min(index);
                last_ref[access.nr] = index + 1;
            }
        }
        self.remaining_defs = self.total_defs.clone();

        let block_len = instructions.len();
        self.live_range = (0..count)
            .map(|nr| {
                let start = if live_in.contains(nr) { 0 } else { first_ref[nr] };
                let end = if live_out.contains(nr) { block_len } else { last_ref[nr] };
                end.saturating_sub(start) as u32
            })
            .collect();

        let (start_set, far_set) = match direction {
            Direction::BottomUp => (live_out, live_in),
            Direction::TopDown => (live_in, live_out),
        };

        self.active = BitSet::with_members(count, start_set.iter());
        self.pinned = BitSet::with_members(count, far_set.iter());
        self.pressure = self.active.iter().map(|nr| self.sizes[nr]).sum();
    }

    /// Estimated change in live registers if `inst` is scheduled next.
    ///
    /// Positive when a live register retires, negative when a register that
    /// is not yet live becomes live, zero when both or neither happen.
    #[must_use]
    pub fn pressure_benefit(&self, inst: &Instruction, direction: Direction) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        let mut benefit = 0i64;
        for access in self.accesses(inst, direction) {
            let size = i64::from(self.sizes[access.nr]);
            let active = self.active.contains(access.nr);
            match (active, self.retires(access)) {
                (true, true) => benefit += size,
                (false, false) => benefit -= size,
                _ => {}
            }
        }
        benefit as f32
    }

    /// Consumes the references of a scheduled instruction.
    pub fn apply(&mut self, inst: &Instruction, direction: Direction) {
        if !self.enabled {
            return;
        }

        for access in self.accesses(inst, direction) {
            let nr = access.nr;
            debug_assert!(self.remaining[nr] >= access.refs, "vgrf{nr} over-consumed");
            self.remaining[nr] = self.remaining[nr].saturating_sub(access.refs);
            self.remaining_defs[nr] = self.remaining_defs[nr].saturating_sub(access.defs);

            if self.active.insert(nr) {
                self.pressure += self.sizes[nr];
            }
            if self.remaining[nr] == 0 && !self.pinned.contains(nr) {
                self.active.remove(nr);
                self.pressure -= self.sizes[nr];
            }
        }
    }

    /// Current live registers.
    #[must_use]
    pub fn current_pressure(&self) -> f32 {
        self.pressure as f32
    }

    /// Live-range length, in instructions, of the register `inst` defines.
    #[must_use]
    pub fn lifetime(&self, inst: &Instruction) -> u32 {
        match self.defined_vreg(inst) {
            Some(nr) if self.enabled => self.live_range[nr],
            _ => 0,
        }
    }

    /// Fraction of the definitions of the register `inst` defines that are
    /// complete once `inst` is scheduled.
    ///
    /// Zero for registers with a single definition.
    #[must_use]
    pub fn partial_write_progress(&self, inst: &Instruction) -> f32 {
        let Some(nr) = self.defined_vreg(inst).filter(|_| self.enabled) else {
            return 0.0;
        };
        let total = self.total_defs[nr];
        if total <= 1 {
            return 0.0;
        }
        let done = total - self.remaining_defs[nr] + 1;
        (done as f32 / total as f32).min(1.0)
    }

    /// Returns the unconsumed references of `vgrf{nr}`.
    #[must_use]
    pub fn remaining_refs(&self, nr: usize) -> Option<u32> {
        self.remaining.get(nr).copied()
    }

    /// Returns `true` if `vgrf{nr}` is currently live.
    #[must_use]
    pub fn is_active(&self, nr: usize) -> bool {
        self.active.contains(nr)
    }

    fn retires(&self, access: VregAccess) -> bool {
        !self.pinned.contains(access.nr) && self.remaining[access.nr] <= access.refs
    }

    fn defined_vreg(&self, inst: &Instruction) -> Option<usize> {
        inst.dst
            .vgrf_nr()
            .map(|nr| nr as usize)
            .filter(|&nr| nr < self.sizes.len())
    }

    /// Distinct virtual registers of `inst`, definitions first when
    /// scheduling bottom-up and uses first when scheduling top-down.
    fn accesses(&self, inst: &Instruction, direction: Direction) -> Vec<VregAccess> {
        let dst = std::iter::once((&inst.dst, true));
        let srcs = inst.src.iter().map(|op| (op, false));
        let ordered: Vec<(&Operand, bool)> = match direction {
            Direction::BottomUp => dst.chain(srcs).collect(),
            Direction::TopDown => srcs.chain(dst).collect(),
        };

        let mut accesses: Vec<VregAccess> = Vec::with_capacity(4);
        for (op, is_def) in ordered {
            let Some(nr) = op.vgrf_nr().map(|nr| nr as usize) else {
                continue;
            };
            if nr >= self.sizes.len() {
                continue;
            }
            let defs = u32::from(is_def);
            match accesses.iter_mut().find(|a| a.nr == nr) {
                Some(access) => {
                    access.refs += 1;
                    access.defs += defs;
                }
                None => accesses.push(VregAccess { nr, refs: 1, defs }),
            }
        }
        accesses
    }
}
